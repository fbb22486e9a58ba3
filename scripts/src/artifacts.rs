//! Lookup of compiled contract artifacts in the Hardhat build output

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    constants::{BUILD_INFO_DIR, DBG_FILE_SUFFIX, JSON_EXTENSION},
    errors::TaskError,
};

/// A compiled contract, as emitted by the build toolchain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    /// The contract's name
    pub contract_name: String,
    /// The path of the source file declaring the contract
    pub source_name: String,
    /// The contract's JSON ABI
    pub abi: JsonAbi,
    /// The contract's creation bytecode
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// The fully-qualified source identity, `<source path>:<contract name>`
    pub fn source_identity(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// The compiler input and version a contract was built with
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// The full compiler version, e.g. `0.8.20+commit.a1b79de6`
    pub solc_long_version: String,
    /// The standard JSON compiler input
    pub input: Value,
}

/// The debug file emitted next to each artifact
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    /// Path of the build-info file, relative to the debug file
    build_info: String,
}

/// A registered artifact and the file it was read from
#[derive(Debug, Clone)]
struct ArtifactEntry {
    /// The artifact file's path
    path: PathBuf,
    /// The parsed artifact
    artifact: ContractArtifact,
}

/// The set of artifacts available for deployment, keyed by source identity
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    /// Registered artifacts, keyed by `<source path>:<contract name>`
    entries: BTreeMap<String, ArtifactEntry>,
}

impl ArtifactRegistry {
    /// Register every artifact found under the given build output directory.
    ///
    /// A missing directory yields an empty registry, so that tasks which
    /// never resolve an artifact can still run.
    pub fn load(root: &Path) -> Result<Self, TaskError> {
        let mut registry = Self::default();
        if !root.is_dir() {
            warn!("artifacts directory {} does not exist", root.display());
            return Ok(registry);
        }

        let mut dirs = vec![root.to_path_buf()];
        while let Some(dir) = dirs.pop() {
            let entries =
                fs::read_dir(&dir).map_err(|e| TaskError::ArtifactParsing(e.to_string()))?;

            for entry in entries {
                let path = entry
                    .map_err(|e| TaskError::ArtifactParsing(e.to_string()))?
                    .path();

                if path.is_dir() {
                    if path.file_name().is_some_and(|name| name != BUILD_INFO_DIR) {
                        dirs.push(path);
                    }
                    continue;
                }

                let is_artifact_file = path.extension().is_some_and(|ext| ext == JSON_EXTENSION)
                    && !path.to_string_lossy().ends_with(DBG_FILE_SUFFIX);
                if is_artifact_file {
                    registry.load_file(path);
                }
            }
        }

        debug!("registered {} artifacts", registry.entries.len());
        Ok(registry)
    }

    /// Register an in-memory artifact
    pub fn register(&mut self, artifact: ContractArtifact, path: PathBuf) {
        self.entries
            .insert(artifact.source_identity(), ArtifactEntry { path, artifact });
    }

    /// Resolve an artifact by contract name or by fully-qualified source identity
    pub fn resolve(&self, name: &str) -> Result<&ContractArtifact, TaskError> {
        self.resolve_entry(name).map(|entry| &entry.artifact)
    }

    /// Read the build-info of the artifact with the given name or source identity
    pub fn build_info(&self, name: &str) -> Result<BuildInfo, TaskError> {
        let entry = self.resolve_entry(name)?;
        let artifact_dir = entry.path.parent().ok_or_else(|| {
            TaskError::ArtifactParsing(format!("{} has no parent directory", entry.path.display()))
        })?;

        let dbg_path =
            artifact_dir.join(format!("{}{}", entry.artifact.contract_name, DBG_FILE_SUFFIX));
        let dbg_file: DebugFile = read_json(&dbg_path)?;

        read_json(&artifact_dir.join(dbg_file.build_info))
    }

    /// Parse and register a single artifact file, skipping files of another shape
    fn load_file(&mut self, path: PathBuf) {
        match read_json::<ContractArtifact>(&path) {
            Ok(artifact) => self.register(artifact, path),
            Err(e) => debug!("skipping {}: {}", path.display(), e),
        }
    }

    /// Find the single entry matching a contract name or source identity
    fn resolve_entry(&self, name: &str) -> Result<&ArtifactEntry, TaskError> {
        if let Some(entry) = self.entries.get(name) {
            return Ok(entry);
        }

        let mut matches = self
            .entries
            .values()
            .filter(|entry| entry.artifact.contract_name == name);

        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(entry),
            (Some(_), Some(_)) => Err(TaskError::ArtifactParsing(format!(
                "multiple artifacts named `{}`, use a fully-qualified name",
                name
            ))),
            (None, _) => Err(TaskError::ArtifactNotFound(name.to_string())),
        }
    }
}

/// Read and deserialize a JSON file
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, TaskError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| TaskError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| TaskError::ArtifactParsing(format!("{}: {}", path.display(), e)))
}
