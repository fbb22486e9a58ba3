//! Network and credential configuration, loaded once at startup and passed
//! explicitly to the task executor

use std::path::PathBuf;

use crate::{
    constants::{BSCSCAN_API_KEY_ENV_VAR, ETH_API_KEY_ENV_VAR},
    errors::TaskError,
};

/// A network the tasks know how to reach without further configuration
struct KnownNetwork {
    /// The network's name, as selected on the command line
    name: &'static str,
    /// The default RPC endpoint
    rpc_url: &'static str,
    /// The chain ID
    chain_id: u64,
    /// The explorer's API endpoint, if the network has one
    explorer_api_url: Option<&'static str>,
    /// The explorer's browser URL
    explorer_browser_url: &'static str,
    /// The environment variable holding the explorer API key
    explorer_api_key_env: &'static str,
}

/// The networks available to the tasks
const KNOWN_NETWORKS: &[KnownNetwork] = &[
    KnownNetwork {
        name: "coq",
        rpc_url: "https://shanghai-inner-rpc.ankr.com/all/coq_testnet/rpc",
        chain_id: 12077,
        explorer_api_url: Some("https://testnetscan.ankr.com/api"),
        explorer_browser_url: "https://testnetscan.ankr.com",
        explorer_api_key_env: ETH_API_KEY_ENV_VAR,
    },
    KnownNetwork {
        name: "bsctestnet",
        rpc_url: "https://bsc-testnet-rpc.publicnode.com",
        chain_id: 97,
        explorer_api_url: Some("https://api-testnet.bscscan.com/api"),
        explorer_browser_url: "https://testnet.bscscan.com",
        explorer_api_key_env: BSCSCAN_API_KEY_ENV_VAR,
    },
    KnownNetwork {
        name: "localhost",
        rpc_url: "http://127.0.0.1:8545",
        chain_id: 31337,
        explorer_api_url: None,
        explorer_browser_url: "",
        explorer_api_key_env: ETH_API_KEY_ENV_VAR,
    },
];

/// The block explorer used to verify contracts on a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// The explorer's API endpoint
    pub api_url: String,
    /// The explorer's browser URL
    pub browser_url: String,
    /// The explorer API key, empty if none was configured
    pub api_key: String,
}

/// The network a task is run against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// The network's name
    pub name: String,
    /// The RPC endpoint
    pub rpc_url: String,
    /// The chain ID
    pub chain_id: u64,
    /// The network's explorer, if any
    pub explorer: Option<ExplorerConfig>,
}

impl NetworkConfig {
    /// Look up a known network, reading its explorer API key through `env`.
    ///
    /// `rpc_url` overrides the network's default endpoint.
    pub fn resolve(
        name: &str,
        rpc_url: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, TaskError> {
        let known = KNOWN_NETWORKS
            .iter()
            .find(|network| network.name == name)
            .ok_or_else(|| {
                let names: Vec<_> = KNOWN_NETWORKS.iter().map(|n| n.name).collect();
                TaskError::Config(format!(
                    "unknown network `{}`, expected one of {}",
                    name,
                    names.join(", ")
                ))
            })?;

        let explorer = known.explorer_api_url.map(|api_url| ExplorerConfig {
            api_url: api_url.to_string(),
            browser_url: known.explorer_browser_url.to_string(),
            api_key: env(known.explorer_api_key_env).unwrap_or_default(),
        });

        Ok(Self {
            name: known.name.to_string(),
            rpc_url: rpc_url.unwrap_or_else(|| known.rpc_url.to_string()),
            chain_id: known.chain_id,
            explorer,
        })
    }
}

/// Process-wide configuration for a task invocation
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    /// The target network
    pub network: NetworkConfig,
    /// The deployer's private key; `None` yields an empty signer set
    pub private_key: Option<String>,
    /// The directory holding the build output
    pub artifacts_dir: PathBuf,
    /// Where to record deployed addresses, if anywhere
    pub deployments_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with_keys(var: &str) -> Option<String> {
        match var {
            ETH_API_KEY_ENV_VAR => Some("eth-key".to_string()),
            BSCSCAN_API_KEY_ENV_VAR => Some("bsc-key".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_known_networks() {
        let coq = NetworkConfig::resolve("coq", None, env_with_keys).unwrap();
        assert_eq!(coq.chain_id, 12077);
        assert_eq!(coq.explorer.unwrap().api_key, "eth-key");

        let bsc = NetworkConfig::resolve("bsctestnet", None, env_with_keys).unwrap();
        assert_eq!(bsc.chain_id, 97);
        assert_eq!(bsc.explorer.unwrap().api_key, "bsc-key");

        let local = NetworkConfig::resolve("localhost", None, env_with_keys).unwrap();
        assert!(local.explorer.is_none());
    }

    #[test]
    fn test_missing_api_key_is_empty() {
        let coq = NetworkConfig::resolve("coq", None, |_| None).unwrap();
        assert_eq!(coq.explorer.unwrap().api_key, "");
    }

    #[test]
    fn test_rpc_override() {
        let url = "http://10.0.0.1:8545".to_string();
        let coq = NetworkConfig::resolve("coq", Some(url.clone()), |_| None).unwrap();
        assert_eq!(coq.rpc_url, url);
    }

    #[test]
    fn test_unknown_network() {
        assert!(matches!(
            NetworkConfig::resolve("mainnet", None, |_| None),
            Err(TaskError::Config(_))
        ));
    }
}
