//! Definitions of errors that can occur while declaring, resolving, and running tasks

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use crate::schema::ParamType;

/// Errors that can occur during the execution of the deploy and verify tasks
#[derive(Debug, Clone, PartialEq)]
pub enum TaskError {
    /// A parameter key was declared twice on the same task
    DuplicateParameter(String),
    /// A parameter's default value does not have the declared type
    DefaultTypeMismatch {
        /// The parameter key
        key: String,
        /// The declared type
        expected: ParamType,
        /// The type of the provided default
        found: ParamType,
    },
    /// No task is registered under the given name
    UnknownTask(String),
    /// A supplied parameter is not declared by the task
    UnknownParameter(String),
    /// The raw task arguments could not be split into `--key value` pairs
    MalformedArgument(String),
    /// A supplied value could not be coerced to the declared type
    TypeCoercion {
        /// The parameter key
        key: String,
        /// The declared type
        expected: ParamType,
        /// The raw value supplied
        value: String,
    },
    /// A numeric parameter cannot be represented on-chain
    InvalidParameter {
        /// The parameter key
        key: String,
        /// Why the value was rejected
        reason: String,
    },
    /// An address-typed parameter is not a well-formed address
    InvalidAddress {
        /// The parameter key
        key: String,
        /// The rejected value
        value: String,
    },
    /// No build artifact is registered under the given name
    ArtifactNotFound(String),
    /// Error reading or parsing a build artifact
    ArtifactParsing(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// A transaction or RPC call was rejected by the transport or the chain
    NetworkSubmission(String),
    /// The explorer refused to verify the submitted source
    VerificationRejected(String),
    /// Error building the task configuration
    Config(String),
    /// Error initializing the RPC or explorer client
    ClientInitialization(String),
    /// Error reading or writing the deployments file
    DeploymentsFile(String),
}

impl TaskError {
    /// The name of this error's kind, as surfaced to the operator
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::DuplicateParameter(_) => "DuplicateParameterError",
            TaskError::DefaultTypeMismatch { .. } => "DefaultTypeMismatchError",
            TaskError::UnknownTask(_) => "UnknownTaskError",
            TaskError::UnknownParameter(_) => "UnknownParameterError",
            TaskError::MalformedArgument(_) => "MalformedArgumentError",
            TaskError::TypeCoercion { .. } => "TypeCoercionError",
            TaskError::InvalidParameter { .. } => "InvalidParameterError",
            TaskError::InvalidAddress { .. } => "InvalidAddressError",
            TaskError::ArtifactNotFound(_) => "ArtifactNotFoundError",
            TaskError::ArtifactParsing(_) => "ArtifactParsingError",
            TaskError::CalldataConstruction(_) => "CalldataConstructionError",
            TaskError::NetworkSubmission(_) => "NetworkSubmissionError",
            TaskError::VerificationRejected(_) => "VerificationRejectedError",
            TaskError::Config(_) => "ConfigError",
            TaskError::ClientInitialization(_) => "ClientInitializationError",
            TaskError::DeploymentsFile(_) => "DeploymentsFileError",
        }
    }
}

impl Display for TaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::DuplicateParameter(key) => {
                write!(f, "parameter `{}` is already declared", key)
            }
            TaskError::DefaultTypeMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "default for `{}` is a {}, but the parameter is declared as {}",
                key, found, expected
            ),
            TaskError::UnknownTask(name) => write!(f, "no task named `{}`", name),
            TaskError::UnknownParameter(key) => write!(f, "unrecognized parameter `{}`", key),
            TaskError::MalformedArgument(s) => write!(f, "malformed task argument: {}", s),
            TaskError::TypeCoercion {
                key,
                expected,
                value,
            } => write!(f, "invalid {} value for `{}`: {:?}", expected, key, value),
            TaskError::InvalidParameter { key, reason } => {
                write!(f, "invalid value for `{}`: {}", key, reason)
            }
            TaskError::InvalidAddress { key, value } => {
                write!(f, "invalid {} address: {:?}", key, value)
            }
            TaskError::ArtifactNotFound(name) => write!(f, "artifact `{}` not found", name),
            TaskError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            TaskError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            TaskError::NetworkSubmission(s) => write!(f, "error submitting to network: {}", s),
            TaskError::VerificationRejected(s) => write!(f, "verification rejected: {}", s),
            TaskError::Config(s) => write!(f, "configuration error: {}", s),
            TaskError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            TaskError::DeploymentsFile(s) => write!(f, "error updating deployments file: {}", s),
        }
    }
}

impl Error for TaskError {}
