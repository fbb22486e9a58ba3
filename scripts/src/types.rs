//! Type definitions used throughout the tasks

use std::fmt::{self, Display};

use alloy::primitives::{Address, TxHash, U256};

/// One positional argument to the contract's initializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitializerArg {
    /// A `string` argument
    String(String),
    /// An unsigned integer argument
    Uint(U256),
    /// An `address` argument
    Address(Address),
}

impl Display for InitializerArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializerArg::String(s) => write!(f, "{:?}", s),
            InitializerArg::Uint(v) => write!(f, "{}", v),
            InitializerArg::Address(a) => write!(f, "{}", a),
        }
    }
}

impl From<&str> for InitializerArg {
    fn from(value: &str) -> Self {
        InitializerArg::String(value.to_string())
    }
}

impl From<U256> for InitializerArg {
    fn from(value: U256) -> Self {
        InitializerArg::Uint(value)
    }
}

impl From<Address> for InitializerArg {
    fn from(value: Address) -> Self {
        InitializerArg::Address(value)
    }
}

/// A proxy deployment that has been submitted but not yet confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    /// The hash of the proxy deployment transaction
    pub transaction_hash: TxHash,
    /// The address of the implementation contract the proxy delegates to
    pub implementation_address: Address,
}

/// Receipt details of a confirmed proxy deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReceipt {
    /// The hash of the proxy deployment transaction
    pub transaction_hash: TxHash,
    /// The block the proxy deployment was included in
    pub block_number: Option<u64>,
    /// The address of the implementation contract
    pub implementation_address: Address,
    /// The address of the proxy admin contract, if it could be read
    pub proxy_admin_address: Option<Address>,
}

/// The outcome of a successful deploy sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    /// The address of the deployed proxy, i.e. the contract's public address
    pub contract_address: Address,
    /// The confirmed deployment's receipt
    pub receipt: Option<DeploymentReceipt>,
}

/// A request to verify a deployed contract's source on a block explorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    /// The address of the contract to verify
    pub contract_address: Address,
    /// The fully-qualified source identity, `<source path>:<contract name>`
    pub source_identity: String,
    /// The ABI-encoded constructor arguments, empty for upgradeable contracts
    pub constructor_arguments: Vec<u8>,
}

/// The explorer's acknowledgment of a verification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReceipt {
    /// The address of the verified contract
    pub contract_address: Address,
    /// The explorer's status message
    pub message: String,
}
