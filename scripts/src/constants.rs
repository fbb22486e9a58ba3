//! Constants used in the deploy and verify tasks

/// The name of the upgradeable contract's build artifact
pub const ERC404_STAKE_ARTIFACT: &str = "ERC404Stake";

/// The fully-qualified source identity of the contract, as the explorer expects it
pub const ERC404_STAKE_SOURCE_IDENTITY: &str = "contracts/ERC404Stake.sol:ERC404Stake";

/// The name of the one-time setup entry point invoked through the proxy
pub const INITIALIZER_NAME: &str = "initialize";

/// The name of the proxy contract's build artifact
///
/// Compiled from https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/transparent/TransparentUpgradeableProxy.sol
pub const PROXY_ARTIFACT: &str = "TransparentUpgradeableProxy";

/// The fixed-point scale applied to the exchange ratio before it is sent on-chain
pub const RATIO_SCALE: f64 = 10_000.;

/// The largest distance from an integer a scaled ratio may have and still be
/// considered exactly representable
pub const RATIO_SCALE_TOLERANCE: f64 = 1e-6;

/// The zero address, the default stake token
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// The number of hex characters in an Ethereum address
pub const NUM_HEX_CHARS_ADDRESS: usize = 40;

/// The number of confirmations to wait for on each deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: u64 = 1;

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The default directory holding the Hardhat build output
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The name of the directory under the artifacts directory holding build-info files
pub const BUILD_INFO_DIR: &str = "build-info";

/// The suffix of the Hardhat debug files pointing at build-info
pub const DBG_FILE_SUFFIX: &str = ".dbg.json";

/// The extension of artifact files
pub const JSON_EXTENSION: &str = "json";

/// The default network tasks are run against
pub const DEFAULT_NETWORK: &str = "localhost";

/// The environment variable holding the deployer's private key
pub const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// The environment variable holding the Etherscan API key, reused for custom chains
pub const ETH_API_KEY_ENV_VAR: &str = "ETH_API_KEY";

/// The environment variable holding the BscScan API key
pub const BSCSCAN_API_KEY_ENV_VAR: &str = "BSCSCAN_API_KEY";

/// The explorer's status value for a successful request
pub const EXPLORER_STATUS_OK: &str = "1";

/// The explorer's code format for standard JSON compiler input
pub const EXPLORER_CODE_FORMAT: &str = "solidity-standard-json-input";

/// The prefix of the explorer's status message while a verification is queued
pub const EXPLORER_PENDING_PREFIX: &str = "Pending";

/// The prefix of the explorer's status message for a successful verification
pub const EXPLORER_PASS_PREFIX: &str = "Pass";

/// The explorer's message when the contract was verified before
pub const EXPLORER_ALREADY_VERIFIED: &str = "already verified";

/// Fragments of explorer messages reporting a problem with the request or the
/// service rather than with the submitted source
pub const EXPLORER_SERVICE_ERRORS: &[&str] = &[
    "api key",
    "rate limit",
    "missing or invalid",
    "invalid module",
    "invalid action",
    "timeout",
    "unknown uid",
];

/// The number of seconds between verification status polls
pub const VERIFICATION_POLL_INTERVAL_SECS: u64 = 3;

/// The maximum number of verification status polls before giving up
pub const MAX_VERIFICATION_POLLS: usize = 20;

/// The deployments key in the deployments file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The proxy contract key in the deployments file
pub const PROXY_CONTRACT_KEY: &str = "erc404_stake_proxy_contract";

/// The implementation contract key in the deployments file
pub const IMPLEMENTATION_CONTRACT_KEY: &str = "erc404_stake_contract";

/// The proxy admin contract key in the deployments file
pub const PROXY_ADMIN_CONTRACT_KEY: &str = "erc404_stake_proxy_admin_contract";
