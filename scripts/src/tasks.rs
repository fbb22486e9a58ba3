//! Definitions of the registered tasks and typed views over their parameters

use alloy::primitives::{Address, U256};

use crate::{
    constants::ZERO_ADDRESS,
    errors::TaskError,
    schema::{ParamType, ParamValue, ResolvedParameters, TaskDefinition, TaskRegistry},
    types::InitializerArg,
    utils::{parse_address_param, scale_ratio, uint_param},
};

/// The name of the deploy task which passes a mint limit to the initializer
pub const DEPLOY_TASK: &str = "deploy";
/// The name of the deploy task whose initializer takes no mint limit
pub const DEPLOY_NO_MINT_LIMIT_TASK: &str = "deploy-no-mintlimit";
/// The name of the verify task
pub const VERIFY_CONTRACT_TASK: &str = "verify-contract";

/// Parameter keys
pub mod keys {
    /// Address of the contract to verify
    pub const CONTRACT: &str = "contract";
    /// Token name
    pub const NAME: &str = "name";
    /// Token symbol
    pub const SYMBOL: &str = "symbol";
    /// Token metadata URI
    pub const URI: &str = "uri";
    /// Per-address NFT holding cap
    pub const PERMAX: &str = "permax";
    /// Smallest fractional unit of an NFT
    pub const NFTUINT: &str = "nftuint";
    /// NFT mint limit
    pub const MINTLIMIT: &str = "mintlimit";
    /// Stake token address
    pub const STAKETOKEN: &str = "staketoken";
    /// Exchange ratio against the stake token
    pub const RATIO: &str = "ratio";
}

/// The two shapes of the contract's initializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployVariant {
    /// `initialize(name, symbol, uri, permax, nftuint, mintlimit, staketoken, ratio)`
    WithMintLimit,
    /// `initialize(name, symbol, uri, permax, nftuint, staketoken, ratio)`.
    ///
    /// This variant does not declare `mintlimit` at all.
    WithoutMintLimit,
}

impl DeployVariant {
    /// The task this variant is registered under
    pub fn task_name(self) -> &'static str {
        match self {
            DeployVariant::WithMintLimit => DEPLOY_TASK,
            DeployVariant::WithoutMintLimit => DEPLOY_NO_MINT_LIMIT_TASK,
        }
    }

    /// Build the initializer's positional arguments
    pub fn initializer_args(self, params: &DeployParams) -> Vec<InitializerArg> {
        let mut args: Vec<InitializerArg> = vec![
            params.name.as_str().into(),
            params.symbol.as_str().into(),
            params.uri.as_str().into(),
            params.permax.into(),
            params.nftuint.into(),
        ];
        if let (DeployVariant::WithMintLimit, Some(mintlimit)) = (self, params.mintlimit) {
            args.push(mintlimit.into());
        }
        args.push(params.staketoken.into());
        args.push(params.scaled_ratio.into());
        args
    }
}

/// A task the executor knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Deploy the contract behind an upgradeable proxy
    Deploy(DeployVariant),
    /// Verify a deployed contract's source on the explorer
    VerifyContract,
}

impl Task {
    /// Map a registered task name to the task
    pub fn from_name(name: &str) -> Result<Self, TaskError> {
        match name {
            DEPLOY_TASK => Ok(Task::Deploy(DeployVariant::WithMintLimit)),
            DEPLOY_NO_MINT_LIMIT_TASK => Ok(Task::Deploy(DeployVariant::WithoutMintLimit)),
            VERIFY_CONTRACT_TASK => Ok(Task::VerifyContract),
            _ => Err(TaskError::UnknownTask(name.to_string())),
        }
    }

    /// The task's registered name
    pub fn name(self) -> &'static str {
        match self {
            Task::Deploy(variant) => variant.task_name(),
            Task::VerifyContract => VERIFY_CONTRACT_TASK,
        }
    }
}

/// Validated deploy parameters, in on-chain representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployParams {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Token metadata URI
    pub uri: String,
    /// Per-address NFT holding cap
    pub permax: U256,
    /// Smallest fractional unit of an NFT
    pub nftuint: U256,
    /// NFT mint limit, absent for [`DeployVariant::WithoutMintLimit`]
    pub mintlimit: Option<U256>,
    /// Stake token address
    pub staketoken: Address,
    /// The exchange ratio scaled by the fixed-point factor
    pub scaled_ratio: U256,
}

impl DeployParams {
    /// Validate resolved parameters for the given variant
    pub fn from_resolved(
        variant: DeployVariant,
        params: &ResolvedParameters,
    ) -> Result<Self, TaskError> {
        // Address parameters are checked before anything else
        let staketoken =
            parse_address_param(keys::STAKETOKEN, params.string(keys::STAKETOKEN)?)?;

        let mintlimit = match variant {
            DeployVariant::WithMintLimit => Some(uint_param(
                keys::MINTLIMIT,
                params.int(keys::MINTLIMIT)?,
            )?),
            DeployVariant::WithoutMintLimit => None,
        };

        Ok(Self {
            name: params.string(keys::NAME)?.to_string(),
            symbol: params.string(keys::SYMBOL)?.to_string(),
            uri: params.string(keys::URI)?.to_string(),
            permax: uint_param(keys::PERMAX, params.int(keys::PERMAX)?)?,
            nftuint: uint_param(keys::NFTUINT, params.int(keys::NFTUINT)?)?,
            mintlimit,
            staketoken,
            scaled_ratio: scale_ratio(keys::RATIO, params.float(keys::RATIO)?)?,
        })
    }
}

/// Validated verify parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyParams {
    /// The address of the contract to verify
    pub contract: Address,
}

impl VerifyParams {
    /// Validate resolved parameters for the verify task
    pub fn from_resolved(params: &ResolvedParameters) -> Result<Self, TaskError> {
        let contract = parse_address_param(keys::CONTRACT, params.string(keys::CONTRACT)?)?;
        Ok(Self { contract })
    }
}

/// Declare the token parameters shared by the deploy and verify tasks
fn declare_token_params(
    task: TaskDefinition,
    with_mint_limit: bool,
) -> Result<TaskDefinition, TaskError> {
    let empty = || ParamValue::String(String::new());

    let task = task
        .declare(keys::NAME, "name of erc404", empty(), ParamType::String)?
        .declare(keys::SYMBOL, "symbol of erc404", empty(), ParamType::String)?
        .declare(keys::URI, "metadata uri of erc404", empty(), ParamType::String)?
        .declare(
            keys::PERMAX,
            "the maximum holding limit of NFTs for a address.",
            ParamValue::Int(1),
            ParamType::Int,
        )?
        .declare(
            keys::NFTUINT,
            "NFT's smallest unit",
            ParamValue::Int(10_000),
            ParamType::Int,
        )?;

    let task = if with_mint_limit {
        task.declare(
            keys::MINTLIMIT,
            "mint nft limit",
            ParamValue::Int(10_000),
            ParamType::Int,
        )?
    } else {
        task
    };

    task.declare(
        keys::STAKETOKEN,
        "stake token address",
        ParamValue::String(ZERO_ADDRESS.to_string()),
        ParamType::String,
    )?
    .declare(
        keys::RATIO,
        "How many ERC404 tokens can be exchanged for one stake token",
        ParamValue::Float(1.),
        ParamType::Float,
    )
}

/// The definition of a deploy task variant
pub fn deploy_task(variant: DeployVariant) -> Result<TaskDefinition, TaskError> {
    let description = match variant {
        DeployVariant::WithMintLimit => "deploy erc404",
        DeployVariant::WithoutMintLimit => "deploy erc404 with an initializer taking no mint limit",
    };
    let task = TaskDefinition::new(variant.task_name(), description);
    declare_token_params(task, variant == DeployVariant::WithMintLimit)
}

/// The definition of the verify task.
///
/// The token parameters are declared so the deploy invocation can be reused
/// verbatim; only `contract` is read.
pub fn verify_task() -> Result<TaskDefinition, TaskError> {
    let task = TaskDefinition::new(VERIFY_CONTRACT_TASK, "verify erc404 contract").declare(
        keys::CONTRACT,
        "erc404 contract",
        ParamValue::String(String::new()),
        ParamType::String,
    )?;
    declare_token_params(task, true /* with_mint_limit */)
}

/// Build the registry of all tasks
pub fn task_registry() -> Result<TaskRegistry, TaskError> {
    let mut registry = TaskRegistry::default();
    registry.register(deploy_task(DeployVariant::WithMintLimit)?)?;
    registry.register(deploy_task(DeployVariant::WithoutMintLimit)?)?;
    registry.register(verify_task()?)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;
    use crate::schema::RawInputs;

    fn raw(pairs: &[(&str, &str)]) -> RawInputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_registered_tasks() {
        let registry = task_registry().unwrap();
        let names: Vec<_> = registry.tasks().map(|t| t.name()).collect();
        assert_eq!(names, [DEPLOY_TASK, DEPLOY_NO_MINT_LIMIT_TASK, VERIFY_CONTRACT_TASK]);

        let keys_of = |name: &str| -> Vec<String> {
            registry
                .get(name)
                .unwrap()
                .params()
                .iter()
                .map(|p| p.key.clone())
                .collect()
        };
        assert_eq!(
            keys_of(DEPLOY_TASK),
            ["name", "symbol", "uri", "permax", "nftuint", "mintlimit", "staketoken", "ratio"]
        );
        assert_eq!(
            keys_of(DEPLOY_NO_MINT_LIMIT_TASK),
            ["name", "symbol", "uri", "permax", "nftuint", "staketoken", "ratio"]
        );
        assert_eq!(
            keys_of(VERIFY_CONTRACT_TASK),
            [
                "contract", "name", "symbol", "uri", "permax", "nftuint", "mintlimit",
                "staketoken", "ratio"
            ]
        );
    }

    #[test]
    fn test_task_names_round_trip() {
        let registry = task_registry().unwrap();
        for definition in registry.tasks() {
            assert_eq!(Task::from_name(definition.name()).unwrap().name(), definition.name());
        }
        assert!(Task::from_name("deploy-everything").is_err());
    }

    #[test]
    fn test_defaults() {
        let registry = task_registry().unwrap();
        let resolved = registry.resolve(DEPLOY_TASK, &RawInputs::new()).unwrap();
        let params = DeployParams::from_resolved(DeployVariant::WithMintLimit, &resolved).unwrap();

        assert_eq!(params.permax, U256::from(1));
        assert_eq!(params.nftuint, U256::from(10_000));
        assert_eq!(params.mintlimit, Some(U256::from(10_000)));
        assert_eq!(params.staketoken, Address::ZERO);
        assert_eq!(params.scaled_ratio, U256::from(10_000));
    }

    #[test]
    fn test_initializer_args_per_variant() {
        let params = DeployParams {
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            uri: "ipfs://x".to_string(),
            permax: U256::from(1),
            nftuint: U256::from(10_000),
            mintlimit: Some(U256::from(500)),
            staketoken: address!("20cD8eB93c50BDAc35d6A526f499c0104958e3F6"),
            scaled_ratio: U256::from(5_000),
        };

        let with_limit = DeployVariant::WithMintLimit.initializer_args(&params);
        assert_eq!(with_limit.len(), 8);
        assert_eq!(with_limit[5], InitializerArg::Uint(U256::from(500)));
        assert_eq!(with_limit[6], InitializerArg::Address(params.staketoken));

        let without_limit = DeployVariant::WithoutMintLimit.initializer_args(&params);
        assert_eq!(without_limit.len(), 7);
        assert_eq!(without_limit[5], InitializerArg::Address(params.staketoken));
        assert_eq!(without_limit[6], InitializerArg::Uint(U256::from(5_000)));
    }

    #[test]
    fn test_without_mint_limit_rejects_mintlimit() {
        let registry = task_registry().unwrap();
        let definition = registry.get(DEPLOY_NO_MINT_LIMIT_TASK).unwrap();
        assert_eq!(
            definition.reject_unknown(&raw(&[("mintlimit", "5")])),
            Err(TaskError::UnknownParameter("mintlimit".to_string()))
        );
    }

    #[test]
    fn test_invalid_deploy_params() {
        let registry = task_registry().unwrap();
        let cases = [
            (raw(&[("staketoken", "not-an-address")]), "InvalidAddressError"),
            (raw(&[("permax", "-1")]), "InvalidParameterError"),
            (raw(&[("ratio", "0.00001")]), "InvalidParameterError"),
        ];

        for (input, kind) in cases {
            let resolved = registry.resolve(DEPLOY_TASK, &input).unwrap();
            let err = DeployParams::from_resolved(DeployVariant::WithMintLimit, &resolved)
                .unwrap_err();
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_verify_params() {
        let registry = task_registry().unwrap();

        let resolved = registry
            .resolve(VERIFY_CONTRACT_TASK, &raw(&[("contract", "0x000000000000000000000000000000000000dEaD")]))
            .unwrap();
        assert_eq!(
            VerifyParams::from_resolved(&resolved).unwrap().contract,
            address!("000000000000000000000000000000000000dEaD")
        );

        // The default contract is empty and therefore rejected
        let resolved = registry.resolve(VERIFY_CONTRACT_TASK, &RawInputs::new()).unwrap();
        assert!(matches!(
            VerifyParams::from_resolved(&resolved),
            Err(TaskError::InvalidAddress { .. })
        ));
    }
}
