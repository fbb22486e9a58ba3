//! The live blockchain client, deploying through an `alloy` provider

use std::{fmt::Display, str::FromStr};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    sol_types::SolValue,
};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::{
    artifacts::{ArtifactRegistry, ContractArtifact},
    config::NetworkConfig,
    constants::{
        NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, NUM_DEPLOY_CONFIRMATIONS,
        PROXY_ADMIN_STORAGE_SLOT, PROXY_ARTIFACT,
    },
    errors::TaskError,
    types::{DeploymentReceipt, DeploymentResult, InitializerArg, PendingDeployment},
};

use super::{ChainClient, ClientFuture};

/// A chain client backed by an HTTP RPC provider and the local build artifacts
pub struct AlloyChainClient {
    /// The RPC provider, with the deployer's wallet attached if one is configured
    provider: DynProvider,
    /// The deployer's address, `None` when no signer is configured
    deployer: Option<Address>,
    /// The chain ID the RPC endpoint is expected to report
    chain_id: u64,
    /// The artifacts available for deployment
    artifacts: ArtifactRegistry,
}

impl AlloyChainClient {
    /// Sets up the client for the given network.
    ///
    /// Without a private key the client has an empty signer set: it can still
    /// resolve artifacts, but every submission fails.
    pub fn new(
        network: &NetworkConfig,
        private_key: Option<&str>,
        artifacts: ArtifactRegistry,
    ) -> Result<Self, TaskError> {
        let url = Url::parse(&network.rpc_url)
            .map_err(|e| TaskError::ClientInitialization(e.to_string()))?;

        let (provider, deployer) = match private_key {
            Some(private_key) => {
                let signer = PrivateKeySigner::from_str(private_key)
                    .map_err(|e| TaskError::ClientInitialization(e.to_string()))?;
                let deployer = signer.address();
                let provider = ProviderBuilder::new().wallet(signer).connect_http(url);
                (DynProvider::new(provider), Some(deployer))
            }
            None => {
                warn!("no private key configured, transactions cannot be signed");
                let provider = ProviderBuilder::new().connect_http(url);
                (DynProvider::new(provider), None)
            }
        };

        Ok(Self {
            provider,
            deployer,
            chain_id: network.chain_id,
            artifacts,
        })
    }

    /// Deploy the given creation code, waiting for the deployment to succeed
    async fn deploy_code(&self, code: Bytes) -> Result<Address, TaskError> {
        let tx = TransactionRequest::default().with_deploy_code(code);
        let receipt = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?
            .with_required_confirmations(NUM_DEPLOY_CONFIRMATIONS)
            .get_receipt()
            .await
            .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?;

        deployed_address(&receipt)
    }

    /// Check that the RPC endpoint serves the configured network's chain
    async fn ensure_chain_id(&self) -> Result<(), TaskError> {
        let reported = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?;
        check_chain_id(self.chain_id, reported)
    }

    /// Read the proxy admin address from the proxy's EIP-1967 admin slot
    async fn proxy_admin(&self, proxy: Address) -> Result<Address, TaskError> {
        let slot = U256::from_str(PROXY_ADMIN_STORAGE_SLOT)
            .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?;
        let word = self
            .provider
            .get_storage_at(proxy, slot)
            .await
            .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?;

        Ok(Address::from_slice(
            &word.to_be_bytes::<NUM_BYTES_STORAGE_SLOT>()
                [NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT],
        ))
    }
}

impl ChainClient for AlloyChainClient {
    fn resolve_artifact<'a>(&'a self, name: &'a str) -> ClientFuture<'a, ContractArtifact> {
        Box::pin(async move { self.artifacts.resolve(name).cloned() })
    }

    fn submit_proxy_deployment<'a>(
        &'a self,
        artifact: &'a ContractArtifact,
        initializer: &'a str,
        args: &'a [InitializerArg],
    ) -> ClientFuture<'a, PendingDeployment> {
        Box::pin(async move {
            let owner = self.deployer.ok_or_else(|| {
                TaskError::NetworkSubmission("no signer configured".to_string())
            })?;
            let proxy_artifact = self.artifacts.resolve(PROXY_ARTIFACT)?;
            let init_calldata = initializer_calldata(artifact, initializer, args)?;
            self.ensure_chain_id().await?;

            // Deploy the implementation contract
            let implementation_address = self.deploy_code(artifact.bytecode.clone()).await?;
            info!(
                "{} implementation deployed at {}",
                artifact.contract_name, implementation_address
            );

            // Deploy the proxy, which calls the initializer on construction
            let constructor_args =
                (implementation_address, owner, Bytes::from(init_calldata)).abi_encode_params();
            let code: Bytes = [&proxy_artifact.bytecode[..], &constructor_args[..]]
                .concat()
                .into();

            let tx = TransactionRequest::default().with_deploy_code(code);
            let pending_tx = self
                .provider
                .send_transaction(tx)
                .await
                .map_err(|e| partial_deployment_error(implementation_address, e))?;
            debug!("proxy deployment submitted in {}", pending_tx.tx_hash());

            Ok(PendingDeployment {
                transaction_hash: *pending_tx.tx_hash(),
                implementation_address,
            })
        })
    }

    fn await_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> ClientFuture<'_, DeploymentResult> {
        Box::pin(async move {
            let receipt =
                PendingTransactionBuilder::new(self.provider.root().clone(), pending.transaction_hash)
                    .with_required_confirmations(NUM_DEPLOY_CONFIRMATIONS)
                    .get_receipt()
                    .await
                    .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?;
            let contract_address = deployed_address(&receipt)?;

            // The deployment has landed at this point, so a failed admin lookup
            // is only reported
            let proxy_admin_address = match self.proxy_admin(contract_address).await {
                Ok(admin) => Some(admin),
                Err(e) => {
                    warn!("could not read proxy admin of {}: {}", contract_address, e);
                    None
                }
            };

            Ok(DeploymentResult {
                contract_address,
                receipt: Some(DeploymentReceipt {
                    transaction_hash: receipt.transaction_hash,
                    block_number: receipt.block_number,
                    implementation_address: pending.implementation_address,
                    proxy_admin_address,
                }),
            })
        })
    }
}

/// Compare the chain ID reported by the RPC endpoint against the network's
fn check_chain_id(expected: u64, reported: u64) -> Result<(), TaskError> {
    if expected != reported {
        return Err(TaskError::NetworkSubmission(format!(
            "RPC endpoint reports chain ID {}, but the network's chain ID is {}",
            reported, expected
        )));
    }
    Ok(())
}

/// The error for a proxy submission that failed after the implementation
/// was deployed, naming the implementation left on-chain
fn partial_deployment_error(implementation: Address, err: impl Display) -> TaskError {
    TaskError::NetworkSubmission(format!(
        "implementation {} deployed, proxy submission failed: {}",
        implementation, err
    ))
}

/// The address of the contract created by a successful deployment transaction
fn deployed_address(receipt: &TransactionReceipt) -> Result<Address, TaskError> {
    if !ReceiptResponse::status(receipt) {
        return Err(TaskError::NetworkSubmission(format!(
            "deployment transaction {} reverted",
            receipt.transaction_hash
        )));
    }

    receipt.contract_address.ok_or_else(|| {
        TaskError::NetworkSubmission(format!(
            "transaction {} did not create a contract",
            receipt.transaction_hash
        ))
    })
}

/// Prepare calldata for the artifact's initializer, selecting the overload
/// by arity and checking each argument against its ABI type
pub(crate) fn initializer_calldata(
    artifact: &ContractArtifact,
    initializer: &str,
    args: &[InitializerArg],
) -> Result<Vec<u8>, TaskError> {
    let function = artifact
        .abi
        .function(initializer)
        .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args.len()))
        .ok_or_else(|| {
            TaskError::CalldataConstruction(format!(
                "`{}` has no `{}` taking {} arguments",
                artifact.contract_name,
                initializer,
                args.len()
            ))
        })?;

    let values = function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .map_err(|e| TaskError::CalldataConstruction(e.to_string()))?;
            to_sol_value(&param.name, arg, &ty)
        })
        .collect::<Result<Vec<_>, _>>()?;

    function
        .abi_encode_input(&values)
        .map_err(|e| TaskError::CalldataConstruction(e.to_string()))
}

/// Convert an initializer argument to the given ABI type
fn to_sol_value(
    name: &str,
    arg: &InitializerArg,
    ty: &DynSolType,
) -> Result<DynSolValue, TaskError> {
    match (arg, ty) {
        (InitializerArg::String(s), DynSolType::String) => Ok(DynSolValue::String(s.clone())),
        (InitializerArg::Uint(v), DynSolType::Uint(size)) if v.bit_len() <= *size => {
            Ok(DynSolValue::Uint(*v, *size))
        }
        (InitializerArg::Address(a), DynSolType::Address) => Ok(DynSolValue::Address(*a)),
        _ => Err(TaskError::CalldataConstruction(format!(
            "argument `{}` = {} does not fit ABI type {}",
            name,
            arg,
            ty.sol_type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        json_abi::JsonAbi,
        primitives::{address, keccak256},
    };
    use serde_json::json;

    use super::*;

    /// An artifact exposing both initializer shapes
    fn artifact() -> ContractArtifact {
        let param = |name: &str, ty: &str| json!({ "name": name, "type": ty, "internalType": ty });
        let abi: JsonAbi = serde_json::from_value(json!([
            {
                "type": "function",
                "name": "initialize",
                "stateMutability": "nonpayable",
                "inputs": [
                    param("name_", "string"), param("symbol_", "string"), param("uri_", "string"),
                    param("perMax_", "uint256"), param("nftUnit_", "uint256"),
                    param("stakeToken_", "address"), param("ratio_", "uint256")
                ],
                "outputs": []
            },
            {
                "type": "function",
                "name": "initialize",
                "stateMutability": "nonpayable",
                "inputs": [
                    param("name_", "string"), param("symbol_", "string"), param("uri_", "string"),
                    param("perMax_", "uint8"), param("nftUnit_", "uint256"),
                    param("mintLimit_", "uint256"), param("stakeToken_", "address"),
                    param("ratio_", "uint256")
                ],
                "outputs": []
            }
        ]))
        .unwrap();

        ContractArtifact {
            contract_name: "ERC404Stake".to_string(),
            source_name: "contracts/ERC404Stake.sol".to_string(),
            abi,
            bytecode: Bytes::new(),
        }
    }

    fn args(permax: u64, with_mint_limit: bool) -> Vec<InitializerArg> {
        let mut args = vec![
            InitializerArg::from("Test"),
            InitializerArg::from("TST"),
            InitializerArg::from("ipfs://x"),
            InitializerArg::from(U256::from(permax)),
            InitializerArg::from(U256::from(10_000)),
        ];
        if with_mint_limit {
            args.push(InitializerArg::from(U256::from(10_000)));
        }
        args.push(InitializerArg::from(address!("20cD8eB93c50BDAc35d6A526f499c0104958e3F6")));
        args.push(InitializerArg::from(U256::from(10_000)));
        args
    }

    #[test]
    fn test_chain_id_mismatch_rejected() {
        assert!(check_chain_id(97, 97).is_ok());

        let err = check_chain_id(12077, 97).unwrap_err();
        assert_eq!(err.kind(), "NetworkSubmissionError");
        let message = err.to_string();
        assert!(message.contains("12077") && message.contains("97"), "{message}");
    }

    #[test]
    fn test_partial_deployment_names_implementation() {
        let implementation = address!("000000000000000000000000000000000000dEaD");
        let err = partial_deployment_error(implementation, "nonce too low");

        assert_eq!(err.kind(), "NetworkSubmissionError");
        let message = err.to_string();
        assert!(message.contains(&implementation.to_string()), "{message}");
        assert!(message.contains("nonce too low"), "{message}");
    }

    #[test]
    fn test_overload_selected_by_arity() {
        let artifact = artifact();

        let calldata = initializer_calldata(&artifact, "initialize", &args(1, false)).unwrap();
        let hash = keccak256("initialize(string,string,string,uint256,uint256,address,uint256)");
        assert_eq!(&calldata[..4], &hash[..4]);

        let calldata = initializer_calldata(&artifact, "initialize", &args(1, true)).unwrap();
        let hash =
            keccak256("initialize(string,string,string,uint8,uint256,uint256,address,uint256)");
        assert_eq!(&calldata[..4], &hash[..4]);
    }

    #[test]
    fn test_missing_initializer() {
        let artifact = artifact();
        let mut too_many = args(1, true);
        too_many.push(InitializerArg::from("extra"));

        for (name, args) in [("initialize", too_many), ("init", args(1, false))] {
            assert!(matches!(
                initializer_calldata(&artifact, name, &args),
                Err(TaskError::CalldataConstruction(_))
            ));
        }
    }

    #[test]
    fn test_argument_type_checked() {
        let artifact = artifact();

        // `perMax_` is a uint8 in the mint limit overload
        assert!(initializer_calldata(&artifact, "initialize", &args(255, true)).is_ok());
        assert!(initializer_calldata(&artifact, "initialize", &args(256, true)).is_err());

        let mut swapped = args(1, false);
        swapped.swap(0, 5);
        assert!(initializer_calldata(&artifact, "initialize", &swapped).is_err());
    }
}
