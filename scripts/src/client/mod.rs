//! Interfaces to the external collaborators a task drives: the chain, via an
//! RPC client, and the block explorer.
//!
//! Live implementations live in the submodules; tests substitute their own.

use std::{future::Future, pin::Pin};

use crate::{
    artifacts::ContractArtifact,
    errors::TaskError,
    types::{
        DeploymentResult, InitializerArg, PendingDeployment, VerificationReceipt,
        VerificationRequest,
    },
};

pub mod chain;
pub mod explorer;

pub use chain::AlloyChainClient;
pub use explorer::{EtherscanClient, NoExplorer};

/// Boxed future returned by collaborator calls, keeping the traits dyn-compatible
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TaskError>> + Send + 'a>>;

/// The blockchain client used by the deploy sequence
pub trait ChainClient: Send + Sync {
    /// Resolve a contract's build artifact by its registered name
    fn resolve_artifact<'a>(&'a self, name: &'a str) -> ClientFuture<'a, ContractArtifact>;

    /// Deploy the artifact behind an upgradeable proxy, initialized by calling
    /// `initializer` with `args`.
    ///
    /// Returns once the proxy deployment transaction has been submitted.
    fn submit_proxy_deployment<'a>(
        &'a self,
        artifact: &'a ContractArtifact,
        initializer: &'a str,
        args: &'a [InitializerArg],
    ) -> ClientFuture<'a, PendingDeployment>;

    /// Wait for a submitted proxy deployment to be confirmed on-chain
    fn await_confirmation(&self, pending: PendingDeployment)
        -> ClientFuture<'_, DeploymentResult>;
}

/// The block explorer used by the verify sequence
pub trait ExplorerClient: Send + Sync {
    /// Submit a contract for source verification and wait for the verdict
    fn submit_verification(
        &self,
        request: VerificationRequest,
    ) -> ClientFuture<'_, VerificationReceipt>;
}
