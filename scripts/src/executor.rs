//! Runs a resolved task: validates its parameters, then drives the ordered
//! collaborator steps of the deploy or verify sequence

use std::fmt::{self, Display};

use tracing::{info, warn};

use crate::{
    client::{ChainClient, ExplorerClient},
    config::ScriptConfig,
    constants::{
        ERC404_STAKE_ARTIFACT, ERC404_STAKE_SOURCE_IDENTITY, IMPLEMENTATION_CONTRACT_KEY,
        INITIALIZER_NAME, PROXY_ADMIN_CONTRACT_KEY, PROXY_CONTRACT_KEY,
    },
    errors::TaskError,
    schema::ResolvedParameters,
    tasks::{DeployParams, DeployVariant, Task, VerifyParams},
    types::{DeploymentResult, VerificationReceipt, VerificationRequest},
    utils::write_deployed_addresses,
};

/// The lifecycle of a single task invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Nothing has happened yet
    Idle,
    /// The resolved parameters are being checked
    Validating,
    /// Validation failed; no collaborator was called
    Aborted,
    /// The collaborator steps are running
    Executing,
    /// Every step completed
    Succeeded,
    /// A collaborator step failed
    Failed,
}

impl Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            TaskState::Idle => "idle",
            TaskState::Validating => "validating",
            TaskState::Aborted => "aborted",
            TaskState::Executing => "executing",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
        };
        f.write_str(state)
    }
}

/// A side-effecting step of a task's execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStep {
    /// Look up the contract's build artifact
    ResolveArtifact,
    /// Deploy the implementation and submit the proxy deployment
    SubmitProxyDeployment,
    /// Wait for the proxy deployment receipt
    AwaitConfirmation,
    /// Submit the contract's source to the explorer
    SubmitVerification,
}

impl Display for ExecutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            ExecutionStep::ResolveArtifact => "ResolveArtifact",
            ExecutionStep::SubmitProxyDeployment => "SubmitProxyDeployment",
            ExecutionStep::AwaitConfirmation => "AwaitConfirmation",
            ExecutionStep::SubmitVerification => "SubmitVerification",
        };
        f.write_str(step)
    }
}

/// What a successful task produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSuccess {
    /// The contract was deployed behind a proxy
    Deployed(DeploymentResult),
    /// The explorer accepted the contract's source
    Verified(VerificationReceipt),
}

/// The terminal outcome of a task invocation
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Every step completed
    Succeeded {
        /// The task that ran
        task: Task,
        /// What the task produced
        success: TaskSuccess,
    },
    /// Validation failed before any collaborator was called
    Aborted {
        /// The task that ran
        task: Task,
        /// The validation error
        error: TaskError,
    },
    /// A collaborator step failed
    Failed {
        /// The task that ran
        task: Task,
        /// The step that failed
        step: ExecutionStep,
        /// The collaborator's error
        error: TaskError,
    },
}

impl TaskOutcome {
    /// The terminal state this outcome corresponds to
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Succeeded { .. } => TaskState::Succeeded,
            TaskOutcome::Aborted { .. } => TaskState::Aborted,
            TaskOutcome::Failed { .. } => TaskState::Failed,
        }
    }

    /// The task this outcome belongs to
    pub fn task(&self) -> Task {
        match self {
            TaskOutcome::Succeeded { task, .. }
            | TaskOutcome::Aborted { task, .. }
            | TaskOutcome::Failed { task, .. } => *task,
        }
    }

    /// The error that ended the task, if it did not succeed
    pub fn error(&self) -> Option<&TaskError> {
        match self {
            TaskOutcome::Succeeded { .. } => None,
            TaskOutcome::Aborted { error, .. } | TaskOutcome::Failed { error, .. } => Some(error),
        }
    }

    /// The process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            TaskOutcome::Succeeded { .. } => 0,
            TaskOutcome::Aborted { .. } | TaskOutcome::Failed { .. } => 1,
        }
    }
}

/// A task's parameters after validation
enum ValidatedParams {
    /// Parameters of a deploy variant
    Deploy(DeployVariant, DeployParams),
    /// Parameters of the verify task
    Verify(VerifyParams),
}

/// A failed collaborator step
type StepFailure = (ExecutionStep, TaskError);

/// Attach the failing step to a collaborator error
fn at(step: ExecutionStep) -> impl FnOnce(TaskError) -> StepFailure {
    move |error| (step, error)
}

/// Runs tasks against borrowed collaborators
pub struct TaskExecutor<'a> {
    /// The invocation's configuration
    config: &'a ScriptConfig,
    /// The blockchain client
    chain: &'a dyn ChainClient,
    /// The block explorer
    explorer: &'a dyn ExplorerClient,
}

impl<'a> TaskExecutor<'a> {
    /// Creates an executor driving the given collaborators
    pub fn new(
        config: &'a ScriptConfig,
        chain: &'a dyn ChainClient,
        explorer: &'a dyn ExplorerClient,
    ) -> Self {
        Self {
            config,
            chain,
            explorer,
        }
    }

    /// Run the task to completion, returning its terminal outcome
    pub async fn run(&self, task: Task, params: &ResolvedParameters) -> TaskOutcome {
        transition(task, TaskState::Idle, TaskState::Validating);
        let validated = match validate(task, params) {
            Ok(validated) => validated,
            Err(error) => {
                transition(task, TaskState::Validating, TaskState::Aborted);
                return TaskOutcome::Aborted { task, error };
            }
        };

        transition(task, TaskState::Validating, TaskState::Executing);
        info!("running {} on {}", task.name(), self.config.network.name);
        let result = match validated {
            ValidatedParams::Deploy(variant, params) => {
                self.run_deploy(variant, &params).await.map(TaskSuccess::Deployed)
            }
            ValidatedParams::Verify(params) => {
                self.run_verify(&params).await.map(TaskSuccess::Verified)
            }
        };

        match result {
            Ok(success) => {
                transition(task, TaskState::Executing, TaskState::Succeeded);
                TaskOutcome::Succeeded { task, success }
            }
            Err((step, error)) => {
                transition(task, TaskState::Executing, TaskState::Failed);
                TaskOutcome::Failed { task, step, error }
            }
        }
    }

    /// Record a successful deployment in the deployments file, if one is
    /// configured. Failures are logged, never surfaced.
    pub fn record_deployment(&self, outcome: &TaskOutcome) {
        let (Some(path), TaskOutcome::Succeeded { success: TaskSuccess::Deployed(result), .. }) =
            (&self.config.deployments_path, outcome)
        else {
            return;
        };

        let mut addresses = vec![(PROXY_CONTRACT_KEY, result.contract_address)];
        if let Some(receipt) = &result.receipt {
            addresses.push((IMPLEMENTATION_CONTRACT_KEY, receipt.implementation_address));
            if let Some(admin) = receipt.proxy_admin_address {
                addresses.push((PROXY_ADMIN_CONTRACT_KEY, admin));
            }
        }

        match write_deployed_addresses(path, &self.config.network.name, &addresses) {
            Ok(()) => info!("recorded deployment in {}", path.display()),
            Err(e) => warn!("could not record deployment in {}: {}", path.display(), e),
        }
    }

    /// The deploy sequence shared by both variants, which differ only in
    /// their initializer arguments
    async fn run_deploy(
        &self,
        variant: DeployVariant,
        params: &DeployParams,
    ) -> Result<DeploymentResult, StepFailure> {
        let artifact = self
            .chain
            .resolve_artifact(ERC404_STAKE_ARTIFACT)
            .await
            .map_err(at(ExecutionStep::ResolveArtifact))?;

        let args = variant.initializer_args(params);
        let pending = self
            .chain
            .submit_proxy_deployment(&artifact, INITIALIZER_NAME, &args)
            .await
            .map_err(at(ExecutionStep::SubmitProxyDeployment))?;
        info!("proxy deployment submitted in {}", pending.transaction_hash);

        self.chain
            .await_confirmation(pending)
            .await
            .map_err(at(ExecutionStep::AwaitConfirmation))
    }

    /// The verify sequence
    async fn run_verify(&self, params: &VerifyParams) -> Result<VerificationReceipt, StepFailure> {
        let request = VerificationRequest {
            contract_address: params.contract,
            source_identity: ERC404_STAKE_SOURCE_IDENTITY.to_string(),
            // Proxied contracts are constructed without arguments
            constructor_arguments: Vec::new(),
        };

        self.explorer
            .submit_verification(request)
            .await
            .map_err(at(ExecutionStep::SubmitVerification))
    }
}

/// Validate a task's parameters without running it, returning the aborted
/// outcome if they fail.
///
/// Lets callers reject bad input before setting up any collaborator.
pub fn check_parameters(task: Task, params: &ResolvedParameters) -> Option<TaskOutcome> {
    let error = validate(task, params).err()?;
    transition(task, TaskState::Idle, TaskState::Validating);
    transition(task, TaskState::Validating, TaskState::Aborted);
    Some(TaskOutcome::Aborted { task, error })
}

/// Check the resolved parameters against the task's on-chain constraints
fn validate(task: Task, params: &ResolvedParameters) -> Result<ValidatedParams, TaskError> {
    match task {
        Task::Deploy(variant) => {
            DeployParams::from_resolved(variant, params).map(|p| ValidatedParams::Deploy(variant, p))
        }
        Task::VerifyContract => VerifyParams::from_resolved(params).map(ValidatedParams::Verify),
    }
}

/// Log a state transition
fn transition(task: Task, from: TaskState, to: TaskState) {
    info!("{}: {} -> {}", task.name(), from, to);
}
