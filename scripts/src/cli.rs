//! Definitions of CLI arguments and commands for the deploy and verify tasks

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    artifacts::ArtifactRegistry,
    client::{AlloyChainClient, EtherscanClient, ExplorerClient, NoExplorer},
    config::ScriptConfig,
    constants::{DEFAULT_ARTIFACTS_DIR, DEFAULT_NETWORK, PRIVATE_KEY_ENV_VAR},
    errors::TaskError,
    executor::{check_parameters, TaskExecutor},
    reporter::{report, report_input_error},
    schema::{ResolvedParameters, TaskRegistry},
    tasks::{task_registry, Task},
    utils::parse_task_args,
};

/// The exit code reported when a task does not succeed
const FAILURE_EXIT_CODE: u8 = 1;

/// Deploy and verify the ERC404Stake contract
#[derive(Parser)]
#[command(name = "erc404-scripts")]
pub struct Cli {
    /// Name of the network to run against
    #[arg(short, long, default_value = DEFAULT_NETWORK)]
    pub network: String,

    /// Network RPC URL, overriding the network's default endpoint
    #[arg(short, long)]
    pub rpc_url: Option<String>,

    /// Private key of the deployer
    #[arg(short, long, env = PRIVATE_KEY_ENV_VAR, hide_env_values = true)]
    pub priv_key: Option<String>,

    /// Directory holding the compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// Path to a `deployments.json` file recording deployed addresses
    #[arg(short, long)]
    pub deployments_path: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The top-level commands
#[derive(Subcommand)]
pub enum Command {
    /// List the registered tasks and their parameters
    Tasks,
    /// Run a registered task
    Run(RunArgs),
}

/// Run a task, e.g. `run deploy --name Test --ratio 0.5`
#[derive(Args)]
pub struct RunArgs {
    /// Name of the task to run
    pub task: String,

    /// Task parameters, as `--key value` or `--key=value`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub params: Vec<String>,
}

impl Command {
    /// Run the command, returning the process exit code.
    ///
    /// Errors are returned only when the crate itself cannot be set up; task
    /// failures are reported and mapped to a failing exit code.
    pub async fn run(self, config: &ScriptConfig) -> Result<u8, TaskError> {
        let registry = task_registry()?;
        match self {
            Command::Tasks => {
                list_tasks(&registry);
                Ok(0)
            }
            Command::Run(args) => run_task(&registry, args, config).await,
        }
    }
}

/// Print every task with its parameters, types and defaults
fn list_tasks(registry: &TaskRegistry) {
    for task in registry.tasks() {
        println!("{}: {}", task.name(), task.description());
        for param in task.params() {
            println!(
                "    --{} <{}>  {} (default: {})",
                param.key, param.param_type, param.description, param.default
            );
        }
    }
}

/// Resolve the raw task arguments against the task's declaration
fn resolve_inputs(
    registry: &TaskRegistry,
    args: &RunArgs,
) -> Result<(Task, ResolvedParameters), TaskError> {
    let raw_inputs = parse_task_args(&args.params)?;
    let definition = registry.get(&args.task)?;
    definition.reject_unknown(&raw_inputs)?;
    let resolved = definition.resolve(&raw_inputs)?;

    Ok((Task::from_name(definition.name())?, resolved))
}

/// Set up the collaborators and run the task named in `args`
async fn run_task(
    registry: &TaskRegistry,
    args: RunArgs,
    config: &ScriptConfig,
) -> Result<u8, TaskError> {
    let (task, resolved) = match resolve_inputs(registry, &args) {
        Ok(resolved) => resolved,
        Err(e) => {
            report_input_error(&args.task, &e);
            return Ok(FAILURE_EXIT_CODE);
        }
    };
    if let Some(aborted) = check_parameters(task, &resolved) {
        report(&aborted);
        return Ok(aborted.exit_code());
    }

    let artifacts = ArtifactRegistry::load(&config.artifacts_dir)?;
    let chain = AlloyChainClient::new(
        &config.network,
        config.private_key.as_deref(),
        artifacts.clone(),
    )?;
    let explorer: Box<dyn ExplorerClient> = match &config.network.explorer {
        Some(explorer) => Box::new(EtherscanClient::new(explorer.clone(), artifacts)),
        None => Box::new(NoExplorer::new(&config.network.name)),
    };

    let executor = TaskExecutor::new(config, &chain, explorer.as_ref());
    let outcome = executor.run(task, &resolved).await;
    report(&outcome);
    executor.record_deployment(&outcome);

    Ok(outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{config::NetworkConfig, schema::ParamValue, tasks::DeployVariant};

    /// A configuration whose RPC URL cannot be parsed
    fn unreachable_config(artifacts_dir: PathBuf) -> ScriptConfig {
        ScriptConfig {
            network: NetworkConfig::resolve("localhost", Some("not a url".to_string()), |_| None)
                .unwrap(),
            private_key: None,
            artifacts_dir,
            deployments_path: None,
        }
    }

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Run(args) => args,
            Command::Tasks => panic!("expected a run command"),
        }
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "erc404-scripts",
            "--network",
            "bsctestnet",
            "run",
            "deploy",
            "--name",
            "Test",
            "--ratio=0.5",
        ])
        .unwrap();
        assert_eq!(cli.network, "bsctestnet");
        assert_eq!(cli.artifacts, PathBuf::from(DEFAULT_ARTIFACTS_DIR));

        let Command::Run(args) = cli.command else {
            panic!("expected a run command");
        };
        assert_eq!(args.task, "deploy");
        assert_eq!(args.params, ["--name", "Test", "--ratio=0.5"]);
    }

    #[test]
    fn test_resolve_inputs() {
        let registry = task_registry().unwrap();
        let args = run_args(&["erc404-scripts", "run", "deploy-no-mintlimit", "--permax", "3"]);

        let (task, resolved) = resolve_inputs(&registry, &args).unwrap();
        assert_eq!(task, Task::Deploy(DeployVariant::WithoutMintLimit));
        assert_eq!(resolved.get("permax"), Some(&ParamValue::Int(3)));
        assert_eq!(resolved.get("mintlimit"), None);
    }

    #[test]
    fn test_resolve_inputs_rejects_bad_input() {
        let registry = task_registry().unwrap();

        let args = run_args(&["erc404-scripts", "run", "deploy", "--permax", "ten"]);
        assert_matches!(
            resolve_inputs(&registry, &args),
            Err(TaskError::TypeCoercion { .. })
        );

        let args = run_args(&["erc404-scripts", "run", "deploy", "--colour", "red"]);
        assert_matches!(
            resolve_inputs(&registry, &args),
            Err(TaskError::UnknownParameter(key)) if key == "colour"
        );

        let args = run_args(&["erc404-scripts", "run", "redeploy"]);
        assert_matches!(
            resolve_inputs(&registry, &args),
            Err(TaskError::UnknownTask(_))
        );
    }

    #[tokio::test]
    async fn test_invalid_input_reported_before_client_setup() {
        let registry = task_registry().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = unreachable_config(dir.path().join("artifacts"));

        let args = run_args(&["erc404-scripts", "run", "deploy", "--staketoken", "not-an-address"]);
        assert_eq!(run_task(&registry, args, &config).await, Ok(FAILURE_EXIT_CODE));

        let args = run_args(&["erc404-scripts", "run", "deploy"]);
        assert_matches!(
            run_task(&registry, args, &config).await,
            Err(TaskError::ClientInitialization(_))
        );
    }
}
