//! Surfaces a task's terminal outcome to the operator

use tracing::{error, info};

use crate::{
    constants::ERC404_STAKE_ARTIFACT,
    errors::TaskError,
    executor::{TaskOutcome, TaskSuccess},
};

/// The lines describing an outcome, in the order they are printed
pub fn summary_lines(outcome: &TaskOutcome) -> Vec<String> {
    match outcome {
        TaskOutcome::Succeeded {
            success: TaskSuccess::Deployed(result),
            ..
        } => {
            let mut lines = vec![format!(
                "{} deployed: {}",
                ERC404_STAKE_ARTIFACT, result.contract_address
            )];
            if let Some(receipt) = &result.receipt {
                lines.push(format!("implementation: {}", receipt.implementation_address));
                if let Some(admin) = receipt.proxy_admin_address {
                    lines.push(format!("proxy admin: {}", admin));
                }
                lines.push(format!("transaction: {}", receipt.transaction_hash));
                if let Some(block_number) = receipt.block_number {
                    lines.push(format!("block: {}", block_number));
                }
            }
            lines
        }
        TaskOutcome::Succeeded {
            success: TaskSuccess::Verified(receipt),
            ..
        } => vec![format!(
            "Verified {}: {}",
            receipt.contract_address, receipt.message
        )],
        TaskOutcome::Aborted { task, error } => {
            vec![format!("{} aborted: {}: {}", task.name(), error.kind(), error)]
        }
        TaskOutcome::Failed { task, step, error } => vec![format!(
            "{} failed at {}: {}: {}",
            task.name(),
            step,
            error.kind(),
            error
        )],
    }
}

/// Report an outcome: successes on stdout, failures through the error log
pub fn report(outcome: &TaskOutcome) {
    let lines = summary_lines(outcome);
    match outcome {
        TaskOutcome::Succeeded { .. } => {
            for line in &lines {
                println!("{}", line);
            }
            info!("{} succeeded", outcome.task().name());
        }
        TaskOutcome::Aborted { .. } | TaskOutcome::Failed { .. } => {
            for line in &lines {
                error!("{}", line);
            }
        }
    }
}

/// Report an error raised before the task could be run, e.g. while
/// parsing its arguments
pub fn report_input_error(task: &str, err: &TaskError) {
    error!("{} rejected: {}: {}", task, err.kind(), err);
}
