//! The live explorer client, verifying sources through an Etherscan-compatible API

use std::time::Duration;

use alloy::primitives::hex;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{
    artifacts::ArtifactRegistry,
    config::ExplorerConfig,
    constants::{
        EXPLORER_ALREADY_VERIFIED, EXPLORER_CODE_FORMAT, EXPLORER_PASS_PREFIX,
        EXPLORER_PENDING_PREFIX, EXPLORER_SERVICE_ERRORS, EXPLORER_STATUS_OK,
        MAX_VERIFICATION_POLLS, VERIFICATION_POLL_INTERVAL_SECS,
    },
    errors::TaskError,
    types::{VerificationReceipt, VerificationRequest},
};

use super::{ClientFuture, ExplorerClient};

/// The envelope of every Etherscan API response
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    /// `"1"` on success, `"0"` otherwise
    status: String,
    /// A short status message
    #[serde(default)]
    message: String,
    /// The payload: a GUID on submission, a verdict when polling
    #[serde(default)]
    result: String,
}

/// An explorer client speaking the Etherscan contract verification API
pub struct EtherscanClient {
    /// The HTTP client
    http: Client,
    /// The explorer's endpoints and credentials
    explorer: ExplorerConfig,
    /// The build output the submitted sources are read from
    artifacts: ArtifactRegistry,
}

impl EtherscanClient {
    /// Creates a new explorer client
    pub fn new(explorer: ExplorerConfig, artifacts: ArtifactRegistry) -> Self {
        Self {
            http: Client::new(),
            explorer,
            artifacts,
        }
    }

    /// Submit the verification request, returning the explorer's GUID for it,
    /// or `None` if the contract is already verified
    async fn submit(&self, request: &VerificationRequest) -> Result<Option<String>, TaskError> {
        let build_info = self.artifacts.build_info(&request.source_identity)?;
        let source_code = serde_json::to_string(&build_info.input)
            .map_err(|e| TaskError::ArtifactParsing(e.to_string()))?;
        let compiler_version = format!("v{}", build_info.solc_long_version);
        let contract_address = request.contract_address.to_string();
        let constructor_args = hex::encode(&request.constructor_arguments);

        let form = [
            ("apikey", self.explorer.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", contract_address.as_str()),
            ("sourceCode", source_code.as_str()),
            ("codeformat", EXPLORER_CODE_FORMAT),
            ("contractname", request.source_identity.as_str()),
            ("compilerversion", compiler_version.as_str()),
            // Sic, the API misspells this field
            ("constructorArguements", constructor_args.as_str()),
        ];

        let response: ExplorerResponse = self
            .http
            .post(&self.explorer.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?
            .json()
            .await
            .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?;

        if response.status == EXPLORER_STATUS_OK {
            return Ok(Some(response.result));
        }
        if is_already_verified(&response.result) {
            return Ok(None);
        }
        Err(rejection_error(&response))
    }

    /// Poll the verification status until the explorer reaches a verdict
    async fn await_verdict(&self, guid: &str) -> Result<String, TaskError> {
        for _ in 0..MAX_VERIFICATION_POLLS {
            sleep(Duration::from_secs(VERIFICATION_POLL_INTERVAL_SECS)).await;

            let query = [
                ("apikey", self.explorer.api_key.as_str()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ];
            let response: ExplorerResponse = self
                .http
                .get(&self.explorer.api_url)
                .query(&query)
                .send()
                .await
                .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?
                .json()
                .await
                .map_err(|e| TaskError::NetworkSubmission(e.to_string()))?;

            match classify_status(&response) {
                VerificationStatus::Pending => debug!("verification {} pending", guid),
                VerificationStatus::Verified => return Ok(response.result),
                VerificationStatus::Rejected => return Err(rejection_error(&response)),
            }
        }

        Err(TaskError::NetworkSubmission(format!(
            "verification {} still pending after {} polls",
            guid, MAX_VERIFICATION_POLLS
        )))
    }
}

impl ExplorerClient for EtherscanClient {
    fn submit_verification(
        &self,
        request: VerificationRequest,
    ) -> ClientFuture<'_, VerificationReceipt> {
        Box::pin(async move {
            let message = match self.submit(&request).await? {
                Some(guid) => {
                    info!("verification submitted with guid {}", guid);
                    self.await_verdict(&guid).await?
                }
                None => "Already Verified".to_string(),
            };

            info!(
                "{}/address/{}#code",
                self.explorer.browser_url, request.contract_address
            );
            Ok(VerificationReceipt {
                contract_address: request.contract_address,
                message,
            })
        })
    }
}

/// An explorer for networks that have none configured; every submission fails
pub struct NoExplorer {
    /// The network's name
    network: String,
}

impl NoExplorer {
    /// Creates the placeholder for the given network
    pub fn new(network: &str) -> Self {
        Self {
            network: network.to_string(),
        }
    }
}

impl ExplorerClient for NoExplorer {
    fn submit_verification(
        &self,
        _request: VerificationRequest,
    ) -> ClientFuture<'_, VerificationReceipt> {
        Box::pin(async move {
            Err(TaskError::NetworkSubmission(format!(
                "network `{}` has no explorer configured",
                self.network
            )))
        })
    }
}

/// The state of a submitted verification
#[derive(Debug, PartialEq, Eq)]
enum VerificationStatus {
    /// Still queued
    Pending,
    /// Verified now or previously
    Verified,
    /// The explorer did not accept the request
    Rejected,
}

/// Interpret a `checkverifystatus` response
fn classify_status(response: &ExplorerResponse) -> VerificationStatus {
    if response.result.starts_with(EXPLORER_PENDING_PREFIX) {
        VerificationStatus::Pending
    } else if response.status == EXPLORER_STATUS_OK
        || response.result.starts_with(EXPLORER_PASS_PREFIX)
        || is_already_verified(&response.result)
    {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Rejected
    }
}

/// The error for a response the explorer did not accept.
///
/// Only a refusal of the submitted source is a rejected verification; a
/// request the service could not process fails as a network submission.
fn rejection_error(response: &ExplorerResponse) -> TaskError {
    let message = format!("{}: {}", response.message, response.result);
    let lowercase = message.to_lowercase();
    if EXPLORER_SERVICE_ERRORS
        .iter()
        .any(|fragment| lowercase.contains(fragment))
    {
        TaskError::NetworkSubmission(message)
    } else {
        TaskError::VerificationRejected(message)
    }
}

/// Whether an explorer message says the contract was verified before
fn is_already_verified(result: &str) -> bool {
    result.to_lowercase().contains(EXPLORER_ALREADY_VERIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str, result: &str) -> ExplorerResponse {
        serde_json::from_str(&format!(
            r#"{{"status":"{status}","message":"NOTOK","result":"{result}"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_classify_status() {
        let cases = [
            (response("0", "Pending in queue"), VerificationStatus::Pending),
            (response("1", "Pass - Verified"), VerificationStatus::Verified),
            (response("1", "Already Verified"), VerificationStatus::Verified),
            (response("0", "Fail - Unable to verify"), VerificationStatus::Rejected),
        ];
        for (response, expected) in cases {
            assert_eq!(classify_status(&response), expected, "{:?}", response);
        }
    }

    #[test]
    fn test_service_errors_are_not_rejections() {
        let cases = [
            (response("0", "Invalid API Key"), "NetworkSubmissionError"),
            (response("0", "Max rate limit reached"), "NetworkSubmissionError"),
            (response("0", "Unknown UID"), "NetworkSubmissionError"),
            (response("0", "Fail - Unable to verify"), "VerificationRejectedError"),
            (
                response("0", "Unable to locate ContractCode at 0xdead"),
                "VerificationRejectedError",
            ),
        ];
        for (response, kind) in cases {
            assert_eq!(rejection_error(&response).kind(), kind, "{:?}", response);
        }
    }

    #[test]
    fn test_response_without_message() {
        let response: ExplorerResponse = serde_json::from_str(r#"{"status":"1"}"#).unwrap();
        assert_eq!(response.result, "");
        assert_eq!(classify_status(&response), VerificationStatus::Verified);
    }

    #[tokio::test]
    async fn test_no_explorer_rejects() {
        let explorer = NoExplorer::new("localhost");
        let request = VerificationRequest {
            contract_address: Default::default(),
            source_identity: "contracts/ERC404Stake.sol:ERC404Stake".to_string(),
            constructor_arguments: vec![],
        };
        let err = explorer.submit_verification(request).await.unwrap_err();
        assert_eq!(err.kind(), "NetworkSubmissionError");
    }
}
