//! Utilities for the deploy and verify tasks.

use std::{fs, path::Path, str::FromStr};

use alloy::primitives::{Address, U256};
use serde_json::{Map, Value};

use crate::{
    constants::{DEPLOYMENTS_KEY, NUM_HEX_CHARS_ADDRESS, RATIO_SCALE, RATIO_SCALE_TOLERANCE},
    errors::TaskError,
    schema::RawInputs,
};

/// Whether the given string is a well-formed Ethereum address.
///
/// Accepts 40 hex characters with an optional `0x` prefix. Mixed-case input
/// must carry a valid EIP-55 checksum; all-lowercase and all-uppercase input
/// is accepted as is.
pub fn is_address(value: &str) -> bool {
    let hex = value.strip_prefix("0x").unwrap_or(value);
    if hex.len() != NUM_HEX_CHARS_ADDRESS || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    match Address::from_str(hex) {
        Ok(address) => address.to_checksum(None /* chain_id */)[2..] == *hex,
        Err(_) => false,
    }
}

/// Parse an address-typed parameter, rejecting malformed values
pub fn parse_address_param(key: &str, value: &str) -> Result<Address, TaskError> {
    let invalid = || TaskError::InvalidAddress {
        key: key.to_string(),
        value: value.to_string(),
    };

    if !is_address(value) {
        return Err(invalid());
    }
    Address::from_str(value).map_err(|_| invalid())
}

/// Convert an int parameter to an on-chain unsigned integer
pub fn uint_param(key: &str, value: i64) -> Result<U256, TaskError> {
    u64::try_from(value)
        .map(U256::from)
        .map_err(|_| TaskError::InvalidParameter {
            key: key.to_string(),
            reason: format!("{} is negative", value),
        })
}

/// Scale a floating point ratio to the fixed-point integer passed on-chain
pub fn scale_ratio(key: &str, ratio: f64) -> Result<U256, TaskError> {
    let invalid = |reason: String| TaskError::InvalidParameter {
        key: key.to_string(),
        reason,
    };

    if !ratio.is_finite() || ratio < 0. {
        return Err(invalid(format!("{} is not a non-negative number", ratio)));
    }

    let scaled = ratio * RATIO_SCALE;
    let rounded = scaled.round();
    if (scaled - rounded).abs() > RATIO_SCALE_TOLERANCE {
        return Err(invalid(format!(
            "{} has more precision than 1/{}",
            ratio, RATIO_SCALE
        )));
    }
    if rounded >= u128::MAX as f64 {
        return Err(invalid(format!("{} is too large", ratio)));
    }

    Ok(U256::from(rounded as u128))
}

/// Split raw task arguments of the form `--key value` or `--key=value`
/// into a map of raw inputs
pub fn parse_task_args(args: &[String]) -> Result<RawInputs, TaskError> {
    let mut raw_inputs = RawInputs::new();
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        let flag = arg
            .strip_prefix("--")
            .ok_or_else(|| TaskError::MalformedArgument(format!("expected `--<key>`, got {:?}", arg)))?;

        let (key, value) = match flag.split_once('=') {
            Some((key, value)) => (key, value.to_string()),
            None => {
                let value = args.next().ok_or_else(|| {
                    TaskError::MalformedArgument(format!("missing value for `--{}`", flag))
                })?;
                (flag, value.clone())
            }
        };

        if key.is_empty() {
            return Err(TaskError::MalformedArgument(format!("empty key in {:?}", arg)));
        }
        if raw_inputs.insert(key.to_string(), value).is_some() {
            return Err(TaskError::MalformedArgument(format!(
                "`--{}` supplied more than once",
                key
            )));
        }
    }

    Ok(raw_inputs)
}

/// Record deployed contract addresses under the given network in the
/// deployments file, creating the file if it doesn't exist
pub fn write_deployed_addresses(
    file_path: &Path,
    network: &str,
    addresses: &[(&str, Address)],
) -> Result<(), TaskError> {
    let mut parsed_json = if file_path.exists() {
        let contents =
            fs::read_to_string(file_path).map_err(|e| TaskError::DeploymentsFile(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| TaskError::DeploymentsFile(e.to_string()))?
    } else {
        Value::Object(Map::new())
    };

    let not_an_object = |what: &str| TaskError::DeploymentsFile(format!("{} is not an object", what));
    let network_deployments = parsed_json
        .as_object_mut()
        .ok_or_else(|| not_an_object("deployments file"))?
        .entry(DEPLOYMENTS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| not_an_object(DEPLOYMENTS_KEY))?
        .entry(network)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| not_an_object(network))?;

    for (contract_key, address) in addresses {
        network_deployments.insert(contract_key.to_string(), Value::String(address.to_string()));
    }

    let contents = serde_json::to_string_pretty(&parsed_json)
        .map_err(|e| TaskError::DeploymentsFile(e.to_string()))?;
    fs::write(file_path, contents).map_err(|e| TaskError::DeploymentsFile(e.to_string()))
}
