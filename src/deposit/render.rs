use alloy::primitives::{Bytes, hex};
use alloy::sol_types::SolCall;
use log::*;
use serde::Serialize;

use super::types::{OutputFormat, OutputRecord};
use crate::error::{Error, Result};
use crate::networks;

pub const DEPOSIT_CLI_VERSION: &str = "2.5.0";

// https://github.com/ethereum/consensus-specs/blob/dev/solidity_deposit_contract/deposit_contract.sol
alloy::sol! {
    #[derive(Debug, PartialEq)]
    interface IDepositContract {
        /// @notice Submit a Phase 0 DepositData object.
        /// @param pubkey A BLS12-381 public key.
        /// @param withdrawal_credentials Commitment to a public key for withdrawals.
        /// @param signature A BLS12-381 signature.
        /// @param deposit_data_root The SHA-256 hash of the SSZ-encoded DepositData object.
        /// Used as a protection against malformed input.
        function deposit(
            bytes calldata pubkey,
            bytes calldata withdrawal_credentials,
            bytes calldata signature,
            bytes32 deposit_data_root
        ) external payable;
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    name: String,
    account: &'a str,
    pubkey: String,
    withdrawal_credentials: String,
    signature: String,
    amount: u64,
    deposit_data_root: String,
    deposit_message_root: String,
    fork_version: String,
    version: u64,
}

#[derive(Serialize)]
struct LaunchpadRecord {
    pubkey: String,
    withdrawal_credentials: String,
    amount: u64,
    signature: String,
    deposit_message_root: String,
    deposit_data_root: String,
    fork_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    eth2_network_name: Option<&'static str>,
    deposit_cli_version: &'static str,
}

/// Checks shared by every format. Byte lengths are fixed by the record's
/// types; what remains is content.
fn validate(record: &OutputRecord, format: OutputFormat) -> Result<()> {
    if record.amount == 0 {
        return Err(Error::IncompleteRecord("missing amount"));
    }
    if format == OutputFormat::Json && record.account.is_empty() {
        return Err(Error::IncompleteRecord("missing account"));
    }
    Ok(())
}

/// Deposit contract call-data for `deposit(bytes,bytes,bytes,bytes32)`.
pub fn encode_raw(record: &OutputRecord) -> Bytes {
    IDepositContract::depositCall {
        pubkey: Bytes::copy_from_slice(record.pubkey.as_slice()),
        withdrawal_credentials: Bytes::copy_from_slice(record.withdrawal_credentials.as_slice()),
        signature: Bytes::copy_from_slice(record.signature.as_slice()),
        deposit_data_root: record.deposit_data_root,
    }
    .abi_encode()
    .into()
}

fn render_raw(record: &OutputRecord) -> Result<String> {
    // A quoted hex string, so that a batch is still a JSON array
    Ok(serde_json::to_string(&encode_raw(record).to_string())?)
}

fn render_launchpad(record: &OutputRecord) -> Result<String> {
    let out = LaunchpadRecord {
        pubkey: hex::encode(record.pubkey),
        withdrawal_credentials: hex::encode(record.withdrawal_credentials),
        amount: record.amount,
        signature: hex::encode(record.signature),
        deposit_message_root: hex::encode(record.deposit_message_root),
        deposit_data_root: hex::encode(record.deposit_data_root),
        fork_version: hex::encode(record.fork_version),
        eth2_network_name: networks::by_fork_version(&record.fork_version).map(|n| n.name),
        deposit_cli_version: DEPOSIT_CLI_VERSION,
    };
    Ok(serde_json::to_string(&out)?)
}

fn render_json(record: &OutputRecord) -> Result<String> {
    let out = JsonRecord {
        name: format!("Deposit for {}", record.account),
        account: &record.account,
        pubkey: record.pubkey.to_string(),
        withdrawal_credentials: record.withdrawal_credentials.to_string(),
        signature: record.signature.to_string(),
        amount: record.amount,
        deposit_data_root: record.deposit_data_root.to_string(),
        deposit_message_root: record.deposit_message_root.to_string(),
        fork_version: record.fork_version.to_string(),
        version: 3,
    };
    Ok(serde_json::to_string(&out)?)
}

pub fn render(record: &OutputRecord, format: OutputFormat) -> Result<String> {
    validate(record, format)?;
    match format {
        OutputFormat::Raw => render_raw(record),
        OutputFormat::Launchpad => render_launchpad(record),
        OutputFormat::Json => render_json(record),
    }
}

/// Renders every record in its own format as one JSON array. Records that
/// fail validation are left out.
pub fn render_batch(records: &[OutputRecord]) -> String {
    let rendered: Vec<String> = records
        .iter()
        .filter_map(|record| match render(record, record.format) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Skipping deposit for {}: {}", record.account, e);
                None
            }
        })
        .collect();
    format!("[{}]", rendered.join(","))
}
