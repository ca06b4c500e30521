pub mod parse;
pub mod render;
pub mod types;

use alloy::primitives::B256;
use colored::*;
use log::*;
use std::time::Duration;

use crate::account::Account;
use crate::domain::{ForkVersion, deposit_domain};
use crate::error::{Error, Result};
use crate::signing::sign_root;

pub use parse::{DepositInfo, parse_deposits, read_input};
pub use render::{encode_raw, render, render_batch};
pub use types::{DepositData, DepositMessage, MIN_DEPOSIT_AMOUNT, OutputFormat, OutputRecord};

/// Everything about a deposit except the validator it is for.
#[derive(Debug, Clone)]
pub struct DepositParams {
    pub withdrawal_credentials: B256,
    /// In gwei
    pub amount: u64,
    pub fork_version: ForkVersion,
    pub format: OutputFormat,
    pub passphrases: Vec<String>,
    pub timeout: Duration,
}

fn check_amount(amount: u64) -> Result<()> {
    match amount < MIN_DEPOSIT_AMOUNT {
        true => Err(Error::AmountTooSmall(amount)),
        false => Ok(()),
    }
}

/// Builds and signs the deposit for a single validator.
pub fn build(validator: &Account, params: &DepositParams) -> Result<OutputRecord> {
    check_amount(params.amount)?;

    let message = DepositMessage {
        pubkey: validator.best_public_key()?,
        withdrawal_credentials: params.withdrawal_credentials,
        amount: params.amount,
    };
    let deposit_message_root = message.root();
    let domain = deposit_domain(&params.fork_version);
    trace!("{:#?}", message);
    debug!(
        "Deposit message root: {}, domain: {}",
        deposit_message_root, domain
    );

    let signature = sign_root(
        validator,
        &params.passphrases,
        &deposit_message_root,
        &domain,
        params.timeout,
    )?;
    let data = message.into_signed(signature);
    let deposit_data_root = data.root();
    debug!(
        "Deposit for {}: {}",
        validator.label().green(),
        deposit_data_root.to_string().blue()
    );

    Ok(OutputRecord {
        format: params.format,
        account: validator.label(),
        pubkey: data.pubkey,
        withdrawal_credentials: data.withdrawal_credentials,
        amount: data.amount,
        signature: data.signature,
        fork_version: params.fork_version,
        deposit_message_root,
        deposit_data_root,
    })
}

/// Builds deposits for every validator in order. Any failure aborts the
/// whole batch and no records are returned.
pub fn build_batch(validators: &[Account], params: &DepositParams) -> Result<Vec<OutputRecord>> {
    check_amount(params.amount)?;
    for validator in validators {
        validator.signing_mode()?;
    }
    validators
        .iter()
        .map(|validator| build(validator, params))
        .collect()
}
