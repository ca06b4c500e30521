use alloy::primitives::{B256, FixedBytes};
use colored::*;
use log::*;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::account::BlsPublicKey;
use crate::deposit::{DepositData, DepositInfo};
use crate::domain::{ForkVersion, deposit_domain};
use crate::error::{Error, Result, decode_fixed};
use crate::signing::{parse_public_key, verify_root};

/// Expected values to hold deposits against. Unset fields are not checked.
#[derive(Debug, Default, Clone)]
pub struct VerificationPolicy {
    pub withdrawal_credentials: Option<B256>,
    /// In gwei
    pub amount: Option<u64>,
    pub pubkeys: Option<BTreeSet<BlsPublicKey>>,
    pub fork_version: Option<ForkVersion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    WithdrawalCredentials,
    Amount,
    PublicKey,
    DepositDataRoot,
    ForkVersion,
    DepositMessageRoot,
    Signature,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Check::WithdrawalCredentials => "Withdrawal credentials",
            Check::Amount => "Amount",
            Check::PublicKey => "Validator public key",
            Check::DepositDataRoot => "Deposit data root",
            Check::ForkVersion => "Fork version",
            Check::DepositMessageRoot => "Deposit message root",
            Check::Signature => "Signature",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    NotChecked,
}

impl Outcome {
    fn compare<T: PartialEq + fmt::Display>(expected: &T, actual: &T) -> Self {
        match expected == actual {
            true => Outcome::Passed,
            false => Outcome::Failed(format!("expected {}, found {}", expected, actual)),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

static NOT_CHECKED: Outcome = Outcome::NotChecked;

#[derive(Debug, Clone)]
pub struct Report {
    pub label: String,
    pub checks: Vec<(Check, Outcome)>,
}

impl Report {
    /// True when no performed check failed.
    pub fn overall_pass(&self) -> bool {
        !self.checks.iter().any(|(_, outcome)| outcome.is_failure())
    }

    pub fn outcome(&self, check: Check) -> &Outcome {
        self.checks
            .iter()
            .find(|(c, _)| *c == check)
            .map(|(_, outcome)| outcome)
            .unwrap_or(&NOT_CHECKED)
    }

    /// One line per performed check.
    pub fn lines(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter_map(|(check, outcome)| match outcome {
                Outcome::Passed => Some(format!("{} {} verified", "✓".green(), check)),
                Outcome::Failed(detail) => {
                    Some(format!("{} {} invalid: {}", "✕".red(), check, detail))
                }
                Outcome::NotChecked => None,
            })
            .collect()
    }
}

fn check_signature(
    deposit: &DepositInfo,
    amount: Option<u64>,
    fork_version: &ForkVersion,
    checks: &mut Vec<(Check, Outcome)>,
) {
    let Some(amount) = amount else {
        checks.push((Check::Signature, Outcome::Failed("amount unknown".to_string())));
        return;
    };
    let message = DepositData {
        pubkey: deposit.pubkey,
        withdrawal_credentials: deposit.withdrawal_credentials,
        amount,
        signature: deposit.signature,
    }
    .message();
    let message_root = message.root();
    if let Some(stated) = &deposit.deposit_message_root {
        checks.push((Check::DepositMessageRoot, Outcome::compare(stated, &message_root)));
    }

    let domain = deposit_domain(fork_version);
    let outcome = match verify_root(&deposit.pubkey, &message_root, &domain, &deposit.signature) {
        Ok(true) => Outcome::Passed,
        Ok(false) => Outcome::Failed(format!("does not verify under domain {}", domain)),
        Err(e) => Outcome::Failed(e.to_string()),
    };
    checks.push((Check::Signature, outcome));
}

/// Runs every applicable check against one deposit. Checks never stop each
/// other; the data root is always recomputed.
pub fn verify(deposit: &DepositInfo, policy: &VerificationPolicy) -> Report {
    let mut checks = Vec::new();

    if let Some(expected) = &policy.withdrawal_credentials {
        checks.push((
            Check::WithdrawalCredentials,
            Outcome::compare(expected, &deposit.withdrawal_credentials),
        ));
    }

    // raw transaction data does not carry the amount, the policy supplies it
    if let (Some(expected), Some(actual)) = (policy.amount, deposit.amount) {
        checks.push((Check::Amount, Outcome::compare(&expected, &actual)));
    }
    let amount = deposit.amount.or(policy.amount);

    if let Some(pubkeys) = &policy.pubkeys {
        let outcome = match pubkeys.contains(&deposit.pubkey) {
            true => Outcome::Passed,
            false => Outcome::Failed(format!("{} is not in the allowed list", deposit.pubkey)),
        };
        checks.push((Check::PublicKey, outcome));
    }

    let root = match amount {
        Some(amount) => {
            let data = DepositData {
                pubkey: deposit.pubkey,
                withdrawal_credentials: deposit.withdrawal_credentials,
                amount,
                signature: deposit.signature,
            };
            Outcome::compare(&deposit.deposit_data_root, &data.root())
        }
        None => Outcome::Failed("amount unknown".to_string()),
    };
    checks.push((Check::DepositDataRoot, root));

    if let (Some(expected), Some(actual)) = (&policy.fork_version, &deposit.fork_version) {
        let outcome = Outcome::compare(expected, actual);
        let matched = outcome == Outcome::Passed;
        checks.push((Check::ForkVersion, outcome));
        if matched {
            check_signature(deposit, amount, expected, &mut checks);
        }
    }

    let report = Report {
        label: deposit.label(0),
        checks,
    };
    trace!("{:#?}", report);
    report
}

pub fn verify_all(deposits: &[DepositInfo], policy: &VerificationPolicy) -> Vec<Report> {
    deposits
        .iter()
        .enumerate()
        .map(|(i, deposit)| {
            let mut report = verify(deposit, policy);
            report.label = deposit.label(i);
            report
        })
        .collect()
}

fn parse_pubkey(input: &str) -> Result<BlsPublicKey> {
    let pubkey = FixedBytes(decode_fixed::<48>("validator public key", input)?);
    parse_public_key("validator public key", &pubkey)?;
    Ok(pubkey)
}

/// Parses a validator public key allow-list: either a single `0x` key or
/// the path of a file with one key per line.
pub fn parse_pubkeys(input: &str) -> Result<BTreeSet<BlsPublicKey>> {
    let input = input.trim();
    if input.starts_with("0x") {
        return Ok(BTreeSet::from([parse_pubkey(input)?]));
    }

    let contents = std::fs::read_to_string(Path::new(input)).map_err(|source| Error::Io {
        path: input.to_string(),
        source,
    })?;
    let pubkeys = contents
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(parse_pubkey)
        .collect::<Result<BTreeSet<_>>>()?;
    if pubkeys.is_empty() {
        warn!("{} has no public keys", input);
    }
    debug!("Loaded {} validator public key(s)", pubkeys.len());
    Ok(pubkeys)
}
