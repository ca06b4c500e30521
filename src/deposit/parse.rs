use alloy::primitives::{B256, FixedBytes, hex};
use alloy::sol_types::SolCall;
use log::*;
use serde_utils::quoted_u64::MaybeQuoted;

use super::render::IDepositContract;
use crate::account::{BlsPublicKey, BlsSignature};
use crate::domain::ForkVersion;
use crate::error::{Error, Result, decode_fixed};

const RAW_TX_LEN: usize = 420;

/// A deposit supplied from outside, in any of the accepted formats.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositInfo {
    pub name: Option<String>,
    pub account: Option<String>,
    pub pubkey: BlsPublicKey,
    pub withdrawal_credentials: B256,
    pub signature: BlsSignature,
    pub deposit_data_root: B256,
    pub deposit_message_root: Option<B256>,
    pub fork_version: Option<ForkVersion>,
    /// Not carried by raw transaction data
    pub amount: Option<u64>,
}

impl DepositInfo {
    pub fn label(&self, index: usize) -> String {
        self.account
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("deposit {}", index))
    }
}

/// Superset of every JSON layout we accept; the version decides which
/// fields are mandatory.
#[derive(serde::Deserialize)]
struct JsonDeposit {
    name: Option<String>,
    account: Option<String>,
    pubkey: Option<String>,
    withdrawal_credentials: Option<String>,
    signature: Option<String>,
    deposit_data_root: Option<String>,
    deposit_message_root: Option<String>,
    fork_version: Option<String>,
    amount: Option<MaybeQuoted<u64>>,
    value: Option<MaybeQuoted<u64>>,
    version: Option<u64>,
}

fn field<const N: usize>(
    index: usize,
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<[u8; N]>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => decode_fixed::<N>(field, s)
            .map(Some)
            .map_err(|e| Error::InvalidField {
                index,
                field,
                reason: e.to_string(),
            }),
    }
}

fn required<const N: usize>(
    index: usize,
    name: &'static str,
    value: &Option<String>,
) -> Result<[u8; N]> {
    field::<N>(index, name, value)?.ok_or(Error::MissingField { index, field: name })
}

impl JsonDeposit {
    fn into_info(self, index: usize) -> Result<DepositInfo> {
        // launchpad and deposit-cli records have no version but the full set of fields
        let (full, amount) = match self.version {
            Some(3) | None => (true, self.amount),
            Some(1) | Some(2) => (false, self.value.or(self.amount)),
            Some(version) => return Err(Error::UnsupportedVersion { index, version }),
        };

        let deposit_message_root = field::<32>(index, "deposit_message_root", &self.deposit_message_root)?;
        let fork_version = field::<4>(index, "fork_version", &self.fork_version)?;
        if full {
            deposit_message_root.ok_or(Error::MissingField {
                index,
                field: "deposit_message_root",
            })?;
            fork_version.ok_or(Error::MissingField {
                index,
                field: "fork_version",
            })?;
        }
        // only raw call-data may leave the amount to the caller
        let amount = amount.ok_or(Error::MissingField {
            index,
            field: "amount",
        })?;

        Ok(DepositInfo {
            name: self.name,
            account: self.account,
            pubkey: FixedBytes(required::<48>(index, "pubkey", &self.pubkey)?),
            withdrawal_credentials: B256::from(required::<32>(
                index,
                "withdrawal_credentials",
                &self.withdrawal_credentials,
            )?),
            signature: FixedBytes(required::<96>(index, "signature", &self.signature)?),
            deposit_data_root: B256::from(required::<32>(
                index,
                "deposit_data_root",
                &self.deposit_data_root,
            )?),
            deposit_message_root: deposit_message_root.map(B256::from),
            fork_version: fork_version.map(FixedBytes),
            amount: Some(amount.value),
        })
    }
}

/// Decodes deposit contract call-data. The layout is fixed for the
/// canonical encoding, so fields are read at their known offsets.
fn parse_raw_tx(input: &str) -> Result<DepositInfo> {
    let data = hex::decode(input.trim()).map_err(|_| Error::InvalidTxData("not valid hex"))?;
    if data.len() != RAW_TX_LEN {
        return Err(Error::InvalidTxData("invalid transaction length"));
    }
    if data[..4] != IDepositContract::depositCall::SELECTOR {
        return Err(Error::InvalidTxData("invalid function signature"));
    }
    let slice = |from: usize, to: usize| &data[from..to];
    Ok(DepositInfo {
        name: None,
        account: None,
        pubkey: FixedBytes::from_slice(slice(164, 212)),
        withdrawal_credentials: B256::from_slice(slice(260, 292)),
        signature: FixedBytes::from_slice(slice(324, 420)),
        deposit_data_root: B256::from_slice(slice(100, 132)),
        deposit_message_root: None,
        fork_version: None,
        amount: None,
    })
}

/// Parses a JSON object, a JSON array or raw deposit call-data.
pub fn parse_deposits(input: &str) -> Result<Vec<DepositInfo>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::NoDeposits);
    }

    let deposits: Vec<JsonDeposit> = match input.as_bytes()[0] {
        b'[' => serde_json::from_str(input)?,
        b'{' => vec![serde_json::from_str(input)?],
        _ => {
            trace!("Treating input as raw transaction data");
            return Ok(vec![parse_raw_tx(input)?]);
        }
    };
    if deposits.is_empty() {
        return Err(Error::NoDeposits);
    }
    debug!("Parsed {} deposit(s)", deposits.len());

    deposits
        .into_iter()
        .enumerate()
        .map(|(i, deposit)| deposit.into_info(i))
        .collect()
}

fn is_inline(data: &str) -> bool {
    if data.starts_with('{') || data.starts_with('[') {
        return true;
    }
    let digits = data.strip_prefix("0x").unwrap_or(data);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Returns `data` itself when it is inline JSON or call-data hex, otherwise
/// the contents of the file it names.
pub fn read_input(data: &str) -> Result<String> {
    let trimmed = data.trim();
    if is_inline(trimmed) {
        return Ok(data.to_string());
    }
    debug!("Reading deposit data from {}", trimmed);
    std::fs::read_to_string(trimmed).map_err(|source| Error::Io {
        path: trimmed.to_string(),
        source,
    })
}
