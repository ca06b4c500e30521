use alloy::primitives::{Address, B256, FixedBytes};
use log::*;
use sha2::{Digest, Sha256};

use crate::account::{Account, BlsPublicKey};
use crate::error::{Error, Result, decode_fixed};
use crate::signing::parse_public_key;

// https://github.com/ethereum/consensus-specs/blob/dev/specs/phase0/validator.md#withdrawal-credentials
pub const BLS_WITHDRAWAL_PREFIX: u8 = 0x00;
pub const ETH1_ADDRESS_WITHDRAWAL_PREFIX: u8 = 0x01;
// https://eips.ethereum.org/EIPS/eip-7251
pub const COMPOUNDING_WITHDRAWAL_PREFIX: u8 = 0x02;

/// Where a validator's funds are withdrawn to.
#[derive(Debug, Clone)]
pub enum WithdrawalSource<'a> {
    Account(&'a Account),
    PublicKey(&'a str),
    ExecutionAddress { address: &'a str, compounding: bool },
}

impl<'a> WithdrawalSource<'a> {
    /// Picks the withdrawal source out of a set of optional inputs, exactly
    /// one of which must be present.
    pub fn from_options(
        account: Option<&'a Account>,
        pubkey: Option<&'a str>,
        address: Option<&'a str>,
        compounding: bool,
    ) -> Result<Self> {
        let source = match (account, pubkey, address) {
            (Some(account), None, None) => WithdrawalSource::Account(account),
            (None, Some(pubkey), None) => WithdrawalSource::PublicKey(pubkey),
            (None, None, Some(address)) => WithdrawalSource::ExecutionAddress {
                address,
                compounding,
            },
            _ => return Err(Error::AmbiguousOrMissingSource),
        };
        if compounding && !matches!(source, WithdrawalSource::ExecutionAddress { .. }) {
            return Err(Error::CompoundingRequiresAddress);
        }
        Ok(source)
    }
}

fn from_public_key(pubkey: &BlsPublicKey) -> Result<B256> {
    parse_public_key("withdrawal public key", pubkey)?;
    let mut credentials: [u8; 32] = Sha256::digest(pubkey.as_slice()).into();
    credentials[0] = BLS_WITHDRAWAL_PREFIX;
    Ok(B256::from(credentials))
}

/// Validates an EIP-55 address string; the input must already be in its
/// checksummed form.
pub fn parse_checksummed_address(input: &str) -> Result<Address> {
    let address = Address::from(decode_fixed::<20>("withdrawal address", input)?);
    let expected = address.to_checksum(None);
    if expected != input {
        return Err(Error::ChecksumMismatch(expected));
    }
    Ok(address)
}

pub fn derive_withdrawal_credentials(source: &WithdrawalSource) -> Result<B256> {
    let credentials = match source {
        WithdrawalSource::Account(account) => from_public_key(&account.best_public_key()?)?,
        WithdrawalSource::PublicKey(pubkey) => from_public_key(&FixedBytes(decode_fixed::<48>(
            "withdrawal public key",
            pubkey,
        )?))?,
        WithdrawalSource::ExecutionAddress {
            address,
            compounding,
        } => {
            let address = parse_checksummed_address(address)?;
            let mut credentials = [0u8; 32];
            credentials[0] = match compounding {
                true => COMPOUNDING_WITHDRAWAL_PREFIX,
                false => ETH1_ADDRESS_WITHDRAWAL_PREFIX,
            };
            credentials[12..].copy_from_slice(address.as_slice());
            B256::from(credentials)
        }
    };
    debug!("Withdrawal credentials: {}", credentials);
    Ok(credentials)
}
