use alloy::primitives::{B256, FixedBytes};
use tree_hash::TreeHash;

use crate::account::{BlsPublicKey, BlsSignature};
use crate::domain::ForkVersion;

/// 1 ether, in gwei
pub const MIN_DEPOSIT_AMOUNT: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, tree_hash_derive::TreeHash)]
pub struct DepositMessage {
    pub pubkey: FixedBytes<48>,
    pub withdrawal_credentials: B256,
    /// Amount of ether deposited in gwei
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, tree_hash_derive::TreeHash, serde::Serialize)]
pub struct DepositData {
    /// Validator public key
    pub pubkey: FixedBytes<48>,
    /// Withdrawal credentials
    pub withdrawal_credentials: B256,
    /// Amount of ether deposited in gwei
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
    /// Deposit signature
    pub signature: FixedBytes<96>,
}

impl DepositMessage {
    pub fn root(&self) -> B256 {
        self.tree_hash_root()
    }

    pub fn into_signed(self, signature: BlsSignature) -> DepositData {
        DepositData {
            pubkey: self.pubkey,
            withdrawal_credentials: self.withdrawal_credentials,
            amount: self.amount,
            signature,
        }
    }
}

impl DepositData {
    pub fn root(&self) -> B256 {
        self.tree_hash_root()
    }

    pub fn message(&self) -> DepositMessage {
        DepositMessage {
            pubkey: self.pubkey,
            withdrawal_credentials: self.withdrawal_credentials,
            amount: self.amount,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Launchpad,
    Raw,
}

/// One signed deposit, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub format: OutputFormat,
    pub account: String,
    pub pubkey: BlsPublicKey,
    pub withdrawal_credentials: B256,
    pub amount: u64,
    pub signature: BlsSignature,
    pub fork_version: ForkVersion,
    pub deposit_message_root: B256,
    pub deposit_data_root: B256,
}

impl OutputRecord {
    pub fn deposit_data(&self) -> DepositData {
        DepositData {
            pubkey: self.pubkey,
            withdrawal_credentials: self.withdrawal_credentials,
            amount: self.amount,
            signature: self.signature,
        }
    }
}
