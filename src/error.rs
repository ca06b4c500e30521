/// Broad classification of [`Error`], used by callers that only care about
/// where a failure came from (bad input, key handling or codec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Key,
    Codec,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{field} is not valid hex")]
    InvalidHex { field: &'static str },

    #[error("{field} must be exactly {expected} bytes in length (got {actual})")]
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("deposit value is invalid: {0}")]
    InvalidAmount(String),

    #[error("deposit value must be at least 1 Ether (got {0} gwei)")]
    AmountTooSmall(u64),

    #[error("exactly one of withdrawal account, public key or address is required")]
    AmbiguousOrMissingSource,

    #[error("a compounding validator must be created with a withdrawal address")]
    CompoundingRequiresAddress,

    #[error("withdrawal address checksum does not match (expected {0})")]
    ChecksumMismatch(String),

    #[error("{field} is not a valid BLS public key")]
    InvalidPublicKey { field: &'static str },

    #[error("unknown account {0}")]
    AccountMissing(String),

    #[error("account {0} does not provide a public key")]
    NoPublicKey(String),

    #[error("failed to unlock account {0}")]
    UnlockFailed(String),

    #[error("account {0} does not provide signing facility")]
    SigningUnsupported(String),

    #[error("failed to sign with account {account}: {reason}")]
    SignerError { account: String, reason: String },

    #[error("data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} missing for deposit {index}")]
    MissingField { index: usize, field: &'static str },

    #[error("{field} invalid for deposit {index}: {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("unsupported deposit version {version} for deposit {index}")]
    UnsupportedVersion { index: usize, version: u64 },

    #[error("invalid deposit transaction data: {0}")]
    InvalidTxData(&'static str),

    #[error("no deposits supplied")]
    NoDeposits,

    #[error("deposit record is incomplete: {0}")]
    IncompleteRecord(&'static str),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidHex { .. }
            | Error::WrongLength { .. }
            | Error::InvalidAmount(_)
            | Error::AmountTooSmall(_)
            | Error::AmbiguousOrMissingSource
            | Error::CompoundingRequiresAddress
            | Error::ChecksumMismatch(_)
            | Error::Io { .. } => ErrorKind::Input,
            Error::InvalidPublicKey { .. }
            | Error::AccountMissing(_)
            | Error::NoPublicKey(_)
            | Error::UnlockFailed(_)
            | Error::SigningUnsupported(_)
            | Error::SignerError { .. } => ErrorKind::Key,
            Error::Json(_)
            | Error::MissingField { .. }
            | Error::InvalidField { .. }
            | Error::UnsupportedVersion { .. }
            | Error::InvalidTxData(_)
            | Error::NoDeposits
            | Error::IncompleteRecord(_) => ErrorKind::Codec,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Decodes `input` as hex (optional `0x` prefix) into exactly `N` bytes.
pub fn decode_fixed<const N: usize>(field: &'static str, input: &str) -> Result<[u8; N]> {
    let bytes = alloy::primitives::hex::decode(input.trim())
        .map_err(|_| Error::InvalidHex { field })?;
    bytes.as_slice().try_into().map_err(|_| Error::WrongLength {
        field,
        expected: N,
        actual: bytes.len(),
    })
}
