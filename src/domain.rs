use alloy::primitives::{B256, FixedBytes};
use tree_hash::TreeHash;

use crate::error::{Result, decode_fixed};

pub type ForkVersion = FixedBytes<4>;
pub type DomainType = [u8; 4];

// https://github.com/ethereum/consensus-specs/blob/dev/specs/phase0/beacon-chain.md#domain-types
pub const DOMAIN_DEPOSIT: DomainType = [0x03, 0x00, 0x00, 0x00];
pub const DOMAIN_VOLUNTARY_EXIT: DomainType = [0x04, 0x00, 0x00, 0x00];

pub const GENESIS_FORK_VERSION_MAINNET: ForkVersion = FixedBytes([0x00, 0x00, 0x00, 0x00]);

/// Deposits are signed before the chain exists, so their domain always
/// commits to an all-zero genesis validators root.
pub const ZERO_GENESIS_VALIDATORS_ROOT: B256 = B256::ZERO;

#[derive(Debug, tree_hash_derive::TreeHash)]
struct ForkData {
    current_version: ForkVersion,
    genesis_validators_root: B256,
}

pub fn fork_data_root(fork_version: &ForkVersion, genesis_validators_root: &B256) -> B256 {
    ForkData {
        current_version: *fork_version,
        genesis_validators_root: *genesis_validators_root,
    }
    .tree_hash_root()
}

/// `domain_type || fork_data_root[..28]`
pub fn compute_domain(
    domain_type: DomainType,
    fork_version: &ForkVersion,
    genesis_validators_root: &B256,
) -> B256 {
    let root = fork_data_root(fork_version, genesis_validators_root);
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(&domain_type);
    domain[4..].copy_from_slice(&root[..28]);
    B256::from(domain)
}

pub fn deposit_domain(fork_version: &ForkVersion) -> B256 {
    compute_domain(DOMAIN_DEPOSIT, fork_version, &ZERO_GENESIS_VALIDATORS_ROOT)
}

/// Voluntary exits are pinned to the Capella fork version of the network
/// (EIP-7044) and, unlike deposits, commit to the real genesis validators root.
pub fn voluntary_exit_domain(
    capella_fork_version: &ForkVersion,
    genesis_validators_root: &B256,
) -> B256 {
    compute_domain(
        DOMAIN_VOLUNTARY_EXIT,
        capella_fork_version,
        genesis_validators_root,
    )
}

/// Parses an optional fork version, defaulting to mainnet.
pub fn parse_fork_version(input: Option<&str>) -> Result<ForkVersion> {
    match input.map(str::trim) {
        None | Some("") => Ok(GENESIS_FORK_VERSION_MAINNET),
        Some(s) => Ok(FixedBytes(decode_fixed::<4>("fork version", s)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use alloy::primitives::b256;

    #[test]
    fn deposit_domain_known_answer() {
        let fork_version = parse_fork_version(Some("0x01020304")).unwrap();
        assert_eq!(
            deposit_domain(&fork_version),
            b256!("0x03000000ffd2fc34e5796a643f749b0b2b908c4ca3ce58ce24a00c49329a2dc0"),
            "deposit domain mismatch"
        );
    }

    #[test]
    fn deposit_domain_depends_on_fork() {
        let mainnet = deposit_domain(&GENESIS_FORK_VERSION_MAINNET);
        let other = deposit_domain(&parse_fork_version(Some("0x01020304")).unwrap());
        assert_ne!(mainnet, other);
        assert_eq!(&mainnet[..4], &DOMAIN_DEPOSIT);
    }

    #[test]
    fn exit_domain_uses_genesis_root() {
        let capella = FixedBytes([0x03, 0x00, 0x00, 0x00]);
        let gvr = b256!("0x4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95");
        let with_root = voluntary_exit_domain(&capella, &gvr);
        let zero_root = voluntary_exit_domain(&capella, &ZERO_GENESIS_VALIDATORS_ROOT);
        assert_ne!(with_root, zero_root);
        assert_eq!(&with_root[..4], &DOMAIN_VOLUNTARY_EXIT);
    }

    #[test]
    fn fork_version_parsing() {
        assert_eq!(
            parse_fork_version(None).unwrap(),
            GENESIS_FORK_VERSION_MAINNET
        );
        assert_eq!(
            parse_fork_version(Some("")).unwrap(),
            GENESIS_FORK_VERSION_MAINNET
        );
        assert!(matches!(
            parse_fork_version(Some("0x0102030405")),
            Err(Error::WrongLength { expected: 4, .. })
        ));
        assert!(matches!(
            parse_fork_version(Some("invalid")),
            Err(Error::InvalidHex { .. })
        ));
    }
}
