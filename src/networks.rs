use alloy::primitives::FixedBytes;
use log::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::domain::ForkVersion;

#[derive(Debug, Clone)]
pub struct NetworkData {
    pub name: &'static str,
    pub genesis_fork_version: ForkVersion,
    /// Unset for networks retired before Capella
    pub capella_fork_version: Option<ForkVersion>,
}

const fn version(b: [u8; 4]) -> ForkVersion {
    FixedBytes(b)
}

static NETWORKS: &[NetworkData] = &[
    NetworkData {
        name: "mainnet",
        genesis_fork_version: version([0x00, 0x00, 0x00, 0x00]),
        capella_fork_version: Some(version([0x03, 0x00, 0x00, 0x00])),
    },
    NetworkData {
        name: "pyrmont",
        genesis_fork_version: version([0x00, 0x00, 0x20, 0x09]),
        capella_fork_version: None,
    },
    NetworkData {
        name: "goerli",
        genesis_fork_version: version([0x00, 0x00, 0x10, 0x20]),
        capella_fork_version: Some(version([0x03, 0x00, 0x10, 0x20])),
    },
    NetworkData {
        name: "ropsten",
        genesis_fork_version: version([0x80, 0x00, 0x00, 0x69]),
        capella_fork_version: None,
    },
    NetworkData {
        name: "sepolia",
        genesis_fork_version: version([0x90, 0x00, 0x00, 0x69]),
        capella_fork_version: Some(version([0x90, 0x00, 0x00, 0x72])),
    },
    NetworkData {
        name: "holesky",
        genesis_fork_version: version([0x01, 0x01, 0x70, 0x00]),
        capella_fork_version: Some(version([0x04, 0x01, 0x70, 0x00])),
    },
    NetworkData {
        name: "hoodi",
        genesis_fork_version: version([0x10, 0x00, 0x09, 0x10]),
        capella_fork_version: Some(version([0x40, 0x00, 0x09, 0x10])),
    },
];

static BY_FORK_VERSION: Lazy<HashMap<ForkVersion, &'static NetworkData>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for network in NETWORKS.iter() {
        m.insert(network.genesis_fork_version, network);
    }
    m
});

/// Looks up the network whose genesis fork version is `fork_version`.
pub fn by_fork_version(fork_version: &ForkVersion) -> Option<&'static NetworkData> {
    let network = BY_FORK_VERSION.get(fork_version).copied();
    if network.is_none() {
        trace!("No known network for fork version {}", fork_version);
    }
    network
}

pub fn by_name(name: &str) -> Option<&'static NetworkData> {
    let name = name.to_lowercase();
    let name = match name.as_str() {
        "prater" => "goerli",
        other => other,
    };
    NETWORKS.iter().find(|n| n.name == name)
}
