//! Content-derived identifiers for runs, configs, datasets and outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! blake3_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Hash arbitrary bytes with BLAKE3.
            pub fn from_bytes(bytes: &[u8]) -> Self {
                Self(blake3::hash(bytes).to_hex().to_string())
            }

            /// First `n` hex characters, for directory and log labels.
            pub fn short(&self, n: usize) -> &str {
                &self.0[..n.min(self.0.len())]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

blake3_id!(
    /// Hash of the canonical serialized run configuration.
    ConfigHash
);
blake3_id!(
    /// Hash of every event in a feed, in feed order.
    DatasetHash
);
blake3_id!(
    /// Hash of a run's trade log and equity curve.
    OutputHash
);

/// Deterministic run ID (config + dataset + seed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub seed: u64,
}

impl RunId {
    pub fn new(config_hash: ConfigHash, dataset_hash: DatasetHash, seed: u64) -> Self {
        Self {
            config_hash,
            dataset_hash,
            seed,
        }
    }

    /// Stable hash of the run identity.
    pub fn hash(&self) -> String {
        let canonical = serde_json::json!({
            "config_hash": &self.config_hash.0,
            "dataset_hash": &self.dataset_hash.0,
            "seed": self.seed,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.config_hash.short(12),
            self.dataset_hash.short(12),
            self.seed
        )
    }
}
