//! Content-addressable hashing (C2).
//!
//! SHA-256 is mandatory; SHA-512 is supported for completeness but nothing
//! in the publish pipeline chooses it by default. Hex output is always
//! lowercase, matching the wire format in §3.

use crate::error::{ContainerToolError, Result};
use sha2::{Digest as _, Sha256, Sha512};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Sha256,
    Sha512,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    pub fn hex_len(&self) -> usize {
        match self {
            Algorithm::Sha256 => 64,
            Algorithm::Sha512 => 128,
        }
    }

    fn parse(s: &str) -> Option<Algorithm> {
        match s {
            "sha256" => Some(Algorithm::Sha256),
            "sha512" => Some(Algorithm::Sha512),
            _ => None,
        }
    }
}

/// `{ algorithm, hex }`. Equality is on the pair — two digests computed with
/// different algorithms over identical bytes are unequal (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: Algorithm,
    hex: String,
}

impl Digest {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Compute a digest over raw bytes. For JSON objects, callers must pass
    /// the canonical-encoded bytes (§4.4), never a re-parse of the decoded
    /// value — digests are a contract with the wire, not the model.
    pub fn compute(bytes: &[u8], algorithm: Algorithm) -> Digest {
        let hex = match algorithm {
            Algorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
            Algorithm::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
        };
        Digest { algorithm, hex }
    }

    pub fn sha256(bytes: &[u8]) -> Digest {
        Self::compute(bytes, Algorithm::Sha256)
    }

    /// Parse `<algo>:<hex>`, validating hex length against the algorithm.
    pub fn parse(raw: &str) -> Result<Digest> {
        let (algo_str, hex_part) = raw.split_once(':').ok_or_else(|| ContainerToolError::InvalidDigest {
            raw: raw.to_string(),
            reason: "missing ':' separator".to_string(),
        })?;

        let algorithm = Algorithm::parse(algo_str).ok_or_else(|| ContainerToolError::InvalidDigest {
            raw: raw.to_string(),
            reason: format!("unsupported algorithm '{algo_str}'"),
        })?;

        if hex_part.len() != algorithm.hex_len() || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ContainerToolError::InvalidDigest {
                raw: raw.to_string(),
                reason: format!(
                    "expected {} lowercase hex characters for {}",
                    algorithm.hex_len(),
                    algorithm.as_str()
                ),
            });
        }
        if hex_part.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ContainerToolError::InvalidDigest {
                raw: raw.to_string(),
                reason: "hex digits must be lowercase".to_string(),
            });
        }

        Ok(Digest {
            algorithm,
            hex: hex_part.to_string(),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.as_str(), self.hex)
    }
}

impl serde::Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Digest::parse(&s).map_err(serde::de::Error::custom)
    }
}
