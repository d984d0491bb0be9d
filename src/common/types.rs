//! Shared type definitions for the ticket lottery
//!
//! Identities, amounts and timestamps exchanged between the lottery core and
//! the execution environment that invokes it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Amount of value in the smallest currency unit
pub type Amount = u64;

/// Whole seconds since the environment's epoch
pub type Timestamp = u64;

/// Smallest units per whole currency unit
pub const MUTEZ_PER_TEZ: Amount = 1_000_000;

const LABEL_DOMAIN: &[u8] = b"ticket-lottery:account:";

/// Opaque 32-byte caller identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity([u8; 32]);

impl Identity {
    /// The all-zero identity. Never a valid caller or payout recipient.
    pub const NULL: Identity = Identity([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a stable identity from a human-readable account label
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(LABEL_DOMAIN);
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// First 8 hex characters, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.short())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("identity must not be empty")]
    Empty,
}

/// Accepts a 64-character hex identity, otherwise treats the input as a label.
impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentityParseError::Empty);
        }

        if s.len() == 64 {
            if let Ok(bytes) = hex::decode(s) {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(&bytes);
                return Ok(Self(raw));
            }
        }

        Ok(Self::from_label(s))
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.to_string()
    }
}
