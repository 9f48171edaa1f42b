//! Stable package identifiers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content-derived identifier of an armory package.
///
/// SHA-256 over the package's identifying fields (name, command name, repo
/// URL, public key). Any change to one of those fields yields a new id, which
/// is how the package cache notices renames and replacements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Hash the identifying fields of a package.
    pub fn compute(name: &str, command_name: &str, repo_url: &str, public_key: &str) -> Self {
        let mut hasher = Sha256::new();
        for field in [name, command_name, repo_url, public_key] {
            hasher.update(field.as_bytes());
            // separator keeps ("ab", "c") and ("a", "bc") apart
            hasher.update([0u8]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines and tables.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
