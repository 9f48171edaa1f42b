//! Persisted armory source configuration (`armories.json`).

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_ARMORY_NAME, DEFAULT_ARMORY_PUBLIC_KEY, DEFAULT_ARMORY_REPO_URL};

/// Identity of a package source.
///
/// The public key doubles as the cache key for the armory's index, so two
/// entries with the same key are treated as the same armory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmoryConfig {
    /// Minisign public key that signs this armory's content.
    pub public_key: String,
    /// Index location (`http` or `https`).
    pub repo_url: String,
    /// Static authorization token sent with requests to this armory.
    #[serde(default)]
    pub authorization: String,
    /// Local command whose trimmed stdout supplies the authorization token.
    #[serde(default)]
    pub authorization_cmd: String,
    /// Unique display name. `Default` is reserved for the built-in armory.
    pub name: String,
    /// Disabled armories are kept in configuration but never fetched.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ArmoryConfig {
    /// Create an enabled armory without authorization.
    pub fn new(
        name: impl Into<String>,
        repo_url: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            repo_url: repo_url.into(),
            authorization: String::new(),
            authorization_cmd: String::new(),
            name: name.into(),
            enabled: true,
        }
    }

    /// The built-in armory injected into every configuration.
    pub fn builtin() -> Self {
        Self::new(
            DEFAULT_ARMORY_NAME,
            DEFAULT_ARMORY_REPO_URL,
            DEFAULT_ARMORY_PUBLIC_KEY,
        )
    }

    /// Returns `true` for the reserved built-in armory.
    pub fn is_builtin(&self) -> bool {
        self.name == DEFAULT_ARMORY_NAME
    }

    /// Returns `true` if either a static token or a token command is configured.
    pub fn has_authorization(&self) -> bool {
        !self.authorization.is_empty() || !self.authorization_cmd.is_empty()
    }
}
