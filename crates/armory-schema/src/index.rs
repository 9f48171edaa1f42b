//! Armory index document and its signed transport envelopes.

use serde::{Deserialize, Serialize};

use crate::package_id::PackageId;

/// An installable alias or extension as listed in an armory index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmoryPackage {
    /// Package name (for extensions, the installed directory name).
    pub name: String,
    /// Console command the package registers.
    pub command_name: String,
    /// Where the package signature and archive are published.
    pub repo_url: String,
    /// Minisign key that signs this package. Empty means the armory key.
    #[serde(default)]
    pub public_key: String,
    /// Alias (`true`) or extension (`false`).
    #[serde(default)]
    pub is_alias: bool,
}

impl ArmoryPackage {
    /// Content-derived cache key of this package.
    pub fn id(&self) -> PackageId {
        PackageId::compute(
            &self.name,
            &self.command_name,
            &self.repo_url,
            &self.public_key,
        )
    }

    /// Human readable kind, used in logs and tables.
    pub fn kind(&self) -> &'static str {
        if self.is_alias { "alias" } else { "extension" }
    }
}

/// A named, ordered grouping of package names installed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmoryBundle {
    /// Bundle name.
    pub name: String,
    /// Member package names, in install order.
    #[serde(default)]
    pub packages: Vec<String>,
}

/// One armory's catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmoryIndex {
    /// Alias packages.
    #[serde(default)]
    pub aliases: Vec<ArmoryPackage>,
    /// Extension packages.
    #[serde(default)]
    pub extensions: Vec<ArmoryPackage>,
    /// Package bundles.
    #[serde(default)]
    pub bundles: Vec<ArmoryBundle>,
}

impl ArmoryIndex {
    /// Parse an index document.
    ///
    /// Publishers do not always set `is_alias`; list membership is
    /// authoritative, so the flag is rewritten from it.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid index document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut index: Self = serde_json::from_slice(bytes)?;
        for alias in &mut index.aliases {
            alias.is_alias = true;
        }
        for ext in &mut index.extensions {
            ext.is_alias = false;
        }
        Ok(index)
    }

    /// All packages, aliases first.
    pub fn packages(&self) -> impl Iterator<Item = &ArmoryPackage> {
        self.aliases.iter().chain(self.extensions.iter())
    }

    /// Number of aliases plus extensions.
    pub fn package_count(&self) -> usize {
        self.aliases.len() + self.extensions.len()
    }

    /// Ids implied by this index.
    pub fn package_ids(&self) -> std::collections::HashSet<PackageId> {
        self.packages().map(ArmoryPackage::id).collect()
    }

    /// Find a bundle by name.
    pub fn bundle(&self, name: &str) -> Option<&ArmoryBundle> {
        self.bundles.iter().find(|b| b.name == name)
    }
}

/// Signed index as served by the default index endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEnvelope {
    /// Minisign signature text over the decoded index bytes.
    pub minisig: String,
    /// Base64 of the index JSON.
    pub armory_index: String,
}

/// Signed package as served by the default package endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageEnvelope {
    /// Minisign signature text over the decoded archive bytes.
    pub minisig: String,
    /// Base64 of the package archive (gzip'd tar).
    #[serde(default)]
    pub tar_gz: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "aliases": [
            {"name": "seatbelt", "command_name": "seatbelt", "repo_url": "https://github.com/a/seatbelt", "public_key": "RWa"}
        ],
        "extensions": [
            {"name": "coff-loader", "command_name": "coff-loader", "repo_url": "https://github.com/a/coff", "public_key": "RWb", "is_alias": true},
            {"name": "nanodump", "command_name": "nanodump", "repo_url": "https://github.com/a/nanodump", "public_key": "RWb"}
        ],
        "bundles": [
            {"name": "situational-awareness", "packages": ["seatbelt", "nanodump"]}
        ]
    }"#;

    #[test]
    fn list_membership_sets_kind() {
        let index = ArmoryIndex::from_slice(INDEX.as_bytes()).unwrap();
        assert!(index.aliases[0].is_alias);
        assert!(!index.extensions[0].is_alias, "extension list wins over field");
        assert_eq!(index.package_count(), 3);
        assert_eq!(index.packages().next().unwrap().kind(), "alias");
    }

    #[test]
    fn package_ids_cover_every_package() {
        let index = ArmoryIndex::from_slice(INDEX.as_bytes()).unwrap();
        let ids = index.package_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&index.extensions[1].id()));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let index = ArmoryIndex::from_slice(b"{}").unwrap();
        assert_eq!(index.package_count(), 0);
        assert!(index.bundle("anything").is_none());
    }

    #[test]
    fn finds_bundle() {
        let index = ArmoryIndex::from_slice(INDEX.as_bytes()).unwrap();
        let bundle = index.bundle("situational-awareness").unwrap();
        assert_eq!(bundle.packages, vec!["seatbelt", "nanodump"]);
    }
}
