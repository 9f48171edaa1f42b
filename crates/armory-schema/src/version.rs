//! Version comparison for update detection.
//!
//! Armory manifests carry free-form version strings (`v1.0.3`, `0.0.23`,
//! `1.1`). Upstream clients compare them as plain strings, which misorders
//! multi-digit components (`"v1.9" > "v1.10"`). Both behaviours are offered;
//! [`VersionOrdering::Lexicographic`] stays the default so existing operators
//! see the same update list they always did.

use serde::{Deserialize, Serialize};

/// How two version strings are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// Plain string comparison.
    #[default]
    Lexicographic,
    /// Numeric comparison of dot-separated components.
    Semantic,
}

impl VersionOrdering {
    /// Returns `true` if `candidate` is newer than `installed`.
    pub fn is_newer(self, installed: &str, candidate: &str) -> bool {
        match self {
            Self::Lexicographic => candidate > installed,
            Self::Semantic => semantic_is_newer(installed, candidate),
        }
    }
}

impl std::str::FromStr for VersionOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexicographic" | "lexical" | "string" => Ok(Self::Lexicographic),
            "semantic" | "semver" => Ok(Self::Semantic),
            _ => Err(format!("Unknown version ordering: {s}")),
        }
    }
}

/// Returns `true` if the two orderings disagree about `installed` vs `candidate`.
pub fn orderings_disagree(installed: &str, candidate: &str) -> bool {
    VersionOrdering::Lexicographic.is_newer(installed, candidate)
        != VersionOrdering::Semantic.is_newer(installed, candidate)
}

/// Compare two versions numerically. Returns true if `latest` is newer than `current`.
/// A leading `v` is ignored; strict semver strings are compared with [`semver`].
pub fn semantic_is_newer(current: &str, latest: &str) -> bool {
    let current = current.trim().trim_start_matches('v');
    let latest = latest.trim().trim_start_matches('v');

    if let (Ok(c), Ok(l)) = (
        semver::Version::parse(current),
        semver::Version::parse(latest),
    ) {
        return l > c;
    }

    let parse = |v: &str| -> Vec<u64> {
        v.split(['.', '-', '+'])
            .map_while(|s| s.parse::<u64>().ok())
            .collect()
    };

    let c_parts = parse(current);
    let l_parts = parse(latest);

    for i in 0..std::cmp::max(c_parts.len(), l_parts.len()) {
        let cv = c_parts.get(i).unwrap_or(&0);
        let lv = l_parts.get(i).unwrap_or(&0);
        if lv > cv {
            return true;
        }
        if cv > lv {
            return false;
        }
    }

    // Stable (no suffix) > pre-release (any suffix); both suffixed falls back to string order.
    let has_suffix = |v: &str| v.contains('-') || v.chars().any(char::is_alphabetic);
    match (has_suffix(current), has_suffix(latest)) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => latest > current,
        (false, false) => false,
    }
}
