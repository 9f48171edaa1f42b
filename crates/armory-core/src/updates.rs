//! Update detection and operator selection.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use armory_schema::version::orderings_disagree;
use armory_schema::{PackageId, VersionOrdering};

use crate::cache::{ArmoryCache, PackageCacheEntry};
use crate::error::SelectionError;
use crate::local::{InstalledPackage, install_dir_name};

/// A cached package newer than what is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    /// Command name of the update.
    pub command_name: String,
    /// Installed version.
    pub old_version: String,
    /// Cached version.
    pub new_version: String,
    /// Armory offering the update.
    pub armory_name: String,
    /// Public key of that armory.
    pub armory_pk: String,
    /// Alias or extension.
    pub is_alias: bool,
    /// Cache key of the newer package.
    pub package_id: PackageId,
}

fn same_package(installed: &InstalledPackage, entry: &PackageCacheEntry) -> bool {
    let Some(manifest) = entry.manifest() else {
        return false;
    };
    manifest.is_alias() == installed.manifest.is_alias()
        && install_dir_name(manifest) == install_dir_name(&installed.manifest)
}

/// Compare installed manifests against verified cache entries.
///
/// Any armory may supply the newer version unless `armory` restricts
/// candidates to one public key. Returns one candidate per command name,
/// keyed and therefore sorted by it.
pub fn check_for_updates(
    installed: &[InstalledPackage],
    cache: &ArmoryCache,
    armory: Option<&str>,
    ordering: VersionOrdering,
) -> BTreeMap<String, UpdateCandidate> {
    let cached: Vec<PackageCacheEntry> = cache
        .packages()
        .into_iter()
        .filter(|e| e.is_ok() && armory.is_none_or(|pk| pk == e.armory().public_key))
        .collect();

    let mut updates = BTreeMap::new();
    for pkg in installed {
        let old = pkg.manifest.version();
        let mut best: Option<&PackageCacheEntry> = None;

        for entry in cached.iter().filter(|e| same_package(pkg, e)) {
            let new = entry.version().unwrap_or_default();
            if orderings_disagree(old, new) {
                warn!(
                    "Version order of '{}' is ambiguous: {old} vs {new} from '{}'",
                    pkg.lookup_name(),
                    entry.armory().name
                );
            }
            if !ordering.is_newer(old, new) {
                continue;
            }
            if best.is_none_or(|b| ordering.is_newer(b.version().unwrap_or_default(), new)) {
                best = Some(entry);
            }
        }

        if let Some(entry) = best {
            let name = pkg.lookup_name().to_string();
            debug!("Update for '{name}': {old} -> {:?}", entry.version());
            updates.insert(
                name.clone(),
                UpdateCandidate {
                    command_name: entry.package().command_name.clone(),
                    old_version: old.to_string(),
                    new_version: entry.version().unwrap_or_default().to_string(),
                    armory_name: entry.armory().name.clone(),
                    armory_pk: entry.armory().public_key.clone(),
                    is_alias: entry.package().is_alias,
                    package_id: entry.id(),
                },
            );
        }
    }
    updates
}

fn parse_index(token: &str, count: usize) -> Result<usize, SelectionError> {
    let n: usize = token
        .trim()
        .parse()
        .map_err(|_| SelectionError::Invalid(token.trim().to_string()))?;
    if n == 0 || n > count {
        return Err(SelectionError::OutOfRange { index: n, max: count });
    }
    Ok(n - 1)
}

/// Parse an operator selection over `count` items.
///
/// Accepts `all`, `none`, `N`, `a,b` and inclusive ranges `a-b`, 1-based.
/// Returns sorted, de-duplicated 0-based indexes.
///
/// # Errors
///
/// Returns a [`SelectionError`] for empty, malformed or out-of-range input.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, SelectionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SelectionError::Empty);
    }
    match input.to_lowercase().as_str() {
        "all" => return Ok((0..count).collect()),
        "none" => return Ok(Vec::new()),
        _ => {}
    }

    let mut selected = BTreeSet::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(SelectionError::Invalid(input.to_string()));
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_index(start, count)?;
                let end = parse_index(end, count)?;
                if start > end {
                    return Err(SelectionError::Invalid(part.to_string()));
                }
                selected.extend(start..=end);
            }
            None => {
                selected.insert(parse_index(part, count)?);
            }
        }
    }
    Ok(selected.into_iter().collect())
}
