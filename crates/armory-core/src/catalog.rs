//! Read-side queries over the caches: lookup, search and listing.

use regex::Regex;

use armory_schema::{ArmoryBundle, ArmoryConfig, PackageManifest};

use crate::cache::{ArmoryCache, PackageCacheEntry};
use crate::error::{FetchError, InstallError};

fn in_armory(entry_pk: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|pk| pk == entry_pk)
}

fn answers_to(entry: &PackageCacheEntry, name: &str) -> bool {
    let package = entry.package();
    if package.command_name == name || package.name == name {
        return true;
    }
    matches!(entry.manifest(), Some(PackageManifest::Extension(m)) if m.provides(name))
}

/// Find the package that registers command `name`.
///
/// Verified entries win over failed ones. With no `armory` filter, a name
/// published by more than one armory is ambiguous.
///
/// # Errors
///
/// Returns [`InstallError::Ambiguous`] if several armories publish `name`.
pub fn find_package(
    cache: &ArmoryCache,
    name: &str,
    armory: Option<&str>,
) -> Result<Option<PackageCacheEntry>, InstallError> {
    let candidates: Vec<PackageCacheEntry> = cache
        .packages()
        .into_iter()
        .filter(|e| in_armory(&e.armory().public_key, armory) && answers_to(e, name))
        .collect();

    let (verified, failed): (Vec<_>, Vec<_>) = candidates.into_iter().partition(PackageCacheEntry::is_ok);
    if verified.len() > 1 {
        let mut armories: Vec<&str> = verified.iter().map(|e| e.armory().name.as_str()).collect();
        armories.sort_unstable();
        armories.dedup();
        if armories.len() > 1 {
            return Err(InstallError::Ambiguous {
                name: name.to_string(),
                armories: armories.join(", "),
            });
        }
    }
    Ok(pick(verified, name).or_else(|| pick(failed, name)))
}

/// Exact command match first, otherwise the first candidate.
fn pick(mut list: Vec<PackageCacheEntry>, name: &str) -> Option<PackageCacheEntry> {
    let i = list
        .iter()
        .position(|e| e.package().command_name == name)
        .unwrap_or(0);
    (i < list.len()).then(|| list.swap_remove(i))
}

/// Find bundle `name` in the indexes that fetched successfully.
pub fn find_bundle(
    cache: &ArmoryCache,
    name: &str,
    armory: Option<&str>,
) -> Option<(ArmoryConfig, ArmoryBundle)> {
    cache
        .indexes()
        .into_iter()
        .filter(|e| e.is_ok() && in_armory(&e.armory.public_key, armory))
        .find_map(|e| e.index.bundle(name).cloned().map(|b| (e.armory.clone(), b)))
}

/// Verified packages whose command or package name matches `pattern`.
pub fn search(cache: &ArmoryCache, pattern: &Regex, armory: Option<&str>) -> Vec<PackageCacheEntry> {
    cache
        .packages()
        .into_iter()
        .filter(|e| e.is_ok() && in_armory(&e.armory().public_key, armory))
        .filter(|e| pattern.is_match(&e.package().command_name) || pattern.is_match(&e.package().name))
        .collect()
}

/// Everything the caches know, grouped for display.
#[derive(Debug, Default)]
pub struct Listing {
    /// Verified aliases, by command name.
    pub aliases: Vec<PackageCacheEntry>,
    /// Verified extensions, by command name.
    pub extensions: Vec<PackageCacheEntry>,
    /// Bundles with the name of the armory publishing them.
    pub bundles: Vec<(String, ArmoryBundle)>,
    /// Failed fetches, labelled by armory or package name.
    pub errors: Vec<(String, FetchError)>,
}

impl Listing {
    /// `true` if there is nothing to show. Errors do not count.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty() && self.extensions.is_empty() && self.bundles.is_empty()
    }
}

/// Build a [`Listing`], optionally restricted to one armory.
pub fn list(cache: &ArmoryCache, armory: Option<&str>) -> Listing {
    let mut listing = Listing::default();
    for entry in cache.indexes() {
        if !in_armory(&entry.armory.public_key, armory) {
            continue;
        }
        match &entry.last_error {
            Some(e) => listing.errors.push((entry.armory.name.clone(), e.clone())),
            None => listing.bundles.extend(
                entry
                    .index
                    .bundles
                    .iter()
                    .map(|b| (entry.armory.name.clone(), b.clone())),
            ),
        }
    }
    for entry in cache.packages() {
        if !in_armory(&entry.armory().public_key, armory) {
            continue;
        }
        if let Some(e) = entry.last_error() {
            listing
                .errors
                .push((entry.package().command_name.clone(), e.clone()));
        } else if entry.package().is_alias {
            listing.aliases.push(entry);
        } else {
            listing.extensions.push(entry);
        }
    }
    listing.bundles.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    listing
}
