//! In-memory index and package caches.
//!
//! Both caches are shared between concurrent fetch tasks and readers. Every
//! operation takes the lock for a single map access and never across an
//! await point.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use armory_schema::{ArmoryConfig, ArmoryIndex, ArmoryPackage, PackageId, PackageManifest};

use crate::error::FetchError;

fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    // clock skew counts as fresh
    let age = (now - fetched_at).to_std().unwrap_or(Duration::ZERO);
    age < ttl
}

/// The outcome of one index fetch.
#[derive(Debug, Clone)]
pub struct IndexCacheEntry {
    /// Armory the index was fetched from.
    pub armory: ArmoryConfig,
    /// Parsed index; empty when the fetch failed.
    pub index: ArmoryIndex,
    /// When the fetch finished, successful or not.
    pub fetched_at: DateTime<Utc>,
    /// Why the fetch failed, if it did.
    pub last_error: Option<FetchError>,
}

impl IndexCacheEntry {
    /// Entry for an index fetched just now.
    pub fn success(armory: ArmoryConfig, index: ArmoryIndex) -> Self {
        Self {
            armory,
            index,
            fetched_at: Utc::now(),
            last_error: None,
        }
    }

    /// Entry recording a failed fetch. It is never reused from the cache.
    pub fn failure(armory: ArmoryConfig, error: FetchError) -> Self {
        Self {
            armory,
            index: ArmoryIndex::default(),
            fetched_at: Utc::now(),
            last_error: Some(error),
        }
    }

    /// `true` if the index fetched and parsed.
    pub fn is_ok(&self) -> bool {
        self.last_error.is_none()
    }
}

/// The outcome of one package signature fetch.
///
/// A manifest is only ever present on an entry whose signature verified.
#[derive(Debug, Clone)]
pub struct PackageCacheEntry {
    armory: ArmoryConfig,
    package: ArmoryPackage,
    signature: Option<String>,
    manifest: Option<PackageManifest>,
    fetched_at: DateTime<Utc>,
    last_error: Option<FetchError>,
}

impl PackageCacheEntry {
    /// Entry for a signature whose trusted comment verified to `manifest`.
    pub(crate) fn verified(
        armory: ArmoryConfig,
        package: ArmoryPackage,
        signature: String,
        manifest: PackageManifest,
    ) -> Self {
        Self {
            armory,
            package,
            signature: Some(signature),
            manifest: Some(manifest),
            fetched_at: Utc::now(),
            last_error: None,
        }
    }

    pub(crate) fn failed(armory: ArmoryConfig, package: ArmoryPackage, error: FetchError) -> Self {
        Self {
            armory,
            package,
            signature: None,
            manifest: None,
            fetched_at: Utc::now(),
            last_error: Some(error),
        }
    }

    /// Cache key of this entry.
    pub fn id(&self) -> PackageId {
        self.package.id()
    }

    /// Armory whose index listed the package.
    pub fn armory(&self) -> &ArmoryConfig {
        &self.armory
    }

    /// Index entry, with its key filled in.
    pub fn package(&self) -> &ArmoryPackage {
        &self.package
    }

    /// Minisign signature text, kept for archive verification.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Manifest decoded from the verified trusted comment.
    pub fn manifest(&self) -> Option<&PackageManifest> {
        self.manifest.as_ref()
    }

    /// When the signature fetch finished.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Why the fetch or verification failed, if it did.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// `true` if the signature verified.
    pub fn is_ok(&self) -> bool {
        self.last_error.is_none()
    }

    /// Version from the verified manifest, if any.
    pub fn version(&self) -> Option<&str> {
        self.manifest.as_ref().map(PackageManifest::version)
    }
}

/// Index cache keyed by armory public key, package cache keyed by [`PackageId`].
#[derive(Debug, Default)]
pub struct ArmoryCache {
    indexes: RwLock<HashMap<String, IndexCacheEntry>>,
    packages: RwLock<HashMap<PackageId, PackageCacheEntry>>,
}

impl ArmoryCache {
    /// Empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    fn indexes_read(&self) -> RwLockReadGuard<'_, HashMap<String, IndexCacheEntry>> {
        self.indexes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn indexes_write(&self) -> RwLockWriteGuard<'_, HashMap<String, IndexCacheEntry>> {
        self.indexes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn packages_read(&self) -> RwLockReadGuard<'_, HashMap<PackageId, PackageCacheEntry>> {
        self.packages.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn packages_write(&self) -> RwLockWriteGuard<'_, HashMap<PackageId, PackageCacheEntry>> {
        self.packages.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index entry of the armory with `public_key`, fresh or not.
    pub fn index(&self, public_key: &str) -> Option<IndexCacheEntry> {
        self.indexes_read().get(public_key).cloned()
    }

    /// A reusable index entry: error-free and younger than `ttl`.
    ///
    /// Stale entries are evicted.
    pub fn fresh_index(&self, public_key: &str, ttl: Duration) -> Option<IndexCacheEntry> {
        let now = Utc::now();
        let mut indexes = self.indexes_write();
        match indexes.get(public_key) {
            Some(entry) if !is_fresh(entry.fetched_at, now, ttl) => {
                indexes.remove(public_key);
                None
            }
            Some(entry) if entry.is_ok() => Some(entry.clone()),
            _ => None,
        }
    }

    /// Store `entry`, replacing the armory's previous one.
    pub fn insert_index(&self, entry: IndexCacheEntry) {
        self.indexes_write()
            .insert(entry.armory.public_key.clone(), entry);
    }

    /// All index entries, in armory name order.
    pub fn indexes(&self) -> Vec<IndexCacheEntry> {
        let mut all: Vec<IndexCacheEntry> = self.indexes_read().values().cloned().collect();
        all.sort_by(|a, b| a.armory.name.cmp(&b.armory.name));
        all
    }

    /// Package entry for `id`, fresh or not.
    pub fn package(&self, id: &PackageId) -> Option<PackageCacheEntry> {
        self.packages_read().get(id).cloned()
    }

    /// A reusable package entry: error-free and younger than `ttl`.
    ///
    /// Stale entries are evicted.
    pub fn fresh_package(&self, id: &PackageId, ttl: Duration) -> Option<PackageCacheEntry> {
        let now = Utc::now();
        let mut packages = self.packages_write();
        match packages.get(id) {
            Some(entry) if !is_fresh(entry.fetched_at, now, ttl) => {
                packages.remove(id);
                None
            }
            Some(entry) if entry.is_ok() => Some(entry.clone()),
            _ => None,
        }
    }

    /// Store `entry` under its [`PackageId`].
    pub fn insert_package(&self, entry: PackageCacheEntry) {
        self.packages_write().insert(entry.id(), entry);
    }

    /// All package entries, sorted by command name then armory.
    pub fn packages(&self) -> Vec<PackageCacheEntry> {
        let mut all: Vec<PackageCacheEntry> = self.packages_read().values().cloned().collect();
        all.sort_by(|a, b| {
            a.package
                .command_name
                .cmp(&b.package.command_name)
                .then_with(|| a.armory.name.cmp(&b.armory.name))
        });
        all
    }

    /// Drop package entries of the armory keyed by `public_key` whose ids are
    /// not in `current`. Returns the removed ids.
    pub fn reconcile(&self, public_key: &str, current: &HashSet<PackageId>) -> Vec<PackageId> {
        let mut removed = Vec::new();
        self.packages_write().retain(|id, entry| {
            let keep = entry.armory.public_key != public_key || current.contains(id);
            if !keep {
                removed.push(id.clone());
            }
            keep
        });
        removed
    }

    /// Forget an armory's index and every package fetched through it.
    pub fn forget_armory(&self, public_key: &str) {
        self.indexes_write().remove(public_key);
        self.packages_write()
            .retain(|_, entry| entry.armory.public_key != public_key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.indexes_write().clear();
        self.packages_write().clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use armory_schema::AliasManifest;

    pub(crate) fn package(name: &str) -> ArmoryPackage {
        ArmoryPackage {
            name: name.into(),
            command_name: name.into(),
            repo_url: format!("https://armory.example/{name}"),
            public_key: String::new(),
            is_alias: true,
        }
    }

    pub(crate) fn alias_manifest(name: &str, version: &str) -> PackageManifest {
        PackageManifest::Alias(AliasManifest {
            name: name.into(),
            command_name: name.into(),
            version: version.into(),
            ..AliasManifest::default()
        })
    }

    fn armory(pk: &str) -> ArmoryConfig {
        ArmoryConfig::new(pk, "https://armory.example/index", pk)
    }

    fn keyed(name: &str, pk: &str) -> ArmoryPackage {
        ArmoryPackage {
            public_key: pk.into(),
            ..package(name)
        }
    }

    fn verified(armory_pk: &str, name: &str) -> PackageCacheEntry {
        PackageCacheEntry::verified(
            armory(armory_pk),
            keyed(name, armory_pk),
            "sig".into(),
            alias_manifest(name, "1.0"),
        )
    }

    #[test]
    fn reconcile_drops_packages_missing_upstream() {
        let cache = ArmoryCache::new();
        for name in ["a", "b", "c"] {
            cache.insert_package(verified("pk1", name));
        }
        cache.insert_package(verified("pk2", "b"));

        let current: HashSet<PackageId> = [keyed("a", "pk1").id(), keyed("c", "pk1").id()].into();
        let removed = cache.reconcile("pk1", &current);
        assert_eq!(removed, vec![keyed("b", "pk1").id()]);

        let names: Vec<(String, String)> = cache
            .packages()
            .iter()
            .map(|e| (e.armory().public_key.clone(), e.package().name.clone()))
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&("pk2".into(), "b".into())));
        assert!(names.contains(&("pk1".into(), "a".into())));
        assert!(names.contains(&("pk1".into(), "c".into())));
        assert!(!names.contains(&("pk1".into(), "b".into())));
    }

    #[test]
    fn stale_entries_are_evicted() {
        let cache = ArmoryCache::new();
        let entry = verified("pk1", "a");
        let id = entry.id();
        cache.insert_package(entry);

        assert!(cache.fresh_package(&id, Duration::from_secs(3600)).is_some());
        assert!(cache.fresh_package(&id, Duration::ZERO).is_none());
        assert!(cache.package(&id).is_none(), "stale entry should be gone");
    }

    #[test]
    fn failed_entries_are_not_reused() {
        let cache = ArmoryCache::new();
        let entry = PackageCacheEntry::failed(armory("pk1"), package("a"), FetchError::EmptyIndex);
        let id = entry.id();
        cache.insert_package(entry);

        assert!(cache.fresh_package(&id, Duration::from_secs(3600)).is_none());
        let kept = cache.package(&id).unwrap();
        assert!(kept.manifest().is_none());
        assert!(kept.last_error().is_some());

        cache.insert_index(IndexCacheEntry::failure(armory("pk1"), FetchError::Cancelled));
        assert!(cache.fresh_index("pk1", Duration::from_secs(3600)).is_none());
        assert!(cache.index("pk1").is_some());
    }

    #[test]
    fn forget_armory_drops_everything_for_key() {
        let cache = ArmoryCache::new();
        cache.insert_index(IndexCacheEntry::success(armory("pk1"), ArmoryIndex::default()));
        cache.insert_package(verified("pk1", "a"));
        cache.forget_armory("pk1");
        assert!(cache.indexes().is_empty());
        assert!(cache.packages().is_empty());
    }
}
