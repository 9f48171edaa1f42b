//! Parallel index and package signature fetching.
//!
//! A refresh runs in two phases separated by join barriers: every enabled
//! armory's index is fetched concurrently, then for each index that
//! succeeded its package signatures are fetched concurrently and the package
//! cache is reconciled against the index. Concurrency in each phase is
//! capped by a semaphore.

use std::future::Future;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use armory_schema::{ArmoryConfig, ArmoryIndex, ArmoryPackage, PackageId};

use crate::cache::{ArmoryCache, IndexCacheEntry, PackageCacheEntry};
use crate::error::{FetchError, InstallError};
use crate::http::{ArmoryRequester, build_client, resolve_authorization, validate_url};
use crate::parsers::{FetchedPackage, IndexParser, PackageParser};
use crate::settings::FetchOptions;
use crate::verify::{VerifiedArchive, verify_archive, verify_manifest};

/// Outcome of refreshing one armory.
#[derive(Debug, Clone)]
pub struct ArmoryRefresh {
    /// The armory refreshed.
    pub armory: ArmoryConfig,
    /// Set when the index could not be fetched; no packages were tried.
    pub index_error: Option<FetchError>,
    /// Packages whose signatures verified.
    pub packages: usize,
    /// Packages that failed, by command name.
    pub failed: Vec<(String, FetchError)>,
    /// Cached packages dropped because the index no longer lists them.
    pub removed: Vec<PackageId>,
}

impl ArmoryRefresh {
    fn from_index(entry: &IndexCacheEntry) -> Self {
        Self {
            armory: entry.armory.clone(),
            index_error: entry.last_error.clone(),
            packages: 0,
            failed: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Fetches indexes, signatures and archives into a shared [`ArmoryCache`].
///
/// Cloning is cheap; clones share the cache, the HTTP client and the
/// cancellation token.
#[derive(Debug, Clone)]
pub struct Fetcher {
    cache: Arc<ArmoryCache>,
    client: Client,
    options: FetchOptions,
    cancel: CancellationToken,
}

impl Fetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if the HTTP client cannot be built.
    pub fn new(cache: Arc<ArmoryCache>, options: FetchOptions) -> Result<Self, FetchError> {
        let client = build_client(&options)?;
        Ok(Self {
            cache,
            client,
            options,
            cancel: CancellationToken::new(),
        })
    }

    /// Use `token` to abort in-flight fetches.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<ArmoryCache> {
        &self.cache
    }

    /// Options this fetcher was built with.
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    async fn cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(FetchError::Cancelled),
            result = fut => result,
        }
    }

    async fn requester_for(&self, armory: &ArmoryConfig) -> Result<ArmoryRequester, FetchError> {
        let url = validate_url(&armory.repo_url)?;
        let token = resolve_authorization(armory).await?;
        Ok(ArmoryRequester::new(self.client.clone(), &url, token))
    }

    /// Refresh every enabled armory in `armories`. Results are in name order.
    pub async fn refresh(&self, armories: &[ArmoryConfig]) -> Vec<ArmoryRefresh> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut set = JoinSet::new();

        for armory in armories.iter().filter(|a| a.enabled).cloned() {
            let this = self.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    () = this.cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                match permit {
                    Some(_permit) => this.fetch_index(&armory).await,
                    None => {
                        let entry = IndexCacheEntry::failure(armory, FetchError::Cancelled);
                        this.cache.insert_index(entry.clone());
                        entry
                    }
                }
            });
        }

        // join barrier: every index settles before any package fetch starts
        let mut indexes = Vec::new();
        while let Some(res) = set.join_next().await {
            match res {
                Ok(entry) => indexes.push(entry),
                Err(e) => error!("Index fetch task failed: {e}"),
            }
        }
        indexes.sort_by(|a, b| a.armory.name.cmp(&b.armory.name));

        let mut results = Vec::with_capacity(indexes.len());
        for entry in indexes {
            let mut refresh = ArmoryRefresh::from_index(&entry);
            if entry.is_ok() {
                let (packages, failed, removed) =
                    self.fetch_packages(&entry.armory, &entry.index).await;
                refresh.packages = packages;
                refresh.failed = failed;
                refresh.removed = removed;
            }
            results.push(refresh);
        }
        results
    }

    /// Fetch one armory's index, reusing a fresh cache entry unless
    /// `ignore_cache` is set. The outcome is stored either way.
    pub async fn fetch_index(&self, armory: &ArmoryConfig) -> IndexCacheEntry {
        if !self.options.ignore_cache {
            if let Some(entry) = self
                .cache
                .fresh_index(&armory.public_key, self.options.cache_ttl)
            {
                debug!("Using cached index for '{}'", armory.name);
                return entry;
            }
        }

        info!("Fetching index of armory '{}'", armory.name);
        let entry = match self.cancellable(self.download_index(armory)).await {
            Ok(index) if index.package_count() == 0 => {
                warn!("Armory '{}' lists no packages", armory.name);
                IndexCacheEntry::failure(armory.clone(), FetchError::EmptyIndex)
            }
            Ok(index) => IndexCacheEntry::success(armory.clone(), index),
            Err(e) => {
                warn!("Failed to fetch index of '{}': {e}", armory.name);
                IndexCacheEntry::failure(armory.clone(), e)
            }
        };
        self.cache.insert_index(entry.clone());
        entry
    }

    async fn download_index(&self, armory: &ArmoryConfig) -> Result<ArmoryIndex, FetchError> {
        let url = validate_url(&armory.repo_url)?;
        let requester = self.requester_for(armory).await?;
        let parser = IndexParser::for_host(url.host_str().unwrap_or_default());
        debug!("Index of '{}' uses the {parser:?} parser", armory.name);
        let mut index = parser
            .fetch(&requester, &armory.repo_url, &armory.public_key)
            .await?;

        // packages without their own key are signed with the armory key
        for package in index.aliases.iter_mut().chain(index.extensions.iter_mut()) {
            if package.public_key.is_empty() {
                package.public_key.clone_from(&armory.public_key);
            }
        }
        Ok(index)
    }

    /// Fetch and verify the signature of every package in `index`, then drop
    /// cached packages of this armory that the index no longer lists.
    ///
    /// Returns the number of verified packages, the failures and the removed ids.
    pub async fn fetch_packages(
        &self,
        armory: &ArmoryConfig,
        index: &ArmoryIndex,
    ) -> (usize, Vec<(String, FetchError)>, Vec<PackageId>) {
        let requester = match self.cancellable(self.requester_for(armory)).await {
            Ok(requester) => Some(requester),
            Err(e) => {
                warn!("Cannot fetch packages of '{}': {e}", armory.name);
                for package in index.packages() {
                    self.cache.insert_package(PackageCacheEntry::failed(
                        armory.clone(),
                        package.clone(),
                        e.clone(),
                    ));
                }
                None
            }
        };

        let mut verified = 0;
        let mut failed = Vec::new();
        if let Some(requester) = requester {
            let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
            let mut set = JoinSet::new();
            for package in index.packages().cloned() {
                let this = self.clone();
                let armory = armory.clone();
                let requester = requester.clone();
                let semaphore = semaphore.clone();
                set.spawn(async move {
                    let permit = tokio::select! {
                        biased;
                        () = this.cancel.cancelled() => None,
                        permit = semaphore.acquire_owned() => permit.ok(),
                    };
                    match permit {
                        Some(_permit) => this.fetch_package(&armory, &requester, package).await,
                        None => {
                            let entry =
                                PackageCacheEntry::failed(armory, package, FetchError::Cancelled);
                            this.cache.insert_package(entry.clone());
                            entry
                        }
                    }
                });
            }

            // join barrier before reconciliation
            while let Some(res) = set.join_next().await {
                match res {
                    Ok(entry) => match entry.last_error() {
                        None => verified += 1,
                        Some(e) => failed.push((entry.package().command_name.clone(), e.clone())),
                    },
                    Err(e) => error!("Package fetch task failed: {e}"),
                }
            }
        }

        let removed = self.cache.reconcile(&armory.public_key, &index.package_ids());
        if !removed.is_empty() {
            info!(
                "Dropped {} packages no longer listed by '{}'",
                removed.len(),
                armory.name
            );
        }
        failed.sort_by(|a, b| a.0.cmp(&b.0));
        (verified, failed, removed)
    }

    /// Fetch and verify one package signature, reusing a fresh cache entry
    /// unless `ignore_cache` is set.
    pub async fn fetch_package(
        &self,
        armory: &ArmoryConfig,
        requester: &ArmoryRequester,
        package: ArmoryPackage,
    ) -> PackageCacheEntry {
        let id = package.id();
        if !self.options.ignore_cache {
            if let Some(entry) = self.cache.fresh_package(&id, self.options.cache_ttl) {
                return entry;
            }
        }

        debug!("Fetching signature of '{}' ({})", package.command_name, id.short());
        let result = self
            .cancellable(self.download_package(requester, &package, true))
            .await
            .and_then(|fetched| {
                let manifest = verify_manifest(armory, &package, &fetched.signature)?;
                Ok((fetched.signature, manifest))
            });
        let entry = match result {
            Ok((signature, manifest)) => {
                PackageCacheEntry::verified(armory.clone(), package, signature, manifest)
            }
            Err(e) => {
                if e.is_integrity() {
                    error!("Package '{}' failed verification: {e}", package.command_name);
                } else {
                    warn!("Failed to fetch '{}': {e}", package.command_name);
                }
                PackageCacheEntry::failed(armory.clone(), package, e)
            }
        };
        self.cache.insert_package(entry.clone());
        entry
    }

    async fn download_package(
        &self,
        requester: &ArmoryRequester,
        package: &ArmoryPackage,
        signature_only: bool,
    ) -> Result<FetchedPackage, FetchError> {
        let url = validate_url(&package.repo_url)?;
        let parser = PackageParser::for_host(url.host_str().unwrap_or_default());
        parser.fetch(requester, package, signature_only).await
    }

    /// Download the archive of a cached package and verify it.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Unavailable`] for entries that failed to fetch,
    /// [`InstallError::Fetch`] on download failure and
    /// [`InstallError::Integrity`] if the archive does not verify.
    pub async fn fetch_archive(
        &self,
        entry: &PackageCacheEntry,
    ) -> Result<VerifiedArchive, InstallError> {
        let name = entry.package().command_name.clone();
        if let Some(e) = entry.last_error() {
            return Err(InstallError::Unavailable {
                package: name,
                source: e.clone(),
            });
        }

        let fetch_err = |source| InstallError::Fetch {
            package: name.clone(),
            source,
        };
        let requester = self
            .cancellable(self.requester_for(entry.armory()))
            .await
            .map_err(fetch_err)?;
        let fetched = self
            .cancellable(self.download_package(&requester, entry.package(), false))
            .await
            .map_err(fetch_err)?;
        let archive = fetched
            .archive
            .ok_or_else(|| InstallError::archive(&name, "response carried no archive"))?;

        verify_archive(entry.armory(), entry.package(), &fetched.signature, archive).map_err(
            |source| InstallError::Integrity {
                package: name.clone(),
                source,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minisign::testing::TestKey;
    use crate::testutil::{Fixture, alias_manifest, extension_manifest, index_envelope, package_envelope};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many slow responses overlap.
    #[derive(Clone, Default)]
    struct InFlight {
        now: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl InFlight {
        fn respond(
            &self,
            body: String,
            delay: Duration,
        ) -> impl Fn(&mut dyn std::io::Write) -> std::io::Result<()> + Send + Sync + 'static {
            let this = self.clone();
            move |w| {
                let n = this.now.fetch_add(1, Ordering::SeqCst) + 1;
                this.peak.fetch_max(n, Ordering::SeqCst);
                std::thread::sleep(delay);
                this.now.fetch_sub(1, Ordering::SeqCst);
                w.write_all(body.as_bytes())
            }
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    fn capped(cache: &Arc<ArmoryCache>, max_concurrency: usize) -> Fetcher {
        let options = FetchOptions {
            max_concurrency,
            ..FetchOptions::default()
        };
        Fetcher::new(cache.clone(), options).unwrap()
    }

    fn fetcher(cache: &Arc<ArmoryCache>, ignore_cache: bool) -> Fetcher {
        let options = FetchOptions {
            ignore_cache,
            ..FetchOptions::default()
        };
        Fetcher::new(cache.clone(), options).unwrap()
    }

    #[tokio::test]
    async fn refresh_populates_caches() {
        let mut fx = Fixture::new().await;
        let seatbelt = fx.package("seatbelt", true);
        let coff = fx.package("coff-loader", false);
        let _i = fx.serve_index(&[seatbelt.clone(), coff.clone()], &[]).await;
        let _a = fx.serve_package(&seatbelt, &alias_manifest("seatbelt", "v1.0")).await;
        let _e = fx
            .serve_package(&coff, &extension_manifest("coff-loader", "v1.2", ""))
            .await;

        let cache = Arc::new(ArmoryCache::new());
        let results = fetcher(&cache, false).refresh(&[fx.armory.clone()]).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].index_error.is_none());
        assert_eq!(results[0].packages, 2);
        let entry = cache.package(&seatbelt.id()).unwrap();
        assert_eq!(entry.version(), Some("v1.0"));
        assert_eq!(entry.manifest().unwrap().armory_name(), "test");
    }

    #[tokio::test]
    async fn second_refresh_within_ttl_makes_no_requests() {
        let mut fx = Fixture::new().await;
        let seatbelt = fx.package("seatbelt", true);
        let index = fx
            .index_mock(&[seatbelt.clone()], &[])
            .expect(1)
            .create_async()
            .await;
        let package = fx
            .package_mock(&seatbelt, &alias_manifest("seatbelt", "v1.0"), &TestKey::new(42))
            .expect(1)
            .create_async()
            .await;

        let cache = Arc::new(ArmoryCache::new());
        let f = fetcher(&cache, false);
        f.refresh(&[fx.armory.clone()]).await;
        let first = cache.package(&seatbelt.id()).unwrap().fetched_at();
        f.refresh(&[fx.armory.clone()]).await;
        let second = cache.package(&seatbelt.id()).unwrap().fetched_at();

        assert_eq!(first, second);
        index.assert_async().await;
        package.assert_async().await;
    }

    #[tokio::test]
    async fn ignore_cache_forces_refetch() {
        let mut fx = Fixture::new().await;
        let seatbelt = fx.package("seatbelt", true);
        let index = fx
            .index_mock(&[seatbelt.clone()], &[])
            .expect(2)
            .create_async()
            .await;
        let _p = fx
            .serve_package(&seatbelt, &alias_manifest("seatbelt", "v1.0"))
            .await;

        let cache = Arc::new(ArmoryCache::new());
        fetcher(&cache, false).refresh(&[fx.armory.clone()]).await;
        let first = cache.package(&seatbelt.id()).unwrap().fetched_at();
        tokio::time::sleep(Duration::from_millis(5)).await;
        fetcher(&cache, true).refresh(&[fx.armory.clone()]).await;
        let second = cache.package(&seatbelt.id()).unwrap().fetched_at();

        assert!(second > first);
        index.assert_async().await;
    }

    #[tokio::test]
    async fn packages_dropped_upstream_leave_the_cache() {
        let mut fx = Fixture::new().await;
        let a = fx.package("a", true);
        let b = fx.package("b", true);
        let c = fx.package("c", true);
        let full = fx.serve_index(&[a.clone(), b.clone(), c.clone()], &[]).await;
        let mut mocks = Vec::new();
        for pkg in [&a, &b, &c] {
            mocks.push(fx.serve_package(pkg, &alias_manifest(&pkg.name, "1.0")).await);
        }

        let cache = Arc::new(ArmoryCache::new());
        fetcher(&cache, false).refresh(&[fx.armory.clone()]).await;
        assert_eq!(cache.packages().len(), 3);

        full.remove_async().await;
        let _smaller = fx.serve_index(&[a.clone(), c.clone()], &[]).await;
        let results = fetcher(&cache, true).refresh(&[fx.armory.clone()]).await;

        assert_eq!(results[0].removed, vec![b.id()]);
        let names: Vec<String> = cache
            .packages()
            .iter()
            .map(|e| e.package().name.clone())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn package_fetches_respect_concurrency_cap() {
        let mut fx = Fixture::new().await;
        let packages: Vec<ArmoryPackage> =
            (0..6).map(|i| fx.package(&format!("pkg{i}"), true)).collect();
        let _i = fx.serve_index(&packages, &[]).await;

        let in_flight = InFlight::default();
        let mut mocks = Vec::new();
        for pkg in &packages {
            let body = package_envelope(pkg, &alias_manifest(&pkg.name, "1.0"), &fx.key);
            let mock = fx
                .server
                .mock("GET", format!("/packages/{}", pkg.name).as_str())
                .with_chunked_body(in_flight.respond(body, Duration::from_millis(100)))
                .create_async()
                .await;
            mocks.push(mock);
        }

        let cache = Arc::new(ArmoryCache::new());
        let results = capped(&cache, 2).refresh(&[fx.armory.clone()]).await;

        assert_eq!(results[0].packages, 6);
        assert_eq!(in_flight.peak(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn index_fetches_respect_concurrency_cap() {
        let mut fx = Fixture::new().await;
        let in_flight = InFlight::default();
        let mut armories = Vec::new();
        let mut mocks = Vec::new();
        for i in 0..5u8 {
            let key = TestKey::new(100 + i);
            let path = format!("/index{i}");
            let armory = ArmoryConfig::new(
                format!("armory{i}"),
                format!("{}{path}", fx.server.url()),
                key.public_key_text(),
            );
            let body = index_envelope(&key, &[fx.package(&format!("pkg{i}"), true)], &[]);
            let mock = fx
                .server
                .mock("GET", path.as_str())
                .with_chunked_body(in_flight.respond(body, Duration::from_millis(100)))
                .create_async()
                .await;
            armories.push(armory);
            mocks.push(mock);
        }

        let cache = Arc::new(ArmoryCache::new());
        let results = capped(&cache, 3).refresh(&armories).await;

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.index_error.is_none()));
        assert_eq!(in_flight.peak(), 3);
    }

    #[tokio::test]
    async fn reconciliation_waits_for_slow_fetches() {
        let mut fx = Fixture::new().await;
        let fast = fx.package("fast", true);
        let slow = fx.package("slow", true);
        let gone = fx.package("gone", true);
        let full = fx
            .serve_index(&[fast.clone(), slow.clone(), gone.clone()], &[])
            .await;
        let _f = fx.serve_package(&fast, &alias_manifest("fast", "1.0")).await;
        let _g = fx.serve_package(&gone, &alias_manifest("gone", "1.0")).await;

        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let body = package_envelope(&slow, &alias_manifest("slow", "1.0"), &fx.key);
        let _s = fx
            .server
            .mock("GET", "/packages/slow")
            .with_chunked_body(move |w| {
                std::thread::sleep(Duration::from_millis(200));
                flag.store(true, Ordering::SeqCst);
                w.write_all(body.as_bytes())
            })
            .create_async()
            .await;

        let cache = Arc::new(ArmoryCache::new());
        fetcher(&cache, false).refresh(&[fx.armory.clone()]).await;
        assert_eq!(cache.packages().len(), 3);

        full.remove_async().await;
        let _smaller = fx.serve_index(&[fast.clone(), slow.clone()], &[]).await;
        finished.store(false, Ordering::SeqCst);
        let results = fetcher(&cache, true).refresh(&[fx.armory.clone()]).await;

        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(results[0].packages, 2);
        assert_eq!(results[0].removed, vec![gone.id()]);
        assert!(cache.package(&slow.id()).unwrap().is_ok());
        assert!(cache.package(&gone.id()).is_none());
    }

    #[tokio::test]
    async fn wrong_signer_is_an_integrity_failure() {
        let mut fx = Fixture::new().await;
        let good = fx.package("good", true);
        let evil = fx.package("evil", true);
        let _i = fx.serve_index(&[good.clone(), evil.clone()], &[]).await;
        let _p = fx.serve_package(&good, &alias_manifest("good", "1.0")).await;
        let _p = fx.serve_package_signed_by(&evil, &alias_manifest("evil", "1.0"), &TestKey::new(7))
            .await;

        let cache = Arc::new(ArmoryCache::new());
        let results = fetcher(&cache, false).refresh(&[fx.armory.clone()]).await;

        assert_eq!(results[0].packages, 1);
        assert_eq!(results[0].failed.len(), 1);
        let entry = cache.package(&evil.id()).unwrap();
        assert!(entry.manifest().is_none());
        assert!(entry.last_error().unwrap().is_integrity());
        assert!(cache.package(&good.id()).unwrap().is_ok());
    }

    #[tokio::test]
    async fn unsigned_index_packages_need_the_armory_key() {
        let mut fx = Fixture::new().await;
        let own = TestKey::new(99);
        let mut rogue = fx.package("rogue", true);
        rogue.public_key = own.public_key_text();
        let honest = fx.package("honest", true);
        let _i = fx.serve_plain_index(&[rogue.clone(), honest.clone()]).await;
        let _r = fx
            .serve_package_signed_by(&rogue, &alias_manifest("rogue", "1.0"), &own)
            .await;
        let _h = fx.serve_package(&honest, &alias_manifest("honest", "1.0")).await;

        let cache = Arc::new(ArmoryCache::new());
        let results = fetcher(&cache, false).refresh(&[fx.armory.clone()]).await;

        assert!(results[0].index_error.is_none());
        assert_eq!(results[0].packages, 1);
        assert_eq!(results[0].failed.len(), 1);
        assert_eq!(results[0].failed[0].0, "rogue");
        assert!(results[0].failed[0].1.is_integrity());
        assert!(cache.package(&rogue.id()).is_none());
        assert!(cache.package(&honest.id()).unwrap().is_ok());
    }

    #[tokio::test]
    async fn failed_index_keeps_other_armories() {
        let mut fx = Fixture::new().await;
        let seatbelt = fx.package("seatbelt", true);
        let _i = fx.serve_index(&[seatbelt.clone()], &[]).await;
        let _p = fx.serve_package(&seatbelt, &alias_manifest("seatbelt", "1.0")).await;
        let _broken = fx
            .server
            .mock("GET", "/broken")
            .with_status(500)
            .create_async()
            .await;

        let broken = ArmoryConfig::new(
            "broken",
            format!("{}/broken", fx.server.url()),
            TestKey::new(8).public_key_text(),
        );
        let mut disabled = ArmoryConfig::new("off", "https://off.example", "RWoff");
        disabled.enabled = false;

        let cache = Arc::new(ArmoryCache::new());
        let results = fetcher(&cache, false)
            .refresh(&[fx.armory.clone(), broken.clone(), disabled])
            .await;

        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0].index_error,
            Some(FetchError::Status { status: 500, .. })
        ));
        assert!(results[1].index_error.is_none());
        assert!(!cache.index(&broken.public_key).unwrap().is_ok());
        assert_eq!(cache.packages().len(), 1);
    }

    #[tokio::test]
    async fn empty_index_is_an_error() {
        let mut fx = Fixture::new().await;
        let _i = fx.serve_index(&[], &[]).await;
        let cache = Arc::new(ArmoryCache::new());
        let entry = fetcher(&cache, false).fetch_index(&fx.armory).await;
        assert!(matches!(entry.last_error, Some(FetchError::EmptyIndex)));
    }

    #[tokio::test]
    async fn cancelled_refresh_records_cancellation() {
        let mut fx = Fixture::new().await;
        let seatbelt = fx.package("seatbelt", true);
        let _i = fx.serve_index(&[seatbelt], &[]).await;

        let token = CancellationToken::new();
        token.cancel();
        let cache = Arc::new(ArmoryCache::new());
        let results = fetcher(&cache, false)
            .with_cancellation(token)
            .refresh(&[fx.armory.clone()])
            .await;

        assert!(matches!(results[0].index_error, Some(FetchError::Cancelled)));
        assert!(cache.packages().is_empty());
    }

    #[tokio::test]
    async fn archive_is_verified_before_use() {
        let mut fx = Fixture::new().await;
        let seatbelt = fx.package("seatbelt", true);
        let _i = fx.serve_index(&[seatbelt.clone()], &[]).await;
        let _p = fx.serve_package(&seatbelt, &alias_manifest("seatbelt", "1.0")).await;

        let cache = Arc::new(ArmoryCache::new());
        let f = fetcher(&cache, false);
        f.refresh(&[fx.armory.clone()]).await;
        let entry = cache.package(&seatbelt.id()).unwrap();
        let archive = f.fetch_archive(&entry).await.unwrap();
        assert_eq!(archive.package().name, "seatbelt");
        assert!(!archive.bytes().is_empty());
    }
}
