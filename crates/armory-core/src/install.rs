//! Package installation.
//!
//! Only a [`VerifiedArchive`] can be extracted. Files are staged under
//! `tmp/` with the manifest written last, then the staged directory replaces
//! the install directory in one rename.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use armory_schema::{ArmoryBundle, PackageManifest, Platform};

use crate::cache::PackageCacheEntry;
use crate::catalog;
use crate::error::InstallError;
use crate::fetch::Fetcher;
use crate::local::{self, install_dir_name};
use crate::paths::Layout;
use crate::reporter::Reporter;
use crate::resolver::resolve_dependencies;
use crate::settings::DEFAULT_MAX_DEPENDENCY_DEPTH;
use crate::updates::UpdateCandidate;
use crate::verify::VerifiedArchive;

/// Name that installs every known package.
pub const INSTALL_ALL: &str = "all";

/// Asks the operator before replacing an installed package.
pub trait Confirm: Send + Sync {
    fn confirm_overwrite(&self, name: &str) -> bool;
}

/// Never overwrite without `force`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineOverwrite;

impl Confirm for DeclineOverwrite {
    fn confirm_overwrite(&self, _name: &str) -> bool {
        false
    }
}

/// Always overwrite.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptOverwrite;

impl Confirm for AcceptOverwrite {
    fn confirm_overwrite(&self, _name: &str) -> bool {
        true
    }
}

/// How an install treats existing packages and which armory it draws from.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Overwrite installed packages without asking.
    pub force: bool,
    /// Restrict lookups to the armory with this public key.
    pub armory: Option<String>,
}

/// A package written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledItem {
    /// Command name.
    pub name: String,
    /// Version from the manifest.
    pub version: String,
}

/// Outcome of an install touching one or more packages.
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Packages written, dependencies before dependents.
    pub installed: Vec<InstalledItem>,
    /// Packages left alone: already installed or overwrite declined.
    pub skipped: Vec<String>,
    /// Packages that failed, by name.
    pub failed: Vec<(String, InstallError)>,
}

impl InstallReport {
    /// `true` if nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// `true` if `name` was already handled by this report.
    pub fn contains(&self, name: &str) -> bool {
        self.installed.iter().any(|i| i.name == name)
    }

    fn merge(&mut self, other: Self) {
        self.installed.extend(other.installed);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    fn record(&mut self, name: &str, result: Result<Self, InstallError>) {
        match result {
            Ok(report) => self.merge(report),
            Err(InstallError::Declined(n)) => self.skipped.push(n),
            Err(e) => self.failed.push((name.to_string(), e)),
        }
    }
}

/// Installs cached packages through a [`Fetcher`].
pub struct Installer {
    fetcher: Fetcher,
    layout: Layout,
    platform: Platform,
    reporter: Arc<dyn Reporter>,
    confirm: Arc<dyn Confirm>,
    max_depth: usize,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("layout", &self.layout)
            .field("platform", &self.platform)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Installer for the current platform with the default dependency depth.
    pub fn new(
        fetcher: Fetcher,
        layout: Layout,
        reporter: Arc<dyn Reporter>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        Self {
            fetcher,
            layout,
            platform: Platform::current(),
            reporter,
            confirm,
            max_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
        }
    }

    /// Select artifacts for `platform` instead of the host.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Limit dependency chains to `max_depth`.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Install `name`: a package by command name, else a bundle, else every
    /// package when `name` is `all`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::NotFound`] if nothing matches, or the error of
    /// a single-package install.
    pub async fn install(
        &self,
        name: &str,
        options: &InstallOptions,
    ) -> Result<InstallReport, InstallError> {
        let cache = self.fetcher.cache();
        let filter = options.armory.as_deref();
        if let Some(entry) = catalog::find_package(cache, name, filter)? {
            return self.install_package(&entry, options).await;
        }
        if let Some((armory, bundle)) = catalog::find_bundle(cache, name, filter) {
            info!("Installing bundle '{name}' from '{}'", armory.name);
            return Ok(self.install_bundle(&bundle, options).await);
        }
        if name == INSTALL_ALL {
            return Ok(self.install_all(options).await);
        }
        Err(InstallError::NotFound(name.to_string()))
    }

    /// Install every verified package, continuing past failures.
    pub async fn install_all(&self, options: &InstallOptions) -> InstallReport {
        let filter = options.armory.as_deref();
        let entries: Vec<PackageCacheEntry> = self
            .fetcher
            .cache()
            .packages()
            .into_iter()
            .filter(|e| e.is_ok() && filter.is_none_or(|pk| pk == e.armory().public_key))
            .collect();

        self.reporter.section("Installing all packages");
        let mut report = InstallReport::default();
        for entry in entries {
            let name = entry.package().command_name.clone();
            // may already have come in as a dependency
            if report.contains(&name) {
                continue;
            }
            let result = self.install_package(&entry, options).await;
            report.record(&name, result);
        }
        report
    }

    /// Install the members of `bundle`, continuing past failures.
    pub async fn install_bundle(
        &self,
        bundle: &ArmoryBundle,
        options: &InstallOptions,
    ) -> InstallReport {
        self.reporter
            .section(&format!("Installing bundle {}", bundle.name));
        let mut report = InstallReport::default();
        for name in &bundle.packages {
            if report.contains(name) {
                continue;
            }
            let result = match catalog::find_package(self.fetcher.cache(), name, options.armory.as_deref()) {
                Ok(Some(entry)) => self.install_package(&entry, options).await,
                Ok(None) => Err(InstallError::NotFound(name.clone())),
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                self.reporter.failed(name, &e.to_string());
            }
            report.record(name, result);
        }
        report
    }

    /// Install one package, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns the first failure; a failing dependency is wrapped in
    /// [`InstallError::Dependency`].
    pub async fn install_package(
        &self,
        entry: &PackageCacheEntry,
        options: &InstallOptions,
    ) -> Result<InstallReport, InstallError> {
        let mut report = InstallReport::default();
        let root = entry.package().command_name.clone();
        let filter = options.armory.as_deref();

        if matches!(entry.manifest(), Some(PackageManifest::Extension(_))) {
            let chain = resolve_dependencies(&root, self.max_depth, |cmd| self.depends_on(cmd, filter));
            debug!("'{root}' depends on {:?} ({:?})", chain.dependencies, chain.stop);
            for dep in chain.install_order() {
                if local::is_installed(&self.layout, dep) {
                    self.reporter.skipped(dep, "already installed");
                    report.skipped.push(dep.to_string());
                    continue;
                }
                let wrap = |source: InstallError| InstallError::Dependency {
                    package: root.clone(),
                    dependency: dep.to_string(),
                    source: Box::new(source),
                };
                let dep_entry = catalog::find_package(self.fetcher.cache(), dep, filter)
                    .map_err(wrap)?
                    .ok_or_else(|| wrap(InstallError::NotFound(dep.to_string())))?;
                let item = self.install_one(&dep_entry, options.force).await.map_err(wrap)?;
                report.installed.push(item);
            }
        }

        let item = self.install_one(entry, options.force).await?;
        report.installed.push(item);
        Ok(report)
    }

    /// Reinstall each selected update, continuing past failures.
    pub async fn apply_updates(&self, updates: &[UpdateCandidate]) -> InstallReport {
        let options = InstallOptions {
            force: true,
            armory: None,
        };
        self.reporter.section("Updating packages");
        let mut report = InstallReport::default();
        for update in updates {
            let result = match self.fetcher.cache().package(&update.package_id) {
                Some(entry) => self.install_package(&entry, &options).await,
                None => Err(InstallError::NotFound(update.command_name.clone())),
            };
            report.record(&update.command_name, result);
        }
        report
    }

    fn depends_on(&self, command_name: &str, filter: Option<&str>) -> Option<String> {
        let entry = catalog::find_package(self.fetcher.cache(), command_name, filter)
            .ok()
            .flatten()?;
        entry.manifest()?.depends_on().map(str::to_string)
    }

    async fn install_one(
        &self,
        entry: &PackageCacheEntry,
        force: bool,
    ) -> Result<InstalledItem, InstallError> {
        let name = entry.package().command_name.clone();
        let Some(manifest) = entry.manifest() else {
            let err = match entry.last_error() {
                Some(e) => InstallError::Unavailable {
                    package: name.clone(),
                    source: e.clone(),
                },
                None => InstallError::archive(&name, "no verified manifest"),
            };
            self.reporter.failed(&name, &err.to_string());
            return Err(err);
        };
        let version = manifest.version().to_string();
        let dir_name = install_dir_name(manifest).to_string();

        let dir = self.layout.package_dir(manifest.is_alias(), &dir_name);
        if dir.exists() && !force && !self.confirm.confirm_overwrite(&name) {
            self.reporter.skipped(&name, "overwrite declined");
            return Err(InstallError::Declined(name));
        }

        self.reporter.installing(&name, &version);
        let result = async {
            let archive = self.fetcher.fetch_archive(entry).await?;
            let layout = self.layout.clone();
            let platform = self.platform.clone();
            tokio::task::spawn_blocking(move || extract(&archive, &layout, &platform, &dir_name))
                .await
                .map_err(|e| InstallError::Io(std::io::Error::other(e)))?
        }
        .await;

        match result {
            Ok(path) => {
                info!("Installed '{name}' {version} to {}", path.display());
                self.reporter.done(&name, &version, "installed");
                Ok(InstalledItem { name, version })
            }
            Err(e) => {
                self.reporter.failed(&name, &e.to_string());
                Err(e)
            }
        }
    }
}

/// Path inside an archive with `.` components removed.
///
/// # Errors
///
/// Rejects absolute paths and `..`.
fn normalize(package: &str, path: &Path) -> Result<String, InstallError> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => {
                return Err(InstallError::archive(
                    package,
                    format!("unsafe path '{}'", path.display()),
                ));
            }
        }
    }
    if parts.is_empty() {
        return Err(InstallError::archive(package, "empty path"));
    }
    Ok(parts.join("/"))
}

/// Regular files of a gzip'd tar, keyed by normalised path.
fn read_archive(package: &str, bytes: &[u8]) -> Result<HashMap<String, Vec<u8>>, InstallError> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut files = HashMap::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.into_owned();
        let key = normalize(package, &path)?;
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        files.insert(key, data);
    }
    Ok(files)
}

/// Unpack the manifest and the artifacts for `platform` into the install root.
///
/// The archive's manifest must install into `expected_dir`, the directory
/// the overwrite check ran against.
fn extract(
    archive: &VerifiedArchive,
    layout: &Layout,
    platform: &Platform,
    expected_dir: &str,
) -> Result<PathBuf, InstallError> {
    let package = archive.package();
    let name = package.command_name.as_str();
    let files = read_archive(name, archive.bytes())?;

    let manifest_file = if package.is_alias {
        armory_schema::ALIAS_MANIFEST_FILE
    } else {
        armory_schema::EXTENSION_MANIFEST_FILE
    };
    let manifest_bytes = files
        .get(manifest_file)
        .ok_or_else(|| InstallError::archive(name, format!("missing {manifest_file}")))?;
    let mut manifest = PackageManifest::from_slice(manifest_bytes, package.is_alias)?;
    manifest.stamp(&archive.armory().name, &archive.armory().public_key);

    let dir_name = install_dir_name(&manifest);
    if normalize(name, Path::new(dir_name))?.contains('/') {
        return Err(InstallError::archive(name, format!("unsafe name '{dir_name}'")));
    }
    if dir_name != expected_dir {
        return Err(InstallError::archive(
            name,
            format!("archive installs to '{dir_name}', signature names '{expected_dir}'"),
        ));
    }

    let artifacts = manifest.files_for(platform);
    if artifacts.is_empty() {
        warn!("'{name}' ships no artifacts for {platform}");
    }

    let tmp = layout.tmp_dir();
    std::fs::create_dir_all(&tmp)?;
    let staging = tmp.join(format!("{dir_name}.{}", std::process::id()));
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    std::fs::create_dir_all(&staging)?;

    let staged = (|| {
        for artifact in artifacts {
            let key = normalize(name, Path::new(artifact))?;
            let data = files
                .get(&key)
                .ok_or_else(|| InstallError::archive(name, format!("missing artifact '{artifact}'")))?;
            let target = staging.join(&key);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, data)?;
        }
        // manifest last: its presence marks a complete install
        std::fs::write(staging.join(manifest_file), manifest.to_json_pretty()?)?;
        Ok::<(), InstallError>(())
    })();
    if let Err(e) = staged {
        let _ = std::fs::remove_dir_all(&staging);
        return Err(e);
    }

    let dest = layout.package_dir(manifest.is_alias(), dir_name);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if dest.exists() {
        std::fs::remove_dir_all(&dest)?;
    }
    std::fs::rename(&staging, &dest)?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ArmoryCache;
    use crate::minisign::testing::TestKey;
    use crate::reporter::NullReporter;
    use crate::settings::FetchOptions;
    use crate::testutil::{Fixture, alias_manifest, extension_manifest, tar_gz};
    use crate::verify::verify_archive;
    use armory_schema::{ALIAS_MANIFEST_FILE, ArmoryConfig, ArmoryPackage, EXTENSION_MANIFEST_FILE};

    struct Harness {
        fx: Fixture,
        home: tempfile::TempDir,
        cache: Arc<ArmoryCache>,
    }

    impl Harness {
        async fn new() -> Self {
            Self {
                fx: Fixture::new().await,
                home: tempfile::tempdir().unwrap(),
                cache: Arc::new(ArmoryCache::new()),
            }
        }

        fn layout(&self) -> Layout {
            Layout::new(self.home.path())
        }

        fn fetcher(&self) -> Fetcher {
            Fetcher::new(self.cache.clone(), FetchOptions::default()).unwrap()
        }

        async fn refresh(&self) {
            self.fetcher().refresh(&[self.fx.armory.clone()]).await;
        }

        fn installer(&self, confirm: Arc<dyn Confirm>) -> Installer {
            Installer::new(self.fetcher(), self.layout(), Arc::new(NullReporter), confirm)
        }
    }

    #[tokio::test]
    async fn installs_alias_with_stamped_manifest() {
        let mut h = Harness::new().await;
        let seatbelt = h.fx.package("seatbelt", true);
        let _i = h.fx.serve_index(&[seatbelt.clone()], &[]).await;
        let _p = h.fx.serve_package(&seatbelt, &alias_manifest("seatbelt", "v1.0")).await;
        h.refresh().await;

        let report = h
            .installer(Arc::new(DeclineOverwrite))
            .install("seatbelt", &InstallOptions::default())
            .await
            .unwrap();
        assert_eq!(report.installed.len(), 1);
        assert_eq!(report.installed[0].version, "v1.0");

        let dir = h.layout().aliases_dir().join("seatbelt");
        assert_eq!(
            std::fs::read(dir.join("seatbelt.exe")).unwrap(),
            b"payload of seatbelt.exe"
        );
        let installed = local::installed_aliases(&h.layout());
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].manifest.armory_name(), "test");
        assert_eq!(installed[0].manifest.armory_pk(), h.fx.armory.public_key);
        assert!(!h.layout().tmp_dir().join("seatbelt").exists());
    }

    #[tokio::test]
    async fn dependencies_install_first() {
        let mut h = Harness::new().await;
        let coff = h.fx.package("coff-loader", false);
        let nano = h.fx.package("nanodump", false);
        let _i = h.fx.serve_index(&[coff.clone(), nano.clone()], &[]).await;
        let _c = h
            .fx
            .serve_package(&coff, &extension_manifest("coff-loader", "v1.0", ""))
            .await;
        let _n = h
            .fx
            .serve_package(&nano, &extension_manifest("nanodump", "v0.5", "coff-loader"))
            .await;
        h.refresh().await;

        let installer = h.installer(Arc::new(DeclineOverwrite));
        let report = installer
            .install("nanodump", &InstallOptions::default())
            .await
            .unwrap();
        let names: Vec<&str> = report.installed.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["coff-loader", "nanodump"]);
        assert!(local::is_installed(&h.layout(), "coff-loader"));
        assert!(
            h.layout()
                .extensions_dir()
                .join("nanodump")
                .join(EXTENSION_MANIFEST_FILE)
                .exists()
        );

        // installed dependency is not reinstalled
        let report = installer
            .install(
                "nanodump",
                &InstallOptions {
                    force: true,
                    armory: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(report.skipped, vec!["coff-loader"]);
    }

    #[tokio::test]
    async fn missing_dependency_fails_the_install() {
        let mut h = Harness::new().await;
        let nano = h.fx.package("nanodump", false);
        let _i = h.fx.serve_index(&[nano.clone()], &[]).await;
        let _n = h
            .fx
            .serve_package(&nano, &extension_manifest("nanodump", "v0.5", "coff-loader"))
            .await;
        h.refresh().await;

        let err = h
            .installer(Arc::new(DeclineOverwrite))
            .install("nanodump", &InstallOptions::default())
            .await
            .unwrap_err();
        match err {
            InstallError::Dependency {
                dependency, source, ..
            } => {
                assert_eq!(dependency, "coff-loader");
                assert!(matches!(*source, InstallError::NotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!local::is_installed(&h.layout(), "nanodump"));
    }

    #[tokio::test]
    async fn overwrite_requires_confirmation() {
        let mut h = Harness::new().await;
        let seatbelt = h.fx.package("seatbelt", true);
        let _i = h.fx.serve_index(&[seatbelt.clone()], &[]).await;
        let _p = h.fx.serve_package(&seatbelt, &alias_manifest("seatbelt", "v1.0")).await;
        h.refresh().await;

        let options = InstallOptions::default();
        h.installer(Arc::new(DeclineOverwrite))
            .install("seatbelt", &options)
            .await
            .unwrap();
        let err = h
            .installer(Arc::new(DeclineOverwrite))
            .install("seatbelt", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Declined(_)));

        let report = h
            .installer(Arc::new(AcceptOverwrite))
            .install("seatbelt", &options)
            .await
            .unwrap();
        assert_eq!(report.installed.len(), 1);
    }

    #[tokio::test]
    async fn tampered_archive_is_rejected_at_install() {
        let mut h = Harness::new().await;
        let seatbelt = h.fx.package("seatbelt", true);
        let _i = h.fx.serve_index(&[seatbelt.clone()], &[]).await;
        let good = h.fx.serve_package(&seatbelt, &alias_manifest("seatbelt", "v1.0")).await;
        h.refresh().await;

        good.remove_async().await;
        let _evil = h
            .fx
            .serve_package_signed_by(&seatbelt, &alias_manifest("seatbelt", "v1.0"), &TestKey::new(66))
            .await;

        let err = h
            .installer(Arc::new(AcceptOverwrite))
            .install("seatbelt", &InstallOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_integrity());
        assert!(!h.layout().aliases_dir().join("seatbelt").exists());
    }

    #[tokio::test]
    async fn unsigned_index_cannot_choose_the_signing_key() {
        let mut h = Harness::new().await;
        let intruder = TestKey::new(99);
        let mut seatbelt = h.fx.package("seatbelt", true);
        seatbelt.public_key = intruder.public_key_text();
        let _i = h.fx.serve_plain_index(&[seatbelt.clone()]).await;
        let _p = h
            .fx
            .serve_package_signed_by(&seatbelt, &alias_manifest("seatbelt", "v6.6.6"), &intruder)
            .await;
        h.refresh().await;

        let err = h
            .installer(Arc::new(AcceptOverwrite))
            .install("seatbelt", &InstallOptions::default())
            .await
            .unwrap_err();
        assert!(
            matches!(&err, InstallError::Unavailable { source, .. } if source.is_integrity()),
            "{err}"
        );
        assert!(!h.layout().aliases_dir().join("seatbelt").exists());
    }

    #[tokio::test]
    async fn bundle_continues_past_failures() {
        let mut h = Harness::new().await;
        let seatbelt = h.fx.package("seatbelt", true);
        let bundle = ArmoryBundle {
            name: "recon".into(),
            packages: vec!["ghost".into(), "seatbelt".into()],
        };
        let _i = h.fx.serve_index(&[seatbelt.clone()], &[bundle]).await;
        let _p = h.fx.serve_package(&seatbelt, &alias_manifest("seatbelt", "v1.0")).await;
        h.refresh().await;

        let report = h
            .installer(Arc::new(DeclineOverwrite))
            .install("recon", &InstallOptions::default())
            .await
            .unwrap();
        assert_eq!(report.installed.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].1, InstallError::NotFound(_)));
    }

    #[tokio::test]
    async fn install_all_and_not_found() {
        let mut h = Harness::new().await;
        let a = h.fx.package("alpha", true);
        let b = h.fx.package("beta", true);
        let _i = h.fx.serve_index(&[a.clone(), b.clone()], &[]).await;
        let _a = h.fx.serve_package(&a, &alias_manifest("alpha", "1")).await;
        let _b = h.fx.serve_package(&b, &alias_manifest("beta", "1")).await;
        h.refresh().await;

        let installer = h.installer(Arc::new(DeclineOverwrite));
        let report = installer
            .install(INSTALL_ALL, &InstallOptions::default())
            .await
            .unwrap();
        assert_eq!(report.installed.len(), 2);
        assert!(report.is_success());

        assert!(matches!(
            installer.install("gamma", &InstallOptions::default()).await,
            Err(InstallError::NotFound(_))
        ));
    }

    fn verified(entries: &[(&str, &[u8])]) -> VerifiedArchive {
        let key = TestKey::new(11);
        let armory = ArmoryConfig::new("local", "https://armory.example", key.public_key_text());
        let package = ArmoryPackage {
            name: "evil".into(),
            command_name: "evil".into(),
            repo_url: "https://armory.example/evil".into(),
            public_key: String::new(),
            is_alias: true,
        };
        let archive = tar_gz(entries);
        let sig = key.sign(&archive, "c");
        verify_archive(&armory, &package, &sig, archive).unwrap()
    }

    #[test]
    fn traversal_in_archive_is_rejected() {
        let mut header = tar::Header::new_gnu();
        let name = b"../escape";
        header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(3);
        header.set_mode(0o644);
        header.set_cksum();
        let mut builder =
            tar::Builder::new(flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default()));
        builder.append(&header, &b"bad"[..]).unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();
        let err = read_archive("evil", &bytes).unwrap_err();
        assert!(matches!(err, InstallError::Archive { .. }));
    }

    #[test]
    fn traversal_in_manifest_is_rejected() {
        let platform = Platform::current();
        let manifest = serde_json::json!({
            "name": "evil",
            "command_name": "evil",
            "files": [{"os": platform.os(), "arch": platform.arch(), "path": "../../outside"}],
        })
        .to_string();
        let archive = verified(&[(ALIAS_MANIFEST_FILE, manifest.as_bytes())]);
        let home = tempfile::tempdir().unwrap();
        let err = extract(&archive, &Layout::new(home.path()), &platform, "evil").unwrap_err();
        assert!(matches!(err, InstallError::Archive { .. }));
        assert!(!home.path().join("aliases").join("evil").exists());
    }

    #[test]
    fn missing_artifact_leaves_nothing_behind() {
        let platform = Platform::current();
        let manifest = alias_manifest("evil", "1");
        let archive = verified(&[(ALIAS_MANIFEST_FILE, manifest.as_bytes())]);
        let home = tempfile::tempdir().unwrap();
        let layout = Layout::new(home.path());
        assert!(extract(&archive, &layout, &platform, "evil").is_err());
        assert!(!layout.aliases_dir().join("evil").exists());
        assert_eq!(std::fs::read_dir(layout.tmp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn archive_for_another_directory_is_rejected() {
        let platform = Platform::current();
        let manifest = alias_manifest("rubeus", "1");
        let archive = verified(&[
            (ALIAS_MANIFEST_FILE, manifest.as_bytes()),
            ("rubeus.exe", b"payload"),
        ]);
        let home = tempfile::tempdir().unwrap();
        let layout = Layout::new(home.path());
        let existing = layout.aliases_dir().join("rubeus");
        std::fs::create_dir_all(&existing).unwrap();
        std::fs::write(existing.join(ALIAS_MANIFEST_FILE), "{}").unwrap();

        let err = extract(&archive, &layout, &platform, "evil").unwrap_err();
        assert!(matches!(err, InstallError::Archive { .. }));
        assert_eq!(std::fs::read_to_string(existing.join(ALIAS_MANIFEST_FILE)).unwrap(), "{}");
        assert!(!layout.aliases_dir().join("evil").exists());
    }
}
