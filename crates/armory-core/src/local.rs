//! Installed packages on disk.
//!
//! Each package lives in its own directory under `aliases/` or
//! `extensions/` with its manifest next to the artifacts. A directory whose
//! manifest is missing or unreadable is not considered installed.

use std::path::{Path, PathBuf};

use tracing::warn;

use armory_schema::{ALIAS_MANIFEST_FILE, EXTENSION_MANIFEST_FILE, PackageManifest};

use crate::paths::Layout;

/// A package found on disk.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    /// Manifest as written at install time.
    pub manifest: PackageManifest,
    /// Install directory.
    pub dir: PathBuf,
}

impl InstalledPackage {
    /// Command names this package registers.
    pub fn command_names(&self) -> Vec<&str> {
        match &self.manifest {
            PackageManifest::Alias(m) => vec![m.command_name.as_str()],
            PackageManifest::Extension(m) => {
                m.commands.iter().map(|c| c.command_name.as_str()).collect()
            }
        }
    }

    /// Name used to match this install against cached packages.
    pub fn lookup_name(&self) -> &str {
        match &self.manifest {
            PackageManifest::Alias(m) => &m.command_name,
            PackageManifest::Extension(m) => &m.name,
        }
    }
}

fn scan(root: &Path, manifest_file: &str, is_alias: bool) -> Vec<InstalledPackage> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for entry in entries.flatten() {
        let dir = entry.path();
        let manifest_path = dir.join(manifest_file);
        let Ok(bytes) = std::fs::read(&manifest_path) else {
            continue;
        };
        match PackageManifest::from_slice(&bytes, is_alias) {
            Ok(manifest) => found.push(InstalledPackage { manifest, dir }),
            Err(e) => warn!("Skipping {}: {e}", manifest_path.display()),
        }
    }
    found.sort_by(|a, b| a.lookup_name().cmp(b.lookup_name()));
    found
}

/// Installed aliases, by command name.
pub fn installed_aliases(layout: &Layout) -> Vec<InstalledPackage> {
    scan(&layout.aliases_dir(), ALIAS_MANIFEST_FILE, true)
}

/// Installed extensions, by command name.
pub fn installed_extensions(layout: &Layout) -> Vec<InstalledPackage> {
    scan(&layout.extensions_dir(), EXTENSION_MANIFEST_FILE, false)
}

/// Every installed package, aliases first.
pub fn installed(layout: &Layout) -> Vec<InstalledPackage> {
    let mut all = installed_aliases(layout);
    all.extend(installed_extensions(layout));
    all
}

/// Returns `true` if an installed package registers `command_name` or is named `command_name`.
pub fn is_installed(layout: &Layout, command_name: &str) -> bool {
    installed(layout)
        .iter()
        .any(|p| p.lookup_name() == command_name || p.command_names().contains(&command_name))
}

/// Directory name a manifest installs into: the command name for aliases,
/// the package name for extensions.
pub fn install_dir_name(manifest: &PackageManifest) -> &str {
    match manifest {
        PackageManifest::Alias(m) => &m.command_name,
        PackageManifest::Extension(m) => &m.name,
    }
}
