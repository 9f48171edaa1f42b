//! Engine for signed armory package sources.
//!
//! Fetches armory indexes and package signatures into a shared cache,
//! verifies them with minisign, and installs and updates packages from it.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod fetch;
pub mod http;
pub mod install;
pub mod local;
pub mod minisign;
pub mod parsers;
pub mod paths;
pub mod reporter;
pub mod resolver;
pub mod settings;
pub mod sources;
pub mod updates;
pub mod verify;

#[cfg(test)]
mod testutil;

pub use cache::{ArmoryCache, IndexCacheEntry, PackageCacheEntry};
pub use error::{FetchError, InstallError, SelectionError, SettingsError, SourcesError, VerifyError};
pub use fetch::{ArmoryRefresh, Fetcher};
pub use install::{Confirm, InstallOptions, InstallReport, Installer};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};
pub use settings::{FetchOptions, Settings};
pub use sources::ArmorySources;

/// User Agent string for armory requests
pub const USER_AGENT: &str = concat!("armory-core/", env!("CARGO_PKG_VERSION"));
