//! Shared types and wire formats for armory package sources.
//!
//! Everything in this crate is plain data: the persisted armory
//! configuration, the index document an armory publishes, the manifests
//! carried inside package signatures, and the identifiers the client derives
//! from them. Network and filesystem behaviour lives in `armory-core`.

pub mod config;
pub mod index;
pub mod manifest;
pub mod package_id;
pub mod platform;
pub mod version;

// Re-exports
pub use config::ArmoryConfig;
pub use index::{ArmoryBundle, ArmoryIndex, ArmoryPackage, IndexEnvelope, PackageEnvelope};
pub use manifest::{
    AliasManifest, ExtensionArgument, ExtensionCommand, ExtensionManifest, ManifestError,
    ManifestFile, PackageManifest,
};
pub use package_id::PackageId;
pub use platform::Platform;
pub use version::VersionOrdering;

/// Reserved name of the built-in armory.
pub const DEFAULT_ARMORY_NAME: &str = "Default";

/// Releases endpoint of the built-in armory.
pub const DEFAULT_ARMORY_REPO_URL: &str =
    "https://api.github.com/repos/sliverarmory/armory/releases";

/// Root of Trust: minisign public key of the built-in armory (Base64).
pub const DEFAULT_ARMORY_PUBLIC_KEY: &str =
    "RWSBpxpRWDrD7Fe+VvRE3c2VEDC2NK80rlNCj+BX0gz44Xw07r6KQD9L";

/// File name of an installed alias manifest.
pub const ALIAS_MANIFEST_FILE: &str = "alias.json";

/// File name of an installed extension manifest.
pub const EXTENSION_MANIFEST_FILE: &str = "extension.json";
