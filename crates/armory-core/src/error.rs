//! Domain-specific errors for armory operations.
//!
//! Fetch errors are stored inside cache entries and handed to every reader,
//! so they are `Clone` and carry rendered messages rather than the
//! underlying `reqwest` error.

use armory_schema::ManifestError;
use thiserror::Error;

/// Integrity failures. Never downgraded to a warning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Malformed public key: {0}")]
    PublicKey(String),

    #[error("Malformed signature: {0}")]
    SignatureFormat(String),

    #[error("Unsupported signature algorithm '{0}'")]
    Algorithm(String),

    #[error("Signature was made with key {signature_key}, expected key {public_key}")]
    KeyMismatch {
        public_key: String,
        signature_key: String,
    },

    #[error("Signature does not match the signed content")]
    BadSignature,

    #[error("Trusted comment signature is invalid")]
    BadTrustedComment,

    #[error("Signature has no trusted comment")]
    MissingTrustedComment,

    #[error("Trusted comment is not a valid manifest: {0}")]
    Manifest(String),
}

/// Failures while fetching an index, a signature or an archive.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Invalid repository URL '{url}': {reason}")]
    Config { url: String, reason: String },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Authorization command failed: {0}")]
    Authorization(String),

    #[error("Signature verification failed: {0}")]
    Integrity(#[from] VerifyError),

    #[error("Armory index lists no packages")]
    EmptyIndex,

    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns `true` for signature and trusted-comment failures.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    pub(crate) fn parse(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// Failures of the install and update paths, reported with the package name.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("No package or bundle named '{0}'")]
    NotFound(String),

    #[error("'{name}' is published by several armories ({armories}); pick one with --armory")]
    Ambiguous { name: String, armories: String },

    #[error("Package '{package}' is unavailable: {source}")]
    Unavailable {
        package: String,
        source: FetchError,
    },

    #[error("Package '{package}' failed signature verification: {source}")]
    Integrity {
        package: String,
        source: VerifyError,
    },

    #[error("Failed to download '{package}': {source}")]
    Fetch {
        package: String,
        source: FetchError,
    },

    #[error("Dependency '{dependency}' of '{package}' failed: {source}")]
    Dependency {
        package: String,
        dependency: String,
        source: Box<InstallError>,
    },

    #[error("'{0}' is already installed and overwrite was declined")]
    Declined(String),

    #[error("Invalid archive for '{package}': {reason}")]
    Archive { package: String, reason: String },

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Returns `true` if signature verification rejected the package,
    /// directly or through one of its dependencies.
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::Integrity { .. } => true,
            Self::Fetch { source, .. } | Self::Unavailable { source, .. } => source.is_integrity(),
            Self::Dependency { source, .. } => source.is_integrity(),
            _ => false,
        }
    }

    pub(crate) fn archive(package: &str, reason: impl std::fmt::Display) -> Self {
        Self::Archive {
            package: package.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Invalid operator input to the update selection prompt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No selection given")]
    Empty,

    #[error("Invalid selection '{0}'")]
    Invalid(String),

    #[error("Selection {index} is out of range (1-{max})")]
    OutOfRange { index: usize, max: usize },
}

/// Errors editing or persisting the armory source list.
#[derive(Error, Debug)]
pub enum SourcesError {
    #[error("An armory named '{0}' already exists")]
    DuplicateName(String),

    #[error("Armory '{existing}' already uses this public key")]
    DuplicateKey { existing: String },

    #[error("No armory named '{0}'")]
    Unknown(String),

    #[error("'{0}' is reserved for the built-in armory")]
    Reserved(String),

    #[error("Invalid armory: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid armories file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors loading `settings.toml`.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),
}
