//! Hostname-selected strategies for reading indexes and packages.
//!
//! Armories publish through a plain HTTP endpoint or through GitHub
//! releases. The strategy is a pure function of the URL's host; unknown
//! hosts fall back to the default endpoint format.

mod default;
mod github;

use armory_schema::{ArmoryIndex, ArmoryPackage};

use crate::error::FetchError;
use crate::http::ArmoryRequester;

pub use github::{GithubAsset, GithubRelease};

/// Strategy for reading an armory index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexParser {
    /// JSON index, optionally wrapped in a signed envelope.
    Default,
    /// `armory.json` + `armory.minisig` assets of the latest GitHub release.
    GithubApi,
}

const INDEX_PARSERS: &[(&str, IndexParser)] = &[("api.github.com", IndexParser::GithubApi)];

impl IndexParser {
    /// Select the parser for an index hosted on `host`.
    pub fn for_host(host: &str) -> Self {
        INDEX_PARSERS
            .iter()
            .find(|(h, _)| host.eq_ignore_ascii_case(h))
            .map_or(Self::Default, |(_, p)| *p)
    }

    /// Fetch and authenticate the index at `url` with `public_key`.
    ///
    /// # Errors
    ///
    /// Returns transport, parse and integrity failures as [`FetchError`].
    pub async fn fetch(
        self,
        requester: &ArmoryRequester,
        url: &str,
        public_key: &str,
    ) -> Result<ArmoryIndex, FetchError> {
        match self {
            Self::Default => default::fetch_index(requester, url, public_key).await,
            Self::GithubApi => github::fetch_index(requester, url, public_key).await,
        }
    }
}

/// Strategy for reading a package signature and archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageParser {
    /// JSON envelope carrying the signature and the base64 archive.
    Default,
    /// Assets of the latest release via the GitHub API.
    GithubApi,
    /// `releases/latest/download/` links on github.com.
    Github,
}

const PACKAGE_PARSERS: &[(&str, PackageParser)] = &[
    ("api.github.com", PackageParser::GithubApi),
    ("github.com", PackageParser::Github),
];

/// Signature text and, unless only the signature was requested, the archive.
#[derive(Debug, Clone)]
pub struct FetchedPackage {
    /// Minisign signature text.
    pub signature: String,
    /// Archive bytes; `None` in signature-only mode.
    pub archive: Option<Vec<u8>>,
}

impl PackageParser {
    /// Select the parser for a package hosted on `host`.
    pub fn for_host(host: &str) -> Self {
        PACKAGE_PARSERS
            .iter()
            .find(|(h, _)| host.eq_ignore_ascii_case(h))
            .map_or(Self::Default, |(_, p)| *p)
    }

    /// Download `package`. With `signature_only` the archive is not fetched.
    ///
    /// # Errors
    ///
    /// Returns transport and parse failures as [`FetchError`]. Nothing is
    /// verified here.
    pub async fn fetch(
        self,
        requester: &ArmoryRequester,
        package: &ArmoryPackage,
        signature_only: bool,
    ) -> Result<FetchedPackage, FetchError> {
        match self {
            Self::Default => default::fetch_package(requester, package, signature_only).await,
            Self::GithubApi => {
                github::fetch_package_api(requester, package, signature_only).await
            }
            Self::Github => github::fetch_package_web(requester, package, signature_only).await,
        }
    }
}

/// Verify `signature` over `content` and decode the signed index.
fn verified_index(
    url: &str,
    public_key: &str,
    signature: &str,
    content: &[u8],
) -> Result<ArmoryIndex, FetchError> {
    let pk = crate::minisign::PublicKey::from_text(public_key)?;
    crate::minisign::Signature::from_text(signature)?.verify(&pk, content)?;
    ArmoryIndex::from_slice(content).map_err(|e| FetchError::parse(url, e))
}
