use serde::Deserialize;

use armory_schema::{ArmoryIndex, ArmoryPackage};

use super::{FetchedPackage, verified_index};
use crate::error::FetchError;
use crate::http::ArmoryRequester;

const INDEX_ASSET: &str = "armory.json";
const INDEX_SIGNATURE_ASSET: &str = "armory.minisig";

/// Release as returned by the GitHub API.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

/// Downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl GithubRelease {
    fn asset(&self, name: &str) -> Option<&GithubAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// The releases endpoint returns a list, `releases/latest` a single object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReleasesResponse {
    Many(Vec<GithubRelease>),
    One(GithubRelease),
}

async fn latest_release(requester: &ArmoryRequester, url: &str) -> Result<GithubRelease, FetchError> {
    let release = match requester.get_json::<ReleasesResponse>(url).await? {
        ReleasesResponse::One(release) => Some(release),
        // newest first
        ReleasesResponse::Many(releases) => releases.into_iter().find(|r| !r.draft),
    };
    release.ok_or_else(|| FetchError::parse(url, "no published release"))
}

async fn download_asset(
    requester: &ArmoryRequester,
    url: &str,
    release: &GithubRelease,
    name: &str,
) -> Result<Vec<u8>, FetchError> {
    let asset = release.asset(name).ok_or_else(|| {
        FetchError::parse(url, format!("release {} has no asset '{name}'", release.tag_name))
    })?;
    requester.get_bytes(&asset.browser_download_url).await
}

fn utf8(url: &str, bytes: Vec<u8>) -> Result<String, FetchError> {
    String::from_utf8(bytes).map_err(|e| FetchError::parse(url, e))
}

pub(super) async fn fetch_index(
    requester: &ArmoryRequester,
    url: &str,
    public_key: &str,
) -> Result<ArmoryIndex, FetchError> {
    let release = latest_release(requester, url).await?;
    let signature = utf8(
        url,
        download_asset(requester, url, &release, INDEX_SIGNATURE_ASSET).await?,
    )?;
    let content = download_asset(requester, url, &release, INDEX_ASSET).await?;
    verified_index(url, public_key, &signature, &content)
}

pub(super) async fn fetch_package_api(
    requester: &ArmoryRequester,
    package: &ArmoryPackage,
    signature_only: bool,
) -> Result<FetchedPackage, FetchError> {
    let url = &package.repo_url;
    let release = latest_release(requester, url).await?;
    let signature = utf8(
        url,
        download_asset(requester, url, &release, &format!("{}.minisig", package.name)).await?,
    )?;
    let archive = if signature_only {
        None
    } else {
        Some(download_asset(requester, url, &release, &format!("{}.tar.gz", package.name)).await?)
    };
    Ok(FetchedPackage { signature, archive })
}

pub(super) async fn fetch_package_web(
    requester: &ArmoryRequester,
    package: &ArmoryPackage,
    signature_only: bool,
) -> Result<FetchedPackage, FetchError> {
    let base = format!(
        "{}/releases/latest/download",
        package.repo_url.trim_end_matches('/')
    );
    let signature_url = format!("{base}/{}.minisig", package.name);
    let signature = utf8(&signature_url, requester.get_bytes(&signature_url).await?)?;
    let archive = if signature_only {
        None
    } else {
        Some(
            requester
                .get_bytes(&format!("{base}/{}.tar.gz", package.name))
                .await?,
        )
    };
    Ok(FetchedPackage { signature, archive })
}
