use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

use armory_schema::{ArmoryIndex, ArmoryPackage, IndexEnvelope, PackageEnvelope};

use super::{FetchedPackage, verified_index};
use crate::error::FetchError;
use crate::http::ArmoryRequester;

/// Plain index JSON or `{minisig, armory_index}` envelope.
///
/// Package keys named by a plain index are dropped, so its packages must
/// be signed with the armory key.
pub(super) async fn fetch_index(
    requester: &ArmoryRequester,
    url: &str,
    public_key: &str,
) -> Result<ArmoryIndex, FetchError> {
    let body = requester.get_bytes(url).await?;

    if let Ok(envelope) = serde_json::from_slice::<IndexEnvelope>(&body) {
        let content = BASE64
            .decode(envelope.armory_index.trim())
            .map_err(|e| FetchError::parse(url, e))?;
        return verified_index(url, public_key, &envelope.minisig, &content);
    }

    debug!("Index at {url} is unsigned, ignoring its package keys");
    let mut index = ArmoryIndex::from_slice(&body).map_err(|e| FetchError::parse(url, e))?;
    for package in index.aliases.iter_mut().chain(index.extensions.iter_mut()) {
        package.public_key.clear();
    }
    Ok(index)
}

/// `{minisig, tar_gz}` envelope at the package URL.
pub(super) async fn fetch_package(
    requester: &ArmoryRequester,
    package: &ArmoryPackage,
    signature_only: bool,
) -> Result<FetchedPackage, FetchError> {
    let url = &package.repo_url;
    let envelope: PackageEnvelope = requester.get_json(url).await?;
    let archive = if signature_only {
        None
    } else {
        if envelope.tar_gz.is_empty() {
            return Err(FetchError::parse(url, "envelope has no archive"));
        }
        Some(
            BASE64
                .decode(envelope.tar_gz.trim())
                .map_err(|e| FetchError::parse(url, e))?,
        )
    };
    Ok(FetchedPackage {
        signature: envelope.minisig,
        archive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_client;
    use crate::minisign::testing::TestKey;
    use crate::settings::FetchOptions;

    const INDEX: &str = r#"{"aliases":[{"name":"a","command_name":"a","repo_url":"https://x/a","public_key":"RWpackage"}]}"#;

    fn requester(server: &mockito::Server) -> ArmoryRequester {
        let client = build_client(&FetchOptions::default()).unwrap();
        ArmoryRequester::new(client, &reqwest::Url::parse(&server.url()).unwrap(), None)
    }

    #[tokio::test]
    async fn signed_envelope_is_verified() {
        let key = TestKey::new(3);
        let envelope = serde_json::json!({
            "minisig": key.sign(INDEX.as_bytes(), "index"),
            "armory_index": BASE64.encode(INDEX),
        });
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/index")
            .with_body(envelope.to_string())
            .create_async()
            .await;
        let url = format!("{}/index", server.url());

        let index = fetch_index(&requester(&server), &url, &key.public_key_text())
            .await
            .unwrap();
        assert_eq!(index.package_count(), 1);
        assert_eq!(index.aliases[0].public_key, "RWpackage");

        let wrong = TestKey::new(4);
        let err = fetch_index(&requester(&server), &url, &wrong.public_key_text())
            .await
            .unwrap_err();
        assert!(err.is_integrity());
    }

    #[tokio::test]
    async fn plain_index_is_accepted_without_package_keys() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/index")
            .with_body(INDEX)
            .create_async()
            .await;
        let url = format!("{}/index", server.url());
        let index = fetch_index(&requester(&server), &url, "unused")
            .await
            .unwrap();
        assert!(index.aliases[0].is_alias);
        assert!(index.aliases[0].public_key.is_empty());
    }

    #[tokio::test]
    async fn package_envelope() {
        let key = TestKey::new(3);
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/pkg")
            .with_body(
                serde_json::json!({
                    "minisig": key.sign(b"tarball", "x"),
                    "tar_gz": BASE64.encode(b"tarball"),
                })
                .to_string(),
            )
            .create_async()
            .await;
        let package = ArmoryPackage {
            name: "pkg".into(),
            command_name: "pkg".into(),
            repo_url: format!("{}/pkg", server.url()),
            public_key: String::new(),
            is_alias: true,
        };
        let sig_only = fetch_package(&requester(&server), &package, true)
            .await
            .unwrap();
        assert!(sig_only.archive.is_none());
        let full = fetch_package(&requester(&server), &package, false)
            .await
            .unwrap();
        assert_eq!(full.archive.as_deref(), Some(&b"tarball"[..]));
    }
}
