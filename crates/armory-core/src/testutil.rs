//! Signed armory fixtures served from a mock HTTP server.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::{Mock, ServerGuard};

use armory_schema::{ArmoryBundle, ArmoryConfig, ArmoryIndex, ArmoryPackage, Platform};

use crate::minisign::testing::TestKey;

/// gzip'd tar of `entries`.
pub(crate) fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Alias manifest with one artifact for the current platform.
pub(crate) fn alias_manifest(name: &str, version: &str) -> String {
    let platform = Platform::current();
    serde_json::json!({
        "name": name,
        "version": version,
        "command_name": name,
        "original_author": "tester",
        "repo_url": format!("https://github.com/test/{name}"),
        "help": format!("{name} help"),
        "files": [{"os": platform.os(), "arch": platform.arch(), "path": format!("{name}.exe")}],
    })
    .to_string()
}

/// Extension manifest with one command and one artifact for the current platform.
pub(crate) fn extension_manifest(name: &str, version: &str, depends_on: &str) -> String {
    let platform = Platform::current();
    serde_json::json!({
        "name": name,
        "version": version,
        "extension_author": "tester",
        "repo_url": format!("https://github.com/test/{name}"),
        "depends_on": depends_on,
        "commands": [{
            "command_name": name,
            "help": format!("{name} help"),
            "files": [{"os": platform.os(), "arch": platform.arch(), "path": format!("{name}.bin")}],
        }],
    })
    .to_string()
}

/// A mock armory signing everything with one key.
pub(crate) struct Fixture {
    pub server: ServerGuard,
    pub key: TestKey,
    pub armory: ArmoryConfig,
}

impl Fixture {
    pub(crate) async fn new() -> Self {
        let server = mockito::Server::new_async().await;
        let key = TestKey::new(42);
        let armory = ArmoryConfig::new(
            "test",
            format!("{}/index", server.url()),
            key.public_key_text(),
        );
        Self {
            server,
            key,
            armory,
        }
    }

    pub(crate) fn package(&self, name: &str, is_alias: bool) -> ArmoryPackage {
        ArmoryPackage {
            name: name.into(),
            command_name: name.into(),
            repo_url: format!("{}/packages/{name}", self.server.url()),
            public_key: self.armory.public_key.clone(),
            is_alias,
        }
    }

    /// Serve a signed index listing `packages` and `bundles`.
    pub(crate) async fn serve_index(
        &mut self,
        packages: &[ArmoryPackage],
        bundles: &[ArmoryBundle],
    ) -> Mock {
        self.index_mock(packages, bundles).create_async().await
    }

    /// Not yet created index mock, for setting expectations first.
    pub(crate) fn index_mock(&mut self, packages: &[ArmoryPackage], bundles: &[ArmoryBundle]) -> Mock {
        let body = index_envelope(&self.key, packages, bundles);
        self.server.mock("GET", "/index").with_body(body)
    }

    /// Serve `packages` as plain, unsigned index JSON.
    pub(crate) async fn serve_plain_index(&mut self, packages: &[ArmoryPackage]) -> Mock {
        let index = ArmoryIndex {
            aliases: packages.iter().filter(|p| p.is_alias).cloned().collect(),
            extensions: packages.iter().filter(|p| !p.is_alias).cloned().collect(),
            bundles: Vec::new(),
        };
        self.server
            .mock("GET", "/index")
            .with_body(serde_json::to_vec(&index).unwrap())
            .create_async()
            .await
    }

    /// Serve `package` as a signed envelope holding `manifest` plus one
    /// artifact per current-platform file.
    pub(crate) async fn serve_package(&mut self, package: &ArmoryPackage, manifest: &str) -> Mock {
        let key = TestKey::new(42);
        self.package_mock(package, manifest, &key)
            .create_async()
            .await
    }

    pub(crate) async fn serve_package_signed_by(
        &mut self,
        package: &ArmoryPackage,
        manifest: &str,
        key: &TestKey,
    ) -> Mock {
        self.package_mock(package, manifest, key)
            .create_async()
            .await
    }

    /// Not yet created package mock signed by `key`.
    pub(crate) fn package_mock(
        &mut self,
        package: &ArmoryPackage,
        manifest: &str,
        key: &TestKey,
    ) -> Mock {
        let body = package_envelope(package, manifest, key);
        self.server
            .mock("GET", format!("/packages/{}", package.name).as_str())
            .with_body(body)
    }
}

/// `{minisig, armory_index}` envelope signed by `key`.
pub(crate) fn index_envelope(
    key: &TestKey,
    packages: &[ArmoryPackage],
    bundles: &[ArmoryBundle],
) -> String {
    let index = ArmoryIndex {
        aliases: packages.iter().filter(|p| p.is_alias).cloned().collect(),
        extensions: packages.iter().filter(|p| !p.is_alias).cloned().collect(),
        bundles: bundles.to_vec(),
    };
    let json = serde_json::to_vec(&index).unwrap();
    serde_json::json!({
        "minisig": key.sign(&json, "armory index"),
        "armory_index": BASE64.encode(&json),
    })
    .to_string()
}

/// `{minisig, tar_gz}` envelope holding `manifest` plus one artifact per
/// current-platform file, signed by `key`.
pub(crate) fn package_envelope(package: &ArmoryPackage, manifest: &str, key: &TestKey) -> String {
    let manifest_file = if package.is_alias {
        "alias.json"
    } else {
        "extension.json"
    };
    let parsed = armory_schema::PackageManifest::from_slice(manifest.as_bytes(), package.is_alias)
        .unwrap();
    let platform = Platform::current();
    let mut entries: Vec<(String, Vec<u8>)> =
        vec![(format!("./{manifest_file}"), manifest.as_bytes().to_vec())];
    for path in parsed.files_for(&platform) {
        entries.push((format!("./{path}"), format!("payload of {path}").into_bytes()));
    }
    let borrowed: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(p, d)| (p.as_str(), d.as_slice()))
        .collect();
    let archive = tar_gz(&borrowed);
    serde_json::json!({
        "minisig": key.sign(&archive, &BASE64.encode(manifest)),
        "tar_gz": BASE64.encode(&archive),
    })
    .to_string()
}
