//! Package signature checks.
//!
//! Two checks run at different times. At fetch time only the trusted comment
//! is authenticated, which yields the manifest without touching the
//! archive. At install time the archive itself is checked and wrapped in a
//! [`VerifiedArchive`], the only input the extractor accepts.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use armory_schema::{ArmoryConfig, ArmoryPackage, PackageManifest};

use crate::error::VerifyError;
use crate::minisign::{PublicKey, Signature};

/// Key that signs `package`: its own key, or the armory key if it has none.
pub fn signing_key<'a>(armory: &'a ArmoryConfig, package: &'a ArmoryPackage) -> &'a str {
    if package.public_key.is_empty() {
        &armory.public_key
    } else {
        &package.public_key
    }
}

/// Authenticate the trusted comment of `signature` and decode the manifest in it.
///
/// The manifest is stamped with the armory it came from.
///
/// # Errors
///
/// Returns a [`VerifyError`] if the signature is malformed or not made by
/// the package key, or if the comment is not a base64 manifest.
pub fn verify_manifest(
    armory: &ArmoryConfig,
    package: &ArmoryPackage,
    signature: &str,
) -> Result<PackageManifest, VerifyError> {
    let pk = PublicKey::from_text(signing_key(armory, package))?;
    let sig = Signature::from_text(signature)?;
    sig.verify_trusted_comment(&pk)?;

    let bytes = BASE64
        .decode(sig.trusted_comment().trim())
        .map_err(|e| VerifyError::Manifest(e.to_string()))?;
    let mut manifest = PackageManifest::from_slice(&bytes, package.is_alias)
        .map_err(|e| VerifyError::Manifest(e.to_string()))?;
    manifest.stamp(&armory.name, &armory.public_key);
    Ok(manifest)
}

/// Archive bytes whose signature has been checked.
#[derive(Debug)]
pub struct VerifiedArchive {
    armory: ArmoryConfig,
    package: ArmoryPackage,
    bytes: Vec<u8>,
}

impl VerifiedArchive {
    /// Armory the package came from.
    pub fn armory(&self) -> &ArmoryConfig {
        &self.armory
    }

    /// Package the archive belongs to.
    pub fn package(&self) -> &ArmoryPackage {
        &self.package
    }

    /// Verified gzip'd tar.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Check `archive` against `signature` with the package key.
///
/// # Errors
///
/// Returns a [`VerifyError`] if the archive or the trusted comment does not verify.
pub fn verify_archive(
    armory: &ArmoryConfig,
    package: &ArmoryPackage,
    signature: &str,
    archive: Vec<u8>,
) -> Result<VerifiedArchive, VerifyError> {
    let pk = PublicKey::from_text(signing_key(armory, package))?;
    Signature::from_text(signature)?.verify(&pk, &archive)?;
    Ok(VerifiedArchive {
        armory: armory.clone(),
        package: package.clone(),
        bytes: archive,
    })
}
