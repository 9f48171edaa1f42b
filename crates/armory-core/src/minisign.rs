//! Minisign public keys and signatures.
//!
//! Key text is base64 of `Ed || key_id(8) || ed25519_key(32)`, optionally
//! preceded by an `untrusted comment:` line. A signature file has four lines:
//!
//! ```text
//! untrusted comment: <free text>
//! base64(algorithm(2) || key_id(8) || signature(64))
//! trusted comment: <text>
//! base64(global_signature(64))
//! ```
//!
//! The global signature covers `signature || trusted comment`, which lets the
//! trusted comment be authenticated without the signed file. Algorithm `Ed`
//! signs the file directly, `ED` signs its BLAKE2b-512 digest.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use blake2::{Blake2b512, Digest};
use ed25519_dalek::{Signature as EdSignature, Verifier, VerifyingKey};

use crate::error::VerifyError;

const UNTRUSTED_PREFIX: &str = "untrusted comment:";
const TRUSTED_PREFIX: &str = "trusted comment: ";
const KEY_ALGORITHM: [u8; 2] = *b"Ed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Plain,
    Prehashed,
}

impl Algorithm {
    fn from_bytes(bytes: [u8; 2]) -> Result<Self, VerifyError> {
        match &bytes {
            b"Ed" => Ok(Self::Plain),
            b"ED" => Ok(Self::Prehashed),
            other => Err(VerifyError::Algorithm(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

/// A minisign public key.
#[derive(Debug, Clone)]
pub struct PublicKey {
    key_id: [u8; 8],
    key: VerifyingKey,
}

impl PublicKey {
    /// Parse base64 key text, with or without the comment line.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::PublicKey`] if the text is not a minisign key.
    pub fn from_text(text: &str) -> Result<Self, VerifyError> {
        let encoded = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with(UNTRUSTED_PREFIX))
            .ok_or_else(|| VerifyError::PublicKey("empty key".into()))?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| VerifyError::PublicKey(e.to_string()))?;
        if bytes.len() != 42 {
            return Err(VerifyError::PublicKey(format!(
                "expected 42 bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[..2] != KEY_ALGORITHM {
            return Err(VerifyError::PublicKey("unsupported key algorithm".into()));
        }
        let key_id = to_array::<8>(&bytes[2..10]);
        let key = VerifyingKey::from_bytes(&to_array::<32>(&bytes[10..]))
            .map_err(|e| VerifyError::PublicKey(e.to_string()))?;
        Ok(Self { key_id, key })
    }

    /// Key id as shown by minisign (big-endian hex).
    pub fn key_id(&self) -> String {
        key_id_hex(&self.key_id)
    }
}

/// A parsed minisign signature.
#[derive(Debug, Clone)]
pub struct Signature {
    algorithm: Algorithm,
    key_id: [u8; 8],
    signature: EdSignature,
    trusted_comment: String,
    global_signature: EdSignature,
}

impl Signature {
    /// Parse the four-line signature text.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::SignatureFormat`] on a malformed file,
    /// [`VerifyError::Algorithm`] for unknown algorithms and
    /// [`VerifyError::MissingTrustedComment`] if the trusted comment is absent.
    pub fn from_text(text: &str) -> Result<Self, VerifyError> {
        let mut lines = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let first = lines
            .next()
            .ok_or_else(|| VerifyError::SignatureFormat("empty signature".into()))?;
        let encoded = if first.starts_with(UNTRUSTED_PREFIX) {
            lines
                .next()
                .ok_or_else(|| VerifyError::SignatureFormat("missing signature line".into()))?
        } else {
            first
        };

        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| VerifyError::SignatureFormat(e.to_string()))?;
        if bytes.len() != 74 {
            return Err(VerifyError::SignatureFormat(format!(
                "expected 74 bytes, got {}",
                bytes.len()
            )));
        }
        let algorithm = Algorithm::from_bytes(to_array::<2>(&bytes[..2]))?;
        let key_id = to_array::<8>(&bytes[2..10]);
        let signature = EdSignature::from_bytes(&to_array::<64>(&bytes[10..]));

        let trusted_comment = lines
            .next()
            .and_then(|l| l.strip_prefix(TRUSTED_PREFIX))
            .filter(|c| !c.trim().is_empty())
            .ok_or(VerifyError::MissingTrustedComment)?
            .to_string();

        let global = lines
            .next()
            .ok_or_else(|| VerifyError::SignatureFormat("missing global signature".into()))?;
        let global = BASE64
            .decode(global.trim())
            .map_err(|e| VerifyError::SignatureFormat(e.to_string()))?;
        if global.len() != 64 {
            return Err(VerifyError::SignatureFormat(format!(
                "expected 64-byte global signature, got {}",
                global.len()
            )));
        }
        let global_signature = EdSignature::from_bytes(&to_array::<64>(&global));

        Ok(Self {
            algorithm,
            key_id,
            signature,
            trusted_comment,
            global_signature,
        })
    }

    /// The trusted comment text, authenticated by [`Self::verify_trusted_comment`].
    pub fn trusted_comment(&self) -> &str {
        &self.trusted_comment
    }

    /// Key id that produced this signature.
    pub fn key_id(&self) -> String {
        key_id_hex(&self.key_id)
    }

    /// Authenticate the trusted comment without the signed file.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::KeyMismatch`] or [`VerifyError::BadTrustedComment`].
    pub fn verify_trusted_comment(&self, pk: &PublicKey) -> Result<(), VerifyError> {
        self.check_key(pk)?;
        let mut message = self.signature.to_bytes().to_vec();
        message.extend_from_slice(self.trusted_comment.as_bytes());
        pk.key
            .verify(&message, &self.global_signature)
            .map_err(|_| VerifyError::BadTrustedComment)
    }

    /// Verify `content` and the trusted comment.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::BadSignature`] if `content` was not signed by
    /// `pk`, or any error of [`Self::verify_trusted_comment`].
    pub fn verify(&self, pk: &PublicKey, content: &[u8]) -> Result<(), VerifyError> {
        self.check_key(pk)?;
        let result = match self.algorithm {
            Algorithm::Plain => pk.key.verify(content, &self.signature),
            Algorithm::Prehashed => {
                let digest = Blake2b512::digest(content);
                pk.key.verify(&digest, &self.signature)
            }
        };
        result.map_err(|_| VerifyError::BadSignature)?;
        self.verify_trusted_comment(pk)
    }

    fn check_key(&self, pk: &PublicKey) -> Result<(), VerifyError> {
        if self.key_id == pk.key_id {
            Ok(())
        } else {
            Err(VerifyError::KeyMismatch {
                public_key: pk.key_id(),
                signature_key: self.key_id(),
            })
        }
    }
}

fn key_id_hex(id: &[u8; 8]) -> String {
    // minisign prints the little-endian id reversed
    id.iter().rev().map(|b| format!("{b:02X}")).collect()
}

/// Copy a slice of known length into an array. Callers check lengths first.
fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}
