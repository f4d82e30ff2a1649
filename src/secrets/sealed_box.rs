use crate::error::SealError;
use crate::security::SecureString;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crypto_box::aead::OsRng;
use crypto_box::{PublicKey, KEY_SIZE};
use serde::Serialize;
use tracing::debug;

/// Size of a Curve25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = KEY_SIZE;
/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;
/// Bytes a sealed box adds to its plaintext: ephemeral public key plus tag.
pub const SEAL_OVERHEAD: usize = PUBLIC_KEY_SIZE + TAG_SIZE;

/// Plaintext addressed to a recipient public key
#[derive(Debug, Clone)]
pub struct SealRequest {
    recipient_public_key_base64: String,
    plaintext: SecureString,
}

impl SealRequest {
    pub fn new(
        recipient_public_key_base64: impl Into<String>,
        plaintext: impl Into<SecureString>,
    ) -> Self {
        Self {
            recipient_public_key_base64: recipient_public_key_base64.into(),
            plaintext: plaintext.into(),
        }
    }

    pub fn recipient_public_key_base64(&self) -> &str {
        &self.recipient_public_key_base64
    }

    pub fn seal(&self) -> Result<SealedSecret, SealError> {
        seal(&self.recipient_public_key_base64, self.plaintext.as_str())
    }
}

/// Base64 sealed box ready to hand to GitHub's secrets API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SealedSecret {
    ciphertext_base64: String,
}

impl SealedSecret {
    pub fn ciphertext_base64(&self) -> &str {
        &self.ciphertext_base64
    }

    pub fn into_inner(self) -> String {
        self.ciphertext_base64
    }
}

/// Decode a base64 recipient key, which must be exactly 32 bytes.
///
/// Input is strict padded base64; surrounding whitespace is an encoding error.
pub fn decode_public_key(public_key_base64: &str) -> Result<PublicKey, SealError> {
    let bytes = STANDARD.decode(public_key_base64)?;
    let key: [u8; PUBLIC_KEY_SIZE] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SealError::InvalidKeyLength(bytes.len()))?;

    Ok(PublicKey::from(key))
}

/// Seal `plaintext` for the holder of the secret key matching `recipient_public_key_base64`.
///
/// Produces the libsodium `crypto_box_seal` format, base64 encoded. Every call uses a
/// new ephemeral key pair, so sealing the same plaintext twice gives different output.
pub fn seal(recipient_public_key_base64: &str, plaintext: &str) -> Result<SealedSecret, SealError> {
    let recipient = decode_public_key(recipient_public_key_base64)?;
    let sealed = seal_bytes(&recipient, plaintext.as_bytes())?;

    debug!("Sealed secret into {} byte box", sealed.len());

    Ok(SealedSecret {
        ciphertext_base64: STANDARD.encode(sealed),
    })
}

/// Raw sealed box: `ephemeral_pk || tag || ciphertext`
pub fn seal_bytes(recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
    recipient
        .seal(&mut OsRng, plaintext)
        .map_err(|_| SealError::Encryption)
}
