//! Reversible encoding of provider credentials for storage.
//!
//! Tokens are stored as opaque encoded blobs, never as the provider-returned
//! cleartext. [`SecretToken`] wraps the *encoded* representation; the only
//! way in is [`SecretToken::encode`] and the only way out is
//! [`SecretToken::decode`], and the type redacts itself in `Debug`/`Display`
//! so a token can never end up in a log line by accident.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Error, Result};

/// Prefix used by legacy rows where the token was persisted as a
/// hex-rendered byte string (`\x68656c6c6f`).
const HEX_PREFIX: &str = "\\x";

/// An encoded credential as persisted in the connection row.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretToken(String);

impl SecretToken {
    /// Encode a cleartext token for storage.
    pub fn encode(plain: &str) -> Self {
        SecretToken(BASE64.encode(plain.as_bytes()))
    }

    /// Wrap an already-encoded value loaded from storage.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        SecretToken(encoded.into())
    }

    /// The stored (encoded) representation.
    pub fn encoded(&self) -> &str {
        &self.0
    }

    /// Recover the cleartext token.
    ///
    /// Handles three storage generations:
    /// - `\x`-prefixed hex byte strings (legacy rows); a malformed payload
    ///   (odd length, non-hex digit, non-UTF-8 bytes) is a hard
    ///   [`Error::Decode`] because the row is corrupted.
    /// - base64 (current encoding).
    /// - anything else is assumed to be a token that was never encoded and
    ///   is returned unchanged.
    pub fn decode(&self) -> Result<String> {
        if let Some(hex) = self.0.strip_prefix(HEX_PREFIX) {
            let bytes = decode_hex(hex)?;
            return String::from_utf8(bytes)
                .map_err(|_| Error::Decode("hex payload is not valid UTF-8".into()));
        }

        if let Ok(bytes) = BASE64.decode(self.0.as_bytes()) {
            if let Ok(text) = String::from_utf8(bytes) {
                return Ok(text);
            }
        }

        // Not an encoding we recognize; tolerate tokens stored in cleartext.
        Ok(self.0.clone())
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken(***)")
    }
}

impl fmt::Display for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(Error::Decode("hex payload has odd length".into()));
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| Error::Decode(format!("invalid hex digits at offset {}", i)))
        })
        .collect()
}
