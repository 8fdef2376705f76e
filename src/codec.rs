//! Conversion between a [`KeyHandle`] and the opaque cache blob handed to the
//! persistence layer.
//!
//! The blob is the PKCS#8 PEM encoding of the private key. Decoding accepts
//! legacy PKCS#1 `RSA PRIVATE KEY` blocks as well.

use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;

use crate::error::{DecodeError, Result};
use crate::key::KeyHandle;
use crate::pem_utils::{self, PRIVATE_KEY_LABEL, RSA_PRIVATE_KEY_LABEL};

/// Stateless encoder/decoder for cached key material.
pub struct KeyCodec;

impl KeyCodec {
    /// Encode a key as a cache blob.
    pub fn encode(key: &KeyHandle) -> Result<Vec<u8>> {
        let der = key.to_pkcs8_der()?;
        Ok(pem_utils::der_to_pem(&der, PRIVATE_KEY_LABEL).into_bytes())
    }

    /// Decode a cache blob back into a key.
    ///
    /// Any blob that does not yield a complete, consistent RSA key of at
    /// least the minimum size is rejected.
    pub fn decode(blob: &[u8]) -> std::result::Result<KeyHandle, DecodeError> {
        if blob.is_empty() {
            return Err(DecodeError::new("cache blob is empty"));
        }
        let text = std::str::from_utf8(blob)
            .map_err(|e| DecodeError::new(format!("cache blob is not text: {e}")))?;
        let (label, der) = pem_utils::pem_to_der(text)
            .map_err(|e| DecodeError::new(format!("cache blob is not PEM: {e}")))?;

        let private = match label.as_str() {
            PRIVATE_KEY_LABEL => decode_pkcs8(&der)?,
            RSA_PRIVATE_KEY_LABEL => RsaPrivateKey::from_pkcs1_der(&der)
                .map_err(|e| DecodeError::new(format!("malformed PKCS#1 key: {e}")))?,
            other => {
                return Err(DecodeError::new(format!(
                    "unexpected PEM label '{other}'"
                )));
            }
        };

        private
            .validate()
            .map_err(|e| DecodeError::new(format!("inconsistent RSA key: {e}")))?;
        KeyHandle::from_private_key(private).map_err(|e| DecodeError::new(e.to_string()))
    }
}

fn decode_pkcs8(der: &[u8]) -> std::result::Result<RsaPrivateKey, DecodeError> {
    let info = pkcs8::PrivateKeyInfo::try_from(der)
        .map_err(|e| DecodeError::new(format!("malformed PKCS#8 structure: {e}")))?;
    if info.algorithm.oid != const_oid::db::rfc5912::RSA_ENCRYPTION {
        return Err(DecodeError::new(format!(
            "algorithm mismatch: expected RSA, found {}",
            info.algorithm.oid
        )));
    }
    RsaPrivateKey::from_pkcs8_der(der)
        .map_err(|e| DecodeError::new(format!("malformed RSA key: {e}")))
}
