use bon::Builder;
use serde::Deserialize;

use crate::key::MIN_KEY_BITS;

/// Key generation settings for one issuance operation.
///
/// Read by the host from its configuration and handed to
/// [`KeyMaterial`](crate::material::KeyMaterial) at construction.
///
/// # Fields
/// * `min_key_bits` - Requested RSA modulus size (`minKeyBits` in
///   configuration files). Values below 2048 are clamped up.
#[derive(Clone, Debug, Builder, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyOptions {
    #[builder(default = MIN_KEY_BITS)]
    #[serde(default = "default_key_bits")]
    pub min_key_bits: usize,
}

fn default_key_bits() -> usize {
    MIN_KEY_BITS
}

impl Default for KeyOptions {
    fn default() -> Self {
        Self {
            min_key_bits: MIN_KEY_BITS,
        }
    }
}

impl KeyOptions {
    /// Whether the configured size is below the security floor.
    pub fn is_insecure(&self) -> bool {
        self.min_key_bits < MIN_KEY_BITS
    }

    /// The bit length a key will actually be generated with.
    pub fn effective_key_bits(&self) -> usize {
        self.min_key_bits.max(MIN_KEY_BITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_floor() {
        assert_eq!(KeyOptions::default().effective_key_bits(), 2048);
        assert_eq!(KeyOptions::builder().build(), KeyOptions::default());
    }

    #[test]
    fn test_clamps_weak_sizes() {
        let options = KeyOptions::builder().min_key_bits(1024).build();
        assert!(options.is_insecure());
        assert_eq!(options.effective_key_bits(), 2048);

        let options = KeyOptions::builder().min_key_bits(3072).build();
        assert!(!options.is_insecure());
        assert_eq!(options.effective_key_bits(), 3072);
    }

    #[test]
    fn test_deserialize_from_settings() {
        let options: KeyOptions = serde_json::from_str(r#"{ "minKeyBits": 4096 }"#).unwrap();
        assert_eq!(options.effective_key_bits(), 4096);

        let options: KeyOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, KeyOptions::default());
    }
}
