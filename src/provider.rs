//! Adapting key material to a provider mandated by a downstream consumer.
//!
//! Some consumers of the issued certificate (mail servers in particular) only
//! accept private keys held by one specific cryptographic provider. A
//! [`ProviderAdapter`] imports a copy of the key into such a provider. When the
//! import fails it returns a [`ProviderConversionError`]; it never touches
//! the key cache itself, deciding whether to invalidate is up to the caller.

use std::fmt;

use bon::Builder;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use uuid::Uuid;

use crate::error::{CsrKitError, ProviderConversionError, Result};
use crate::key::{KeyHandle, MAX_KEY_BITS, PrivateKeyParams};

/// Capability of importing a key into a specific provider.
pub trait ProviderAdapter {
    /// Display name of the mandated provider.
    fn provider_name(&self) -> &str;

    /// Whether this adapter is able to convert keys at all.
    fn can_convert(&self) -> bool {
        true
    }

    /// Import a copy of `key` into the provider.
    fn convert(&self, key: &KeyHandle) -> std::result::Result<ProviderKeyHandle, ProviderConversionError>;
}

/// Which key slot of a container the key occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    /// Usable for key exchange and signing (`AT_KEYEXCHANGE`).
    Exchange = 1,
    /// Usable for signing only (`AT_SIGNATURE`).
    Signature = 2,
}

/// Constraints and identity of a mandated provider.
#[derive(Debug, Clone, Builder, PartialEq, Eq)]
pub struct ProviderSpec {
    #[builder(into)]
    pub name: String,
    pub provider_type: u32,
    #[builder(default = KeySpec::Exchange)]
    pub key_spec: KeySpec,
    #[builder(default = true)]
    pub machine_key_store: bool,
    #[builder(default = MAX_KEY_BITS)]
    pub max_key_bits: usize,
    /// Largest public exponent the provider can store, in bits.
    #[builder(default = 32)]
    pub max_public_exponent_bits: usize,
}

impl ProviderSpec {
    /// The legacy RSA SChannel provider required by Exchange.
    pub fn rsa_schannel() -> Self {
        ProviderSpec::builder()
            .name("Microsoft RSA SChannel Cryptographic Provider")
            .provider_type(12)
            .build()
    }
}

/// A key imported into a provider container.
///
/// Holds its own copy of the key parameters; dropping or invalidating the
/// source [`KeyHandle`] does not affect it.
pub struct ProviderKeyHandle {
    pub provider: String,
    pub provider_type: u32,
    pub container_name: String,
    pub key_spec: KeySpec,
    pub machine_key_store: bool,
    key: RsaPrivateKey,
}

impl ProviderKeyHandle {
    pub fn key_size(&self) -> usize {
        self.key.n().bits()
    }

    /// Export the imported key for PFX packaging.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        KeyHandle::from_private_key(self.key.clone())?.to_pkcs8_der()
    }

    pub fn private_key_params(&self) -> Result<PrivateKeyParams> {
        KeyHandle::from_private_key(self.key.clone())?.private_key_params()
    }
}

impl fmt::Debug for ProviderKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderKeyHandle")
            .field("provider", &self.provider)
            .field("container_name", &self.container_name)
            .field("key_spec", &self.key_spec)
            .field("key_size", &self.key_size())
            .finish_non_exhaustive()
    }
}

/// In-process provider that enforces a [`ProviderSpec`] and imports keys
/// into freshly named containers.
#[derive(Debug, Clone)]
pub struct SoftwareProvider {
    spec: ProviderSpec,
}

impl SoftwareProvider {
    pub fn new(spec: ProviderSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    fn import(&self, params: &PrivateKeyParams) -> std::result::Result<RsaPrivateKey, String> {
        let n = BigUint::from_bytes_be(&params.modulus);
        let e = BigUint::from_bytes_be(&params.public_exponent);

        if n.bits() > self.spec.max_key_bits {
            return Err(format!(
                "{}-bit key exceeds the provider maximum of {} bits",
                n.bits(),
                self.spec.max_key_bits
            ));
        }
        if e.bits() > self.spec.max_public_exponent_bits {
            return Err(format!(
                "public exponent does not fit in {} bits",
                self.spec.max_public_exponent_bits
            ));
        }

        let key = RsaPrivateKey::from_components(
            n,
            e,
            BigUint::from_bytes_be(&params.private_exponent),
            vec![
                BigUint::from_bytes_be(&params.prime1),
                BigUint::from_bytes_be(&params.prime2),
            ],
        )
        .map_err(|e| e.to_string())?;
        key.validate().map_err(|e| e.to_string())?;
        Ok(key)
    }
}

impl Default for SoftwareProvider {
    fn default() -> Self {
        Self::new(ProviderSpec::rsa_schannel())
    }
}

impl ProviderAdapter for SoftwareProvider {
    fn provider_name(&self) -> &str {
        &self.spec.name
    }

    fn convert(&self, key: &KeyHandle) -> std::result::Result<ProviderKeyHandle, ProviderConversionError> {
        let container_name = Uuid::new_v4().to_string();

        let converted = key
            .private_key_params()
            .map_err(|e: CsrKitError| e.to_string())
            .and_then(|params| self.import(&params));

        match converted {
            Ok(imported) => {
                tracing::debug!(
                    provider = %self.spec.name,
                    container = %container_name,
                    "imported private key into provider"
                );
                Ok(ProviderKeyHandle {
                    provider: self.spec.name.clone(),
                    provider_type: self.spec.provider_type,
                    container_name,
                    key_spec: self.spec.key_spec,
                    machine_key_store: self.spec.machine_key_store,
                    key: imported,
                })
            }
            Err(message) => {
                tracing::warn!(
                    provider = %self.spec.name,
                    "error converting private key to {}, which means it might not be usable by the consumer",
                    self.spec.name
                );
                tracing::trace!(%message, "provider conversion failure");
                Err(ProviderConversionError::rejected(&self.spec.name, message))
            }
        }
    }
}

/// Stands in for a mandated provider that does not exist on this platform.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    name: String,
}

impl UnavailableProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ProviderAdapter for UnavailableProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn can_convert(&self) -> bool {
        false
    }

    fn convert(&self, _key: &KeyHandle) -> std::result::Result<ProviderKeyHandle, ProviderConversionError> {
        tracing::warn!(provider = %self.name, "mandated provider is not available on this platform");
        Err(ProviderConversionError::unavailable(
            &self.name,
            "provider is not installed on this platform",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schannel_spec_defaults() {
        let spec = ProviderSpec::rsa_schannel();
        assert_eq!(spec.provider_type, 12);
        assert_eq!(spec.key_spec, KeySpec::Exchange);
        assert!(spec.machine_key_store);
        assert_eq!(spec.max_key_bits, 16384);
    }

    #[test]
    fn test_unavailable_provider_cannot_convert() {
        let provider = UnavailableProvider::new("Microsoft RSA SChannel Cryptographic Provider");
        assert!(!provider.can_convert());
        assert!(SoftwareProvider::default().can_convert());
    }
}
