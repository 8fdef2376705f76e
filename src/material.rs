//! Lazy, self-healing provisioning of the key pair used for one issuance.
//!
//! A [`KeyMaterial`] starts either `Empty` (no cache) or `Cached` (a blob from
//! the persistence layer) and ends `Live` after the first successful call to
//! [`KeyMaterial::get_key_handle`]:
//!
//! ```text
//! Empty  ──generate──────────────────────────▶ Live
//! Cached ──decode ok─────────────────────────▶ Live
//! Cached ──decode failed──▶ Regenerating ──▶ Live
//! ```
//!
//! Two consecutive failures (decode or generation) end provisioning with
//! [`CsrKitError::FatalProvisioningError`].

use crate::codec::KeyCodec;
use crate::csr::params::DistinguishedName;
use crate::csr::{Csr, CsrBuilder};
use crate::error::{CsrKitError, Result};
use crate::key::{KeyAlgorithm, KeyHandle, PrivateKeyParams};
use crate::options::KeyOptions;

/// Failures tolerated in a row before provisioning gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 2;

/// Source of fresh key pairs.
pub trait KeyGenerator {
    fn generate(&self, bits: usize) -> Result<KeyHandle>;
}

impl<G: KeyGenerator + ?Sized> KeyGenerator for &G {
    fn generate(&self, bits: usize) -> Result<KeyHandle> {
        (**self).generate(bits)
    }
}

/// Generates keys with the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaKeyGenerator;

impl KeyGenerator for RsaKeyGenerator {
    fn generate(&self, bits: usize) -> Result<KeyHandle> {
        KeyHandle::generate_rsa(bits)
    }
}

/// The persisted form of the live key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPairRecord {
    pub blob: Vec<u8>,
    pub key_bits: usize,
    pub algorithm: KeyAlgorithm,
}

/// Something worth telling the operator that did not stop provisioning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisioningWarning {
    /// The configured key size was below the floor and was raised.
    InsecureKeyBits { configured: usize, effective: usize },
    /// The cache blob could not be decoded and was discarded.
    UnreadableCache { reason: String },
}

/// Observable provisioning state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisioningState {
    Empty,
    Cached,
    Regenerating,
    Live,
}

enum State {
    Empty,
    Cached(Vec<u8>),
    Regenerating,
    Live {
        handle: KeyHandle,
        record: KeyPairRecord,
    },
}

/// Owns the key pair of a single issuance operation.
pub struct KeyMaterial<G = RsaKeyGenerator> {
    options: KeyOptions,
    generator: G,
    state: State,
    generations: u32,
    warnings: Vec<ProvisioningWarning>,
}

impl KeyMaterial<RsaKeyGenerator> {
    /// Start without a cached key.
    pub fn new(options: KeyOptions) -> Self {
        Self::with_generator(options, None, RsaKeyGenerator)
    }

    /// Start from the blob the persistence layer handed back, if any.
    pub fn with_cache(options: KeyOptions, cache: Option<Vec<u8>>) -> Self {
        Self::with_generator(options, cache, RsaKeyGenerator)
    }
}

impl<G: KeyGenerator> KeyMaterial<G> {
    pub fn with_generator(options: KeyOptions, cache: Option<Vec<u8>>, generator: G) -> Self {
        let state = match cache {
            Some(blob) => State::Cached(blob),
            None => State::Empty,
        };
        Self {
            options,
            generator,
            state,
            generations: 0,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> ProvisioningState {
        match self.state {
            State::Empty => ProvisioningState::Empty,
            State::Cached(_) => ProvisioningState::Cached,
            State::Regenerating => ProvisioningState::Regenerating,
            State::Live { .. } => ProvisioningState::Live,
        }
    }

    pub fn warnings(&self) -> &[ProvisioningWarning] {
        &self.warnings
    }

    /// Number of key generation attempts made by this instance.
    pub fn generations(&self) -> u32 {
        self.generations
    }

    /// Return the key pair, provisioning it on first use.
    ///
    /// Every later call returns the same key without touching the cache or
    /// the generator.
    pub fn get_key_handle(&mut self) -> Result<&KeyHandle> {
        if !matches!(self.state, State::Live { .. }) {
            self.provision()?;
        }
        match &self.state {
            State::Live { handle, .. } => Ok(handle),
            _ => Err(CsrKitError::NotInitializedError),
        }
    }

    /// Export the private parameters of the provisioned key.
    ///
    /// # Errors
    /// `NotInitializedError` until [`get_key_handle`](Self::get_key_handle)
    /// has succeeded.
    pub fn get_private_key_parameters(&self) -> Result<PrivateKeyParams> {
        match &self.state {
            State::Live { handle, .. } => handle.private_key_params(),
            _ => Err(CsrKitError::NotInitializedError),
        }
    }

    /// The cache blob of the live key, for the persistence layer to store.
    pub fn export_cache_blob(&self) -> Option<&[u8]> {
        self.record().map(|record| record.blob.as_slice())
    }

    pub fn record(&self) -> Option<&KeyPairRecord> {
        match &self.state {
            State::Live { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Drop the current key and any cached blob; the next access generates a
    /// new key.
    pub fn invalidate(&mut self) {
        if !matches!(self.state, State::Empty) {
            tracing::info!("discarding key material, a new key will be generated");
        }
        self.state = State::Empty;
    }

    /// Provision the key and build a CSR for `subject`.
    pub fn generate_csr(&mut self, subject: &DistinguishedName) -> Result<Csr> {
        let key = self.get_key_handle()?;
        CsrBuilder::new().build(subject, key)
    }

    fn provision(&mut self) -> Result<()> {
        let mut failures = 0;
        let mut last_error = None;

        loop {
            let attempt = match std::mem::replace(&mut self.state, State::Regenerating) {
                State::Cached(blob) => KeyCodec::decode(&blob)
                    .map(|handle| (handle, blob))
                    .map_err(|e| {
                        tracing::warn!(reason = %e.reason, "unable to read cached key, creating a new one");
                        self.warnings.push(ProvisioningWarning::UnreadableCache {
                            reason: e.reason.clone(),
                        });
                        CsrKitError::from(e)
                    }),
                State::Empty | State::Regenerating => self.generate(),
                State::Live { handle, record } => {
                    self.state = State::Live { handle, record };
                    return Ok(());
                }
            };

            match attempt {
                Ok((handle, blob)) => {
                    let record = KeyPairRecord {
                        blob,
                        key_bits: handle.key_size(),
                        algorithm: handle.algorithm(),
                    };
                    tracing::debug!(
                        key_bits = record.key_bits,
                        key_id = %handle.key_identifier().unwrap_or_default(),
                        generations = self.generations,
                        "key material ready"
                    );
                    self.state = State::Live { handle, record };
                    return Ok(());
                }
                Err(e) => {
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        self.state = State::Empty;
                        tracing::error!(error = %e, "giving up on key provisioning");
                        let cause = last_error
                            .map(|prev: CsrKitError| format!("{prev}; then {e}"))
                            .unwrap_or_else(|| e.to_string());
                        return Err(CsrKitError::FatalProvisioningError(cause));
                    }
                    last_error = Some(e);
                    self.state = State::Regenerating;
                }
            }
        }
    }

    /// Generate, encode and read back a fresh key.
    fn generate(&mut self) -> Result<(KeyHandle, Vec<u8>)> {
        let bits = self.effective_key_bits();
        self.generations += 1;
        let generated = self.generator.generate(bits)?;
        let blob = KeyCodec::encode(&generated)?;
        let handle = KeyCodec::decode(&blob)?;
        Ok((handle, blob))
    }

    fn effective_key_bits(&mut self) -> usize {
        let effective = self.options.effective_key_bits();
        if self.options.is_insecure() {
            let configured = self.options.min_key_bits;
            tracing::warn!(
                configured,
                effective,
                "RSA key bits less than {effective} is not secure, using {effective}"
            );
            let warning = ProvisioningWarning::InsecureKeyBits {
                configured,
                effective,
            };
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        } else {
            tracing::debug!(key_bits = effective, "RSA key bits");
        }
        effective
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoEntropy;

    impl KeyGenerator for NoEntropy {
        fn generate(&self, _bits: usize) -> Result<KeyHandle> {
            Err(CsrKitError::KeyGenerationError("no entropy".to_string()))
        }
    }

    #[test]
    fn test_private_parameters_require_provisioning() {
        let material = KeyMaterial::new(KeyOptions::default());
        assert_eq!(material.state(), ProvisioningState::Empty);
        assert_eq!(
            material.get_private_key_parameters(),
            Err(CsrKitError::NotInitializedError)
        );
        assert!(material.export_cache_blob().is_none());
    }

    #[test]
    fn test_cached_state_before_first_access() {
        let material = KeyMaterial::with_cache(KeyOptions::default(), Some(b"junk".to_vec()));
        assert_eq!(material.state(), ProvisioningState::Cached);
        assert!(material.record().is_none());
    }

    #[test]
    fn test_generation_failure_is_fatal_after_one_retry() {
        let mut material = KeyMaterial::with_generator(KeyOptions::default(), None, NoEntropy);
        let err = material.get_key_handle().unwrap_err();
        assert!(matches!(err, CsrKitError::FatalProvisioningError(_)));
        assert_eq!(material.generations(), 2);
        assert_eq!(material.state(), ProvisioningState::Empty);
    }

    #[test]
    fn test_unreadable_cache_then_generation_failure_is_fatal() {
        let mut material =
            KeyMaterial::with_generator(KeyOptions::default(), Some(b"junk".to_vec()), NoEntropy);
        let err = material.get_key_handle().unwrap_err();
        assert!(matches!(err, CsrKitError::FatalProvisioningError(_)));
        assert_eq!(material.generations(), 1);
        assert!(matches!(
            material.warnings(),
            [ProvisioningWarning::UnreadableCache { .. }]
        ));
    }
}
