//! use csrkit::error::CsrKitError;

use thiserror::Error;

/// Represents errors that can occur in the csrkit library.
///
/// Every failure kind is distinct so callers can decide how to react:
/// only [`CsrKitError::DecodingError`] is recovered internally (by regenerating
/// the key), everything else is surfaced unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsrKitError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// The cache blob could not be turned back into a usable key.
    #[error(transparent)]
    DecodingError(#[from] DecodeError),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Key provisioning failed twice in a row; the issuance must abort.
    #[error("Unable to provision key material: {0}")]
    FatalProvisioningError(String),

    /// Private key parameters were requested before the key was provisioned.
    #[error("No key has been provisioned yet")]
    NotInitializedError,

    /// The subject name is empty or cannot be encoded as a distinguished name.
    #[error("Invalid subject name: {0}")]
    InvalidSubjectError(String),

    /// The mandated provider could not take the key.
    #[error(transparent)]
    ProviderConversionError(#[from] ProviderConversionError),

    /// Error from ASN.1 DER encoding or decoding.
    #[error("ASN.1 error: {0}")]
    Asn1Error(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),

    /// Error from RSA PKCS1 operations.
    #[error("RSA PKCS1 error: {0}")]
    RsaPkcs1Error(String),
}

/// A cache blob that does not decode to a usable RSA key pair.
///
/// Truncated, malformed, foreign-algorithm and undersized keys all map to
/// this single kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unreadable key cache: {reason}")]
pub struct DecodeError {
    pub reason: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Why a provider conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderConversionKind {
    /// The mandated provider does not exist on this platform.
    ProviderUnavailable,
    /// The provider exists but refused the key parameters.
    KeyRejected,
}

/// Raised when a key cannot be imported into a mandated provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unable to convert key for provider '{provider}' ({kind:?}): {message}")]
pub struct ProviderConversionError {
    pub kind: ProviderConversionKind,
    pub provider: String,
    pub message: String,
}

impl ProviderConversionError {
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderConversionKind::ProviderUnavailable,
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn rejected(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderConversionKind::KeyRejected,
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether dropping the cached key gives the next issuance a chance to
    /// produce a key this provider accepts.
    ///
    /// A missing provider will still be missing after regeneration.
    pub fn should_invalidate_cache(&self) -> bool {
        self.kind == ProviderConversionKind::KeyRejected
    }
}

impl From<der::Error> for CsrKitError {
    /// Converts a `der::Error` into a `CsrKitError`.
    fn from(err: der::Error) -> Self {
        CsrKitError::Asn1Error(err.to_string())
    }
}

impl From<rsa::Error> for CsrKitError {
    fn from(err: rsa::Error) -> Self {
        CsrKitError::RsaError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CsrKitError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CsrKitError::RsaPkcs1Error(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CsrKitError>;
