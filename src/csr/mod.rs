pub mod extensions;
pub mod params;

use const_oid::ObjectIdentifier;
use der::asn1::{AnyRef, BitString, SetOfVec};
use der::{Any, Decode, Encode};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::{BigUint, RsaPublicKey};
use rsa::signature::Verifier;
use sha2::Sha256;
use x509_cert::attr::Attribute;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::AlgorithmIdentifierOwned;

use extensions::{ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage, SubjectAltName};
use params::{DistinguishedName, ExtensionParam};

use crate::error::{CsrKitError, Result};
use crate::key::{KeyHandle, MAX_KEY_BITS};
use crate::pem_utils::{self, CERTIFICATE_REQUEST_LABEL};

/// PKCS#9 `extensionRequest` attribute.
const EXTENSION_REQUEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// The signature algorithm every CSR is signed with.
///
/// Only RSASSA-PKCS1-v1_5 over SHA-256 is produced; PSS and other hashes are
/// not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => {
                const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION
            }
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// RFC 4055 requires explicit NULL parameters for PKCS#1 v1.5 signatures.
    fn from(value: SignatureAlgorithm) -> Self {
        AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters: Some(Any::from(AnyRef::NULL)),
        }
    }
}

/// A signed PKCS#10 certificate signing request.
#[derive(Debug, Clone)]
pub struct Csr {
    /// The inner representation of the request.
    pub inner: CertReq,
}

impl Csr {
    /// Encodes the request into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }

    /// Encodes the request into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_utils::der_to_pem(
            &self.to_der()?,
            CERTIFICATE_REQUEST_LABEL,
        ))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_der(der)?,
        })
    }

    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let (label, der) = pem_utils::pem_to_der(pem_str)
            .map_err(|e| CsrKitError::InvalidInput(e.to_string()))?;
        if label != CERTIFICATE_REQUEST_LABEL {
            return Err(CsrKitError::InvalidInput(format!(
                "expected a {CERTIFICATE_REQUEST_LABEL} block, found {label}"
            )));
        }
        Self::from_der(&der)
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.info.subject)
    }

    /// The RSA public key embedded in the request.
    ///
    /// Moduli up to [`MAX_KEY_BITS`] are accepted.
    pub fn public_key(&self) -> Result<RsaPublicKey> {
        let spki = &self.inner.info.public_key;
        if spki.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
            return Err(CsrKitError::InvalidInput(format!(
                "not an RSA public key: algorithm {}",
                spki.algorithm.oid
            )));
        }
        let key = rsa::pkcs1::RsaPublicKey::from_der(spki.subject_public_key.raw_bytes())
            .map_err(|e| CsrKitError::InvalidInput(format!("not an RSA public key: {e}")))?;
        RsaPublicKey::new_with_max_size(
            BigUint::from_bytes_be(key.modulus.as_bytes()),
            BigUint::from_bytes_be(key.public_exponent.as_bytes()),
            MAX_KEY_BITS,
        )
        .map_err(|e| CsrKitError::InvalidInput(format!("not an RSA public key: {e}")))
    }

    /// Extensions carried in the `extensionRequest` attribute.
    pub fn requested_extensions(&self) -> Result<Vec<ExtensionParam>> {
        let mut requested = Vec::new();
        for attr in self.inner.info.attributes.iter() {
            if attr.oid != EXTENSION_REQUEST {
                continue;
            }
            for value in attr.values.iter() {
                let extensions: Vec<x509_cert::ext::Extension> = value.decode_as()?;
                requested.extend(extensions.iter().map(ExtensionParam::from_x509_extension));
            }
        }
        Ok(requested)
    }

    /// Check the self-signature against the embedded public key.
    pub fn verify_signature(&self) -> Result<()> {
        if self.inner.algorithm.oid != SignatureAlgorithm::Sha256WithRSA.oid() {
            return Err(CsrKitError::InvalidInput(format!(
                "unsupported signature algorithm {}",
                self.inner.algorithm.oid
            )));
        }
        let verifying_key = VerifyingKey::<Sha256>::new(self.public_key()?);
        let signature = Signature::try_from(self.inner.signature.raw_bytes())
            .map_err(|e| CsrKitError::RsaError(e.to_string()))?;
        let info = self.inner.info.to_der()?;
        verifying_key
            .verify(&info, &signature)
            .map_err(|e| CsrKitError::RsaError(e.to_string()))
    }
}

/// Builds signed CSRs for a subject and key.
///
/// Without requested extensions the builder emits a bare request carrying
/// only subject and public key.
#[derive(Debug, Clone, Default)]
pub struct CsrBuilder {
    extensions: Vec<ExtensionParam>,
}

impl CsrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an arbitrary extension.
    pub fn with_extension(mut self, extension: ExtensionParam) -> Self {
        self.extensions.retain(|ext| ext.oid != extension.oid);
        self.extensions.push(extension);
        self
    }

    /// Request DNS subject alternative names.
    pub fn with_alternative_names<I, S>(self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let san = SubjectAltName {
            names: names.into_iter().map(Into::into).collect(),
        };
        if san.names.is_empty() {
            return Ok(self);
        }
        Ok(self.with_extension(ExtensionParam::from_extension(san, false)?))
    }

    pub fn with_key_usage(self, usage: KeyUsage) -> Result<Self> {
        Ok(self.with_extension(ExtensionParam::from_extension(usage, true)?))
    }

    pub fn with_extended_key_usage(self, usage: Vec<ExtendedKeyUsageOption>) -> Result<Self> {
        let eku = ExtendedKeyUsage { usage };
        Ok(self.with_extension(ExtensionParam::from_extension(eku, false)?))
    }

    /// Build a CSR binding `subject` to the public half of `key`, signed
    /// with the private half.
    ///
    /// # Errors
    /// `InvalidSubjectError` when the subject is empty or cannot be encoded.
    pub fn build(&self, subject: &DistinguishedName, key: &KeyHandle) -> Result<Csr> {
        let info = CertReqInfo {
            version: Version::V1,
            subject: subject.as_x509_name()?,
            public_key: key.as_spki()?,
            attributes: self.attributes()?,
        };

        let signature = key.sign_data(&info.to_der()?)?;

        let inner = CertReq {
            info,
            algorithm: SignatureAlgorithm::Sha256WithRSA.into(),
            signature: BitString::from_bytes(&signature)?,
        };

        tracing::debug!(
            subject = %inner.info.subject,
            key_bits = key.key_size(),
            extensions = self.extensions.len(),
            "built certificate signing request"
        );

        Ok(Csr { inner })
    }

    fn attributes(&self) -> Result<SetOfVec<Attribute>> {
        if self.extensions.is_empty() {
            return Ok(SetOfVec::new());
        }
        let extensions = self
            .extensions
            .iter()
            .map(ExtensionParam::to_x509_extension)
            .collect::<Result<Vec<_>>>()?;
        let request = Attribute {
            oid: EXTENSION_REQUEST,
            values: SetOfVec::try_from(vec![Any::encode_from(&extensions)?])?,
        };
        Ok(SetOfVec::try_from(vec![request])?)
    }
}
