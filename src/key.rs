use std::fmt;

use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer as RsaSigner};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{CsrKitError, Result};

/// Smallest RSA modulus this crate will ever materialize.
pub const MIN_KEY_BITS: usize = 2048;

/// Largest RSA modulus accepted when reading public keys back.
pub const MAX_KEY_BITS: usize = 16384;

/// Key algorithms a cached record can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
}

/// A live RSA key pair.
///
/// A `KeyHandle` below [`MIN_KEY_BITS`] cannot be constructed.
#[derive(Clone)]
pub struct KeyHandle {
    signing: RsaSigningKey<Sha256>,
    public: RsaPublicKey,
}

impl KeyHandle {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        if bits < MIN_KEY_BITS {
            return Err(CsrKitError::InvalidInput(format!(
                "refusing to generate a {bits}-bit RSA key, minimum is {MIN_KEY_BITS}"
            )));
        }
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CsrKitError::KeyGenerationError(e.to_string()))?;
        Self::from_private_key(private)
    }

    /// Wrap an existing private key, enforcing the size floor.
    pub fn from_private_key(private: RsaPrivateKey) -> Result<Self> {
        let bits = private.n().bits();
        if bits < MIN_KEY_BITS {
            return Err(CsrKitError::InvalidInput(format!(
                "{bits}-bit RSA key is below the {MIN_KEY_BITS}-bit minimum"
            )));
        }
        let public = RsaPublicKey::from(&private);
        Ok(Self {
            signing: RsaSigningKey::new(private),
            public,
        })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Rsa
    }

    /// Size of the modulus in bits.
    pub fn key_size(&self) -> usize {
        self.public.n().bits()
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// The public key as a SubjectPublicKeyInfo structure.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        SubjectPublicKeyInfoOwned::from_key(self.public.clone())
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }

    /// SHA-1 over the subject public key bits, hex encoded (RFC 5280 key
    /// identifier, method 1). Safe to log.
    pub fn key_identifier(&self) -> Result<String> {
        let spki = self.as_spki()?;
        let digest = Sha1::digest(spki.subject_public_key.raw_bytes());
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Sign `data` with RSASSA-PKCS1-v1_5 over SHA-256.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .signing
            .try_sign(data)
            .map_err(|e| CsrKitError::RsaError(e.to_string()))?;
        Ok(signature.to_vec())
    }

    /// Export the full set of private parameters.
    pub fn private_key_params(&self) -> Result<PrivateKeyParams> {
        let der = self.private().to_pkcs1_der()?;
        let parsed = rsa::pkcs1::RsaPrivateKey::try_from(der.as_bytes())
            .map_err(|e| CsrKitError::RsaPkcs1Error(e.to_string()))?;
        Ok(PrivateKeyParams {
            modulus: parsed.modulus.as_bytes().to_vec(),
            public_exponent: parsed.public_exponent.as_bytes().to_vec(),
            private_exponent: parsed.private_exponent.as_bytes().to_vec(),
            prime1: parsed.prime1.as_bytes().to_vec(),
            prime2: parsed.prime2.as_bytes().to_vec(),
            exponent1: parsed.exponent1.as_bytes().to_vec(),
            exponent2: parsed.exponent2.as_bytes().to_vec(),
            coefficient: parsed.coefficient.as_bytes().to_vec(),
        })
    }

    fn private(&self) -> &RsaPrivateKey {
        self.signing.as_ref()
    }

    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let doc = self
            .private()
            .to_pkcs8_der()
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = self
            .private()
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))?;
        Ok(pem.as_str().to_owned())
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("algorithm", &self.algorithm())
            .field("key_size", &self.key_size())
            .finish_non_exhaustive()
    }
}

/// Big-endian RSA private key parameters, as laid out in PKCS#1.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKeyParams {
    pub modulus: Vec<u8>,
    pub public_exponent: Vec<u8>,
    pub private_exponent: Vec<u8>,
    pub prime1: Vec<u8>,
    pub prime2: Vec<u8>,
    /// d mod (p - 1)
    pub exponent1: Vec<u8>,
    /// d mod (q - 1)
    pub exponent2: Vec<u8>,
    /// q^-1 mod p
    pub coefficient: Vec<u8>,
}

impl fmt::Debug for PrivateKeyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyParams")
            .field("modulus_len", &self.modulus.len())
            .field("public_exponent", &self.public_exponent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_rejects_weak_key_size() {
        let err = KeyHandle::generate_rsa(1024).unwrap_err();
        assert!(matches!(err, CsrKitError::InvalidInput(_)));
    }

    #[test]
    fn test_from_private_key_rejects_weak_key() {
        let mut rng = rand_core::OsRng;
        let weak = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        assert!(matches!(
            KeyHandle::from_private_key(weak),
            Err(CsrKitError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_generated_key_parameters() {
        let key = KeyHandle::generate_rsa(2048).unwrap();
        assert_eq!(key.key_size(), 2048);
        assert_eq!(key.algorithm(), KeyAlgorithm::Rsa);

        let params = key.private_key_params().unwrap();
        assert_eq!(params.modulus, key.public_key().n().to_bytes_be());
        assert_eq!(params.public_exponent, vec![0x01, 0x00, 0x01]);
        assert!(!params.private_exponent.is_empty());
        assert!(!params.coefficient.is_empty());

        let id = key.key_identifier().unwrap();
        assert_eq!(id.len(), 40);

        let debug = format!("{:?}", params);
        assert!(!debug.contains("private_exponent"));
    }

    #[test]
    fn test_signatures_are_deterministic() {
        use rsa::signature::Verifier;

        let key = KeyHandle::generate_rsa(2048).unwrap();
        let first = key.sign_data(b"certification request info").unwrap();
        let second = key.clone().sign_data(b"certification request info").unwrap();
        assert_eq!(first.len(), 256);
        assert_eq!(first, second);

        let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.public_key().clone());
        let signature = rsa::pkcs1v15::Signature::try_from(first.as_slice()).unwrap();
        verifying_key
            .verify(b"certification request info", &signature)
            .unwrap();
    }
}
