//! # csrkit - RSA Key Lifecycle for Certificate Signing Requests
//!
//! csrkit manages the RSA key pair behind a certificate issuance: it reuses
//! the key cached by a previous run, regenerates it when the cache turns out
//! to be unreadable, builds PKCS#10 certificate signing requests with it and
//! imports it into a mandated cryptographic provider when a downstream
//! consumer requires one. It is built entirely with rustcrypto libraries.
//!
//! ## Key Features
//!
//! - **Cached key reuse**: the same key survives renewals through an opaque cache blob
//! - **Self-healing**: corrupted, foreign or undersized cache blobs trigger one regeneration
//! - **Security floor**: keys below 2048 bits are never generated or loaded
//! - **CSR building**: SHA-256 with RSA PKCS#1 v1.5, optional requested extensions
//! - **Provider conversion**: distinct errors tell the caller whether to drop the cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use csrkit::{
//!     csr::params::DistinguishedName,
//!     material::KeyMaterial,
//!     options::KeyOptions,
//! };
//!
//! # fn load_cache() -> Option<Vec<u8>> { None }
//! # fn store_cache(_: &[u8]) {}
//! # fn main() -> Result<(), csrkit::error::CsrKitError> {
//! let options = KeyOptions::builder().min_key_bits(3072).build();
//! let mut material = KeyMaterial::with_cache(options, load_cache());
//!
//! let subject = DistinguishedName::builder()
//!     .common_name("mail.example.com".to_string())
//!     .organization("Example Corp".to_string())
//!     .build();
//!
//! let csr = material.generate_csr(&subject)?;
//! println!("{}", csr.to_pem()?);
//!
//! if let Some(blob) = material.export_cache_blob() {
//!     store_cache(blob);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Converting for a Mandated Provider
//!
//! ```rust,no_run
//! use csrkit::{
//!     material::KeyMaterial,
//!     options::KeyOptions,
//!     provider::{ProviderAdapter, SoftwareProvider},
//! };
//!
//! # fn main() -> Result<(), csrkit::error::CsrKitError> {
//! let mut material = KeyMaterial::new(KeyOptions::default());
//! let provider = SoftwareProvider::default();
//!
//! let converted = provider.convert(material.get_key_handle()?);
//! match converted {
//!     Ok(converted) => println!("key imported into {}", converted.container_name),
//!     Err(e) if e.should_invalidate_cache() => material.invalidate(),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Each failure has its own variant; only unreadable caches are recovered
//! internally:
//!
//! ```rust
//! use csrkit::{error::CsrKitError, material::KeyMaterial, options::KeyOptions};
//!
//! let material = KeyMaterial::new(KeyOptions::default());
//! match material.get_private_key_parameters() {
//!     Err(CsrKitError::NotInitializedError) => println!("provision the key first"),
//!     Err(e) => println!("Other error: {}", e),
//!     Ok(_) => unreachable!(),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`material`]: Provisioning state machine around the cached key
//! - [`codec`]: Cache blob encoding and decoding
//! - [`key`]: The RSA key pair and its parameters
//! - [`csr`]: Certificate signing request building
//! - [`provider`]: Conversion into mandated providers
//! - [`options`]: Key generation settings
//! - [`error`]: Error types

pub mod codec;
pub mod csr;
pub mod error;
pub mod key;
pub mod material;
pub mod options;
pub mod pem_utils;
pub mod provider;
