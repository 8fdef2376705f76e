use core::str::FromStr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use x509_cert::name::{Name, RdnSequence};

use super::extensions::ToAndFromX509Extension;
use crate::error::{CsrKitError, Result};

const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const STATE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ORGANIZATION_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

/// Distinguished name of the CSR subject.
///
/// # Fields
/// * `common_name` - The common name (CN). Required.
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Shorthand for a name carrying only a common name.
    pub fn from_common_name(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Default::default()
        }
    }

    /// Parse an RFC 4514 string such as `CN=example.com,O=Example`.
    pub fn from_rfc4514(s: &str) -> Result<Self> {
        let rdns = RdnSequence::from_str(s)
            .map_err(|e| CsrKitError::InvalidSubjectError(format!("'{s}': {e}")))?;
        let name = Self::from_x509_name(&rdns);
        if name.common_name.trim().is_empty() {
            return Err(CsrKitError::InvalidSubjectError(format!(
                "'{s}' has no common name"
            )));
        }
        Ok(name)
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Unset and empty components are left out. Values are escaped, so
    /// commas and the like survive intact.
    pub fn as_x509_name(&self) -> Result<Name> {
        if self.common_name.trim().is_empty() {
            return Err(CsrKitError::InvalidSubjectError(
                "common name is empty".to_string(),
            ));
        }

        // RFC 4514 lists the most specific component first.
        let components = [
            ("CN", Some(&self.common_name)),
            ("OU", self.organization_unit.as_ref()),
            ("O", self.organization.as_ref()),
            ("L", self.locality.as_ref()),
            ("ST", self.state.as_ref()),
            ("C", self.country.as_ref()),
        ];

        let mut rfc4514_name = String::new();
        for (key, value) in components {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            if value.chars().any(char::is_control) {
                return Err(CsrKitError::InvalidSubjectError(format!(
                    "{key} contains control characters"
                )));
            }
            if !rfc4514_name.is_empty() {
                rfc4514_name.push(',');
            }
            rfc4514_name.push_str(key);
            rfc4514_name.push('=');
            rfc4514_name.push_str(&escape_value(value));
        }

        RdnSequence::from_str(&rfc4514_name)
            .map_err(|e| CsrKitError::InvalidSubjectError(format!("'{rfc4514_name}': {e}")))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Attributes other than the six known ones are ignored.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut name = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = attribute_string(&attr.value) else {
                    continue;
                };
                match attr.oid {
                    COMMON_NAME => name.common_name = value,
                    COUNTRY => name.country = Some(value),
                    LOCALITY => name.locality = Some(value),
                    STATE => name.state = Some(value),
                    ORGANIZATION => name.organization = Some(value),
                    ORGANIZATION_UNIT => name.organization_unit = Some(value),
                    _ => {}
                }
            }
        }

        name
    }
}

/// Represents an X.509 extension requested in a CSR.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        if self.oid != E::OID {
            return Err(CsrKitError::InvalidInput(format!(
                "extension {} is not {}",
                self.oid,
                E::OID
            )));
        }
        E::from_x509_extension_value(&self.value)
    }

    pub(crate) fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: der::asn1::OctetString::new(self.value.clone())?,
        })
    }

    pub(crate) fn from_x509_extension(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }
}

fn attribute_string(value: &der::Any) -> Option<String> {
    value
        .decode_as::<String>()
        .ok()
        .or_else(|| {
            value
                .decode_as::<der::asn1::PrintableStringRef<'_>>()
                .ok()
                .map(|s| s.to_string())
        })
        .or_else(|| {
            value
                .decode_as::<der::asn1::Ia5StringRef<'_>>()
                .ok()
                .map(|s| s.to_string())
        })
}

fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if special {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
