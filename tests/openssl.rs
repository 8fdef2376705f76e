mod util;

use csrkit::csr::CsrBuilder;
use csrkit::csr::extensions::ExtendedKeyUsageOption;
use csrkit::csr::params::DistinguishedName;
use openssl::nid::Nid;
use openssl::x509::X509Req;
use regex::Regex;
use rsa::traits::PublicKeyParts;
use std::fs;
use std::process::Command;

fn server_subject() -> DistinguishedName {
    DistinguishedName::builder()
        .common_name("mail.example.com".to_string())
        .organization("Example Corp".to_string())
        .country("NL".to_string())
        .build()
}

#[test]
fn test_openssl_validate_csr() {
    let key = &util::fixture_keys()[0];
    let csr = CsrBuilder::new()
        .build(&server_subject(), key)
        .unwrap();

    // Save the request to a temporary file
    let csr_path = std::env::temp_dir().join(format!("csrkit_{}.csr", std::process::id()));
    fs::write(&csr_path, csr.to_pem().unwrap()).expect("Failed to write CSR");

    // Use OpenSSL CLI to decode and verify the generated request
    let output = Command::new("openssl")
        .arg("req")
        .arg("-in")
        .arg(&csr_path)
        .arg("-noout")
        .arg("-text")
        .arg("-verify")
        .output()
        .expect("Failed to execute OpenSSL command");

    fs::remove_file(&csr_path).expect("Failed to remove test CSR");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output_text = String::from_utf8_lossy(&output.stdout);
    let diagnostics = String::from_utf8_lossy(&output.stderr);

    assert!(
        Regex::new(r"Subject:.*CN\s*=\s*mail\.example\.com")
            .unwrap()
            .is_match(&output_text),
        "Subject field is incorrect"
    );
    assert!(
        Regex::new(r"Public-Key: \(2048 bit\)")
            .unwrap()
            .is_match(&output_text),
        "Public key size is incorrect"
    );
    assert!(
        output_text.contains("Signature Algorithm: sha256WithRSAEncryption"),
        "Signature Algorithm field is incorrect"
    );
    assert!(
        output_text.contains("verify OK") || diagnostics.contains("verify OK"),
        "Self-signature did not verify"
    );
}

#[test]
fn test_openssl_crate_validate_csr() {
    let key = &util::fixture_keys()[0];
    let csr = CsrBuilder::new()
        .with_alternative_names(["mail.example.com", "autodiscover.example.com"])
        .unwrap()
        .with_extended_key_usage(vec![ExtendedKeyUsageOption::ServerAuth])
        .unwrap()
        .build(&server_subject(), key)
        .unwrap();

    let req = X509Req::from_der(&csr.to_der().unwrap()).expect("Failed to parse DER");

    // Check the embedded key and self-signature
    let public_key = req.public_key().unwrap();
    assert!(req.verify(&public_key).unwrap(), "Signature does not verify");
    assert_eq!(
        public_key.rsa().unwrap().n().to_vec(),
        key.public_key().n().to_bytes_be()
    );

    // Check subject
    let subject = req
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(subject.to_string(), "mail.example.com", "Subject CN mismatch");

    // Check version (0-based)
    assert_eq!(req.version(), 0, "PKCS#10 version should be 1");

    // Check requested extensions
    let extensions = req.extensions().unwrap();
    assert_eq!(extensions.len(), 2);
}
