mod util;

use csrkit::error::{CsrKitError, ProviderConversionKind};
use csrkit::material::{KeyMaterial, ProvisioningState};
use csrkit::options::KeyOptions;
use csrkit::provider::{
    KeySpec, ProviderAdapter, ProviderSpec, SoftwareProvider, UnavailableProvider,
};
use util::{RecordingGenerator, fixture_keys};

#[test]
fn conversion_copies_key_into_fresh_container() {
    let key = &fixture_keys()[0];
    let provider = SoftwareProvider::default();

    let first = provider.convert(key).unwrap();
    let second = provider.convert(key).unwrap();

    assert_ne!(first.container_name, second.container_name);
    assert_eq!(first.provider, "Microsoft RSA SChannel Cryptographic Provider");
    assert_eq!(first.provider_type, 12);
    assert_eq!(first.key_spec, KeySpec::Exchange);
    assert!(first.machine_key_store);
    assert_eq!(first.key_size(), 2048);
    assert_eq!(
        first.private_key_params().unwrap(),
        key.private_key_params().unwrap()
    );
}

#[test]
fn converted_key_exports_for_pfx_packaging() {
    let key = &fixture_keys()[0];
    let converted = SoftwareProvider::default().convert(key).unwrap();

    let der = converted.to_pkcs8_der().unwrap();
    let pkey = openssl::pkey::PKey::private_key_from_der(&der).unwrap();
    assert_eq!(pkey.bits(), 2048);
    assert_eq!(der, key.to_pkcs8_der().unwrap());
}

#[test]
fn missing_provider_is_reported_distinctly() {
    let key = &fixture_keys()[0];
    let before = key.private_key_params().unwrap();

    let provider = UnavailableProvider::new("Microsoft RSA SChannel Cryptographic Provider");
    let err = provider.convert(key).unwrap_err();

    assert_eq!(err.kind, ProviderConversionKind::ProviderUnavailable);
    assert!(!err.should_invalidate_cache());
    assert_eq!(key.private_key_params().unwrap(), before);
}

#[test]
fn rejected_key_is_reported_distinctly() {
    let key = &fixture_keys()[0];
    let before = key.private_key_params().unwrap();

    let provider = SoftwareProvider::new(
        ProviderSpec::builder()
            .name("Legacy Base Provider")
            .provider_type(1)
            .max_key_bits(1024)
            .build(),
    );
    let err = provider.convert(key).unwrap_err();

    assert_eq!(err.kind, ProviderConversionKind::KeyRejected);
    assert_eq!(err.provider, "Legacy Base Provider");
    assert!(err.should_invalidate_cache());
    assert_eq!(key.private_key_params().unwrap(), before);

    let wrapped: CsrKitError = err.into();
    assert!(matches!(wrapped, CsrKitError::ProviderConversionError(_)));
}

/// The caller reacts to a rejected conversion by dropping the cached key so
/// the next issuance starts over.
#[test]
fn rejected_conversion_lets_caller_invalidate_cache() {
    let generator = RecordingGenerator::default();
    let blob = csrkit::codec::KeyCodec::encode(&fixture_keys()[1]).unwrap();
    let mut material = KeyMaterial::with_generator(KeyOptions::default(), Some(blob), &generator);

    let provider = SoftwareProvider::new(
        ProviderSpec::builder()
            .name("Legacy Base Provider")
            .provider_type(1)
            .max_key_bits(1024)
            .build(),
    );

    let result = provider.convert(material.get_key_handle().unwrap());
    match result {
        Err(e) if e.should_invalidate_cache() => material.invalidate(),
        other => panic!("unexpected conversion result: {other:?}"),
    }

    assert_eq!(material.state(), ProvisioningState::Empty);
    assert!(material.export_cache_blob().is_none());
    assert_eq!(generator.calls(), 0);
}
