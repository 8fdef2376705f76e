use std::path::PathBuf;

use csrkit::csr::params::DistinguishedName;
use csrkit::material::KeyMaterial;
use csrkit::options::KeyOptions;
use csrkit::provider::{ProviderAdapter, SoftwareProvider};
use tracing_subscriber::EnvFilter;

/// Issue a CSR for the common name given on the command line, reusing the key
/// cached in the system temp directory from a previous run.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let common_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mail.example.com".to_string());
    let cache_path: PathBuf = std::env::temp_dir().join("csrkit-demo.key");

    let cache = std::fs::read(&cache_path).ok();
    let mut material = KeyMaterial::with_cache(KeyOptions::default(), cache);

    let subject = DistinguishedName::from_common_name(common_name);
    let csr = material.generate_csr(&subject)?;
    println!("{}", csr.to_pem()?);

    let converted = SoftwareProvider::default().convert(material.get_key_handle()?);
    match converted {
        Ok(converted) => {
            println!("Key imported into container {}", converted.container_name);
        }
        Err(e) if e.should_invalidate_cache() => {
            material.invalidate();
            let _ = std::fs::remove_file(&cache_path);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(blob) = material.export_cache_blob() {
        std::fs::write(&cache_path, blob)?;
    }
    Ok(())
}
