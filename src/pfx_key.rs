//! Loading the filer's certificate and key from disk.
//!
//! Two sources are supported: the password-protected PKCS#12 container (`.pfx`/`.p12`)
//! the certificate is issued as, and a PEM certificate/key pair as written by the
//! bootstrap step. Either way only the leaf certificate and its key come back; any
//! CA certificates bundled in the container are ignored, and chain validation is not
//! done here.
//!
//! Many A1 containers are still sealed with RC2/3DES, which OpenSSL 3 keeps in its
//! `legacy` provider. That provider is loaded once, next to the default one, before the
//! first container is parsed.

use crate::certificate_record::CertificateRecord;
use crate::error::{CertificateError, Result};
use crate::key_store::PrivateKeyMaterial;
use crate::pem_codec;
use openssl::pkcs12::Pkcs12;
use openssl::provider::Provider;
use openssl::x509::X509Ref;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

static LEGACY_PROVIDER: OnceLock<Option<Provider>> = OnceLock::new();

/// Make RC2/3DES containers readable. Returns `false` when the provider is unavailable.
///
/// The provider stays loaded for the life of the process.
pub fn enable_legacy_algorithms() -> bool {
    LEGACY_PROVIDER
        .get_or_init(|| match Provider::try_load(None, "legacy", true) {
            Ok(provider) => {
                debug!("OpenSSL legacy provider loaded");
                Some(provider)
            }
            Err(e) => {
                warn!(error = %e, "OpenSSL legacy provider unavailable, RC2/3DES containers will not open");
                None
            }
        })
        .is_some()
}

/// Load a PKCS#12 file and return its leaf certificate and private key.
///
/// # Errors
///
/// - `SourceMissing` if nothing exists at `path`
/// - `ContainerUnreadable` if the bytes are not a PKCS#12 structure
/// - `WrongPassword` if the container cannot be decrypted with `password`
/// - `MissingKeyOrCertificate` if the container lacks the key or the certificate
/// - `UnsupportedKeyAlgorithm` if the key is not RSA
/// - `KeyCertificateMismatch` if the key does not belong to the certificate
pub fn load_pfx<P: AsRef<Path>>(
    path: P,
    password: &str,
) -> Result<(CertificateRecord, PrivateKeyMaterial)> {
    let path = path.as_ref();
    let der = read_source(path)?;
    parse_pfx(path, &der, password)
}

/// Same as [`load_pfx`] for container bytes already in memory; `path` is only used in errors.
pub fn parse_pfx(
    path: &Path,
    der: &[u8],
    password: &str,
) -> Result<(CertificateRecord, PrivateKeyMaterial)> {
    enable_legacy_algorithms();

    let container = Pkcs12::from_der(der).map_err(|e| CertificateError::ContainerUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let parsed = container
        .parse2(password)
        .map_err(|_| CertificateError::WrongPassword {
            path: path.to_path_buf(),
        })?;

    // Without a key OpenSSL cannot tell the leaf apart and files every certificate
    // under `ca`, so the key is checked first.
    let pkey = parsed
        .pkey
        .ok_or(CertificateError::MissingKeyOrCertificate {
            missing: "private key",
        })?;
    // `parsed.ca` holds the issuer chain, which is ignored.
    let certificate = parsed
        .cert
        .ok_or(CertificateError::MissingKeyOrCertificate {
            missing: "certificate",
        })?;

    let key = PrivateKeyMaterial::from_pkey(&pkey)?;
    assemble(&certificate, key)
}

/// Load a PEM certificate and an unencrypted PEM private key.
pub fn load_pem_pair<C: AsRef<Path>, K: AsRef<Path>>(
    cert_path: C,
    key_path: K,
) -> Result<(CertificateRecord, PrivateKeyMaterial)> {
    let cert_path = cert_path.as_ref();
    let key_path = key_path.as_ref();

    let cert_pem = read_source(cert_path)?;
    let key_pem = read_source(key_path)?;

    let record = pem_codec::certificate_from_pem(&cert_pem)
        .map_err(|e| unreadable(cert_path, e))?;
    let key = pem_codec::key_from_pem(&key_pem).map_err(|e| unreadable(key_path, e))?;

    let certificate = record.to_x509()?;
    assemble(&certificate, key)
}

fn assemble(
    certificate: &X509Ref,
    key: PrivateKeyMaterial,
) -> Result<(CertificateRecord, PrivateKeyMaterial)> {
    if !key.matches_certificate(certificate)? {
        return Err(CertificateError::KeyCertificateMismatch);
    }
    Ok((CertificateRecord::from_x509(certificate)?, key))
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CertificateError::SourceMissing {
            path: path.to_path_buf(),
        },
        _ => CertificateError::io(path, e),
    })
}

fn unreadable(path: &Path, error: CertificateError) -> CertificateError {
    match error {
        CertificateError::Pem(reason) => CertificateError::ContainerUnreadable {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    }
}
