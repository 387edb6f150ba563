//! PEM export and import for the certificate and its key.
//!
//! The key is written unencrypted in the traditional `RSA PRIVATE KEY` form expected by
//! downstream tools. That text is as sensitive as the key itself: never log it and never
//! write it anywhere readable by other users.

use crate::certificate_record::CertificateRecord;
use crate::error::{CertificateError, Result};
use crate::key_store::PrivateKeyMaterial;
use openssl::pkey::PKey;
use openssl::x509::X509;

/// Encode the certificate as a `CERTIFICATE` PEM block.
pub fn certificate_to_pem(record: &CertificateRecord) -> Result<String> {
    let pem = record.to_x509()?.to_pem()?;
    into_text(pem)
}

/// Encode the key as an unencrypted `RSA PRIVATE KEY` PEM block.
pub fn key_to_pem(key: &PrivateKeyMaterial) -> Result<String> {
    let pem = key.with_pkey(|pkey| Ok(pkey.rsa()?.private_key_to_pem()?))?;
    into_text(pem)
}

/// Parse the first certificate in a PEM document.
pub fn certificate_from_pem(pem: &[u8]) -> Result<CertificateRecord> {
    let certificate = X509::from_pem(pem).map_err(|e| CertificateError::Pem(e.to_string()))?;
    CertificateRecord::from_x509(&certificate)
}

/// Parse an unencrypted private key in either PKCS#1 or PKCS#8 PEM form.
pub fn key_from_pem(pem: &[u8]) -> Result<PrivateKeyMaterial> {
    let pkey = PKey::private_key_from_pem(pem).map_err(|e| CertificateError::Pem(e.to_string()))?;
    PrivateKeyMaterial::from_pkey(&pkey)
}

fn into_text(pem: Vec<u8>) -> Result<String> {
    String::from_utf8(pem).map_err(|e| CertificateError::Pem(e.to_string()))
}
