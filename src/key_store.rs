//! Secret-wrapped storage for the filer's private key
//!
//! The key is held as DER bytes inside a `secrecy::SecretBox`, zeroized on drop and
//! never shown in debug output. An OpenSSL key object is rebuilt only for the duration
//! of a single operation (signing, PEM export, public key comparison).

use crate::error::{CertificateError, Result};
use openssl::pkey::{Id, PKey, PKeyRef, Private};
use openssl::x509::X509Ref;
use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// The RSA private key belonging to the loaded certificate.
///
/// Only the certificate manager constructs and owns values of this type; other
/// components receive a borrow for the length of one call and can only sign with it
/// or encode it.
pub struct PrivateKeyMaterial {
    der: SecretBox<Vec<u8>>,
    bits: u32,
}

impl PrivateKeyMaterial {
    /// Wrap an RSA key, rejecting every other algorithm up front.
    pub(crate) fn from_pkey(key: &PKeyRef<Private>) -> Result<Self> {
        if key.id() != Id::RSA {
            return Err(CertificateError::UnsupportedKeyAlgorithm {
                algorithm: algorithm_name(key.id()),
            });
        }

        let der = key.private_key_to_der()?;
        Ok(Self {
            der: SecretBox::new(Box::new(der)),
            bits: key.bits(),
        })
    }

    /// Run `op` against a temporary OpenSSL key rebuilt from the stored DER.
    pub(crate) fn with_pkey<T>(&self, op: impl FnOnce(&PKey<Private>) -> Result<T>) -> Result<T> {
        let pkey = PKey::private_key_from_der(self.der.expose_secret())?;
        op(&pkey)
    }

    /// True when this key is the private half of the certificate's public key.
    pub(crate) fn matches_certificate(&self, certificate: &X509Ref) -> Result<bool> {
        let public_key = certificate.public_key()?;
        self.with_pkey(|pkey| Ok(pkey.public_eq(&public_key)))
    }

    /// RSA modulus size in bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyMaterial")
            .field("algorithm", &"RSA")
            .field("bits", &self.bits)
            .field("key", &"<securely stored>")
            .finish()
    }
}

fn algorithm_name(id: Id) -> String {
    match id {
        Id::EC => "EC".to_string(),
        Id::DSA => "DSA".to_string(),
        Id::DH => "DH".to_string(),
        Id::ED25519 => "Ed25519".to_string(),
        other => format!("nid {}", other.as_raw()),
    }
}
