//! Error types for certificate loading, signing and bootstrap.
//!
//! ```text
//! CertificateError
//! ├── load time       ContainerUnreadable, WrongPassword, MissingKeyOrCertificate,
//! │                   UnsupportedKeyAlgorithm, KeyCertificateMismatch, SourceMissing,
//! │                   MalformedCertificate
//! ├── operation time  NotLoaded, KeyNotLoaded, CertificateExpired
//! └── plumbing        Io, Pem, Crypto
//!
//! BootstrapError      Decode, Write
//! ```

use chrono::{DateTime, Utc};
use openssl::error::ErrorStack;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, CertificateError>;

/// Failures surfaced by the certificate manager and its components.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The bytes are not a PKCS#12 container (or a PEM document that could not be parsed).
    #[error("certificate container at {path} is unreadable: {reason}")]
    ContainerUnreadable { path: PathBuf, reason: String },

    /// The container is well formed but could not be decrypted with the password.
    #[error("wrong password for certificate container at {path}")]
    WrongPassword { path: PathBuf },

    /// The container decrypted but lacks a private key or a leaf certificate.
    #[error("certificate container is missing its {missing}")]
    MissingKeyOrCertificate { missing: &'static str },

    /// The private key cannot be used for RSA PKCS#1 v1.5 signatures.
    #[error("unsupported private key algorithm: {algorithm}")]
    UnsupportedKeyAlgorithm { algorithm: String },

    /// The private key does not belong to the leaf certificate.
    #[error("private key does not match the certificate public key")]
    KeyCertificateMismatch,

    /// The certificate itself could not be interpreted.
    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    /// An explicit load was requested but the configured source does not exist.
    #[error("certificate source not found: {path}")]
    SourceMissing { path: PathBuf },

    /// No certificate has been loaded yet (or it was shut down).
    #[error("certificate not loaded")]
    NotLoaded,

    /// Signing was requested without key material.
    #[error("private key not loaded")]
    KeyNotLoaded,

    /// Signing was requested outside the certificate validity window.
    #[error("certificate outside its validity window ({not_before} to {not_after})")]
    CertificateExpired {
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("PEM encoding error: {0}")]
    Pem(String),

    #[error("OpenSSL error: {0}")]
    Crypto(#[from] ErrorStack),
}

impl CertificateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures detected while reading a certificate source.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::ContainerUnreadable { .. }
                | Self::WrongPassword { .. }
                | Self::MissingKeyOrCertificate { .. }
                | Self::UnsupportedKeyAlgorithm { .. }
                | Self::KeyCertificateMismatch
                | Self::SourceMissing { .. }
                | Self::MalformedCertificate(_)
        )
    }
}

/// Failures of the environment-variable bootstrap step.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("environment variable {var} is not valid base64: {source}")]
    Decode {
        var: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_classification() {
        assert!(CertificateError::WrongPassword {
            path: PathBuf::from("a.pfx")
        }
        .is_load_error());
        assert!(CertificateError::KeyCertificateMismatch.is_load_error());
        assert!(!CertificateError::NotLoaded.is_load_error());
        assert!(!CertificateError::KeyNotLoaded.is_load_error());
    }

    #[test]
    fn test_messages_do_not_include_secrets() {
        let err = CertificateError::WrongPassword {
            path: PathBuf::from("certificados/certificado.pfx"),
        };
        assert_eq!(
            err.to_string(),
            "wrong password for certificate container at certificados/certificado.pfx"
        );
    }
}
