//! NFS-e Cert - A1 certificate lifecycle and signing for electronic service invoices
//!
//! Brazilian NFS-e documents must be signed with the filer's A1 certificate, a
//! password-protected PKCS#12 container holding an RSA private key and an X.509
//! certificate. This library loads that container, checks the certificate's validity
//! window, signs payloads with the key, exports PEM for collaborators, and supports
//! reloading once the container shows up after process start.
//!
//! # Overview
//!
//! ```text
//! CertificateManager (facade, owns the key)
//!   ├── pfx_key        PKCS#12 / PEM pair → (CertificateRecord, PrivateKeyMaterial)
//!   ├── validity       not_before <= now <= not_after, injectable Clock
//!   ├── signature      RSA PKCS#1 v1.5 over SHA-256
//!   ├── pem_codec      certificate / key ⇄ PEM text
//!   └── ephemeral      owner-only temp files for path-based consumers
//!
//! bootstrap            base64 environment variables → files, before reload()
//! ```
//!
//! # Features
//!
//! - **Atomic reloads**: certificate and key are swapped as one immutable bundle
//! - **Expiry gating**: signing refuses to run outside the validity window
//! - **Key confinement**: the key stays in a zeroizing secret box, never in `Debug` output
//! - **Safe temp files**: created exclusive, owner-only, and removed on drop
//!
//! # Quick Start
//!
//! ```no_run
//! use nfse_cert::configs::CertificateSource;
//! use nfse_cert::manager::CertificateManager;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), nfse_cert::error::CertificateError> {
//!     let source = CertificateSource::pkcs12("certificados/certificado.pfx", "test123");
//!     let manager = Arc::new(CertificateManager::init(source)?);
//!
//!     if manager.is_loaded() {
//!         let signature = manager.sign(b"invoice-payload")?;
//!         println!("signature: {} bytes", signature.len());
//!         println!("{:#?}", manager.metadata()?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Late-arriving certificates
//!
//! ```no_run
//! use nfse_cert::bootstrap::{resolve_source, setup_certificates};
//! use nfse_cert::configs::AppConfig;
//! use nfse_cert::manager::CertificateManager;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = AppConfig::load()?;
//! let manager = CertificateManager::init(config.certificate.clone())?;
//!
//! setup_certificates(&config.bootstrap, Some(config.certificate.display_path()))?;
//! if config.certificate.exists() && !manager.reload() {
//!     anyhow::bail!("certificate files present but could not be loaded");
//! }
//!
//! // With only the PEM variables set, the container never appears; load the pair instead.
//! let source = resolve_source(&config.certificate, &config.bootstrap);
//! let manager = if manager.is_loaded() { manager } else { CertificateManager::init(source)? };
//! # let _ = manager;
//! # Ok(())
//! # }
//! ```
//!
//! # Security Considerations
//!
//! - ✅ Password never logged; key never logged or printed
//! - ✅ Exported key files are 0600 from creation
//! - ⚠️ No chain, revocation (OCSP/CRL) or trust-root validation
//! - ⚠️ `private_key_pem()` returns the key unencrypted; treat it like the key itself

pub mod bootstrap;
pub mod certificate_record;
pub mod configs;
pub mod ephemeral;
pub mod error;
pub mod key_store;
pub mod logging;
pub mod manager;
pub mod metadata;
pub mod pem_codec;
pub mod pfx_key;
pub mod signature;
pub mod validity;

#[cfg(test)]
mod test_support;

pub use error::{BootstrapError, CertificateError};
pub use manager::{CertificateManager, ReloadPolicy};
