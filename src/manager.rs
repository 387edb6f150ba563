//! The certificate manager: owner of the filer's certificate and key.
//!
//! ```text
//!            init()                 load()/reload() ok
//!  (source missing) ──► Unloaded ───────────────────────► Loaded ◄──┐
//!                          ▲                                │       │ reload ok, or
//!                          │ shutdown(), or reload failure  │       │ reload failure
//!                          │ with DiscardOnFailure          │       │ with KeepPrevious
//!                          └────────────────────────────────┴───────┘
//! ```
//!
//! The certificate record and its key live together in one immutable bundle behind an
//! [`ArcSwapOption`]. Readers take a snapshot of the whole bundle, so a concurrent
//! reload can never pair a certificate from one load with a key from another. Writers
//! are serialized by `reload_lock` and only ever store a complete bundle (or nothing).
//!
//! Share one manager per process by wrapping it in an `Arc`.

use crate::certificate_record::CertificateRecord;
use crate::configs::CertificateSource;
use crate::ephemeral::{self, EphemeralFilePair};
use crate::error::{CertificateError, Result};
use crate::key_store::PrivateKeyMaterial;
use crate::metadata::CertificateMetadata;
use crate::pem_codec;
use crate::pfx_key;
use crate::signature;
use crate::validity::{self, Clock, SystemClock};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

/// What happens to the current certificate when a reload fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadPolicy {
    /// Keep serving the previously loaded certificate.
    #[default]
    KeepPrevious,
    /// Drop back to the unloaded state.
    DiscardOnFailure,
}

/// A signature together with the certificate whose key produced it.
#[derive(Debug, Clone)]
pub struct SignedPayload {
    pub signature: Vec<u8>,
    pub certificate: CertificateRecord,
}

struct LoadedCertificate {
    record: CertificateRecord,
    key: PrivateKeyMaterial,
}

enum Source {
    Pkcs12 { path: PathBuf, password: SecretString },
    Pem { cert_path: PathBuf, key_path: PathBuf },
}

impl Source {
    fn exists(&self) -> bool {
        match self {
            Self::Pkcs12 { path, .. } => path.exists(),
            Self::Pem {
                cert_path,
                key_path,
            } => cert_path.exists() && key_path.exists(),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Pkcs12 { path, .. } => path,
            Self::Pem { cert_path, .. } => cert_path,
        }
    }

    fn load(&self) -> Result<(CertificateRecord, PrivateKeyMaterial)> {
        match self {
            Self::Pkcs12 { path, password } => pfx_key::load_pfx(path, password.expose_secret()),
            Self::Pem {
                cert_path,
                key_path,
            } => pfx_key::load_pem_pair(cert_path, key_path),
        }
    }
}

impl From<CertificateSource> for Source {
    fn from(source: CertificateSource) -> Self {
        match source {
            CertificateSource::Pkcs12 { path, password } => Self::Pkcs12 {
                path,
                password: SecretString::from(password),
            },
            CertificateSource::Pem {
                cert_path,
                key_path,
            } => Self::Pem {
                cert_path,
                key_path,
            },
        }
    }
}

/// Loads, reloads and guards the filer's A1 certificate.
pub struct CertificateManager {
    source: Source,
    clock: Arc<dyn Clock>,
    state: ArcSwapOption<LoadedCertificate>,
    reload_lock: Mutex<()>,
}

impl CertificateManager {
    /// Create a manager without touching the filesystem.
    pub fn unloaded(source: CertificateSource, clock: Arc<dyn Clock>) -> Self {
        Self {
            source: source.into(),
            clock,
            state: ArcSwapOption::empty(),
            reload_lock: Mutex::new(()),
        }
    }

    /// Create a manager on the wall clock and load the source if it is already present.
    pub fn init(source: CertificateSource) -> Result<Self> {
        Self::init_with_clock(source, Arc::new(SystemClock))
    }

    /// Same as [`CertificateManager::init`] with an injected clock.
    ///
    /// A missing source is not an error: the manager starts unloaded and waits for
    /// [`CertificateManager::reload`]. A source that exists but cannot be loaded is.
    pub fn init_with_clock(source: CertificateSource, clock: Arc<dyn Clock>) -> Result<Self> {
        let manager = Self::unloaded(source, clock);
        if manager.source.exists() {
            manager.load()?;
        } else {
            warn!(
                path = %manager.source.path().display(),
                "Certificate source not found, starting unloaded"
            );
        }
        Ok(manager)
    }

    /// Load the source, keeping the current certificate if this fails.
    pub fn load(&self) -> Result<()> {
        self.load_with(ReloadPolicy::KeepPrevious)
    }

    /// Load the source and replace the current certificate and key as one unit.
    pub fn load_with(&self, policy: ReloadPolicy) -> Result<()> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match self.source.load() {
            Ok((record, key)) => {
                info!(
                    subject = record.subject_name(),
                    serial = record.serial_number(),
                    not_after = %record.not_after(),
                    "Certificate loaded"
                );
                self.warn_if_outside_window(&record);
                self.state
                    .store(Some(Arc::new(LoadedCertificate { record, key })));
                Ok(())
            }
            Err(e) => {
                if policy == ReloadPolicy::DiscardOnFailure {
                    self.state.store(None);
                }
                Err(e)
            }
        }
    }

    /// Reload after the source has been (re)materialized; never panics or propagates.
    ///
    /// Returns `true` when a certificate is now loaded from the source.
    pub fn reload(&self) -> bool {
        self.reload_with(ReloadPolicy::KeepPrevious)
    }

    pub fn reload_with(&self, policy: ReloadPolicy) -> bool {
        match self.load_with(policy) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    path = %self.source.path().display(),
                    error = %e,
                    kept_previous = policy == ReloadPolicy::KeepPrevious && self.is_loaded(),
                    "Certificate reload failed"
                );
                false
            }
        }
    }

    /// Drop the certificate and key; the manager returns to the unloaded state.
    pub fn shutdown(&self) {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.state.store(None);
        info!("Certificate manager shut down");
    }

    pub fn is_loaded(&self) -> bool {
        self.state.load().is_some()
    }

    /// Whether the loaded certificate is inside its validity window right now.
    ///
    /// `false` when nothing is loaded.
    pub fn is_valid(&self) -> bool {
        match self.state.load_full() {
            Some(loaded) => self.warn_if_outside_window(&loaded.record),
            None => false,
        }
    }

    /// SHA-256 / RSA PKCS#1 v1.5 signature over `data`.
    ///
    /// # Errors
    ///
    /// `KeyNotLoaded` when nothing is loaded, then `CertificateExpired` when the
    /// certificate is outside its validity window.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.sign_with_certificate(data).map(|signed| signed.signature)
    }

    /// Like [`CertificateManager::sign`], also returning the certificate that matches the
    /// signature, taken from the same snapshot.
    pub fn sign_with_certificate(&self, data: &[u8]) -> Result<SignedPayload> {
        let loaded = self.state.load_full().ok_or(CertificateError::KeyNotLoaded)?;
        if !self.warn_if_outside_window(&loaded.record) {
            return Err(CertificateError::CertificateExpired {
                not_before: loaded.record.not_before(),
                not_after: loaded.record.not_after(),
            });
        }

        let signature = signature::sign(&loaded.key, data)?;
        Ok(SignedPayload {
            signature,
            certificate: loaded.record.clone(),
        })
    }

    /// Check a signature against the loaded certificate.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool> {
        signature::verify(&self.snapshot()?.record, data, signature)
    }

    /// A copy of the loaded certificate record.
    pub fn certificate(&self) -> Result<CertificateRecord> {
        Ok(self.snapshot()?.record.clone())
    }

    pub fn certificate_pem(&self) -> Result<String> {
        pem_codec::certificate_to_pem(&self.snapshot()?.record)
    }

    /// Unencrypted PEM of the private key. Treat the result like the key itself.
    pub fn private_key_pem(&self) -> Result<String> {
        pem_codec::key_to_pem(&self.snapshot()?.key)
    }

    /// Write certificate and key PEM to temporary files the caller must delete.
    ///
    /// Prefer [`CertificateManager::scoped_ephemeral_files`], which deletes on drop.
    pub fn ephemeral_files(&self) -> Result<(PathBuf, PathBuf)> {
        self.scoped_ephemeral_files()?.keep()
    }

    /// Write certificate and key PEM to temporary files removed when the pair is dropped.
    pub fn scoped_ephemeral_files(&self) -> Result<EphemeralFilePair> {
        let loaded = self.snapshot()?;
        ephemeral::provision(&loaded.record, &loaded.key)
    }

    /// Like [`CertificateManager::scoped_ephemeral_files`] inside a chosen directory.
    pub fn scoped_ephemeral_files_in(&self, dir: &Path) -> Result<EphemeralFilePair> {
        let loaded = self.snapshot()?;
        ephemeral::provision_in(dir, &loaded.record, &loaded.key)
    }

    pub fn metadata(&self) -> Result<CertificateMetadata> {
        let loaded = self.snapshot()?;
        Ok(CertificateMetadata::from_record(
            &loaded.record,
            self.clock.now(),
        ))
    }

    /// Subject common name of the loaded certificate.
    pub fn subject_name(&self) -> Result<String> {
        Ok(self.snapshot()?.record.subject_name().to_string())
    }

    pub fn expiration_date(&self) -> Result<DateTime<Utc>> {
        Ok(self.snapshot()?.record.not_after())
    }

    fn snapshot(&self) -> Result<Arc<LoadedCertificate>> {
        self.state.load_full().ok_or(CertificateError::NotLoaded)
    }

    fn warn_if_outside_window(&self, record: &CertificateRecord) -> bool {
        let valid = validity::is_valid(record, self.clock.now());
        if !valid {
            warn!(
                not_before = %record.not_before(),
                not_after = %record.not_after(),
                "Certificate outside its validity window"
            );
        }
        valid
    }
}
