//! Materialize certificate files from base64 environment variables.
//!
//! Some deployment targets only allow secrets as environment variables. This step
//! decodes them into the certificate directory before the manager loads, after which
//! the caller runs [`CertificateManager::reload`](crate::manager::CertificateManager::reload).
//!
//! The PEM pair lands in `config.directory`, which is not where a PKCS#12 source looks.
//! [`resolve_source`] picks the pair up when the configured container is absent.
//!
//! Absent variables are not an error (the manager simply stays unloaded); a variable
//! that is present but undecodable, or a file that cannot be written, always is.

use crate::configs::{BootstrapConfig, CertificateSource};
use crate::error::BootstrapError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

pub const CERT_FILE_NAME: &str = "cert.pem";
pub const KEY_FILE_NAME: &str = "key.pem";

/// What the bootstrap step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The files were already on disk; nothing was written.
    AlreadyPresent,
    /// These files were decoded from the environment and written.
    Written(Vec<PathBuf>),
    /// Neither the files nor the variables were available.
    NotConfigured,
}

impl BootstrapOutcome {
    /// True when the step left some certificate material on disk.
    ///
    /// That material need not be what the configured source reads; check
    /// [`resolve_source`]`(..).exists()` before reloading.
    pub fn is_ready(&self) -> bool {
        !matches!(self, Self::NotConfigured)
    }
}

/// The source the manager should load after bootstrap.
///
/// This is `source` itself when its files exist. A PKCS#12 source whose container is
/// missing falls back to the PEM pair in `config.directory` if both files are there.
pub fn resolve_source(source: &CertificateSource, config: &BootstrapConfig) -> CertificateSource {
    if source.exists() {
        return source.clone();
    }
    if let CertificateSource::Pkcs12 { path, .. } = source {
        let fallback = CertificateSource::pem(
            config.directory.join(CERT_FILE_NAME),
            config.directory.join(KEY_FILE_NAME),
        );
        if fallback.exists() {
            info!(
                container = %path.display(),
                directory = %config.directory.display(),
                "Certificate container absent, using bootstrapped PEM pair"
            );
            return fallback;
        }
    }
    source.clone()
}

/// Run the bootstrap against the process environment.
///
/// `container_path` is where a base64 PKCS#12 container from `config.pfx_env` is written,
/// normally the manager's configured container path.
pub fn setup_certificates(
    config: &BootstrapConfig,
    container_path: Option<&Path>,
) -> Result<BootstrapOutcome, BootstrapError> {
    setup_certificates_with(config, container_path, |name| env::var(name).ok())
}

/// Same as [`setup_certificates`] with an explicit variable lookup.
pub fn setup_certificates_with<F>(
    config: &BootstrapConfig,
    container_path: Option<&Path>,
    lookup: F,
) -> Result<BootstrapOutcome, BootstrapError>
where
    F: Fn(&str) -> Option<String>,
{
    fs::create_dir_all(&config.directory).map_err(|source| BootstrapError::Write {
        path: config.directory.clone(),
        source,
    })?;

    let mut written = Vec::new();
    let mut present = false;

    let cert_path = config.directory.join(CERT_FILE_NAME);
    let key_path = config.directory.join(KEY_FILE_NAME);
    if cert_path.exists() && key_path.exists() {
        info!(directory = %config.directory.display(), "Certificate PEM files already present");
        present = true;
    } else {
        match (lookup(&config.cert_env), lookup(&config.key_env)) {
            (Some(cert_b64), Some(key_b64)) => {
                // Decode both before writing either, so a bad key never leaves a lone cert.
                let cert = decode(&config.cert_env, &cert_b64)?;
                let key = decode(&config.key_env, &key_b64)?;
                write_private_file(&cert_path, &cert)?;
                info!(path = %cert_path.display(), "Certificate written");
                write_private_file(&key_path, &key)?;
                info!(path = %key_path.display(), "Private key written");
                written.push(cert_path);
                written.push(key_path);
            }
            (cert, key) => {
                warn!(
                    cert_var = %config.cert_env,
                    cert_set = cert.is_some(),
                    key_var = %config.key_env,
                    key_set = key.is_some(),
                    directory = %config.directory.display(),
                    "Certificate PEM variables not set and files not present"
                );
            }
        }
    }

    if let Some(container_path) = container_path {
        if container_path.exists() {
            present = true;
        } else if let Some(pfx_b64) = lookup(&config.pfx_env) {
            let container = decode(&config.pfx_env, &pfx_b64)?;
            if let Some(parent) = container_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| BootstrapError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            write_private_file(container_path, &container)?;
            info!(path = %container_path.display(), "Certificate container written");
            written.push(container_path.to_path_buf());
        }
    }

    Ok(if !written.is_empty() {
        BootstrapOutcome::Written(written)
    } else if present {
        BootstrapOutcome::AlreadyPresent
    } else {
        BootstrapOutcome::NotConfigured
    })
}

fn decode(var: &str, value: &str) -> Result<Vec<u8>, BootstrapError> {
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|source| BootstrapError::Decode {
            var: var.to_string(),
            source,
        })
}

/// Write `bytes` to `path` through an owner-only temp file renamed into place.
///
/// A file already at `path` is replaced, never reopened, so its old mode does not apply.
pub fn write_private_file(path: &Path, bytes: &[u8]) -> Result<(), BootstrapError> {
    let write_error = |source| BootstrapError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
