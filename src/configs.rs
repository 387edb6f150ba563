use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CERTIFICATE_PATH_ENV: &str = "CERTIFICATE_PATH";
const CERTIFICATE_PASSWORD_ENV: &str = "CERTIFICATE_PASSWORD";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub certificate: CertificateSource,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the filer's certificate and key are read from.
#[derive(Deserialize, Clone)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CertificateSource {
    /// Password-protected PKCS#12 container.
    Pkcs12 {
        #[serde(default = "default_pfx_path")]
        path: PathBuf,
        #[serde(default)]
        password: String,
    },
    /// PEM certificate plus unencrypted PEM key.
    Pem {
        #[serde(default = "default_cert_pem_path")]
        cert_path: PathBuf,
        #[serde(default = "default_key_pem_path")]
        key_path: PathBuf,
    },
}

impl CertificateSource {
    pub fn pkcs12(path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self::Pkcs12 {
            path: path.into(),
            password: password.into(),
        }
    }

    pub fn pem(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self::Pem {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// True when every file this source needs is present.
    pub fn exists(&self) -> bool {
        match self {
            Self::Pkcs12 { path, .. } => path.exists(),
            Self::Pem {
                cert_path,
                key_path,
            } => cert_path.exists() && key_path.exists(),
        }
    }

    /// Primary path, for log lines.
    pub fn display_path(&self) -> &Path {
        match self {
            Self::Pkcs12 { path, .. } => path,
            Self::Pem { cert_path, .. } => cert_path,
        }
    }
}

impl Default for CertificateSource {
    fn default() -> Self {
        Self::pkcs12(default_pfx_path(), String::new())
    }
}

impl fmt::Debug for CertificateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pkcs12 { path, .. } => f
                .debug_struct("Pkcs12")
                .field("path", path)
                .field("password", &"<redacted>")
                .finish(),
            Self::Pem {
                cert_path,
                key_path,
            } => f
                .debug_struct("Pem")
                .field("cert_path", cert_path)
                .field("key_path", key_path)
                .finish(),
        }
    }
}

fn default_pfx_path() -> PathBuf {
    PathBuf::from("certificados/certificado.pfx")
}

fn default_cert_pem_path() -> PathBuf {
    PathBuf::from("certificados/cert.pem")
}

fn default_key_pem_path() -> PathBuf {
    PathBuf::from("certificados/key.pem")
}

/// Names of the environment variables the bootstrap step reads, and where it writes.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapConfig {
    #[serde(default = "default_bootstrap_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_cert_env")]
    pub cert_env: String,
    #[serde(default = "default_key_env")]
    pub key_env: String,
    #[serde(default = "default_pfx_env")]
    pub pfx_env: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            directory: default_bootstrap_dir(),
            cert_env: default_cert_env(),
            key_env: default_key_env(),
            pfx_env: default_pfx_env(),
        }
    }
}

fn default_bootstrap_dir() -> PathBuf {
    PathBuf::from("certificados")
}

fn default_cert_env() -> String {
    "CERTIFICATE_CERT_PEM".to_string()
}

fn default_key_env() -> String {
    "CERTIFICATE_KEY_PEM".to_string()
}

fn default_pfx_env() -> String {
    "CERTIFICATE_PFX_BASE64".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
    Compact,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).context("Failed to parse config file")
    }

    /// Load `path` if it exists (defaults otherwise), then apply environment overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    /// Load configuration with default path (config.toml)
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// `CERTIFICATE_PATH` and `CERTIFICATE_PASSWORD` override a PKCS#12 source.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let CertificateSource::Pkcs12 { path, password } = &mut self.certificate {
            if let Some(value) = lookup(CERTIFICATE_PATH_ENV) {
                *path = PathBuf::from(value);
            }
            if let Some(value) = lookup(CERTIFICATE_PASSWORD_ENV) {
                *password = value;
            }
        }
    }
}
