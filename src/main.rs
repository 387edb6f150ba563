//! `nfse-cert` - operate the filer's A1 certificate from the command line.
//!
//! ```bash
//! # Materialize certificados/ from environment variables, then load
//! nfse-cert bootstrap
//!
//! # Inspect the loaded certificate
//! nfse-cert info
//!
//! # Sign a payload (base64 signature on stdout)
//! nfse-cert sign --input rps.xml
//! ```

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use nfse_cert::bootstrap::{resolve_source, setup_certificates, write_private_file, BootstrapOutcome};
use nfse_cert::configs::{AppConfig, LogFormat};
use nfse_cert::logging::init_logging;
use nfse_cert::manager::CertificateManager;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "nfse-cert", version, about = "A1 certificate manager for NFS-e signing")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", env = "NFSE_CONFIG", global = true)]
    config: PathBuf,

    /// Log level, overrides the configuration file (RUST_LOG wins over both)
    #[arg(short, long, env = "NFSE_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format, overrides the configuration file
    #[arg(long, value_enum, env = "NFSE_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write certificate files from environment variables, then load them
    Bootstrap,

    /// Print certificate metadata as JSON
    Info,

    /// Sign a file with the certificate's private key
    Sign {
        /// File whose bytes are signed
        #[arg(short, long)]
        input: PathBuf,

        /// Write the raw signature here instead of base64 to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the certificate and unencrypted private key as PEM
    Export {
        /// Certificate PEM destination
        #[arg(long)]
        cert: PathBuf,

        /// Private key PEM destination, created owner-only
        #[arg(long)]
        key: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let format = cli.log_format.unwrap_or(config.logging.format);
    init_logging(level, format).context("Failed to initialize logging")?;

    let bootstrap = match cli.command {
        Commands::Bootstrap => Some(
            setup_certificates(&config.bootstrap, Some(config.certificate.display_path()))
                .context("Certificate bootstrap failed")?,
        ),
        _ => None,
    };

    let source = resolve_source(&config.certificate, &config.bootstrap);
    let manager = CertificateManager::init(source.clone()).with_context(|| {
        format!("Failed to load certificate from {}", source.display_path().display())
    })?;

    match cli.command {
        Commands::Bootstrap => {
            match &bootstrap {
                Some(BootstrapOutcome::Written(paths)) => info!(files = paths.len(), "Bootstrap wrote certificate files"),
                Some(BootstrapOutcome::AlreadyPresent) => info!("Bootstrap found certificate files in place"),
                Some(BootstrapOutcome::NotConfigured) | None => info!("Bootstrap had nothing to write"),
            }

            let wrote_something = bootstrap.as_ref().is_some_and(BootstrapOutcome::is_ready);
            if wrote_something && !manager.is_loaded() {
                bail!(
                    "bootstrap material is on disk but the configured source {} is not",
                    source.display_path().display()
                );
            }
            println!("loaded: {}", manager.is_loaded());
        }
        Commands::Info => {
            let metadata = manager.metadata().context("No certificate loaded")?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Commands::Sign { input, output } => {
            let data = fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let signature = manager.sign(&data).context("Failed to sign input")?;
            match output {
                Some(path) => fs::write(&path, &signature)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", STANDARD.encode(&signature)),
            }
        }
        Commands::Export { cert, key } => {
            let cert_pem = manager.certificate_pem().context("No certificate loaded")?;
            let key_pem = manager.private_key_pem().context("No private key loaded")?;
            fs::write(&cert, cert_pem)
                .with_context(|| format!("Failed to write {}", cert.display()))?;
            write_private_file(&key, key_pem.as_bytes())
                .with_context(|| format!("Failed to write {}", key.display()))?;
            info!(cert = %cert.display(), key = %key.display(), "Certificate exported");
        }
    }

    Ok(())
}
