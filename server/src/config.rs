//! CLI surface and validated runtime settings.
//!
//! Bad flag combinations are configuration errors and fatal at startup.
//! Daemonization and syslog plumbing are left to the service manager.

use std::fs::File;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::inbound::auth::{CollectorAuth, PasswordVerifier};

#[derive(Debug, Parser)]
#[command(
    name = "monhive",
    version,
    about = "Aggregates Monit agent snapshots into an embedded time-series store"
)]
pub struct Cli {
    /// Address the agent-facing collector listens on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub collector_addr: SocketAddr,

    /// Address the query/admin API listens on.
    #[arg(long, default_value = "127.0.0.1:8081")]
    pub web_addr: SocketAddr,

    /// Username agents authenticate with.
    #[arg(long, default_value = "monit")]
    pub username: String,

    /// Password agents authenticate with; plain text or a bcrypt hash,
    /// depending on --password-format.
    #[arg(long, default_value = "monit")]
    pub password: String,

    #[arg(long, value_enum, default_value_t = PasswordFormat::Plain)]
    pub password_format: PasswordFormat,

    /// TLS certificate for the collector listener (PEM). Requires --tls-key.
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key for the collector listener (PEM). Requires --tls-cert.
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// Path of the embedded database file.
    #[arg(long, default_value = "monhive.db")]
    pub db_path: PathBuf,

    /// Write the process id here on startup and remove it on shutdown.
    #[arg(long)]
    pub pid_file: Option<PathBuf>,

    /// Lower the default log filter to debug.
    #[arg(long)]
    pub debug: bool,

    /// Print the bcrypt hash of the given plaintext and exit.
    #[arg(long, value_name = "PLAINTEXT")]
    pub hash_password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PasswordFormat {
    /// Compare the configured password as plain text.
    Plain,
    /// Treat the configured password as a bcrypt hash.
    Bcrypt,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--tls-cert and --tls-key must be provided together")]
    TlsPairIncomplete,
    #[error("failed to read TLS material from {path}: {source}")]
    TlsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no certificate found in {path}")]
    TlsNoCertificate { path: PathBuf },
    #[error("no private key found in {path}")]
    TlsNoKey { path: PathBuf },
    #[error("invalid TLS configuration: {0}")]
    Tls(String),
}

/// Validated runtime settings derived from the CLI.
pub struct Settings {
    pub collector_addr: SocketAddr,
    pub web_addr: SocketAddr,
    pub auth: CollectorAuth,
    pub tls: Option<rustls::ServerConfig>,
    pub db_path: PathBuf,
    pub pid_file: Option<PathBuf>,
    pub debug: bool,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let verifier = match cli.password_format {
            PasswordFormat::Plain => PasswordVerifier::Plain(cli.password),
            PasswordFormat::Bcrypt => PasswordVerifier::Bcrypt(cli.password),
        };

        let tls = match (cli.tls_cert, cli.tls_key) {
            (Some(cert), Some(key)) => Some(load_tls(&cert, &key)?),
            (None, None) => None,
            _ => return Err(ConfigError::TlsPairIncomplete),
        };

        Ok(Self {
            collector_addr: cli.collector_addr,
            web_addr: cli.web_addr,
            auth: CollectorAuth::new(cli.username, verifier),
            tls,
            db_path: cli.db_path,
            pid_file: cli.pid_file,
            debug: cli.debug,
        })
    }
}

fn load_tls(
    cert_path: &std::path::Path,
    key_path: &std::path::Path,
) -> Result<rustls::ServerConfig, ConfigError> {
    let open = |path: &std::path::Path| {
        File::open(path).map(BufReader::new).map_err(|source| ConfigError::TlsRead {
            path: path.to_path_buf(),
            source,
        })
    };

    let mut cert_reader = open(cert_path)?;
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ConfigError::TlsRead {
            path: cert_path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(ConfigError::TlsNoCertificate {
            path: cert_path.to_path_buf(),
        });
    }

    let mut key_reader = open(key_path)?;
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|source| ConfigError::TlsRead {
            path: key_path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| ConfigError::TlsNoKey {
            path: key_path.to_path_buf(),
        })?;

    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| ConfigError::Tls(err.to_string()))
}
