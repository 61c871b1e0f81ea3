#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]
//! Entry point: wires the collector listener, the query API listener, and
//! the availability heartbeat around one shared store.

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use monhive::config::{Cli, Settings};
use monhive::domain::ports::AgentCommander;
use monhive::heartbeat::{self, HEARTBEAT_PERIOD};
use monhive::outbound::control::HttpAgentCommander;
use monhive::outbound::persistence::Store;
use monhive::server::create_servers;

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    if let Err(err) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %err, "tracing init failed");
    }
}

fn write_pid_file(path: &Path) -> io::Result<()> {
    std::fs::write(path, format!("{}\n", std::process::id()))
}

/// Best-effort removal; shutdown should not fail over a missing PID file.
fn remove_pid_file(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %err, "failed to remove PID file");
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    // Utility mode: emit a hashed credential and exit.
    if let Some(plaintext) = cli.hash_password {
        let hashed = bcrypt::hash(plaintext, bcrypt::DEFAULT_COST).map_err(io::Error::other)?;
        println!("{hashed}");
        return Ok(());
    }

    init_tracing(cli.debug);

    let settings = Settings::from_cli(cli).map_err(io::Error::other)?;
    let store = Store::open(&settings.db_path).map_err(io::Error::other)?;

    if let Some(pid_file) = &settings.pid_file {
        write_pid_file(pid_file)?;
    }

    let commander: Arc<dyn AgentCommander> =
        Arc::new(HttpAgentCommander::new().map_err(io::Error::other)?);
    let heartbeat_task = tokio::spawn(heartbeat::run(store.clone(), HEARTBEAT_PERIOD));

    let (collector_server, web_server) = create_servers(&settings, store, commander)?;
    info!(
        collector = %settings.collector_addr,
        web = %settings.web_addr,
        tls = settings.tls.is_some(),
        "monhive listening"
    );

    // Both servers stop on SIGINT/SIGTERM; in-flight requests are not
    // drained beyond what the listeners do themselves.
    let outcome = tokio::try_join!(collector_server, web_server).map(|_| ());

    heartbeat_task.abort();
    if let Some(pid_file) = &settings.pid_file {
        remove_pid_file(pid_file);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pid_file_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("monhive.pid");

        write_pid_file(&path).expect("write");
        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(
            content.trim().parse::<u32>().expect("numeric pid"),
            std::process::id()
        );

        remove_pid_file(&path);
        assert!(!path.exists());
    }

    #[test]
    fn removing_a_missing_pid_file_is_harmless() {
        let dir = TempDir::new().expect("tempdir");
        remove_pid_file(&dir.path().join("never-written.pid"));
    }
}
