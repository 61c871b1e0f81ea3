//! Wiring for the two HTTP listeners.
//!
//! Ingestion and the query API are separate servers on separate addresses:
//! the collector faces agents (optionally behind TLS) and carries only the
//! `/collector` resource; the web listener carries the query, action, and
//! product-compatible surfaces.

use std::io;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};

use crate::config::Settings;
use crate::domain::ports::AgentCommander;
use crate::inbound::{collector, http};
use crate::middleware::RequestTrace;
use crate::outbound::persistence::Store;

/// Build both servers. They are not awaited here; the caller joins them and
/// owns shutdown.
pub fn create_servers(
    settings: &Settings,
    store: Store,
    commander: Arc<dyn AgentCommander>,
) -> io::Result<(Server, Server)> {
    let store_data = web::Data::new(store);
    let auth_data = web::Data::new(settings.auth.clone());
    let commander_data = web::Data::from(commander);

    let collector_store = store_data.clone();
    let collector_factory = move || {
        App::new()
            .app_data(collector_store.clone())
            .app_data(auth_data.clone())
            .wrap(RequestTrace)
            .service(
                web::resource("/collector")
                    .route(web::post().to(collector::ingest))
                    .route(web::route().to(collector::method_not_allowed)),
            )
    };
    let collector_server = match settings.tls.clone() {
        Some(tls) => HttpServer::new(collector_factory)
            .bind_rustls_0_23(settings.collector_addr, tls)?
            .run(),
        None => HttpServer::new(collector_factory)
            .bind(settings.collector_addr)?
            .run(),
    };

    let web_server = HttpServer::new(move || {
        App::new()
            .app_data(store_data.clone())
            .app_data(commander_data.clone())
            .wrap(RequestTrace)
            .configure(http::configure)
    })
    .bind(settings.web_addr)?
    .run();

    Ok((collector_server, web_server))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cli, Settings};
    use crate::domain::model::ControlTarget;
    use crate::domain::ports::{AgentAction, ControlError};
    use async_trait::async_trait;
    use clap::Parser;
    use tempfile::TempDir;

    struct NoopCommander;

    #[async_trait]
    impl AgentCommander for NoopCommander {
        async fn perform(
            &self,
            _target: &ControlTarget,
            _service: &str,
            _action: AgentAction,
        ) -> Result<(), ControlError> {
            Ok(())
        }
    }

    #[actix_web::test]
    async fn both_servers_bind_ephemeral_ports() {
        let dir = TempDir::new().expect("tempdir");
        let cli = Cli::parse_from([
            "monhive",
            "--collector-addr",
            "127.0.0.1:0",
            "--web-addr",
            "127.0.0.1:0",
            "--db-path",
            dir.path().join("test.db").to_str().expect("utf-8 path"),
        ]);
        let settings = Settings::from_cli(cli).expect("valid settings");
        let store = Store::open(&settings.db_path).expect("store opens");

        let (collector_server, web_server) =
            create_servers(&settings, store, Arc::new(NoopCommander)).expect("servers build");
        drop(collector_server);
        drop(web_server);
    }
}
