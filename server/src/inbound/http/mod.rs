//! Query/admin HTTP surface: the internal overview and series APIs plus the
//! product-compatible status, events, and admin endpoints.

pub mod actions;
pub mod error;
pub mod events;
pub mod metrics;
pub mod mmonit;
pub mod overview;

use actix_web::web;
use chrono::{DateTime, SecondsFormat, Utc};

pub use error::{ApiError, ApiResult};

/// Route table for the web listener.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(overview::overview)))
        .service(web::resource("/host/{id}").route(web::get().to(overview::host_detail)))
        .service(web::resource("/host/{id}/events").route(web::get().to(events::host_events)))
        .service(
            web::resource("/host/{id}/service/{name}")
                .route(web::get().to(overview::service_detail)),
        )
        .service(web::resource("/api/metrics").route(web::get().to(metrics::metrics_series)))
        .service(
            web::resource("/api/availability").route(web::get().to(metrics::availability_series)),
        )
        .service(
            web::resource("/api/remote-metrics")
                .route(web::get().to(metrics::remote_metrics_series)),
        )
        .service(web::resource("/api/action").route(web::post().to(actions::perform_action)))
        .service(
            web::resource("/api/host/description")
                .route(web::post().to(actions::set_description)),
        )
        .service(web::resource("/status/hosts").route(web::get().to(mmonit::status_hosts)))
        .service(web::resource("/status/hosts/{id}").route(web::get().to(mmonit::status_host)))
        .service(
            web::resource("/status/hosts/{id}/services")
                .route(web::get().to(mmonit::status_host_services)),
        )
        .service(web::resource("/events/list").route(web::get().to(mmonit::events_list)))
        .service(web::resource("/events/get/{id}").route(web::get().to(mmonit::events_get)))
        .service(
            web::resource("/admin/hosts")
                .route(web::get().to(mmonit::admin_hosts))
                .route(web::route().to(mmonit::admin_unsupported)),
        );
}

/// ISO-8601 from unix seconds.
pub(crate) fn iso8601(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// ISO-8601 from a collection instant with sub-second precision.
pub(crate) fn iso8601_collected(at: f64) -> String {
    iso8601(at as i64)
}

#[cfg(test)]
mod tests;
