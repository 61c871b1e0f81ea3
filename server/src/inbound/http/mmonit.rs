//! The external-product-compatible surface.
//!
//! These JSON shapes are a wire contract consumed by existing dashboards;
//! they are mapped here from the domain rows and nowhere else. Mutations on
//! the admin surface are not supported and answer 501.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::events;
use crate::domain::model::ServiceKind;
use crate::domain::status::{self, WireStatus};
use crate::outbound::persistence::{EventRow, HostSummary, ServiceRow, Store};

use super::error::{ApiError, ApiResult, run_blocking};
use super::overview::is_stale;
use super::{iso8601, iso8601_collected};

#[derive(Debug, Serialize)]
pub struct HostRecord {
    pub id: String,
    pub hostname: String,
    pub status: u8,
    pub statusname: &'static str,
    pub monitversion: String,
    pub incarnation: i64,
    pub uptime: i64,
    pub poll: i64,
    pub platform: PlatformRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem: Option<f64>,
    pub services: usize,
    pub servicesup: usize,
    pub lastreporttime: String,
}

#[derive(Debug, Serialize)]
pub struct PlatformRecord {
    pub name: String,
    pub release: String,
    pub version: String,
    pub machine: String,
    pub cpu: i64,
    pub memory: i64,
    pub swap: i64,
}

#[derive(Debug, Serialize)]
pub struct ServiceRecordDto {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: i64,
    pub typename: &'static str,
    pub status: u8,
    pub statusname: &'static str,
    pub statusmessage: String,
    pub monitor: i64,
    pub collected: String,
}

#[derive(Debug, Serialize)]
pub struct EventRecord {
    pub id: i64,
    pub hostid: String,
    pub service: String,
    #[serde(rename = "type")]
    pub event_type: i64,
    pub typename: &'static str,
    pub message: String,
    pub date: String,
}

fn host_record(
    store: &Store,
    summary: &HostSummary,
    now_secs: i64,
) -> Result<HostRecord, crate::outbound::persistence::StoreError> {
    let host = &summary.host;
    let stale = is_stale(now_secs, host.last_seen);
    let wire = status::wire_status(stale, summary.counts);
    Ok(HostRecord {
        id: host.id.clone(),
        hostname: host.hostname.clone(),
        status: wire.code(),
        statusname: wire.name(),
        monitversion: host.version.clone(),
        incarnation: host.incarnation,
        uptime: host.uptime,
        poll: host.poll_interval,
        platform: PlatformRecord {
            name: host.platform_name.clone(),
            release: host.platform_release.clone(),
            version: host.platform_version.clone(),
            machine: host.platform_machine.clone(),
            cpu: host.platform_cpu,
            memory: host.platform_memory,
            swap: host.platform_swap,
        },
        cpu: store.latest_system_cpu_percent(&host.id)?,
        mem: store.latest_system_memory_percent(&host.id)?,
        services: summary.counts.total,
        servicesup: summary.counts.available(),
        lastreporttime: iso8601(host.last_seen),
    })
}

fn service_record(row: &ServiceRow) -> ServiceRecordDto {
    let derived = if row.status != 0 {
        WireStatus::Critical
    } else if row.monitor != 1 {
        WireStatus::Warning
    } else {
        WireStatus::Ok
    };
    ServiceRecordDto {
        name: row.name.clone(),
        service_type: row.service_type,
        typename: ServiceKind::from_wire(row.service_type)
            .map(ServiceKind::name)
            .unwrap_or("unknown"),
        status: derived.code(),
        statusname: derived.name(),
        statusmessage: events::failed_checks(row.status).join(", "),
        monitor: row.monitor,
        collected: iso8601_collected(row.collected_at),
    }
}

fn event_record(row: EventRow) -> EventRecord {
    EventRecord {
        id: row.id,
        hostid: row.host_id,
        service: row.service_name,
        event_type: row.event_type,
        typename: events::kind_name(row.event_type),
        message: row.message,
        date: iso8601(row.created_at),
    }
}

pub async fn status_hosts(store: web::Data<Store>) -> ApiResult<HttpResponse> {
    let store = store.get_ref().clone();
    let now_secs = Utc::now().timestamp();

    let records = run_blocking(move || {
        let mut records = Vec::new();
        for summary in store.hosts_summary()? {
            records.push(host_record(&store, &summary, now_secs)?);
        }
        Ok(records)
    })
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "records": records })))
}

pub async fn status_host(
    store: web::Data<Store>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let host_id = path.into_inner();
    let store = store.get_ref().clone();
    let now_secs = Utc::now().timestamp();

    let record = run_blocking(move || {
        let summaries = store.hosts_summary()?;
        let Some(summary) = summaries.into_iter().find(|s| s.host.id == host_id) else {
            return Ok(None);
        };
        host_record(&store, &summary, now_secs).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("host"))?;

    Ok(HttpResponse::Ok().json(json!({ "record": record })))
}

pub async fn status_host_services(
    store: web::Data<Store>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let host_id = path.into_inner();
    let store = store.get_ref().clone();

    let records = run_blocking(move || {
        if store.hostname(&host_id)?.is_none() {
            return Ok(None);
        }
        let services = store.services_for_host(&host_id)?;
        Ok(Some(
            services.iter().map(service_record).collect::<Vec<_>>(),
        ))
    })
    .await?
    .ok_or(ApiError::NotFound("host"))?;

    Ok(HttpResponse::Ok().json(json!({ "records": records })))
}

#[derive(Debug, Deserialize)]
pub struct EventsListQuery {
    pub hostid: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn events_list(
    store: web::Data<Store>,
    query: web::Query<EventsListQuery>,
) -> ApiResult<HttpResponse> {
    let EventsListQuery {
        hostid,
        limit,
        offset,
    } = query.into_inner();
    let store = store.get_ref().clone();

    let (total, rows) = run_blocking(move || {
        let total = store.events_count(&hostid)?;
        let rows = store.events_for_host(&hostid, limit.unwrap_or(25), offset.unwrap_or(0))?;
        Ok((total, rows))
    })
    .await?;

    let records: Vec<_> = rows.into_iter().map(event_record).collect();
    Ok(HttpResponse::Ok().json(json!({ "total": total, "records": records })))
}

pub async fn events_get(
    store: web::Data<Store>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let store = store.get_ref().clone();

    let row = run_blocking(move || store.event(id))
        .await?
        .ok_or(ApiError::NotFound("event"))?;

    Ok(HttpResponse::Ok().json(json!({ "record": event_record(row) })))
}

pub async fn admin_hosts(store: web::Data<Store>) -> ApiResult<HttpResponse> {
    let store = store.get_ref().clone();
    let records = run_blocking(move || {
        let summaries = store.hosts_summary()?;
        Ok(summaries
            .into_iter()
            .map(|summary| {
                json!({
                    "id": summary.host.id,
                    "hostname": summary.host.hostname,
                    "description": summary.host.description,
                    "lastreporttime": iso8601(summary.host.last_seen),
                    "created": iso8601(summary.host.created_at),
                })
            })
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "records": records })))
}

/// Host rows are created by ingestion; the admin surface cannot add or
/// delete them here.
pub async fn admin_unsupported() -> HttpResponse {
    HttpResponse::NotImplemented().json(json!({
        "error": "host administration is driven by agent reports"
    }))
}
