//! Internal status surface: the landing overview, host detail, and service
//! detail payloads that drive the dashboard.

use actix_web::web;
use chrono::Utc;
use serde::Serialize;

use crate::domain::events;
use crate::domain::model::ServiceKind;
use crate::domain::status::{
    self, STALE_AFTER, ServiceCounts,
};
use crate::outbound::persistence::{FilesystemMetricRow, ServiceRow, Store};

use super::error::{ApiError, ApiResult, run_blocking};
use super::{iso8601, iso8601_collected};

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub generated_at: String,
    pub hosts: Vec<OverviewHost>,
}

#[derive(Debug, Serialize)]
pub struct OverviewHost {
    pub host_id: String,
    pub hostname: String,
    pub color: &'static str,
    pub description: String,
    pub status: u8,
    pub services: usize,
    pub services_available: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
    pub last_seen: String,
}

#[derive(Debug, Serialize)]
pub struct HostDetailResponse {
    pub host_id: String,
    pub hostname: String,
    pub description: String,
    pub monit_version: String,
    pub incarnation: i64,
    pub uptime: i64,
    pub poll_interval: i64,
    pub status: u8,
    pub color: &'static str,
    pub platform: PlatformDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlDto>,
    pub last_seen: String,
    pub created_at: String,
    pub services: Vec<ServiceDto>,
}

#[derive(Debug, Serialize)]
pub struct PlatformDto {
    pub name: String,
    pub release: String,
    pub version: String,
    pub machine: String,
    pub cpu: i64,
    pub memory: i64,
    pub swap: i64,
    pub boot_time: String,
}

/// Reachability of the agent's control interface; credentials never leave
/// the store through this surface.
#[derive(Debug, Serialize)]
pub struct ControlDto {
    pub address: String,
    pub port: u16,
    pub ssl: bool,
}

#[derive(Debug, Serialize)]
pub struct ServiceDto {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: i64,
    pub type_name: &'static str,
    pub status: i64,
    pub failed_checks: Vec<&'static str>,
    pub monitor: i64,
    pub collected_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_kilobyte: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ServiceDetailResponse {
    pub host_id: String,
    pub hostname: String,
    #[serde(flatten)]
    pub service: ServiceDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemDto>,
}

#[derive(Debug, Serialize)]
pub struct FilesystemDto {
    pub mode: Option<i64>,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub block_percent: Option<f64>,
    pub block_usage: Option<f64>,
    pub block_total: Option<f64>,
    pub inode_percent: Option<f64>,
    pub inode_usage: Option<f64>,
    pub inode_total: Option<f64>,
    pub read_bytes: Option<i64>,
    pub read_ops: Option<i64>,
    pub write_bytes: Option<i64>,
    pub write_ops: Option<i64>,
    pub collected_at: String,
}

pub(crate) fn service_dto(row: &ServiceRow) -> ServiceDto {
    ServiceDto {
        name: row.name.clone(),
        service_type: row.service_type,
        type_name: ServiceKind::from_wire(row.service_type)
            .map(ServiceKind::name)
            .unwrap_or("unknown"),
        status: row.status,
        failed_checks: events::failed_checks(row.status),
        monitor: row.monitor,
        collected_at: iso8601_collected(row.collected_at),
        pid: row.pid,
        cpu_percent: row.cpu_percent,
        memory_percent: row.memory_percent,
        memory_kilobyte: row.memory_kilobyte,
    }
}

pub(crate) fn is_stale(now_secs: i64, last_seen: i64) -> bool {
    now_secs - last_seen > STALE_AFTER.as_secs() as i64
}

pub async fn overview(store: web::Data<Store>) -> ApiResult<web::Json<OverviewResponse>> {
    let store = store.get_ref().clone();
    let now = Utc::now();

    let hosts = run_blocking(move || {
        let mut out = Vec::new();
        for summary in store.hosts_summary()? {
            let stale = is_stale(now.timestamp(), summary.host.last_seen);
            let gap = now.timestamp() - summary.host.last_seen;
            out.push(OverviewHost {
                host_id: summary.host.id.clone(),
                hostname: summary.host.hostname.clone(),
                color: status::overview_color(stale, summary.counts).name(),
                description: status::overview_description(stale, gap, summary.counts),
                status: status::wire_status(stale, summary.counts).code(),
                services: summary.counts.total,
                services_available: summary.counts.available(),
                cpu_percent: store.latest_system_cpu_percent(&summary.host.id)?,
                memory_percent: store.latest_system_memory_percent(&summary.host.id)?,
                last_seen: iso8601(summary.host.last_seen),
            });
        }
        Ok(out)
    })
    .await?;

    Ok(web::Json(OverviewResponse {
        generated_at: iso8601(now.timestamp()),
        hosts,
    }))
}

pub async fn host_detail(
    store: web::Data<Store>,
    path: web::Path<String>,
) -> ApiResult<web::Json<HostDetailResponse>> {
    let host_id = path.into_inner();
    let store = store.get_ref().clone();
    let now = Utc::now();

    let detail = run_blocking(move || {
        let Some(host) = store.host(&host_id)? else {
            return Ok(None);
        };
        let services = store.services_for_host(&host_id)?;
        let control = store.control_target(&host_id)?;

        let counts = ServiceCounts {
            total: services.len(),
            failed: services.iter().filter(|s| s.status != 0).count(),
            unmonitored: services.iter().filter(|s| s.monitor != 1).count(),
        };
        let stale = is_stale(now.timestamp(), host.last_seen);

        Ok(Some(HostDetailResponse {
            host_id: host.id.clone(),
            hostname: host.hostname.clone(),
            description: host.description.clone(),
            monit_version: host.version.clone(),
            incarnation: host.incarnation,
            uptime: host.uptime,
            poll_interval: host.poll_interval,
            status: status::wire_status(stale, counts).code(),
            color: status::overview_color(stale, counts).name(),
            platform: PlatformDto {
                name: host.platform_name.clone(),
                release: host.platform_release.clone(),
                version: host.platform_version.clone(),
                machine: host.platform_machine.clone(),
                cpu: host.platform_cpu,
                memory: host.platform_memory,
                swap: host.platform_swap,
                boot_time: iso8601(host.boot_time),
            },
            control: control.map(|target| ControlDto {
                address: target.address,
                port: target.port,
                ssl: target.ssl,
            }),
            last_seen: iso8601(host.last_seen),
            created_at: iso8601(host.created_at),
            services: services.iter().map(service_dto).collect(),
        }))
    })
    .await?;

    detail.map(web::Json).ok_or(ApiError::NotFound("host"))
}

pub async fn service_detail(
    store: web::Data<Store>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<ServiceDetailResponse>> {
    let (host_id, name) = path.into_inner();
    let store = store.get_ref().clone();

    let detail = run_blocking(move || {
        let Some(hostname) = store.hostname(&host_id)? else {
            return Ok(None);
        };
        let Some(service) = store.service(&host_id, &name)? else {
            return Ok(None);
        };
        let filesystem = if service.service_type == ServiceKind::Filesystem.as_wire() {
            store
                .latest_filesystem_metric(&host_id, &name)?
                .map(filesystem_dto)
        } else {
            None
        };
        Ok(Some(ServiceDetailResponse {
            host_id,
            hostname,
            service: service_dto(&service),
            filesystem,
        }))
    })
    .await?;

    detail.map(web::Json).ok_or(ApiError::NotFound("service"))
}

fn filesystem_dto(row: FilesystemMetricRow) -> FilesystemDto {
    FilesystemDto {
        mode: row.mode,
        uid: row.uid,
        gid: row.gid,
        block_percent: row.block_percent,
        block_usage: row.block_usage,
        block_total: row.block_total,
        inode_percent: row.inode_percent,
        inode_usage: row.inode_usage,
        inode_total: row.inode_total,
        read_bytes: row.read_bytes,
        read_ops: row.read_ops,
        write_bytes: row.write_bytes,
        write_ops: row.write_ops,
        collected_at: iso8601_collected(row.collected_at),
    }
}
