//! Read path: summaries, ranges, and latest-value derivations.

use rusqlite::{OptionalExtension, Row, params};

use crate::domain::model::ControlTarget;
use crate::domain::status::ServiceCounts;

use super::{Store, StoreError};

/// Events page size ceiling for every query surface.
pub const MAX_EVENT_ROWS: i64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct HostRow {
    pub id: String,
    pub hostname: String,
    pub version: String,
    pub incarnation: i64,
    pub description: String,
    pub poll_interval: i64,
    pub platform_name: String,
    pub platform_release: String,
    pub platform_version: String,
    pub platform_machine: String,
    pub platform_cpu: i64,
    pub platform_memory: i64,
    pub platform_swap: i64,
    pub boot_time: i64,
    pub uptime: i64,
    pub last_seen: i64,
    pub created_at: i64,
}

/// A host plus its service tallies, as the overview needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSummary {
    pub host: HostRow,
    pub counts: ServiceCounts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRow {
    pub host_id: String,
    pub name: String,
    pub service_type: i64,
    pub status: i64,
    pub monitor: i64,
    pub pid: Option<i64>,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub memory_kilobyte: Option<i64>,
    pub collected_at: f64,
    pub last_seen: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub id: i64,
    pub host_id: String,
    pub service_name: String,
    pub event_type: i64,
    pub message: String,
    pub created_at: i64,
}

/// One time-series sample, keyed for grouping by (metric_type, metric_name).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub metric_type: String,
    pub metric_name: String,
    pub value: f64,
    pub collected_at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilesystemMetricRow {
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
    pub collected_at: f64,
}

const HOST_COLUMNS: &str = "id, hostname, version, incarnation, description, poll_interval, \
    platform_name, platform_release, platform_version, platform_machine, \
    platform_cpu, platform_memory, platform_swap, boot_time, uptime, last_seen, created_at";

fn host_from_row(row: &Row<'_>) -> Result<HostRow, rusqlite::Error> {
    Ok(HostRow {
        id: row.get(0)?,
        hostname: row.get(1)?,
        version: row.get(2)?,
        incarnation: row.get(3)?,
        description: row.get(4)?,
        poll_interval: row.get(5)?,
        platform_name: row.get(6)?,
        platform_release: row.get(7)?,
        platform_version: row.get(8)?,
        platform_machine: row.get(9)?,
        platform_cpu: row.get(10)?,
        platform_memory: row.get(11)?,
        platform_swap: row.get(12)?,
        boot_time: row.get(13)?,
        uptime: row.get(14)?,
        last_seen: row.get(15)?,
        created_at: row.get(16)?,
    })
}

fn service_from_row(row: &Row<'_>) -> Result<ServiceRow, rusqlite::Error> {
    Ok(ServiceRow {
        host_id: row.get(0)?,
        name: row.get(1)?,
        service_type: row.get(2)?,
        status: row.get(3)?,
        monitor: row.get(4)?,
        pid: row.get(5)?,
        cpu_percent: row.get(6)?,
        memory_percent: row.get(7)?,
        memory_kilobyte: row.get(8)?,
        collected_at: row.get(9)?,
        last_seen: row.get(10)?,
    })
}

const SERVICE_COLUMNS: &str = "host_id, name, service_type, status, monitor, pid, \
    cpu_percent, memory_percent, memory_kilobyte, collected_at, last_seen";

impl Store {
    pub fn host(&self, host_id: &str) -> Result<Option<HostRow>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {HOST_COLUMNS} FROM hosts WHERE id = ?1"),
                params![host_id],
                host_from_row,
            )
            .optional()?)
    }

    pub fn hostname(&self, host_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT hostname FROM hosts WHERE id = ?1",
                params![host_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Every known host with its service tallies, ordered by hostname.
    pub fn hosts_summary(&self) -> Result<Vec<HostSummary>, StoreError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {HOST_COLUMNS} FROM hosts ORDER BY hostname"
        ))?;
        let hosts = stmt
            .query_map([], host_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tally_stmt = conn.prepare(
            "SELECT host_id, COUNT(*),
                    COALESCE(SUM(status != 0), 0),
                    COALESCE(SUM(monitor != 1), 0)
             FROM services GROUP BY host_id",
        )?;
        let tallies = tally_stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    ServiceCounts {
                        total: row.get::<_, i64>(1)? as usize,
                        failed: row.get::<_, i64>(2)? as usize,
                        unmonitored: row.get::<_, i64>(3)? as usize,
                    },
                ))
            })?
            .collect::<Result<std::collections::HashMap<_, _>, _>>()?;

        Ok(hosts
            .into_iter()
            .map(|host| {
                let counts = tallies.get(&host.id).copied().unwrap_or_default();
                HostSummary { host, counts }
            })
            .collect())
    }

    pub fn services_for_host(&self, host_id: &str) -> Result<Vec<ServiceRow>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE host_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt
            .query_map(params![host_id], service_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn service(&self, host_id: &str, name: &str) -> Result<Option<ServiceRow>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE host_id = ?1 AND name = ?2"),
                params![host_id, name],
                service_from_row,
            )
            .optional()?)
    }

    /// Sum of the most recent user/system/nice/wait CPU samples, all taken
    /// from the same collection instant.
    pub fn latest_system_cpu_percent(&self, host_id: &str) -> Result<Option<f64>, StoreError> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT SUM(value) FROM metrics
             WHERE host_id = ?1 AND metric_type = 'cpu'
               AND metric_name IN ('user', 'system', 'nice', 'wait')
               AND collected_at = (
                   SELECT MAX(collected_at) FROM metrics
                   WHERE host_id = ?1 AND metric_type = 'cpu'
               )",
            params![host_id],
            |row| row.get(0),
        )?)
    }

    pub fn latest_system_memory_percent(&self, host_id: &str) -> Result<Option<f64>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT value FROM metrics
                 WHERE host_id = ?1 AND metric_type = 'memory' AND metric_name = 'percent'
                 ORDER BY collected_at DESC LIMIT 1",
                params![host_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Newest first. The page size is capped at [`MAX_EVENT_ROWS`].
    pub fn events_for_host(
        &self,
        host_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventRow>, StoreError> {
        let conn = self.conn()?;
        let limit = limit.clamp(1, MAX_EVENT_ROWS);
        let mut stmt = conn.prepare(
            "SELECT id, host_id, service_name, event_type, message, created_at
             FROM events WHERE host_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![host_id, limit, offset.max(0)], |row| {
                Ok(EventRow {
                    id: row.get(0)?,
                    host_id: row.get(1)?,
                    service_name: row.get(2)?,
                    event_type: row.get(3)?,
                    message: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn events_count(&self, host_id: &str) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM events WHERE host_id = ?1",
            params![host_id],
            |row| row.get(0),
        )?)
    }

    pub fn event(&self, id: i64) -> Result<Option<EventRow>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, host_id, service_name, event_type, message, created_at
                 FROM events WHERE id = ?1",
                params![id],
                |row| {
                    Ok(EventRow {
                        id: row.get(0)?,
                        host_id: row.get(1)?,
                        service_name: row.get(2)?,
                        event_type: row.get(3)?,
                        message: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    /// All samples for one service in `[t0, t1]`, ascending; callers group by
    /// (metric_type, metric_name).
    pub fn metrics_range(
        &self,
        host_id: &str,
        service_name: &str,
        t0: f64,
        t1: f64,
    ) -> Result<Vec<MetricPoint>, StoreError> {
        self.points(
            "SELECT metric_type, metric_name, value, collected_at FROM metrics
             WHERE host_id = ?1 AND service_name = ?2
               AND collected_at >= ?3 AND collected_at <= ?4
             ORDER BY collected_at ASC",
            params![host_id, service_name, t0, t1],
        )
    }

    /// Heartbeat-written availability samples for one host.
    pub fn availability_range(
        &self,
        host_id: &str,
        t0: f64,
        t1: f64,
    ) -> Result<Vec<MetricPoint>, StoreError> {
        self.points(
            "SELECT metric_type, metric_name, value, collected_at FROM metrics
             WHERE host_id = ?1 AND service_name = '' AND metric_type = 'availability'
               AND collected_at >= ?2 AND collected_at <= ?3
             ORDER BY collected_at ASC",
            params![host_id, t0, t1],
        )
    }

    /// ICMP/port probe response times for one remote-host service, in
    /// seconds as persisted; the API layer converts to milliseconds.
    pub fn remote_metrics_range(
        &self,
        host_id: &str,
        service_name: &str,
        t0: f64,
        t1: f64,
    ) -> Result<Vec<MetricPoint>, StoreError> {
        self.points(
            "SELECT metric_type, metric_name, value, collected_at FROM metrics
             WHERE host_id = ?1 AND service_name = ?2
               AND metric_type IN ('icmp', 'port', 'unix')
               AND collected_at >= ?3 AND collected_at <= ?4
             ORDER BY collected_at ASC",
            params![host_id, service_name, t0, t1],
        )
    }

    fn points(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<MetricPoint>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok(MetricPoint {
                    metric_type: row.get(0)?,
                    metric_name: row.get(1)?,
                    value: row.get(2)?,
                    collected_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Latest filesystem wide row for a service detail page.
    pub fn latest_filesystem_metric(
        &self,
        host_id: &str,
        service_name: &str,
    ) -> Result<Option<FilesystemMetricRow>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT mode, uid, gid, block_percent, block_usage, block_total,
                        inode_percent, inode_usage, inode_total,
                        read_bytes, read_ops, write_bytes, write_ops, collected_at
                 FROM filesystem_metrics
                 WHERE host_id = ?1 AND service_name = ?2
                 ORDER BY collected_at DESC LIMIT 1",
                params![host_id, service_name],
                |row| {
                    Ok(FilesystemMetricRow {
                        mode: row.get(0)?,
                        uid: row.get(1)?,
                        gid: row.get(2)?,
                        block_percent: row.get(3)?,
                        block_usage: row.get(4)?,
                        block_total: row.get(5)?,
                        inode_percent: row.get(6)?,
                        inode_usage: row.get(7)?,
                        inode_total: row.get(8)?,
                        read_bytes: row.get(9)?,
                        read_ops: row.get(10)?,
                        write_bytes: row.get(11)?,
                        write_ops: row.get(12)?,
                        collected_at: row.get(13)?,
                    })
                },
            )
            .optional()?)
    }

    /// Control reachability and credentials for the action proxy. `None`
    /// when the host is unknown or never advertised a control interface.
    pub fn control_target(&self, host_id: &str) -> Result<Option<ControlTarget>, StoreError> {
        let conn = self.conn()?;
        let target = conn
            .query_row(
                "SELECT httpd_address, httpd_port, httpd_ssl, httpd_username, httpd_password
                 FROM hosts WHERE id = ?1",
                params![host_id],
                |row| {
                    Ok(ControlTarget {
                        address: row.get(0)?,
                        port: row.get::<_, i64>(1)? as u16,
                        ssl: row.get::<_, i64>(2)? != 0,
                        username: row.get(3)?,
                        password: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(target.filter(|t| !t.address.is_empty() && t.port != 0))
    }
}
