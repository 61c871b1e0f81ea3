//! Write path: snapshot persistence and the availability recorder.
//!
//! One accepted snapshot is one transaction: the host upsert, every service
//! upsert, the metric fan-out, filesystem wide rows, and in-band events
//! commit together or not at all. Metric rows are never updated and never
//! deduplicated; a replayed snapshot inserts its points again.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::domain::model::{
    AgentEvent, FilesystemDetail, ServiceDetail, ServiceRecord, Snapshot,
};
use crate::domain::status::{Availability, DEFAULT_POLL_INTERVAL_SECS};

use super::{Store, StoreError};

impl Store {
    /// Persist one accepted snapshot atomically.
    pub fn persist_snapshot(
        &self,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        upsert_host(&tx, snapshot, now)?;
        for service in &snapshot.services {
            upsert_service(&tx, &snapshot.host.id, service, now)?;
            append_service_metrics(&tx, &snapshot.host.id, service)?;
        }
        for event in &snapshot.events {
            append_event(&tx, &snapshot.host.id, event, now)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Append one availability sample for every known host, derived from the
    /// gap between `now` and the host's `last_seen`. Never touches
    /// `last_seen` itself, so silent hosts keep producing a complete series.
    pub fn record_availability_for_all(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare("SELECT id, poll_interval, last_seen FROM hosts")?;
            let hosts = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;
            for host in hosts {
                let (host_id, poll_interval, last_seen) = host?;
                let gap = now.timestamp() - last_seen;
                let level = Availability::classify(gap, poll_interval);
                append_metric(
                    &tx,
                    &host_id,
                    "",
                    "availability",
                    "status",
                    level.sample_value(),
                    now.timestamp() as f64,
                )?;
                written += 1;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Update the free-form note for a host. Returns false for an unknown id.
    pub fn set_host_description(
        &self,
        host_id: &str,
        description: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE hosts SET description = ?2 WHERE id = ?1",
            params![host_id, description],
        )?;
        Ok(changed > 0)
    }
}

/// Insert-or-update by id. The conflict branch never assigns `created_at`,
/// which is what preserves it across upserts. `INSERT OR REPLACE` is
/// deliberately not used here: with foreign keys on, the implied delete
/// would cascade away the host's services, metrics and events.
fn upsert_host(conn: &Connection, snapshot: &Snapshot, now: DateTime<Utc>) -> Result<(), StoreError> {
    let host = &snapshot.host;
    let platform = snapshot.platform.clone().unwrap_or_default();
    let control = host.control.clone();
    let (address, port, ssl, username, password) = match control {
        Some(c) => (c.address, i64::from(c.port), i64::from(c.ssl), c.username, c.password),
        None => (String::new(), 0, 0, String::new(), String::new()),
    };

    conn.execute(
        "INSERT INTO hosts (
            id, hostname, version, incarnation,
            httpd_address, httpd_port, httpd_ssl, httpd_username, httpd_password,
            poll_interval,
            platform_name, platform_release, platform_version, platform_machine,
            platform_cpu, platform_memory, platform_swap, boot_time, uptime,
            last_seen, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21
        )
        ON CONFLICT(id) DO UPDATE SET
            hostname = excluded.hostname,
            version = excluded.version,
            incarnation = excluded.incarnation,
            httpd_address = excluded.httpd_address,
            httpd_port = excluded.httpd_port,
            httpd_ssl = excluded.httpd_ssl,
            httpd_username = excluded.httpd_username,
            httpd_password = excluded.httpd_password,
            poll_interval = excluded.poll_interval,
            platform_name = excluded.platform_name,
            platform_release = excluded.platform_release,
            platform_version = excluded.platform_version,
            platform_machine = excluded.platform_machine,
            platform_cpu = excluded.platform_cpu,
            platform_memory = excluded.platform_memory,
            platform_swap = excluded.platform_swap,
            boot_time = excluded.boot_time,
            uptime = excluded.uptime,
            last_seen = excluded.last_seen",
        params![
            host.id,
            host.hostname,
            host.version,
            host.incarnation,
            address,
            port,
            ssl,
            username,
            password,
            host.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            platform.name,
            platform.release,
            platform.version,
            platform.machine,
            platform.cpu_count.unwrap_or(0),
            platform.memory_bytes.unwrap_or(0),
            platform.swap_bytes.unwrap_or(0),
            platform.boot_time.unwrap_or(0),
            host.uptime.unwrap_or(0),
            now.timestamp(),
            now.timestamp(),
        ],
    )?;
    Ok(())
}

fn upsert_service(
    conn: &Connection,
    host_id: &str,
    service: &ServiceRecord,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let (pid, cpu_percent, memory_percent, memory_kilobyte) = match &service.detail {
        ServiceDetail::Process(process) => (
            process.pid,
            process.cpu.and_then(|c| c.percent),
            process.memory.and_then(|m| m.percent),
            process.memory.and_then(|m| m.kilobyte),
        ),
        _ => (None, None, None, None),
    };

    conn.execute(
        "INSERT INTO services (
            host_id, name, service_type, status, monitor,
            pid, cpu_percent, memory_percent, memory_kilobyte,
            collected_at, last_seen
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(host_id, name) DO UPDATE SET
            service_type = excluded.service_type,
            status = excluded.status,
            monitor = excluded.monitor,
            pid = excluded.pid,
            cpu_percent = excluded.cpu_percent,
            memory_percent = excluded.memory_percent,
            memory_kilobyte = excluded.memory_kilobyte,
            collected_at = excluded.collected_at,
            last_seen = excluded.last_seen",
        params![
            host_id,
            service.name,
            service.kind.as_wire(),
            service.status,
            service.monitor,
            pid,
            cpu_percent,
            memory_percent,
            memory_kilobyte,
            service.collected_at,
            now.timestamp(),
        ],
    )?;
    Ok(())
}

/// Per-type metric fan-out. Only values the agent actually reported become
/// rows; an absent block contributes nothing.
fn append_service_metrics(
    conn: &Connection,
    host_id: &str,
    service: &ServiceRecord,
) -> Result<(), StoreError> {
    let at = service.collected_at;
    let name = service.name.as_str();

    match &service.detail {
        ServiceDetail::System(system) => {
            if let Some(load) = &system.load {
                append_present(conn, host_id, name, "load", "avg01", load.avg01, at)?;
                append_present(conn, host_id, name, "load", "avg05", load.avg05, at)?;
                append_present(conn, host_id, name, "load", "avg15", load.avg15, at)?;
            }
            if let Some(cpu) = &system.cpu {
                append_present(conn, host_id, name, "cpu", "user", cpu.user, at)?;
                append_present(conn, host_id, name, "cpu", "system", cpu.system, at)?;
                append_present(conn, host_id, name, "cpu", "nice", cpu.nice, at)?;
                append_present(conn, host_id, name, "cpu", "wait", cpu.wait, at)?;
            }
            if let Some(memory) = &system.memory {
                append_present(conn, host_id, name, "memory", "percent", memory.percent, at)?;
                append_present(
                    conn,
                    host_id,
                    name,
                    "memory",
                    "kilobyte",
                    memory.kilobyte.map(|v| v as f64),
                    at,
                )?;
            }
            if let Some(swap) = &system.swap {
                append_present(conn, host_id, name, "swap", "percent", swap.percent, at)?;
                append_present(
                    conn,
                    host_id,
                    name,
                    "swap",
                    "kilobyte",
                    swap.kilobyte.map(|v| v as f64),
                    at,
                )?;
            }
        }
        ServiceDetail::Process(process) => {
            if let Some(cpu) = &process.cpu {
                append_present(conn, host_id, name, "process_cpu", "percent", cpu.percent, at)?;
                append_present(
                    conn,
                    host_id,
                    name,
                    "process_cpu",
                    "total_percent",
                    cpu.percent_total,
                    at,
                )?;
            }
            if let Some(memory) = &process.memory {
                append_present(
                    conn,
                    host_id,
                    name,
                    "process_memory",
                    "percent",
                    memory.percent,
                    at,
                )?;
                append_present(
                    conn,
                    host_id,
                    name,
                    "process_memory",
                    "total_percent",
                    memory.percent_total,
                    at,
                )?;
                append_present(
                    conn,
                    host_id,
                    name,
                    "process_memory",
                    "kilobyte",
                    memory.kilobyte.map(|v| v as f64),
                    at,
                )?;
            }
        }
        ServiceDetail::Filesystem(filesystem) => {
            append_filesystem_metric(conn, host_id, name, filesystem, at)?;
        }
        ServiceDetail::Remote(remote) => {
            if let Some(icmp) = &remote.icmp {
                append_present(
                    conn,
                    host_id,
                    name,
                    "icmp",
                    "responsetime",
                    icmp.response_time,
                    at,
                )?;
            }
            for port in &remote.ports {
                append_present(
                    conn,
                    host_id,
                    name,
                    "port",
                    "responsetime",
                    port.response_time,
                    at,
                )?;
            }
            for socket in &remote.unix_sockets {
                append_present(
                    conn,
                    host_id,
                    name,
                    "unix",
                    "responsetime",
                    socket.response_time,
                    at,
                )?;
            }
        }
        ServiceDetail::Network(network) => {
            append_present(
                conn,
                host_id,
                name,
                "link",
                "speed",
                network.speed.map(|v| v as f64),
                at,
            )?;
            append_present(
                conn,
                host_id,
                name,
                "link",
                "download_bytes",
                network.download.and_then(|d| d.bytes_now).map(|v| v as f64),
                at,
            )?;
            append_present(
                conn,
                host_id,
                name,
                "link",
                "upload_bytes",
                network.upload.and_then(|u| u.bytes_now).map(|v| v as f64),
                at,
            )?;
        }
        ServiceDetail::Directory(_)
        | ServiceDetail::File(_)
        | ServiceDetail::Fifo
        | ServiceDetail::Program(_) => {}
    }
    Ok(())
}

/// Append only when the agent reported the value at all.
fn append_present(
    conn: &Connection,
    host_id: &str,
    service_name: &str,
    metric_type: &str,
    metric_name: &str,
    value: Option<f64>,
    collected_at: f64,
) -> Result<(), StoreError> {
    match value {
        Some(value) => append_metric(
            conn,
            host_id,
            service_name,
            metric_type,
            metric_name,
            value,
            collected_at,
        ),
        None => Ok(()),
    }
}

fn append_metric(
    conn: &Connection,
    host_id: &str,
    service_name: &str,
    metric_type: &str,
    metric_name: &str,
    value: f64,
    collected_at: f64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO metrics (host_id, service_name, metric_type, metric_name, value, collected_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![host_id, service_name, metric_type, metric_name, value, collected_at],
    )?;
    Ok(())
}

fn append_filesystem_metric(
    conn: &Connection,
    host_id: &str,
    service_name: &str,
    filesystem: &FilesystemDetail,
    collected_at: f64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO filesystem_metrics (
            host_id, service_name, mode, uid, gid,
            block_percent, block_usage, block_total,
            inode_percent, inode_usage, inode_total,
            read_bytes, read_ops, write_bytes, write_ops, collected_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            host_id,
            service_name,
            filesystem.mode,
            filesystem.uid,
            filesystem.gid,
            filesystem.block.and_then(|b| b.percent),
            filesystem.block.and_then(|b| b.usage),
            filesystem.block.and_then(|b| b.total),
            filesystem.inode.and_then(|i| i.percent),
            filesystem.inode.and_then(|i| i.usage),
            filesystem.inode.and_then(|i| i.total),
            filesystem.read.and_then(|r| r.bytes_total),
            filesystem.read.and_then(|r| r.operations_total),
            filesystem.write.and_then(|w| w.bytes_total),
            filesystem.write.and_then(|w| w.operations_total),
            collected_at,
        ],
    )?;
    Ok(())
}

/// Events arrive in-band with their own collection instant; fall back to the
/// ingestion clock when the agent sent none.
fn append_event(
    conn: &Connection,
    host_id: &str,
    event: &AgentEvent,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let created_at = if event.collected_at > 0.0 {
        event.collected_at as i64
    } else {
        now.timestamp()
    };
    conn.execute(
        "INSERT INTO events (host_id, service_name, event_type, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![host_id, event.service, event.kind, event.message, created_at],
    )?;
    Ok(())
}
