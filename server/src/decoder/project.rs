//! Type-dispatched projection from staging records to the domain model.
//!
//! Classification is by the `<type>` element alone: leaves that only make
//! sense for another service type are dropped, never misrouted.

use crate::domain::model::{
    AgentEvent, Checksum, ControlTarget, DirectoryDetail, FileDetail, FilesystemDetail, HostInfo,
    IcmpProbe, IoCounters, LinkCounters, LoadAverages, NetworkDetail, Platform, PortProbe,
    ProcessCpu, ProcessDetail, ProcessMemory, ProgramDetail, RemoteDetail, ServiceDetail,
    ServiceKind, ServiceRecord, Snapshot, StorageUsage, SystemCpu, SystemDetail, SystemMemory,
    Timestamps, UnixProbe,
};

use super::staging::{
    ChecksumStaging, EventStaging, IoStaging, LinkDirectionStaging, LinkStaging, MonitStaging,
    ServiceStaging, SystemStaging, TimestampsStaging,
};
use super::DecodeError;

/// Combine the split second/microsecond pair into one timestamp.
pub fn collected_time(sec: i64, usec: i64) -> f64 {
    sec as f64 + usec as f64 / 1_000_000.0
}

pub(crate) fn snapshot(staging: MonitStaging) -> Result<Snapshot, DecodeError> {
    let server = staging.server.unwrap_or_default();

    let hostname = server
        .localhostname
        .filter(|name| !name.is_empty())
        .ok_or(DecodeError::MissingRoot {
            element: "server/localhostname",
        })?;

    let incarnation = server.incarnation.or(staging.incarnation).unwrap_or(0);
    let version = server
        .version
        .or(staging.version)
        .unwrap_or_default();
    let agent_id = server.id.or(staging.id);
    let id = HostInfo::effective_id(agent_id.as_deref(), &hostname, incarnation);

    let control = server.httpd.and_then(|httpd| {
        let address = httpd.address.filter(|a| !a.is_empty())?;
        let port = httpd.port?;
        let credentials = server.credentials.unwrap_or_default();
        Some(ControlTarget {
            address,
            port,
            ssl: httpd.ssl.unwrap_or(0) != 0,
            username: credentials.username.unwrap_or_default(),
            password: credentials.password.unwrap_or_default(),
        })
    });

    let host = HostInfo {
        id,
        hostname,
        version,
        incarnation,
        uptime: server.uptime,
        poll_interval: server.poll,
        control,
    };

    let platform = staging.platform.map(|p| Platform {
        name: p.name.unwrap_or_default(),
        release: p.release.unwrap_or_default(),
        version: p.version.unwrap_or_default(),
        machine: p.machine.unwrap_or_default(),
        cpu_count: p.cpu,
        memory_bytes: p.memory,
        swap_bytes: p.swap,
        boot_time: p.boottime,
    });

    let services = staging
        .services
        .map(|wrapper| wrapper.service)
        .unwrap_or_default()
        .into_iter()
        .map(service)
        .collect::<Result<Vec<_>, _>>()?;

    let events = staging.events.into_iter().map(event).collect();

    Ok(Snapshot {
        host,
        platform,
        services,
        events,
    })
}

fn service(staging: ServiceStaging) -> Result<ServiceRecord, DecodeError> {
    let name = staging
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or(DecodeError::MissingElement {
            service: String::new(),
            element: "service@name",
        })?;

    let wire_kind = staging.kind.ok_or_else(|| DecodeError::MissingElement {
        service: name.clone(),
        element: "type",
    })?;
    let kind = ServiceKind::from_wire(wire_kind).ok_or_else(|| DecodeError::UnknownServiceType {
        service: name.clone(),
        value: wire_kind,
    })?;

    let collected_sec = staging
        .collected_sec
        .ok_or_else(|| DecodeError::MissingElement {
            service: name.clone(),
            element: "collected_sec",
        })?;
    let collected_at = collected_time(collected_sec, staging.collected_usec.unwrap_or(0));

    let status = staging.status.unwrap_or(0);
    let monitor = staging.monitor.unwrap_or(0);
    let detail = detail_for(kind, staging);

    Ok(ServiceRecord {
        name,
        kind,
        status,
        monitor,
        collected_at,
        detail,
    })
}

/// Route the overloaded leaves into the variant the `<type>` selects.
fn detail_for(kind: ServiceKind, staging: ServiceStaging) -> ServiceDetail {
    match kind {
        ServiceKind::Filesystem => ServiceDetail::Filesystem(FilesystemDetail {
            mode: staging.mode,
            uid: staging.uid,
            gid: staging.gid,
            fstype: staging.fstype,
            fsflags: staging.fsflags,
            block: staging.block.map(|b| StorageUsage {
                percent: b.percent,
                usage: b.usage,
                total: b.total,
            }),
            inode: staging.inode.map(|i| StorageUsage {
                percent: i.percent,
                usage: i.usage,
                total: i.total,
            }),
            read: staging.read.map(io_counters),
            write: staging.write.map(io_counters),
        }),
        ServiceKind::Directory => ServiceDetail::Directory(DirectoryDetail {
            mode: staging.mode,
            uid: staging.uid,
            gid: staging.gid,
            timestamps: staging.timestamps.map(timestamps),
        }),
        ServiceKind::File => ServiceDetail::File(FileDetail {
            mode: staging.mode,
            uid: staging.uid,
            gid: staging.gid,
            size: staging.size,
            hardlink: staging.hardlink,
            timestamps: staging.timestamps.map(timestamps),
            checksum: staging.checksum.and_then(checksum),
        }),
        ServiceKind::Process => ServiceDetail::Process(ProcessDetail {
            pid: staging.pid,
            ppid: staging.ppid,
            uid: staging.uid,
            euid: staging.euid,
            gid: staging.gid,
            uptime: staging.uptime,
            boot_time: staging.boottime,
            threads: staging.threads,
            children: staging.children,
            memory: staging.memory.map(|m| ProcessMemory {
                percent: m.percent,
                percent_total: m.percenttotal,
                kilobyte: m.kilobyte,
                kilobyte_total: m.kilobytetotal,
            }),
            cpu: staging.cpu.map(|c| ProcessCpu {
                percent: c.percent,
                percent_total: c.percenttotal,
            }),
        }),
        ServiceKind::Remote => ServiceDetail::Remote(RemoteDetail {
            icmp: staging.icmp.map(|i| IcmpProbe {
                probe_type: i.probe_type,
                response_time: i.responsetime,
            }),
            ports: staging
                .ports
                .into_iter()
                .map(|p| PortProbe {
                    hostname: p.hostname,
                    port: p.portnumber,
                    protocol: p.protocol,
                    probe_type: p.probe_type,
                    response_time: p.responsetime,
                })
                .collect(),
            unix_sockets: staging
                .unix_sockets
                .into_iter()
                .map(|u| UnixProbe {
                    path: u.path,
                    protocol: u.protocol,
                    response_time: u.responsetime,
                })
                .collect(),
        }),
        ServiceKind::System => ServiceDetail::System(
            staging.system.map(system).unwrap_or_default(),
        ),
        ServiceKind::Fifo => ServiceDetail::Fifo,
        ServiceKind::Program => ServiceDetail::Program(
            staging
                .program
                .map(|p| ProgramDetail {
                    started: p.started,
                    exit_status: p.status,
                    output: p.output,
                })
                .unwrap_or_default(),
        ),
        ServiceKind::Network => ServiceDetail::Network(
            staging.link.map(network).unwrap_or_default(),
        ),
    }
}

fn io_counters(io: IoStaging) -> IoCounters {
    IoCounters {
        bytes_total: io.bytes.and_then(|b| b.total),
        operations_total: io.operations.and_then(|o| o.total),
    }
}

fn timestamps(t: TimestampsStaging) -> Timestamps {
    Timestamps {
        access: t.access,
        change: t.change,
        modify: t.modify,
    }
}

fn checksum(c: ChecksumStaging) -> Option<Checksum> {
    c.value.map(|value| Checksum {
        algorithm: c.algorithm,
        value,
    })
}

fn system(s: SystemStaging) -> SystemDetail {
    SystemDetail {
        load: s.load.map(|l| LoadAverages {
            avg01: l.avg01,
            avg05: l.avg05,
            avg15: l.avg15,
        }),
        cpu: s.cpu.map(|c| SystemCpu {
            user: c.user,
            system: c.system,
            nice: c.nice,
            wait: c.wait,
        }),
        memory: s.memory.map(|m| SystemMemory {
            percent: m.percent,
            kilobyte: m.kilobyte,
        }),
        swap: s.swap.map(|m| SystemMemory {
            percent: m.percent,
            kilobyte: m.kilobyte,
        }),
    }
}

fn network(link: LinkStaging) -> NetworkDetail {
    NetworkDetail {
        state: link.state,
        speed: link.speed,
        duplex: link.duplex,
        download: link.download.map(link_counters),
        upload: link.upload.map(link_counters),
    }
}

fn link_counters(direction: LinkDirectionStaging) -> LinkCounters {
    LinkCounters {
        bytes_now: direction.bytes.as_ref().and_then(|b| b.now),
        bytes_total: direction.bytes.as_ref().and_then(|b| b.total),
        packets_now: direction.packets.as_ref().and_then(|p| p.now),
        packets_total: direction.packets.as_ref().and_then(|p| p.total),
        errors_now: direction.errors.as_ref().and_then(|e| e.now),
        errors_total: direction.errors.as_ref().and_then(|e| e.total),
    }
}

fn event(staging: EventStaging) -> AgentEvent {
    AgentEvent {
        service: staging.service.unwrap_or_default(),
        kind: staging.id.unwrap_or(0),
        message: staging.message.unwrap_or_default(),
        collected_at: collected_time(
            staging.collected_sec.unwrap_or(0),
            staging.collected_usec.unwrap_or(0),
        ),
    }
}
