//! Permissive staging records for the agent XML.
//!
//! The wire format reuses the same leaf tags (`mode`, `uid`, `gid`, `size`,
//! `hardlink`) across service types with different meanings, so this stage
//! declares every possibly-overloaded leaf as optional and defers all
//! interpretation to the projection stage.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MonitStaging {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@incarnation")]
    pub incarnation: Option<i64>,
    #[serde(rename = "@version")]
    pub version: Option<String>,
    pub server: Option<ServerStaging>,
    pub platform: Option<PlatformStaging>,
    pub services: Option<ServicesStaging>,
    #[serde(default, rename = "event")]
    pub events: Vec<EventStaging>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ServerStaging {
    pub id: Option<String>,
    pub incarnation: Option<i64>,
    pub version: Option<String>,
    pub uptime: Option<i64>,
    pub poll: Option<i64>,
    pub localhostname: Option<String>,
    pub httpd: Option<HttpdStaging>,
    pub credentials: Option<CredentialsStaging>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HttpdStaging {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CredentialsStaging {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlatformStaging {
    pub name: Option<String>,
    pub release: Option<String>,
    pub version: Option<String>,
    pub machine: Option<String>,
    pub cpu: Option<i64>,
    pub memory: Option<i64>,
    pub swap: Option<i64>,
    pub boottime: Option<i64>,
}

/// `<services>` wrapper; the wire order of its children is preserved.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ServicesStaging {
    #[serde(default, rename = "service")]
    pub service: Vec<ServiceStaging>,
}

/// Flat staging record for one `<service>`. Every overloaded leaf is
/// optional; nothing here knows which service type it belongs to yet.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ServiceStaging {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<i64>,
    pub collected_sec: Option<i64>,
    pub collected_usec: Option<i64>,
    pub status: Option<i64>,
    pub monitor: Option<i64>,

    // Overloaded leaves: mount for filesystems, inode for files, owner for
    // processes. Routed by the projection stage only.
    pub mode: Option<i64>,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub size: Option<i64>,
    pub hardlink: Option<i64>,

    pub timestamps: Option<TimestampsStaging>,
    pub checksum: Option<ChecksumStaging>,

    // Filesystem composites.
    pub fstype: Option<String>,
    pub fsflags: Option<String>,
    pub block: Option<StorageStaging>,
    pub inode: Option<StorageStaging>,
    pub read: Option<IoStaging>,
    pub write: Option<IoStaging>,

    // Process leaves and composites.
    pub pid: Option<i64>,
    pub ppid: Option<i64>,
    pub euid: Option<i64>,
    pub uptime: Option<i64>,
    pub boottime: Option<i64>,
    pub threads: Option<i64>,
    pub children: Option<i64>,
    pub memory: Option<MemoryStaging>,
    pub cpu: Option<CpuStaging>,

    // Whole-host composite for the system service.
    pub system: Option<SystemStaging>,

    // Remote-host probes; ports and sockets may repeat.
    pub icmp: Option<IcmpStaging>,
    #[serde(default, rename = "port")]
    pub ports: Vec<PortStaging>,
    #[serde(default, rename = "unix")]
    pub unix_sockets: Vec<UnixStaging>,

    pub program: Option<ProgramStaging>,
    pub link: Option<LinkStaging>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TimestampsStaging {
    pub access: Option<f64>,
    pub change: Option<f64>,
    pub modify: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChecksumStaging {
    #[serde(rename = "@type")]
    pub algorithm: Option<String>,
    #[serde(rename = "$text")]
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StorageStaging {
    pub percent: Option<f64>,
    pub usage: Option<f64>,
    pub total: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IoStaging {
    pub bytes: Option<CountTotalStaging>,
    pub operations: Option<CountTotalStaging>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CountTotalStaging {
    pub count: Option<i64>,
    pub total: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MemoryStaging {
    pub percent: Option<f64>,
    pub percenttotal: Option<f64>,
    pub kilobyte: Option<i64>,
    pub kilobytetotal: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CpuStaging {
    pub percent: Option<f64>,
    pub percenttotal: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SystemStaging {
    pub load: Option<LoadStaging>,
    pub cpu: Option<SystemCpuStaging>,
    pub memory: Option<SystemMemoryStaging>,
    pub swap: Option<SystemMemoryStaging>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoadStaging {
    pub avg01: Option<f64>,
    pub avg05: Option<f64>,
    pub avg15: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SystemCpuStaging {
    pub user: Option<f64>,
    pub system: Option<f64>,
    pub nice: Option<f64>,
    pub wait: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SystemMemoryStaging {
    pub percent: Option<f64>,
    pub kilobyte: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IcmpStaging {
    #[serde(rename = "type")]
    pub probe_type: Option<String>,
    pub responsetime: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PortStaging {
    pub hostname: Option<String>,
    pub portnumber: Option<i64>,
    pub protocol: Option<String>,
    #[serde(rename = "type")]
    pub probe_type: Option<String>,
    pub responsetime: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UnixStaging {
    pub path: Option<String>,
    pub protocol: Option<String>,
    pub responsetime: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProgramStaging {
    pub started: Option<f64>,
    pub status: Option<i64>,
    pub output: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LinkStaging {
    pub state: Option<i64>,
    pub speed: Option<i64>,
    pub duplex: Option<i64>,
    pub download: Option<LinkDirectionStaging>,
    pub upload: Option<LinkDirectionStaging>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LinkDirectionStaging {
    pub packets: Option<NowTotalStaging>,
    pub bytes: Option<NowTotalStaging>,
    pub errors: Option<NowTotalStaging>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NowTotalStaging {
    pub now: Option<i64>,
    pub total: Option<i64>,
}

/// In-band state transition reported at the document root.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventStaging {
    pub collected_sec: Option<i64>,
    pub collected_usec: Option<i64>,
    pub service: Option<String>,
    pub id: Option<i64>,
    pub message: Option<String>,
}
