//! Typed view of one agent snapshot.
//!
//! Everything the wire format reports optionally is an `Option` here: the
//! store and the query surface must be able to tell "not reported" apart
//! from "reported as zero".

/// One decoded agent snapshot: the reporting host, its platform, the ordered
/// service list, and any in-band state-transition events.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub host: HostInfo,
    pub platform: Option<Platform>,
    pub services: Vec<ServiceRecord>,
    pub events: Vec<AgentEvent>,
}

/// Identity and reachability of the reporting agent.
#[derive(Debug, Clone, PartialEq)]
pub struct HostInfo {
    /// Stable host id. Agent-supplied, or derived as
    /// `<hostname>-<incarnation>` when the agent does not send one.
    pub id: String,
    pub hostname: String,
    pub version: String,
    /// Agent start time; a restart produces a new incarnation.
    pub incarnation: i64,
    /// Seconds the agent has been running, when reported.
    pub uptime: Option<i64>,
    /// Agent's configured snapshot cadence in seconds.
    pub poll_interval: Option<i64>,
    /// The agent's own HTTP control interface, when it exposes one.
    pub control: Option<ControlTarget>,
}

impl HostInfo {
    /// The id used for persistence: the agent's id when present and
    /// non-empty, else the deterministic hostname/incarnation fallback.
    pub fn effective_id(agent_id: Option<&str>, hostname: &str, incarnation: i64) -> String {
        match agent_id {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => format!("{hostname}-{incarnation}"),
        }
    }
}

/// Where and how to reach an agent's control interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlTarget {
    pub address: String,
    pub port: u16,
    pub ssl: bool,
    pub username: String,
    pub password: String,
}

impl ControlTarget {
    /// Base URL of the agent's HTTP interface.
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.address, self.port)
    }
}

/// Host platform description as reported by the agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Platform {
    pub name: String,
    pub release: String,
    pub version: String,
    pub machine: String,
    pub cpu_count: Option<i64>,
    pub memory_bytes: Option<i64>,
    pub swap_bytes: Option<i64>,
    pub boot_time: Option<i64>,
}

/// The nine service categories a Monit agent reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Filesystem,
    Directory,
    File,
    Process,
    Remote,
    System,
    Fifo,
    Program,
    Network,
}

impl ServiceKind {
    /// Map the wire integer to a kind. Unknown numbers are a decode error
    /// handled by the caller.
    pub fn from_wire(value: i64) -> Option<Self> {
        Some(match value {
            0 => Self::Filesystem,
            1 => Self::Directory,
            2 => Self::File,
            3 => Self::Process,
            4 => Self::Remote,
            5 => Self::System,
            6 => Self::Fifo,
            7 => Self::Program,
            8 => Self::Network,
            _ => return None,
        })
    }

    pub fn as_wire(self) -> i64 {
        match self {
            Self::Filesystem => 0,
            Self::Directory => 1,
            Self::File => 2,
            Self::Process => 3,
            Self::Remote => 4,
            Self::System => 5,
            Self::Fifo => 6,
            Self::Program => 7,
            Self::Network => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Directory => "directory",
            Self::File => "file",
            Self::Process => "process",
            Self::Remote => "remote",
            Self::System => "system",
            Self::Fifo => "fifo",
            Self::Program => "program",
            Self::Network => "network",
        }
    }
}

/// One service inside a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    pub name: String,
    pub kind: ServiceKind,
    /// Zero means OK; non-zero is a bitset of failed checks.
    pub status: i64,
    /// 0 = off, 1 = on, 2 = initialising.
    pub monitor: i64,
    /// Collection instant, seconds with sub-second precision.
    pub collected_at: f64,
    pub detail: ServiceDetail,
}

/// Type-specific payload. The wire format reuses leaf tags across service
/// types; after projection every value lives only under the variant it
/// belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceDetail {
    Filesystem(FilesystemDetail),
    Directory(DirectoryDetail),
    File(FileDetail),
    Process(ProcessDetail),
    Remote(RemoteDetail),
    System(SystemDetail),
    Fifo,
    Program(ProgramDetail),
    Network(NetworkDetail),
}

/// Mount description plus usage counters for a filesystem service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilesystemDetail {
    pub mode: Option<i64>,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub fstype: Option<String>,
    pub fsflags: Option<String>,
    pub block: Option<StorageUsage>,
    pub inode: Option<StorageUsage>,
    pub read: Option<IoCounters>,
    pub write: Option<IoCounters>,
}

/// Percent / used / total triple for blocks or inodes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StorageUsage {
    pub percent: Option<f64>,
    pub usage: Option<f64>,
    pub total: Option<f64>,
}

/// Cumulative I/O counters for one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IoCounters {
    pub bytes_total: Option<i64>,
    pub operations_total: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryDetail {
    pub mode: Option<i64>,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub timestamps: Option<Timestamps>,
}

/// Inode metadata for a file service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDetail {
    pub mode: Option<i64>,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub size: Option<i64>,
    pub hardlink: Option<i64>,
    pub timestamps: Option<Timestamps>,
    pub checksum: Option<Checksum>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timestamps {
    pub access: Option<f64>,
    pub change: Option<f64>,
    pub modify: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checksum {
    pub algorithm: Option<String>,
    pub value: String,
}

/// Runtime state of a supervised process. `uid`/`gid` here describe the
/// process owner, not an inode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessDetail {
    pub pid: Option<i64>,
    pub ppid: Option<i64>,
    pub uid: Option<i64>,
    pub euid: Option<i64>,
    pub gid: Option<i64>,
    pub uptime: Option<i64>,
    pub boot_time: Option<i64>,
    pub threads: Option<i64>,
    pub children: Option<i64>,
    pub memory: Option<ProcessMemory>,
    pub cpu: Option<ProcessCpu>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessMemory {
    pub percent: Option<f64>,
    pub percent_total: Option<f64>,
    pub kilobyte: Option<i64>,
    pub kilobyte_total: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessCpu {
    pub percent: Option<f64>,
    pub percent_total: Option<f64>,
}

/// Probe results against a remote host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteDetail {
    pub icmp: Option<IcmpProbe>,
    pub ports: Vec<PortProbe>,
    pub unix_sockets: Vec<UnixProbe>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IcmpProbe {
    pub probe_type: Option<String>,
    /// Round-trip time in seconds.
    pub response_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortProbe {
    pub hostname: Option<String>,
    pub port: Option<i64>,
    pub protocol: Option<String>,
    pub probe_type: Option<String>,
    /// Connect/exchange time in seconds.
    pub response_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnixProbe {
    pub path: Option<String>,
    pub protocol: Option<String>,
    pub response_time: Option<f64>,
}

/// Whole-host resource figures from the system service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemDetail {
    pub load: Option<LoadAverages>,
    pub cpu: Option<SystemCpu>,
    pub memory: Option<SystemMemory>,
    pub swap: Option<SystemMemory>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAverages {
    pub avg01: Option<f64>,
    pub avg05: Option<f64>,
    pub avg15: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemCpu {
    pub user: Option<f64>,
    pub system: Option<f64>,
    pub nice: Option<f64>,
    pub wait: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemMemory {
    pub percent: Option<f64>,
    pub kilobyte: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramDetail {
    pub started: Option<f64>,
    pub exit_status: Option<i64>,
    pub output: Option<String>,
}

/// Link statistics for a network interface service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkDetail {
    pub state: Option<i64>,
    pub speed: Option<i64>,
    pub duplex: Option<i64>,
    pub download: Option<LinkCounters>,
    pub upload: Option<LinkCounters>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkCounters {
    pub bytes_now: Option<i64>,
    pub bytes_total: Option<i64>,
    pub packets_now: Option<i64>,
    pub packets_total: Option<i64>,
    pub errors_now: Option<i64>,
    pub errors_total: Option<i64>,
}

/// A state transition the agent reported in-band.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEvent {
    pub service: String,
    /// Bit from the fixed event-kind set.
    pub kind: i64,
    pub message: String,
    pub collected_at: f64,
}
