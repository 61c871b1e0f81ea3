//! The fixed event-kind bitset agents use for service status and events.

/// Name for a single event-kind bit.
pub fn kind_name(bit: i64) -> &'static str {
    match bit {
        0x1 => "checksum",
        0x2 => "resource",
        0x4 => "timeout",
        0x8 => "timestamp",
        0x10 => "size",
        0x20 => "connection",
        0x40 => "permission",
        0x80 => "uid",
        0x100 => "gid",
        0x200 => "nonexist",
        0x400 => "invalid",
        0x800 => "data",
        0x1000 => "exec",
        0x2000 => "fsflags",
        0x4000 => "icmp",
        0x8000 => "content",
        0x10000 => "instance",
        0x20000 => "action",
        0x40000 => "pid",
        0x80000 => "ppid",
        0x100000 => "heartbeat",
        0x200000 => "status",
        0x400000 => "uptime",
        0x800000 => "link",
        _ => "unknown",
    }
}

/// Names of every set bit in a service status. Empty when the service is OK.
pub fn failed_checks(status: i64) -> Vec<&'static str> {
    (0..24)
        .map(|shift| 1i64 << shift)
        .filter(|bit| status & bit != 0)
        .map(kind_name)
        .collect()
}
