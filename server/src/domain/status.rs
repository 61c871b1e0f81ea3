//! Host status derivation rules shared by the overview and the
//! product-compatible status surface.

use std::time::Duration;

/// A host that has not reported for longer than this is stale.
pub const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Agent cadence assumed when a host never reported its poll interval.
pub const DEFAULT_POLL_INTERVAL_SECS: i64 = 30;

/// Wire status codes of the external product: 0 OK, 1 warning, 2 critical,
/// 3 unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl WireStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

/// Traffic-light colour for the internal overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewColor {
    Red,
    Orange,
    Green,
    Gray,
}

impl OverviewColor {
    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Green => "green",
            Self::Gray => "gray",
        }
    }
}

/// Service tallies a status derivation needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceCounts {
    pub total: usize,
    /// Services with a non-zero status bitset.
    pub failed: usize,
    /// Services whose monitor state is not "on".
    pub unmonitored: usize,
}

impl ServiceCounts {
    pub fn available(&self) -> usize {
        self.total - self.failed
    }
}

/// Product-compatible status: critical whenever the host is stale,
/// regardless of what its services last said.
pub fn wire_status(stale: bool, counts: ServiceCounts) -> WireStatus {
    if stale || counts.failed > 0 {
        return WireStatus::Critical;
    }
    if counts.total == 0 {
        return WireStatus::Unknown;
    }
    if counts.unmonitored > 0 {
        return WireStatus::Warning;
    }
    WireStatus::Ok
}

/// Overview colour: red only when the host is silent or nothing on it is
/// healthy; partial failure shows as orange.
pub fn overview_color(stale: bool, counts: ServiceCounts) -> OverviewColor {
    if stale {
        return OverviewColor::Red;
    }
    if counts.total == 0 {
        return OverviewColor::Gray;
    }
    if counts.failed == counts.total {
        return OverviewColor::Red;
    }
    if counts.failed > 0 {
        return OverviewColor::Orange;
    }
    OverviewColor::Green
}

/// Human line shown next to the colour.
pub fn overview_description(stale: bool, gap_secs: i64, counts: ServiceCounts) -> String {
    if stale {
        return format!("No report from Monit for {gap_secs} seconds");
    }
    if counts.total == 0 {
        return "No services reported yet".to_owned();
    }
    format!(
        "{} out of {} services are available",
        counts.available(),
        counts.total
    )
}

/// Availability level recorded by the heartbeat, derived from the gap since
/// the host's last accepted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Healthy,
    Warning,
    Offline,
}

impl Availability {
    /// Healthy below 2x the poll interval, warning below 5x, offline beyond.
    pub fn classify(gap_secs: i64, poll_interval_secs: i64) -> Self {
        let interval = if poll_interval_secs > 0 {
            poll_interval_secs
        } else {
            DEFAULT_POLL_INTERVAL_SECS
        };
        if gap_secs < 2 * interval {
            Self::Healthy
        } else if gap_secs < 5 * interval {
            Self::Warning
        } else {
            Self::Offline
        }
    }

    /// Numeric sample written to the availability series.
    pub fn sample_value(self) -> f64 {
        match self {
            Self::Healthy => 1.0,
            Self::Warning => 0.5,
            Self::Offline => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn counts(total: usize, failed: usize, unmonitored: usize) -> ServiceCounts {
        ServiceCounts {
            total,
            failed,
            unmonitored,
        }
    }

    #[rstest]
    #[case::all_ok(false, counts(2, 0, 0), WireStatus::Ok)]
    #[case::one_failed(false, counts(2, 1, 0), WireStatus::Critical)]
    #[case::stale_overrides_services(true, counts(2, 0, 0), WireStatus::Critical)]
    #[case::unmonitored_warns(false, counts(3, 0, 1), WireStatus::Warning)]
    #[case::empty_is_unknown(false, counts(0, 0, 0), WireStatus::Unknown)]
    fn wire_status_follows_staleness_and_failures(
        #[case] stale: bool,
        #[case] c: ServiceCounts,
        #[case] expected: WireStatus,
    ) {
        assert_eq!(wire_status(stale, c), expected);
    }

    #[rstest]
    #[case::fresh_partial_failure(false, counts(2, 1, 0), OverviewColor::Orange)]
    #[case::fresh_total_failure(false, counts(2, 2, 0), OverviewColor::Red)]
    #[case::stale(true, counts(2, 0, 0), OverviewColor::Red)]
    #[case::all_ok(false, counts(2, 0, 0), OverviewColor::Green)]
    #[case::no_services(false, counts(0, 0, 0), OverviewColor::Gray)]
    fn overview_color_separates_partial_from_total_failure(
        #[case] stale: bool,
        #[case] c: ServiceCounts,
        #[case] expected: OverviewColor,
    ) {
        assert_eq!(overview_color(stale, c), expected);
    }

    #[test]
    fn overview_description_reports_availability_ratio() {
        assert_eq!(
            overview_description(false, 10, counts(2, 1, 0)),
            "1 out of 2 services are available"
        );
        assert!(overview_description(true, 400, counts(2, 0, 0)).starts_with("No report from"));
    }

    #[rstest]
    #[case::fresh(30, 30, Availability::Healthy)]
    #[case::boundary_warning(60, 30, Availability::Warning)]
    #[case::late(149, 30, Availability::Warning)]
    #[case::boundary_offline(150, 30, Availability::Offline)]
    #[case::default_interval_healthy(59, 0, Availability::Healthy)]
    #[case::default_interval_offline(151, 0, Availability::Offline)]
    fn availability_thresholds_scale_with_poll_interval(
        #[case] gap: i64,
        #[case] interval: i64,
        #[case] expected: Availability,
    ) {
        assert_eq!(Availability::classify(gap, interval), expected);
    }

    #[test]
    fn availability_samples_are_plottable() {
        assert_eq!(Availability::Healthy.sample_value(), 1.0);
        assert_eq!(Availability::Warning.sample_value(), 0.5);
        assert_eq!(Availability::Offline.sample_value(), 0.0);
    }
}
