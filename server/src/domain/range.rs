//! Time-range strings accepted by the metrics and availability APIs.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid range {input:?}: {reason}")]
pub struct RangeError {
    pub input: String,
    pub reason: String,
}

/// Parse `Nh`, `Nm`, `NhMm` and the like via humantime; `Nd` is converted to
/// hours first because the upstream parser treats `d` as ambiguous.
pub fn parse_range(input: &str) -> Result<Duration, RangeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RangeError {
            input: input.to_owned(),
            reason: "empty".to_owned(),
        });
    }

    let normalised = match trimmed.strip_suffix('d') {
        Some(days) => {
            let days: u64 = days.parse().map_err(|_| RangeError {
                input: input.to_owned(),
                reason: "day count is not a number".to_owned(),
            })?;
            format!("{}h", days * 24)
        }
        None => trimmed.to_owned(),
    };

    humantime::parse_duration(&normalised).map_err(|err| RangeError {
        input: input.to_owned(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1h", 3600)]
    #[case("90m", 90 * 60)]
    #[case("1h30m", 90 * 60)]
    #[case("7d", 168 * 3600)]
    #[case("1d", 24 * 3600)]
    fn accepts_hours_minutes_and_days(#[case] input: &str, #[case] secs: u64) {
        assert_eq!(parse_range(input), Ok(Duration::from_secs(secs)));
    }

    #[rstest]
    #[case("foo")]
    #[case("")]
    #[case("xd")]
    #[case("-1h")]
    fn rejects_garbage(#[case] input: &str) {
        assert!(parse_range(input).is_err());
    }
}
