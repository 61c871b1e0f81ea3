//! Ports implemented by outbound adapters.

use async_trait::async_trait;
use thiserror::Error;

use super::model::ControlTarget;

/// User-initiated actions an agent accepts. The wire names are fixed; any
/// other string is rejected before network I/O happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAction {
    Start,
    Stop,
    Restart,
    Monitor,
    Unmonitor,
}

impl AgentAction {
    pub fn parse(input: &str) -> Result<Self, ControlError> {
        Ok(match input {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "restart" => Self::Restart,
            "monitor" => Self::Monitor,
            "unmonitor" => Self::Unmonitor,
            other => return Err(ControlError::unsupported_action(other)),
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Monitor => "monitor",
            Self::Unmonitor => "unmonitor",
        }
    }
}

/// Failures surfaced by the agent control adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unsupported action {action:?}")]
    UnsupportedAction { action: String },
    #[error("invalid control target: {reason}")]
    InvalidTarget { reason: String },
    #[error("agent request failed: {reason}")]
    Transport { reason: String },
    #[error("agent returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("security token not found on the agent's status page")]
    TokenMissing,
}

impl ControlError {
    pub fn unsupported_action(action: impl Into<String>) -> Self {
        Self::UnsupportedAction {
            action: action.into(),
        }
    }

    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }
}

/// Outbound port for proxying control actions to an agent. The action is
/// scheduled by the agent, not completed, by the time this returns.
#[async_trait]
pub trait AgentCommander: Send + Sync {
    async fn perform(
        &self,
        target: &ControlTarget,
        service: &str,
        action: AgentAction,
    ) -> Result<(), ControlError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("start", AgentAction::Start)]
    #[case("stop", AgentAction::Stop)]
    #[case("restart", AgentAction::Restart)]
    #[case("monitor", AgentAction::Monitor)]
    #[case("unmonitor", AgentAction::Unmonitor)]
    fn whitelist_accepts_known_actions(#[case] input: &str, #[case] expected: AgentAction) {
        assert_eq!(AgentAction::parse(input).expect("whitelisted"), expected);
        assert_eq!(expected.as_str(), input);
    }

    #[rstest]
    #[case("reboot")]
    #[case("Start")]
    #[case("")]
    fn whitelist_rejects_everything_else(#[case] input: &str) {
        assert!(matches!(
            AgentAction::parse(input),
            Err(ControlError::UnsupportedAction { .. })
        ));
    }
}
