//! Reqwest-backed agent control adapter.
//!
//! Agents protect their control POSTs with a double-submit CSRF token: the
//! token is scraped from the service's HTML status page and must come back
//! in both the form body and a cookie. This adapter owns transport details
//! only; action whitelisting happens in the domain layer before any I/O.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::domain::model::ControlTarget;
use crate::domain::ports::{AgentAction, AgentCommander, ControlError};

/// Per-request ceiling; agents answer their control interface quickly or
/// not at all.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Control adapter performing the token fetch and the action POST.
pub struct HttpAgentCommander {
    client: reqwest::Client,
    input_pattern: Regex,
    value_pattern: Regex,
}

impl HttpAgentCommander {
    /// Build the adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            // Tolerant two-step match: find the input tag that mentions the
            // token name, then pull its value. Attribute order and quoting
            // vary between agent versions.
            input_pattern: Regex::new(r#"(?i)<input[^>]*securitytoken[^>]*>"#)
                .unwrap_or_else(|err| unreachable!("static pattern: {err}")),
            value_pattern: Regex::new(r#"(?i)value=['"]?([^'">\s]+)"#)
                .unwrap_or_else(|err| unreachable!("static pattern: {err}")),
        })
    }

    /// Extract the CSRF token from a service status page.
    fn extract_token(&self, html: &str) -> Option<String> {
        let tag = self.input_pattern.find(html)?;
        let value = self.value_pattern.captures(tag.as_str())?;
        Some(value.get(1)?.as_str().to_owned())
    }

    async fn fetch_token(
        &self,
        target: &ControlTarget,
        url: &str,
    ) -> Result<String, ControlError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&target.username, Some(&target.password))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(ControlError::Status {
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }

        self.extract_token(&body).ok_or(ControlError::TokenMissing)
    }
}

#[async_trait]
impl AgentCommander for HttpAgentCommander {
    async fn perform(
        &self,
        target: &ControlTarget,
        service: &str,
        action: AgentAction,
    ) -> Result<(), ControlError> {
        if target.address.is_empty() || target.port == 0 {
            return Err(ControlError::invalid_target(
                "host never advertised a control interface",
            ));
        }

        let url = format!("{}/{service}", target.base_url());
        let token = self.fetch_token(target, &url).await?;
        debug!(url = %url, action = action.as_str(), "posting agent action");

        let response = self
            .client
            .post(&url)
            .basic_auth(&target.username, Some(&target.password))
            .header(
                reqwest::header::COOKIE,
                format!("securitytoken={token}"),
            )
            .form(&[("action", action.as_str()), ("securitytoken", &token)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControlError::Status {
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }
        Ok(())
    }
}

fn map_transport_error(error: reqwest::Error) -> ControlError {
    if error.is_timeout() {
        ControlError::transport(format!("timed out: {error}"))
    } else {
        ControlError::transport(error.to_string())
    }
}

/// First line or so of an agent error body, whitespace collapsed.
fn body_preview(body: &str) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
