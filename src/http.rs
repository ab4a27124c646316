//! Shared `ureq` agents and error mapping.

use crate::github::ApiError;
use std::sync::OnceLock;
use std::time::Duration;

/// Timeout for GitHub API calls.
const API_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for archive downloads and asset uploads.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// User agent sent with every request; GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("qpm-action/", env!("CARGO_PKG_VERSION"));

/// Agent for short JSON API calls.
pub fn api_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| build_agent(API_TIMEOUT))
}

/// Agent for large transfers.
pub fn transfer_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| build_agent(TRANSFER_TIMEOUT))
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    ureq::Agent::new_with_config(config)
}

/// Map a ureq error to an [`ApiError`].
pub fn map_ureq_error(method: &'static str, url: &str, err: &ureq::Error) -> ApiError {
    match err {
        ureq::Error::StatusCode(404) => ApiError::NotFound {
            method,
            url: url.to_owned(),
        },
        ureq::Error::StatusCode(status) => ApiError::Status {
            method,
            url: url.to_owned(),
            status: *status,
        },
        other => ApiError::Transport {
            method,
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_404_to_not_found() {
        let mapped = map_ureq_error("GET", "https://example.test", &ureq::Error::StatusCode(404));
        assert!(matches!(mapped, ApiError::NotFound { .. }));
    }

    #[test]
    fn maps_other_status_to_status() {
        let mapped = map_ureq_error("POST", "https://example.test", &ureq::Error::StatusCode(422));
        assert!(matches!(mapped, ApiError::Status { status: 422, .. }));
    }

    #[test]
    fn user_agent_names_the_action() {
        assert!(USER_AGENT.starts_with("qpm-action/"));
    }
}
