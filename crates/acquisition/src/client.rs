//! Shared HTTP client construction.

use std::time::Duration;

use pipeline_common::{PipelineError, PipelineResult};
use reqwest::Client;

const USER_AGENT: &str = concat!("bgc-pipeline/", env!("CARGO_PKG_VERSION"));

/// Build the client used for every acquisition request.
///
/// Without a timeout a request waits as long as the remote side keeps the
/// connection open.
pub fn build_client(timeout: Option<Duration>) -> PipelineResult<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .tcp_nodelay(true);

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(|e| PipelineError::Transport {
        url: String::new(),
        message: format!("failed to create HTTP client: {}", e),
    })
}

/// Map a reqwest failure onto the transport error for `url`.
pub(crate) fn transport_error(url: &str, err: reqwest::Error) -> PipelineError {
    PipelineError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}
