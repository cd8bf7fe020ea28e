//! HTTP clients for the downstream systems: Jira, the chat-completion
//! API, Elasticsearch and Jenkins.
//!
//! Each client owns one pooled [`reqwest::Client`] with its own timeout and
//! reports failures through its own error enum. Nothing is retried.

use std::time::Duration;

pub mod elasticsearch;
pub mod jenkins;
pub mod jira;
pub mod llm;

#[cfg(test)]
pub(crate) mod test_server;

/// Build a client with the given request timeout.
pub(crate) fn http_client(
    timeout: Duration,
    accept_invalid_certs: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
}

/// Body text of a failed response, for error messages.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string())
}
