//! Request helpers for the OpenAI-compatible provider.

use agent_core::error::AgentError;

/// Classify a failed request: unreachable endpoints are distinguished from
/// everything else so the session can tell the user to check the endpoint.
pub(crate) fn send_error(provider: &str, err: &reqwest::Error) -> AgentError {
    if err.is_connect() || err.is_timeout() {
        AgentError::ProviderUnavailable(format!("{provider}: {err}"))
    } else {
        AgentError::Provider(format!("{provider}: {err}"))
    }
}

/// Pass 2xx responses through, turn anything else into `AgentError::Provider`
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AgentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider, %status, body = %body, "Endpoint returned an error");
    Err(AgentError::Provider(format!(
        "{provider} returned HTTP {}: {}",
        status.as_u16(),
        body.trim()
    )))
}

/// Decode a JSON body, reporting malformed payloads as parse errors
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T, AgentError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| send_error(provider, &e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AgentError::Parse(format!("{provider} response: {e}")))
}
