//! Outbound workflow dispatch.
//!
//! A dispatch is a single `repository_dispatch` call against the third-party
//! API. Every non-success status is classified once into [`DispatchError`],
//! which owns the mapping to an HTTP response.

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

const USER_AGENT: &str = concat!("form-service/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

/// A validated dispatch request.
#[derive(Debug, Clone)]
pub struct DispatchCommand {
    pub event_type: String,
    pub client_payload: serde_json::Value,
    pub auth_token: String,
    /// `owner/repo`
    pub target_repository: String,
}

/// Confirmation of an accepted dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    pub event_type: String,
    pub repository: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Repository not found: {repository}")]
    TargetNotFound { repository: String },

    #[error("Invalid event type: {event_type}")]
    UnprocessableEvent { event_type: String },

    #[error("Upstream API error ({status}): {body}")]
    UpstreamError { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl DispatchError {
    /// Classifies a non-204 upstream response.
    pub fn from_upstream(status: u16, body: String, command: &DispatchCommand) -> Self {
        match status {
            401 => DispatchError::AuthenticationFailed,
            404 => DispatchError::TargetNotFound {
                repository: command.target_repository.clone(),
            },
            422 => DispatchError::UnprocessableEvent {
                event_type: command.event_type.clone(),
            },
            status => DispatchError::UpstreamError { status, body },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            DispatchError::TargetNotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::UnprocessableEvent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchError::UpstreamError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            DispatchError::NetworkError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "invalid",
            DispatchError::AuthenticationFailed => "authentication_failed",
            DispatchError::TargetNotFound { .. } => "target_not_found",
            DispatchError::UnprocessableEvent { .. } => "unprocessable_event",
            DispatchError::UpstreamError { .. } => "upstream_error",
            DispatchError::NetworkError(_) => "network_error",
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            DispatchError::Validation(message) => json!({ "error": message }),
            DispatchError::AuthenticationFailed => json!({
                "error": "Authentication failed",
                "details": "Invalid token or insufficient permissions",
                "required_permissions": ["repo", "workflow"],
            }),
            DispatchError::TargetNotFound { repository } => json!({
                "error": "Repository not found",
                "details": format!("Repository '{}' not found or token lacks access", repository),
                "repository": repository,
            }),
            DispatchError::UnprocessableEvent { event_type } => json!({
                "error": "Invalid event type",
                "details": "The event_type might not match any repository_dispatch triggers in the target workflows",
                "event_type": event_type,
            }),
            DispatchError::UpstreamError { status, body } => json!({
                "error": "Upstream API error",
                "details": body,
                "status_code": status,
            }),
            DispatchError::NetworkError(message) => {
                json!({ "error": format!("Network error: {}", message) })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Sends one dispatch. Single attempt; nothing is retried.
    async fn dispatch(&self, command: &DispatchCommand) -> Result<DispatchReceipt, DispatchError>;
}

#[derive(Debug, Serialize)]
struct DispatchPayload<'a> {
    event_type: &'a str,
    client_payload: &'a serde_json::Value,
}

/// Dispatcher for the GitHub `repository_dispatch` API.
#[derive(Clone)]
pub struct GithubDispatcher {
    client: Client,
    api_base_url: String,
}

impl GithubDispatcher {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_base_url)
    }

    pub fn with_client(client: Client, api_base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/repos/{owner}/{repo}/dispatches`, with owner and repo encoded as
    /// single path segments.
    fn dispatch_url(&self, repository: &str) -> Result<Url, DispatchError> {
        let (owner, repo) = repository.split_once('/').ok_or_else(|| {
            DispatchError::Validation("Repository must be in format 'owner/repo'".to_string())
        })?;

        let mut url = Url::parse(&self.api_base_url).map_err(|e| {
            DispatchError::NetworkError(format!("Invalid dispatch API base URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                DispatchError::NetworkError(format!(
                    "Dispatch API base URL cannot carry a path: {}",
                    self.api_base_url
                ))
            })?
            .pop_if_empty()
            .extend(["repos", owner, repo, "dispatches"]);
        Ok(url)
    }
}

#[async_trait]
impl Dispatcher for GithubDispatcher {
    async fn dispatch(&self, command: &DispatchCommand) -> Result<DispatchReceipt, DispatchError> {
        let url = self.dispatch_url(&command.target_repository)?;

        tracing::info!(
            repository = %command.target_repository,
            event_type = %command.event_type,
            "Sending workflow dispatch"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&command.auth_token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&DispatchPayload {
                event_type: &command.event_type,
                client_payload: &command.client_payload,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(repository = %command.target_repository, "Dispatch request failed: {}", e);
                DispatchError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            tracing::info!(
                repository = %command.target_repository,
                event_type = %command.event_type,
                "Workflow dispatched"
            );
            return Ok(DispatchReceipt {
                event_type: command.event_type.clone(),
                repository: command.target_repository.clone(),
                timestamp: Utc::now(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| DispatchError::NetworkError(e.to_string()))?;

        tracing::warn!(
            repository = %command.target_repository,
            status = %status,
            body = %body,
            "Dispatch rejected upstream"
        );

        Err(DispatchError::from_upstream(status.as_u16(), body, command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> DispatchCommand {
        DispatchCommand {
            event_type: "deploy".to_string(),
            client_payload: json!({}),
            auth_token: "token".to_string(),
            target_repository: "acme/app".to_string(),
        }
    }

    #[test]
    fn classifies_known_upstream_statuses() {
        let cmd = command();
        assert!(matches!(
            DispatchError::from_upstream(401, String::new(), &cmd),
            DispatchError::AuthenticationFailed
        ));
        assert!(matches!(
            DispatchError::from_upstream(404, String::new(), &cmd),
            DispatchError::TargetNotFound { repository } if repository == "acme/app"
        ));
        assert!(matches!(
            DispatchError::from_upstream(422, String::new(), &cmd),
            DispatchError::UnprocessableEvent { event_type } if event_type == "deploy"
        ));
    }

    #[test]
    fn other_statuses_pass_through_verbatim() {
        let err = DispatchError::from_upstream(503, "maintenance".to_string(), &command());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(matches!(
            err,
            DispatchError::UpstreamError { status: 503, ref body } if body == "maintenance"
        ));
    }

    #[test]
    fn network_errors_are_server_errors() {
        let err = DispatchError::NetworkError("connection reset".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn dispatch_url_ignores_trailing_slash() {
        let dispatcher = GithubDispatcher::new("http://localhost:9000/");
        assert_eq!(
            dispatcher.dispatch_url("acme/app").unwrap().as_str(),
            "http://localhost:9000/repos/acme/app/dispatches"
        );
    }

    #[test]
    fn dispatch_url_keeps_base_path_prefix() {
        let dispatcher = GithubDispatcher::new("https://ghe.example.com/api/v3");
        assert_eq!(
            dispatcher.dispatch_url("acme/app").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/acme/app/dispatches"
        );
    }

    #[test]
    fn dispatch_url_encodes_owner_and_repo_as_segments() {
        let dispatcher = GithubDispatcher::new("http://localhost:9000");
        let url = dispatcher.dispatch_url("acme/x?y#z").unwrap();

        assert_eq!(url.path(), "/repos/acme/x%3Fy%23z/dispatches");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }
}
