use crate::services::dispatch::{DispatchCommand, DispatchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /dispatch`. The `github_*` aliases keep older front-ends working.
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub event_type: Option<String>,
    pub client_payload: Option<serde_json::Value>,
    #[serde(alias = "github_token")]
    pub auth_token: Option<String>,
    #[serde(alias = "github_repository")]
    pub target_repository: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub message: String,
    pub event_type: String,
    pub repository: String,
    pub timestamp: DateTime<Utc>,
}

impl DispatchRequest {
    pub fn into_command(self) -> Result<DispatchCommand, DispatchError> {
        let event_type = required(self.event_type, "event_type")?;
        let client_payload = required(self.client_payload, "client_payload")?;
        let auth_token = required(self.auth_token, "auth_token")?;
        let target_repository = required(self.target_repository, "target_repository")?;

        if !is_owner_repo(&target_repository) {
            return Err(DispatchError::Validation(
                "Repository must be in format 'owner/repo'".to_string(),
            ));
        }

        Ok(DispatchCommand {
            event_type,
            client_payload,
            auth_token,
            target_repository,
        })
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, DispatchError> {
    value.ok_or_else(|| DispatchError::Validation(format!("Missing required field: {}", field)))
}

/// Exactly one `/` with a non-empty segment on each side. Neither side may be
/// a `.`/`..` path segment.
fn is_owner_repo(repository: &str) -> bool {
    let is_segment = |part: &str| !part.is_empty() && part != "." && part != "..";
    match repository.split_once('/') {
        Some((owner, repo)) => is_segment(owner) && is_segment(repo) && !repo.contains('/'),
        None => false,
    }
}
