use crate::models::{Form, FormChanges, NewForm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Body of `POST /forms`. Fields are optional here so a missing one can be
/// reported by name instead of as a generic deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub yaml_content: Option<String>,
}

/// Body of `PUT /forms/{name}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub yaml_content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: String,
    pub name: String,
    pub title: String,
    pub yaml_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl CreateFormRequest {
    pub fn into_new_form(self) -> Result<NewForm, AppError> {
        Ok(NewForm {
            name: required(self.name, "name")?,
            title: required(self.title, "title")?,
            yaml_content: required(self.yaml_content, "yamlContent")?,
        })
    }
}

impl UpdateFormRequest {
    pub fn into_changes(self) -> Result<FormChanges, AppError> {
        let changes = FormChanges {
            name: self.name,
            title: self.title,
            yaml_content: self.yaml_content,
        };
        if changes.is_empty() {
            return Err(AppError::ValidationError("Nothing to update".to_string()));
        }
        Ok(changes)
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value.ok_or_else(|| AppError::ValidationError(format!("Missing required field: {}", field)))
}

impl From<Form> for FormResponse {
    fn from(form: Form) -> Self {
        Self {
            id: form.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: form.name,
            title: form.title,
            yaml_content: form.yaml_content,
            created_at: form.created_at,
            updated_at: form.updated_at,
        }
    }
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
