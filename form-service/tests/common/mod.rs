#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use form_service::models::form::now_millis;
use form_service::models::{Form, FormChanges, NewForm};
use form_service::services::repository::form_name_taken;
use form_service::services::{FormRepository, GithubDispatcher};
use form_service::{build_router, AppState};
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

/// In-memory stand-in for the MongoDB repository. Enforces name uniqueness
/// the same way the unique index does.
#[derive(Default)]
pub struct InMemoryFormRepository {
    forms: Mutex<Vec<Form>>,
    unavailable: AtomicBool,
}

impl InMemoryFormRepository {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.forms.lock().unwrap().len()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable(anyhow::anyhow!(
                "Server selection timeout: No available servers"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FormRepository for InMemoryFormRepository {
    async fn list(&self) -> Result<Vec<Form>, AppError> {
        self.check_available()?;
        Ok(self.forms.lock().unwrap().clone())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Form>, AppError> {
        self.check_available()?;
        let forms = self.forms.lock().unwrap();
        Ok(forms.iter().find(|form| form.name == name).cloned())
    }

    async fn create(&self, input: NewForm) -> Result<Form, AppError> {
        self.check_available()?;
        let mut forms = self.forms.lock().unwrap();
        if forms.iter().any(|form| form.name == input.name) {
            return Err(form_name_taken());
        }

        let mut form = Form::new(input);
        form.id = Some(ObjectId::new());
        forms.push(form.clone());
        Ok(form)
    }

    async fn update(&self, name: &str, changes: FormChanges) -> Result<Option<Form>, AppError> {
        self.check_available()?;
        let mut forms = self.forms.lock().unwrap();
        let Some(index) = forms.iter().position(|form| form.name == name) else {
            return Ok(None);
        };

        if let Some(new_name) = &changes.name {
            if new_name != name && forms.iter().any(|form| &form.name == new_name) {
                return Err(form_name_taken());
            }
        }

        apply_changes(&mut forms[index], changes);
        Ok(Some(forms[index].clone()))
    }

    async fn delete(&self, name: &str) -> Result<bool, AppError> {
        self.check_available()?;
        let mut forms = self.forms.lock().unwrap();
        let before = forms.len();
        forms.retain(|form| form.name != name);
        Ok(forms.len() < before)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}

/// Mirrors the `$set` the Mongo repository issues: present fields plus a
/// fresh `updatedAt`.
fn apply_changes(form: &mut Form, changes: FormChanges) {
    if let Some(name) = changes.name {
        form.name = name;
    }
    if let Some(title) = changes.title {
        form.title = title;
    }
    if let Some(yaml_content) = changes.yaml_content {
        form.yaml_content = yaml_content;
    }
    form.updated_at = now_millis();
}

pub struct TestApp {
    pub router: Router,
    pub repository: Arc<InMemoryFormRepository>,
}

impl TestApp {
    /// Router wired to an in-memory store and a dispatcher pointed at
    /// `dispatch_base_url` (usually a wiremock server).
    pub fn with_dispatch_base_url(dispatch_base_url: &str) -> Self {
        let repository = Arc::new(InMemoryFormRepository::default());
        let dispatcher = Arc::new(GithubDispatcher::new(dispatch_base_url));
        let router = build_router(AppState::new(repository.clone(), dispatcher));

        Self { router, repository }
    }

    pub fn spawn() -> Self {
        // Nothing listens on port 9; forms tests never dispatch.
        Self::with_dispatch_base_url("http://127.0.0.1:9")
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("response body is not JSON: {}", String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.request("POST", uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.request("PUT", uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request("DELETE", uri, None).await
    }
}
