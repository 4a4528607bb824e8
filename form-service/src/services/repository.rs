//! Form persistence.
//!
//! [`FormRepository`] is the seam the HTTP layer depends on; the MongoDB
//! implementation lives here and tests substitute an in-memory one.

use crate::models::{form::now_millis, Form, FormChanges, NewForm};
use crate::services::database::MongoDb;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use service_core::error::AppError;

const DUPLICATE_KEY_CODE: i32 = 11000;

pub fn form_not_found() -> AppError {
    AppError::NotFound("Form not found".to_string())
}

pub fn form_name_taken() -> AppError {
    AppError::Conflict("Form with this name already exists".to_string())
}

#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Every stored form, in the store's natural order.
    async fn list(&self) -> Result<Vec<Form>, AppError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Form>, AppError>;

    /// Persists a new form. A duplicate name yields `AppError::Conflict`.
    async fn create(&self, input: NewForm) -> Result<Form, AppError>;

    /// Applies `changes` to the form currently called `name` and returns the
    /// post-update record, or `None` if no such form exists.
    async fn update(&self, name: &str, changes: FormChanges) -> Result<Option<Form>, AppError>;

    /// Returns whether a form was removed.
    async fn delete(&self, name: &str) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MongoFormRepository {
    db: MongoDb,
}

impl MongoFormRepository {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FormRepository for MongoFormRepository {
    async fn list(&self) -> Result<Vec<Form>, AppError> {
        let cursor = self.db.forms().find(None, None).await?;
        Ok(cursor.try_collect::<Vec<Form>>().await?)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Form>, AppError> {
        Ok(self.db.forms().find_one(doc! { "name": name }, None).await?)
    }

    async fn create(&self, input: NewForm) -> Result<Form, AppError> {
        let mut form = Form::new(input);

        let result = self
            .db
            .forms()
            .insert_one(&form, None)
            .await
            .map_err(map_write_error)?;

        form.id = match result.inserted_id {
            Bson::ObjectId(id) => Some(id),
            other => {
                return Err(AppError::InternalError(anyhow::anyhow!(
                    "Unexpected inserted id type: {:?}",
                    other
                )));
            }
        };

        tracing::info!(form_name = %form.name, form_id = ?form.id, "Form created");
        Ok(form)
    }

    async fn update(&self, name: &str, changes: FormChanges) -> Result<Option<Form>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .db
            .forms()
            .find_one_and_update(
                doc! { "name": name },
                doc! { "$set": set_document(changes) },
                options,
            )
            .await
            .map_err(map_write_error)?;

        if updated.is_some() {
            tracing::info!(form_name = %name, "Form updated");
        }
        Ok(updated)
    }

    async fn delete(&self, name: &str) -> Result<bool, AppError> {
        let result = self
            .db
            .forms()
            .delete_one(doc! { "name": name }, None)
            .await?;

        if result.deleted_count > 0 {
            tracing::info!(form_name = %name, "Form deleted");
        }
        Ok(result.deleted_count > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.db.health_check().await
    }
}

fn set_document(changes: FormChanges) -> Document {
    let mut set = doc! { "updatedAt": BsonDateTime::from_chrono(now_millis()) };
    if let Some(name) = changes.name {
        set.insert("name", name);
    }
    if let Some(title) = changes.title {
        set.insert("title", title);
    }
    if let Some(yaml_content) = changes.yaml_content {
        set.insert("yamlContent", yaml_content);
    }
    set
}

fn map_write_error(err: MongoError) -> AppError {
    if is_duplicate_key(&err) {
        form_name_taken()
    } else {
        AppError::from(err)
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_document_only_contains_present_fields() {
        let set = set_document(FormChanges {
            title: Some("Survey v2".to_string()),
            ..Default::default()
        });

        assert_eq!(set.get_str("title").unwrap(), "Survey v2");
        assert!(set.get_datetime("updatedAt").is_ok());
        assert!(!set.contains_key("name"));
        assert!(!set.contains_key("yamlContent"));
    }

    #[test]
    fn set_document_maps_yaml_content_key() {
        let set = set_document(FormChanges {
            name: Some("survey2".to_string()),
            yaml_content: Some("fields: [a]".to_string()),
            ..Default::default()
        });

        assert_eq!(set.get_str("name").unwrap(), "survey2");
        assert_eq!(set.get_str("yamlContent").unwrap(), "fields: [a]");
    }
}
