use crate::models::Form;
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

pub const FORMS_COLLECTION: &str = "forms";

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "MongoDB client ready");
        Ok(Self { client, db })
    }

    /// Makes the store the authority on name uniqueness.
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for form-service");

        let name_index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("form_name_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.forms()
            .create_index(name_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create unique name index on forms collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on forms.name");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn forms(&self) -> Collection<Form> {
        self.db.collection(FORMS_COLLECTION)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
