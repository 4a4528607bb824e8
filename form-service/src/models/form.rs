use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A stored form definition. Field names match the documents already present
/// in the `forms` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub title: String,
    pub yaml_content: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a form; all fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForm {
    pub name: String,
    pub title: String,
    pub yaml_content: String,
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormChanges {
    pub name: Option<String>,
    pub title: Option<String>,
    pub yaml_content: Option<String>,
}

impl Form {
    pub fn new(input: NewForm) -> Self {
        let now = now_millis();
        Self {
            id: None,
            name: input.name,
            title: input.title,
            yaml_content: input.yaml_content,
            created_at: now,
            updated_at: now,
        }
    }

}

impl FormChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.title.is_none() && self.yaml_content.is_none()
    }
}

/// Current time truncated to the millisecond precision of BSON dates, so the
/// value handed back to callers equals what the store persists.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
