pub mod dispatch;
pub mod forms;
pub mod health;

pub use dispatch::dispatch_workflow;
pub use forms::{create_form, delete_form, get_form, list_forms, update_form};
pub use health::{health_check, metrics_endpoint, readiness_check};
