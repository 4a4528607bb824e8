pub mod database;
pub mod dispatch;
pub mod metrics;
pub mod repository;

pub use database::MongoDb;
pub use dispatch::{DispatchCommand, DispatchError, DispatchReceipt, Dispatcher, GithubDispatcher};
pub use self::metrics::{get_metrics, init_metrics};
pub use repository::{FormRepository, MongoFormRepository};
