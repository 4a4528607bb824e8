pub mod dispatch;
pub mod forms;

pub use dispatch::{DispatchRequest, DispatchResponse};
pub use forms::{CreateFormRequest, FormResponse, MessageResponse, UpdateFormRequest};
