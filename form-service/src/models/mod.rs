pub mod form;

pub use form::{Form, FormChanges, NewForm};
