pub mod schema;
pub(crate) mod validation;
pub mod validator;

pub use schema::{CompletionSchema, SchemaHandle};
pub use validator::Validator;
