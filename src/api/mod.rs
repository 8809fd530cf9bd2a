pub mod document_handlers;
pub mod handlers;
pub mod progress_handlers;
pub mod routes;
pub mod study_handlers;
pub mod user_extractor;

pub use handlers::{AppState, ErrorResponse, ListResponse, ProgressResponse};
pub use routes::*;
