pub mod achievement;
pub mod activity;
pub mod chat;
pub mod common;
pub mod document;
pub mod flashcard;
pub mod quiz;
pub mod user;
pub mod user_context;

pub use achievement::*;
pub use activity::*;
pub use chat::*;
pub use common::*;
pub use document::*;
pub use flashcard::*;
pub use quiz::*;
pub use user::*;
pub use user_context::*;
