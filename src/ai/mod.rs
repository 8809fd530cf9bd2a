pub mod assistant;
pub mod client;
pub mod error;

pub use assistant::StudyAssistant;
pub use client::{GeminiClient, Prompt, PromptMessage, PromptRole, TextGenerator};
pub use error::AiError;
