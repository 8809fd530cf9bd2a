use crate::logic::parse::ParseError;
use thiserror::Error;

/// Failures talking to the generative-AI endpoint
#[derive(Error, Debug)]
pub enum AiError {
    /// No API key configured; AI features are switched off
    #[error("AI features are not configured on this server")]
    NotConfigured,

    #[error("AI service rate limit reached, try again shortly")]
    RateLimited,

    /// Non-success response from the endpoint
    #[error("AI service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model produced no text (blocked by safety filters, or empty)
    #[error("AI service returned an empty response")]
    EmptyResponse,

    /// The model answered, but not in the shape we asked for
    #[error("AI response could not be used: {0}")]
    InvalidResponse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, AiError>;
