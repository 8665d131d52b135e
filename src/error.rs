use crate::models::ImageModel;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LumiereError {
    #[error("Prompt is too long. Maximum length for {model} is {max} characters (got {actual}).")]
    PromptTooLong {
        model: ImageModel,
        max: usize,
        actual: usize,
    },
    #[error("Unknown model: {0}")]
    InvalidModel(String),
    #[error("Invalid image count: {0}")]
    InvalidImageCount(String),
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    #[error("No images returned from the API")]
    NoImagesReturned,
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Generation was cancelled")]
    Cancelled,
}

/// Coarse classification used when surfacing an error to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Provider,
    Configuration,
}

impl LumiereError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LumiereError::PromptTooLong { .. }
            | LumiereError::InvalidModel(_)
            | LumiereError::InvalidImageCount(_) => ErrorKind::Validation,
            LumiereError::ConfigError(_) => ErrorKind::Configuration,
            LumiereError::GenerationFailed(_)
            | LumiereError::NoImagesReturned
            | LumiereError::TransportError(_)
            | LumiereError::SerializationError(_)
            | LumiereError::Cancelled => ErrorKind::Provider,
        }
    }

    /// Inline message shown next to the form. Provider details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            LumiereError::PromptTooLong { model, max, .. } => format!(
                "Prompt is too long. Maximum length for {} is {} characters.",
                model, max
            ),
            LumiereError::InvalidModel(name) => format!("Unknown model: {}", name),
            LumiereError::InvalidImageCount(raw) => {
                format!("Number of images must be a whole number, got \"{}\".", raw)
            }
            LumiereError::NoImagesReturned => "No images returned from the API.".to_string(),
            LumiereError::Cancelled => "Generation was cancelled.".to_string(),
            LumiereError::ConfigError(_) => {
                "The server is misconfigured, please contact the administrator.".to_string()
            }
            LumiereError::GenerationFailed(_)
            | LumiereError::TransportError(_)
            | LumiereError::SerializationError(_) => {
                "Failed to generate the images, please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LumiereError>;
