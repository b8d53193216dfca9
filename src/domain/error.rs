use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("File read error: {0}")]
    FileReadError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_attachment(msg: impl Into<String>) -> Self {
        Self::InvalidAttachment(msg.into())
    }

    pub fn file_read(msg: impl Into<String>) -> Self {
        Self::FileReadError(msg.into())
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        Self::StreamError(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_invalid_attachment(&self) -> bool {
        matches!(self, Self::InvalidAttachment(_))
    }

    pub fn is_file_read(&self) -> bool {
        matches!(self, Self::FileReadError(_))
    }

    pub fn is_stream_error(&self) -> bool {
        matches!(self, Self::StreamError(_))
    }
}
