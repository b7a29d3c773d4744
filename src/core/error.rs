use thiserror::Error;

use crate::storage::StoreError;

/// Centralized error type for the Telegram-facing layer.
///
/// Library components carry their own narrow errors (`StoreError`,
/// `FailureLogError`); handlers funnel everything into this enum so the
/// reply to the admin can be rendered in one place.
#[derive(Error, Debug)]
pub enum AppError {
    /// User store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Validation errors (bad command arguments)
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Shorthand for `AppError::Validation`.
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}
