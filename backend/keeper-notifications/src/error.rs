use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Startup errors. Anything after startup is logged and recovered from.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),

    #[error("Push provider initialization failed: {0}")]
    Notifier(#[from] fcm_shared::FCMError),
}
