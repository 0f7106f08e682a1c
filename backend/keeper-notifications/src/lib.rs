pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod shutdown;

pub use config::Config;
pub use error::{AppError, Result};
pub use services::*;
