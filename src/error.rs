use thiserror::Error;

use crate::config::ConfigError;
use crate::update::UpdateError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("update error: {0}")]
    Update(#[from] UpdateError),
    #[error("cannot determine launcher location: {0}")]
    LauncherPath(String),
}

pub type AppResult<T> = Result<T, AppError>;
