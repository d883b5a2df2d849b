use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SteelSearchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
