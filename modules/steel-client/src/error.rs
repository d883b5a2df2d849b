use thiserror::Error;

pub type Result<T> = std::result::Result<T, SteelError>;

#[derive(Debug, Error)]
pub enum SteelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SteelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SteelError::Parse(err.to_string())
        } else {
            SteelError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SteelError {
    fn from(err: serde_json::Error) -> Self {
        SteelError::Parse(err.to_string())
    }
}
