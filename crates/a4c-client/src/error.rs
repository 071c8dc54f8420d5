use a4c_protocol::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolClientError {
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("api error [{code}]: {message}")]
    Api { code: i32, message: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<ApiError> for ProtocolClientError {
    fn from(value: ApiError) -> Self {
        ProtocolClientError::Api {
            code: value.code,
            message: value.message,
        }
    }
}
