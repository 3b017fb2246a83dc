use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

pub type Result<T> = std::result::Result<T, SlackError>;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Request timestamp outside the replay window")]
    StaleRequest,

    #[error("Request signature verification failed")]
    InvalidSignature,

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl IntoResponse for SlackError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingHeader(_) | Self::StaleRequest | Self::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            Self::Payload(_) => StatusCode::BAD_REQUEST,
            Self::InvalidKey(_) | Self::Api(_) | Self::Http(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        warn!("Rejecting Slack request ({status}): {self}");
        (status, self.to_string()).into_response()
    }
}
