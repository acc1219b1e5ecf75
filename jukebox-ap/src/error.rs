//! Error types for jukebox-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Playback failures (resolution, spawn, crash) are recovered inside the engine by
//! auto-advancing; control-channel and request errors surface to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for jukebox-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resolver call failed or timed out
    #[error("Resolution failed: {0}")]
    Resolution(String),

    /// Player process could not be started
    #[error("Player spawn failed: {0}")]
    PlayerSpawn(String),

    /// Player exited abnormally
    #[error("Player crashed: {0}")]
    PlayerCrash(String),

    /// No player is listening on the control socket
    #[error("Control channel unreachable: {0}")]
    ControlUnreachable(String),

    /// Player did not answer within the control timeout
    #[error("Control channel timed out after {0} ms")]
    ControlTimeout(u64),

    /// Player answered with bytes that do not decode
    #[error("Malformed control response: {0}")]
    ControlMalformed(String),

    /// Player decoded the command but refused it
    #[error("Player rejected command: {0}")]
    ControlRejected(String),

    /// Bad index, out-of-range volume, missing field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::ControlUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::ControlTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::ControlMalformed(_) | Error::ControlRejected(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for errors that originate on the player's control socket
    pub fn is_control_error(&self) -> bool {
        matches!(
            self,
            Error::ControlUnreachable(_)
                | Error::ControlTimeout(_)
                | Error::ControlMalformed(_)
                | Error::ControlRejected(_)
        )
    }
}

impl From<jukebox_common::Error> for Error {
    fn from(e: jukebox_common::Error) -> Self {
        match e {
            jukebox_common::Error::Io(e) => Error::Io(e),
            jukebox_common::Error::Config(msg) => Error::Config(msg),
            jukebox_common::Error::InvalidInput(msg) => Error::InvalidRequest(msg),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience Result type using jukebox-ap Error
pub type Result<T> = std::result::Result<T, Error>;
