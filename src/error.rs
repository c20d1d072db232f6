use serde_json::Error as SerdeJsonError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("an email and password, or a file where they can be found, are required")]
    MissingCredentials,

    #[error("malformed credentials file {path:?}: {reason}")]
    MalformedCredentials { path: PathBuf, reason: String },

    #[error("bad authentication for {0}")]
    BadAuthentication(String),

    #[error("too many failed logins; captcha required")]
    CaptchaRequired,

    #[error("not logged in")]
    NotLoggedIn,
}

#[derive(Error, Debug)]
pub enum RemoteServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("request failed: {0}")]
    Request(String),
}

impl From<std::io::Error> for RemoteServiceError {
    fn from(err: std::io::Error) -> Self {
        RemoteServiceError::Request(err.to_string())
    }
}

impl From<SerdeJsonError> for RemoteServiceError {
    fn from(err: SerdeJsonError) -> Self {
        RemoteServiceError::Request(format!("bad response body: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Remote service error: {0}")]
    RemoteService(#[from] RemoteServiceError),

    #[error("Filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid date {0:?}, expected {1}")]
    InvalidDate(String, &'static str),

    #[error("Invalid title pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl AppError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
