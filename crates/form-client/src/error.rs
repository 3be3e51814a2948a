use form_spec::FieldErrors;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The session is no longer valid; the caller should send the user to
    /// `login_path`.
    #[error("session expired, sign in again at {login_path}")]
    Unauthorized { login_path: String },
    #[error("{path} returned {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response body did not include the created record id")]
    MissingResponseId,
    #[error("base url cannot carry a path")]
    InvalidBaseUrl,
    #[error("Ya se está enviando el formulario, por favor espera")]
    AlreadySubmitting,
    #[error("the form has {} invalid field(s)", .0.len())]
    Validation(FieldErrors),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
