//! Error taxonomy for containertool.
//!
//! One enum per the error classes the tool can surface: reference validation,
//! transport, wire protocol, authentication, content-address consistency,
//! local I/O, and the tar/ELF readers. Everything bottoms out here so that
//! `main` has a single place to render a message and pick an exit code.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContainerToolError>;

#[derive(Error, Debug)]
pub enum ContainerToolError {
    #[error("invalid image reference '{raw}': {reason}")]
    InvalidReference { raw: String, reason: String },

    #[error("invalid digest '{raw}': {reason}")]
    InvalidDigest { raw: String, reason: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("redirect limit exceeded after {0} hops")]
    TooManyRedirects(usize),

    #[error("unexpected response: {status} for {method} {url}")]
    UnexpectedStatus {
        status: u16,
        method: String,
        url: String,
        body: String,
    },

    #[error("missing required response header '{0}'")]
    MissingResponseHeader(String),

    #[error("response content type '{0}' is not one of the accepted types")]
    UnexpectedContentType(String),

    #[error("registry returned a non-HTTP response")]
    NonHttpResponse,

    #[error("registry error for {repository} ({operation}): {errors:?}")]
    Distribution {
        repository: String,
        operation: String,
        errors: Vec<crate::oci::error::DistributionError>,
    },

    #[error("authentication challenge was not understood: {0}")]
    AuthChallenge(String),

    #[error("{method} {url} requires authentication (401)")]
    Unauthorized {
        method: String,
        url: String,
        www_authenticate: Option<String>,
    },

    #[error("no credentials available for {0}")]
    NoCredentials(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("digest mismatch for {what}: expected {expected}, got {actual}")]
    DigestMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("base image has no manifest for architecture '{0}'")]
    NoSuitableBaseImage(String),

    #[error("server returned a manifest where an index was expected, or vice versa: {0}")]
    ManifestIndexMismatch(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid tar member name: {0}")]
    InvalidTarName(String),

    #[error("not a valid ELF file: {0}")]
    InvalidElf(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for ContainerToolError {
    fn from(err: std::io::Error) -> Self {
        ContainerToolError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ContainerToolError {
    fn from(err: serde_json::Error) -> Self {
        ContainerToolError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for ContainerToolError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ContainerToolError::Transport(format!("request timed out: {err}"))
        } else if err.is_connect() {
            ContainerToolError::Transport(format!("connection failed: {err}"))
        } else {
            ContainerToolError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ContainerToolError {
    fn from(err: url::ParseError) -> Self {
        ContainerToolError::Config(format!("invalid URL: {err}"))
    }
}
