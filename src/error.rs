//! Error types for the listing workflow.

use std::collections::BTreeMap;

/// Inline, per-field validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, String>;

/// Client-local validation failures. Never sent to the backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Selected file is not an image.
    #[error("Please select an image file (got {media_type}).")]
    InvalidImageType { media_type: String },

    /// Selected image exceeds the upload limit.
    #[error("File is too large (max 5MB, got {size} bytes).")]
    ImageTooLarge { size: u64 },

    /// Field name is not part of the role schema.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Status value is outside the role's closed set.
    #[error("\"{value}\" is not a valid status")]
    InvalidStatus { value: String },

    /// Listing id that cannot name a single resource (empty, `.` or `..`).
    #[error("\"{0}\" is not a valid post id")]
    InvalidId(String),

    /// One or more fields failed their declared rules.
    #[error("{} field(s) need attention", .0.len())]
    Fields(FieldErrors),
}

/// Coarse classification used to pick the user-facing reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fix the input.
    Validation,
    /// Log in again.
    Auth,
    /// Check connectivity and retry.
    Network,
    /// Show the backend's message.
    Server,
    /// Wait for the pending operation.
    Busy,
}

/// Errors surfaced by backend operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// Token missing before sending, or rejected with 401.
    #[error("authentication required: {0}")]
    Auth(String),

    /// Request never reached the backend.
    #[error("network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Backend-provided message, or a generic fallback.
        message: String,
    },

    /// Backend answered 2xx with a body we could not read.
    #[error("unexpected response from server: {0}")]
    Decode(String),

    /// Same operation already pending for this listing.
    #[error("{0} is already in progress")]
    Busy(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Auth(_) => ErrorKind::Auth,
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Server { .. } | ClientError::Decode(_) => ErrorKind::Server,
            ClientError::Busy(_) => ErrorKind::Busy,
            ClientError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Message suitable for a toast or banner.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Auth(_) => "Your session has expired. Please log in again.".to_string(),
            ClientError::Network(_) => "Network Error: Could not connect to server.".to_string(),
            ClientError::Server { message, .. } => message.clone(),
            ClientError::Decode(_) => "Received an unexpected response from the server.".to_string(),
            ClientError::Busy(what) => format!("Please wait, {what} is still in progress."),
            ClientError::Validation(err) => err.to_string(),
        }
    }

    /// Classify a transport-level reqwest failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Errors from the listing modal's open/cancel/submit contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModalError {
    #[error("modal is not open")]
    NotOpen,

    /// Controls are disabled while a submission is pending.
    #[error("a submission is already in progress")]
    Submitting,

    /// Opened for edit, but the seed listing carries no id to update.
    #[error("the post being edited has no id")]
    MissingId,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors reading or writing the persisted session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
