//! Unified error type.
//!
//! Handlers and middleware return [`Error`]; only the errors middleware (or the
//! dispatcher, when no errors middleware is installed) turns one into a
//! [`Response`]. The translation is [`Error::to_response`], a pure function of
//! the error value.

use serde::Serialize;

use crate::auth::AuthError;
use crate::response::Response;
use crate::status::Status;

/// The error type returned by handlers, middleware and the server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A known failure condition with an explicit status and a message that is
    /// safe to show the caller.
    #[error("{message}")]
    Request {
        status: Status,
        message: String,
        fields: Vec<FieldError>,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Authenticated, but lacking every role the route requires.
    #[error("you are not authorized for that action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// The service detected corrupted state and asks the process to drain and
    /// exit instead of serving more requests.
    #[error("integrity failure: {0}")]
    Integrity(String),

    /// Anything unexpected: storage, encoding, panics. Detail is logged, never
    /// sent to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used at translation boundaries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Client,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
    FatalIntegrity,
}

/// One failed field of a validated request body.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl Error {
    pub fn request(status: Status, message: impl Into<String>) -> Self {
        Self::Request { status, message: message.into(), fields: Vec::new() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::request(Status::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Request { .. } => ErrorKind::Client,
            Self::Auth(AuthError::ClaimsMissing) => ErrorKind::Internal,
            Self::Auth(_) => ErrorKind::Unauthorized,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Integrity(_) => ErrorKind::FatalIntegrity,
            Self::Internal(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Request { status, .. } => *status,
            _ => match self.kind() {
                ErrorKind::Client => Status::BadRequest,
                ErrorKind::Unauthorized => Status::Unauthorized,
                ErrorKind::Forbidden => Status::Forbidden,
                ErrorKind::NotFound => Status::NotFound,
                ErrorKind::Internal | ErrorKind::FatalIntegrity => Status::InternalServerError,
            },
        }
    }

    /// True for errors whose detail must stay server-side.
    pub fn is_internal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Internal | ErrorKind::FatalIntegrity)
    }

    pub fn is_shutdown(&self) -> bool {
        self.kind() == ErrorKind::FatalIntegrity
    }

    /// Builds the one response that answers this error.
    ///
    /// Internal errors get the generic reason phrase; everything else carries
    /// its own message and field list.
    pub fn to_response(&self) -> Response {
        let status = self.status();
        let payload = match self {
            _ if self.is_internal() => ErrorResponse {
                error: status.reason().to_string(),
                fields: Vec::new(),
            },
            Self::Request { message, fields, .. } => ErrorResponse {
                error: message.clone(),
                fields: fields.clone(),
            },
            _ => ErrorResponse { error: self.to_string(), fields: Vec::new() },
        };

        let body = serde_json::to_vec(&payload)
            .unwrap_or_else(|_| br#"{"error":"Internal Server Error"}"#.to_vec());
        Response::builder().status(status).json(body)
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    error: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.error.cmp(&b.error)));

        Self::Request {
            status: Status::BadRequest,
            message: "field validation error".to_string(),
            fields,
        }
    }
}
