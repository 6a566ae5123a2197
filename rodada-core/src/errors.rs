use rodada_schema::form::FormError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Get,
    List,
    Create,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("missing or insufficient permissions at {path} for {operation}")]
    PermissionDenied { path: String, operation: Operation },

    #[error("database error at {path}: {source}")]
    Database {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("corrupt row in {path}: {detail}")]
    Corrupt { path: String, detail: String },

    #[error("failed to prepare database directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Permission, read-only and authorizer failures are reported as
    /// permission errors; everything else stays a generic database error.
    pub fn classify(path: &str, operation: Operation, source: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match source.sqlite_error_code() {
            Some(ErrorCode::PermissionDenied)
            | Some(ErrorCode::ReadOnly)
            | Some(ErrorCode::AuthorizationForStatementDenied) => StoreError::PermissionDenied {
                path: path.to_string(),
                operation,
            },
            _ => StoreError::Database {
                path: path.to_string(),
                source,
            },
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }
}

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("unsupported receipt content type '{0}'")]
    UnsupportedType(String),

    #[error("receipt is empty")]
    Empty,

    #[error("receipt is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("receipt '{0}' not found")]
    NotFound(String),

    #[error("receipt storage failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account already exists for {0}")]
    AccountExists(String),

    #[error("password must not be empty")]
    EmptyPassword,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid registration: {0}")]
    Invalid(String),

    #[error("a payment receipt is required when jerseys are requested")]
    ReceiptRequired,

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FormError> for RegistrationError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::ReceiptRequired => RegistrationError::ReceiptRequired,
            other => RegistrationError::Invalid(other.to_string()),
        }
    }
}

impl RegistrationError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, RegistrationError::Store(err) if err.is_permission_denied())
    }
}

/// Receives failures that are reported but not returned to the caller.
pub trait ErrorSink: Send + Sync + 'static {
    fn permission_error(&self, error: &StoreError);

    fn failure(&self, context: &str, error: &dyn std::error::Error);
}

/// Default sink: everything goes to the log.
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn permission_error(&self, error: &StoreError) {
        warn!(channel = "permission-error", %error, "write rejected");
    }

    fn failure(&self, context: &str, error: &dyn std::error::Error) {
        warn!(context, %error, "operation failed");
    }
}

pub(crate) fn report(sink: &dyn ErrorSink, context: &str, error: &StoreError) {
    if error.is_permission_denied() {
        sink.permission_error(error);
    } else {
        sink.failure(context, error);
    }
}
