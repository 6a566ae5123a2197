use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rodada_core::config::ConfigError;
use rodada_core::errors::{AuthError, ReceiptError, RegistrationError, StoreError};
use rodada_schema::records::ErrorBody;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not signed in")]
    Unauthenticated,

    #[error("signed in without admin access")]
    Forbidden,

    #[error("redirect to {0}")]
    Redirect(&'static str),

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ReceiptError> for AppError {
    fn from(err: ReceiptError) -> Self {
        match err {
            ReceiptError::NotFound(_) => AppError::NotFound,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    /// Status, machine-readable kind and the fixed message shown to the visitor.
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::MalformedPayload(_) => (
                StatusCode::BAD_REQUEST,
                "malformed_payload",
                "No pudimos leer el formulario. Intenta de nuevo.",
            ),
            AppError::Registration(RegistrationError::Invalid(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_registration",
                "Revisa los datos del registro e intenta de nuevo.",
            ),
            AppError::Registration(RegistrationError::ReceiptRequired) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "receipt_required",
                "Sube tu comprobante de pago para solicitar jerseys.",
            ),
            AppError::Registration(RegistrationError::Receipt(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_receipt",
                "El comprobante debe ser una imagen PNG, JPG, WEBP o HEIC.",
            ),
            AppError::Registration(RegistrationError::Store(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "registration_failed",
                "Error al guardar el registro. Intenta de nuevo.",
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Credenciales incorrectas o error de conexión.",
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Inicia sesión para continuar.",
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "No tienes acceso a este panel.",
            ),
            AppError::Redirect(_) => (StatusCode::SEE_OTHER, "redirect", ""),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "No encontramos lo que buscas.",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Ocurrió un error. Intenta de nuevo.",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Redirect(to) = self {
            return Redirect::to(to).into_response();
        }

        let (status, kind, message) = self.parts();
        if status.is_server_error() {
            error!(error = %self, kind, "request failed");
        } else {
            warn!(error = %self, kind, "request rejected");
        }

        let body = ErrorBody {
            kind: kind.to_string(),
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Receipts(#[from] ReceiptError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("server i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
