use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use rodada_core::submit::{ReceiptUpload, Submission, submit_registration};
use rodada_schema::RegistrationV1;
use rodada_schema::records::{FormSettings, PriceEntry, SubmitOutcome, price_list};
use tokio::task::spawn_blocking;

use crate::{error::AppError, session::require_admin, state::AppState};

pub const REGISTRATION_PART: &str = "registration";
pub const RECEIPT_PART: &str = "receipt";

pub async fn pricing_handler(State(state): State<Arc<AppState>>) -> Json<Vec<PriceEntry>> {
    Json(price_list(&state.submit.prices))
}

pub async fn form_settings_handler(State(state): State<Arc<AppState>>) -> Json<FormSettings> {
    Json(FormSettings {
        prices: price_list(&state.submit.prices),
        receipt_policy: state.submit.receipt_policy,
    })
}

/// Multipart body: a `registration` JSON part and an optional `receipt` file.
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitOutcome>), AppError> {
    let mut registration: Option<RegistrationV1> = None;
    let mut receipt: Option<ReceiptUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MalformedPayload(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::MalformedPayload(e.to_string()))?;

        match name.as_deref() {
            Some(REGISTRATION_PART) => {
                let parsed = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::MalformedPayload(e.to_string()))?;
                registration = Some(parsed);
            }
            // Browsers send an empty part for an untouched file input.
            Some(RECEIPT_PART) if !bytes.is_empty() => {
                receipt = Some(ReceiptUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    let registration = registration
        .ok_or_else(|| AppError::MalformedPayload("missing registration part".into()))?;

    let outcome = spawn_blocking(move || {
        submit_registration(
            &state.store,
            &state.bucket,
            &state.submit,
            state.sink.as_ref(),
            Submission {
                registration,
                receipt,
            },
        )
    })
    .await??;

    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn receipt_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;

    let bucket = state.bucket.clone();
    let (bytes, content_type) = spawn_blocking(move || bucket.open_receipt(&id)).await??;
    Ok(([(CONTENT_TYPE, content_type)], bytes))
}
