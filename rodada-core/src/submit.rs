//! Registration submission.
//!
//! Upload the receipt (when payment is due), write the parent record, then
//! write each companion one after another. There is no transaction across
//! these steps: a companion that fails to write is reported and skipped, and
//! the parent keeps whatever companions made it.

use crate::errors::{self, ErrorSink, RegistrationError};
use crate::receipts::ReceiptBucket;
use crate::store::RegistrationStore;
use chrono::{SecondsFormat, Utc};
use rodada_schema::RegistrationV1;
use rodada_schema::form::ReceiptPolicy;
use rodada_schema::pricing::PriceTable;
use rodada_schema::records::SubmitOutcome;
use rodada_schema::validate_registration_v1;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct ReceiptUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone, Debug)]
pub struct Submission {
    pub registration: RegistrationV1,
    pub receipt: Option<ReceiptUpload>,
}

#[derive(Clone, Debug, Default)]
pub struct SubmitOptions {
    pub prices: PriceTable,
    pub receipt_policy: ReceiptPolicy,
}

pub fn submit_registration(
    store: &RegistrationStore,
    bucket: &ReceiptBucket,
    options: &SubmitOptions,
    sink: &dyn ErrorSink,
    submission: Submission,
) -> Result<SubmitOutcome, RegistrationError> {
    let Submission {
        registration,
        receipt,
    } = submission;

    validate_registration_v1(&registration, &options.prices).map_err(RegistrationError::Invalid)?;

    let payment_required = registration.payment_required();
    if payment_required && receipt.is_none() && options.receipt_policy == ReceiptPolicy::Required {
        return Err(RegistrationError::ReceiptRequired);
    }

    let receipt = match receipt {
        Some(upload) if payment_required => {
            Some(bucket.upload(&upload.bytes, &upload.content_type)?)
        }
        Some(_) => {
            debug!("ignoring receipt on a registration with nothing to pay");
            None
        }
        None => None,
    };

    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let registration_id = store
        .insert_registration(&registration, receipt.as_ref(), &created_at)
        .inspect_err(|err| errors::report(sink, "registrations", err))?;

    let mut companions_written = 0;
    let mut companions_failed = 0;
    for companion in &registration.companions {
        match store.insert_companion(registration_id, companion) {
            Ok(_) => companions_written += 1,
            Err(err) => {
                companions_failed += 1;
                errors::report(sink, "members", &err);
            }
        }
    }

    info!(
        registration_id,
        companions_written,
        companions_failed,
        total_jerseys = registration.total_jerseys,
        total_due = registration.total_due,
        "registration stored"
    );

    Ok(SubmitOutcome {
        registration_id,
        receipt,
        companions_written,
        companions_failed,
    })
}
