//! Registration form state.
//!
//! Holds the raw text the attendee typed plus the jersey choices, and turns
//! it into a [`RegistrationV1`] payload. Totals are recomputed from the
//! current state on every call; nothing is cached.

use crate::pricing::{self, JerseyRequest, JerseySize, PriceTable};
use crate::{CompanionV1, REGISTRATION_SCHEMA_V1, RegistrationV1, validate_registration_v1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptPolicy {
    /// A payment receipt must accompany any registration with jerseys.
    #[default]
    Required,
    Optional,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{field} must be a whole number")]
    InvalidNumber { field: String },

    #[error("a payment receipt is required when jerseys are requested")]
    ReceiptRequired,

    #[error("{0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionForm {
    pub name: String,
    pub age: String,
    pub jersey: JerseyRequest,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub origin: String,
    pub age: String,
    pub jersey: JerseyRequest,
    pub companions: Vec<CompanionForm>,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_companion(&mut self) {
        self.companions.push(CompanionForm::default());
    }

    pub fn remove_companion(&mut self, index: usize) -> Option<CompanionForm> {
        if index < self.companions.len() {
            Some(self.companions.remove(index))
        } else {
            None
        }
    }

    pub fn companion_mut(&mut self, index: usize) -> Option<&mut CompanionForm> {
        self.companions.get_mut(index)
    }

    /// Switching the jersey off clears the size, like the form's select does.
    pub fn set_jersey_wanted(&mut self, wanted: bool) {
        self.jersey.set_wanted(wanted);
    }

    pub fn set_jersey_size(&mut self, size: Option<JerseySize>) {
        self.jersey.size = size;
    }

    fn jersey_requests(&self) -> impl Iterator<Item = &JerseyRequest> {
        std::iter::once(&self.jersey).chain(self.companions.iter().map(|c| &c.jersey))
    }

    pub fn jersey_count(&self) -> u32 {
        pricing::jersey_count(self.jersey_requests())
    }

    pub fn total_payable(&self, table: &PriceTable) -> u32 {
        pricing::total_due(self.jersey_requests(), table)
    }

    pub fn payment_required(&self) -> bool {
        self.jersey_count() > 0
    }

    pub fn to_payload(
        &self,
        table: &PriceTable,
        policy: ReceiptPolicy,
        has_receipt: bool,
    ) -> Result<RegistrationV1, FormError> {
        if policy == ReceiptPolicy::Required && self.payment_required() && !has_receipt {
            return Err(FormError::ReceiptRequired);
        }

        let companions = self
            .companions
            .iter()
            .enumerate()
            .map(|(index, companion)| {
                Ok(CompanionV1 {
                    name: companion.name.trim().to_string(),
                    age: parse_number(&companion.age, &format!("companion {index}: age"))?,
                    jersey: companion.jersey.clone(),
                })
            })
            .collect::<Result<Vec<_>, FormError>>()?;

        let payload = RegistrationV1 {
            schema: REGISTRATION_SCHEMA_V1.into(),
            name: self.name.trim().to_string(),
            origin: self.origin.trim().to_string(),
            age: parse_number(&self.age, "age")?,
            jersey: self.jersey.clone(),
            companions,
            total_jerseys: self.jersey_count(),
            total_due: self.total_payable(table),
        };
        validate_registration_v1(&payload, table).map_err(FormError::Invalid)?;
        Ok(payload)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn parse_number(value: &str, field: &str) -> Result<u32, FormError> {
    value.trim().parse().map_err(|_| FormError::InvalidNumber {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> RegistrationForm {
        let mut form = RegistrationForm::new();
        form.name = " Ana ".into();
        form.origin = "Maravatío".into();
        form.age = "34".into();
        form
    }

    fn companion(name: &str, jersey: JerseyRequest) -> CompanionForm {
        CompanionForm {
            name: name.into(),
            age: "20".into(),
            jersey,
        }
    }

    #[test]
    fn totals_track_every_participant() {
        let table = PriceTable::standard();
        let mut form = filled();
        assert_eq!(form.jersey_count(), 0);
        assert_eq!(form.total_payable(&table), 0);

        form.set_jersey_wanted(true);
        form.set_jersey_size(Some(JerseySize::G));
        form.companions.push(companion("Lucía", JerseyRequest::sized(JerseySize::XS)));
        form.companions.push(companion("Marta", JerseyRequest::none()));

        assert_eq!(form.jersey_count(), 2);
        assert_eq!(form.total_payable(&table), 560);

        form.set_jersey_wanted(false);
        assert_eq!(form.jersey, JerseyRequest::none());
        assert_eq!(form.jersey_count(), 1);
        assert_eq!(form.total_payable(&table), 280);
    }

    #[test]
    fn wanted_without_size_counts_but_costs_nothing() {
        let mut form = filled();
        form.set_jersey_wanted(true);
        assert_eq!(form.jersey_count(), 1);
        assert_eq!(form.total_payable(&PriceTable::standard()), 0);
    }

    #[test]
    fn remove_companion_preserves_order() {
        let mut form = filled();
        for name in ["a", "b", "c", "d"] {
            form.add_companion();
            if let Some(c) = form.companions.last_mut() {
                c.name = name.into();
            }
        }

        let removed = form.remove_companion(1).expect("in range");
        assert_eq!(removed.name, "b");
        let names: Vec<_> = form.companions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);

        assert!(form.remove_companion(3).is_none());
        assert_eq!(form.companions.len(), 3);
    }

    #[test]
    fn receipt_required_before_payload() {
        let mut form = filled();
        form.set_jersey_wanted(true);
        form.set_jersey_size(Some(JerseySize::M));

        let table = PriceTable::standard();
        assert_eq!(
            form.to_payload(&table, ReceiptPolicy::Required, false),
            Err(FormError::ReceiptRequired)
        );
        assert!(form.to_payload(&table, ReceiptPolicy::Optional, false).is_ok());

        let payload = form
            .to_payload(&table, ReceiptPolicy::Required, true)
            .expect("payload");
        assert_eq!(payload.total_jerseys, 1);
        assert_eq!(payload.total_due, 280);
    }

    #[test]
    fn payload_trims_and_parses() {
        let mut form = filled();
        form.companions.push(companion(" Lucía ", JerseyRequest::none()));

        let payload = form
            .to_payload(&PriceTable::standard(), ReceiptPolicy::Required, false)
            .expect("no payment due");
        assert_eq!(payload.name, "Ana");
        assert_eq!(payload.age, 34);
        assert_eq!(payload.companions[0].name, "Lucía");
        assert_eq!(payload.total_due, 0);
    }

    #[test]
    fn bad_age_is_reported_by_field() {
        let mut form = filled();
        form.add_companion();
        if let Some(c) = form.companion_mut(0) {
            c.name = "Lucía".into();
            c.age = "doce".into();
        }

        let err = form
            .to_payload(&PriceTable::standard(), ReceiptPolicy::Optional, false)
            .expect_err("age");
        assert_eq!(
            err,
            FormError::InvalidNumber {
                field: "companion 0: age".into()
            }
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut form = filled();
        form.add_companion();
        form.set_jersey_wanted(true);
        form.reset();
        assert_eq!(form, RegistrationForm::default());
    }
}
