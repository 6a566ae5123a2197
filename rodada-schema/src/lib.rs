pub mod access;
pub mod form;
pub mod pricing;
pub mod records;
pub mod stats;

use pricing::{JerseyRequest, PriceTable};
use serde::{Deserialize, Serialize};

pub const REGISTRATION_SCHEMA_V1: &str = "registration.v1";

const MIN_AGE: u32 = 1;
const MAX_AGE: u32 = 120;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionV1 {
    pub name: String,
    pub age: u32,
    pub jersey: JerseyRequest,
}

/// Canonical registration payload sent by the form and accepted by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationV1 {
    pub schema: String,
    pub name: String,
    pub origin: String,
    pub age: u32,
    pub jersey: JerseyRequest,
    #[serde(default)]
    pub companions: Vec<CompanionV1>,
    pub total_jerseys: u32,
    pub total_due: u32,
}

impl RegistrationV1 {
    /// Main registrant first, then companions in entry order.
    pub fn jersey_requests(&self) -> impl Iterator<Item = &JerseyRequest> {
        std::iter::once(&self.jersey).chain(self.companions.iter().map(|c| &c.jersey))
    }

    pub fn derived_jerseys(&self) -> u32 {
        pricing::jersey_count(self.jersey_requests())
    }

    pub fn derived_total(&self, table: &PriceTable) -> u32 {
        pricing::total_due(self.jersey_requests(), table)
    }

    pub fn payment_required(&self) -> bool {
        self.total_jerseys > 0
    }
}

pub fn validate_registration_v1(
    registration: &RegistrationV1,
    table: &PriceTable,
) -> Result<(), String> {
    if registration.schema != REGISTRATION_SCHEMA_V1 {
        return Err(format!("unsupported schema '{}'", registration.schema));
    }
    if registration.name.trim().is_empty() {
        return Err("name is required".into());
    }
    if registration.origin.trim().is_empty() {
        return Err("origin is required".into());
    }
    validate_age(registration.age, "age")?;
    validate_jersey(&registration.jersey, "jersey")?;

    for (index, companion) in registration.companions.iter().enumerate() {
        if companion.name.trim().is_empty() {
            return Err(format!("companion {index}: name is required"));
        }
        validate_age(companion.age, &format!("companion {index}: age"))?;
        validate_jersey(&companion.jersey, &format!("companion {index}: jersey"))?;
    }

    let jerseys = registration.derived_jerseys();
    if registration.total_jerseys != jerseys {
        return Err(format!(
            "total_jerseys {} does not match {jerseys} selected jerseys",
            registration.total_jerseys
        ));
    }
    let due = registration.derived_total(table);
    if registration.total_due != due {
        return Err(format!(
            "total_due {} does not match computed total {due}",
            registration.total_due
        ));
    }
    Ok(())
}

fn validate_age(age: u32, field: &str) -> Result<(), String> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(format!("{field} {age} is out of range"))
    }
}

fn validate_jersey(jersey: &JerseyRequest, field: &str) -> Result<(), String> {
    if jersey.wanted && jersey.size.is_none() {
        return Err(format!("{field}: size is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::JerseySize;

    fn registration() -> RegistrationV1 {
        RegistrationV1 {
            schema: REGISTRATION_SCHEMA_V1.into(),
            name: "Ana López".into(),
            origin: "Maravatío".into(),
            age: 34,
            jersey: JerseyRequest::sized(JerseySize::M),
            companions: vec![
                CompanionV1 {
                    name: "Lucía".into(),
                    age: 12,
                    jersey: JerseyRequest::sized(JerseySize::CH),
                },
                CompanionV1 {
                    name: "Marta".into(),
                    age: 60,
                    jersey: JerseyRequest::none(),
                },
            ],
            total_jerseys: 2,
            total_due: 560,
        }
    }

    #[test]
    fn validates_registration_v1() {
        assert!(validate_registration_v1(&registration(), &PriceTable::standard()).is_ok());
    }

    #[test]
    fn rejects_tampered_totals() {
        let table = PriceTable::standard();

        let mut cheap = registration();
        cheap.total_due = 0;
        let err = validate_registration_v1(&cheap, &table).expect_err("tampered total");
        assert!(err.contains("total_due"));

        let mut fewer = registration();
        fewer.total_jerseys = 1;
        assert!(validate_registration_v1(&fewer, &table).is_err());
    }

    #[test]
    fn rejects_missing_fields() {
        let table = PriceTable::standard();

        let mut blank = registration();
        blank.origin = "   ".into();
        assert_eq!(
            validate_registration_v1(&blank, &table),
            Err("origin is required".to_string())
        );

        let mut unnamed = registration();
        unnamed.companions[1].name.clear();
        assert_eq!(
            validate_registration_v1(&unnamed, &table),
            Err("companion 1: name is required".to_string())
        );

        let mut unsized_jersey = registration();
        unsized_jersey.companions[0].jersey.size = None;
        unsized_jersey.total_due = 280;
        assert!(validate_registration_v1(&unsized_jersey, &table).is_err());

        let mut wrong_schema = registration();
        wrong_schema.schema = "registration.v0".into();
        assert!(validate_registration_v1(&wrong_schema, &table).is_err());
    }

    #[test]
    fn rejects_out_of_range_age() {
        let mut reg = registration();
        reg.age = 0;
        assert!(validate_registration_v1(&reg, &PriceTable::standard()).is_err());
    }

    #[test]
    fn companions_default_to_empty() {
        let json = serde_json::json!({
            "schema": "registration.v1",
            "name": "Ana",
            "origin": "Morelia",
            "age": 30,
            "jersey": { "wanted": false, "size": null },
            "total_jerseys": 0,
            "total_due": 0
        });
        let reg: RegistrationV1 = serde_json::from_value(json).expect("decode");
        assert!(reg.companions.is_empty());
        assert!(!reg.payment_required());
    }
}
