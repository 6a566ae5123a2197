use crate::form::ReceiptPolicy;
use crate::pricing::{JerseyRequest, PriceTable};
use crate::stats::DashboardStats;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRef {
    pub id: String,
    pub content_type: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionRecord {
    pub id: i64,
    pub registration_id: i64,
    pub name: String,
    pub age: u32,
    pub jersey: JerseyRequest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub id: i64,
    pub name: String,
    pub origin: String,
    pub age: u32,
    pub jersey: JerseyRequest,
    pub total_jerseys: u32,
    pub total_due: u32,
    pub receipt: Option<ReceiptRef>,
    pub created_at: String,
    #[serde(default)]
    pub companions: Vec<CompanionRecord>,
}

/// Highest row ids seen in each table. Rows are append-only, so any write
/// moves at least one of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub registrations: i64,
    pub members: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub revision: Revision,
    pub registrations: Vec<RegistrationRecord>,
    pub stats: DashboardStats,
}

impl DashboardSnapshot {
    pub fn new(revision: Revision, registrations: Vec<RegistrationRecord>) -> Self {
        let stats = DashboardStats::from_records(&registrations);
        Self {
            revision,
            registrations,
            stats,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub size: String,
    pub price: u32,
}

pub fn price_list(table: &PriceTable) -> Vec<PriceEntry> {
    table
        .entries()
        .map(|(size, price)| PriceEntry {
            size: size.label().to_string(),
            price,
        })
        .collect()
}

/// What the form needs to know before submitting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSettings {
    pub prices: Vec<PriceEntry>,
    pub receipt_policy: ReceiptPolicy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub registration_id: i64,
    pub receipt: Option<ReceiptRef>,
    pub companions_written: usize,
    pub companions_failed: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub email: String,
    pub is_admin: bool,
}

/// Error body returned by every failing endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}
