use crate::records::RegistrationRecord;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub registrations: u64,
    pub jerseys: u64,
    pub revenue: u64,
}

impl DashboardStats {
    pub fn from_records(records: &[RegistrationRecord]) -> Self {
        records.iter().fold(Self::default(), |acc, record| Self {
            registrations: acc.registrations + 1,
            jerseys: acc.jerseys + u64::from(record.total_jerseys),
            revenue: acc.revenue + u64::from(record.total_due),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::JerseyRequest;

    fn record(id: i64, jerseys: u32, due: u32) -> RegistrationRecord {
        RegistrationRecord {
            id,
            name: format!("reg-{id}"),
            origin: "Maravatío".into(),
            age: 30,
            jersey: JerseyRequest::none(),
            total_jerseys: jerseys,
            total_due: due,
            receipt: None,
            created_at: "2026-03-08T10:00:00.000Z".into(),
            companions: Vec::new(),
        }
    }

    #[test]
    fn empty_list_is_all_zero() {
        assert_eq!(DashboardStats::from_records(&[]), DashboardStats::default());
    }

    #[test]
    fn folds_counts_and_sums() {
        let mut records = vec![record(1, 2, 560), record(2, 0, 0)];
        let stats = DashboardStats::from_records(&records);
        assert_eq!(
            stats,
            DashboardStats {
                registrations: 2,
                jerseys: 2,
                revenue: 560
            }
        );

        records.push(record(3, 3, 840));
        let stats = DashboardStats::from_records(&records);
        assert_eq!(stats.registrations, 3);
        assert_eq!(stats.jerseys, 5);
        assert_eq!(stats.revenue, 1400);
    }
}
