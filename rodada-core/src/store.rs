use crate::errors::{Operation, StoreError};
use rodada_schema::pricing::{JerseyRequest, JerseySize};
use rodada_schema::records::{
    CompanionRecord, DashboardSnapshot, ReceiptRef, RegistrationRecord, Revision,
};
use rodada_schema::{CompanionV1, RegistrationV1};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const REGISTRATIONS: &str = "registrations";

const SCHEMA: &str = "
    PRAGMA journal_mode=WAL;
    PRAGMA synchronous=NORMAL;
    CREATE TABLE IF NOT EXISTS registrations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        origin TEXT NOT NULL,
        age INTEGER NOT NULL,
        jersey_wanted INTEGER NOT NULL,
        jersey_size TEXT,
        total_jerseys INTEGER NOT NULL,
        total_due INTEGER NOT NULL,
        receipt_id TEXT,
        receipt_content_type TEXT,
        receipt_url TEXT,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        registration_id INTEGER NOT NULL REFERENCES registrations(id),
        name TEXT NOT NULL,
        age INTEGER NOT NULL,
        jersey_wanted INTEGER NOT NULL,
        jersey_size TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_registrations_created ON registrations(created_at);
    CREATE INDEX IF NOT EXISTS idx_members_registration ON members(registration_id);
";

const SELECT_REGISTRATIONS: &str = "
    SELECT id, name, origin, age, jersey_wanted, jersey_size, total_jerseys, total_due,
           receipt_id, receipt_content_type, receipt_url, created_at
    FROM registrations";

const SELECT_MEMBERS: &str = "
    SELECT id, registration_id, name, age, jersey_wanted, jersey_size
    FROM members";

/// Registrations and their `members` sub-records in a single SQLite file.
#[derive(Clone, Debug)]
pub struct RegistrationStore {
    db_path: Arc<PathBuf>,
}

impl RegistrationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;

        let store = Self {
            db_path: Arc::new(path.to_path_buf()),
        };
        store
            .connect(REGISTRATIONS, Operation::Create)?
            .execute_batch(SCHEMA)
            .map_err(|e| StoreError::classify(REGISTRATIONS, Operation::Create, e))?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self, path: &str, operation: Operation) -> Result<Connection, StoreError> {
        let conn = Connection::open(&*self.db_path)
            .map_err(|e| StoreError::classify(path, operation, e))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| StoreError::classify(path, operation, e))?;
        Ok(conn)
    }

    pub fn insert_registration(
        &self,
        registration: &RegistrationV1,
        receipt: Option<&ReceiptRef>,
        created_at: &str,
    ) -> Result<i64, StoreError> {
        let op = Operation::Create;
        let conn = self.connect(REGISTRATIONS, op)?;
        conn.execute(
            "INSERT INTO registrations (
                name, origin, age, jersey_wanted, jersey_size, total_jerseys, total_due,
                receipt_id, receipt_content_type, receipt_url, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                registration.name,
                registration.origin,
                registration.age,
                registration.jersey.wanted,
                registration.jersey.size.map(JerseySize::label),
                registration.total_jerseys,
                registration.total_due,
                receipt.map(|r| r.id.as_str()),
                receipt.map(|r| r.content_type.as_str()),
                receipt.map(|r| r.url.as_str()),
                created_at,
            ],
        )
        .map_err(|e| StoreError::classify(REGISTRATIONS, op, e))?;

        Ok(conn.last_insert_rowid())
    }

    pub fn insert_companion(
        &self,
        registration_id: i64,
        companion: &CompanionV1,
    ) -> Result<i64, StoreError> {
        let op = Operation::Create;
        let path = members_path(registration_id);
        let conn = self.connect(&path, op)?;
        conn.execute(
            "INSERT INTO members (registration_id, name, age, jersey_wanted, jersey_size)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                registration_id,
                companion.name,
                companion.age,
                companion.jersey.wanted,
                companion.jersey.size.map(JerseySize::label),
            ],
        )
        .map_err(|e| StoreError::classify(&path, op, e))?;

        Ok(conn.last_insert_rowid())
    }

    pub fn registration(&self, id: i64) -> Result<Option<RegistrationRecord>, StoreError> {
        let op = Operation::Get;
        let conn = self.connect(REGISTRATIONS, op)?;
        let record = conn
            .query_row(
                &format!("{SELECT_REGISTRATIONS} WHERE id = ?1"),
                params![id],
                map_registration,
            )
            .optional()
            .map_err(|e| StoreError::classify(REGISTRATIONS, op, e))?;

        let Some(mut record) = record else {
            return Ok(None);
        };
        record.companions = query_members(&conn, Some(id))?;
        Ok(Some(record))
    }

    pub fn companions_for(&self, registration_id: i64) -> Result<Vec<CompanionRecord>, StoreError> {
        let conn = self.connect(&members_path(registration_id), Operation::List)?;
        query_members(&conn, Some(registration_id))
    }

    /// Every registration, newest first, each with its companions in entry order.
    pub fn registrations_newest_first(&self) -> Result<Vec<RegistrationRecord>, StoreError> {
        let conn = self.connect(REGISTRATIONS, Operation::List)?;
        list_registrations(&conn)
    }

    pub fn revision(&self) -> Result<Revision, StoreError> {
        let conn = self.connect(REGISTRATIONS, Operation::Get)?;
        read_revision(&conn)
    }

    /// Revision and list read in one transaction, so they describe the same state.
    pub fn snapshot(&self) -> Result<DashboardSnapshot, StoreError> {
        let op = Operation::List;
        let mut conn = self.connect(REGISTRATIONS, op)?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::classify(REGISTRATIONS, op, e))?;
        let revision = read_revision(&tx)?;
        let registrations = list_registrations(&tx)?;
        tx.commit()
            .map_err(|e| StoreError::classify(REGISTRATIONS, op, e))?;
        Ok(DashboardSnapshot::new(revision, registrations))
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

fn members_path(registration_id: i64) -> String {
    format!("{REGISTRATIONS}/{registration_id}/members")
}

fn read_revision(conn: &Connection) -> Result<Revision, StoreError> {
    conn.query_row(
        "SELECT (SELECT COALESCE(MAX(id), 0) FROM registrations),
                (SELECT COALESCE(MAX(id), 0) FROM members)",
        [],
        |row| {
            Ok(Revision {
                registrations: row.get(0)?,
                members: row.get(1)?,
            })
        },
    )
    .map_err(|e| StoreError::classify(REGISTRATIONS, Operation::Get, e))
}

fn list_registrations(conn: &Connection) -> Result<Vec<RegistrationRecord>, StoreError> {
    let op = Operation::List;
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_REGISTRATIONS} ORDER BY created_at DESC, id DESC"
        ))
        .map_err(|e| StoreError::classify(REGISTRATIONS, op, e))?;
    let rows = stmt
        .query_map([], map_registration)
        .map_err(|e| StoreError::classify(REGISTRATIONS, op, e))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(|e| StoreError::classify(REGISTRATIONS, op, e))?);
    }

    let mut members: HashMap<i64, Vec<CompanionRecord>> = HashMap::new();
    for companion in query_members(conn, None)? {
        members
            .entry(companion.registration_id)
            .or_default()
            .push(companion);
    }
    for record in &mut records {
        record.companions = members.remove(&record.id).unwrap_or_default();
    }
    Ok(records)
}

fn query_members(
    conn: &Connection,
    registration_id: Option<i64>,
) -> Result<Vec<CompanionRecord>, StoreError> {
    let op = Operation::List;
    let path = registration_id.map_or_else(|| "members".to_string(), members_path);

    let sql = match registration_id {
        Some(_) => format!("{SELECT_MEMBERS} WHERE registration_id = ?1 ORDER BY id ASC"),
        None => format!("{SELECT_MEMBERS} ORDER BY id ASC"),
    };
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::classify(&path, op, e))?;
    let rows = match registration_id {
        Some(id) => stmt.query_map(params![id], map_member),
        None => stmt.query_map([], map_member),
    }
    .map_err(|e| StoreError::classify(&path, op, e))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| StoreError::classify(&path, op, e))?);
    }
    Ok(out)
}

fn read_jersey(row: &rusqlite::Row<'_>, wanted_idx: usize) -> rusqlite::Result<JerseyRequest> {
    let wanted: bool = row.get(wanted_idx)?;
    let size: Option<String> = row.get(wanted_idx + 1)?;
    let size = size
        .map(|s| {
            s.parse::<JerseySize>().map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    wanted_idx + 1,
                    rusqlite::types::Type::Text,
                    err.into(),
                )
            })
        })
        .transpose()?;
    Ok(JerseyRequest { wanted, size })
}

fn map_registration(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegistrationRecord> {
    let receipt_id: Option<String> = row.get(8)?;
    let receipt = match receipt_id {
        Some(id) => Some(ReceiptRef {
            id,
            content_type: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            url: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(RegistrationRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        origin: row.get(2)?,
        age: row.get(3)?,
        jersey: read_jersey(row, 4)?,
        total_jerseys: row.get(6)?,
        total_due: row.get(7)?,
        receipt,
        created_at: row.get(11)?,
        companions: Vec::new(),
    })
}

fn map_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompanionRecord> {
    Ok(CompanionRecord {
        id: row.get(0)?,
        registration_id: row.get(1)?,
        name: row.get(2)?,
        age: row.get(3)?,
        jersey: read_jersey(row, 4)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rodada_schema::REGISTRATION_SCHEMA_V1;

    pub(crate) fn db_path(name: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        format!("/tmp/rodada-tests/{name}-{nanos}.db")
    }

    pub(crate) fn registration(name: &str, companions: Vec<CompanionV1>) -> RegistrationV1 {
        let mut reg = RegistrationV1 {
            schema: REGISTRATION_SCHEMA_V1.into(),
            name: name.into(),
            origin: "Maravatío".into(),
            age: 31,
            jersey: JerseyRequest::sized(JerseySize::M),
            companions,
            total_jerseys: 0,
            total_due: 0,
        };
        let table = rodada_schema::pricing::PriceTable::standard();
        reg.total_jerseys = reg.derived_jerseys();
        reg.total_due = reg.derived_total(&table);
        reg
    }

    pub(crate) fn companion(name: &str, jersey: JerseyRequest) -> CompanionV1 {
        CompanionV1 {
            name: name.into(),
            age: 20,
            jersey,
        }
    }

    #[test]
    fn insert_and_read_back() {
        let store = RegistrationStore::open(db_path("store-roundtrip")).expect("open");
        let reg = registration("Ana", vec![]);
        let receipt = ReceiptRef {
            id: "r-1".into(),
            content_type: "image/png".into(),
            url: "/receipts/r-1".into(),
        };

        let id = store
            .insert_registration(&reg, Some(&receipt), "2026-03-08T10:00:00.000Z")
            .expect("insert");
        store
            .insert_companion(id, &companion("Lucía", JerseyRequest::sized(JerseySize::XS)))
            .expect("companion");

        let record = store.registration(id).expect("get").expect("exists");
        assert_eq!(record.name, "Ana");
        assert_eq!(record.jersey, JerseyRequest::sized(JerseySize::M));
        assert_eq!(record.total_due, 280);
        assert_eq!(record.receipt, Some(receipt));
        assert_eq!(record.companions.len(), 1);
        assert_eq!(record.companions[0].jersey.size, Some(JerseySize::XS));

        assert!(store.registration(id + 1).expect("get").is_none());
    }

    #[test]
    fn lists_newest_first_with_companions_in_order() {
        let store = RegistrationStore::open(db_path("store-order")).expect("open");
        let first = store
            .insert_registration(&registration("first", vec![]), None, "2026-03-08T10:00:00.000Z")
            .expect("first");
        let second = store
            .insert_registration(&registration("second", vec![]), None, "2026-03-08T11:00:00.000Z")
            .expect("second");
        for name in ["a", "b", "c"] {
            store
                .insert_companion(first, &companion(name, JerseyRequest::none()))
                .expect("companion");
        }

        let list = store.registrations_newest_first().expect("list");
        let ids: Vec<_> = list.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert!(list[0].companions.is_empty());
        let names: Vec<_> = list[1].companions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(store.companions_for(first).expect("companions").len(), 3);
    }

    #[test]
    fn revision_moves_on_every_write() {
        let store = RegistrationStore::open(db_path("store-revision")).expect("open");
        let empty = store.revision().expect("revision");
        assert_eq!(empty, Revision::default());

        let id = store
            .insert_registration(&registration("Ana", vec![]), None, "2026-03-08T10:00:00.000Z")
            .expect("insert");
        let after_parent = store.revision().expect("revision");
        assert_eq!(after_parent.registrations, id);

        store
            .insert_companion(id, &companion("Lucía", JerseyRequest::none()))
            .expect("companion");
        let after_member = store.revision().expect("revision");
        assert_ne!(after_parent, after_member);
    }

    #[test]
    fn companion_for_missing_parent_is_rejected() {
        let store = RegistrationStore::open(db_path("store-orphan")).expect("open");
        let err = store
            .insert_companion(42, &companion("nadie", JerseyRequest::none()))
            .expect_err("foreign key");
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn snapshot_carries_stats() {
        let store = RegistrationStore::open(db_path("store-snapshot")).expect("open");
        let snapshot = store.snapshot().expect("empty snapshot");
        assert!(snapshot.registrations.is_empty());
        assert_eq!(snapshot.stats.revenue, 0);

        let reg = registration(
            "Ana",
            vec![companion("Lucía", JerseyRequest::sized(JerseySize::G))],
        );
        store
            .insert_registration(&reg, None, "2026-03-08T10:00:00.000Z")
            .expect("insert");

        let snapshot = store.snapshot().expect("snapshot");
        assert_eq!(snapshot.stats.registrations, 1);
        assert_eq!(snapshot.stats.jerseys, 2);
        assert_eq!(snapshot.stats.revenue, 560);
        assert_eq!(snapshot.revision.registrations, 1);
    }
}
