use crate::errors::{AuthError, Operation, StoreError};
use crate::store::ensure_parent_dir;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rodada_schema::access::normalize_email;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const ACCOUNTS: &str = "accounts";
const SESSIONS: &str = "sessions";
const HASH_ROUNDS: u32 = 10_000;
// Unknown emails are checked against this pair so every failed sign-in costs the same.
const UNKNOWN_SALT: &str = "rodada-unknown-account";
const UNKNOWN_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub account: Account,
    pub expires_at: DateTime<Utc>,
}

/// Email/password accounts and their session tokens.
#[derive(Clone, Debug)]
pub struct AccountStore {
    db_path: Arc<PathBuf>,
    session_ttl: Duration,
}

impl AccountStore {
    pub fn open(path: impl AsRef<Path>, session_ttl: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;

        let store = Self {
            db_path: Arc::new(path.to_path_buf()),
            session_ttl,
        };
        store
            .connect(ACCOUNTS)?
            .execute_batch(
                "
                PRAGMA journal_mode=WAL;
                CREATE TABLE IF NOT EXISTS accounts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    salt TEXT NOT NULL,
                    password_hash TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS sessions (
                    token TEXT PRIMARY KEY,
                    account_id INTEGER NOT NULL REFERENCES accounts(id),
                    expires_at TEXT NOT NULL
                );
                ",
            )
            .map_err(|e| StoreError::classify(ACCOUNTS, Operation::Create, e))?;
        Ok(store)
    }

    fn connect(&self, path: &str) -> Result<Connection, StoreError> {
        Connection::open(&*self.db_path).map_err(|e| StoreError::classify(path, Operation::Get, e))
    }

    pub fn create_account(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        let email = normalize_email(email);
        let conn = self.connect(ACCOUNTS)?;
        if find_account(&conn, &email)?.is_some() {
            return Err(AuthError::AccountExists(email));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let hash = hash_password(&salt, password);
        conn.execute(
            "INSERT INTO accounts (email, salt, password_hash) VALUES (?1, ?2, ?3)",
            params![email, salt, hash],
        )
        .map_err(|e| StoreError::classify(ACCOUNTS, Operation::Create, e))?;

        Ok(Account {
            id: conn.last_insert_rowid(),
            email,
        })
    }

    /// Creates the account unless it already exists. Existing passwords are left alone.
    pub fn ensure_account(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        match self.create_account(email, password) {
            Ok(account) => {
                info!(email = %account.email, "bootstrapped account");
                Ok(account)
            }
            Err(AuthError::AccountExists(email)) => {
                let conn = self.connect(ACCOUNTS)?;
                let (account, _, _) =
                    find_account(&conn, &email)?.ok_or(AuthError::InvalidCredentials)?;
                Ok(account)
            }
            Err(err) => Err(err),
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let conn = self.connect(ACCOUNTS)?;
        let account = match find_account(&conn, &email)? {
            Some((account, salt, stored_hash)) => {
                verify_password(&salt, &stored_hash, password).then_some(account)
            }
            None => {
                std::hint::black_box(verify_password(UNKNOWN_SALT, UNKNOWN_HASH, password));
                None
            }
        };
        let Some(account) = account else {
            return Err(AuthError::InvalidCredentials);
        };

        let now = Utc::now();
        conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![timestamp(now)],
        )
        .map_err(|e| StoreError::classify(SESSIONS, Operation::Delete, e))?;

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = now + self.session_ttl;
        conn.execute(
            "INSERT INTO sessions (token, account_id, expires_at) VALUES (?1, ?2, ?3)",
            params![token, account.id, timestamp(expires_at)],
        )
        .map_err(|e| StoreError::classify(SESSIONS, Operation::Create, e))?;

        Ok(Session {
            token,
            account,
            expires_at,
        })
    }

    pub fn account_for_token(&self, token: &str) -> Result<Option<Account>, AuthError> {
        self.account_for_token_at(token, Utc::now())
    }

    fn account_for_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AuthError> {
        let conn = self.connect(SESSIONS)?;
        let row = conn
            .query_row(
                "SELECT accounts.id, accounts.email, sessions.expires_at
                 FROM sessions JOIN accounts ON accounts.id = sessions.account_id
                 WHERE sessions.token = ?1",
                params![token],
                |row| {
                    Ok((
                        Account {
                            id: row.get(0)?,
                            email: row.get(1)?,
                        },
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| StoreError::classify(SESSIONS, Operation::Get, e))?;

        let Some((account, expires_at)) = row else {
            return Ok(None);
        };
        let expires_at = DateTime::parse_from_rfc3339(&expires_at).map_err(|e| {
            StoreError::Corrupt {
                path: SESSIONS.into(),
                detail: e.to_string(),
            }
        })?;
        if expires_at <= now {
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
                .map_err(|e| StoreError::classify(SESSIONS, Operation::Delete, e))?;
            return Ok(None);
        }
        Ok(Some(account))
    }

    pub fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let conn = self.connect(SESSIONS)?;
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| StoreError::classify(SESSIONS, Operation::Delete, e))?;
        Ok(())
    }
}

fn find_account(
    conn: &Connection,
    email: &str,
) -> Result<Option<(Account, String, String)>, StoreError> {
    conn.query_row(
        "SELECT id, email, salt, password_hash FROM accounts WHERE email = ?1",
        params![email],
        |row| {
            Ok((
                Account {
                    id: row.get(0)?,
                    email: row.get(1)?,
                },
                row.get(2)?,
                row.get(3)?,
            ))
        },
    )
    .optional()
    .map_err(|e| StoreError::classify(ACCOUNTS, Operation::Get, e))
}

/// Fixed-width UTC timestamps so expiry can be compared as text in SQL.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn verify_password(salt: &str, stored_hash: &str, password: &str) -> bool {
    digests_match(&hash_password(salt, password), stored_hash)
}

/// Compares every byte regardless of where the first difference is.
fn digests_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |diff, (x, y)| diff | (x ^ y))
            == 0
}

#[cfg(test)]
thread_local! {
    static HASHES: std::cell::Cell<u32> = const { std::cell::Cell::new(0) };
}

fn hash_password(salt: &str, password: &str) -> String {
    #[cfg(test)]
    HASHES.with(|count| count.set(count.get() + 1));
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..HASH_ROUNDS {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(salt.as_bytes())
            .finalize();
    }
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::db_path;

    fn store(name: &str) -> AccountStore {
        AccountStore::open(db_path(name), Duration::hours(12)).expect("open")
    }

    #[test]
    fn sign_in_with_normalized_email() {
        let store = store("auth-sign-in");
        store
            .create_account("EventoMujer@gmail.com", "pedalea")
            .expect("create");

        let session = store
            .sign_in("  eventomujer@GMAIL.com", "pedalea")
            .expect("sign in");
        assert_eq!(session.account.email, "eventomujer@gmail.com");

        let account = store
            .account_for_token(&session.token)
            .expect("lookup")
            .expect("active");
        assert_eq!(account, session.account);
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let store = store("auth-invalid");
        store.create_account("a@rodada.mx", "secreto").expect("create");

        let wrong_password = store.sign_in("a@rodada.mx", "otro").expect_err("wrong password");
        let unknown = store.sign_in("b@rodada.mx", "secreto").expect_err("unknown");
        assert_eq!(wrong_password.to_string(), unknown.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    }

    fn hashes_during(f: impl FnOnce()) -> u32 {
        let before = HASHES.with(|count| count.get());
        f();
        HASHES.with(|count| count.get()) - before
    }

    #[test]
    fn unknown_email_costs_a_full_hash() {
        let store = store("auth-unknown-cost");
        store.create_account("a@rodada.mx", "secreto").expect("create");

        let wrong_password = hashes_during(|| {
            assert!(store.sign_in("a@rodada.mx", "otro").is_err());
        });
        let unknown = hashes_during(|| {
            assert!(store.sign_in("nadie@rodada.mx", "otro").is_err());
        });
        assert_eq!(wrong_password, 1);
        assert_eq!(unknown, wrong_password);
    }

    #[test]
    fn digest_comparison() {
        let hash = hash_password("s1", "pw");
        assert!(digests_match(&hash, &hash.clone()));
        assert!(!digests_match(&hash, &hash_password("s1", "px")));
        assert!(!digests_match(&hash, &hash[..63]));
        assert!(!digests_match("", &hash));
        assert!(digests_match("", ""));
        assert_eq!(UNKNOWN_HASH.len(), hash.len());
    }

    #[test]
    fn duplicate_accounts_are_rejected_but_ensure_is_idempotent() {
        let store = store("auth-duplicate");
        let created = store.ensure_account("a@rodada.mx", "uno").expect("first");
        assert!(matches!(
            store.create_account("A@rodada.mx", "dos"),
            Err(AuthError::AccountExists(_))
        ));

        let again = store.ensure_account("a@rodada.mx", "dos").expect("second");
        assert_eq!(created, again);
        assert!(store.sign_in("a@rodada.mx", "uno").is_ok());
        assert!(store.sign_in("a@rodada.mx", "dos").is_err());
    }

    #[test]
    fn sessions_expire_and_sign_out() {
        let store = store("auth-expiry");
        store.create_account("a@rodada.mx", "uno").expect("create");
        let session = store.sign_in("a@rodada.mx", "uno").expect("sign in");

        let later = session.expires_at + Duration::seconds(1);
        assert!(store
            .account_for_token_at(&session.token, later)
            .expect("lookup")
            .is_none());

        store.sign_out(&session.token).expect("sign out");
        assert!(store
            .account_for_token(&session.token)
            .expect("lookup")
            .is_none());
        assert!(store.account_for_token("nope").expect("lookup").is_none());
    }

    fn session_rows(store: &AccountStore) -> i64 {
        store
            .connect(SESSIONS)
            .expect("connect")
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .expect("count")
    }

    #[test]
    fn expired_sessions_are_purged() {
        let path = db_path("auth-purge");
        let instant = AccountStore::open(&path, Duration::zero()).expect("open");
        instant.create_account("a@rodada.mx", "uno").expect("create");

        let first = instant.sign_in("a@rodada.mx", "uno").expect("first");
        assert_eq!(session_rows(&instant), 1);
        instant.sign_in("a@rodada.mx", "uno").expect("second");
        assert_eq!(session_rows(&instant), 1);
        assert!(instant
            .account_for_token(&first.token)
            .expect("lookup")
            .is_none());

        let store = AccountStore::open(&path, Duration::hours(12)).expect("reopen");
        let session = store.sign_in("a@rodada.mx", "uno").expect("long session");
        assert_eq!(session_rows(&store), 1);

        let later = session.expires_at + Duration::seconds(1);
        assert!(store
            .account_for_token_at(&session.token, later)
            .expect("lookup")
            .is_none());
        assert_eq!(session_rows(&store), 0);
    }

    #[test]
    fn empty_password_is_rejected() {
        let store = store("auth-empty");
        assert!(matches!(
            store.create_account("a@rodada.mx", ""),
            Err(AuthError::EmptyPassword)
        ));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("s1", "pw"), hash_password("s2", "pw"));
        assert_eq!(hash_password("s1", "pw"), hash_password("s1", "pw"));
        assert_eq!(hash_password("s1", "pw").len(), 64);
    }
}
