use rodada_schema::form::ReceiptPolicy;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const DEFAULT_MAX_RECEIPT_BYTES: usize = 5 * 1024 * 1024;
const SESSION_TTL_HOURS: RangeInclusive<i64> = 1..=24 * 365;
const LIVE_POLL_MS: RangeInclusive<u64> = 1..=60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind: String,
    pub db_path: PathBuf,
    pub receipts_dir: PathBuf,
    pub public_url: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub receipt_policy: ReceiptPolicy,
    pub max_receipt_bytes: usize,
    pub session_ttl_hours: i64,
    pub live_poll: Duration,
    pub static_dir: Option<PathBuf>,
    pub allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind: or_default(&var, "RODADA_BIND", "0.0.0.0:8080"),
            db_path: or_default(&var, "RODADA_DB_PATH", "rodada.db").into(),
            receipts_dir: or_default(&var, "RODADA_RECEIPTS_DIR", "receipts").into(),
            public_url: var("RODADA_PUBLIC_URL").unwrap_or_default(),
            admin_email: var("RODADA_ADMIN_EMAIL"),
            admin_password: var("RODADA_ADMIN_PASSWORD"),
            receipt_policy: parse_policy(var("RODADA_RECEIPT_POLICY"))?,
            max_receipt_bytes: parse_or(
                &var,
                "RODADA_MAX_RECEIPT_BYTES",
                DEFAULT_MAX_RECEIPT_BYTES,
            )?,
            session_ttl_hours: parse_in(
                &var,
                "RODADA_SESSION_TTL_HOURS",
                12,
                SESSION_TTL_HOURS,
            )?,
            live_poll: Duration::from_millis(parse_in(
                &var,
                "RODADA_LIVE_POLL_MS",
                750,
                LIVE_POLL_MS,
            )?),
            static_dir: var("RODADA_STATIC_DIR").map(PathBuf::from),
            allowed_origin: var("RODADA_ALLOWED_ORIGIN"),
        })
    }
}

fn or_default(var: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(value) = var(key) else {
        info!("{key} not set, using default: {default}");
        return Ok(default);
    };
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value,
        reason: e.to_string(),
    })
}

fn parse_in<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: FromStr + Display + PartialOrd,
    T::Err: Display,
{
    let value = parse_or(var, key, default)?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: format!("must be between {} and {}", range.start(), range.end()),
        });
    }
    Ok(value)
}

fn parse_policy(value: Option<String>) -> Result<ReceiptPolicy, ConfigError> {
    match value.as_deref().map(str::trim) {
        None => Ok(ReceiptPolicy::Required),
        Some(v) if v.eq_ignore_ascii_case("required") => Ok(ReceiptPolicy::Required),
        Some(v) if v.eq_ignore_ascii_case("optional") => Ok(ReceiptPolicy::Optional),
        Some(v) => Err(ConfigError::Invalid {
            key: "RODADA_RECEIPT_POLICY",
            value: v.to_string(),
            reason: "expected 'required' or 'optional'".into(),
        }),
    }
}
