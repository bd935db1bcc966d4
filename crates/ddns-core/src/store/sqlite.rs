// # SQLite Record Store
//
// Persistent implementation of RecordStore backed by a single `domains`
// table.
//
// ## Schema
//
// ```sql
// CREATE TABLE domains (
//     id INTEGER PRIMARY KEY AUTOINCREMENT,
//     service TEXT NOT NULL,
//     domain_name TEXT NOT NULL UNIQUE,
//     record_id TEXT DEFAULT NULL,
//     current_ip TEXT NOT NULL,
//     last_updated TEXT NOT NULL,
//     created_at TEXT NOT NULL,
//     UNIQUE(service, domain_name)
// );
// ```
//
// Timestamps are RFC 3339 text with microsecond precision.
//
// ## Atomicity
//
// Inserts are single statements. `update_ip` reads the previous timestamp
// and writes the new values in one transaction, so a failure leaves the row
// untouched.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::Error;
use crate::traits::record_store::{DomainRecord, RecordStore, advance_timestamp, validate_key};

const CREATE_DOMAINS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS domains (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        service TEXT NOT NULL,
        domain_name TEXT NOT NULL UNIQUE,
        record_id TEXT DEFAULT NULL,
        current_ip TEXT NOT NULL CHECK (current_ip <> ''),
        last_updated TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE(service, domain_name)
    )
"#;

const SELECT_COLUMNS: &str =
    "SELECT service, domain_name, record_id, current_ip, last_updated, created_at FROM domains";

/// SQLite record store
///
/// One instance is meant to be shared by every adapter in the process
/// (`Arc<dyn RecordStore>`).
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::store::SqliteRecordStore;
/// use ddns_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteRecordStore::open("/var/lib/ddns/ddns.db").await?;
///
///     store.add_service("cloudflare", "example.com", "1.2.3.4".parse()?, Some("rid")).await?;
///     store.update_ip("cloudflare", "example.com", "5.6.7.8".parse()?).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open or create a database file
    ///
    /// Creates missing parent directories and the `domains` table.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        tracing::info!("SQLite record store opened at {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory database
    ///
    /// The pool is pinned to a single long-lived connection so every query
    /// sees the same database.
    pub async fn in_memory() -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        tracing::debug!("SQLite record store opened in memory");
        Ok(store)
    }

    /// Open `location`, treating `:memory:` as an in-memory database
    pub async fn connect(location: &str) -> Result<Self, Error> {
        if location == ":memory:" {
            Self::in_memory().await
        } else {
            Self::open(location).await
        }
    }

    async fn create_tables(&self) -> Result<(), Error> {
        sqlx::query(CREATE_DOMAINS_TABLE).execute(&self.pool).await?;
        tracing::debug!("Verified that the domains table is present");
        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> Result<DomainRecord, Error> {
        let current_ip: String = row.try_get("current_ip")?;
        let last_updated: String = row.try_get("last_updated")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(DomainRecord {
            service: row.try_get("service")?,
            domain_name: row.try_get("domain_name")?,
            record_id: row.try_get("record_id")?,
            current_ip: current_ip.parse().map_err(|_| {
                Error::state_store(format!("Invalid IPv4 address in store: '{}'", current_ip))
            })?,
            last_updated: parse_timestamp(&last_updated)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::state_store(format!("Invalid timestamp in store '{}': {}", value, e)))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn add_service(
        &self,
        service: &str,
        domain_name: &str,
        current_ip: Ipv4Addr,
        record_id: Option<&str>,
    ) -> Result<(), Error> {
        validate_key(service, domain_name)?;

        let record = DomainRecord::new(service, domain_name, current_ip, record_id);

        let result = sqlx::query(
            "INSERT INTO domains (service, domain_name, record_id, current_ip, last_updated, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.service)
        .bind(&record.domain_name)
        .bind(record.record_id.as_deref())
        .bind(record.current_ip.to_string())
        .bind(format_timestamp(record.last_updated))
        .bind(format_timestamp(record.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(
                    "Added record: service={}, domain={}, ip={}",
                    service,
                    domain_name,
                    current_ip
                );
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::duplicate(service, domain_name))
            }
            Err(e) => {
                tracing::error!("SQLite error while adding {}: {}", domain_name, e);
                Err(e.into())
            }
        }
    }

    async fn update_ip(
        &self,
        service: &str,
        domain_name: &str,
        current_ip: Ipv4Addr,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT last_updated FROM domains WHERE domain_name = ?")
            .bind(domain_name)
            .fetch_optional(&mut *tx)
            .await?;

        // Dropping `tx` without commit rolls back
        let Some(row) = row else {
            return Err(Error::not_found(domain_name));
        };

        let previous: String = row.try_get("last_updated")?;
        let last_updated = advance_timestamp(parse_timestamp(&previous)?);

        sqlx::query("UPDATE domains SET current_ip = ?, last_updated = ? WHERE domain_name = ?")
            .bind(current_ip.to_string())
            .bind(format_timestamp(last_updated))
            .bind(domain_name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Updated {} on {} to {}", domain_name, service, current_ip);
        Ok(())
    }

    async fn retrieve_record(&self, domain_name: &str) -> Result<Option<DomainRecord>, Error> {
        let row = sqlx::query(&format!("{} WHERE domain_name = ?", SELECT_COLUMNS))
            .bind(domain_name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn list_records(&self) -> Result<Vec<DomainRecord>, Error> {
        let rows = sqlx::query(&format!("{} ORDER BY domain_name", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn reset(&self) -> Result<(), Error> {
        tracing::warn!("Record store reset requested; dropping the domains table");

        sqlx::query("DROP TABLE IF EXISTS domains")
            .execute(&self.pool)
            .await?;
        self.create_tables().await?;

        tracing::info!("domains table has been recreated");
        Ok(())
    }
}
