//! Security directory: which ticker identified a security, and when.
//!
//! A security that was renamed or relisted has several validity records.
//! [`SecurityDirectory::lookup_validity_records`] returns the ones relevant
//! to a walk from a reference instant, nearest to the reference first:
//!
//! - no reference ("use latest"): every record, newest `min_date` first;
//! - [`Direction::Backward`]: records that began before the reference,
//!   newest `min_date` first;
//! - [`Direction::Forward`]: records still valid after the reference,
//!   oldest `min_date` first.
//!
//! A NULL `min_date` is the earliest record, so it sorts last when
//! descending and first when ascending.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::request::Direction;

pub use memory::InMemoryDirectory;
pub use sqlite::SqliteDirectory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerValidityRecord {
    pub ticker: String,
    /// `None` means earliest known.
    pub min_date: Option<DateTime<Utc>>,
    /// `None` means currently active.
    pub max_date: Option<DateTime<Utc>>,
}

impl TickerValidityRecord {
    pub fn new(
        ticker: impl Into<String>,
        min_date: Option<DateTime<Utc>>,
        max_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            min_date,
            max_date,
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Database(#[from] anyhow::Error),

    #[error("ticker history query failed")]
    Query(#[from] diesel::result::Error),

    #[error("ticker history task failed")]
    Task(#[from] tokio::task::JoinError),

    #[error("ticker {ticker}: stored date {value:?} is not RFC-3339")]
    MalformedDate { ticker: String, value: String },
}

#[async_trait]
pub trait SecurityDirectory: Send + Sync {
    /// Validity records for `security_id`, ordered nearest to `reference`
    /// first. `None` asks for every record, newest first.
    async fn lookup_validity_records(
        &self,
        security_id: i64,
        reference: Option<DateTime<Utc>>,
        direction: Direction,
    ) -> Result<Vec<TickerValidityRecord>, DirectoryError>;
}

#[async_trait]
impl<T: SecurityDirectory + ?Sized> SecurityDirectory for std::sync::Arc<T> {
    async fn lookup_validity_records(
        &self,
        security_id: i64,
        reference: Option<DateTime<Utc>>,
        direction: Direction,
    ) -> Result<Vec<TickerValidityRecord>, DirectoryError> {
        (**self)
            .lookup_validity_records(security_id, reference, direction)
            .await
    }
}

/// Applies the directory's filter and ordering rules to an unordered set.
pub fn select_records(
    records: impl IntoIterator<Item = TickerValidityRecord>,
    reference: Option<DateTime<Utc>>,
    direction: Direction,
) -> Vec<TickerValidityRecord> {
    // `None < Some(_)`, which is exactly "NULL min_date is earliest".
    let mut out: Vec<_> = match (reference, direction) {
        (None, _) => records.into_iter().collect(),
        (Some(r), Direction::Backward) => records
            .into_iter()
            .filter(|rec| rec.min_date.is_none_or(|min| min < r))
            .collect(),
        (Some(r), Direction::Forward) => records
            .into_iter()
            .filter(|rec| rec.max_date.is_none_or(|max| max > r))
            .collect(),
    };

    match (reference, direction) {
        (Some(_), Direction::Forward) => out.sort_by_key(|rec| rec.min_date),
        _ => out.sort_by(|a, b| b.min_date.cmp(&a.min_date)),
    }
    out
}
