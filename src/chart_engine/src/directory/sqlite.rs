//! Directory backed by the `security_ticker_history` table.
//!
//! Dates are RFC-3339 UTC text with millisecond precision, so the SQL string
//! comparisons below order the same way the instants do.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::debug;

use crate::{
    db::connection::connect_sqlite,
    directory::{DirectoryError, SecurityDirectory, TickerValidityRecord},
    models::{NewTickerHistory, TickerHistoryRow},
    request::Direction,
    schema::security_ticker_history::dsl as sth,
    tz,
};

/// Opens a tuned connection per lookup and queries on a blocking thread.
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    database_url: String,
}

impl SqliteDirectory {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Synchronous form of the lookup, on an open connection.
pub fn load_validity_records(
    conn: &mut SqliteConnection,
    security_id: i64,
    reference: Option<DateTime<Utc>>,
    direction: Direction,
) -> Result<Vec<TickerValidityRecord>, DirectoryError> {
    let mut query = sth::security_ticker_history
        .select(TickerHistoryRow::as_select())
        .filter(sth::security_id.eq(security_id))
        .into_boxed();

    match (reference.map(tz::to_rfc3339_millis), direction) {
        (None, _) => {
            query = query.order((sth::min_date.is_null().asc(), sth::min_date.desc()));
        }
        (Some(r), Direction::Backward) => {
            query = query
                .filter(sth::min_date.is_null().or(sth::min_date.lt(r)))
                .order((sth::min_date.is_null().asc(), sth::min_date.desc()));
        }
        (Some(r), Direction::Forward) => {
            query = query
                .filter(sth::max_date.is_null().or(sth::max_date.gt(r)))
                .order((sth::min_date.is_null().desc(), sth::min_date.asc()));
        }
    }

    let rows: Vec<TickerHistoryRow> = query.load(conn)?;
    rows.into_iter().map(TickerHistoryRow::into_record).collect()
}

/// Inserts one validity record for `security_id`.
pub fn insert_ticker_history(
    conn: &mut SqliteConnection,
    security_id: i64,
    record: &TickerValidityRecord,
) -> anyhow::Result<usize> {
    let row = NewTickerHistory {
        security_id,
        ticker: &record.ticker,
        min_date: record.min_date.map(tz::to_rfc3339_millis),
        max_date: record.max_date.map(tz::to_rfc3339_millis),
    };
    diesel::insert_into(sth::security_ticker_history)
        .values(&row)
        .execute(conn)
        .with_context(|| format!("insert ticker history {} for security {security_id}", record.ticker))
}

#[async_trait]
impl SecurityDirectory for SqliteDirectory {
    async fn lookup_validity_records(
        &self,
        security_id: i64,
        reference: Option<DateTime<Utc>>,
        direction: Direction,
    ) -> Result<Vec<TickerValidityRecord>, DirectoryError> {
        let url = self.database_url.clone();
        let records = tokio::task::spawn_blocking(move || {
            let mut conn = connect_sqlite(&url)?;
            load_validity_records(&mut conn, security_id, reference, direction)
        })
        .await??;

        debug!(security_id, %direction, records = records.len(), "loaded ticker history");
        Ok(records)
    }
}
