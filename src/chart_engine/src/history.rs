//! Lazy walk over a security's ticker history.

use std::{collections::VecDeque, time::Duration};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    directory::{SecurityDirectory, TickerValidityRecord},
    error::ChartError,
    request::Direction,
};

/// A validity record with its open ends resolved: NULL `min_date` becomes
/// the epoch and NULL `max_date` becomes `now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerSpan {
    pub ticker: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

impl TickerSpan {
    fn resolve(record: TickerValidityRecord, now: DateTime<Utc>) -> Self {
        Self {
            ticker: record.ticker,
            valid_from: record.min_date.unwrap_or(DateTime::UNIX_EPOCH),
            valid_to: record.max_date.unwrap_or(now),
        }
    }
}

/// Yields [`TickerSpan`]s nearest to the reference first.
///
/// The directory is not queried until the first [`next_span`](Self::next_span)
/// call, and that query is bounded by `query_timeout`. A caller that stops
/// pulling early never touches older history.
pub struct SecurityHistoryWalker<'d, D: ?Sized> {
    directory: &'d D,
    security_id: i64,
    reference: Option<DateTime<Utc>>,
    direction: Direction,
    now: DateTime<Utc>,
    query_timeout: Duration,
    pending: Option<VecDeque<TickerValidityRecord>>,
}

impl<'d, D: SecurityDirectory + ?Sized> SecurityHistoryWalker<'d, D> {
    /// `reference == None` walks from the latest record.
    pub fn new(
        directory: &'d D,
        security_id: i64,
        reference: Option<DateTime<Utc>>,
        direction: Direction,
        now: DateTime<Utc>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            security_id,
            reference,
            direction,
            now,
            query_timeout,
            pending: None,
        }
    }

    pub async fn next_span(&mut self) -> Result<Option<TickerSpan>, ChartError> {
        if self.pending.is_none() {
            let records = self.load().await?;
            self.pending = Some(records.into());
        }
        Ok(self
            .pending
            .as_mut()
            .and_then(VecDeque::pop_front)
            .map(|record| TickerSpan::resolve(record, self.now)))
    }

    async fn load(&self) -> Result<Vec<TickerValidityRecord>, ChartError> {
        let lookup = self.directory.lookup_validity_records(
            self.security_id,
            self.reference,
            self.direction,
        );
        let records = tokio::time::timeout(self.query_timeout, lookup)
            .await
            .map_err(|_| ChartError::QueryTimeout {
                security_id: self.security_id,
                after: self.query_timeout,
            })?
            .map_err(|source| ChartError::Directory {
                security_id: self.security_id,
                source,
            })?;

        debug!(
            security_id = self.security_id,
            direction = %self.direction,
            records = records.len(),
            "resolved ticker history"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::directory::InMemoryDirectory;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn renamed() -> InMemoryDirectory {
        let mut dir = InMemoryDirectory::new();
        dir.insert(1, TickerValidityRecord::new("OLD", None, Some(at(2020, 6, 1))));
        dir.insert(1, TickerValidityRecord::new("NEW", Some(at(2020, 6, 1)), None));
        dir
    }

    #[tokio::test]
    async fn resolves_open_ends() {
        let dir = renamed();
        let now = at(2024, 1, 1);
        let mut walker = SecurityHistoryWalker::new(
            &dir,
            1,
            Some(at(2021, 1, 1)),
            Direction::Backward,
            now,
            Duration::from_secs(1),
        );

        let first = walker.next_span().await.unwrap().unwrap();
        assert_eq!(
            first,
            TickerSpan {
                ticker: "NEW".into(),
                valid_from: at(2020, 6, 1),
                valid_to: now,
            }
        );
        let second = walker.next_span().await.unwrap().unwrap();
        assert_eq!(second.ticker, "OLD");
        assert_eq!(second.valid_from, DateTime::UNIX_EPOCH);
        assert!(walker.next_span().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn slow_directory_times_out() {
        let dir = renamed().with_delay(Duration::from_millis(500));
        let mut walker = SecurityHistoryWalker::new(
            &dir,
            1,
            None,
            Direction::Backward,
            at(2024, 1, 1),
            Duration::from_millis(10),
        );
        let err = walker.next_span().await.unwrap_err();
        assert!(matches!(err, ChartError::QueryTimeout { security_id: 1, .. }));
        assert!(err.is_timeout());
    }
}
