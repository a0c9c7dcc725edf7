use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    directory::{DirectoryError, SecurityDirectory, TickerValidityRecord, select_records},
    request::Direction,
};

/// Directory held in memory; applies the same rules as the SQL query.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    records: HashMap<i64, Vec<TickerValidityRecord>>,
    delay: Option<Duration>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` before answering each lookup.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&mut self, security_id: i64, record: TickerValidityRecord) {
        self.records.entry(security_id).or_default().push(record);
    }
}

#[async_trait]
impl SecurityDirectory for InMemoryDirectory {
    async fn lookup_validity_records(
        &self,
        security_id: i64,
        reference: Option<DateTime<Utc>>,
        direction: Direction,
    ) -> Result<Vec<TickerValidityRecord>, DirectoryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let records = self.records.get(&security_id).cloned().unwrap_or_default();
        Ok(select_records(records, reference, direction))
    }
}
