//! Diesel rows for [`crate::schema::security_ticker_history`].

use diesel::prelude::*;

use crate::{
    directory::{DirectoryError, TickerValidityRecord},
    schema::security_ticker_history,
    tz,
};

/// A stored validity record; dates are RFC-3339 UTC text.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = security_ticker_history, check_for_backend(diesel::sqlite::Sqlite))]
pub struct TickerHistoryRow {
    pub ticker: String,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
}

impl TickerHistoryRow {
    pub fn into_record(self) -> Result<TickerValidityRecord, DirectoryError> {
        let TickerHistoryRow {
            ticker,
            min_date,
            max_date,
        } = self;
        let parse = |value: Option<String>| {
            value
                .map(|v| {
                    tz::parse_ts_to_utc(&v).map_err(|_| DirectoryError::MalformedDate {
                        ticker: ticker.clone(),
                        value: v,
                    })
                })
                .transpose()
        };
        let min_date = parse(min_date)?;
        let max_date = parse(max_date)?;
        Ok(TickerValidityRecord {
            ticker,
            min_date,
            max_date,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = security_ticker_history)]
pub struct NewTickerHistory<'a> {
    pub security_id: i64,
    pub ticker: &'a str,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
}
