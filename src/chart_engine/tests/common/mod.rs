#![allow(dead_code)]

use std::path::PathBuf;

use chart_engine::db::{connection, migrate};
use chart_engine::directory::{TickerValidityRecord, sqlite::insert_ticker_history};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use market_data_ingestor::models::bar::Bar;
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn seed(conn: &mut SqliteConnection, security_id: i64, records: &[TickerValidityRecord]) {
    for r in records {
        insert_ticker_history(conn, security_id, r).expect("insert ticker history");
    }
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Wall-clock time in New York converted to UTC.
pub fn ny(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    New_York
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

pub fn flat_bar(ts: DateTime<Utc>, price: f64, volume: f64) -> Bar {
    Bar::new(ts, price, price + 1.0, price - 1.0, price, volume)
}

/// `step`-wide bars from `from` (inclusive) to `to` (exclusive), New York
/// wall clock, on `day`. Prices count up from `first_price`.
pub fn session_bars(
    day: NaiveDate,
    from: (u32, u32),
    to: (u32, u32),
    step: Duration,
    first_price: f64,
) -> Vec<Bar> {
    let at = |(h, m): (u32, u32)| {
        let naive = day.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap());
        New_York.from_local_datetime(&naive).single().unwrap().with_timezone(&Utc)
    };
    let (start, end) = (at(from), at(to));
    let mut out = Vec::new();
    let mut t = start;
    let mut price = first_price;
    while t < end {
        out.push(flat_bar(t, price, 1.0));
        t += step;
        price += 1.0;
    }
    out
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
