use std::{io::Read, path::PathBuf};

use anyhow::{Context, Result};
use chart_engine::{
    ChartRequest, ChartService,
    config::load_config_path,
    db::{connection::connect_sqlite, migrate},
    directory::{SqliteDirectory, TickerValidityRecord, sqlite::insert_ticker_history},
    tz,
};
use clap::{Args, Parser, Subcommand};
use market_data_ingestor::providers::polygon_rest::PolygonProvider;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Chart data CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply embedded migrations to the ticker-history database.
    Migrate {
        #[arg(long, value_name = "URL")]
        database: String,
    },
    Tickers(TickersCmd),
    /// Run one chart request and print the JSON response.
    Chart {
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
        /// Request JSON; read from stdin when omitted.
        #[arg(long, value_name = "JSON")]
        request: Option<String>,
    },
}

#[derive(Args)]
struct TickersCmd {
    #[command(subcommand)]
    sub: TickersSub,
}

#[derive(Subcommand)]
enum TickersSub {
    /// Record that `ticker` identified a security between two instants.
    Add {
        #[arg(long, value_name = "URL")]
        database: String,
        #[arg(long)]
        security_id: i64,
        #[arg(long)]
        ticker: String,
        /// RFC-3339 start; omitted means earliest known.
        #[arg(long)]
        from: Option<String>,
        /// RFC-3339 end; omitted means still active.
        #[arg(long)]
        to: Option<String>,
    },
}

fn parse_opt_ts(value: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    value
        .map(|v| tz::parse_ts_to_utc(v).with_context(|| format!("bad timestamp {v:?}")))
        .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Migrate { database } => {
            let applied = migrate::run_sqlite(&database)?;
            info!(applied, "migrations done");
        }
        Cmd::Tickers(TickersCmd {
            sub:
                TickersSub::Add {
                    database,
                    security_id,
                    ticker,
                    from,
                    to,
                },
        }) => {
            let record = TickerValidityRecord::new(
                ticker,
                parse_opt_ts(from.as_deref())?,
                parse_opt_ts(to.as_deref())?,
            );
            let mut conn = connect_sqlite(&database)?;
            insert_ticker_history(&mut conn, security_id, &record)?;
            info!(security_id, ticker = %record.ticker, "ticker history added");
        }
        Cmd::Chart { config, request } => {
            let cfg = load_config_path(&config)?;
            let json = match request {
                Some(json) => json,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf).context("read request from stdin")?;
                    buf
                }
            };
            let request = ChartRequest::from_json(&json)?;

            let provider = PolygonProvider::from_env(&cfg.provider.base_url, cfg.requests_per_minute()?)?;
            let service = ChartService::new(
                SqliteDirectory::new(cfg.database_url.clone()),
                provider,
                cfg.calendar()?,
                cfg.settings(),
            );

            let response = service.get_chart_data(&request).await?;
            println!("{}", response.to_json()?);
        }
    }

    Ok(())
}
