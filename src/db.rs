use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use crate::error::{ReportError, Result};
use crate::models::{DailyRollup, KpiSummary, Report, ReportListing, TopProduct};

const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Opens (creating if needed) the report database
///
/// WAL journaling lets readers proceed while a report is being written.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Stores a new report and returns its id
///
/// The insert runs in its own transaction; ids come from an AUTOINCREMENT
/// key and are never reused.
pub async fn create_report(
    pool: &SqlitePool,
    original_filename: &str,
    kpi: &KpiSummary,
    top_products: &[TopProduct],
    daily: &[DailyRollup],
    chart_file: &str,
) -> Result<i64> {
    let created_at = Local::now()
        .naive_local()
        .with_nanosecond(0)
        .unwrap_or_else(|| Local::now().naive_local());

    let kpi_json = serde_json::to_string(kpi)?;
    let top_products_json = serde_json::to_string(top_products)?;
    let daily_json = serde_json::to_string(daily)?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        INSERT INTO reports
        (created_at, original_filename, kpi_json, top_products_json, daily_json, chart_file)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(created_at.format(CREATED_AT_FORMAT).to_string())
    .bind(original_filename)
    .bind(kpi_json)
    .bind(top_products_json)
    .bind(daily_json)
    .bind(chart_file)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let id = result.last_insert_rowid();
    info!(report_id = id, original_filename, "stored report");
    Ok(id)
}

pub async fn get_report(pool: &SqlitePool, id: i64) -> Result<Report> {
    let row = sqlx::query(
        r#"
        SELECT id, created_at, original_filename, kpi_json, top_products_json, daily_json, chart_file
        FROM reports
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ReportError::NotFound(id))?;

    let created_at: String = row.try_get("created_at")?;
    let kpi_json: String = row.try_get("kpi_json")?;
    let top_products_json: String = row.try_get("top_products_json")?;
    let daily_json: String = row.try_get("daily_json")?;

    Ok(Report {
        id: row.try_get("id")?,
        created_at: parse_created_at(id, &created_at)?,
        original_filename: row.try_get("original_filename")?,
        kpi: decode(id, "kpi", &kpi_json)?,
        top_products: decode(id, "top_products", &top_products_json)?,
        daily: decode(id, "daily", &daily_json)?,
        chart_file: row.try_get("chart_file")?,
    })
}

/// The `limit` most recently created reports, newest first, without payloads
pub async fn list_recent(pool: &SqlitePool, limit: u32) -> Result<Vec<ReportListing>> {
    let rows = sqlx::query(
        "SELECT id, created_at, original_filename FROM reports ORDER BY id DESC LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    let mut listings = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.try_get("id")?;
        let created_at: String = row.try_get("created_at")?;
        listings.push(ReportListing {
            id,
            created_at: parse_created_at(id, &created_at)?,
            original_filename: row.try_get("original_filename")?,
        });
    }

    Ok(listings)
}

fn parse_created_at(id: i64, value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, CREATED_AT_FORMAT).map_err(|err| {
        ReportError::CorruptRecord {
            id,
            reason: format!("created_at {value:?}: {err}"),
        }
    })
}

fn decode<T: DeserializeOwned>(id: i64, field: &str, json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|err| ReportError::CorruptRecord {
        id,
        reason: format!("{field}: {err}"),
    })
}
