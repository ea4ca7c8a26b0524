use std::io;

use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::chart::ChartRenderer;
use crate::db;
use crate::error::{ReportError, Result};
use crate::ingest::{self, RawTable};
use crate::models::{Report, ReportListing};
use crate::summary;

/// Entry point for callers: submit uploads, fetch and browse stored reports
#[derive(Debug, Clone)]
pub struct ReportService {
    pool: SqlitePool,
    charts: ChartRenderer,
}

impl ReportService {
    pub fn new(pool: SqlitePool, charts: ChartRenderer) -> Self {
        Self { pool, charts }
    }

    pub fn charts(&self) -> &ChartRenderer {
        &self.charts
    }

    /// Cleans, summarizes, charts and stores one upload, returning the report id
    ///
    /// Schema and emptiness problems are raised before anything is written.
    /// The chart is rendered before the record is inserted, so a stored
    /// report always points at an existing artifact.
    #[instrument(skip(self, reader))]
    pub async fn submit<R: io::Read>(&self, original_filename: &str, reader: R) -> Result<i64> {
        let table = RawTable::from_reader(reader)?;
        self.submit_table(original_filename, &table).await
    }

    pub async fn submit_table(&self, original_filename: &str, table: &RawTable) -> Result<i64> {
        if original_filename.trim().is_empty() {
            return Err(ReportError::MissingFilename);
        }

        let dataset = ingest::clean(table)?;
        if dataset.is_empty() {
            info!(
                rows = table.len(),
                rejected = dataset.rejections.len(),
                "upload has no valid rows"
            );
            return Err(ReportError::EmptyDataset);
        }

        info!(
            accepted = dataset.len(),
            rejected = dataset.rejections.len(),
            "cleaned upload"
        );

        let summary = summary::summarize(&dataset.rows);
        // rasterizing is blocking work
        let charts = self.charts.clone();
        let rows = dataset.rows;
        let chart_file = tokio::task::spawn_blocking(move || charts.render_daily_trend(&rows))
            .await
            .map_err(|err| ReportError::Chart(err.to_string()))??;

        db::create_report(
            &self.pool,
            original_filename,
            &summary.kpi,
            &summary.top_products,
            &summary.daily,
            &chart_file,
        )
        .await
    }

    pub async fn report(&self, id: i64) -> Result<Report> {
        db::get_report(&self.pool, id).await
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<ReportListing>> {
        db::list_recent(&self.pool, limit).await
    }
}
