use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use plotters::prelude::*;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ReportError, Result};
use crate::models::CleanedRow;
use crate::summary;

const CHART_SIZE: (u32, u32) = (960, 720);
const MAX_X_LABELS: usize = 31;

/// Process-wide counter distinguishing renders made within the same second
static RENDER_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Writes daily revenue line charts as PNG files into one directory
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Renders revenue per day, oldest day on the left, and returns the file name
    ///
    /// Every call claims a fresh file name before drawing, so an existing
    /// artifact is never overwritten.
    pub fn render_daily_trend(&self, rows: &[CleanedRow]) -> Result<String> {
        let series = summary::daily_revenue_series(rows);
        if series.is_empty() {
            return Err(ReportError::EmptyDataset);
        }

        std::fs::create_dir_all(&self.dir)?;
        let (file_name, path) = self.claim_artifact()?;

        if let Err(err) = draw(&path, &series) {
            if let Err(cleanup) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %cleanup, "failed to remove partial chart");
            }
            return Err(ReportError::Chart(err.to_string()));
        }

        debug!(file = %file_name, days = series.len(), "rendered daily revenue chart");
        Ok(file_name)
    }

    fn claim_artifact(&self) -> Result<(String, PathBuf)> {
        loop {
            let file_name = artifact_name();
            let path = self.dir.join(&file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok((file_name, path)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn artifact_name() -> String {
    let sequence = RENDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "daily_revenue_{}_{sequence:04}_{}.png",
        Local::now().format("%Y%m%d_%H%M%S"),
        &nonce[..8]
    )
}

fn draw(
    path: &Path,
    series: &[(chrono::NaiveDate, f64)],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let last = (series.len() as i32 - 1).max(1);
    let peak = series.iter().map(|(_, revenue)| *revenue).fold(0.0, f64::max);
    let y_max = if peak > 0.0 { peak * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily revenue", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(110)
        .y_label_area_size(80)
        .build_cartesian_2d(0..last, 0f64..y_max)?;

    let label = |index: &i32| {
        usize::try_from(*index)
            .ok()
            .and_then(|index| series.get(index))
            .map(|(day, _)| day.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_labels(series.len().min(MAX_X_LABELS))
        .x_label_formatter(&label)
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .x_desc("Date")
        .y_desc("Revenue")
        .draw()?;

    chart.draw_series(LineSeries::new(
        series
            .iter()
            .enumerate()
            .map(|(index, (_, revenue))| (index as i32, *revenue)),
        &BLUE,
    ))?;

    root.present()?;
    Ok(())
}
