pub use self::{
    chart::ChartRenderer,
    error::{ReportError, Result},
    ingest::{clean, CleanedDataset, RawTable, RejectReason, Rejection, REQUIRED_COLUMNS},
    models::{CleanedRow, DailyRollup, KpiSummary, Report, ReportListing, Summary, TopProduct},
    pipeline::ReportService,
    summary::summarize,
};

pub mod chart;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod summary;
