use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A transaction row that survived cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRow {
    pub date: NaiveDateTime,
    pub order_id: String,
    pub product: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub revenue: f64,
}

impl CleanedRow {
    /// The calendar day of the transaction, time discarded
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub total_items: f64,
    pub average_order_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product: String,
    pub revenue: f64,
    pub units: f64,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRollup {
    pub day: NaiveDate,
    pub revenue: f64,
    pub orders: usize,
    pub units: f64,
}

/// Everything the aggregator derives from one cleaned dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub kpi: KpiSummary,
    pub top_products: Vec<TopProduct>,
    pub daily: Vec<DailyRollup>,
}

/// An immutable snapshot of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub original_filename: String,
    pub kpi: KpiSummary,
    pub top_products: Vec<TopProduct>,
    pub daily: Vec<DailyRollup>,
    pub chart_file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportListing {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub original_filename: String,
}
