use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::models::{CleanedRow, DailyRollup, KpiSummary, Summary, TopProduct};

/// Length of the ranked product view kept in a report
pub const TOP_PRODUCTS_LIMIT: usize = 10;
/// Number of most recent days (present in the data) kept in a report
pub const DAILY_WINDOW: usize = 14;

#[derive(Default)]
struct Bucket<'a> {
    revenue: f64,
    units: f64,
    orders: HashSet<&'a str>,
}

impl<'a> Bucket<'a> {
    fn add(&mut self, row: &'a CleanedRow) {
        self.revenue += row.revenue;
        self.units += row.quantity;
        self.orders.insert(row.order_id.as_str());
    }
}

pub fn summarize(rows: &[CleanedRow]) -> Summary {
    Summary {
        kpi: kpi(rows),
        top_products: top_products(rows, TOP_PRODUCTS_LIMIT),
        daily: daily_rollups(rows, DAILY_WINDOW),
    }
}

pub fn kpi(rows: &[CleanedRow]) -> KpiSummary {
    let total_revenue: f64 = rows.iter().map(|row| row.revenue).sum();
    let total_items: f64 = rows.iter().map(|row| row.quantity).sum();
    let total_orders = rows
        .iter()
        .map(|row| row.order_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    KpiSummary {
        total_revenue,
        total_orders,
        total_items,
        average_order_value: if total_orders == 0 {
            0.0
        } else {
            total_revenue / total_orders as f64
        },
    }
}

/// Aggregates every product, ranked by revenue then units
///
/// Products tied on both keys keep the order in which they first appear.
pub fn product_totals(rows: &[CleanedRow]) -> Vec<TopProduct> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(&str, Bucket)> = Vec::new();

    for row in rows {
        let index = *positions.entry(row.product.as_str()).or_insert_with(|| {
            buckets.push((row.product.as_str(), Bucket::default()));
            buckets.len() - 1
        });
        buckets[index].1.add(row);
    }

    let mut products: Vec<TopProduct> = buckets
        .into_iter()
        .map(|(product, bucket)| TopProduct {
            product: product.to_string(),
            revenue: bucket.revenue,
            units: bucket.units,
            orders: bucket.orders.len(),
        })
        .collect();

    products.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| b.units.total_cmp(&a.units))
    });
    products
}

pub fn top_products(rows: &[CleanedRow], limit: usize) -> Vec<TopProduct> {
    let mut products = product_totals(rows);
    products.truncate(limit);
    products
}

/// Per-day rollups for the most recent `limit` days that have data, newest first
pub fn daily_rollups(rows: &[CleanedRow], limit: usize) -> Vec<DailyRollup> {
    group_by_day(rows)
        .into_iter()
        .rev()
        .take(limit)
        .map(|(day, bucket)| DailyRollup {
            day,
            revenue: bucket.revenue,
            orders: bucket.orders.len(),
            units: bucket.units,
        })
        .collect()
}

/// Revenue per day over the whole dataset, oldest first
pub fn daily_revenue_series(rows: &[CleanedRow]) -> Vec<(NaiveDate, f64)> {
    group_by_day(rows)
        .into_iter()
        .map(|(day, bucket)| (day, bucket.revenue))
        .collect()
}

fn group_by_day(rows: &[CleanedRow]) -> BTreeMap<NaiveDate, Bucket<'_>> {
    let mut days: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for row in rows {
        days.entry(row.day()).or_default().add(row);
    }
    days
}
