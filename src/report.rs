use std::fmt::Write;

use crate::models::{Report, ReportListing};

pub fn render_markdown(report: &Report) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Sales Report #{}", report.id);
    let _ = writeln!(
        output,
        "Generated {} from {}",
        report.created_at, report.original_filename
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Figures");
    let _ = writeln!(output, "- Total revenue: {:.2}", report.kpi.total_revenue);
    let _ = writeln!(output, "- Orders: {}", report.kpi.total_orders);
    let _ = writeln!(output, "- Items sold: {}", report.kpi.total_items);
    let _ = writeln!(
        output,
        "- Average order value: {:.2}",
        report.kpi.average_order_value
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Products");

    if report.top_products.is_empty() {
        let _ = writeln!(output, "No products recorded.");
    } else {
        let _ = writeln!(output, "| Product | Revenue | Units | Orders |");
        let _ = writeln!(output, "| --- | ---: | ---: | ---: |");
        for product in &report.top_products {
            let _ = writeln!(
                output,
                "| {} | {:.2} | {} | {} |",
                product.product, product.revenue, product.units, product.orders
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Days");

    if report.daily.is_empty() {
        let _ = writeln!(output, "No daily activity recorded.");
    } else {
        let _ = writeln!(output, "| Day | Revenue | Orders | Units |");
        let _ = writeln!(output, "| --- | ---: | ---: | ---: |");
        for day in &report.daily {
            let _ = writeln!(
                output,
                "| {} | {:.2} | {} | {} |",
                day.day, day.revenue, day.orders, day.units
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Chart: {}", report.chart_file);

    output
}

pub fn render_history(listings: &[ReportListing]) -> String {
    let mut output = String::new();

    if listings.is_empty() {
        let _ = writeln!(output, "No reports stored yet.");
        return output;
    }

    for listing in listings {
        let _ = writeln!(
            output,
            "- #{} {} ({})",
            listing.id, listing.original_filename, listing.created_at
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{DailyRollup, KpiSummary, TopProduct};

    fn sample_report() -> Report {
        Report {
            id: 3,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 3)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            original_filename: "sales.csv".to_string(),
            kpi: KpiSummary {
                total_revenue: 25.0,
                total_orders: 1,
                total_items: 3.0,
                average_order_value: 25.0,
            },
            top_products: vec![TopProduct {
                product: "Widget".to_string(),
                revenue: 20.0,
                units: 2.0,
                orders: 1,
            }],
            daily: vec![DailyRollup {
                day: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                revenue: 25.0,
                orders: 1,
                units: 3.0,
            }],
            chart_file: "daily_revenue_20240103_093000_0000_abcd1234.png".to_string(),
        }
    }

    #[test]
    fn markdown_lists_every_section() {
        let output = render_markdown(&sample_report());

        assert!(output.starts_with("# Sales Report #3\n"));
        assert!(output.contains("Generated 2024-01-03 09:30:00 from sales.csv"));
        assert!(output.contains("- Total revenue: 25.00"));
        assert!(output.contains("- Items sold: 3\n"));
        assert!(output.contains("| Widget | 20.00 | 2 | 1 |"));
        assert!(output.contains("| 2024-01-01 | 25.00 | 1 | 3 |"));
        assert!(output.contains("Chart: daily_revenue_20240103_093000_0000_abcd1234.png"));
    }

    #[test]
    fn history_handles_no_reports() {
        assert_eq!(render_history(&[]), "No reports stored yet.\n");
    }
}
