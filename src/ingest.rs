use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::models::CleanedRow;

/// Columns every upload must carry, matched exactly and case-sensitively
pub const REQUIRED_COLUMNS: [&str; 5] = ["date", "order_id", "product", "quantity", "unit_price"];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Untyped tabular input: a header row and the text of every record
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl RawTable {
    /// Reads a CSV document with a header row
    ///
    /// Records may be shorter or longer than the header; absent cells are
    /// treated as missing during cleaning instead of failing the whole read.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, records })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(io::BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Why a raw row was excluded from the cleaned dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    MissingField(&'static str),
    UnparseableDate,
    NotNumeric(&'static str),
    NonPositiveQuantity,
    NegativeUnitPrice,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(column) => write!(f, "missing {column}"),
            Self::UnparseableDate => f.write_str("unparseable date"),
            Self::NotNumeric(column) => write!(f, "{column} is not numeric"),
            Self::NonPositiveQuantity => f.write_str("quantity <= 0"),
            Self::NegativeUnitPrice => f.write_str("unit_price < 0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// 1-based position of the record after the header
    pub row: usize,
    pub reason: RejectReason,
}

/// Output of [`clean`]: the surviving rows plus the audit trail of dropped ones
#[derive(Debug, Clone, Default)]
pub struct CleanedDataset {
    pub rows: Vec<CleanedRow>,
    pub rejections: Vec<Rejection>,
}

impl CleanedDataset {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rejection_counts(&self) -> HashMap<RejectReason, usize> {
        let mut counts = HashMap::new();
        for rejection in &self.rejections {
            *counts.entry(rejection.reason).or_insert(0) += 1;
        }
        counts
    }
}

/// Column positions of the required fields inside a raw record
struct ColumnIndex {
    date: usize,
    order_id: usize,
    product: usize,
    quantity: usize,
    unit_price: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String]) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|header| header == name);

        let mut missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|&&name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            missing.sort();
            return Err(ReportError::Schema { missing });
        }

        let lookup = |name: &str| position(name).ok_or_else(|| ReportError::Schema {
            missing: vec![name.to_string()],
        });

        Ok(Self {
            date: lookup("date")?,
            order_id: lookup("order_id")?,
            product: lookup("product")?,
            quantity: lookup("quantity")?,
            unit_price: lookup("unit_price")?,
        })
    }
}

/// Validates the header contract and filters the records into cleaned rows
///
/// Only a missing required column is an error. Bad cells never abort the
/// run; the row is tagged with a [`RejectReason`] and dropped.
pub fn clean(table: &RawTable) -> Result<CleanedDataset> {
    let columns = ColumnIndex::resolve(&table.headers)?;
    let mut dataset = CleanedDataset::default();

    for (index, record) in table.records.iter().enumerate() {
        match clean_row(&columns, record) {
            Ok(row) => dataset.rows.push(row),
            Err(reason) => dataset.rejections.push(Rejection {
                row: index + 1,
                reason,
            }),
        }
    }

    debug!(
        accepted = dataset.rows.len(),
        rejected = dataset.rejections.len(),
        "cleaned raw table"
    );

    Ok(dataset)
}

fn clean_row(columns: &ColumnIndex, record: &[String]) -> Result<CleanedRow, RejectReason> {
    let date = cell(record, columns.date, "date")?;
    let date = parse_date(date).ok_or(RejectReason::UnparseableDate)?;
    let order_id = cell(record, columns.order_id, "order_id")?;
    let product = cell(record, columns.product, "product")?;
    let quantity = parse_number(record, columns.quantity, "quantity")?;
    let unit_price = parse_number(record, columns.unit_price, "unit_price")?;

    if quantity <= 0.0 {
        return Err(RejectReason::NonPositiveQuantity);
    }
    if unit_price < 0.0 {
        return Err(RejectReason::NegativeUnitPrice);
    }

    Ok(CleanedRow {
        date,
        order_id: order_id.to_string(),
        product: product.to_string(),
        quantity,
        unit_price,
        revenue: quantity * unit_price,
    })
}

/// Whitespace only decides emptiness; text fields are kept verbatim
fn cell<'a>(record: &'a [String], index: usize, column: &'static str) -> Result<&'a str, RejectReason> {
    record
        .get(index)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or(RejectReason::MissingField(column))
}

fn parse_number(record: &[String], index: usize, column: &'static str) -> Result<f64, RejectReason> {
    cell(record, index, column)?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(RejectReason::NotNumeric(column))
}

/// Parses the date formats commonly found in sales exports
///
/// Offsets in RFC 3339 timestamps are dropped and the wall-clock time kept.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader(csv.as_bytes()).expect("valid csv")
    }

    #[test]
    fn drops_rows_with_non_positive_quantity() {
        let raw = table(
            "date,order_id,product,quantity,unit_price\n\
             2024-01-01,O1,Widget,2,10.0\n\
             2024-01-01,O1,Gadget,1,5.0\n\
             2024-01-02,O2,Widget,-1,10.0\n",
        );

        let dataset = clean(&raw).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0].revenue, 20.0);
        assert_eq!(dataset.rows[1].revenue, 5.0);
        assert_eq!(
            dataset.rejections,
            vec![Rejection {
                row: 3,
                reason: RejectReason::NonPositiveQuantity
            }]
        );
    }

    #[test]
    fn missing_columns_are_reported_sorted() {
        let raw = table("quantity,date,order_id\n1,2024-01-01,O1\n");

        match clean(&raw) {
            Err(ReportError::Schema { missing }) => {
                assert_eq!(missing, vec!["product".to_string(), "unit_price".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn schema_error_message_names_columns() {
        let raw = table("date,order_id,product,quantity\n2024-01-01,O1,Widget,1\n");
        let err = clean(&raw).unwrap_err();
        assert_eq!(err.to_string(), "missing required column(s): unit_price");
    }

    #[test]
    fn column_names_are_case_sensitive() {
        let raw = table("Date,order_id,product,quantity,unit_price\n");
        assert!(matches!(clean(&raw), Err(ReportError::Schema { .. })));
    }

    #[test]
    fn extra_columns_are_ignored_and_order_is_free() {
        let raw = table(
            "unit_price,note,product,quantity,order_id,date\n\
             2.5,promo,Widget,4,O9,2024-03-05 14:30:00\n",
        );

        let dataset = clean(&raw).unwrap();
        assert_eq!(dataset.len(), 1);
        let row = &dataset.rows[0];
        assert_eq!(row.order_id, "O9");
        assert_eq!(row.revenue, 10.0);
        assert_eq!(row.day(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn tags_each_rejected_row_with_a_reason() {
        let raw = table(
            "date,order_id,product,quantity,unit_price\n\
             yesterday,O1,Widget,1,1\n\
             2024-01-01,,Widget,1,1\n\
             2024-01-01,O3,Widget,lots,1\n\
             2024-01-01,O4,Widget,1,-0.5\n\
             2024-01-01,O5,Widget,0,1\n\
             2024-01-01,O6,Widget,1\n\
             2024-01-01,O7,Widget,1,0\n",
        );

        let dataset = clean(&raw).unwrap();
        let reasons: Vec<_> = dataset.rejections.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::UnparseableDate,
                RejectReason::MissingField("order_id"),
                RejectReason::NotNumeric("quantity"),
                RejectReason::NegativeUnitPrice,
                RejectReason::NonPositiveQuantity,
                RejectReason::MissingField("unit_price"),
            ]
        );
        // a zero price is valid
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows[0].order_id, "O7");
        assert_eq!(dataset.rows[0].revenue, 0.0);
        assert_eq!(dataset.rejection_counts()[&RejectReason::NonPositiveQuantity], 1);
    }

    #[test]
    fn text_fields_keep_surrounding_whitespace() {
        let raw = table(
            "date,order_id,product,quantity,unit_price\n\
             2024-01-01,O1,Widget, 2 ,1.5\n\
             2024-01-01, O1, Widget,1,1.5\n\
             2024-01-01,O2,   ,1,1.5\n",
        );

        let dataset = clean(&raw).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0].product, "Widget");
        assert_eq!(dataset.rows[0].quantity, 2.0);
        assert_eq!(dataset.rows[1].order_id, " O1");
        assert_eq!(dataset.rows[1].product, " Widget");
        assert_eq!(
            dataset.rejections,
            vec![Rejection {
                row: 3,
                reason: RejectReason::MissingField("product")
            }]
        );
    }

    #[test]
    fn reads_tables_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        std::fs::write(
            &path,
            "date,order_id,product,quantity,unit_price\n2024-01-01,O1,Widget,2,10.0\n",
        )
        .unwrap();

        let raw = RawTable::from_path(&path).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(clean(&raw).unwrap().rows[0].revenue, 20.0);

        assert!(matches!(
            RawTable::from_path(&dir.path().join("absent.csv")),
            Err(ReportError::Io(_))
        ));
    }

    #[test]
    fn header_only_input_cleans_to_empty() {
        let raw = table("date,order_id,product,quantity,unit_price\n");
        assert!(raw.is_empty());
        assert!(clean(&raw).unwrap().is_empty());
    }

    #[test]
    fn parses_common_date_formats() {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(parse_date("2024-01-02"), Some(midnight));
        assert_eq!(parse_date("2024/01/02"), Some(midnight));
        assert_eq!(parse_date("01/02/2024"), Some(midnight));
        assert_eq!(parse_date("2024-01-02T00:00:00+03:00"), Some(midnight));
        assert_eq!(
            parse_date("2024-01-02 08:15"),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(8, 15, 0)
        );
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn non_finite_numbers_are_not_numeric() {
        let raw = table(
            "date,order_id,product,quantity,unit_price\n\
             2024-01-01,O1,Widget,NaN,1\n\
             2024-01-01,O2,Widget,1,inf\n",
        );
        let dataset = clean(&raw).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(
            dataset.rejections[1].reason,
            RejectReason::NotNumeric("unit_price")
        );
    }
}
