//! Load line items from a deal-item CSV export

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use csv::Reader;
use rust_decimal::Decimal;

use super::{LineItem, ProductType};
use crate::error::{ProrationError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw CSV row matching the deal-item export columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "id")]
    id: String,
    #[serde(rename = "productName", default)]
    product_name: String,
    #[serde(rename = "type")]
    category: String,
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(rename = "endDate")]
    end_date: String,
    #[serde(rename = "amount")]
    amount: String,
}

impl CsvRow {
    fn to_line_item(self, row: usize) -> Result<LineItem> {
        let category: ProductType = self
            .category
            .parse()
            .map_err(|e| ProrationError::Parse(format!("row {}: {}", row, e)))?;

        let start_date = parse_date(&self.start_date, "startDate", row)?;
        let end_date = parse_date(&self.end_date, "endDate", row)?;

        let amount = Decimal::from_str_exact(self.amount.trim()).map_err(|e| {
            ProrationError::Parse(format!("row {}: bad amount '{}': {}", row, self.amount, e))
        })?;

        let item = LineItem {
            id: self.id.trim().to_string(),
            product_name: self.product_name,
            category,
            start_date,
            end_date,
            amount,
        };
        item.validate()
            .map_err(|e| ProrationError::Parse(format!("row {}: {}", row, e)))?;

        Ok(item)
    }
}

fn parse_date(raw: &str, column: &str, row: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
        ProrationError::Parse(format!("row {}: bad {} '{}': {}", row, column, raw, e))
    })
}

/// Load all line items from a CSV file
pub fn load_line_items<P: AsRef<Path>>(path: P) -> Result<Vec<LineItem>> {
    let file = std::fs::File::open(path)?;
    load_line_items_from_reader(file)
}

/// Load line items from any reader (e.g., string buffer, upload body)
///
/// Row numbers in errors are 1-based data rows, header excluded.
/// Ids must be unique within the file.
pub fn load_line_items_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<LineItem>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut items = Vec::new();
    let mut seen = HashSet::new();

    for (idx, result) in csv_reader.deserialize().enumerate() {
        let row: CsvRow = result?;
        let item = row.to_line_item(idx + 1)?;
        if !seen.insert(item.id.clone()) {
            return Err(ProrationError::Parse(format!(
                "row {}: duplicate line item id '{}'",
                idx + 1,
                item.id
            )));
        }
        items.push(item);
    }

    log::debug!("loaded {} line items", items.len());
    Ok(items)
}
