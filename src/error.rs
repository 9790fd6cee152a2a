//! Error type shared by the proration engine, loaders and store

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProrationError {
    #[error("invalid date range for {item_id}: start {start} is after end {end}")]
    InvalidRange {
        item_id: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid amount for {item_id}: {amount} is negative")]
    InvalidAmount { item_id: String, amount: Decimal },

    #[error("line item id must not be empty")]
    EmptyItemId,

    #[error("duplicate line item id: {0}")]
    DuplicateItemId(String),

    #[error("invalid month: {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("decimal overflow in {0}")]
    Overflow(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProrationError>;
