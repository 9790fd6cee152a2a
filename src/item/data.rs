//! Line item data structures as supplied by the persistence layer

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProrationError;

/// Allocation category of a line item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Software license
    License,
    /// Service / support contract
    Service,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::License => "LICENSE",
            ProductType::Service => "SERVICE",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ProrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LICENSE" => Ok(ProductType::License),
            "SERVICE" => Ok(ProductType::Service),
            other => Err(ProrationError::Parse(format!("Unknown product type: {}", other))),
        }
    }
}

/// A single priced, dated entry within a deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Unique line item key
    pub id: String,

    /// Display name, not used by the engine
    #[serde(default)]
    pub product_name: String,

    pub category: ProductType,

    /// First active day (inclusive)
    pub start_date: NaiveDate,

    /// Last active day (inclusive)
    pub end_date: NaiveDate,

    /// Total amount to recognise over the contract period
    pub amount: Decimal,
}

impl LineItem {
    pub fn new(
        id: impl Into<String>,
        category: ProductType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            product_name: String::new(),
            category,
            start_date,
            end_date,
            amount,
        }
    }

    /// Builder-style product name
    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = name.into();
        self
    }

    /// Number of active days, both endpoints included
    pub fn total_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Check the preconditions the proration engine relies on
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.id.is_empty() {
            return Err(ProrationError::EmptyItemId);
        }
        if self.start_date > self.end_date {
            return Err(ProrationError::InvalidRange {
                item_id: self.id.clone(),
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.amount < Decimal::ZERO {
            return Err(ProrationError::InvalidAmount {
                item_id: self.id.clone(),
                amount: self.amount,
            });
        }
        Ok(())
    }
}
