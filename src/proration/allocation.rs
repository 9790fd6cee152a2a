//! Monthly allocation records produced by the engine

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calendar::YearMonth;
use crate::error::{ProrationError, Result};
use crate::item::ProductType;

/// One calendar month's share of a line item's amount.
///
/// Field names serialize to the persisted shape
/// `{ lineItemId, year, month, totalDaysInMonth, appliedDays, dailyRate, amount, category }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAllocation {
    /// Originating line item
    pub line_item_id: String,

    pub year: i32,
    pub month: u32,

    /// Calendar length of the month (28-31)
    pub total_days_in_month: u32,

    /// Contract days falling in this month
    pub applied_days: u32,

    /// Shared by every allocation of the same item
    pub daily_rate: Decimal,

    pub amount: Decimal,

    pub category: ProductType,
}

impl MonthlyAllocation {
    /// Fails only for a record carrying a month outside 1..=12
    pub fn period(&self) -> Result<YearMonth> {
        YearMonth::new(self.year, self.month)
    }

    /// Storage key; unique across a store
    pub fn key(&self) -> (&str, i32, u32) {
        (self.line_item_id.as_str(), self.year, self.month)
    }
}

/// Summary statistics over a set of allocations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub record_count: usize,
    pub applied_days: u64,
    pub first_period: Option<YearMonth>,
    pub last_period: Option<YearMonth>,
    pub total_amount: Decimal,
    pub by_category: BTreeMap<ProductType, Decimal>,
}

impl AllocationSummary {
    pub fn from_allocations<'a, I>(allocations: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a MonthlyAllocation>,
    {
        let overflow = || ProrationError::Overflow("allocation summary".to_string());

        let mut summary = Self::default();
        for alloc in allocations {
            let period = alloc.period()?;
            summary.record_count += 1;
            summary.applied_days += alloc.applied_days as u64;
            summary.total_amount = summary
                .total_amount
                .checked_add(alloc.amount)
                .ok_or_else(overflow)?;
            let subtotal = summary.by_category.entry(alloc.category).or_insert(Decimal::ZERO);
            *subtotal = subtotal.checked_add(alloc.amount).ok_or_else(overflow)?;
            summary.first_period = Some(summary.first_period.map_or(period, |p| p.min(period)));
            summary.last_period = Some(summary.last_period.map_or(period, |p| p.max(period)));
        }
        Ok(summary)
    }
}
