//! Core proration engine: splits a line item's amount into calendar-month buckets
//!
//! The amount is spread by exact day count. One daily rate
//! (`amount / total_days`) is computed per item and reused for every month,
//! and the final month absorbs whatever the decimal arithmetic could not
//! represent so the allocations always sum to the original amount.

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use rust_decimal::Decimal;

use super::allocation::MonthlyAllocation;
use super::calendar::{months_between_inclusive, YearMonth};
use crate::error::{ProrationError, Result};
use crate::item::{LineItem, ProductType};

/// How the sum-exactness gap is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemainderPolicy {
    /// Final month gets `total - sum(previous months)`
    #[default]
    LastMonth,
    /// Every month is `daily_rate * applied_days`, drift is accepted
    None,
}

/// Configuration for a proration run
#[derive(Debug, Clone, Default)]
pub struct ProrationConfig {
    pub remainder: RemainderPolicy,

    /// Book amounts at this many fractional digits. `Some(0)` for JPY.
    /// The running total `daily_rate * elapsed_days` is rounded (banker's
    /// rounding, capped at the item amount) and each month gets the
    /// increase since the previous month, so no month goes negative.
    /// The daily rate itself is never rounded.
    pub amount_scale: Option<u32>,
}

impl ProrationConfig {
    /// Whole-unit amounts with remainder on the last month
    pub fn whole_units() -> Self {
        Self {
            remainder: RemainderPolicy::LastMonth,
            amount_scale: Some(0),
        }
    }
}

/// Prorate with the default configuration.
///
/// Fails fast on an empty id, `start_date > end_date` or a negative amount.
pub fn generate_monthly_allocations(
    item_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_amount: Decimal,
    category: ProductType,
) -> Result<Vec<MonthlyAllocation>> {
    generate_monthly_allocations_with(
        item_id,
        start_date,
        end_date,
        total_amount,
        category,
        &ProrationConfig::default(),
    )
}

/// Prorate with an explicit configuration
pub fn generate_monthly_allocations_with(
    item_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_amount: Decimal,
    category: ProductType,
    config: &ProrationConfig,
) -> Result<Vec<MonthlyAllocation>> {
    if item_id.is_empty() {
        return Err(ProrationError::EmptyItemId);
    }
    if start_date > end_date {
        return Err(ProrationError::InvalidRange {
            item_id: item_id.to_string(),
            start: start_date,
            end: end_date,
        });
    }
    if total_amount < Decimal::ZERO {
        return Err(ProrationError::InvalidAmount {
            item_id: item_id.to_string(),
            amount: total_amount,
        });
    }

    let overflow = || ProrationError::Overflow(item_id.to_string());

    let total_days = (end_date - start_date).num_days() + 1;
    let daily_rate = total_amount
        .checked_div(Decimal::from(total_days))
        .ok_or_else(overflow)?;

    let first = YearMonth::of(start_date);
    let last = YearMonth::of(end_date);
    let month_count = months_between_inclusive(first, last) as usize;

    log::debug!(
        "prorating {}: {} -> {} ({} days, {} months), daily rate {}",
        item_id, start_date, end_date, total_days, month_count, daily_rate
    );

    let mut allocations = Vec::with_capacity(month_count);
    let mut allocated = Decimal::ZERO;
    let mut cumulative_days: i64 = 0;
    let mut current = first;

    loop {
        let days_in_month = current.days();
        let applied_days = if first == last {
            total_days as u32
        } else if current == first {
            days_in_month - start_date.day() + 1
        } else if current == last {
            end_date.day()
        } else {
            days_in_month
        };

        cumulative_days += applied_days as i64;
        let mut amount = match config.amount_scale {
            // Months are increments of the rounded running total
            Some(scale) => {
                let running = daily_rate
                    .checked_mul(Decimal::from(cumulative_days))
                    .ok_or_else(overflow)?
                    .round_dp(scale)
                    .min(total_amount);
                running.checked_sub(allocated).ok_or_else(overflow)?
            }
            None => daily_rate
                .checked_mul(Decimal::from(applied_days))
                .ok_or_else(overflow)?,
        };

        if current == last && config.remainder == RemainderPolicy::LastMonth {
            let reconciled = total_amount.checked_sub(allocated).ok_or_else(overflow)?;
            if reconciled != amount {
                log::debug!(
                    "{}: final month {} adjusted by {}",
                    item_id, current, reconciled - amount
                );
            }
            amount = reconciled;
        }

        allocated = allocated.checked_add(amount).ok_or_else(overflow)?;

        allocations.push(MonthlyAllocation {
            line_item_id: item_id.to_string(),
            year: current.year(),
            month: current.month(),
            total_days_in_month: days_in_month,
            applied_days,
            daily_rate,
            amount,
            category,
        });

        if current == last {
            break;
        }
        current = current.next();
    }

    Ok(allocations)
}

/// Proration engine bound to a configuration
#[derive(Debug, Clone, Default)]
pub struct ProrationEngine {
    config: ProrationConfig,
}

impl ProrationEngine {
    pub fn new(config: ProrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProrationConfig {
        &self.config
    }

    /// Prorate a single line item
    pub fn prorate_item(&self, item: &LineItem) -> Result<Vec<MonthlyAllocation>> {
        generate_monthly_allocations_with(
            &item.id,
            item.start_date,
            item.end_date,
            item.amount,
            item.category,
            &self.config,
        )
    }

    /// Prorate many items in parallel; output is grouped in input order.
    /// The first failing item aborts the batch.
    pub fn prorate_batch(&self, items: &[LineItem]) -> Result<Vec<Vec<MonthlyAllocation>>> {
        log::info!("prorating {} line items", items.len());
        items.par_iter().map(|item| self.prorate_item(item)).collect()
    }

    /// Same as [`prorate_batch`](Self::prorate_batch), flattened
    pub fn prorate_batch_flat(&self, items: &[LineItem]) -> Result<Vec<MonthlyAllocation>> {
        Ok(self.prorate_batch(items)?.into_iter().flatten().collect())
    }
}
