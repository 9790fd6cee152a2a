//! Revenue Proration - monthly revenue recognition for contract line items
//!
//! This library provides:
//! - Day-count proration of a line item's amount into calendar months
//! - Exact decimal arithmetic with last-month remainder reconciliation
//! - Period, category and fiscal-quarter aggregation for reporting
//! - An in-memory allocation store with atomic regeneration
//! - CSV import of line items

pub mod error;
pub mod item;
pub mod proration;
pub mod aggregate;
pub mod store;

// Re-export commonly used types
pub use error::{ProrationError, Result};
pub use item::{LineItem, ProductType};
pub use proration::{
    generate_monthly_allocations, MonthlyAllocation, ProrationConfig, ProrationEngine,
    RemainderPolicy, YearMonth, FiscalCalendar,
};
pub use aggregate::{filter_by_category, filter_by_period, sum_allocations};
pub use store::AllocationStore;
