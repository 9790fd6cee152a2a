//! Monthly revenue proration engine

mod calendar;
mod allocation;
mod engine;

pub use calendar::{days_in_month, months_between_inclusive, FiscalCalendar, FiscalQuarter, YearMonth};
pub use allocation::{AllocationSummary, MonthlyAllocation};
pub use engine::{
    generate_monthly_allocations, generate_monthly_allocations_with, ProrationConfig,
    ProrationEngine, RemainderPolicy,
};
