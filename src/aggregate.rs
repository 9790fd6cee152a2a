//! Reporting helpers over stored monthly allocations
//!
//! Dashboard figures are built by chaining filters and then summing, always
//! over the full allocation set for the scope in question. Filters borrow
//! and preserve input order. Sums use checked decimal addition and report
//! overflow as an error.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::{ProrationError, Result};
use crate::item::ProductType;
use crate::proration::{FiscalCalendar, FiscalQuarter, MonthlyAllocation, YearMonth};

fn overflow() -> ProrationError {
    ProrationError::Overflow("allocation totals".to_string())
}

/// Total of all allocation amounts; zero for an empty input
pub fn sum_allocations<'a, I>(allocations: I) -> Result<Decimal>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
{
    allocations
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a.amount).ok_or_else(overflow))
}

/// Allocations falling in calendar `year`/`month`
pub fn filter_by_period<'a, I>(allocations: I, year: i32, month: u32) -> Vec<&'a MonthlyAllocation>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
{
    allocations
        .into_iter()
        .filter(|a| a.year == year && a.month == month)
        .collect()
}

pub fn filter_by_category<'a, I>(allocations: I, category: ProductType) -> Vec<&'a MonthlyAllocation>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
{
    allocations
        .into_iter()
        .filter(|a| a.category == category)
        .collect()
}

pub fn filter_by_item<'a, I>(allocations: I, item_id: &str) -> Vec<&'a MonthlyAllocation>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
{
    allocations
        .into_iter()
        .filter(|a| a.line_item_id == item_id)
        .collect()
}

/// Calendar-month totals, chronologically ordered
pub fn monthly_totals<'a, I>(allocations: I) -> Result<BTreeMap<YearMonth, Decimal>>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
{
    group_totals(allocations, |a| a.period())
}

pub fn fiscal_quarter_totals<'a, I>(
    allocations: I,
    calendar: &FiscalCalendar,
) -> Result<BTreeMap<FiscalQuarter, Decimal>>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
{
    group_totals(allocations, |a| Ok(calendar.quarter_of_month(a.period()?)))
}

pub fn fiscal_year_totals<'a, I>(
    allocations: I,
    calendar: &FiscalCalendar,
) -> Result<BTreeMap<i32, Decimal>>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
{
    group_totals(allocations, |a| Ok(calendar.quarter_of_month(a.period()?).fiscal_year))
}

pub fn category_totals<'a, I>(allocations: I) -> Result<BTreeMap<ProductType, Decimal>>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
{
    group_totals(allocations, |a| Ok(a.category))
}

fn group_totals<'a, I, K, F>(allocations: I, key: F) -> Result<BTreeMap<K, Decimal>>
where
    I: IntoIterator<Item = &'a MonthlyAllocation>,
    K: Ord,
    F: Fn(&MonthlyAllocation) -> Result<K>,
{
    let mut totals = BTreeMap::new();
    for alloc in allocations {
        let total = totals.entry(key(alloc)?).or_insert(Decimal::ZERO);
        *total = total.checked_add(alloc.amount).ok_or_else(overflow)?;
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proration::generate_monthly_allocations;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn alloc(id: &str, year: i32, month: u32, daily: Decimal, days: u32, category: ProductType) -> MonthlyAllocation {
        MonthlyAllocation {
            line_item_id: id.to_string(),
            year,
            month,
            total_days_in_month: days,
            applied_days: days,
            daily_rate: daily,
            amount: daily * Decimal::from(days),
            category,
        }
    }

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn mixed() -> Vec<MonthlyAllocation> {
        vec![
            alloc("item1", 2024, 1, dec!(1000), 31, ProductType::License),
            alloc("item1", 2024, 2, dec!(1000), 29, ProductType::License),
            alloc("item2", 2024, 1, dec!(500), 31, ProductType::Service),
            alloc("item3", 2024, 2, dec!(800), 29, ProductType::License),
            alloc("item4", 2023, 1, dec!(10), 31, ProductType::Service),
        ]
    }

    #[test]
    fn test_sum_empty_is_zero() {
        assert_eq!(sum_allocations(&Vec::<MonthlyAllocation>::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_sum_is_order_independent() {
        let allocs = mixed();
        let mut reversed = allocs.clone();
        reversed.reverse();
        assert_eq!(sum_allocations(&allocs).unwrap(), sum_allocations(&reversed).unwrap());
        assert_eq!(sum_allocations(&allocs).unwrap(), dec!(31000) + dec!(29000) + dec!(15500) + dec!(23200) + dec!(310));
    }

    #[test]
    fn test_filter_by_period() {
        let allocs = mixed();
        let jan = filter_by_period(&allocs, 2024, 1);
        assert_eq!(jan.len(), 2);
        assert_eq!(jan[0].line_item_id, "item1");
        assert_eq!(jan[1].line_item_id, "item2");
        assert!(jan.iter().all(|a| a.year == 2024 && a.month == 1));

        assert!(filter_by_period(&allocs, 2025, 1).is_empty());
    }

    #[test]
    fn test_filter_by_category_then_sum() {
        let allocs = mixed();
        let licenses = filter_by_category(&allocs, ProductType::License);
        assert_eq!(licenses.len(), 3);
        assert!(licenses.iter().all(|a| a.category == ProductType::License));
        assert_eq!(licenses[2].line_item_id, "item3");
        assert_eq!(sum_allocations(licenses.iter().copied()).unwrap(), dec!(83200));
        assert_eq!(category_totals(&allocs).unwrap()[&ProductType::License], dec!(83200));
    }

    #[test]
    fn test_filters_compose() {
        let allocs = mixed();
        let jan = filter_by_period(&allocs, 2024, 1);
        let jan_services = filter_by_category(jan.iter().copied(), ProductType::Service);
        assert_eq!(jan_services.len(), 1);
        assert_eq!(sum_allocations(jan_services.iter().copied()).unwrap(), dec!(15500));

        let item1 = filter_by_item(&allocs, "item1");
        assert_eq!(sum_allocations(item1.iter().copied()).unwrap(), dec!(60000));
    }

    #[test]
    fn test_monthly_totals_ordered() {
        let totals = monthly_totals(&mixed()).unwrap();
        let keys: Vec<_> = totals.keys().copied().collect();
        assert_eq!(
            keys,
            vec![ym(2023, 1), ym(2024, 1), ym(2024, 2)]
        );
        assert_eq!(totals[&ym(2024, 1)], dec!(46500));
        assert_eq!(totals[&ym(2024, 2)], dec!(52200));
    }

    #[test]
    fn test_fiscal_totals() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        // Dec 2024 .. Feb 2025 is all of FY2025 Q1 under a December start
        let allocs = generate_monthly_allocations(
            "fy", date(2024, 12, 1), date(2025, 3, 31), dec!(121000), ProductType::License,
        ).unwrap();

        let calendar = FiscalCalendar::default();
        let quarters = fiscal_quarter_totals(&allocs, &calendar).unwrap();
        assert_eq!(quarters.len(), 2);
        let q1 = FiscalQuarter { fiscal_year: 2025, quarter: 1 };
        let q2 = FiscalQuarter { fiscal_year: 2025, quarter: 2 };
        // 121 days -> 1000/day; Dec 31 + Jan 31 + Feb 28 = 90 days
        assert_eq!(quarters[&q1], dec!(90000));
        assert_eq!(quarters[&q2], dec!(31000));

        let years = fiscal_year_totals(&allocs, &calendar).unwrap();
        assert_eq!(years.len(), 1);
        assert_eq!(years[&2025], dec!(121000));

        let calendar_years = fiscal_year_totals(&allocs, &FiscalCalendar::new(1).unwrap()).unwrap();
        assert_eq!(calendar_years[&2024], dec!(31000));
        assert_eq!(calendar_years[&2025], dec!(90000));
    }

    #[test]
    fn test_sum_reports_overflow() {
        let allocs = vec![
            alloc("a", 2024, 1, Decimal::MAX, 1, ProductType::License),
            alloc("b", 2024, 1, Decimal::MAX, 1, ProductType::License),
        ];
        assert!(matches!(sum_allocations(&allocs), Err(ProrationError::Overflow(_))));
        assert!(matches!(monthly_totals(&allocs), Err(ProrationError::Overflow(_))));
        assert!(matches!(category_totals(&allocs), Err(ProrationError::Overflow(_))));
    }

    #[test]
    fn test_period_totals_reject_bad_month() {
        let allocs = vec![alloc("bad", 2024, 13, dec!(1), 31, ProductType::License)];
        assert!(matches!(monthly_totals(&allocs), Err(ProrationError::InvalidMonth(13))));
        assert!(fiscal_quarter_totals(&allocs, &FiscalCalendar::default()).is_err());
        assert_eq!(sum_allocations(&allocs).unwrap(), dec!(31));
    }
}
