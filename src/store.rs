//! In-memory allocation store
//!
//! Holds the allocation set of every line item. Editing an item's amount or
//! dates regenerates its allocations: the old set is replaced wholesale under
//! one write lock, so a concurrent reader sees either the old set or the new
//! one, never a mix.

use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ProrationError, Result};
use crate::item::LineItem;
use crate::proration::{MonthlyAllocation, ProrationEngine};

#[derive(Debug, Default)]
pub struct AllocationStore {
    engine: ProrationEngine,
    by_item: RwLock<BTreeMap<String, Vec<MonthlyAllocation>>>,
}

impl AllocationStore {
    pub fn new(engine: ProrationEngine) -> Self {
        Self {
            engine,
            by_item: RwLock::new(BTreeMap::new()),
        }
    }

    // A panicking writer never leaves a half-replaced entry behind, so a
    // poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Vec<MonthlyAllocation>>> {
        self.by_item.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Vec<MonthlyAllocation>>> {
        self.by_item.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Delete every allocation of `item` and insert a freshly generated set.
    ///
    /// Proration runs before the lock is taken; on error the previous set is
    /// left untouched. Returns the number of records now stored for the item.
    pub fn regenerate(&self, item: &LineItem) -> Result<usize> {
        let allocations = self.engine.prorate_item(item)?;
        let count = allocations.len();

        let previous = self.write().insert(item.id.clone(), allocations);
        log::debug!(
            "regenerated {}: {} -> {} allocations",
            item.id,
            previous.map_or(0, |p| p.len()),
            count
        );
        Ok(count)
    }

    /// Regenerate a batch of items; proration runs in parallel and the
    /// whole batch is swapped in under a single lock. A batch naming the
    /// same item twice is rejected before anything is stored.
    pub fn regenerate_all(&self, items: &[LineItem]) -> Result<usize> {
        let mut seen = HashSet::with_capacity(items.len());
        if let Some(dup) = items.iter().find(|item| !seen.insert(item.id.as_str())) {
            return Err(ProrationError::DuplicateItemId(dup.id.clone()));
        }

        let grouped = self.engine.prorate_batch(items)?;
        let mut map = self.write();
        let mut count = 0;
        for (item, allocations) in items.iter().zip(grouped) {
            count += allocations.len();
            map.insert(item.id.clone(), allocations);
        }
        log::info!("stored {} allocations for {} items", count, items.len());
        Ok(count)
    }

    /// Drop all allocations of an item; returns how many were removed
    pub fn remove(&self, item_id: &str) -> usize {
        self.write().remove(item_id).map_or(0, |p| p.len())
    }

    pub fn allocations_for(&self, item_id: &str) -> Vec<MonthlyAllocation> {
        self.read().get(item_id).cloned().unwrap_or_default()
    }

    /// Every stored allocation, ordered by item id then (year, month)
    pub fn all(&self) -> Vec<MonthlyAllocation> {
        self.read().values().flatten().cloned().collect()
    }

    /// Total number of stored allocation records
    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::sum_allocations;
    use crate::item::ProductType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_regenerate_replaces_previous_set() {
        let store = AllocationStore::default();
        let mut item = LineItem::new("deal-1", ProductType::License, date(2024, 1, 15), date(2024, 6, 30), dec!(500000));

        assert_eq!(store.regenerate(&item).unwrap(), 6);
        assert_eq!(store.len(), 6);

        item.end_date = date(2024, 2, 29);
        item.amount = dec!(120000);
        assert_eq!(store.regenerate(&item).unwrap(), 2);

        let stored = store.allocations_for("deal-1");
        assert_eq!(stored.len(), 2);
        assert_eq!(sum_allocations(&stored).unwrap(), dec!(120000));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_failed_regeneration_keeps_previous_set() {
        let store = AllocationStore::default();
        let mut item = LineItem::new("deal-1", ProductType::Service, date(2024, 1, 1), date(2024, 3, 31), dec!(9100));
        store.regenerate(&item).unwrap();

        item.start_date = date(2024, 5, 1);
        assert!(store.regenerate(&item).is_err());
        assert_eq!(sum_allocations(&store.allocations_for("deal-1")).unwrap(), dec!(9100));
    }

    #[test]
    fn test_keys_unique_and_ordered() {
        let store = AllocationStore::default();
        let items = vec![
            LineItem::new("b", ProductType::License, date(2024, 11, 1), date(2025, 2, 1), dec!(100)),
            LineItem::new("a", ProductType::Service, date(2024, 1, 1), date(2024, 12, 31), dec!(200)),
        ];
        store.regenerate_all(&items).unwrap();
        store.regenerate_all(&items).unwrap();

        let all = store.all();
        assert_eq!(all.len(), 4 + 12);
        assert_eq!(all[0].line_item_id, "a");
        assert_eq!(all[12].line_item_id, "b");

        let keys: HashSet<_> = all.iter().map(|a| a.key()).collect();
        assert_eq!(keys.len(), all.len());
    }

    #[test]
    fn test_remove() {
        let store = AllocationStore::default();
        let item = LineItem::new("x", ProductType::License, date(2024, 1, 1), date(2024, 2, 1), dec!(10));
        store.regenerate(&item).unwrap();
        assert_eq!(store.remove("x"), 2);
        assert_eq!(store.remove("x"), 0);
        assert!(store.is_empty());
        assert!(store.allocations_for("x").is_empty());
    }

    #[test]
    fn test_readers_never_see_partial_sets() {
        let store = AllocationStore::default();
        let short = LineItem::new("live", ProductType::License, date(2024, 1, 1), date(2024, 3, 31), dec!(91000));
        let long = LineItem::new("live", ProductType::License, date(2024, 1, 1), date(2025, 12, 31), dec!(731000));
        store.regenerate(&short).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    let item = if i % 2 == 0 { &long } else { &short };
                    store.regenerate(item).unwrap();
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let seen = store.allocations_for("live");
                        let total = sum_allocations(&seen).unwrap();
                        match seen.len() {
                            3 => assert_eq!(total, dec!(91000)),
                            24 => assert_eq!(total, dec!(731000)),
                            n => panic!("partial allocation set of {} records", n),
                        }
                    }
                });
            }
        });
    }

    #[test]
    fn test_duplicate_ids_in_batch_rejected() {
        let store = AllocationStore::default();
        let items = vec![
            LineItem::new("x", ProductType::License, date(2024, 1, 1), date(2024, 1, 31), dec!(100)),
            LineItem::new("x", ProductType::Service, date(2024, 2, 1), date(2024, 2, 29), dec!(200)),
        ];
        assert!(matches!(
            store.regenerate_all(&items),
            Err(ProrationError::DuplicateItemId(id)) if id == "x"
        ));
        assert!(store.is_empty());
    }
}
