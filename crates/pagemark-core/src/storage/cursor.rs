//! Cursor-based scans over a record kind
//!
//! A `Cursor` is a consuming builder: every chained call takes the cursor by
//! value and returns it, and a terminal (`to_list`, `count`, `for_each`)
//! drives exactly one pass over the kind.
//!
//! Without an ordering the pass streams: records are filtered, the first
//! `offset` passing records are skipped, and the walk stops as soon as
//! `limit` records were collected. With an ordering every passing record is
//! materialised and sorted in memory before the offset/limit window is
//! applied.

use std::cmp::Ordering;

use super::error::StorageResult;
use super::record::Record;
use super::transaction::Transaction;

/// Scan direction by primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending keys
    #[default]
    Next,
    /// Descending keys
    Prev,
}

type Filter<'t, T> = Box<dyn Fn(&T) -> bool + 't>;
type Comparator<'t, T> = Box<dyn Fn(&T, &T) -> Ordering + 't>;

/// A pending scan over records of type `T`
pub struct Cursor<'t, 'h, T: Record> {
    tx: &'t Transaction<'h>,
    filters: Vec<Filter<'t, T>>,
    order: Option<Comparator<'t, T>>,
    direction: Direction,
    limit: Option<usize>,
    offset: usize,
}

impl<'t, 'h, T: Record> Cursor<'t, 'h, T> {
    pub(crate) fn new(tx: &'t Transaction<'h>) -> Self {
        Self {
            tx,
            filters: Vec::new(),
            order: None,
            direction: Direction::Next,
            limit: None,
            offset: 0,
        }
    }

    /// Keep only records matching `predicate` (ANDed with earlier filters)
    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + 't) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Scan by ascending (`Next`) or descending (`Prev`) primary key
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sort the filtered records in memory before windowing
    pub fn order(mut self, comparator: impl Fn(&T, &T) -> Ordering + 't) -> Self {
        self.order = Some(Box::new(comparator));
        self
    }

    /// Skip `offset` passing records, then collect at most `limit`
    pub fn limit_and_offset(mut self, limit: Option<usize>, offset: Option<usize>) -> Self {
        self.limit = limit;
        self.offset = offset.unwrap_or(0);
        self
    }

    /// Collect the passing records
    pub fn to_list(self) -> StorageResult<Vec<T>> {
        let mut records = Vec::new();
        self.run(|record| records.push(record))?;
        Ok(records)
    }

    /// Count the passing records
    pub fn count(self) -> StorageResult<usize> {
        let mut count = 0;
        self.run(|_| count += 1)?;
        Ok(count)
    }

    /// Visit the passing records in order
    pub fn for_each(self, visitor: impl FnMut(T)) -> StorageResult<()> {
        self.run(visitor)
    }

    fn run(self, mut visit: impl FnMut(T)) -> StorageResult<()> {
        if self.limit == Some(0) {
            return Ok(());
        }

        let Cursor {
            tx,
            filters,
            order,
            direction,
            limit,
            offset,
        } = self;
        let passes = |record: &T| filters.iter().all(|f| f(record));

        match order {
            None => {
                let mut skipped = 0;
                let mut taken = 0;
                tx.scan::<T, _>(direction, |record| {
                    if !passes(&record) {
                        return true;
                    }
                    if skipped < offset {
                        skipped += 1;
                        return true;
                    }
                    visit(record);
                    taken += 1;
                    limit.map_or(true, |limit| taken < limit)
                })
            }
            Some(comparator) => {
                let mut matched = Vec::new();
                tx.scan::<T, _>(direction, |record| {
                    if passes(&record) {
                        matched.push(record);
                    }
                    true
                })?;
                matched.sort_by(|a, b| comparator(a, b));

                let window = matched.into_iter().skip(offset);
                match limit {
                    Some(limit) => window.take(limit).for_each(&mut visit),
                    None => window.for_each(&mut visit),
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::storage::{RecordKind, StoreHandle, TransactionMode};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: i64,
        value: i64,
    }

    impl Record for Entry {
        type Key = i64;
        const KIND: RecordKind = RecordKind::Query;

        fn key(&self) -> Option<i64> {
            (self.id > 0).then_some(self.id)
        }

        fn assign_key(&mut self, key: i64) {
            self.id = key;
        }
    }

    /// Store holding entries 1..=10 whose value equals their key
    fn seeded() -> StoreHandle {
        let store = StoreHandle::open_in_memory().unwrap();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadWrite)
            .unwrap();
        for value in 1..=10 {
            tx.add(&mut Entry { id: 0, value }).unwrap();
        }
        tx.commit().unwrap();
        store
    }

    fn values(entries: &[Entry]) -> Vec<i64> {
        entries.iter().map(|e| e.value).collect()
    }

    #[test]
    fn test_no_filters_returns_everything() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)
            .unwrap();

        let all = tx.cursor::<Entry>().to_list().unwrap();
        assert_eq!(values(&all), (1..=10).collect::<Vec<_>>());
        assert_eq!(tx.cursor::<Entry>().count().unwrap(), 10);
    }

    #[test]
    fn test_filters_are_anded() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)
            .unwrap();

        let even_over_four = tx
            .cursor::<Entry>()
            .filter(|e| e.value % 2 == 0)
            .filter(|e| e.value > 4)
            .to_list()
            .unwrap();
        assert_eq!(values(&even_over_four), vec![6, 8, 10]);
    }

    #[test]
    fn test_offset_counts_after_filter() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)
            .unwrap();

        let page = tx
            .cursor::<Entry>()
            .filter(|e| e.value % 2 == 1)
            .limit_and_offset(Some(2), Some(1))
            .to_list()
            .unwrap();
        assert_eq!(values(&page), vec![3, 5]);
    }

    #[test]
    fn test_prev_direction_with_limit() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)
            .unwrap();

        let last_three = tx
            .cursor::<Entry>()
            .direction(Direction::Prev)
            .limit_and_offset(Some(3), None)
            .to_list()
            .unwrap();
        assert_eq!(values(&last_three), vec![10, 9, 8]);
    }

    #[test]
    fn test_limit_zero_is_empty() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)
            .unwrap();

        let none = tx
            .cursor::<Entry>()
            .limit_and_offset(Some(0), None)
            .to_list()
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_order_sorts_before_window() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)
            .unwrap();

        let top = tx
            .cursor::<Entry>()
            .order(|a, b| (b.value % 4).cmp(&(a.value % 4)).then(a.value.cmp(&b.value)))
            .limit_and_offset(Some(3), Some(1))
            .to_list()
            .unwrap();
        // remainders 3: [3, 7], 2: [2, 6, 10] -> skip 3, take 7, 2, 6
        assert_eq!(values(&top), vec![7, 2, 6]);
    }

    #[test]
    fn test_order_without_limit_sorts_everything() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)
            .unwrap();

        let sorted = tx
            .cursor::<Entry>()
            .order(|a, b| b.value.cmp(&a.value))
            .to_list()
            .unwrap();
        assert_eq!(values(&sorted), (1..=10).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_for_each_visits_in_order() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)
            .unwrap();

        let mut seen = Vec::new();
        tx.cursor::<Entry>()
            .filter(|e| e.value <= 3)
            .for_each(|e| seen.push(e.value))
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_cursor_outside_scope_fails() {
        let store = seeded();
        let tx = store
            .transaction(&[RecordKind::Bookmark], TransactionMode::ReadOnly)
            .unwrap();

        assert!(tx.cursor::<Entry>().to_list().is_err());
    }
}
