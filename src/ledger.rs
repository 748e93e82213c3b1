// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Inventory ledger.
//!
//! Tracks, per work, how many copies are owned and how many are on the
//! shelf. Every mutation keeps `0 <= available <= total`.
//!
//! # Example
//!
//! ```
//! use lending_catalog::{InventoryLedger, WorkId};
//!
//! let ledger = InventoryLedger::new();
//! let work = WorkId::new();
//! ledger.open(work, 2).unwrap();
//! ledger.remove_unit(work).unwrap();
//! assert!(ledger.is_available(work));
//! ledger.remove_unit(work).unwrap();
//! assert!(!ledger.is_available(work));
//! ```

use crate::base::WorkId;
use crate::error::{CatalogError, Entity};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::Serialize;

/// Point-in-time copy counts for a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub total: u32,
    pub available: u32,
}

impl StockLevel {
    /// Copies currently out on loan.
    pub fn on_loan(&self) -> u32 {
        self.total - self.available
    }
}

//  shelf ──remove_unit──► on loan ──release_unit──► shelf
//  shelf ──withdraw_unit──► gone (total shrinks)
#[derive(Debug)]
struct StockData {
    total: u32,
    available: u32,
}

impl StockData {
    fn assert_invariants(&self) {
        debug_assert!(
            self.available <= self.total,
            "Invariant violated: available {} exceeds total {}",
            self.available,
            self.total
        );
    }

    fn level(&self) -> StockLevel {
        StockLevel {
            total: self.total,
            available: self.available,
        }
    }

    /// Adds newly acquired copies to the shelf.
    fn add(&mut self, count: u32) -> Result<(), CatalogError> {
        if count == 0 {
            return Err(CatalogError::InvalidQuantity);
        }
        let total = self
            .total
            .checked_add(count)
            .ok_or_else(|| CatalogError::InvariantViolation("copy count overflow".into()))?;
        self.total = total;
        self.available += count;
        self.assert_invariants();
        Ok(())
    }

    /// Takes one copy off the shelf for a loan.
    fn remove_unit(&mut self) -> Result<(), CatalogError> {
        if self.available == 0 {
            return Err(CatalogError::OutOfStock);
        }
        self.available -= 1;
        self.assert_invariants();
        Ok(())
    }

    /// Puts a loaned copy back on the shelf.
    fn release_unit(&mut self) -> Result<(), CatalogError> {
        if self.available >= self.total {
            return Err(CatalogError::InvariantViolation(format!(
                "release would raise available above total {}",
                self.total
            )));
        }
        self.available += 1;
        self.assert_invariants();
        Ok(())
    }

    /// Permanently removes one shelved copy.
    fn withdraw_unit(&mut self) -> Result<(), CatalogError> {
        if self.available == 0 {
            return Err(CatalogError::OutOfStock);
        }
        self.available -= 1;
        self.total -= 1;
        self.assert_invariants();
        Ok(())
    }

    /// Undoes an `add` of `count` copies.
    fn retract(&mut self, count: u32) -> Result<(), CatalogError> {
        if self.available < count {
            return Err(CatalogError::InvariantViolation(format!(
                "cannot retract {count} copies with only {} on the shelf",
                self.available
            )));
        }
        self.available -= count;
        self.total -= count;
        self.assert_invariants();
        Ok(())
    }
}

/// Copy counts for a single work.
#[derive(Debug)]
struct Stock {
    inner: Mutex<StockData>,
}

impl Stock {
    fn new(total: u32, available: u32) -> Result<Self, CatalogError> {
        if available > total {
            return Err(CatalogError::InvariantViolation(format!(
                "available {available} exceeds total {total}"
            )));
        }
        Ok(Self {
            inner: Mutex::new(StockData { total, available }),
        })
    }

    fn available(&self) -> u32 {
        self.inner.lock().available
    }

    fn level(&self) -> StockLevel {
        self.inner.lock().level()
    }
}

/// Exclusive handle on one work's counts, lent out by
/// [`InventoryLedger::locked`].
#[derive(Debug)]
pub struct StockEntry<'a> {
    data: &'a mut StockData,
}

impl StockEntry<'_> {
    pub fn level(&self) -> StockLevel {
        self.data.level()
    }

    /// Takes one copy off the shelf.
    pub fn remove_unit(&mut self) -> Result<StockLevel, CatalogError> {
        self.data.remove_unit()?;
        Ok(self.data.level())
    }

    /// Returns one copy to the shelf.
    pub fn release_unit(&mut self) -> Result<StockLevel, CatalogError> {
        self.data.release_unit()?;
        Ok(self.data.level())
    }
}

/// Available/total copy tracker for every work in the catalog.
///
/// # Invariants
///
/// - `0 <= available <= total` for every entry.
/// - Mutations of one work are serialized by that entry's mutex, so two
///   callers can never both take the last copy.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    stock: DashMap<WorkId, Stock>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self {
            stock: DashMap::new(),
        }
    }

    /// Creates the entry for a newly acquired work with every copy shelved.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidQuantity`] - `total` is zero.
    /// - [`CatalogError::InvariantViolation`] - The work already has an entry.
    pub fn open(&self, work_id: WorkId, total: u32) -> Result<StockLevel, CatalogError> {
        if total == 0 {
            return Err(CatalogError::InvalidQuantity);
        }
        self.restore(work_id, total, total)
    }

    /// Creates an entry with explicit counts, used when reconciling
    /// against loan history.
    pub fn restore(
        &self,
        work_id: WorkId,
        total: u32,
        available: u32,
    ) -> Result<StockLevel, CatalogError> {
        let stock = Stock::new(total, available)?;
        let level = stock.level();
        match self.stock.entry(work_id) {
            Entry::Occupied(_) => Err(CatalogError::InvariantViolation(format!(
                "ledger entry for work {work_id} already exists"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(stock);
                Ok(level)
            }
        }
    }

    /// Drops the entry of a work that left the catalog.
    pub fn close(&self, work_id: WorkId) -> Option<StockLevel> {
        self.stock.remove(&work_id).map(|(_, stock)| stock.level())
    }

    /// Increases available and total copies by `count`.
    pub fn add_stock(&self, work_id: WorkId, count: u32) -> Result<StockLevel, CatalogError> {
        self.mutate(work_id, |data| data.add(count))
    }

    /// Takes one copy off the shelf.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::OutOfStock`] if no copy is available.
    pub fn remove_unit(&self, work_id: WorkId) -> Result<StockLevel, CatalogError> {
        self.mutate(work_id, StockData::remove_unit)
    }

    /// Returns one copy to the shelf.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvariantViolation`] if every copy is already
    /// on the shelf.
    pub fn release_unit(&self, work_id: WorkId) -> Result<StockLevel, CatalogError> {
        self.mutate(work_id, StockData::release_unit)
    }

    /// Removes one shelved copy from the collection, shrinking the total.
    pub fn withdraw_unit(&self, work_id: WorkId) -> Result<StockLevel, CatalogError> {
        self.mutate(work_id, StockData::withdraw_unit)
    }

    /// Reverses a previous [`add_stock`](Self::add_stock).
    pub fn retract_stock(&self, work_id: WorkId, count: u32) -> Result<StockLevel, CatalogError> {
        self.mutate(work_id, |data| data.retract(count))
    }

    /// Returns `true` if at least one copy is on the shelf.
    ///
    /// Unknown works are never available.
    pub fn is_available(&self, work_id: WorkId) -> bool {
        self.stock
            .get(&work_id)
            .is_some_and(|stock| stock.available() > 0)
    }

    pub fn level(&self, work_id: WorkId) -> Option<StockLevel> {
        self.stock.get(&work_id).map(|stock| stock.level())
    }

    pub fn len(&self) -> usize {
        self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }

    /// Runs `op` while holding the work's entry lock.
    ///
    /// Other mutations of the same work wait until `op` returns, so a caller
    /// can check loan state and move copies as one step. `op` must not call
    /// back into the ledger for the same work.
    pub fn locked<T, F>(&self, work_id: WorkId, op: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut StockEntry<'_>) -> Result<T, CatalogError>,
    {
        let stock = self
            .stock
            .get(&work_id)
            .ok_or(CatalogError::NotFound(Entity::Work))?;
        let mut data = stock.inner.lock();
        op(&mut StockEntry { data: &mut data })
    }

    fn mutate<F>(&self, work_id: WorkId, op: F) -> Result<StockLevel, CatalogError>
    where
        F: FnOnce(&mut StockData) -> Result<(), CatalogError>,
    {
        let stock = self
            .stock
            .get(&work_id)
            .ok_or(CatalogError::NotFound(Entity::Work))?;
        let mut data = stock.inner.lock();
        op(&mut data)?;
        Ok(data.level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === StockData Internal Tests ===

    #[test]
    fn stock_data_add_grows_both_counts() {
        let mut data = StockData {
            total: 2,
            available: 1,
        };
        data.add(3).unwrap();
        assert_eq!(data.level(), StockLevel { total: 5, available: 4 });
    }

    #[test]
    fn stock_data_add_zero_is_rejected() {
        let mut data = StockData {
            total: 2,
            available: 2,
        };
        assert_eq!(data.add(0), Err(CatalogError::InvalidQuantity));
    }

    #[test]
    fn stock_data_add_overflow_is_invariant_violation() {
        let mut data = StockData {
            total: u32::MAX,
            available: 0,
        };
        assert!(matches!(
            data.add(1),
            Err(CatalogError::InvariantViolation(_))
        ));
        assert_eq!(data.total, u32::MAX);
    }

    #[test]
    fn stock_data_remove_unit_empty_shelf() {
        let mut data = StockData {
            total: 1,
            available: 0,
        };
        assert_eq!(data.remove_unit(), Err(CatalogError::OutOfStock));
    }

    #[test]
    fn stock_data_release_unit_bounded_by_total() {
        let mut data = StockData {
            total: 1,
            available: 1,
        };
        assert!(matches!(
            data.release_unit(),
            Err(CatalogError::InvariantViolation(_))
        ));
        assert_eq!(data.available, 1);
    }

    #[test]
    fn stock_data_withdraw_requires_shelved_copy() {
        let mut data = StockData {
            total: 2,
            available: 0,
        };
        assert_eq!(data.withdraw_unit(), Err(CatalogError::OutOfStock));
        assert_eq!(data.total, 2);
    }

    #[test]
    fn stock_data_retract_cannot_take_loaned_copies() {
        let mut data = StockData {
            total: 4,
            available: 1,
        };
        assert!(matches!(
            data.retract(2),
            Err(CatalogError::InvariantViolation(_))
        ));
        data.retract(1).unwrap();
        assert_eq!(data.level(), StockLevel { total: 3, available: 0 });
    }

    // === Ledger Tests ===

    #[test]
    fn open_rejects_duplicate_entry() {
        let ledger = InventoryLedger::new();
        let work = WorkId::new();
        ledger.open(work, 1).unwrap();
        assert!(matches!(
            ledger.open(work, 1),
            Err(CatalogError::InvariantViolation(_))
        ));
    }

    #[test]
    fn restore_rejects_available_above_total() {
        let ledger = InventoryLedger::new();
        assert!(matches!(
            ledger.restore(WorkId::new(), 1, 2),
            Err(CatalogError::InvariantViolation(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn unknown_work_is_not_found() {
        let ledger = InventoryLedger::new();
        let work = WorkId::new();
        assert_eq!(
            ledger.remove_unit(work),
            Err(CatalogError::NotFound(Entity::Work))
        );
        assert!(!ledger.is_available(work));
        assert_eq!(ledger.level(work), None);
    }

    #[test]
    fn close_removes_entry() {
        let ledger = InventoryLedger::new();
        let work = WorkId::new();
        ledger.open(work, 3).unwrap();
        assert_eq!(
            ledger.close(work),
            Some(StockLevel { total: 3, available: 3 })
        );
        assert!(ledger.is_empty());
        assert_eq!(ledger.close(work), None);
    }

    #[test]
    fn on_loan_is_total_minus_available() {
        let level = StockLevel {
            total: 5,
            available: 2,
        };
        assert_eq!(level.on_loan(), 3);
    }
}
