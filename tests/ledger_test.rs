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

//! Inventory ledger public API integration tests.

use lending_catalog::{CatalogError, Entity, InventoryLedger, StockLevel, WorkId};

fn ledger_with(total: u32) -> (InventoryLedger, WorkId) {
    let ledger = InventoryLedger::new();
    let work = WorkId::new();
    ledger.open(work, total).unwrap();
    (ledger, work)
}

// === Basic Ledger Tests ===

#[test]
fn new_entry_has_every_copy_available() {
    let (ledger, work) = ledger_with(3);
    assert_eq!(
        ledger.level(work),
        Some(StockLevel { total: 3, available: 3 })
    );
    assert!(ledger.is_available(work));
    assert_eq!(ledger.len(), 1);
}

#[test]
fn open_with_zero_copies_is_rejected() {
    let ledger = InventoryLedger::new();
    assert_eq!(
        ledger.open(WorkId::new(), 0),
        Err(CatalogError::InvalidQuantity)
    );
    assert!(ledger.is_empty());
}

#[test]
fn add_stock_increases_total_and_available() {
    let (ledger, work) = ledger_with(1);
    let level = ledger.add_stock(work, 4).unwrap();
    assert_eq!(level, StockLevel { total: 5, available: 5 });
}

// === Unit Movements ===

#[test]
fn remove_unit_until_out_of_stock() {
    let (ledger, work) = ledger_with(2);

    assert_eq!(ledger.remove_unit(work).unwrap().available, 1);
    assert_eq!(ledger.remove_unit(work).unwrap().available, 0);
    assert!(!ledger.is_available(work));
    assert_eq!(ledger.remove_unit(work), Err(CatalogError::OutOfStock));
    assert_eq!(ledger.level(work).unwrap().available, 0);
}

#[test]
fn release_unit_restores_availability() {
    let (ledger, work) = ledger_with(2);
    ledger.remove_unit(work).unwrap();

    let level = ledger.release_unit(work).unwrap();
    assert_eq!(level, StockLevel { total: 2, available: 2 });
}

#[test]
fn release_beyond_total_is_invariant_violation() {
    let (ledger, work) = ledger_with(2);
    let result = ledger.release_unit(work);
    assert!(matches!(result, Err(CatalogError::InvariantViolation(_))));
    assert_eq!(ledger.level(work).unwrap().available, 2);
}

#[test]
fn withdraw_unit_shrinks_total() {
    let (ledger, work) = ledger_with(2);
    let level = ledger.withdraw_unit(work).unwrap();
    assert_eq!(level, StockLevel { total: 1, available: 1 });
}

#[test]
fn add_then_remove_all_leaves_none_available() {
    let (ledger, work) = ledger_with(1);
    ledger.withdraw_unit(work).unwrap();
    ledger.add_stock(work, 3).unwrap();
    for _ in 0..3 {
        ledger.remove_unit(work).unwrap();
    }
    assert_eq!(
        ledger.level(work),
        Some(StockLevel { total: 3, available: 0 })
    );
}

#[test]
fn retract_stock_reverses_add() {
    let (ledger, work) = ledger_with(2);
    ledger.add_stock(work, 3).unwrap();
    let level = ledger.retract_stock(work, 3).unwrap();
    assert_eq!(level, StockLevel { total: 2, available: 2 });
}

#[test]
fn operations_on_unknown_work_are_not_found() {
    let ledger = InventoryLedger::new();
    let work = WorkId::new();
    let not_found = Err(CatalogError::NotFound(Entity::Work));

    assert_eq!(ledger.add_stock(work, 1), not_found);
    assert_eq!(ledger.release_unit(work), not_found);
    assert_eq!(ledger.withdraw_unit(work), not_found);
    assert_eq!(ledger.retract_stock(work, 1), not_found);
}

#[test]
fn restore_sets_explicit_counts() {
    let ledger = InventoryLedger::new();
    let work = WorkId::new();
    let level = ledger.restore(work, 4, 1).unwrap();
    assert_eq!(level.on_loan(), 3);
    assert!(ledger.is_available(work));
}

// === Locked Access ===

#[test]
fn locked_entry_moves_copies_in_one_step() {
    let (ledger, work) = ledger_with(2);

    let level = ledger
        .locked(work, |stock| {
            stock.remove_unit()?;
            stock.remove_unit()?;
            assert_eq!(stock.remove_unit(), Err(CatalogError::OutOfStock));
            stock.release_unit()
        })
        .unwrap();

    assert_eq!(level, StockLevel { total: 2, available: 1 });
    assert_eq!(ledger.level(work), Some(level));
}

#[test]
fn locked_passes_closure_errors_through() {
    let (ledger, work) = ledger_with(1);
    let result: Result<(), CatalogError> =
        ledger.locked(work, |_| Err(CatalogError::AlreadyReturned));
    assert_eq!(result, Err(CatalogError::AlreadyReturned));
    assert_eq!(ledger.level(work).unwrap().available, 1);
}

#[test]
fn locked_unknown_work_is_not_found() {
    let ledger = InventoryLedger::new();
    let result = ledger.locked(WorkId::new(), |stock| Ok(stock.level()));
    assert_eq!(result, Err(CatalogError::NotFound(Entity::Work)));
}
