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

//! # Lending Catalog
//!
//! This library tracks a lending catalog: works and their copies, registered
//! borrowers, and the loans between them, including renewals, returns and
//! overdue fines.
//!
//! ## Core Components
//!
//! - [`Catalog`]: Loan lifecycle manager and façade over the other parts
//! - [`InventoryLedger`]: Per-work total/available copy counts
//! - [`Loan`]: Loan record with its `Open` → `Returned` state machine
//! - [`Repository`]: Persistence collaborator the catalog is built on
//! - [`CatalogError`]: Error types for catalog operations
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use lending_catalog::{Borrower, Catalog, Config, FixedClock, InMemoryRepository, Work};
//! use rust_decimal_macros::dec;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
//! let catalog = Catalog::with_clock(
//!     InMemoryRepository::new(),
//!     Config::default(),
//!     FixedClock::new(today),
//! )
//! .unwrap();
//!
//! let work = catalog
//!     .add_work(Work::new("Dom Casmurro", "Machado de Assis", 1899, "Novel", 3).unwrap())
//!     .unwrap();
//! let maria = catalog
//!     .register_borrower(Borrower::new("Maria", "maria@example.com").unwrap())
//!     .unwrap();
//!
//! // Check out for a week
//! let loan = catalog.checkout(work.id(), maria.id(), 7).unwrap();
//! assert_eq!(catalog.stock_level(work.id()).unwrap().available, 2);
//!
//! // Two days late at the default rate of 5.00 per day
//! let late = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
//! assert_eq!(catalog.fine(loan.id(), late).unwrap(), dec!(10.00));
//! ```
//!
//! ## Thread Safety
//!
//! The catalog is designed for a single operator, but the ledger serializes
//! mutations per work, so concurrent checkouts of the last copy cannot both
//! succeed.

mod base;
pub mod borrower;
mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod loan;
pub mod report;
pub mod repository;
pub mod work;

pub use base::{BorrowerId, LoanId, WorkId};
pub use borrower::Borrower;
pub use catalog::{Catalog, Clock, FixedClock, SystemClock, Withdrawal};
pub use config::{Config, ConfigError};
pub use error::{CatalogError, Entity, StorageError};
pub use ledger::{InventoryLedger, StockEntry, StockLevel};
pub use loan::{Loan, LoanStatus};
pub use report::{HistoryEntry, InventoryRow, OverdueRow, write_csv};
pub use repository::{InMemoryRepository, Repository};
pub use work::Work;
