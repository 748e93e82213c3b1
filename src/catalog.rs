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

//! Loan lifecycle manager.
//!
//! The [`Catalog`] is the central component: it owns the
//! [`InventoryLedger`], drives loans through their lifecycle and keeps both in
//! step with the injected [`Repository`].
//!
//! # Operations
//!
//! - **Acquisition**: new titles get a ledger entry; known titles gain stock.
//! - **Withdrawal**: one shelved copy leaves; the last one removes the work.
//! - **Checkout**: takes a copy off the shelf and records an open loan.
//! - **Return**: closes the loan and puts the copy back.
//! - **Renewal**: moves the due date; never touches the ledger.
//!
//! # Transactions
//!
//! Every ledger mutation is paired with a repository write. When the write
//! fails the mutation is undone before the error is returned, so a copy is
//! never marked out without a loan to account for it, or vice versa.

use crate::base::{BorrowerId, LoanId, WorkId};
use crate::borrower::Borrower;
use crate::config::Config;
use crate::error::{CatalogError, Entity};
use crate::ledger::{InventoryLedger, StockLevel};
use crate::loan::Loan;
use crate::repository::Repository;
use crate::work::Work;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Source of "today" for checkouts.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Reads the local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock() = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock()
    }
}

/// Outcome of withdrawing a copy from the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Withdrawal {
    /// Copies are left; carries the new counts.
    Remaining(StockLevel),
    /// The last copy was withdrawn and the work left the catalog.
    Removed,
}

/// Lending catalog managing works, borrowers, stock and loans.
///
/// # Invariants
///
/// - Every work in the repository has exactly one ledger entry.
/// - For every work, `available == total - open loans`.
/// - Loans are always for a single copy.
/// - A returned loan is never reopened or renewed.
pub struct Catalog<R, C = SystemClock> {
    repository: R,
    ledger: InventoryLedger,
    config: Config,
    clock: C,
}

impl<R: Repository> Catalog<R> {
    /// Opens a catalog over `repository` using the system clock.
    pub fn open(repository: R, config: Config) -> Result<Self, CatalogError> {
        Self::with_clock(repository, config, SystemClock)
    }
}

impl<R: Repository, C: Clock> Catalog<R, C> {
    /// Opens a catalog and rebuilds the ledger from persisted works and their
    /// open loans.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvariantViolation`] - Stored loans exceed a work's
    ///   copies, or reference a work that no longer exists.
    /// - [`CatalogError::Storage`] - The repository could not be read.
    pub fn with_clock(repository: R, config: Config, clock: C) -> Result<Self, CatalogError> {
        let catalog = Self {
            repository,
            ledger: InventoryLedger::new(),
            config,
            clock,
        };
        catalog.reconcile()?;
        Ok(catalog)
    }

    fn reconcile(&self) -> Result<(), CatalogError> {
        let mut on_loan: HashMap<WorkId, u32> = HashMap::new();
        for loan in self.repository.loans()? {
            if loan.is_open() {
                *on_loan.entry(loan.work_id()).or_default() += 1;
            }
        }

        for work in self.repository.works()? {
            let out = on_loan.remove(&work.id()).unwrap_or(0);
            let available = work.total_copies().checked_sub(out).ok_or_else(|| {
                CatalogError::InvariantViolation(format!(
                    "work {} has {out} open loans but only {} copies",
                    work.id(),
                    work.total_copies()
                ))
            })?;
            self.ledger
                .restore(work.id(), work.total_copies(), available)?;
        }

        if let Some(orphan) = on_loan.keys().next() {
            return Err(CatalogError::InvariantViolation(format!(
                "open loans reference unknown work {orphan}"
            )));
        }

        debug!(works = self.ledger.len(), "ledger reconciled");
        Ok(())
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // === Works ===

    /// Adds a work to the catalog.
    ///
    /// A title already in the catalog (compared case-insensitively) is not
    /// duplicated: its stock grows by the new record's copies and the stored
    /// work is returned.
    pub fn add_work(&self, work: Work) -> Result<Work, CatalogError> {
        if let Some(mut existing) = self.repository.find_work_by_title(work.title())? {
            let level = self.add_stock(existing.id(), work.total_copies())?;
            existing.set_total_copies(level.total);
            return Ok(existing);
        }

        self.ledger.open(work.id(), work.total_copies())?;
        if let Err(err) = self.repository.insert_work(&work) {
            warn!(work = %work.id(), error = %err, "work insert failed, closing ledger entry");
            self.ledger.close(work.id());
            return Err(err.into());
        }

        info!(work = %work.id(), title = work.title(), copies = work.total_copies(), "work acquired");
        Ok(work)
    }

    /// Increases available and total copies of a work by `count`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] - Unknown work.
    /// - [`CatalogError::InvalidQuantity`] - `count` is zero.
    pub fn add_stock(&self, work_id: WorkId, count: u32) -> Result<StockLevel, CatalogError> {
        let mut work = self.load_work(work_id)?;
        let level = self.ledger.add_stock(work_id, count)?;

        work.set_total_copies(level.total);
        if let Err(err) = self.repository.update_work(&work) {
            warn!(work = %work_id, error = %err, "stock update failed, rolling back");
            self.roll_back("add_stock", self.ledger.retract_stock(work_id, count));
            return Err(err.into());
        }

        info!(work = %work_id, added = count, total = level.total, available = level.available, "stock added");
        Ok(level)
    }

    /// Withdraws one shelved copy from the collection.
    ///
    /// Withdrawing the last copy deletes the work and its ledger entry. Copies
    /// out on loan cannot be withdrawn.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] - Unknown work.
    /// - [`CatalogError::OutOfStock`] - No copy is on the shelf.
    pub fn withdraw_unit(&self, work_id: WorkId) -> Result<Withdrawal, CatalogError> {
        let mut work = self.load_work(work_id)?;
        let level = self.ledger.withdraw_unit(work_id)?;

        let persisted = if level.total == 0 {
            self.repository.delete_work(work_id)
        } else {
            work.set_total_copies(level.total);
            self.repository.update_work(&work)
        };
        if let Err(err) = persisted {
            warn!(work = %work_id, error = %err, "withdrawal failed, rolling back");
            self.roll_back("withdraw_unit", self.ledger.add_stock(work_id, 1));
            return Err(err.into());
        }

        if level.total == 0 {
            self.ledger.close(work_id);
            info!(work = %work_id, title = work.title(), "last copy withdrawn, work removed");
            Ok(Withdrawal::Removed)
        } else {
            info!(work = %work_id, total = level.total, "copy withdrawn");
            Ok(Withdrawal::Remaining(level))
        }
    }

    /// Returns `true` if the work has at least one copy on the shelf.
    pub fn is_available(&self, work_id: WorkId) -> bool {
        self.ledger.is_available(work_id)
    }

    pub fn stock_level(&self, work_id: WorkId) -> Option<StockLevel> {
        self.ledger.level(work_id)
    }

    /// Finds a work by title, ignoring case.
    pub fn work_by_title(&self, title: &str) -> Result<Work, CatalogError> {
        self.repository
            .find_work_by_title(title)?
            .ok_or(CatalogError::NotFound(Entity::Work))
    }

    pub fn work(&self, work_id: WorkId) -> Result<Work, CatalogError> {
        self.load_work(work_id)
    }

    // === Borrowers ===

    pub fn register_borrower(&self, borrower: Borrower) -> Result<Borrower, CatalogError> {
        self.repository.insert_borrower(&borrower)?;
        info!(borrower = %borrower.id(), name = borrower.name(), "borrower registered");
        Ok(borrower)
    }

    /// Finds a borrower by name, ignoring case.
    pub fn borrower_by_name(&self, name: &str) -> Result<Borrower, CatalogError> {
        self.repository
            .find_borrower_by_name(name)?
            .ok_or(CatalogError::NotFound(Entity::Borrower))
    }

    pub fn borrower(&self, borrower_id: BorrowerId) -> Result<Borrower, CatalogError> {
        self.load_borrower(borrower_id)
    }

    /// Removes a borrower who holds no open loans.
    ///
    /// Their closed loans stay in the history.
    pub fn remove_borrower(&self, borrower_id: BorrowerId) -> Result<(), CatalogError> {
        self.load_borrower(borrower_id)?;
        if !self.open_loans_for(borrower_id)?.is_empty() {
            return Err(CatalogError::OpenLoans);
        }
        self.repository.delete_borrower(borrower_id)?;
        info!(borrower = %borrower_id, "borrower removed");
        Ok(())
    }

    // === Loans ===

    /// Lends one copy of a work, due `term_days` from today.
    pub fn checkout(
        &self,
        work_id: WorkId,
        borrower_id: BorrowerId,
        term_days: i64,
    ) -> Result<Loan, CatalogError> {
        self.checkout_on(work_id, borrower_id, self.clock.today(), term_days)
    }

    /// Lends one copy of a work with an explicit checkout date.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] - Unknown work or borrower.
    /// - [`CatalogError::Unavailable`] - Every copy is out.
    /// - [`CatalogError::InvalidTerm`] - `term_days` is zero or negative.
    /// - [`CatalogError::Storage`] - The loan could not be recorded; the
    ///   ledger is left untouched.
    pub fn checkout_on(
        &self,
        work_id: WorkId,
        borrower_id: BorrowerId,
        checkout_date: NaiveDate,
        term_days: i64,
    ) -> Result<Loan, CatalogError> {
        self.load_work(work_id)?;
        self.load_borrower(borrower_id)?;
        if !self.ledger.is_available(work_id) {
            return Err(CatalogError::Unavailable);
        }

        let loan = Loan::open(work_id, borrower_id, checkout_date, term_days)?;

        // Another caller may have taken the last copy since the check above.
        let level = self.ledger.remove_unit(work_id).map_err(|err| match err {
            CatalogError::OutOfStock => CatalogError::Unavailable,
            other => other,
        })?;

        if let Err(err) = self.repository.insert_loan(&loan) {
            warn!(loan = %loan.id(), error = %err, "loan insert failed, releasing copy");
            self.roll_back("checkout", self.ledger.release_unit(work_id));
            return Err(err.into());
        }

        info!(
            loan = %loan.id(),
            work = %work_id,
            borrower = %borrower_id,
            due = %loan.due_date(),
            available = level.available,
            "checked out"
        );
        Ok(loan)
    }

    /// Closes an open loan and puts its copy back on the shelf.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] - Unknown loan.
    /// - [`CatalogError::AlreadyReturned`] - Loan is already closed.
    /// - [`CatalogError::InvalidDate`] - `return_date` precedes the checkout.
    pub fn return_loan(
        &self,
        loan_id: LoanId,
        return_date: NaiveDate,
    ) -> Result<Loan, CatalogError> {
        let work_id = self.open_loan_work(loan_id)?;

        // The loan is re-read under the work's lock; a concurrent return of
        // the same loan sees it closed and fails with `AlreadyReturned`.
        let (loan, level) = self.ledger.locked(work_id, |stock| {
            let mut loan = self.load_loan(loan_id)?;
            loan.mark_returned(return_date)?;

            let level = stock.release_unit()?;
            if let Err(err) = self.repository.update_loan(&loan) {
                warn!(loan = %loan_id, error = %err, "return failed, taking copy back off the shelf");
                self.roll_back("return_loan", stock.remove_unit());
                return Err(err.into());
            }
            Ok((loan, level))
        })?;

        info!(
            loan = %loan_id,
            work = %loan.work_id(),
            returned = %return_date,
            overdue_days = loan.overdue_days(return_date),
            available = level.available,
            "returned"
        );
        Ok(loan)
    }

    /// Extends an open loan's due date by `extra_days`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] - Unknown loan.
    /// - [`CatalogError::AlreadyReturned`] - Loan is closed.
    /// - [`CatalogError::InvalidExtension`] - `extra_days` is zero or negative.
    pub fn renew(&self, loan_id: LoanId, extra_days: i64) -> Result<Loan, CatalogError> {
        let work_id = self.open_loan_work(loan_id)?;
        let loan = self.ledger.locked(work_id, |_| {
            let mut loan = self.load_loan(loan_id)?;
            loan.extend(extra_days)?;
            self.repository.update_loan(&loan)?;
            Ok(loan)
        })?;
        info!(loan = %loan_id, due = %loan.due_date(), "renewed");
        Ok(loan)
    }

    pub fn loan(&self, loan_id: LoanId) -> Result<Loan, CatalogError> {
        self.load_loan(loan_id)
    }

    /// Days the loan is past due at `reference` (or at its return date once closed).
    pub fn overdue_days(&self, loan_id: LoanId, reference: NaiveDate) -> Result<i64, CatalogError> {
        Ok(self.load_loan(loan_id)?.overdue_days(reference))
    }

    /// Fine owed on a loan: overdue days times the configured daily rate.
    pub fn fine(&self, loan_id: LoanId, reference: NaiveDate) -> Result<Decimal, CatalogError> {
        Ok(self.fine_for(&self.load_loan(loan_id)?, reference))
    }

    pub fn fine_for(&self, loan: &Loan, reference: NaiveDate) -> Decimal {
        Decimal::from(loan.overdue_days(reference)) * self.config.fine_rate_per_day
    }

    /// Open loans held by a borrower, oldest checkout first.
    pub fn open_loans_for(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>, CatalogError> {
        let mut loans: Vec<Loan> = self
            .repository
            .loans_for_borrower(borrower_id)?
            .into_iter()
            .filter(Loan::is_open)
            .collect();
        loans.sort_by_key(|loan| (loan.checkout_date(), loan.due_date()));
        Ok(loans)
    }

    /// Deletes the closed loan records of a work. Open loans are kept.
    ///
    /// Returns the number of records removed.
    pub fn purge_returned_loans(&self, work_id: WorkId) -> Result<usize, CatalogError> {
        let mut purged = 0;
        for loan in self.repository.loans_for_work(work_id)? {
            if !loan.is_open() {
                self.repository.delete_loan(loan.id())?;
                purged += 1;
            }
        }
        info!(work = %work_id, purged, "returned loans purged");
        Ok(purged)
    }

    // === Helpers ===

    fn load_work(&self, work_id: WorkId) -> Result<Work, CatalogError> {
        debug!(work = %work_id, "loading work");
        self.repository
            .work(work_id)?
            .ok_or(CatalogError::NotFound(Entity::Work))
    }

    fn load_borrower(&self, borrower_id: BorrowerId) -> Result<Borrower, CatalogError> {
        debug!(borrower = %borrower_id, "loading borrower");
        self.repository
            .borrower(borrower_id)?
            .ok_or(CatalogError::NotFound(Entity::Borrower))
    }

    fn load_loan(&self, loan_id: LoanId) -> Result<Loan, CatalogError> {
        debug!(loan = %loan_id, "loading loan");
        self.repository
            .loan(loan_id)?
            .ok_or(CatalogError::NotFound(Entity::Loan))
    }

    /// Work of an open loan. Closed loans may outlive their work's ledger
    /// entry, so they are turned away before any lock is taken.
    fn open_loan_work(&self, loan_id: LoanId) -> Result<WorkId, CatalogError> {
        let loan = self.load_loan(loan_id)?;
        if !loan.is_open() {
            return Err(CatalogError::AlreadyReturned);
        }
        Ok(loan.work_id())
    }

    fn roll_back(&self, operation: &str, undo: Result<StockLevel, CatalogError>) {
        if let Err(err) = undo {
            error!(operation, error = %err, "ledger rollback failed");
        }
    }
}
