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

//! Loan records.
//!
//! Loans follow a two-state machine:
//! - [`Open`] → [`Returned`] (via return, terminal)
//! - [`Open`] → [`Open`] (via renewal, due date moves forward)
//!
//! [`Open`]: LoanStatus::Open
//! [`Returned`]: LoanStatus::Returned

use crate::base::{BorrowerId, LoanId, WorkId};
use crate::error::CatalogError;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LoanStatus {
    Open,
    Returned,
}

/// One copy of one work lent to one borrower.
///
/// `work_id`, `borrower_id` and `checkout_date` never change after creation.
/// The return date is absent while the loan is open.
#[derive(Debug, Clone, Serialize)]
pub struct Loan {
    id: LoanId,
    work_id: WorkId,
    borrower_id: BorrowerId,
    checkout_date: NaiveDate,
    due_date: NaiveDate,
    return_date: Option<NaiveDate>,
}

impl Loan {
    /// Opens a loan due `term_days` after `checkout_date`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidTerm`] - `term_days` is zero or negative.
    /// - [`CatalogError::InvalidDate`] - Due date falls outside the calendar.
    pub fn open(
        work_id: WorkId,
        borrower_id: BorrowerId,
        checkout_date: NaiveDate,
        term_days: i64,
    ) -> Result<Self, CatalogError> {
        if term_days <= 0 {
            return Err(CatalogError::InvalidTerm);
        }
        let due_date = add_days(checkout_date, term_days)?;
        Ok(Self {
            id: LoanId::new(),
            work_id,
            borrower_id,
            checkout_date,
            due_date,
            return_date: None,
        })
    }

    /// Rebuilds a stored loan, checking its date ordering.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidDate`] if `due_date <= checkout_date` or
    /// `return_date < checkout_date`.
    pub fn from_record(
        id: LoanId,
        work_id: WorkId,
        borrower_id: BorrowerId,
        checkout_date: NaiveDate,
        due_date: NaiveDate,
        return_date: Option<NaiveDate>,
    ) -> Result<Self, CatalogError> {
        if due_date <= checkout_date {
            return Err(CatalogError::InvalidDate);
        }
        if return_date.is_some_and(|returned| returned < checkout_date) {
            return Err(CatalogError::InvalidDate);
        }
        Ok(Self {
            id,
            work_id,
            borrower_id,
            checkout_date,
            due_date,
            return_date,
        })
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn work_id(&self) -> WorkId {
        self.work_id
    }

    pub fn borrower_id(&self) -> BorrowerId {
        self.borrower_id
    }

    pub fn checkout_date(&self) -> NaiveDate {
        self.checkout_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        self.return_date
    }

    pub fn status(&self) -> LoanStatus {
        match self.return_date {
            Some(_) => LoanStatus::Returned,
            None => LoanStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == LoanStatus::Open
    }

    /// Days past the due date.
    ///
    /// Closed loans are measured at their return date, so the count is frozen
    /// once the copy comes back; open loans are measured at `reference`.
    pub fn overdue_days(&self, reference: NaiveDate) -> i64 {
        let effective = self.return_date.unwrap_or(reference);
        (effective - self.due_date).num_days().max(0)
    }

    /// Closes the loan.
    pub(crate) fn mark_returned(&mut self, return_date: NaiveDate) -> Result<(), CatalogError> {
        if !self.is_open() {
            return Err(CatalogError::AlreadyReturned);
        }
        if return_date < self.checkout_date {
            return Err(CatalogError::InvalidDate);
        }
        self.return_date = Some(return_date);
        Ok(())
    }

    /// Pushes the due date forward by `extra_days`.
    pub(crate) fn extend(&mut self, extra_days: i64) -> Result<(), CatalogError> {
        if !self.is_open() {
            return Err(CatalogError::AlreadyReturned);
        }
        if extra_days <= 0 {
            return Err(CatalogError::InvalidExtension);
        }
        self.due_date = add_days(self.due_date, extra_days)?;
        Ok(())
    }
}

impl PartialEq for Loan {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Loan {}

impl Hash for Loan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate, CatalogError> {
    let days = u64::try_from(days).map_err(|_| CatalogError::InvalidDate)?;
    date.checked_add_days(Days::new(days))
        .ok_or(CatalogError::InvalidDate)
}
