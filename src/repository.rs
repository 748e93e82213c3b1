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

//! Persistence collaborator.
//!
//! The catalog owns no durable state of its own: works, borrowers and loans
//! live behind a [`Repository`], which is injected into the
//! [`Catalog`](crate::Catalog). Calls are blocking and either fully apply or
//! fail with a [`StorageError`].

use crate::base::{BorrowerId, LoanId, WorkId};
use crate::borrower::Borrower;
use crate::error::StorageError;
use crate::loan::Loan;
use crate::work::Work;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Create/read/update/delete access to works, borrowers and loans.
pub trait Repository: Send + Sync {
    fn insert_work(&self, work: &Work) -> Result<(), StorageError>;
    fn update_work(&self, work: &Work) -> Result<(), StorageError>;
    fn delete_work(&self, id: WorkId) -> Result<(), StorageError>;
    fn work(&self, id: WorkId) -> Result<Option<Work>, StorageError>;
    fn works(&self) -> Result<Vec<Work>, StorageError>;
    /// Case-insensitive title lookup.
    fn find_work_by_title(&self, title: &str) -> Result<Option<Work>, StorageError>;

    fn insert_borrower(&self, borrower: &Borrower) -> Result<(), StorageError>;
    fn delete_borrower(&self, id: BorrowerId) -> Result<(), StorageError>;
    fn borrower(&self, id: BorrowerId) -> Result<Option<Borrower>, StorageError>;
    fn borrowers(&self) -> Result<Vec<Borrower>, StorageError>;
    /// Case-insensitive name lookup. Names are expected to be unique.
    fn find_borrower_by_name(&self, name: &str) -> Result<Option<Borrower>, StorageError>;

    fn insert_loan(&self, loan: &Loan) -> Result<(), StorageError>;
    fn update_loan(&self, loan: &Loan) -> Result<(), StorageError>;
    fn delete_loan(&self, id: LoanId) -> Result<(), StorageError>;
    fn loan(&self, id: LoanId) -> Result<Option<Loan>, StorageError>;
    fn loans(&self) -> Result<Vec<Loan>, StorageError>;

    fn loans_for_borrower(&self, id: BorrowerId) -> Result<Vec<Loan>, StorageError> {
        Ok(self
            .loans()?
            .into_iter()
            .filter(|loan| loan.borrower_id() == id)
            .collect())
    }

    fn loans_for_work(&self, id: WorkId) -> Result<Vec<Loan>, StorageError> {
        Ok(self
            .loans()?
            .into_iter()
            .filter(|loan| loan.work_id() == id)
            .collect())
    }
}

/// In-process repository backed by concurrent maps.
///
/// Enforces the same constraints a relational schema would: unique ids,
/// unique titles and unique borrower names (both case-insensitive).
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    works: DashMap<WorkId, Work>,
    borrowers: DashMap<BorrowerId, Borrower>,
    loans: DashMap<LoanId, Loan>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn constraint(context: &str, message: String) -> StorageError {
    StorageError::message(context, message)
}

impl Repository for InMemoryRepository {
    fn insert_work(&self, work: &Work) -> Result<(), StorageError> {
        if self.works.iter().any(|w| w.has_title(work.title())) {
            return Err(constraint(
                "insert work",
                format!("title '{}' already exists", work.title()),
            ));
        }
        match self.works.entry(work.id()) {
            Entry::Occupied(_) => Err(constraint(
                "insert work",
                format!("duplicate id {}", work.id()),
            )),
            Entry::Vacant(entry) => {
                entry.insert(work.clone());
                Ok(())
            }
        }
    }

    fn update_work(&self, work: &Work) -> Result<(), StorageError> {
        let mut stored = self
            .works
            .get_mut(&work.id())
            .ok_or_else(|| constraint("update work", format!("no work with id {}", work.id())))?;
        *stored = work.clone();
        Ok(())
    }

    fn delete_work(&self, id: WorkId) -> Result<(), StorageError> {
        self.works
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| constraint("delete work", format!("no work with id {id}")))
    }

    fn work(&self, id: WorkId) -> Result<Option<Work>, StorageError> {
        Ok(self.works.get(&id).map(|w| w.clone()))
    }

    fn works(&self) -> Result<Vec<Work>, StorageError> {
        Ok(self.works.iter().map(|w| w.clone()).collect())
    }

    fn find_work_by_title(&self, title: &str) -> Result<Option<Work>, StorageError> {
        Ok(self
            .works
            .iter()
            .find(|w| w.has_title(title))
            .map(|w| w.clone()))
    }

    fn insert_borrower(&self, borrower: &Borrower) -> Result<(), StorageError> {
        if self.borrowers.iter().any(|b| b.has_name(borrower.name())) {
            return Err(constraint(
                "insert borrower",
                format!("name '{}' already exists", borrower.name()),
            ));
        }
        match self.borrowers.entry(borrower.id()) {
            Entry::Occupied(_) => Err(constraint(
                "insert borrower",
                format!("duplicate id {}", borrower.id()),
            )),
            Entry::Vacant(entry) => {
                entry.insert(borrower.clone());
                Ok(())
            }
        }
    }

    fn delete_borrower(&self, id: BorrowerId) -> Result<(), StorageError> {
        self.borrowers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| constraint("delete borrower", format!("no borrower with id {id}")))
    }

    fn borrower(&self, id: BorrowerId) -> Result<Option<Borrower>, StorageError> {
        Ok(self.borrowers.get(&id).map(|b| b.clone()))
    }

    fn borrowers(&self) -> Result<Vec<Borrower>, StorageError> {
        Ok(self.borrowers.iter().map(|b| b.clone()).collect())
    }

    fn find_borrower_by_name(&self, name: &str) -> Result<Option<Borrower>, StorageError> {
        Ok(self
            .borrowers
            .iter()
            .find(|b| b.has_name(name))
            .map(|b| b.clone()))
    }

    fn insert_loan(&self, loan: &Loan) -> Result<(), StorageError> {
        match self.loans.entry(loan.id()) {
            Entry::Occupied(_) => Err(constraint(
                "insert loan",
                format!("duplicate id {}", loan.id()),
            )),
            Entry::Vacant(entry) => {
                entry.insert(loan.clone());
                Ok(())
            }
        }
    }

    fn update_loan(&self, loan: &Loan) -> Result<(), StorageError> {
        let mut stored = self
            .loans
            .get_mut(&loan.id())
            .ok_or_else(|| constraint("update loan", format!("no loan with id {}", loan.id())))?;
        *stored = loan.clone();
        Ok(())
    }

    fn delete_loan(&self, id: LoanId) -> Result<(), StorageError> {
        self.loans
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| constraint("delete loan", format!("no loan with id {id}")))
    }

    fn loan(&self, id: LoanId) -> Result<Option<Loan>, StorageError> {
        Ok(self.loans.get(&id).map(|l| l.clone()))
    }

    fn loans(&self) -> Result<Vec<Loan>, StorageError> {
        Ok(self.loans.iter().map(|l| l.clone()).collect())
    }
}
