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

//! Read-only reports over the ledger and loan history.
//!
//! None of these queries mutate state. Monetary values are rounded to
//! [`MONEY_PRECISION`] decimal places when serialized.

use crate::base::{BorrowerId, LoanId};
use crate::catalog::{Catalog, Clock};
use crate::error::{CatalogError, Entity};
use crate::loan::LoanStatus;
use crate::repository::Repository;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::HashMap;
use std::io::Write;

pub const MONEY_PRECISION: u32 = 2;

/// One line of the inventory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InventoryRow {
    pub title: String,
    pub author: String,
    pub year: i32,
    pub category: String,
    pub total: u32,
    pub available: u32,
}

/// Fines owed by one borrower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueRow {
    pub borrower_id: BorrowerId,
    pub name: String,
    pub overdue_loans: usize,
    pub total_fine: Decimal,
}

impl Serialize for OverdueRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("OverdueRow", 4)?;
        state.serialize_field("borrower", &self.borrower_id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("overdue_loans", &self.overdue_loans)?;
        state.serialize_field("total_fine", &self.total_fine.round_dp(MONEY_PRECISION))?;
        state.end()
    }
}

/// One loan in a borrower's history.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HistoryEntry {
    pub loan: LoanId,
    /// `None` once the work has been withdrawn from the catalog.
    pub title: Option<String>,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
}

impl<R: Repository, C: Clock> Catalog<R, C> {
    /// Every work with its copy counts, ordered by title ignoring case.
    pub fn inventory_snapshot(&self) -> Result<Vec<InventoryRow>, CatalogError> {
        let mut rows = Vec::new();
        for work in self.repository().works()? {
            let level = self.ledger().level(work.id()).ok_or_else(|| {
                CatalogError::InvariantViolation(format!("work {} has no ledger entry", work.id()))
            })?;
            rows.push(InventoryRow {
                title: work.title().to_string(),
                author: work.author().to_string(),
                year: work.year(),
                category: work.category().to_string(),
                total: level.total,
                available: level.available,
            });
        }
        rows.sort_by_cached_key(|row| (row.title.to_lowercase(), row.title.clone()));
        Ok(rows)
    }

    /// Fines owed per borrower at `reference`, ordered by borrower name.
    ///
    /// Only open loans count: a late loan that has been returned no longer
    /// appears here, although [`fine`](Catalog::fine) still reports its
    /// frozen amount.
    pub fn overdue_summary(&self, reference: NaiveDate) -> Result<Vec<OverdueRow>, CatalogError> {
        let mut owed: HashMap<BorrowerId, (usize, Decimal)> = HashMap::new();
        for loan in self.repository().loans()? {
            if !loan.is_open() || loan.overdue_days(reference) == 0 {
                continue;
            }
            let entry = owed.entry(loan.borrower_id()).or_default();
            entry.0 += 1;
            entry.1 += self.fine_for(&loan, reference);
        }

        let mut rows = Vec::with_capacity(owed.len());
        for (borrower_id, (overdue_loans, total_fine)) in owed {
            let name = self
                .repository()
                .borrower(borrower_id)?
                .map(|borrower| borrower.name().to_string())
                .ok_or(CatalogError::NotFound(Entity::Borrower))?;
            rows.push(OverdueRow {
                borrower_id,
                name,
                overdue_loans,
                total_fine,
            });
        }
        rows.sort_by_cached_key(|row| (row.name.to_lowercase(), row.name.clone(), row.borrower_id));
        Ok(rows)
    }

    /// All loans of a borrower, newest checkout first.
    pub fn borrower_history(
        &self,
        borrower_id: BorrowerId,
    ) -> Result<Vec<HistoryEntry>, CatalogError> {
        self.borrower(borrower_id)?;

        let mut titles: HashMap<_, Option<String>> = HashMap::new();
        let mut entries = Vec::new();
        for loan in self.repository().loans_for_borrower(borrower_id)? {
            let title = match titles.get(&loan.work_id()) {
                Some(title) => title.clone(),
                None => {
                    let title = self
                        .repository()
                        .work(loan.work_id())?
                        .map(|work| work.title().to_string());
                    titles.insert(loan.work_id(), title.clone());
                    title
                }
            };
            entries.push(HistoryEntry {
                loan: loan.id(),
                title,
                checkout_date: loan.checkout_date(),
                due_date: loan.due_date(),
                return_date: loan.return_date(),
                status: loan.status(),
            });
        }
        entries.sort_by(|a, b| {
            b.checkout_date
                .cmp(&a.checkout_date)
                .then(b.due_date.cmp(&a.due_date))
        });
        Ok(entries)
    }
}

/// Renders report rows as CSV with a header line.
///
/// # Errors
///
/// Returns a CSV error if serialization or writing fails.
pub fn write_csv<T, W>(rows: &[T], writer: W) -> Result<(), csv::Error>
where
    T: serde::Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn overdue_row_rounds_fine_to_cents() {
        let row = OverdueRow {
            borrower_id: BorrowerId::new(),
            name: "Maria".into(),
            overdue_loans: 1,
            total_fine: dec!(12.345),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["total_fine"].as_str().unwrap(), "12.34");
        assert_eq!(json["overdue_loans"], 1);
    }

    #[test]
    fn write_csv_emits_header_and_rows() {
        let rows = vec![InventoryRow {
            title: "Dom Casmurro".into(),
            author: "Machado de Assis".into(),
            year: 1899,
            category: "Novel".into(),
            total: 3,
            available: 2,
        }];
        let mut output = Vec::new();
        write_csv(&rows, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "title,author,year,category,total,available\nDom Casmurro,Machado de Assis,1899,Novel,3,2\n"
        );
    }

    #[test]
    fn history_entry_serializes_open_loan_without_return_date() {
        let entry = HistoryEntry {
            loan: LoanId::new(),
            title: Some("Helena".into()),
            checkout_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 7, 8).unwrap(),
            return_date: None,
            status: LoanStatus::Open,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["checkout_date"], "2025-07-01");
        assert!(json["return_date"].is_null());
        assert_eq!(json["status"], "Open");
    }
}
