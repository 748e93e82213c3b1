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

//! Error types for catalog operations.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Work,
    Borrower,
    Loan,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Work => write!(f, "work"),
            Entity::Borrower => write!(f, "borrower"),
            Entity::Loan => write!(f, "loan"),
        }
    }
}

/// Failure reported by the persistence collaborator.
///
/// Wraps the underlying cause; the catalog never retries or reconnects.
#[derive(Error, Debug, Clone)]
#[error("storage failure ({context}): {source}")]
pub struct StorageError {
    context: String,
    #[source]
    source: Arc<dyn std::error::Error + Send + Sync>,
}

impl StorageError {
    pub fn new<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    /// Builds an error from a plain message, for backends without a typed cause.
    pub fn message(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(context, BackendMessage(message.into()))
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

impl PartialEq for StorageError {
    fn eq(&self, other: &Self) -> bool {
        self.context == other.context && self.source.to_string() == other.source.to_string()
    }
}

impl Eq for StorageError {}

#[derive(Error, Debug)]
#[error("{0}")]
struct BackendMessage(String);

/// Catalog processing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Work, borrower or loan lookup miss
    #[error("{0} not found")]
    NotFound(Entity),

    /// No copy of the work is available for checkout
    #[error("no copies available")]
    Unavailable,

    /// Loan is already closed
    #[error("loan already returned")]
    AlreadyReturned,

    /// Date ordering violated (return before checkout, calendar overflow)
    #[error("invalid date")]
    InvalidDate,

    /// Renewal by zero or negative days
    #[error("invalid extension (must be positive)")]
    InvalidExtension,

    /// Loan term of zero or negative days
    #[error("invalid loan term (must be positive)")]
    InvalidTerm,

    /// Ledger decrement on a work with no available copies
    #[error("out of stock")]
    OutOfStock,

    /// Ledger bound breach, indicates a caller or persistence bug
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Copy count is zero or negative
    #[error("invalid quantity (must be positive)")]
    InvalidQuantity,

    /// Work title is empty
    #[error("title must not be empty")]
    InvalidTitle,

    /// Borrower name is empty
    #[error("name must not be empty")]
    InvalidName,

    /// Email does not look like local@domain.tld
    #[error("invalid email address")]
    InvalidEmail,

    /// Borrower still holds open loans
    #[error("borrower has open loans")]
    OpenLoans,

    /// Persistence collaborator failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}
