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

//! Registered borrowers.

use crate::base::BorrowerId;
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A person allowed to take works out on loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Borrower {
    id: BorrowerId,
    name: String,
    email: String,
}

impl Borrower {
    /// # Errors
    ///
    /// - [`CatalogError::InvalidName`] - Name is blank.
    /// - [`CatalogError::InvalidEmail`] - Email is not shaped like `local@domain.tld`.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, CatalogError> {
        Self::with_id(BorrowerId::new(), name, email)
    }

    pub fn with_id(
        id: BorrowerId,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::InvalidName);
        }
        let email = email.into().trim().to_string();
        if !is_valid_email(&email) {
            return Err(CatalogError::InvalidEmail);
        }
        Ok(Self { id, name, email })
    }

    pub fn id(&self) -> BorrowerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns `true` if `name` names this borrower, ignoring case.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

impl PartialEq for Borrower {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Borrower {}

impl Hash for Borrower {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Basic `local@domain.tld` shape check.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
