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

//! Catalog works.
//!
//! # Example
//!
//! ```
//! use lending_catalog::Work;
//!
//! let work = Work::new("Dom Casmurro", "Machado de Assis", 1899, "Novel", 3).unwrap();
//! assert_eq!(work.total_copies(), 3);
//! ```

use crate::base::WorkId;
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A catalog item with one or more physical copies.
///
/// The title is the catalog's natural key and is compared case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    id: WorkId,
    title: String,
    author: String,
    year: i32,
    category: String,
    total_copies: u32,
}

impl Work {
    /// Creates a new work with a fresh id.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidTitle`] - Title is blank.
    /// - [`CatalogError::InvalidQuantity`] - Fewer than one copy.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: i32,
        category: impl Into<String>,
        copies: u32,
    ) -> Result<Self, CatalogError> {
        Self::with_id(WorkId::new(), title, author, year, category, copies)
    }

    /// Rebuilds a work with a known id, e.g. when loading from storage.
    pub fn with_id(
        id: WorkId,
        title: impl Into<String>,
        author: impl Into<String>,
        year: i32,
        category: impl Into<String>,
        copies: u32,
    ) -> Result<Self, CatalogError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(CatalogError::InvalidTitle);
        }
        if copies == 0 {
            return Err(CatalogError::InvalidQuantity);
        }
        Ok(Self {
            id,
            title,
            author: author.into().trim().to_string(),
            year,
            category: category.into().trim().to_string(),
            total_copies: copies,
        })
    }

    pub fn id(&self) -> WorkId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn total_copies(&self) -> u32 {
        self.total_copies
    }

    /// Returns `true` if `title` names this work, ignoring case.
    pub fn has_title(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.trim().to_lowercase()
    }

    /// Total is owned by the ledger; the record only mirrors it for storage.
    pub(crate) fn set_total_copies(&mut self, total: u32) {
        self.total_copies = total;
    }
}

impl PartialEq for Work {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Work {}

impl Hash for Work {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
