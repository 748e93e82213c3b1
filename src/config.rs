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

//! Catalog configuration.
//!
//! Read from a TOML file; every key is optional.
//!
//! ```toml
//! fine_rate_per_day = "5.00"
//! default_term_days = 7
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("fine rate must not be negative")]
    NegativeFineRate,

    #[error("default loan term must be positive")]
    InvalidTerm,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Fine charged per overdue day.
    pub fine_rate_per_day: Decimal,
    /// Loan term used when the caller does not pick one.
    pub default_term_days: i64,
}

impl Config {
    pub const DEFAULT_FINE_RATE: Decimal = dec!(5.00);
    pub const DEFAULT_TERM_DAYS: i64 = 7;

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fine_rate_per_day < Decimal::ZERO {
            return Err(ConfigError::NegativeFineRate);
        }
        if self.default_term_days <= 0 {
            return Err(ConfigError::InvalidTerm);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fine_rate_per_day: Self::DEFAULT_FINE_RATE,
            default_term_days: Self::DEFAULT_TERM_DAYS,
        }
    }
}
