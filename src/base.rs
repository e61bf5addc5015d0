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

//! Core identifier and value types, plus the input pre-checks that produce them.
//!
//! Raw inputs arrive as `Option<i64>` so that absent values coming from a
//! request layer are rejected the same way as out-of-range ones.

use crate::config::LedgerConfig;
use crate::error::PointError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a wallet owner.
///
/// The ledger builds these through [`validate_user_id`] before touching a
/// store, so every id it passes to a store is in range. Ids built directly
/// (for store lookups or tests) are not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive point amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Amount(pub i64);

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned to a history record by the history store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks that `raw` is present and within `1..=config.max_user_id`.
pub fn validate_user_id(raw: Option<i64>, config: &LedgerConfig) -> Result<UserId, PointError> {
    match raw {
        Some(id) if (1..=config.max_user_id).contains(&id) => Ok(UserId(id)),
        _ => Err(PointError::InvalidUserId),
    }
}

/// Checks that `raw` is present and within `1..=config.max_balance`.
pub fn validate_amount(raw: Option<i64>, config: &LedgerConfig) -> Result<Amount, PointError> {
    match raw {
        Some(amount) if (1..=config.max_balance).contains(&amount) => Ok(Amount(amount)),
        _ => Err(PointError::InvalidAmount),
    }
}

/// Wall-clock milliseconds, strictly increasing per clock.
///
/// Two readings never return the same value; under bursts of more than one
/// reading per millisecond the clock runs slightly ahead of the wall clock.
#[derive(Debug, Default)]
pub struct LedgerClock {
    last: AtomicU64,
}

impl LedgerClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_millis(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut previous = self.last.load(Ordering::Acquire);
        loop {
            let next = wall.max(previous.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(previous, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => previous = actual,
            }
        }
    }
}
