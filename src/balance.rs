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

//! Wallet balance snapshots.
//!
//! A [`UserBalance`] is an immutable value. Charging or using points produces
//! a new snapshot, which the ledger then writes to the balance store.
//!
//! # Example
//!
//! ```
//! use point_ledger::{Amount, UserBalance, UserId};
//!
//! let balance = UserBalance::empty(UserId(1));
//! assert_eq!(balance.point, 0);
//!
//! let charged = balance.charged(Amount(1_000), 10_000_000, 7).unwrap();
//! assert_eq!(charged.point, 1_000);
//! assert_eq!(charged.updated_at, 7);
//! ```

use crate::PointError;
use crate::base::{Amount, UserId};
use serde::{Deserialize, Serialize};

/// Current point balance of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    #[serde(rename = "user")]
    pub user_id: UserId,
    pub point: i64,
    /// Milliseconds since the Unix epoch of the last write.
    pub updated_at: u64,
}

impl UserBalance {
    pub fn new(user_id: UserId, point: i64, updated_at: u64) -> Self {
        Self {
            user_id,
            point,
            updated_at,
        }
    }

    /// The value reported for a user that has never been charged.
    pub fn empty(user_id: UserId) -> Self {
        Self::new(user_id, 0, 0)
    }

    fn assert_invariants(&self, max_balance: i64) {
        debug_assert!(
            self.point >= 0,
            "Invariant violated: balance went negative: {}",
            self.point
        );
        debug_assert!(
            self.point <= max_balance,
            "Invariant violated: balance above {}: {}",
            max_balance,
            self.point
        );
    }

    /// Returns the snapshot after crediting `amount`.
    pub fn charged(
        &self,
        amount: Amount,
        max_balance: i64,
        now: u64,
    ) -> Result<UserBalance, PointError> {
        let point = self
            .point
            .checked_add(amount.0)
            .filter(|point| *point <= max_balance)
            .ok_or(PointError::MaxBalanceExceeded)?;
        let next = UserBalance::new(self.user_id, point, now);
        next.assert_invariants(max_balance);
        Ok(next)
    }

    /// Returns the snapshot after debiting `amount`.
    pub fn used(&self, amount: Amount, now: u64) -> Result<UserBalance, PointError> {
        if self.point < amount.0 {
            return Err(PointError::InsufficientBalance);
        }
        let next = UserBalance::new(self.user_id, self.point - amount.0, now);
        debug_assert!(next.point >= 0);
        Ok(next)
    }
}
