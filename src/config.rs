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

//! Ledger limits.

/// Largest accepted user id.
pub const MAX_USER_ID: i64 = 1_000_000_000;

/// Largest balance a wallet may hold. Also the largest single charge/use amount.
pub const MAX_BALANCE: i64 = 10_000_000;

/// Limits enforced by [`PointLedger`](crate::PointLedger).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// User ids are accepted in `1..=max_user_id`.
    pub max_user_id: i64,
    /// Balances stay within `0..=max_balance`.
    pub max_balance: i64,
}

impl LedgerConfig {
    pub fn with_max_balance(mut self, max_balance: i64) -> Self {
        self.max_balance = max_balance;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_user_id: MAX_USER_ID,
            max_balance: MAX_BALANCE,
        }
    }
}
