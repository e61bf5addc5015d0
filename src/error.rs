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

//! Error types for point operations.

use thiserror::Error;

/// Point ledger errors.
///
/// Every variant is a caller-input or balance-state error. None of them is
/// retried by the ledger, and state is left untouched whenever one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    /// User id is absent, non-positive, or above the configured maximum
    #[error("invalid user id")]
    InvalidUserId,

    /// Amount is absent, non-positive, or above the configured maximum
    #[error("invalid amount")]
    InvalidAmount,

    /// Charge would push the balance above the maximum
    #[error("balance would exceed the maximum")]
    MaxBalanceExceeded,

    /// Use would push the balance below zero
    #[error("insufficient point balance")]
    InsufficientBalance,
}

impl PointError {
    /// Stable machine-readable code for request-handling layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUserId => "INVALID_USER_ID",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::MaxBalanceExceeded => "MAX_BALANCE_EXCEEDED",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
        }
    }
}
