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

//! Transaction history records.
//!
//! Amounts are always positive; the direction is carried by [`TransactionKind`].

use crate::base::{Amount, TransactionId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Credit.
    Charge,
    /// Debit.
    Use,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Charge => f.write_str("CHARGE"),
            Self::Use => f.write_str("USE"),
        }
    }
}

/// A history entry that has not been assigned an id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub amount: Amount,
    pub kind: TransactionKind,
    pub updated_at: u64,
}

/// An appended, immutable history entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: TransactionId,
    #[serde(rename = "user")]
    pub user_id: UserId,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub updated_at: u64,
}

impl NewTransaction {
    pub fn into_record(self, id: TransactionId) -> TransactionRecord {
        TransactionRecord {
            id,
            user_id: self.user_id,
            amount: self.amount,
            kind: self.kind,
            updated_at: self.updated_at,
        }
    }
}

impl TransactionRecord {
    /// Signed effect of this entry on the balance.
    pub fn delta(&self) -> i64 {
        match self.kind {
            TransactionKind::Charge => self.amount.0,
            TransactionKind::Use => -self.amount.0,
        }
    }
}
