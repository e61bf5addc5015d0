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

//! Storage seams used by the ledger.
//!
//! Stores only promise per-call consistency: a read sees a whole record or
//! nothing. Read-modify-write atomicity is the ledger's job, see
//! [`KeyGate`](crate::KeyGate).

use crate::balance::UserBalance;
use crate::base::UserId;
use crate::transaction::{NewTransaction, TransactionRecord};
use dashmap::DashMap;

/// Current balance per user.
pub trait BalanceStore: Send + Sync {
    /// `None` when the user has never been written.
    fn get(&self, user_id: UserId) -> Option<UserBalance>;

    /// Stores `balance` (last write wins) and returns the stored record.
    fn put(&self, balance: UserBalance) -> UserBalance;
}

/// Append-only transaction history.
pub trait HistoryStore: Send + Sync {
    /// Appends `transaction` and returns it with its assigned id.
    fn append(&self, transaction: NewTransaction) -> TransactionRecord;

    /// All records for `user_id`, oldest first.
    fn list_by_user(&self, user_id: UserId) -> Vec<TransactionRecord>;
}

/// [`BalanceStore`] backed by a [`DashMap`].
#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    balances: DashMap<UserId, UserBalance>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Snapshot of every stored balance, sorted by user id.
    pub fn snapshot(&self) -> Vec<UserBalance> {
        let mut balances: Vec<UserBalance> = self.balances.iter().map(|r| *r.value()).collect();
        balances.sort_by_key(|balance| balance.user_id);
        balances
    }
}

impl BalanceStore for InMemoryBalanceStore {
    fn get(&self, user_id: UserId) -> Option<UserBalance> {
        self.balances.get(&user_id).map(|r| *r.value())
    }

    fn put(&self, balance: UserBalance) -> UserBalance {
        self.balances.insert(balance.user_id, balance);
        balance
    }
}
