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

//! In-memory transaction history.
//!
//! Record ids come from a single atomic counter, so they are unique and
//! increasing across all users. Per-user order is the order of `append`
//! calls, which the ledger issues while holding that user's gate.

use crate::base::{TransactionId, UserId};
use crate::store::HistoryStore;
use crate::transaction::{NewTransaction, TransactionRecord};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// [`HistoryStore`] keeping one append vector per user.
#[derive(Debug)]
pub struct InMemoryHistoryStore {
    /// Records per user in insertion order.
    records: DashMap<UserId, Vec<TransactionRecord>>,

    /// Next id to hand out. Starts at 1.
    next_id: AtomicU64,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Total number of records across all users.
    pub fn len(&self) -> usize {
        self.records.iter().map(|r| r.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record, ordered by id.
    pub fn all(&self) -> Vec<TransactionRecord> {
        let mut records: Vec<TransactionRecord> = self
            .records
            .iter()
            .flat_map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn append(&self, transaction: NewTransaction) -> TransactionRecord {
        // Hold the user's entry while assigning the id so ids stay increasing per user.
        let mut entry = self.records.entry(transaction.user_id).or_default();
        let id = TransactionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = transaction.into_record(id);
        entry.push(record);
        record
    }

    fn list_by_user(&self, user_id: UserId) -> Vec<TransactionRecord> {
        self.records
            .get(&user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}
