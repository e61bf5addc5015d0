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

//! Point ledger.
//!
//! The [`PointLedger`] validates input, serializes mutations per user through
//! a [`KeyGate`], enforces the balance limits, and records history.
//!
//! # Operations
//!
//! - **get_point**: Current balance, or a zero balance for unknown users.
//! - **get_history**: The user's transactions in the order they were applied.
//! - **charge**: Credits points, failing if the balance would exceed the maximum.
//! - **use_point**: Debits points, failing if the balance would go negative.
//!
//! # Thread Safety
//!
//! Charge and use for the same user run one at a time, in the order they
//! reached the gate. Mutations for different users run in parallel. Reads
//! take no gate; each store call returns a whole record.

use crate::balance::UserBalance;
use crate::base::{LedgerClock, UserId, validate_amount, validate_user_id};
use crate::config::LedgerConfig;
use crate::gate::KeyGate;
use crate::history::InMemoryHistoryStore;
use crate::store::{BalanceStore, HistoryStore, InMemoryBalanceStore};
use crate::transaction::{NewTransaction, TransactionKind, TransactionRecord};
use crate::PointError;
use tracing::debug;

/// Per-user point wallets with an append-only history.
///
/// # Invariants
///
/// - Every stored balance is within `0..=config.max_balance`.
/// - Each successful mutation writes exactly one balance and appends exactly
///   one history record carrying the balance's timestamp.
/// - A failed call writes nothing.
pub struct PointLedger<B = InMemoryBalanceStore, H = InMemoryHistoryStore> {
    config: LedgerConfig,
    balances: B,
    history: H,
    gate: KeyGate<UserId>,
    clock: LedgerClock,
}

impl PointLedger {
    /// Creates a ledger with in-memory stores and default limits.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Creates a ledger with in-memory stores and the given limits.
    pub fn with_config(config: LedgerConfig) -> Self {
        Self::with_stores(
            config,
            InMemoryBalanceStore::new(),
            InMemoryHistoryStore::new(),
        )
    }
}

impl Default for PointLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, H> PointLedger<B, H>
where
    B: BalanceStore,
    H: HistoryStore,
{
    pub fn with_stores(config: LedgerConfig, balances: B, history: H) -> Self {
        Self {
            config,
            balances,
            history,
            gate: KeyGate::new(),
            clock: LedgerClock::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn balances(&self) -> &B {
        &self.balances
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// The gate serializing mutations, exposed for diagnostics.
    pub fn gate(&self) -> &KeyGate<UserId> {
        &self.gate
    }

    /// Returns the current balance of `user_id`.
    ///
    /// Users that were never charged read as a zero balance with timestamp 0.
    /// Nothing is written for them.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidUserId`] - `user_id` is out of range.
    pub fn get_point(&self, user_id: i64) -> Result<UserBalance, PointError> {
        let user_id = validate_user_id(Some(user_id), &self.config)?;
        Ok(self
            .balances
            .get(user_id)
            .unwrap_or_else(|| UserBalance::empty(user_id)))
    }

    /// Returns the history of `user_id`, oldest first. Possibly empty.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidUserId`] - `user_id` is out of range.
    pub fn get_history(&self, user_id: i64) -> Result<Vec<TransactionRecord>, PointError> {
        let user_id = validate_user_id(Some(user_id), &self.config)?;
        Ok(self.history.list_by_user(user_id))
    }

    /// Credits `amount` points to `user_id` and returns the saved balance.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidUserId`] - `user_id` is out of range.
    /// - [`PointError::InvalidAmount`] - `amount` is not in `1..=max_balance`.
    /// - [`PointError::MaxBalanceExceeded`] - The new balance would exceed the maximum.
    pub fn charge(&self, user_id: i64, amount: i64) -> Result<UserBalance, PointError> {
        self.apply(user_id, amount, TransactionKind::Charge)
    }

    /// Debits `amount` points from `user_id` and returns the saved balance.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidUserId`] - `user_id` is out of range.
    /// - [`PointError::InvalidAmount`] - `amount` is not in `1..=max_balance`.
    /// - [`PointError::InsufficientBalance`] - The new balance would be negative.
    pub fn use_point(&self, user_id: i64, amount: i64) -> Result<UserBalance, PointError> {
        self.apply(user_id, amount, TransactionKind::Use)
    }

    fn apply(
        &self,
        user_id: i64,
        amount: i64,
        kind: TransactionKind,
    ) -> Result<UserBalance, PointError> {
        // Input errors are reported before the gate or any store is touched.
        let user_id = validate_user_id(Some(user_id), &self.config)?;
        let amount = validate_amount(Some(amount), &self.config)?;

        self.gate.with_exclusive_access(user_id, || {
            let current = self
                .balances
                .get(user_id)
                .unwrap_or_else(|| UserBalance::empty(user_id));
            let now = self.clock.now_millis();

            let next = match kind {
                TransactionKind::Charge => current.charged(amount, self.config.max_balance, now),
                TransactionKind::Use => current.used(amount, now),
            }
            .inspect_err(|e| {
                debug!(%user_id, %amount, %kind, balance = current.point, error = %e, "rejected");
            })?;

            let saved = self.balances.put(next);
            let record = self.history.append(NewTransaction {
                user_id,
                amount,
                kind,
                updated_at: saved.updated_at,
            });
            debug!(
                %user_id,
                %amount,
                %kind,
                balance = saved.point,
                record = %record.id,
                "applied"
            );
            Ok(saved)
        })
    }
}
