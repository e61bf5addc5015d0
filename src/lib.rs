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

//! # Point Ledger
//!
//! This library keeps a point balance ("wallet") per user together with an
//! append-only transaction history, and applies charge (credit) and use
//! (debit) requests safely under concurrency.
//!
//! ## Core Components
//!
//! - [`PointLedger`]: Validates requests, serializes mutations per user, records history
//! - [`KeyGate`]: FIFO mutual exclusion per key
//! - [`BalanceStore`] / [`HistoryStore`]: Storage seams, with in-memory implementations
//! - [`PointError`]: Error kinds returned by ledger operations
//!
//! ## Example
//!
//! ```
//! use point_ledger::{PointError, PointLedger, TransactionKind};
//!
//! let ledger = PointLedger::new();
//!
//! assert_eq!(ledger.charge(5, 1_000).unwrap().point, 1_000);
//! assert_eq!(ledger.use_point(5, 400).unwrap().point, 600);
//! assert_eq!(ledger.use_point(5, 700), Err(PointError::InsufficientBalance));
//!
//! let history = ledger.get_history(5).unwrap();
//! assert_eq!(history.len(), 2);
//! assert_eq!(history[0].kind, TransactionKind::Charge);
//! assert_eq!(history[1].kind, TransactionKind::Use);
//! assert_eq!(ledger.get_point(5).unwrap().point, 600);
//! ```
//!
//! ## Thread Safety
//!
//! Mutations for one user are applied one at a time in arrival order, while
//! different users proceed in parallel without blocking each other.

pub mod balance;
mod base;
pub mod config;
pub mod error;
pub mod gate;
mod history;
mod ledger;
pub mod store;
mod transaction;

pub use balance::UserBalance;
pub use base::{Amount, LedgerClock, TransactionId, UserId, validate_amount, validate_user_id};
pub use config::{LedgerConfig, MAX_BALANCE, MAX_USER_ID};
pub use error::PointError;
pub use gate::{GateGuard, KeyGate};
pub use history::InMemoryHistoryStore;
pub use ledger::PointLedger;
pub use store::{BalanceStore, HistoryStore, InMemoryBalanceStore};
pub use transaction::{NewTransaction, TransactionKind, TransactionRecord};
