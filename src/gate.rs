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

//! Per-key serialization gate.
//!
//! Each key gets a lazily created turnstile: a ticket lock built from a
//! [`parking_lot::Mutex`] and [`Condvar`]. Tickets are handed out in arrival
//! order and served strictly in that order, so waiters for one key run FIFO.
//! Different keys never share a turnstile and never block each other.
//!
//! A waiter that gives up (see [`KeyGate::try_acquire_for`]) marks its ticket
//! abandoned; the release path skips abandoned tickets, so the queue behind
//! it keeps moving.
//!
//! Turnstiles are dropped from the map once no guard or waiter references
//! them any more.

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Default)]
struct Tickets {
    /// Next ticket to hand out.
    next: u64,
    /// Ticket currently allowed in.
    serving: u64,
    /// Tickets whose waiters gave up before being served.
    abandoned: BTreeSet<u64>,
}

impl Tickets {
    fn advance(&mut self) {
        self.serving += 1;
        while self.abandoned.remove(&self.serving) {
            self.serving += 1;
        }
    }

    fn pending(&self) -> usize {
        (self.next - self.serving) as usize - self.abandoned.len()
    }
}

#[derive(Debug, Default)]
struct Turnstile {
    tickets: Mutex<Tickets>,
    turn: Condvar,
}

impl Turnstile {
    fn release(&self) {
        let mut tickets = self.tickets.lock();
        tickets.advance();
        drop(tickets);
        self.turn.notify_all();
    }
}

/// Mutual exclusion per key.
#[derive(Debug)]
pub struct KeyGate<K>
where
    K: Eq + Hash + Copy,
{
    turnstiles: DashMap<K, Arc<Turnstile>>,
}

impl<K> KeyGate<K>
where
    K: Eq + Hash + Copy + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            turnstiles: DashMap::new(),
        }
    }

    fn turnstile(&self, key: K) -> Arc<Turnstile> {
        Arc::clone(&self.turnstiles.entry(key).or_default())
    }

    /// Drops the turnstile for `key` if nobody else holds it.
    fn reclaim(&self, key: K) {
        // The shard write lock is held during the check, so no one can clone
        // the Arc between the count check and the removal.
        if self
            .turnstiles
            .remove_if(&key, |_, turnstile| Arc::strong_count(turnstile) == 1)
            .is_some()
        {
            trace!(?key, "gate reclaimed");
        }
    }

    /// Blocks until `key` is free, then returns a guard that holds it.
    pub fn acquire(&self, key: K) -> GateGuard<'_, K> {
        let turnstile = self.turnstile(key);
        {
            let mut tickets = turnstile.tickets.lock();
            let ticket = tickets.next;
            tickets.next += 1;
            while tickets.serving != ticket {
                turnstile.turn.wait(&mut tickets);
            }
        }
        trace!(?key, "gate acquired");
        GateGuard {
            gate: self,
            key,
            turnstile: Some(turnstile),
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up after `timeout`.
    ///
    /// Giving up releases nothing and leaves the queue for `key` intact.
    /// A timeout too large to express as a deadline waits without limit.
    pub fn try_acquire_for(&self, key: K, timeout: Duration) -> Option<GateGuard<'_, K>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.acquire(key));
        };
        let turnstile = self.turnstile(key);
        let acquired = {
            let mut tickets = turnstile.tickets.lock();
            let ticket = tickets.next;
            tickets.next += 1;
            loop {
                if tickets.serving == ticket {
                    break true;
                }
                if turnstile.turn.wait_until(&mut tickets, deadline).timed_out()
                    && tickets.serving != ticket
                {
                    tickets.abandoned.insert(ticket);
                    break false;
                }
            }
        };

        if acquired {
            trace!(?key, "gate acquired");
            Some(GateGuard {
                gate: self,
                key,
                turnstile: Some(turnstile),
            })
        } else {
            trace!(?key, "gate wait timed out");
            drop(turnstile);
            self.reclaim(key);
            None
        }
    }

    /// Runs `operation` while holding `key`, releasing it on every exit path.
    pub fn with_exclusive_access<T, F>(&self, key: K, operation: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = self.acquire(key);
        operation()
    }

    /// Holder plus queued waiters for `key`.
    pub fn pending(&self, key: K) -> usize {
        self.turnstiles
            .get(&key)
            .map(|turnstile| turnstile.tickets.lock().pending())
            .unwrap_or(0)
    }

    /// Number of keys that currently have a turnstile.
    pub fn tracked_keys(&self) -> usize {
        self.turnstiles.len()
    }
}

impl<K> Default for KeyGate<K>
where
    K: Eq + Hash + Copy + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive hold on one key. Released on drop, including during unwinding.
#[derive(Debug)]
pub struct GateGuard<'a, K>
where
    K: Eq + Hash + Copy + std::fmt::Debug,
{
    gate: &'a KeyGate<K>,
    key: K,
    turnstile: Option<Arc<Turnstile>>,
}

impl<K> GateGuard<'_, K>
where
    K: Eq + Hash + Copy + std::fmt::Debug,
{
    pub fn key(&self) -> K {
        self.key
    }
}

impl<K> Drop for GateGuard<'_, K>
where
    K: Eq + Hash + Copy + std::fmt::Debug,
{
    fn drop(&mut self) {
        if let Some(turnstile) = self.turnstile.take() {
            turnstile.release();
            drop(turnstile);
            trace!(key = ?self.key, "gate released");
            self.gate.reclaim(self.key);
        }
    }
}
