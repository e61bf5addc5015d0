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

//! Concurrency and deadlock tests for the ledger.
//!
//! These run the real [`PointLedger`] under contention with parking_lot's
//! deadlock detector watching the lock graph in the background.

use crossbeam::channel;
use parking_lot::deadlock;
use point_ledger::{PointError, PointLedger, TransactionKind, UserId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150));
}

/// Spins until `user` has `expected` holders plus waiters at the gate.
fn wait_for_pending(ledger: &PointLedger, user: i64, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while ledger.gate().pending(UserId(user)) != expected {
        assert!(
            Instant::now() < deadline,
            "user {user} never reached {expected} pending"
        );
        thread::yield_now();
    }
}

// === Tests ===

#[test]
fn concurrent_charges_lose_no_updates() {
    let ledger = Arc::new(PointLedger::new());

    const NUM_THREADS: usize = 20;
    const AMOUNT: i64 = 100;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.charge(1, AMOUNT).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(ledger.get_point(1).unwrap().point, NUM_THREADS as i64 * AMOUNT);

    let history = ledger.get_history(1).unwrap();
    assert_eq!(history.len(), NUM_THREADS);
    assert!(history.iter().all(|r| r.kind == TransactionKind::Charge));
    assert!(
        history.windows(2).all(|w| w[0].updated_at < w[1].updated_at),
        "timestamps must follow gate order"
    );
    assert_eq!(
        ledger.get_point(1).unwrap().updated_at,
        history.last().unwrap().updated_at
    );
}

#[test]
fn charge_and_use_on_same_user_do_not_deadlock() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(PointLedger::new());
    ledger.charge(1, 5_000).unwrap();

    let (tx, rx) = channel::unbounded();
    let charger = {
        let ledger = Arc::clone(&ledger);
        let tx = tx.clone();
        thread::spawn(move || tx.send(ledger.charge(1, 3_000)).unwrap())
    };
    let user = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || tx.send(ledger.use_point(1, 2_000)).unwrap())
    };

    for _ in 0..2 {
        let result = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("operation did not finish in time");
        assert!(result.is_ok());
    }
    charger.join().unwrap();
    user.join().unwrap();
    stop_deadlock_detector(detector);

    assert_eq!(ledger.get_point(1).unwrap().point, 6_000);
    assert_eq!(ledger.get_history(1).unwrap().len(), 3);
}

#[test]
fn busy_user_does_not_block_other_users() {
    let ledger = Arc::new(PointLedger::new());
    let held = ledger.gate().acquire(UserId(1));

    let blocked = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || ledger.charge(1, 3_000).unwrap().point)
    };
    wait_for_pending(&ledger, 1, 2);

    let (tx, rx) = channel::unbounded();
    for user in [2, 3] {
        let ledger = Arc::clone(&ledger);
        let tx = tx.clone();
        thread::spawn(move || tx.send((user, ledger.charge(user, 3_000))).unwrap());
    }
    for _ in 0..2 {
        let (user, result) = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("other users must not wait on user 1");
        assert_eq!(result.unwrap().point, 3_000, "user {user}");
    }

    // Reads are not gated either.
    assert_eq!(ledger.get_point(1).unwrap().point, 0);

    drop(held);
    assert_eq!(blocked.join().unwrap(), 3_000);
}

#[test]
fn same_user_mutations_apply_in_arrival_order() {
    let ledger = Arc::new(PointLedger::new());
    let held = ledger.gate().acquire(UserId(1));

    let mut handles = Vec::new();
    for (i, amount) in (1..=10).map(|n| n * 100).enumerate() {
        let worker = Arc::clone(&ledger);
        handles.push(thread::spawn(move || worker.charge(1, amount).unwrap()));
        wait_for_pending(&ledger, 1, i + 2);
    }
    drop(held);
    for handle in handles {
        handle.join().unwrap();
    }

    let amounts: Vec<i64> = ledger
        .get_history(1)
        .unwrap()
        .iter()
        .map(|r| r.amount.0)
        .collect();
    assert_eq!(amounts, (1..=10).map(|n| n * 100).collect::<Vec<_>>());
}

#[test]
fn same_user_is_serialized_while_others_run() {
    let ledger = Arc::new(PointLedger::new());
    for user in 1..=3 {
        ledger.charge(user, 5_000).unwrap();
    }

    let (tx, rx) = channel::unbounded();
    let handles: Vec<_> = [1, 1, 1, 2, 3]
        .into_iter()
        .map(|user| {
            let ledger = Arc::clone(&ledger);
            let tx = tx.clone();
            thread::spawn(move || {
                ledger.charge(user, 3_000).unwrap();
                tx.send(user).unwrap();
            })
        })
        .collect();
    drop(tx);
    for handle in handles {
        handle.join().unwrap();
    }

    let order: Vec<i64> = rx.iter().collect();
    assert_eq!(order.iter().filter(|&&u| u == 1).count(), 3);
    assert!(order.contains(&2) && order.contains(&3));

    assert_eq!(ledger.get_point(1).unwrap().point, 14_000);
    assert_eq!(ledger.get_point(2).unwrap().point, 8_000);
    assert_eq!(ledger.get_point(3).unwrap().point, 8_000);

    let balances: Vec<i64> = ledger
        .get_history(1)
        .unwrap()
        .iter()
        .scan(0, |sum, r| {
            *sum += r.delta();
            Some(*sum)
        })
        .collect();
    assert_eq!(balances, vec![5_000, 8_000, 11_000, 14_000]);
}

#[test]
fn concurrent_uses_never_overdraw() {
    let ledger = Arc::new(PointLedger::new());
    ledger.charge(1, 1_000).unwrap();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.use_point(1, 30))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 33);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == PointError::InsufficientBalance)
    );
    assert_eq!(ledger.get_point(1).unwrap().point, 10);
    assert_eq!(ledger.get_history(1).unwrap().len(), 34);
}

#[test]
fn concurrent_charges_stop_at_the_maximum() {
    let ledger = Arc::new(PointLedger::new());

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.charge(1, 300_000))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 33);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == PointError::MaxBalanceExceeded)
    );
    assert_eq!(ledger.get_point(1).unwrap().point, 9_900_000);
}

#[test]
fn no_deadlock_high_contention_many_users() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(PointLedger::new());

    const NUM_THREADS: usize = 32;
    const NUM_USERS: i64 = 8;
    const OPS_PER_THREAD: usize = 200;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|thread_id| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    let user = ((thread_id + i) as i64 % NUM_USERS) + 1;
                    match i % 3 {
                        0 => {
                            let _ = ledger.charge(user, 10);
                        }
                        1 => {
                            let _ = ledger.use_point(user, 7);
                        }
                        _ => {
                            let balance = ledger.get_point(user).unwrap();
                            assert!((0..=10_000_000).contains(&balance.point));
                            let _ = ledger.get_history(user).unwrap();
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    stop_deadlock_detector(detector);

    for user in 1..=NUM_USERS {
        let balance = ledger.get_point(user).unwrap().point;
        let sum: i64 = ledger.get_history(user).unwrap().iter().map(|r| r.delta()).sum();
        assert_eq!(sum, balance, "history must replay to the balance of user {user}");
        assert!(balance >= 0);
    }
    assert_eq!(ledger.gate().tracked_keys(), 0);
}
