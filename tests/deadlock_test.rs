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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! These tests drive a shared splitter from many threads and verify that
//! the engine lock, the custody maps and the event journal never form a
//! cycle, and that the books still balance afterwards.

mod common;

use common::{Fixture, TestSplitter, account, admin, vtho};
use parking_lot::deadlock;
use payment_splitter::{Amount, Asset};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

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
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

fn released_sum(splitter: &TestSplitter, asset: &Asset) -> Amount {
    splitter
        .statements(asset)
        .iter()
        .map(|row| row.released)
        .sum()
}

/// Many threads depositing and releasing against a fixed payee set.
#[test]
fn no_deadlock_high_contention_releases() {
    let detector = start_deadlock_detector();
    let fx = Arc::new(Fixture::with_payees(&[("alice", 5), ("bob", 3), ("carol", 2)]));
    let deposited = Arc::new(AtomicU64::new(0));

    const NUM_THREADS: usize = 16;
    const OPS_PER_THREAD: usize = 200;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for t in 0..NUM_THREADS {
        let fx = fx.clone();
        let deposited = deposited.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                match (t + i) % 5 {
                    0 => {
                        let amount = (7 * i + t) as u64 % 97 + 1;
                        fx.deposit(&Asset::Native, Amount::from(amount));
                        deposited.fetch_add(amount, Ordering::SeqCst);
                    }
                    1 => {
                        fx.splitter.release(&admin()).unwrap();
                    }
                    2 => {
                        fx.splitter.release_payee(&admin(), &account("bob")).unwrap();
                    }
                    3 => {
                        fx.splitter.release_in_shares(&admin(), 1, 3).unwrap();
                    }
                    _ => {
                        // Read operations
                        let _ = fx.splitter.total_released(&Asset::Native);
                        let _ = fx.splitter.releasable(&Asset::Native, &account("alice"));
                        let _ = fx.splitter.statements(&Asset::Native);
                    }
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    fx.splitter.release(&admin()).unwrap();
    let total = Amount::from(deposited.load(Ordering::SeqCst));
    let mut paid = 0;
    for (name, shares) in [("alice", 5), ("bob", 3), ("carol", 2)] {
        assert_eq!(fx.balance(&Asset::Native, name), total * shares / 10);
        paid += total * shares / 10;
    }
    assert_eq!(fx.held(&Asset::Native), total - paid);
    println!(
        "High contention test passed: {} threads × {} ops",
        NUM_THREADS, OPS_PER_THREAD
    );
}

/// Payee additions and removals racing with releases.
#[test]
fn no_deadlock_payee_churn() {
    let detector = start_deadlock_detector();
    let fx = Arc::new(Fixture::with_payees(&[("anchor", 10)]));
    let deposited = Arc::new(AtomicU64::new(0));

    const NUM_THREADS: usize = 8;
    // Multiple of four so every thread ends on a removal.
    const OPS_PER_THREAD: usize = 160;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for t in 0..NUM_THREADS {
        let fx = fx.clone();
        let deposited = deposited.clone();

        let handle = thread::spawn(move || {
            let me = account(&format!("member{t}"));
            for i in 0..OPS_PER_THREAD {
                match i % 4 {
                    0 => {
                        fx.deposit(&Asset::Native, 50);
                        deposited.fetch_add(50, Ordering::SeqCst);
                    }
                    1 => {
                        let _ = fx.splitter.add_payee(&admin(), me.clone(), (t + 1) as u64);
                    }
                    2 => {
                        fx.splitter.release(&admin()).unwrap();
                    }
                    _ => {
                        let _ = fx.splitter.remove_payee(&admin(), &me);
                    }
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    let total = Amount::from(deposited.load(Ordering::SeqCst));
    let released = fx.splitter.total_released(&Asset::Native);
    assert_eq!(released_sum(&fx.splitter, &Asset::Native), released);
    assert_eq!(released + fx.held(&Asset::Native), total);
    assert_eq!(fx.splitter.payee_count(), 1);
    assert_eq!(fx.splitter.total_shares(), 10);
}

/// Native and token releases interleaved with event draining.
#[test]
fn no_deadlock_multi_asset_with_journal() {
    let detector = start_deadlock_detector();
    let fx = Arc::new(Fixture::with_payees(&[("alice", 1), ("bob", 1)]));
    let token = account(common::VTHO);

    const NUM_THREADS: usize = 8;
    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for t in 0..NUM_THREADS {
        let fx = fx.clone();
        let token = token.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                match (t + i) % 4 {
                    0 => {
                        fx.deposit(&Asset::Native, 10);
                        fx.deposit(&vtho(), 10);
                    }
                    1 => {
                        fx.splitter.release_token(&admin(), &token).unwrap();
                    }
                    2 => {
                        fx.splitter.release(&admin()).unwrap();
                    }
                    _ => {
                        let _ = fx.splitter.drain_events();
                    }
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    fx.splitter.release(&admin()).unwrap();
    fx.splitter.release_token(&admin(), &token).unwrap();
    for asset in [Asset::Native, vtho()] {
        assert_eq!(fx.held(&asset), 0);
        assert_eq!(fx.balance(&asset, "alice"), fx.balance(&asset, "bob"));
    }
}

/// Test that verifies the deadlock detector infrastructure.
#[test]
fn deadlock_detector_infrastructure() {
    let detector = start_deadlock_detector();

    let fx = Fixture::with_payees(&[("alice", 1)]);
    fx.deposit(&Asset::Native, 100);
    fx.splitter.release(&admin()).unwrap();
    assert_eq!(fx.balance(&Asset::Native, "alice"), 100);

    stop_deadlock_detector(detector);

    println!("Deadlock detector infrastructure verified");
}
