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

//! Concurrency tests for the reservation service.
//!
//! These tests hammer the service from many threads and check that no spot
//! is ever double-booked, that a booking releases its spot exactly once, and
//! that the registry and ledger locks never deadlock. parking_lot's
//! `deadlock_detection` feature watches the lock graph while they run.

use chrono::Utc;
use parking_lot::deadlock;
use parking_reservation_rs::{
    BookingStore, InMemoryBookingStore, InMemorySpotStore, ReservationError, ReservationService,
    SpotFilter, SpotId, SpotStore, default_spots,
};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

// === Helpers ===

fn setup() -> (
    Arc<InMemorySpotStore>,
    Arc<InMemoryBookingStore>,
    Arc<ReservationService>,
) {
    let spots = Arc::new(InMemorySpotStore::seeded(default_spots()));
    let bookings = Arc::new(InMemoryBookingStore::new());
    let service = Arc::new(ReservationService::new(spots.clone(), bookings.clone()));
    (spots, bookings, service)
}

/// Starts a background thread that panics if a deadlock is detected.
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

fn assert_consistent(spots: &InMemorySpotStore, bookings: &InMemoryBookingStore) {
    let reserved: HashSet<SpotId> = spots
        .list(SpotFilter::Reserved)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    let booked: Vec<SpotId> = bookings.list().unwrap().into_iter().map(|b| b.spot_id).collect();
    let booked_set: HashSet<SpotId> = booked.iter().copied().collect();

    assert_eq!(booked.len(), booked_set.len(), "a spot has two bookings");
    assert_eq!(reserved, booked_set, "registry and ledger disagree");
}

// === Tests ===

#[test]
fn concurrent_bookings_of_one_spot_have_one_winner() {
    for _ in 0..50 {
        let (spots, bookings, service) = setup();

        let results: Vec<_> = (0..32)
            .into_par_iter()
            .map(|_| service.book("3", Utc::now(), MINUTE))
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| *e == ReservationError::AlreadyReserved)
        );
        assert_eq!(bookings.len(), 1);
        assert_consistent(&spots, &bookings);
    }
}

#[test]
fn concurrent_deletes_of_one_booking_release_once() {
    for _ in 0..50 {
        let (spots, bookings, service) = setup();
        let booking = service.book("1", Utc::now(), MINUTE).unwrap();
        let id = booking.id.to_string();

        let results: Vec<_> = (0..32)
            .into_par_iter()
            .map(|_| service.delete_booking(&id))
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| *e == ReservationError::InvalidBookingId)
        );
        assert!(!spots.find_by_id(SpotId(1)).unwrap().reserved);
        assert!(bookings.is_empty());
    }
}

#[test]
fn delete_racing_rebook_never_frees_new_booking() {
    for _ in 0..50 {
        let (spots, bookings, service) = setup();
        let booking = service.book("2", Utc::now(), MINUTE).unwrap();
        let id = booking.id.to_string();

        // Half the workers delete the old booking, half try to rebook the spot.
        (0..16).into_par_iter().for_each(|i| {
            if i % 2 == 0 {
                let _ = service.delete_booking(&id);
            } else {
                let _ = service.book("2", Utc::now(), MINUTE);
            }
        });

        assert_consistent(&spots, &bookings);
    }
}

#[test]
fn churn_keeps_stores_consistent_without_deadlock() {
    let running = start_deadlock_detector();
    let (spots, bookings, service) = setup();
    let successes = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let service = Arc::clone(&service);
            let successes = Arc::clone(&successes);
            thread::spawn(move || {
                for round in 0..500u32 {
                    let spot = ((worker + round) % 5 + 1).to_string();
                    if let Ok(booking) = service.book(&spot, Utc::now(), MINUTE) {
                        successes.fetch_add(1, Ordering::Relaxed);
                        if round % 3 != 0 {
                            service.delete_booking(&booking.id.to_string()).unwrap();
                        }
                    }
                    // Readers interleave with the writers.
                    let _ = service.get_free_spots().unwrap();
                    let _ = service
                        .search("33.755787", "-116.359998", "50000", "dist")
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    running.store(false, Ordering::SeqCst);

    assert!(successes.load(Ordering::Relaxed) > 0);
    assert_consistent(&spots, &bookings);
    assert!(bookings.len() <= 5);
}

#[test]
fn parallel_bookings_of_distinct_spots_all_succeed() {
    let (spots, bookings, service) = setup();

    let results: Vec<_> = (1..=5u32)
        .into_par_iter()
        .map(|id| service.book(&id.to_string(), Utc::now(), MINUTE))
        .collect();

    assert!(results.iter().all(|r| r.is_ok()));
    let mut ids: Vec<_> = results.into_iter().map(|r| r.unwrap().id.0).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert!(spots.list(SpotFilter::Free).unwrap().is_empty());
    assert_eq!(bookings.len(), 5);
}
