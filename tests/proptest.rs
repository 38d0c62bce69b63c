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

//! Property-based tests for the reservation service.
//!
//! These tests verify invariants that should hold for any sequence of
//! bookings and cancellations, and for any search.

use chrono::Utc;
use parking_reservation_rs::{
    BookingStore, InMemoryBookingStore, InMemorySpotStore, ReservationError, ReservationService,
    SpotFilter, SpotId, SpotStore, default_spots, haversine_km,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    /// Book a spot id (6 does not exist).
    Book(u32),
    /// Delete a booking id, which may or may not exist.
    Delete(u32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..=6).prop_map(Op::Book),
        (1u32..=20).prop_map(Op::Delete),
    ]
}

/// Latitude/longitude pairs around the default spots.
fn arb_origin() -> impl Strategy<Value = (f64, f64)> {
    (30.0f64..47.0, -120.0f64..-85.0)
}

// =============================================================================
// Consistency Invariants
// =============================================================================

fn assert_consistent(spots: &InMemorySpotStore, bookings: &InMemoryBookingStore) {
    let reserved: HashSet<SpotId> = spots
        .list(SpotFilter::Reserved)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();

    let booked: Vec<SpotId> = bookings.list().unwrap().into_iter().map(|b| b.spot_id).collect();
    let booked_set: HashSet<SpotId> = booked.iter().copied().collect();

    // One booking per reserved spot, and no booking on a free spot.
    assert_eq!(booked.len(), booked_set.len(), "spot booked twice");
    assert_eq!(reserved, booked_set);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Registry flags and ledger records agree after any operation sequence.
    #[test]
    fn stores_never_disagree(ops in prop::collection::vec(arb_op(), 0..40)) {
        let spots = Arc::new(InMemorySpotStore::seeded(default_spots()));
        let bookings = Arc::new(InMemoryBookingStore::new());
        let service = ReservationService::new(spots.clone(), bookings.clone());

        for op in ops {
            let reserved_before = spots.list(SpotFilter::Reserved).unwrap().len();
            let result = match op {
                Op::Book(id) => service
                    .book(&id.to_string(), Utc::now(), Duration::from_secs(60))
                    .map(|_| 1isize),
                Op::Delete(id) => service.delete_booking(&id.to_string()).map(|_| -1isize),
            };
            let reserved_after = spots.list(SpotFilter::Reserved).unwrap().len();

            // Success moves the reserved count by exactly one; failure not at all.
            let delta = reserved_after as isize - reserved_before as isize;
            match result {
                Ok(expected) => prop_assert_eq!(delta, expected),
                Err(_) => prop_assert_eq!(delta, 0),
            }
            assert_consistent(&spots, &bookings);
        }
    }

    /// Booking a reserved spot always fails with AlreadyReserved.
    #[test]
    fn reserved_spot_cannot_be_booked(id in 1u32..=5, attempts in 1usize..5) {
        let service = ReservationService::default();
        service.book(&id.to_string(), Utc::now(), Duration::from_secs(60)).unwrap();

        for _ in 0..attempts {
            prop_assert_eq!(
                service.book(&id.to_string(), Utc::now(), Duration::from_secs(60)),
                Err(ReservationError::AlreadyReserved)
            );
        }
    }

    /// Booking ids strictly increase, including across deletions.
    #[test]
    fn booking_ids_strictly_increase(ops in prop::collection::vec(arb_op(), 0..40)) {
        let service = ReservationService::default();
        let mut last = 0u32;

        for op in ops {
            match op {
                Op::Book(id) => {
                    if let Ok(b) = service.book(&id.to_string(), Utc::now(), Duration::from_secs(60)) {
                        prop_assert!(b.id.0 > last);
                        last = b.id.0;
                    }
                }
                Op::Delete(id) => {
                    let _ = service.delete_booking(&id.to_string());
                }
            }
        }
    }
}

// =============================================================================
// Search Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every result lies strictly inside the radius and is ordered by distance.
    #[test]
    fn results_inside_radius_and_sorted(
        origin in arb_origin(),
        radius_m in 0.0f64..4_000_000.0,
    ) {
        let service = ReservationService::default();
        let found = service
            .search(&origin.0.to_string(), &origin.1.to_string(), &radius_m.to_string(), "dist")
            .unwrap();

        for spot in &found {
            prop_assert!(spot.distance >= 0.0);
            prop_assert!(spot.distance / 1000.0 < radius_m / 1000.0 + 1e-9);
        }
        prop_assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    /// A wider radius never finds fewer spots.
    #[test]
    fn results_grow_with_radius(
        origin in arb_origin(),
        radius_m in 0.0f64..2_000_000.0,
        extra_m in 0.0f64..2_000_000.0,
    ) {
        let service = ReservationService::default();
        let (lat, lon) = (origin.0.to_string(), origin.1.to_string());

        let narrow = service.search(&lat, &lon, &radius_m.to_string(), "dist").unwrap();
        let wide = service
            .search(&lat, &lon, &(radius_m + extra_m).to_string(), "dist")
            .unwrap();
        prop_assert!(narrow.len() <= wide.len());
    }

    /// Cost ranking is non-decreasing in cost.
    #[test]
    fn cost_ranking_sorted(origin in arb_origin()) {
        let service = ReservationService::default();
        let found = service
            .search(&origin.0.to_string(), &origin.1.to_string(), "20000000", "cost")
            .unwrap();

        prop_assert_eq!(found.len(), 5);
        prop_assert!(found.windows(2).all(|w| w[0].spot.cost <= w[1].spot.cost));
    }

    /// Haversine distance is symmetric and non-negative.
    #[test]
    fn haversine_symmetric(a in arb_origin(), b in arb_origin()) {
        let ab = haversine_km(a, b);
        let ba = haversine_km(b, a);
        prop_assert!(ab >= 0.0);
        prop_assert!((ab - ba).abs() < 1e-6);
    }
}
