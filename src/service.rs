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

//! Reservation service: the single entry point for spot and booking
//! operations.

use crate::ReservationError;
use crate::base::{BookingId, SpotId};
use crate::booking::Booking;
use crate::coordinator::{self, Coordinator};
use crate::ledger::{BookingStore, InMemoryBookingStore};
use crate::pipeline::Pipeline;
use crate::registry::{InMemorySpotStore, SpotStore};
use crate::search::{self, SearchMetric, SearchQuery};
use crate::spot::{ExtendedSpot, Spot, SpotFilter, SpotUpdate, default_spots};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Composes one spot registry, one booking ledger and the coordinator
/// between them. Every call goes through the operation [`Pipeline`].
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use parking_reservation_rs::{ReservationError, ReservationService};
/// use std::time::Duration;
///
/// let service = ReservationService::default();
/// let booking = service
///     .book("1", Utc::now(), Duration::from_secs(1800))
///     .unwrap();
///
/// assert!(service.find_spot("1").unwrap().reserved);
/// assert_eq!(
///     service.book("1", Utc::now(), Duration::from_secs(1800)),
///     Err(ReservationError::AlreadyReserved)
/// );
///
/// service.delete_booking(&booking.id.to_string()).unwrap();
/// assert!(!service.find_spot("1").unwrap().reserved);
/// ```
pub struct ReservationService {
    spots: Arc<dyn SpotStore>,
    coordinator: Coordinator,
    pipeline: Pipeline,
}

impl ReservationService {
    pub fn new(spots: Arc<dyn SpotStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self {
            coordinator: Coordinator::new(Arc::clone(&spots), bookings),
            spots,
            pipeline: Pipeline::new(),
        }
    }

    /// In-memory stores, with the registry seeded from `spots`.
    pub fn in_memory(spots: impl IntoIterator<Item = Spot>) -> Self {
        Self::new(
            Arc::new(InMemorySpotStore::seeded(spots)),
            Arc::new(InMemoryBookingStore::new()),
        )
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn get_all_spots(&self) -> Result<Vec<Spot>, ReservationError> {
        self.pipeline
            .execute("get_all_spots", || self.spots.list(SpotFilter::All))
    }

    pub fn get_free_spots(&self) -> Result<Vec<Spot>, ReservationError> {
        self.pipeline
            .execute("get_free_spots", || self.spots.list(SpotFilter::Free))
    }

    pub fn get_reserved_spots(&self) -> Result<Vec<Spot>, ReservationError> {
        self.pipeline
            .execute("get_reserved_spots", || self.spots.list(SpotFilter::Reserved))
    }

    /// # Errors
    ///
    /// - [`ReservationError::InvalidRequest`] - `id` is not a decimal number.
    /// - [`ReservationError::NotFound`] - No such spot.
    pub fn find_spot(&self, id: &str) -> Result<Spot, ReservationError> {
        self.pipeline.run(
            "find_spot",
            || id.parse::<SpotId>(),
            |id| self.spots.find_by_id(id),
        )
    }

    /// Acknowledges a reservation flag for the spot `update.id`.
    ///
    /// The flag follows the bookings, so a value that contradicts them is
    /// refused with [`ReservationError::ReservationConflict`].
    pub fn update_spot(&self, update: SpotUpdate) -> Result<Spot, ReservationError> {
        self.pipeline
            .execute("update_spot", || self.coordinator.update_spot(update))
    }

    /// Spots within `radius` meters of (`latitude`, `longitude`), ranked by
    /// `metric` (`"dist"`, `"cost"`, anything else leaves them unsorted).
    pub fn search(
        &self,
        latitude: &str,
        longitude: &str,
        radius: &str,
        metric: &str,
    ) -> Result<Vec<ExtendedSpot>, ReservationError> {
        self.pipeline.run(
            "search",
            || SearchQuery::parse(latitude, longitude, radius),
            |query| search::search_within(self.spots.as_ref(), &query, SearchMetric::from(metric)),
        )
    }

    pub fn book(
        &self,
        spot_id: &str,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Booking, ReservationError> {
        self.pipeline.run(
            "book",
            || coordinator::parse_spot_id(spot_id),
            |spot_id| self.coordinator.book_spot(spot_id, start_time, duration),
        )
    }

    pub fn delete_booking(&self, booking_id: &str) -> Result<(), ReservationError> {
        self.pipeline.run(
            "delete_booking",
            || coordinator::parse_booking_id(booking_id),
            |booking_id: BookingId| self.coordinator.cancel(booking_id),
        )
    }

    pub fn get_all_bookings(&self) -> Result<Vec<Booking>, ReservationError> {
        self.pipeline
            .execute("get_all_bookings", || self.coordinator.get_all())
    }
}

impl Default for ReservationService {
    /// In-memory stores seeded with the five default spots.
    fn default() -> Self {
        Self::in_memory(default_spots())
    }
}
