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

//! Reservation coordinator.
//!
//! Mediates between the spot registry and the booking ledger. The two stores
//! are independent and share no transaction, so the order of calls is what
//! keeps them consistent:
//!
//! ```text
//!  book:   registry.find ──► registry.reserve (free → reserved) ──► ledger.create
//!                                                                     │ fails
//!                                                                     └──► registry.release
//!
//!  delete: ledger.find ──► registry.find ──► ledger.take ──► registry.release
//!                                                               │ fails
//!                                                               └──► ledger.restore
//! ```
//!
//! `reserve` checks and flips the flag under the registry's write lock, so two
//! concurrent bookings of one spot cannot both succeed. `take` hands a booking
//! to exactly one deleter, so a spot is released at most once per booking.
//!
//! The reservation flag is owned by the bookings: a direct flag update is only
//! accepted when it agrees with the ledger.

use crate::ReservationError;
use crate::base::{BookingId, SpotId};
use crate::booking::Booking;
use crate::ledger::BookingStore;
use crate::registry::SpotStore;
use crate::spot::{Spot, SpotUpdate};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Parses the spot id of a booking request.
///
/// A malformed id can never name a stored spot, so it is reported the same
/// way as an unknown one.
pub fn parse_spot_id(text: &str) -> Result<SpotId, ReservationError> {
    text.parse()
        .map_err(|_| ReservationError::InvalidSpotId)
}

/// Parses the booking id of a delete request.
pub fn parse_booking_id(text: &str) -> Result<BookingId, ReservationError> {
    text.parse()
}

/// Keeps spot reservation flags and booking records in agreement.
///
/// Holds no state or locks of its own.
#[derive(Clone)]
pub struct Coordinator {
    spots: Arc<dyn SpotStore>,
    bookings: Arc<dyn BookingStore>,
}

impl Coordinator {
    pub fn new(spots: Arc<dyn SpotStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self { spots, bookings }
    }

    /// Books the spot named by `spot_id` (decimal text).
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InvalidSpotId`] - Spot id is malformed or unknown.
    /// - [`ReservationError::AlreadyReserved`] - Spot is already reserved.
    /// - [`ReservationError::InternalError`] - Spot vanished before it could be reserved,
    ///   or the ledger refused the booking.
    pub fn book(
        &self,
        spot_id: &str,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Booking, ReservationError> {
        let spot_id = parse_spot_id(spot_id)?;
        self.book_spot(spot_id, start_time, duration)
    }

    /// Typed form of [`Coordinator::book`].
    pub fn book_spot(
        &self,
        spot_id: SpotId,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Booking, ReservationError> {
        let spot = self
            .spots
            .find_by_id(spot_id)
            .map_err(|_| ReservationError::InvalidSpotId)?;

        // Fast rejection before any mutation. The authoritative check is
        // repeated inside `reserve`.
        if spot.reserved {
            tracing::warn!(spot_id = %spot_id, "booking rejected: spot already reserved");
            return Err(ReservationError::AlreadyReserved);
        }

        self.spots.reserve(spot_id).map_err(|e| match e {
            ReservationError::AlreadyReserved => {
                tracing::warn!(spot_id = %spot_id, "booking lost race for spot");
                ReservationError::AlreadyReserved
            }
            other => {
                tracing::error!(spot_id = %spot_id, error = %other, "failed to reserve spot");
                ReservationError::InternalError
            }
        })?;

        match self.bookings.create(spot_id, start_time, duration) {
            Ok(booking) => {
                tracing::debug!(spot_id = %spot_id, booking_id = %booking.id, "spot reserved");
                Ok(booking)
            }
            Err(e) => {
                tracing::error!(spot_id = %spot_id, error = %e, "ledger refused booking, releasing spot");
                // A reserved spot without a booking would be stranded.
                if let Err(release_err) = self.spots.release(spot_id) {
                    tracing::error!(spot_id = %spot_id, error = %release_err, "failed to release spot");
                }
                Err(ReservationError::InternalError)
            }
        }
    }

    /// Cancels the booking named by `booking_id` (decimal text) and frees
    /// its spot.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InvalidRequest`] - Booking id is malformed.
    /// - [`ReservationError::InvalidBookingId`] - No such booking.
    /// - [`ReservationError::InvalidSpotIdForBookingId`] - The booked spot no longer exists.
    /// - [`ReservationError::FailedToUpdate`] - The spot could not be released. The
    ///   booking is kept, so the delete can be retried.
    pub fn delete(&self, booking_id: &str) -> Result<(), ReservationError> {
        let booking_id = parse_booking_id(booking_id)?;
        self.cancel(booking_id)
    }

    /// Typed form of [`Coordinator::delete`].
    pub fn cancel(&self, booking_id: BookingId) -> Result<(), ReservationError> {
        let booking = self
            .bookings
            .find(booking_id)
            .map_err(|_| ReservationError::InvalidBookingId)?;

        self.spots
            .find_by_id(booking.spot_id)
            .map_err(|_| ReservationError::InvalidSpotIdForBookingId)?;

        // Only the caller that takes the booking releases the spot; a
        // concurrent delete of the same id sees it gone.
        let booking = self
            .bookings
            .take(booking_id)?
            .ok_or(ReservationError::InvalidBookingId)?;
        let spot_id = booking.spot_id;

        if let Err(e) = self.spots.release(spot_id) {
            tracing::error!(
                booking_id = %booking_id,
                spot_id = %spot_id,
                error = %e,
                "failed to release spot, restoring booking"
            );
            // The spot is still reserved, so its booking must stay on record.
            if let Err(restore_err) = self.bookings.restore(booking) {
                tracing::error!(booking_id = %booking_id, error = %restore_err, "failed to restore booking");
            }
            return Err(ReservationError::FailedToUpdate);
        }

        tracing::debug!(booking_id = %booking_id, spot_id = %spot_id, "spot released");
        Ok(())
    }

    /// Checks a requested reservation flag against the ledger and returns the
    /// stored spot.
    ///
    /// Only booking and deleting change the flag, so an update that agrees
    /// with the ledger leaves the spot as it is.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InconsistentId`] - No spot has this id.
    /// - [`ReservationError::ReservationConflict`] - The requested flag, or the
    ///   stored one, disagrees with whether the spot has a booking.
    pub fn update_spot(&self, update: SpotUpdate) -> Result<Spot, ReservationError> {
        let stored = self
            .spots
            .find_by_id(update.id)
            .map_err(|_| ReservationError::InconsistentId)?;
        let booked = self
            .bookings
            .list()?
            .iter()
            .any(|booking| booking.spot_id == update.id);

        if update.reserved != booked || stored.reserved != booked {
            tracing::warn!(
                spot_id = %update.id,
                requested = update.reserved,
                booked,
                "reservation flag update rejected"
            );
            return Err(ReservationError::ReservationConflict);
        }
        Ok(stored)
    }

    /// All bookings, unfiltered and unordered.
    pub fn get_all(&self) -> Result<Vec<Booking>, ReservationError> {
        self.bookings.list()
    }
}
