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

//! Error types for reservation processing.

use thiserror::Error;

/// Reservation processing errors.
///
/// Every store, coordinator and service operation fails with exactly one of
/// these kinds. Only [`ReservationError::NotFound`] is distinguished by the
/// transport layer; all other kinds are reported as a generic failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Lookup of a spot or booking by id found nothing
    #[error("not found")]
    NotFound,

    /// Malformed identifier or search parameter
    #[error("invalid request")]
    InvalidRequest,

    /// An update referenced an id absent from the target store
    #[error("inconsistent IDs")]
    InconsistentId,

    /// Booking attempted on a spot that is already reserved
    #[error("spot already reserved")]
    AlreadyReserved,

    /// Booking request referenced an unknown spot
    #[error("invalid spotid passed in booking request")]
    InvalidSpotId,

    /// Delete request referenced an unknown booking
    #[error("invalid booking id passed in delete booking request")]
    InvalidBookingId,

    /// The booking being deleted points at a spot that no longer exists
    #[error("invalid slot id for booking id passed in delete booking request")]
    InvalidSpotIdForBookingId,

    /// Releasing the spot of a deleted booking failed
    #[error("failed to update/release slot")]
    FailedToUpdate,

    /// A reservation flag change would contradict the booking ledger
    #[error("reservation flag conflicts with bookings")]
    ReservationConflict,

    /// Unexpected inconsistency in stored data
    #[error("internal data error")]
    InternalError,
}

impl ReservationError {
    /// Returns `true` for the kind the transport maps to "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReservationError::NotFound)
    }

    /// Stable machine-readable code, used in transport error bodies and
    /// in operation records.
    pub fn code(&self) -> &'static str {
        match self {
            ReservationError::NotFound => "NOT_FOUND",
            ReservationError::InvalidRequest => "INVALID_REQUEST",
            ReservationError::InconsistentId => "INCONSISTENT_ID",
            ReservationError::AlreadyReserved => "ALREADY_RESERVED",
            ReservationError::InvalidSpotId => "INVALID_SPOT_ID",
            ReservationError::InvalidBookingId => "INVALID_BOOKING_ID",
            ReservationError::InvalidSpotIdForBookingId => "INVALID_SPOT_ID_FOR_BOOKING_ID",
            ReservationError::FailedToUpdate => "FAILED_TO_UPDATE",
            ReservationError::ReservationConflict => "RESERVATION_CONFLICT",
            ReservationError::InternalError => "INTERNAL_ERROR",
        }
    }
}
