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

//! # Parking Reservation
//!
//! This library provides a parking spot reservation service: spots carry a
//! reserved/free flag and coordinates, bookings reserve a spot for a time
//! window and release it when cancelled.
//!
//! ## Core Components
//!
//! - [`SpotStore`] / [`InMemorySpotStore`]: Spot registry, the single source of truth for availability
//! - [`search()`]: Haversine radius search ranked by distance or cost
//! - [`BookingStore`] / [`InMemoryBookingStore`]: Booking ledger with sequential, never reused ids
//! - [`Coordinator`]: Keeps reservation flags and bookings consistent
//! - [`ReservationService`]: Composes the above behind the operation [`Pipeline`]
//! - [`ReservationError`]: Error kinds for every operation
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use parking_reservation_rs::ReservationService;
//! use std::time::Duration;
//!
//! let service = ReservationService::default();
//!
//! // Spots within 10 km of spot 3, nearest first
//! let nearby = service
//!     .search("33.755787", "-116.359998", "10000", "dist")
//!     .unwrap();
//! assert_eq!(nearby.len(), 1);
//!
//! // Book it for half an hour
//! let booking = service
//!     .book("3", Utc::now(), Duration::from_secs(1800))
//!     .unwrap();
//! assert_eq!(service.get_reserved_spots().unwrap().len(), 1);
//!
//! // Cancelling frees it again
//! service.delete_booking(&booking.id.to_string()).unwrap();
//! assert!(service.get_reserved_spots().unwrap().is_empty());
//! ```
//!
//! ## Thread Safety
//!
//! The registry guards its spots with one reader/writer lock and the ledger
//! guards its bookings with one mutex. Every lock is held for a single map
//! read or write, so the service can be shared across request handlers.

mod base;
mod booking;
pub mod coordinator;
pub mod error;
pub mod http;
mod ledger;
pub mod pipeline;
mod registry;
pub mod search;
mod service;
mod spot;

pub use base::{BookingId, SpotId};
pub use booking::Booking;
pub use coordinator::Coordinator;
pub use error::ReservationError;
pub use ledger::{BookingStore, InMemoryBookingStore};
pub use pipeline::{OperationRecord, OperationStats, Outcome, Pipeline};
pub use registry::{InMemorySpotStore, SpotStore};
pub use search::{SearchMetric, SearchQuery, haversine_km, search};
pub use service::ReservationService;
pub use spot::{ExtendedSpot, Spot, SpotFilter, SpotUpdate, default_spots};
