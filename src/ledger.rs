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

//! Booking ledger.
//!
//! Owns the canonical set of bookings and allocates their ids. The ledger
//! does not know about spot availability: "one active booking per spot" is
//! enforced by the coordinator through the registry's reservation flag.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use parking_reservation_rs::{BookingId, BookingStore, InMemoryBookingStore, SpotId};
//! use std::time::Duration;
//!
//! let ledger = InMemoryBookingStore::new();
//! let booking = ledger
//!     .create(SpotId(1), Utc::now(), Duration::from_secs(1800))
//!     .unwrap();
//! assert_eq!(booking.id, BookingId(1));
//! ```

use crate::ReservationError;
use crate::base::{BookingId, SpotId};
use crate::booking::Booking;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

/// Storage contract for bookings.
pub trait BookingStore: Send + Sync {
    /// Records a booking under the next sequential id.
    fn create(
        &self,
        spot_id: SpotId,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Booking, ReservationError>;

    /// Removes the booking. Deleting an absent id is a no-op.
    fn delete(&self, id: BookingId) -> Result<(), ReservationError> {
        self.take(id).map(|_| ())
    }

    /// Removes the booking and hands it back, or `None` if it was absent.
    ///
    /// Of several concurrent callers for the same id, exactly one receives
    /// the booking.
    fn take(&self, id: BookingId) -> Result<Option<Booking>, ReservationError>;

    /// Puts back a booking previously handed out by [`BookingStore::take`],
    /// under its original id.
    ///
    /// # Errors
    ///
    /// [`ReservationError::InternalError`] if the id was never allocated by
    /// this ledger or is occupied again.
    fn restore(&self, booking: Booking) -> Result<(), ReservationError>;

    /// # Errors
    ///
    /// [`ReservationError::NotFound`] if no booking has this id.
    fn find(&self, id: BookingId) -> Result<Booking, ReservationError>;

    /// Returns every booking, in no particular order.
    fn list(&self) -> Result<Vec<Booking>, ReservationError>;
}

#[derive(Debug)]
struct LedgerData {
    bookings: HashMap<BookingId, Booking>,
    /// Id for the next booking. Only ever increases.
    next_id: u32,
}

impl LedgerData {
    fn new() -> Self {
        Self {
            bookings: HashMap::new(),
            next_id: 1,
        }
    }
}

/// Booking ledger held in process memory.
#[derive(Debug)]
pub struct InMemoryBookingStore {
    inner: Mutex<LedgerData>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerData::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().bookings.is_empty()
    }
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore for InMemoryBookingStore {
    fn create(
        &self,
        spot_id: SpotId,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Booking, ReservationError> {
        let mut data = self.inner.lock();
        let id = BookingId(data.next_id);
        let next = data
            .next_id
            .checked_add(1)
            .ok_or(ReservationError::InternalError)?;

        let booking = Booking {
            id,
            spot_id,
            start_time,
            duration,
        };
        data.bookings.insert(id, booking.clone());
        data.next_id = next;
        Ok(booking)
    }

    fn take(&self, id: BookingId) -> Result<Option<Booking>, ReservationError> {
        Ok(self.inner.lock().bookings.remove(&id))
    }

    fn restore(&self, booking: Booking) -> Result<(), ReservationError> {
        let mut data = self.inner.lock();
        if booking.id.0 == 0 || booking.id.0 >= data.next_id {
            return Err(ReservationError::InternalError);
        }
        match data.bookings.entry(booking.id) {
            Entry::Occupied(_) => Err(ReservationError::InternalError),
            Entry::Vacant(slot) => {
                slot.insert(booking);
                Ok(())
            }
        }
    }

    fn find(&self, id: BookingId) -> Result<Booking, ReservationError> {
        self.inner
            .lock()
            .bookings
            .get(&id)
            .cloned()
            .ok_or(ReservationError::NotFound)
    }

    fn list(&self) -> Result<Vec<Booking>, ReservationError> {
        Ok(self.inner.lock().bookings.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF_HOUR: Duration = Duration::from_secs(30 * 60);

    #[test]
    fn ids_are_sequential_from_one() {
        let ledger = InMemoryBookingStore::new();
        let now = Utc::now();
        let ids: Vec<_> = (1..=3)
            .map(|spot| ledger.create(SpotId(spot), now, HALF_HOUR).unwrap().id)
            .collect();
        assert_eq!(ids, vec![BookingId(1), BookingId(2), BookingId(3)]);
    }

    #[test]
    fn ids_are_never_reused_after_delete() {
        let ledger = InMemoryBookingStore::new();
        let now = Utc::now();
        let first = ledger.create(SpotId(1), now, HALF_HOUR).unwrap();
        ledger.delete(first.id).unwrap();

        let second = ledger.create(SpotId(1), now, HALF_HOUR).unwrap();
        assert_eq!(second.id, BookingId(2));
    }

    #[test]
    fn ledger_does_not_enforce_spot_uniqueness() {
        let ledger = InMemoryBookingStore::new();
        let now = Utc::now();
        ledger.create(SpotId(1), now, HALF_HOUR).unwrap();
        ledger.create(SpotId(1), now, HALF_HOUR).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn find_returns_stored_booking() {
        let ledger = InMemoryBookingStore::new();
        let now = Utc::now();
        let created = ledger.create(SpotId(4), now, HALF_HOUR).unwrap();

        assert_eq!(ledger.find(created.id).unwrap(), created);
        assert_eq!(ledger.find(BookingId(99)), Err(ReservationError::NotFound));
    }

    #[test]
    fn delete_absent_is_noop() {
        let ledger = InMemoryBookingStore::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.delete(BookingId(5)), Ok(()));
    }

    #[test]
    fn take_hands_out_booking_once() {
        let ledger = InMemoryBookingStore::new();
        let created = ledger.create(SpotId(2), Utc::now(), HALF_HOUR).unwrap();

        assert_eq!(ledger.take(created.id).unwrap(), Some(created.clone()));
        assert_eq!(ledger.take(created.id).unwrap(), None);
        assert_eq!(ledger.find(created.id), Err(ReservationError::NotFound));
    }

    #[test]
    fn restore_puts_taken_booking_back_under_same_id() {
        let ledger = InMemoryBookingStore::new();
        let created = ledger.create(SpotId(3), Utc::now(), HALF_HOUR).unwrap();
        let taken = ledger.take(created.id).unwrap().unwrap();

        ledger.restore(taken).unwrap();
        assert_eq!(ledger.find(created.id).unwrap(), created);

        // Restoring does not disturb id allocation.
        let next = ledger.create(SpotId(4), Utc::now(), HALF_HOUR).unwrap();
        assert_eq!(next.id, BookingId(2));
    }

    #[test]
    fn restore_refuses_live_or_unallocated_ids() {
        let ledger = InMemoryBookingStore::new();
        let created = ledger.create(SpotId(3), Utc::now(), HALF_HOUR).unwrap();

        assert_eq!(
            ledger.restore(created.clone()),
            Err(ReservationError::InternalError)
        );

        let mut invented = created;
        invented.id = BookingId(7);
        assert_eq!(ledger.restore(invented), Err(ReservationError::InternalError));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn list_returns_all_bookings() {
        let ledger = InMemoryBookingStore::new();
        let now = Utc::now();
        ledger.create(SpotId(1), now, HALF_HOUR).unwrap();
        ledger.create(SpotId(2), now, HALF_HOUR).unwrap();
        let b3 = ledger.create(SpotId(3), now, HALF_HOUR).unwrap();
        ledger.delete(b3.id).unwrap();

        let mut spots: Vec<_> = ledger.list().unwrap().iter().map(|b| b.spot_id).collect();
        spots.sort();
        assert_eq!(spots, vec![SpotId(1), SpotId(2)]);
    }
}
