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

//! Spot registry.
//!
//! Owns the canonical set of parking spots and their reservation flags. All
//! access serializes through a single reader/writer lock over the id map:
//! listings and lookups share the lock, every mutation takes it exclusively.
//!
//! # Example
//!
//! ```
//! use parking_reservation_rs::{InMemorySpotStore, SpotFilter, SpotId, SpotStore, default_spots};
//!
//! let registry = InMemorySpotStore::seeded(default_spots());
//! registry.reserve(SpotId(1)).unwrap();
//!
//! assert_eq!(registry.list(SpotFilter::Reserved).unwrap().len(), 1);
//! assert_eq!(registry.list(SpotFilter::Free).unwrap().len(), 4);
//! ```

use crate::base::SpotId;
use crate::spot::{Spot, SpotFilter};
use crate::ReservationError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage contract for parking spots.
///
/// The in-memory implementation is the default; a durable store can be
/// swapped in behind the same trait.
pub trait SpotStore: Send + Sync {
    /// Returns the spots matching `filter`, in no particular order.
    fn list(&self, filter: SpotFilter) -> Result<Vec<Spot>, ReservationError>;

    /// # Errors
    ///
    /// [`ReservationError::NotFound`] if no spot has this id.
    fn find_by_id(&self, id: SpotId) -> Result<Spot, ReservationError>;

    /// Stores a new, free spot under a freshly allocated id. The id and
    /// reservation flag carried by `spot` are ignored.
    fn create(&self, spot: Spot) -> Result<Spot, ReservationError>;

    /// Replaces the mutable fields (the reservation flag) of the stored spot
    /// with the same id and returns the post-update spot.
    ///
    /// # Errors
    ///
    /// [`ReservationError::InconsistentId`] if the id is not stored.
    fn update(&self, spot: &Spot) -> Result<Spot, ReservationError>;

    /// # Errors
    ///
    /// [`ReservationError::NotFound`] if no spot has this id.
    fn delete(&self, id: SpotId) -> Result<(), ReservationError>;

    /// Marks the spot reserved iff it is currently free, as one atomic step.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InconsistentId`] if the id is not stored.
    /// - [`ReservationError::AlreadyReserved`] if the spot is already reserved.
    fn reserve(&self, id: SpotId) -> Result<Spot, ReservationError>;

    /// Marks the spot free.
    ///
    /// # Errors
    ///
    /// [`ReservationError::InconsistentId`] if the id is not stored.
    fn release(&self, id: SpotId) -> Result<Spot, ReservationError>;
}

#[derive(Debug, Default)]
struct SpotTable {
    spots: HashMap<SpotId, Spot>,
    /// Next id handed out by `create`; always above every stored id.
    next_id: u32,
}

impl SpotTable {
    fn insert(&mut self, spot: Spot) {
        self.next_id = self.next_id.max(spot.id.0.saturating_add(1));
        self.spots.insert(spot.id, spot);
        self.assert_invariants();
    }

    fn allocate_id(&mut self) -> Result<SpotId, ReservationError> {
        // Ids start at 1.
        let id = self.next_id.max(1);
        self.next_id = id.checked_add(1).ok_or(ReservationError::InternalError)?;
        Ok(SpotId(id))
    }

    fn set_reserved(&mut self, id: SpotId, reserved: bool) -> Result<Spot, ReservationError> {
        let spot = self
            .spots
            .get_mut(&id)
            .ok_or(ReservationError::InconsistentId)?;
        spot.reserved = reserved;
        Ok(spot.clone())
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.next_id == u32::MAX || self.spots.keys().all(|id| id.0 < self.next_id),
            "Invariant violated: next spot id {} not above every stored id",
            self.next_id
        );
    }
}

/// Spot registry held in process memory.
#[derive(Debug, Default)]
pub struct InMemorySpotStore {
    inner: RwLock<SpotTable>,
}

impl InMemorySpotStore {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with `spots`, keeping their ids.
    ///
    /// A later spot replaces an earlier one with the same id.
    pub fn seeded(spots: impl IntoIterator<Item = Spot>) -> Self {
        let mut table = SpotTable::default();
        for spot in spots {
            table.insert(spot);
        }
        Self {
            inner: RwLock::new(table),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().spots.is_empty()
    }
}

impl SpotStore for InMemorySpotStore {
    fn list(&self, filter: SpotFilter) -> Result<Vec<Spot>, ReservationError> {
        let table = self.inner.read();
        Ok(table
            .spots
            .values()
            .filter(|spot| filter.matches(spot))
            .cloned()
            .collect())
    }

    fn find_by_id(&self, id: SpotId) -> Result<Spot, ReservationError> {
        self.inner
            .read()
            .spots
            .get(&id)
            .cloned()
            .ok_or(ReservationError::NotFound)
    }

    fn create(&self, mut spot: Spot) -> Result<Spot, ReservationError> {
        let mut table = self.inner.write();
        spot.id = table.allocate_id()?;
        // No booking can reference a spot that did not exist until now.
        spot.reserved = false;
        table.insert(spot.clone());
        Ok(spot)
    }

    fn update(&self, spot: &Spot) -> Result<Spot, ReservationError> {
        self.inner.write().set_reserved(spot.id, spot.reserved)
    }

    fn delete(&self, id: SpotId) -> Result<(), ReservationError> {
        self.inner
            .write()
            .spots
            .remove(&id)
            .map(|_| ())
            .ok_or(ReservationError::NotFound)
    }

    fn reserve(&self, id: SpotId) -> Result<Spot, ReservationError> {
        let mut table = self.inner.write();
        let spot = table
            .spots
            .get(&id)
            .ok_or(ReservationError::InconsistentId)?;
        // Check and flip under the same write guard.
        if spot.reserved {
            return Err(ReservationError::AlreadyReserved);
        }
        table.set_reserved(id, true)
    }

    fn release(&self, id: SpotId) -> Result<Spot, ReservationError> {
        self.inner.write().set_reserved(id, false)
    }
}
