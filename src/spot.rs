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

//! Parking spot records.
//!
//! # Example
//!
//! ```
//! use parking_reservation_rs::{Spot, SpotFilter, SpotId};
//! use rust_decimal_macros::dec;
//!
//! let spot = Spot::new(SpotId(1), "44.968046", "-94.420307", dec!(100), "address 1");
//! assert!(SpotFilter::Free.matches(&spot));
//! assert!(!SpotFilter::Reserved.matches(&spot));
//! ```

use crate::base::SpotId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A parking location with a reservation flag.
///
/// Coordinates are kept as the decimal text they were registered with and are
/// only parsed when a search needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
    pub id: SpotId,
    #[serde(rename = "lat")]
    pub latitude: String,
    #[serde(rename = "lon")]
    pub longitude: String,
    pub cost: Decimal,
    /// Single source of truth for availability.
    #[serde(rename = "isReserved", default)]
    pub reserved: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
}

impl Spot {
    /// Creates a free spot.
    pub fn new(
        id: SpotId,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        cost: Decimal,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id,
            latitude: latitude.into(),
            longitude: longitude.into(),
            cost,
            reserved: false,
            address: address.into(),
        }
    }
}

/// Requested reservation state for one spot.
///
/// Accepts a full [`Spot`] body as well; fields other than `id` and
/// `isReserved` are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotUpdate {
    pub id: SpotId,
    #[serde(rename = "isReserved", default)]
    pub reserved: bool,
}

impl From<&Spot> for SpotUpdate {
    fn from(spot: &Spot) -> Self {
        Self {
            id: spot.id,
            reserved: spot.reserved,
        }
    }
}

/// A spot annotated with its distance from a search origin.
///
/// Only produced by a search; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedSpot {
    #[serde(flatten)]
    pub spot: Spot,
    /// Distance from the search origin in meters.
    pub distance: f64,
}

impl ExtendedSpot {
    pub fn from_km(spot: Spot, distance_km: f64) -> Self {
        Self {
            spot,
            distance: distance_km * 1000.0,
        }
    }
}

/// Which spots a registry listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotFilter {
    All,
    Free,
    Reserved,
}

impl SpotFilter {
    pub fn matches(&self, spot: &Spot) -> bool {
        match self {
            SpotFilter::All => true,
            SpotFilter::Free => !spot.reserved,
            SpotFilter::Reserved => spot.reserved,
        }
    }
}

/// The fixed set of spots seeded at startup when no seed file is given.
pub fn default_spots() -> Vec<Spot> {
    vec![
        Spot::new(SpotId(1), "44.968046", "-94.420307", dec!(100), "address 1"),
        Spot::new(SpotId(2), "44.33328", "-89.132008", dec!(10), "address 2"),
        Spot::new(SpotId(3), "33.755787", "-116.359998", dec!(80), "address 3"),
        Spot::new(SpotId(4), "33.844843", "-116.54911", dec!(70), "address 4"),
        Spot::new(SpotId(5), "44.92057", "-93.44786", dec!(90), "address 5"),
    ]
}
