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

//! Proximity search over the spot registry.
//!
//! A search takes an origin and a radius (as received from the transport,
//! decimal text), keeps every spot whose great-circle distance from the
//! origin is strictly below the radius, and ranks the survivors by the
//! requested [`SearchMetric`].

use crate::ReservationError;
use crate::registry::SpotStore;
use crate::spot::{ExtendedSpot, SpotFilter};
use std::cmp::Ordering;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Ordering applied to search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMetric {
    /// Ascending distance from the origin (`"dist"`).
    Distance,
    /// Ascending numeric cost (`"cost"`).
    Cost,
    /// Any other metric name: results are returned in registry order.
    Unordered,
}

impl From<&str> for SearchMetric {
    fn from(name: &str) -> Self {
        match name {
            "dist" => SearchMetric::Distance,
            "cost" => SearchMetric::Cost,
            _ => SearchMetric::Unordered,
        }
    }
}

/// Parsed search origin and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl SearchQuery {
    /// # Errors
    ///
    /// [`ReservationError::InvalidRequest`] if any value is not a finite
    /// decimal number.
    pub fn parse(latitude: &str, longitude: &str, radius: &str) -> Result<Self, ReservationError> {
        let parse = |text: &str| parse_decimal(text).ok_or(ReservationError::InvalidRequest);
        Ok(Self {
            latitude: parse(latitude)?,
            longitude: parse(longitude)?,
            radius_meters: parse(radius)?,
        })
    }

    fn radius_km(&self) -> f64 {
        self.radius_meters / 1000.0
    }
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Great-circle distance in kilometers between two `(latitude, longitude)`
/// points given in degrees.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let sin_dlat = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon = ((lon2 - lon1) * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Finds the spots within `radius` meters of (`latitude`, `longitude`).
///
/// # Errors
///
/// - [`ReservationError::InvalidRequest`] if a query value does not parse.
/// - [`ReservationError::InternalError`] if a stored spot has unparsable
///   coordinates. The whole search fails; the spot is not skipped.
pub fn search(
    store: &dyn SpotStore,
    latitude: &str,
    longitude: &str,
    radius: &str,
    metric: SearchMetric,
) -> Result<Vec<ExtendedSpot>, ReservationError> {
    let query = SearchQuery::parse(latitude, longitude, radius)?;
    search_within(store, &query, metric)
}

/// Same as [`search`] for an already parsed query.
pub fn search_within(
    store: &dyn SpotStore,
    query: &SearchQuery,
    metric: SearchMetric,
) -> Result<Vec<ExtendedSpot>, ReservationError> {
    let origin = (query.latitude, query.longitude);
    let radius_km = query.radius_km();

    let mut found = Vec::new();
    for spot in store.list(SpotFilter::All)? {
        let latitude = parse_decimal(&spot.latitude).ok_or(ReservationError::InternalError)?;
        let longitude = parse_decimal(&spot.longitude).ok_or(ReservationError::InternalError)?;

        let distance_km = haversine_km(origin, (latitude, longitude));
        // Strict: a spot exactly on the boundary is outside.
        if distance_km < radius_km {
            found.push(ExtendedSpot::from_km(spot, distance_km));
        }
    }

    rank(&mut found, metric);
    Ok(found)
}

/// Sorts results by `metric`. Ties are broken by ascending spot id so equal
/// keys come back in a stable order.
pub fn rank(spots: &mut [ExtendedSpot], metric: SearchMetric) {
    let by_id = |a: &ExtendedSpot, b: &ExtendedSpot| a.spot.id.cmp(&b.spot.id);
    match metric {
        SearchMetric::Distance => {
            spots.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| by_id(a, b)))
        }
        SearchMetric::Cost => spots.sort_by(|a, b| match a.spot.cost.cmp(&b.spot.cost) {
            Ordering::Equal => by_id(a, b),
            other => other,
        }),
        SearchMetric::Unordered => {}
    }
}
