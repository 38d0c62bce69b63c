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

//! HTTP transport.
//!
//! Decodes requests into [`ReservationService`] calls and encodes the results.
//! [`ReservationError::NotFound`] becomes `404 Not Found`; every other error
//! kind becomes `500 Internal Server Error`. Error bodies carry the message
//! and a stable code:
//!
//! ```json
//! {"error": "spot already reserved", "code": "ALREADY_RESERVED"}
//! ```
//!
//! ## Endpoints
//!
//! - `GET    /parking/v1/getAll/` - All spots
//! - `GET    /parking/v1/getFree/` - Free spots
//! - `GET    /parking/v1/getReserved/` - Reserved spots
//! - `GET    /parking/v1/search/?lat=&lon=&rad=&metric=` - Proximity search
//! - `GET    /parking/v1/find/{id}` - One spot
//! - `PUT    /parking/v1/` - Update a spot's reservation flag
//! - `GET    /booking/v1/` - All bookings
//! - `POST   /booking/v1/` - Book a spot
//! - `DELETE /booking/v1/{id}` - Cancel a booking
//! - `GET    /metrics` - Per-operation statistics

use crate::booking::Booking;
use crate::pipeline::OperationStats;
use crate::spot::{ExtendedSpot, Spot, SpotUpdate};
use crate::{ReservationError, ReservationService};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Booking length used when a request does not give one.
pub const DEFAULT_BOOKING_DURATION: Duration = Duration::from_secs(30 * 60);

// === DTOs ===

/// Query string of a search request.
///
/// Missing values are left empty and rejected by the search itself.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub lat: String,
    pub lon: String,
    pub rad: String,
    pub metric: String,
}

/// Body of `PUT /parking/v1/`.
///
/// ```json
/// {"spot": {"id": 3, "isReserved": true}}
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSpotRequest {
    pub spot: SpotUpdate,
}

/// Body of `POST /booking/v1/`.
///
/// ```json
/// {"id": "1", "startTime": "2025-06-01T12:00:00Z", "duration": 1800}
/// ```
///
/// `startTime` defaults to now, `duration` (seconds) to 30 minutes.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(rename = "id")]
    pub spot_id: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpotsResponse {
    pub spots: Vec<Spot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub spots: Vec<ExtendedSpot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpotResponse {
    pub spot: Spot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingsResponse {
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub booking: Booking,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === State ===

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReservationService>,
}

// === Errors ===

/// Wrapper for converting `ReservationError` into HTTP responses.
pub struct AppError(ReservationError);

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: self.0.code().to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

async fn get_all_spots(State(state): State<AppState>) -> Result<Json<SpotsResponse>, AppError> {
    let spots = state.service.get_all_spots()?;
    Ok(Json(SpotsResponse { spots }))
}

async fn get_free_spots(State(state): State<AppState>) -> Result<Json<SpotsResponse>, AppError> {
    let spots = state.service.get_free_spots()?;
    Ok(Json(SpotsResponse { spots }))
}

async fn get_reserved_spots(
    State(state): State<AppState>,
) -> Result<Json<SpotsResponse>, AppError> {
    let spots = state.service.get_reserved_spots()?;
    Ok(Json(SpotsResponse { spots }))
}

async fn search_spots(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let spots = state
        .service
        .search(&params.lat, &params.lon, &params.rad, &params.metric)?;
    Ok(Json(SearchResponse { spots }))
}

async fn find_spot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SpotsResponse>, AppError> {
    let spot = state.service.find_spot(&id)?;
    Ok(Json(SpotsResponse { spots: vec![spot] }))
}

async fn update_spot(
    State(state): State<AppState>,
    Json(request): Json<UpdateSpotRequest>,
) -> Result<Json<SpotResponse>, AppError> {
    let spot = state.service.update_spot(request.spot)?;
    Ok(Json(SpotResponse { spot }))
}

async fn list_bookings(State(state): State<AppState>) -> Result<Json<BookingsResponse>, AppError> {
    let bookings = state.service.get_all_bookings()?;
    Ok(Json(BookingsResponse { bookings }))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let start_time = request.start_time.unwrap_or_else(Utc::now);
    let duration = request
        .duration
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_BOOKING_DURATION);

    let booking = state
        .service
        .book(&request.spot_id, start_time, duration)?;
    Ok(Json(BookingResponse { booking }))
}

async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.service.delete_booking(&id)?;
    Ok(Json(serde_json::json!({})))
}

async fn metrics(State(state): State<AppState>) -> Json<BTreeMap<&'static str, OperationStats>> {
    Json(state.service.pipeline().snapshot())
}

// === Router ===

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE]);

    Router::new()
        .route("/parking/v1/getAll/", get(get_all_spots))
        .route("/parking/v1/getFree/", get(get_free_spots))
        .route("/parking/v1/getReserved/", get(get_reserved_spots))
        .route("/parking/v1/search/", get(search_spots))
        .route("/parking/v1/find/{id}", get(find_spot))
        .route("/parking/v1/", axum::routing::put(update_spot))
        .route("/booking/v1/", get(list_bookings).post(create_booking))
        .route("/booking/v1/{id}", delete(delete_booking))
        .route("/metrics", get(metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
