use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatch;
use crate::engine::location::update_ride_location;
use crate::error::AppError;
use crate::models::ride::{Ride, RideStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rides", post(request_ride).get(list_rides))
        .route("/rides/:id", get(get_ride).delete(archive_ride))
        .route("/rides/:id/dispatch", post(dispatch_ride))
        .route("/rides/:id/accept", post(accept_ride))
        .route("/rides/:id/status", patch(update_ride_status))
        .route("/rides/location", post(update_location))
}

#[derive(Deserialize)]
pub struct RequestRideBody {
    pub rider_id: Uuid,
    pub pickup_location: String,
    pub dropoff_location: Option<String>,
}

#[derive(Deserialize)]
pub struct AcceptRideBody {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub profile_id: Uuid,
    pub status: RideStatus,
}

/// Coordinates arrive as strings on the wire; non-numeric input is a
/// validation failure, not a deserialization error.
#[derive(Deserialize)]
pub struct UpdateLocationBody {
    pub ride_id: Uuid,
    pub latitude: String,
    pub longitude: String,
}

async fn request_ride(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RequestRideBody>,
) -> Result<Json<Ride>, AppError> {
    let rider = state.profiles.get(payload.rider_id)?;
    let ride = dispatch::request_ride(
        &state,
        &rider,
        payload.pickup_location,
        payload.dropoff_location,
    )?;

    Ok(Json(ride))
}

async fn list_rides(State(state): State<Arc<AppState>>) -> Json<Vec<Ride>> {
    Json(dispatch::list_rides(&state, None))
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(dispatch::get_ride(&state, id)?))
}

async fn archive_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.rides.archive(id)?))
}

async fn dispatch_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    let ride = dispatch::find_and_assign_driver(&state, id).await?;
    Ok(Json(ride))
}

async fn accept_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptRideBody>,
) -> Result<Json<Ride>, AppError> {
    let driver = state.profiles.get(payload.driver_id)?;
    let ride = dispatch::accept_ride(&state, id, &driver)?;
    Ok(Json(ride))
}

async fn update_ride_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusBody>,
) -> Result<Json<Ride>, AppError> {
    let acting = state.profiles.get(payload.profile_id)?;
    let ride = dispatch::update_ride_status(&state, id, &acting, payload.status)?;
    Ok(Json(ride))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateLocationBody>,
) -> Result<Json<Ride>, AppError> {
    let lat = payload
        .latitude
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("invalid latitude '{}'", payload.latitude)))?;
    let lng = payload
        .longitude
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("invalid longitude '{}'", payload.longitude)))?;

    let ride = update_ride_location(&state, payload.ride_id, lat, lng).await?;
    Ok(Json(ride))
}
