use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::profile::{GeoPoint, Lifecycle, Profile, Role};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profiles", post(create_profile).get(list_profiles))
        .route("/profiles/:id/location", patch(update_profile_location))
        .route("/profiles/:id/availability", patch(update_availability))
}

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub role: Role,
    pub location: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available: bool,
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let profile = Profile {
        id: Uuid::new_v4(),
        name: payload.name,
        role: payload.role,
        location: payload.location,
        available: true,
        lifecycle: Lifecycle::Active,
        updated_at: Utc::now(),
    };

    state.profiles.insert(profile.clone());
    Ok(Json(profile))
}

async fn list_profiles(State(state): State<Arc<AppState>>) -> Json<Vec<Profile>> {
    Json(state.profiles.list())
}

async fn update_profile_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Profile>, AppError> {
    let profile = state.profiles.set_location(id, payload.location)?;
    Ok(Json(profile))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Profile>, AppError> {
    let profile = state.profiles.set_availability(id, payload.available)?;
    Ok(Json(profile))
}
