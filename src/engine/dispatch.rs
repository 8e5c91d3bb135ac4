use std::time::Instant;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::event::RideEvent;
use crate::models::profile::{Profile, Role};
use crate::models::ride::{Ride, RideStatus};
use crate::state::AppState;

/// Creates a ride in `Requested`. Only riders may request rides.
pub fn request_ride(
    state: &AppState,
    rider: &Profile,
    pickup: String,
    dropoff: Option<String>,
) -> Result<Ride, AppError> {
    match rider.role {
        Role::Rider => {}
        Role::Driver => {
            return Err(AppError::PermissionDenied(
                "only rider users may request rides".to_string(),
            ));
        }
    }

    if pickup.trim().is_empty() {
        return Err(AppError::Validation(
            "pickup location cannot be empty".to_string(),
        ));
    }

    let ride = state.rides.create(rider.id, pickup, dropoff);
    emit_event(state, &ride);

    info!(ride_id = %ride.id, rider_id = %rider.id, "ride requested");
    Ok(ride)
}

/// Geocodes the pickup, finds the nearest available driver and assigns it
/// via the conditional update. The loser of a concurrent assignment race
/// gets `Conflict`.
pub async fn find_and_assign_driver(state: &AppState, ride_id: Uuid) -> Result<Ride, AppError> {
    let start = Instant::now();
    let result = dispatch_ride(state, ride_id).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(AppError::NotFound(_)) => "no_driver",
        Err(AppError::Conflict(_)) => "conflict",
        Err(_) => "error",
    };
    state
        .metrics
        .dispatch_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .dispatch_total
        .with_label_values(&[outcome])
        .inc();

    result
}

async fn dispatch_ride(state: &AppState, ride_id: Uuid) -> Result<Ride, AppError> {
    let ride = state.rides.get(ride_id)?;

    if ride.status != RideStatus::Requested {
        return Err(AppError::PreconditionFailed(format!(
            "ride {ride_id} must be Requested to assign a driver, was {:?}",
            ride.status
        )));
    }

    let pickup = state
        .geocoder
        .geocode(&ride.pickup_location)
        .await
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "pickup location '{}' could not be geocoded",
                ride.pickup_location
            ))
        })?;

    let driver = state
        .profiles
        .nearest_driver(&pickup, state.search_radius_km)
        .ok_or_else(|| {
            AppError::NotFound("no available drivers within radius".to_string())
        })?;

    let ride = state.rides.try_transition(
        ride_id,
        RideStatus::Requested,
        None,
        RideStatus::Accepted,
        Some(driver.id),
    )?;

    // Busy marker; freed again when the ride reaches a terminal state.
    let _ = state.profiles.set_availability(driver.id, false);
    emit_event(state, &ride);

    info!(ride_id = %ride.id, driver_id = %driver.id, "driver assigned");
    Ok(ride)
}

/// Driver self-service acceptance of a `Requested` ride.
pub fn accept_ride(state: &AppState, ride_id: Uuid, driver: &Profile) -> Result<Ride, AppError> {
    match driver.role {
        Role::Driver => {}
        Role::Rider => {
            return Err(AppError::PermissionDenied(
                "only drivers may accept rides".to_string(),
            ));
        }
    }

    let ride = state.rides.get(ride_id)?;
    if ride.status != RideStatus::Requested {
        return Err(AppError::PreconditionFailed(format!(
            "ride {ride_id} must be Requested to be accepted, was {:?}",
            ride.status
        )));
    }

    let ride = state.rides.try_transition(
        ride_id,
        RideStatus::Requested,
        None,
        RideStatus::Accepted,
        Some(driver.id),
    )?;

    let _ = state.profiles.set_availability(driver.id, false);
    emit_event(state, &ride);

    info!(ride_id = %ride.id, driver_id = %driver.id, "ride accepted");
    Ok(ride)
}

/// Applies a forward transition. The assigned driver may apply any legal
/// transition; the ride's rider may only cancel.
pub fn update_ride_status(
    state: &AppState,
    ride_id: Uuid,
    acting: &Profile,
    new_status: RideStatus,
) -> Result<Ride, AppError> {
    let ride = state.rides.get(ride_id)?;

    let is_driver = ride.driver_id == Some(acting.id);
    let is_cancelling_rider = ride.rider_id == acting.id && new_status == RideStatus::Cancelled;
    if !is_driver && !is_cancelling_rider {
        return Err(AppError::PermissionDenied(
            "only the assigned driver can update the ride status".to_string(),
        ));
    }

    if !ride.status.can_transition_to(new_status) {
        return Err(AppError::PreconditionFailed(format!(
            "ride {ride_id} cannot move from {:?} to {:?}",
            ride.status, new_status
        )));
    }

    let updated = state.rides.try_transition(
        ride_id,
        ride.status,
        ride.driver_id,
        new_status,
        ride.driver_id,
    )?;

    if new_status.is_terminal() {
        if let Some(driver_id) = updated.driver_id {
            let _ = state.profiles.set_availability(driver_id, true);
        }
    }

    state
        .metrics
        .ride_status_transitions_total
        .with_label_values(&[&format!("{new_status:?}")])
        .inc();
    emit_event(state, &updated);

    info!(ride_id = %ride_id, status = ?new_status, "ride status updated");
    Ok(updated)
}

pub fn get_ride(state: &AppState, ride_id: Uuid) -> Result<Ride, AppError> {
    state.rides.get(ride_id)
}

pub fn list_rides(state: &AppState, status: Option<RideStatus>) -> Vec<Ride> {
    state.rides.list(status)
}

fn emit_event(state: &AppState, ride: &Ride) {
    let _ = state.ride_events_tx.send(RideEvent {
        ride_id: ride.id,
        status: ride.status,
        driver_id: ride.driver_id,
        occurred_at: Utc::now(),
    });
}
