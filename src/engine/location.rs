use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::queue::enqueue_movement;
use crate::error::AppError;
use crate::models::profile::GeoPoint;
use crate::models::ride::{Ride, RideStatus};
use crate::state::AppState;

/// Writes the ride's current coordinates, resolving a display address
/// best-effort. A ride that is underway gets a movement-simulation job
/// enqueued, once per update.
pub async fn update_ride_location(
    state: &AppState,
    ride_id: Uuid,
    lat: f64,
    lng: f64,
) -> Result<Ride, AppError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::Validation(format!(
            "latitude {lat} is out of range"
        )));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::Validation(format!(
            "longitude {lng} is out of range"
        )));
    }

    // Existence check up front so an unknown ride fails before any
    // network round-trip.
    state.rides.get(ride_id)?;

    let point = GeoPoint { lat, lng };
    let address = state.reverse_geocoder.reverse_geocode(point).await;
    if address.is_none() {
        debug!(ride_id = %ride_id, "no display address resolved; keeping previous");
    }

    let ride = state.rides.update_location(ride_id, point, address)?;

    if ride.status == RideStatus::Started {
        enqueue_movement(state, ride.id).await?;
    }

    info!(ride_id = %ride_id, lat, lng, "ride location updated");
    Ok(ride)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::geocode::{Geocoder, ReverseGeocoder};

    struct NoGeocode;

    #[async_trait]
    impl Geocoder for NoGeocode {
        async fn geocode(&self, _address: &str) -> Option<GeoPoint> {
            None
        }
    }

    /// Stands in for an unreachable Nominatim.
    struct UnreachableReverse;

    #[async_trait]
    impl ReverseGeocoder for UnreachableReverse {
        async fn reverse_geocode(&self, _point: GeoPoint) -> Option<String> {
            None
        }
    }

    fn setup() -> AppState {
        let (state, _movement_rx) =
            AppState::new(5.0, 16, 16, Arc::new(NoGeocode), Arc::new(UnreachableReverse));
        state
    }

    #[tokio::test]
    async fn update_succeeds_without_reverse_geocoder() {
        let state = setup();
        let ride = state
            .rides
            .create(Uuid::new_v4(), "123 Main St".to_string(), None);

        let updated = update_ride_location(&state, ride.id, 12.34567, 76.54321)
            .await
            .unwrap();

        let position = updated.position.unwrap();
        assert!((position.lat - 12.34567).abs() < 1e-9);
        assert!((position.lng - 76.54321).abs() < 1e-9);
        assert!(updated.position_address.is_none());
    }

    #[tokio::test]
    async fn unknown_ride_is_not_found() {
        let state = setup();
        let result = update_ride_location(&state, Uuid::new_v4(), 1.0, 1.0).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn out_of_range_latitude_is_rejected() {
        let state = setup();
        let ride = state
            .rides
            .create(Uuid::new_v4(), "123 Main St".to_string(), None);

        let result = update_ride_location(&state, ride.id, 91.0, 0.0).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn started_ride_enqueues_a_movement_job() {
        let (state, mut movement_rx) = AppState::new(
            5.0,
            16,
            16,
            Arc::new(NoGeocode),
            Arc::new(UnreachableReverse),
        );
        let ride = state
            .rides
            .create(Uuid::new_v4(), "123 Main St".to_string(), None);
        let driver_id = Uuid::new_v4();
        state
            .rides
            .try_transition(
                ride.id,
                RideStatus::Requested,
                None,
                RideStatus::Accepted,
                Some(driver_id),
            )
            .unwrap();
        state
            .rides
            .try_transition(
                ride.id,
                RideStatus::Accepted,
                Some(driver_id),
                RideStatus::Started,
                Some(driver_id),
            )
            .unwrap();

        update_ride_location(&state, ride.id, 0.0, 0.0).await.unwrap();

        assert_eq!(movement_rx.try_recv().unwrap(), ride.id);
        assert!(movement_rx.try_recv().is_err());
    }
}
