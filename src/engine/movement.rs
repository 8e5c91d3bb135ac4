use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::profile::GeoPoint;
use crate::state::AppState;

const STEP_DEGREES: f64 = 0.0001;

/// Consumes scheduled movement jobs and nudges the ride's position a few
/// steps to mimic a vehicle underway. There is no cancellation path: a
/// dequeued job runs until its steps are exhausted or the store refuses
/// the write (terminal ride).
pub async fn run_movement_engine(
    state: Arc<AppState>,
    mut movement_rx: mpsc::Receiver<Uuid>,
    steps: u32,
    interval: Duration,
) {
    info!("movement engine started");

    while let Some(ride_id) = movement_rx.recv().await {
        state.metrics.movement_queue_depth.dec();
        simulate_ride_movement(&state, ride_id, steps, interval).await;
    }

    warn!("movement engine stopped: queue channel closed");
}

async fn simulate_ride_movement(state: &AppState, ride_id: Uuid, steps: u32, interval: Duration) {
    let ride = match state.rides.get(ride_id) {
        Ok(ride) => ride,
        Err(err) => {
            debug!(ride_id = %ride_id, error = %err, "skipping movement job");
            return;
        }
    };

    let Some(mut position) = ride.position else {
        debug!(ride_id = %ride_id, "ride has no position yet; skipping movement job");
        return;
    };

    for _ in 0..steps {
        position = GeoPoint {
            lat: position.lat + STEP_DEGREES,
            lng: position.lng + STEP_DEGREES,
        };

        if let Err(err) = state.rides.update_location(ride_id, position, None) {
            debug!(ride_id = %ride_id, error = %err, "stopping movement simulation");
            return;
        }

        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::geocode::{Geocoder, ReverseGeocoder};
    use crate::models::ride::RideStatus;

    struct NoGeocode;

    #[async_trait]
    impl Geocoder for NoGeocode {
        async fn geocode(&self, _address: &str) -> Option<GeoPoint> {
            None
        }
    }

    #[async_trait]
    impl ReverseGeocoder for NoGeocode {
        async fn reverse_geocode(&self, _point: GeoPoint) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn movement_advances_the_position_by_step_per_iteration() {
        let (state, _ignored_rx) =
            AppState::new(5.0, 16, 16, Arc::new(NoGeocode), Arc::new(NoGeocode));
        let state = Arc::new(state);
        let ride = state
            .rides
            .create(Uuid::new_v4(), "123 Main St".to_string(), None);
        state
            .rides
            .update_location(ride.id, GeoPoint { lat: 1.0, lng: 2.0 }, None)
            .unwrap();

        let (tx, rx) = mpsc::channel(4);
        let worker = tokio::spawn(run_movement_engine(
            state.clone(),
            rx,
            3,
            Duration::from_millis(1),
        ));

        tx.send(ride.id).await.unwrap();
        drop(tx);
        worker.await.unwrap();

        let moved = state.rides.get(ride.id).unwrap().position.unwrap();
        assert!((moved.lat - 1.0003).abs() < 1e-9);
        assert!((moved.lng - 2.0003).abs() < 1e-9);
    }

    #[tokio::test]
    async fn terminal_ride_stops_the_simulation_quietly() {
        let (state, _ignored_rx) =
            AppState::new(5.0, 16, 16, Arc::new(NoGeocode), Arc::new(NoGeocode));
        let state = Arc::new(state);
        let ride = state
            .rides
            .create(Uuid::new_v4(), "123 Main St".to_string(), None);
        state
            .rides
            .update_location(ride.id, GeoPoint { lat: 1.0, lng: 2.0 }, None)
            .unwrap();
        state
            .rides
            .try_transition(
                ride.id,
                RideStatus::Requested,
                None,
                RideStatus::Cancelled,
                None,
            )
            .unwrap();

        let (tx, rx) = mpsc::channel(4);
        let worker = tokio::spawn(run_movement_engine(
            state.clone(),
            rx,
            3,
            Duration::from_millis(1),
        ));

        tx.send(ride.id).await.unwrap();
        drop(tx);
        worker.await.unwrap();

        let unmoved = state.rides.get(ride.id);
        // Cancelled rides are still readable; position must be untouched.
        let unmoved = unmoved.unwrap().position.unwrap();
        assert!((unmoved.lat - 1.0).abs() < 1e-9);
        assert!((unmoved.lng - 2.0).abs() < 1e-9);
    }
}
