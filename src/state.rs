use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::geocode::{Geocoder, ReverseGeocoder};
use crate::models::event::RideEvent;
use crate::observability::metrics::Metrics;
use crate::store::profiles::ProfileRegistry;
use crate::store::rides::RideStore;

pub struct AppState {
    pub rides: RideStore,
    pub profiles: ProfileRegistry,
    pub geocoder: Arc<dyn Geocoder>,
    pub reverse_geocoder: Arc<dyn ReverseGeocoder>,
    pub search_radius_km: f64,
    pub movement_tx: mpsc::Sender<Uuid>,
    pub ride_events_tx: broadcast::Sender<RideEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        search_radius_km: f64,
        movement_queue_size: usize,
        event_buffer_size: usize,
        geocoder: Arc<dyn Geocoder>,
        reverse_geocoder: Arc<dyn ReverseGeocoder>,
    ) -> (Self, mpsc::Receiver<Uuid>) {
        let (movement_tx, movement_rx) = mpsc::channel(movement_queue_size);
        let (ride_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        (
            Self {
                rides: RideStore::new(),
                profiles: ProfileRegistry::new(),
                geocoder,
                reverse_geocoder,
                search_radius_km,
                movement_tx,
                ride_events_tx,
                metrics: Metrics::new(),
            },
            movement_rx,
        )
    }
}
