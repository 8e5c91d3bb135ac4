use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::profile::{GeoPoint, Lifecycle};
use crate::models::ride::{Ride, RideStatus};

/// In-memory ride collection. All mutation goes through the entry's
/// exclusive guard, so a compare on (status, driver) followed by the write
/// is atomic per ride.
#[derive(Default)]
pub struct RideStore {
    rides: DashMap<Uuid, Ride>,
}

impl RideStore {
    pub fn new() -> Self {
        Self {
            rides: DashMap::new(),
        }
    }

    pub fn create(&self, rider_id: Uuid, pickup: String, dropoff: Option<String>) -> Ride {
        let now = Utc::now();
        let ride = Ride {
            id: Uuid::new_v4(),
            rider_id,
            driver_id: None,
            pickup_location: pickup,
            dropoff_location: dropoff,
            status: RideStatus::Requested,
            position: None,
            position_address: None,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        };

        self.rides.insert(ride.id, ride.clone());
        ride
    }

    pub fn get(&self, id: Uuid) -> Result<Ride, AppError> {
        self.rides
            .get(&id)
            .filter(|entry| entry.lifecycle == Lifecycle::Active)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("ride {id} not found")))
    }

    pub fn list(&self, status: Option<RideStatus>) -> Vec<Ride> {
        self.rides
            .iter()
            .filter(|entry| entry.lifecycle == Lifecycle::Active)
            .filter(|entry| status.is_none_or(|wanted| entry.status == wanted))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }

    /// Conditional update: succeeds only while the ride still matches the
    /// expected (status, driver) pair. A mismatch means another mutation
    /// won the race and the caller gets `Conflict`, never a silent
    /// overwrite.
    pub fn try_transition(
        &self,
        id: Uuid,
        expected_status: RideStatus,
        expected_driver: Option<Uuid>,
        next_status: RideStatus,
        next_driver: Option<Uuid>,
    ) -> Result<Ride, AppError> {
        let mut ride = self
            .rides
            .get_mut(&id)
            .filter(|entry| entry.lifecycle == Lifecycle::Active)
            .ok_or_else(|| AppError::NotFound(format!("ride {id} not found")))?;

        if ride.status != expected_status || ride.driver_id != expected_driver {
            return Err(AppError::Conflict(format!(
                "ride {id} was modified concurrently"
            )));
        }

        ride.status = next_status;
        ride.driver_id = next_driver;
        ride.updated_at = Utc::now();

        Ok(ride.clone())
    }

    /// `address: None` leaves the stored address unchanged so a failed
    /// reverse geocode never erases the last known one.
    pub fn update_location(
        &self,
        id: Uuid,
        point: GeoPoint,
        address: Option<String>,
    ) -> Result<Ride, AppError> {
        let mut ride = self
            .rides
            .get_mut(&id)
            .filter(|entry| entry.lifecycle == Lifecycle::Active)
            .ok_or_else(|| AppError::NotFound(format!("ride {id} not found")))?;

        if ride.status.is_terminal() {
            return Err(AppError::PreconditionFailed(format!(
                "ride {id} is {:?} and no longer accepts location updates",
                ride.status
            )));
        }

        ride.position = Some(point);
        if let Some(address) = address {
            ride.position_address = Some(address);
        }
        ride.updated_at = Utc::now();

        Ok(ride.clone())
    }

    pub fn archive(&self, id: Uuid) -> Result<Ride, AppError> {
        let mut ride = self
            .rides
            .get_mut(&id)
            .filter(|entry| entry.lifecycle == Lifecycle::Active)
            .ok_or_else(|| AppError::NotFound(format!("ride {id} not found")))?;

        ride.lifecycle = Lifecycle::Archived;
        ride.updated_at = Utc::now();

        Ok(ride.clone())
    }
}
