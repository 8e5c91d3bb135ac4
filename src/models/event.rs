use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ride::RideStatus;

/// Broadcast whenever a ride changes status or acquires a driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideEvent {
    pub ride_id: Uuid,
    pub status: RideStatus,
    pub driver_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}
