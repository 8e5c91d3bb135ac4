use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub async fn enqueue_movement(state: &AppState, ride_id: Uuid) -> Result<(), AppError> {
    state
        .movement_tx
        .send(ride_id)
        .await
        .map_err(|err| AppError::Internal(format!("movement queue send failed: {err}")))?;

    state.metrics.movement_queue_depth.inc();
    Ok(())
}
