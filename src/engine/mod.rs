pub mod dispatch;
pub mod location;
pub mod movement;
pub mod queue;
