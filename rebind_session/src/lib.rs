mod guard;
mod tracker;

pub use guard::{ApplyGuard, ApplyGuardHold};
pub use tracker::SessionTracker;
