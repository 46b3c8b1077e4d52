//! API route modules.

pub mod doubts;
pub mod lecture;
pub mod quiz;
pub mod reports;
pub mod session;

use crate::session::Classroom;

/// Shared state for every classroom route.
#[derive(Clone)]
pub struct ClassroomState {
    pub classroom: Classroom,
}
