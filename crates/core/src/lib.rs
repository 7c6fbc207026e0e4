pub mod config;
pub mod domain;
pub mod errors;

pub use chrono;
pub use domain::appointment::{
    Appointment, AppointmentId, AppointmentStatus, NewAppointment, Slot, DEFAULT_DURATION_MINUTES,
    SLOT_FORMAT,
};
pub use domain::criterion::{Criterion, UpdateField};
pub use domain::deletion::{DeletionPlan, DeletionPlanId, PlanCommitOutcome};
pub use errors::DomainError;
