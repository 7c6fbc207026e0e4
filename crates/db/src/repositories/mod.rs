use async_trait::async_trait;
use thiserror::Error;

use slotkeeper_core::chrono::{DateTime, Utc};
use slotkeeper_core::domain::appointment::{Appointment, AppointmentId, NewAppointment};
use slotkeeper_core::domain::criterion::{Criterion, UpdateField};
use slotkeeper_core::domain::deletion::{DeletionPlan, DeletionPlanId, PlanCommitOutcome};

pub mod appointment;
pub mod memory;

pub use appointment::SqlAppointmentRepository;
pub use memory::InMemoryAppointmentRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("appointment slot is already booked")]
    SlotTaken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable appointment storage.
///
/// Search and listing only see `CONFIRMED` rows. Update, delete and
/// deletion planning act on every row regardless of status. Each call is
/// its own transaction; nothing spans calls except a committed deletion plan.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Inserts with duration 60 and status `CONFIRMED`. Fails with
    /// [`RepositoryError::SlotTaken`] when any row already holds the slot.
    async fn create(&self, appointment: NewAppointment) -> Result<AppointmentId, RepositoryError>;

    async fn search(
        &self,
        criterion: Criterion,
        value: &str,
    ) -> Result<Vec<Appointment>, RepositoryError>;

    /// Confirmed appointments ordered by `appointment_datetime` ascending.
    async fn list_confirmed(&self) -> Result<Vec<Appointment>, RepositoryError>;

    /// Rewrites `field` on every row whose `customer_name` equals
    /// `customer_name` and returns the number of rows changed.
    async fn update(
        &self,
        customer_name: &str,
        field: UpdateField,
        new_value: &str,
    ) -> Result<u64, RepositoryError>;

    /// Physically removes every matching row. Irreversible.
    async fn delete(&self, criterion: Criterion, value: &str) -> Result<u64, RepositoryError>;

    /// Rows [`AppointmentRepository::delete`] would remove right now.
    async fn find_matching(
        &self,
        criterion: Criterion,
        value: &str,
    ) -> Result<Vec<Appointment>, RepositoryError>;

    async fn save_deletion_plan(&self, plan: DeletionPlan) -> Result<(), RepositoryError>;

    /// Executes a saved plan atomically: the plan is consumed and its rows
    /// deleted only if the criterion still selects exactly the previewed ids.
    async fn commit_deletion_plan(
        &self,
        plan_id: &DeletionPlanId,
        now: DateTime<Utc>,
    ) -> Result<PlanCommitOutcome, RepositoryError>;
}

/// Value bound for a criterion. `None` means the value cannot match any row,
/// e.g. a non-numeric id.
pub(crate) enum CriterionValue<'a> {
    Text(&'a str),
    Id(i64),
}

impl<'a> CriterionValue<'a> {
    pub(crate) fn for_criterion(criterion: Criterion, value: &'a str) -> Option<Self> {
        match criterion {
            Criterion::Id => value.trim().parse::<i64>().ok().map(Self::Id),
            Criterion::CustomerName | Criterion::ServiceType | Criterion::Date => {
                Some(Self::Text(value))
            }
        }
    }
}
