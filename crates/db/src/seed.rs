use slotkeeper_core::domain::appointment::NewAppointment;
use slotkeeper_core::errors::DomainError;

use crate::repositories::{AppointmentRepository, RepositoryError};

/// Demo bookings matching the sample requests shown to new users.
const DEMO_APPOINTMENTS: &[(&str, &str, &str, &str)] = &[
    ("Jane Doe", "555-876-5432", "2024-12-25 14:00:00", "Financial Consultation"),
    ("John Doe", "555-123-4567", "2024-12-26 09:30:00", "Dental Checkup"),
    ("John Doe", "555-123-4567", "2025-01-08 11:00:00", "Haircut"),
    ("Priya Natarajan", "555-222-3344", "2025-01-08 15:00:00", "Maintenance Check"),
    ("Marco Rossi", "555-987-1122", "2025-01-09 10:00:00", "Maintenance Check"),
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    /// Slots already booked, usually by an earlier seed run.
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct DemoSeed;

impl DemoSeed {
    pub fn entries() -> &'static [(&'static str, &'static str, &'static str, &'static str)] {
        DEMO_APPOINTMENTS
    }

    /// Idempotent: re-running skips slots that are already taken.
    pub async fn load<R>(repository: &R) -> Result<SeedResult, SeedError>
    where
        R: AppointmentRepository + ?Sized,
    {
        let mut result = SeedResult::default();

        for (name, phone, datetime, service) in DEMO_APPOINTMENTS {
            let appointment = NewAppointment::from_input(name, phone, datetime, service)?;
            match repository.create(appointment).await {
                Ok(_) => result.inserted += 1,
                Err(RepositoryError::SlotTaken) => result.skipped += 1,
                Err(error) => return Err(error.into()),
            }
        }

        tracing::info!(
            event_name = "system.seed.completed",
            inserted = result.inserted,
            skipped = result.skipped,
            "demo appointments loaded"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::DemoSeed;
    use crate::repositories::{AppointmentRepository, InMemoryAppointmentRepository};

    #[tokio::test]
    async fn seed_is_idempotent() {
        let repo = InMemoryAppointmentRepository::default();

        let first = DemoSeed::load(&repo).await.expect("first seed");
        assert_eq!(first.inserted, DemoSeed::entries().len());
        assert_eq!(first.skipped, 0);

        let second = DemoSeed::load(&repo).await.expect("second seed");
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, DemoSeed::entries().len());

        assert_eq!(repo.list_confirmed().await.expect("list").len(), DemoSeed::entries().len());
    }
}
