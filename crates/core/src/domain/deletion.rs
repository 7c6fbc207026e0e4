use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::appointment::{Appointment, AppointmentId};
use crate::domain::criterion::Criterion;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeletionPlanId(pub String);

impl DeletionPlanId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A previewed bulk delete awaiting explicit confirmation.
///
/// The plan pins the exact set of rows the caller was shown. Committing it
/// deletes those rows only if the criterion still selects exactly that set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionPlan {
    pub id: DeletionPlanId,
    pub criterion: Criterion,
    pub value: String,
    pub affected: Vec<AppointmentId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DeletionPlan {
    pub fn new(
        criterion: Criterion,
        value: impl Into<String>,
        matching: &[Appointment],
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let mut affected = matching.iter().map(|appointment| appointment.id).collect::<Vec<_>>();
        affected.sort();
        affected.dedup();

        Self {
            id: DeletionPlanId::generate(),
            criterion,
            value: value.into(),
            affected,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanCommitOutcome {
    Deleted { count: u64 },
    UnknownPlan,
    AlreadyCommitted,
    Expired,
    /// The criterion no longer selects the previewed rows; nothing was deleted.
    Drifted { expected: Vec<AppointmentId>, found: Vec<AppointmentId> },
}
