use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use slotkeeper_core::chrono::{DateTime, Utc};
use slotkeeper_core::domain::appointment::{
    slot_date, Appointment, AppointmentId, AppointmentStatus, NewAppointment,
    DEFAULT_DURATION_MINUTES, DATE_FORMAT,
};
use slotkeeper_core::domain::criterion::{Criterion, UpdateField};
use slotkeeper_core::domain::deletion::{DeletionPlan, DeletionPlanId, PlanCommitOutcome};

use super::{AppointmentRepository, CriterionValue, RepositoryError};

#[derive(Default)]
struct State {
    rows: BTreeMap<i64, Appointment>,
    last_id: i64,
    plans: HashMap<String, StoredPlan>,
}

struct StoredPlan {
    plan: DeletionPlan,
    committed_at: Option<DateTime<Utc>>,
}

/// Process-local store with the same observable semantics as the SQLite
/// repository. A single write lock per call stands in for a transaction.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    state: RwLock<State>,
}

impl InMemoryAppointmentRepository {
    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.rows.is_empty()
    }
}

fn matches(appointment: &Appointment, criterion: Criterion, value: &CriterionValue<'_>) -> bool {
    match (criterion, value) {
        (Criterion::CustomerName, CriterionValue::Text(text)) => appointment.customer_name == *text,
        (Criterion::ServiceType, CriterionValue::Text(text)) => appointment.service_type == *text,
        (Criterion::Date, CriterionValue::Text(text)) => slot_date(&appointment.appointment_datetime)
            .map(|date| date.format(DATE_FORMAT).to_string() == *text)
            .unwrap_or(false),
        (Criterion::Id, CriterionValue::Id(id)) => appointment.id.0 == *id,
        _ => false,
    }
}

fn sorted_by_slot(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|left, right| {
        left.appointment_datetime
            .cmp(&right.appointment_datetime)
            .then_with(|| left.id.cmp(&right.id))
    });
    appointments
}

impl State {
    fn matching_ids(&self, criterion: Criterion, value: &str) -> Vec<AppointmentId> {
        let Some(bound) = CriterionValue::for_criterion(criterion, value) else {
            return Vec::new();
        };
        self.rows
            .values()
            .filter(|appointment| matches(appointment, criterion, &bound))
            .map(|appointment| appointment.id)
            .collect()
    }

    fn slot_holder(&self, slot: &str) -> Option<AppointmentId> {
        self.rows
            .values()
            .find(|appointment| appointment.appointment_datetime == slot)
            .map(|appointment| appointment.id)
    }
}

#[async_trait::async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn create(&self, appointment: NewAppointment) -> Result<AppointmentId, RepositoryError> {
        let mut state = self.state.write().await;
        let slot = appointment.slot.to_string();
        if state.slot_holder(&slot).is_some() {
            return Err(RepositoryError::SlotTaken);
        }

        state.last_id += 1;
        let id = AppointmentId(state.last_id);
        state.rows.insert(
            id.0,
            Appointment {
                id,
                customer_name: appointment.customer_name,
                customer_phone: appointment.customer_phone,
                appointment_datetime: slot,
                service_type: appointment.service_type,
                duration_minutes: DEFAULT_DURATION_MINUTES,
                status: AppointmentStatus::Confirmed,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn search(
        &self,
        criterion: Criterion,
        value: &str,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        if !criterion.is_searchable() {
            return Ok(Vec::new());
        }
        let Some(bound) = CriterionValue::for_criterion(criterion, value) else {
            return Ok(Vec::new());
        };

        let state = self.state.read().await;
        let found = state
            .rows
            .values()
            .filter(|appointment| appointment.is_confirmed())
            .filter(|appointment| matches(appointment, criterion, &bound))
            .cloned()
            .collect();
        Ok(sorted_by_slot(found))
    }

    async fn list_confirmed(&self) -> Result<Vec<Appointment>, RepositoryError> {
        let state = self.state.read().await;
        let confirmed =
            state.rows.values().filter(|appointment| appointment.is_confirmed()).cloned().collect();
        Ok(sorted_by_slot(confirmed))
    }

    async fn update(
        &self,
        customer_name: &str,
        field: UpdateField,
        new_value: &str,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state.write().await;
        let targets = state.matching_ids(Criterion::CustomerName, customer_name);
        if targets.is_empty() {
            return Ok(0);
        }

        if field == UpdateField::AppointmentDatetime {
            let held_elsewhere =
                state.slot_holder(new_value).is_some_and(|holder| !targets.contains(&holder));
            // One slot cannot be written onto several rows either.
            if held_elsewhere || targets.len() > 1 {
                return Err(RepositoryError::SlotTaken);
            }
        }

        for id in &targets {
            if let Some(appointment) = state.rows.get_mut(&id.0) {
                let column = match field {
                    UpdateField::CustomerPhone => &mut appointment.customer_phone,
                    UpdateField::AppointmentDatetime => &mut appointment.appointment_datetime,
                    UpdateField::ServiceType => &mut appointment.service_type,
                };
                *column = new_value.to_string();
            }
        }
        Ok(targets.len() as u64)
    }

    async fn delete(&self, criterion: Criterion, value: &str) -> Result<u64, RepositoryError> {
        let mut state = self.state.write().await;
        let targets = state.matching_ids(criterion, value);
        for id in &targets {
            state.rows.remove(&id.0);
        }
        Ok(targets.len() as u64)
    }

    async fn find_matching(
        &self,
        criterion: Criterion,
        value: &str,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let state = self.state.read().await;
        let found = state
            .matching_ids(criterion, value)
            .into_iter()
            .filter_map(|id| state.rows.get(&id.0).cloned())
            .collect();
        Ok(sorted_by_slot(found))
    }

    async fn save_deletion_plan(&self, plan: DeletionPlan) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.plans.insert(plan.id.0.clone(), StoredPlan { plan, committed_at: None });
        Ok(())
    }

    async fn commit_deletion_plan(
        &self,
        plan_id: &DeletionPlanId,
        now: DateTime<Utc>,
    ) -> Result<PlanCommitOutcome, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(stored) = state.plans.get(&plan_id.0) else {
            return Ok(PlanCommitOutcome::UnknownPlan);
        };
        if stored.committed_at.is_some() {
            return Ok(PlanCommitOutcome::AlreadyCommitted);
        }
        if stored.plan.is_expired(now) {
            return Ok(PlanCommitOutcome::Expired);
        }

        let criterion = stored.plan.criterion;
        let value = stored.plan.value.clone();
        let expected = stored.plan.affected.clone();

        let mut found = state.matching_ids(criterion, &value);
        found.sort();
        if found != expected {
            return Ok(PlanCommitOutcome::Drifted { expected, found });
        }

        for id in &found {
            state.rows.remove(&id.0);
        }
        if let Some(stored) = state.plans.get_mut(&plan_id.0) {
            stored.committed_at = Some(now);
        }
        Ok(PlanCommitOutcome::Deleted { count: found.len() as u64 })
    }
}
