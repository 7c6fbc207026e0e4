use std::sync::Arc;

use slotkeeper_core::chrono::{Duration, Utc};
use slotkeeper_core::domain::appointment::{Appointment, NewAppointment, SLOT_FORMAT};
use slotkeeper_core::domain::criterion::{Criterion, UpdateField};
use slotkeeper_core::domain::deletion::{DeletionPlan, DeletionPlanId, PlanCommitOutcome};
use slotkeeper_db::{AppointmentRepository, RepositoryError};

const SLOT_ALREADY_BOOKED: &str = "Error: This time slot is already booked.";
const NO_CONFIRMED_APPOINTMENTS: &str =
    "There are currently no confirmed appointments in the system.";

/// Turns validated requests into store calls and every outcome into a
/// sentence the conversational layer can relay verbatim.
///
/// No operation returns an error value: validation failures, slot conflicts
/// and storage faults all come back as `Error: ...` text.
pub struct AppointmentGateway<R: ?Sized = dyn AppointmentRepository> {
    repository: Arc<R>,
    plan_ttl: Duration,
}

impl<R> AppointmentGateway<R>
where
    R: AppointmentRepository + ?Sized,
{
    pub fn new(repository: Arc<R>, plan_ttl: Duration) -> Self {
        Self { repository, plan_ttl }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub async fn schedule_appointment(
        &self,
        customer_name: &str,
        customer_phone: &str,
        appointment_datetime: &str,
        service_type: &str,
    ) -> String {
        let appointment = match NewAppointment::from_input(
            customer_name,
            customer_phone,
            appointment_datetime,
            service_type,
        ) {
            Ok(appointment) => appointment,
            Err(error) => return error.user_message(),
        };
        let name = appointment.customer_name.clone();
        let slot = appointment.slot.to_string();

        match self.repository.create(appointment).await {
            Ok(id) => {
                tracing::info!(
                    event_name = "appointment.scheduled",
                    appointment_id = id.0,
                    slot = %slot,
                    "appointment scheduled"
                );
                format!("Success! Appointment for {name} is scheduled. The appointment ID is {id}.")
            }
            Err(RepositoryError::SlotTaken) => {
                tracing::info!(
                    event_name = "appointment.slot_conflict",
                    slot = %slot,
                    "requested slot already booked"
                );
                SLOT_ALREADY_BOOKED.to_string()
            }
            Err(error) => store_unavailable("schedule_appointment", &error),
        }
    }

    pub async fn search_appointments(&self, criteria: &str, value: &str) -> String {
        let value = value.trim();
        let no_results = || format!("No confirmed appointments found for {criteria} = {value}.");

        let Some(criterion) = Criterion::parse(criteria).filter(Criterion::is_searchable) else {
            tracing::debug!(
                event_name = "appointment.search.unsupported_criterion",
                criteria,
                "search criterion not recognised"
            );
            return no_results();
        };

        match self.repository.search(criterion, value).await {
            Ok(found) if found.is_empty() => no_results(),
            Ok(found) => format!("Found the following appointments:\n{}", render_lines(&found)),
            Err(error) => store_unavailable("search_for_appointments", &error),
        }
    }

    pub async fn list_all_appointments(&self) -> String {
        match self.repository.list_confirmed().await {
            Ok(found) if found.is_empty() => NO_CONFIRMED_APPOINTMENTS.to_string(),
            Ok(found) => {
                format!("Here are all the confirmed appointments:\n{}", render_lines(&found))
            }
            Err(error) => store_unavailable("list_all_appointments", &error),
        }
    }

    /// Deletes immediately. Confirmation, when wanted, is the caller's job
    /// or goes through [`Self::preview_appointment_deletion`].
    pub async fn delete_appointment_records(&self, criteria: &str, value: &str) -> String {
        let value = value.trim();
        let Some(criterion) = Criterion::parse(criteria) else {
            return nothing_to_delete(criteria, value);
        };

        match self.repository.delete(criterion, value).await {
            Ok(0) => nothing_to_delete(criteria, value),
            Ok(count) => {
                tracing::info!(
                    event_name = "appointment.deleted",
                    criteria,
                    count,
                    "appointments deleted"
                );
                format!("Successfully deleted {count} appointment(s).")
            }
            Err(error) => store_unavailable("delete_appointment_records", &error),
        }
    }

    pub async fn update_appointment_record(
        &self,
        identifier_value: &str,
        field_to_update: &str,
        new_value: &str,
    ) -> String {
        // Names are stored trimmed, so the identifier is matched the same way.
        let identifier_value = identifier_value.trim();
        let not_found = || {
            format!(
                "Error: Could not find or update an appointment for customer '{identifier_value}'."
            )
        };

        let Some(field) = UpdateField::parse(field_to_update) else {
            return not_found();
        };
        let value = match field.normalise(new_value) {
            Ok(value) => value,
            Err(error) => return error.user_message(),
        };

        match self.repository.update(identifier_value, field, &value).await {
            Ok(0) => not_found(),
            Ok(count) => {
                tracing::info!(
                    event_name = "appointment.updated",
                    field = field.as_str(),
                    count,
                    "appointments updated"
                );
                format!("Successfully updated {count} appointment(s) for {identifier_value}.")
            }
            Err(RepositoryError::SlotTaken) => SLOT_ALREADY_BOOKED.to_string(),
            Err(error) => store_unavailable("update_appointment_record", &error),
        }
    }

    /// Records which rows a delete would remove without touching them.
    pub async fn preview_appointment_deletion(&self, criteria: &str, value: &str) -> String {
        let value = value.trim();
        let Some(criterion) = Criterion::parse(criteria) else {
            let supported =
                Criterion::ALL.iter().map(Criterion::as_str).collect::<Vec<_>>().join(", ");
            return format!(
                "Error: '{criteria}' is not a supported criterion. Use one of: {supported}."
            );
        };

        let matching = match self.repository.find_matching(criterion, value).await {
            Ok(matching) => matching,
            Err(error) => return store_unavailable("preview_appointment_deletion", &error),
        };
        if matching.is_empty() {
            return nothing_to_delete(criteria, value);
        }

        let plan = DeletionPlan::new(criterion, value, &matching, Utc::now(), self.plan_ttl);
        let plan_id = plan.id.0.clone();
        let expires_at = plan.expires_at.format(SLOT_FORMAT).to_string();

        if let Err(error) = self.repository.save_deletion_plan(plan).await {
            return store_unavailable("preview_appointment_deletion", &error);
        }
        tracing::info!(
            event_name = "appointment.deletion.previewed",
            plan_id = %plan_id,
            affected = matching.len(),
            "deletion plan recorded"
        );

        format!(
            "The following {} appointment(s) would be deleted:\n{}\n\
             Nothing has been deleted yet. To proceed, confirm deletion plan {plan_id} \
             before {expires_at} UTC.",
            matching.len(),
            render_lines(&matching)
        )
    }

    pub async fn confirm_appointment_deletion(&self, plan_id: &str) -> String {
        let plan_id = DeletionPlanId(plan_id.trim().to_string());

        let outcome = match self.repository.commit_deletion_plan(&plan_id, Utc::now()).await {
            Ok(outcome) => outcome,
            Err(error) => return store_unavailable("confirm_appointment_deletion", &error),
        };
        tracing::info!(
            event_name = "appointment.deletion.confirmed",
            plan_id = %plan_id.0,
            outcome = ?outcome,
            "deletion plan resolved"
        );

        let id = &plan_id.0;
        match outcome {
            PlanCommitOutcome::Deleted { count } => {
                format!("Successfully deleted {count} appointment(s).")
            }
            PlanCommitOutcome::UnknownPlan => format!(
                "Error: No pending deletion plan with id '{id}'. Preview the deletion first."
            ),
            PlanCommitOutcome::AlreadyCommitted => {
                format!("Error: Deletion plan '{id}' has already been carried out.")
            }
            PlanCommitOutcome::Expired => {
                format!("Error: Deletion plan '{id}' has expired. Preview the deletion again.")
            }
            PlanCommitOutcome::Drifted { expected, found } => format!(
                "Error: The matching appointments changed since the preview (expected {}, now {}). \
                 Nothing was deleted. Preview the deletion again.",
                expected.len(),
                found.len()
            ),
        }
    }
}

fn render_lines(appointments: &[Appointment]) -> String {
    appointments
        .iter()
        .map(|appointment| {
            format!(
                "- ID: {}, Name: {}, DateTime: {}, Service: {}",
                appointment.id,
                appointment.customer_name,
                appointment.appointment_datetime,
                appointment.service_type
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn nothing_to_delete(criteria: &str, value: &str) -> String {
    format!("No appointments found to delete for {criteria} = {value}.")
}

fn store_unavailable(operation: &'static str, error: &RepositoryError) -> String {
    tracing::error!(
        event_name = "appointment.store.failed",
        operation,
        error = %error,
        "appointment store call failed"
    );
    format!("Error: The appointment store is unavailable ({error}).")
}
