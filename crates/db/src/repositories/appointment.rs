use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::Row;

use slotkeeper_core::chrono::{DateTime, NaiveDateTime, Utc};
use slotkeeper_core::domain::appointment::{
    Appointment, AppointmentId, AppointmentStatus, NewAppointment, DEFAULT_DURATION_MINUTES,
    SLOT_FORMAT,
};
use slotkeeper_core::domain::criterion::{Criterion, UpdateField};
use slotkeeper_core::domain::deletion::{DeletionPlan, DeletionPlanId, PlanCommitOutcome};

use super::{AppointmentRepository, CriterionValue, RepositoryError};
use crate::DbPool;

macro_rules! select_appointments {
    ($tail:literal) => {
        concat!(
            "SELECT id, customer_name, customer_phone, appointment_datetime, service_type,
                    duration_minutes, status, created_at
             FROM appointments ",
            $tail
        )
    };
}

pub struct SqlAppointmentRepository {
    pool: DbPool,
}

impl SqlAppointmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn search_sql(criterion: Criterion) -> Option<&'static str> {
    match criterion {
        Criterion::CustomerName => Some(select_appointments!(
            "WHERE customer_name = ? AND status = 'CONFIRMED' ORDER BY appointment_datetime ASC"
        )),
        Criterion::ServiceType => Some(select_appointments!(
            "WHERE service_type = ? AND status = 'CONFIRMED' ORDER BY appointment_datetime ASC"
        )),
        Criterion::Date => Some(select_appointments!(
            "WHERE date(appointment_datetime) = ? AND status = 'CONFIRMED'
             ORDER BY appointment_datetime ASC"
        )),
        Criterion::Id => None,
    }
}

fn matching_sql(criterion: Criterion) -> &'static str {
    match criterion {
        Criterion::CustomerName => {
            select_appointments!("WHERE customer_name = ? ORDER BY appointment_datetime ASC")
        }
        Criterion::ServiceType => {
            select_appointments!("WHERE service_type = ? ORDER BY appointment_datetime ASC")
        }
        Criterion::Date => select_appointments!(
            "WHERE date(appointment_datetime) = ? ORDER BY appointment_datetime ASC"
        ),
        Criterion::Id => select_appointments!("WHERE id = ?"),
    }
}

fn delete_sql(criterion: Criterion) -> &'static str {
    match criterion {
        Criterion::CustomerName => "DELETE FROM appointments WHERE customer_name = ? RETURNING id",
        Criterion::ServiceType => "DELETE FROM appointments WHERE service_type = ? RETURNING id",
        Criterion::Date => {
            "DELETE FROM appointments WHERE date(appointment_datetime) = ? RETURNING id"
        }
        Criterion::Id => "DELETE FROM appointments WHERE id = ? RETURNING id",
    }
}

fn update_sql(field: UpdateField) -> &'static str {
    match field {
        UpdateField::CustomerPhone => {
            "UPDATE appointments SET customer_phone = ? WHERE customer_name = ?"
        }
        UpdateField::AppointmentDatetime => {
            "UPDATE appointments SET appointment_datetime = ? WHERE customer_name = ?"
        }
        UpdateField::ServiceType => {
            "UPDATE appointments SET service_type = ? WHERE customer_name = ?"
        }
    }
}

fn bind_criterion<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: CriterionValue<'q>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        CriterionValue::Text(text) => query.bind(text),
        CriterionValue::Id(id) => query.bind(id),
    }
}

fn slot_conflict(error: sqlx::Error) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            RepositoryError::SlotTaken
        }
        _ => RepositoryError::Database(error),
    }
}

fn decode<E: std::fmt::Display>(error: E) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

/// `created_at` is RFC 3339 when written by this crate and
/// `YYYY-MM-DD HH:MM:SS` when filled by the column default.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, SLOT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| RepositoryError::Decode(format!("unrecognised timestamp `{raw}`")))
}

fn row_to_appointment(row: &SqliteRow) -> Result<Appointment, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode)?;
    let customer_name: String = row.try_get("customer_name").map_err(decode)?;
    let customer_phone: String = row.try_get("customer_phone").map_err(decode)?;
    let appointment_datetime: String = row.try_get("appointment_datetime").map_err(decode)?;
    let service_type: String = row.try_get("service_type").map_err(decode)?;
    let duration_minutes: i64 = row.try_get("duration_minutes").map_err(decode)?;
    let status_str: String = row.try_get("status").map_err(decode)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode)?;

    let status = AppointmentStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status_str}`")))?;

    Ok(Appointment {
        id: AppointmentId(id),
        customer_name,
        customer_phone,
        appointment_datetime,
        service_type,
        duration_minutes,
        status,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl AppointmentRepository for SqlAppointmentRepository {
    async fn create(&self, appointment: NewAppointment) -> Result<AppointmentId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO appointments (customer_name, customer_phone, appointment_datetime,
                                       service_type, duration_minutes, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&appointment.customer_name)
        .bind(&appointment.customer_phone)
        .bind(appointment.slot.to_string())
        .bind(&appointment.service_type)
        .bind(DEFAULT_DURATION_MINUTES)
        .bind(AppointmentStatus::Confirmed.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(slot_conflict)?;

        Ok(AppointmentId(result.last_insert_rowid()))
    }

    async fn search(
        &self,
        criterion: Criterion,
        value: &str,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let Some(sql) = search_sql(criterion) else {
            return Ok(Vec::new());
        };
        let Some(bound) = CriterionValue::for_criterion(criterion, value) else {
            return Ok(Vec::new());
        };

        let rows = bind_criterion(sqlx::query(sql), bound).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_appointment).collect()
    }

    async fn list_confirmed(&self) -> Result<Vec<Appointment>, RepositoryError> {
        let rows = sqlx::query(select_appointments!(
            "WHERE status = 'CONFIRMED' ORDER BY appointment_datetime ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_appointment).collect()
    }

    async fn update(
        &self,
        customer_name: &str,
        field: UpdateField,
        new_value: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(update_sql(field))
            .bind(new_value)
            .bind(customer_name)
            .execute(&self.pool)
            .await
            .map_err(slot_conflict)?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, criterion: Criterion, value: &str) -> Result<u64, RepositoryError> {
        let Some(bound) = CriterionValue::for_criterion(criterion, value) else {
            return Ok(0);
        };

        let deleted = bind_criterion(sqlx::query(delete_sql(criterion)), bound)
            .fetch_all(&self.pool)
            .await?;

        Ok(deleted.len() as u64)
    }

    async fn find_matching(
        &self,
        criterion: Criterion,
        value: &str,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let Some(bound) = CriterionValue::for_criterion(criterion, value) else {
            return Ok(Vec::new());
        };

        let rows =
            bind_criterion(sqlx::query(matching_sql(criterion)), bound).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_appointment).collect()
    }

    async fn save_deletion_plan(&self, plan: DeletionPlan) -> Result<(), RepositoryError> {
        let affected = plan.affected.iter().map(|id| id.0).collect::<Vec<_>>();
        let affected_json = serde_json::to_string(&affected).map_err(decode)?;

        sqlx::query(
            "INSERT INTO deletion_plans (id, criterion, criterion_value, affected_ids_json,
                                         created_at, expires_at, committed_at)
             VALUES (?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(&plan.id.0)
        .bind(plan.criterion.as_str())
        .bind(&plan.value)
        .bind(affected_json)
        .bind(plan.created_at.to_rfc3339())
        .bind(plan.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn commit_deletion_plan(
        &self,
        plan_id: &DeletionPlanId,
        now: DateTime<Utc>,
    ) -> Result<PlanCommitOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the write lock before reading.
        let claimed = sqlx::query(
            "UPDATE deletion_plans SET committed_at = ? WHERE id = ? AND committed_at IS NULL",
        )
        .bind(now.to_rfc3339())
        .bind(&plan_id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let row = sqlx::query(
            "SELECT criterion, criterion_value, affected_ids_json, expires_at
             FROM deletion_plans WHERE id = ?",
        )
        .bind(&plan_id.0)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(PlanCommitOutcome::UnknownPlan);
        };
        if claimed == 0 {
            return Ok(PlanCommitOutcome::AlreadyCommitted);
        }

        let expires_at: String = row.try_get("expires_at").map_err(decode)?;
        if now >= parse_timestamp(&expires_at)? {
            return Ok(PlanCommitOutcome::Expired);
        }

        let criterion_str: String = row.try_get("criterion").map_err(decode)?;
        let criterion = Criterion::parse(&criterion_str)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown criterion `{criterion_str}`")))?;
        let value: String = row.try_get("criterion_value").map_err(decode)?;
        let affected_json: String = row.try_get("affected_ids_json").map_err(decode)?;
        let expected = serde_json::from_str::<Vec<i64>>(&affected_json)
            .map_err(decode)?
            .into_iter()
            .map(AppointmentId)
            .collect::<Vec<_>>();

        let mut found = match CriterionValue::for_criterion(criterion, &value) {
            Some(bound) => bind_criterion(sqlx::query(delete_sql(criterion)), bound)
                .fetch_all(&mut *tx)
                .await?
                .iter()
                .map(|deleted| deleted.try_get::<i64, _>("id").map(AppointmentId).map_err(decode))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        found.sort();

        if found != expected {
            tx.rollback().await?;
            return Ok(PlanCommitOutcome::Drifted { expected, found });
        }

        tx.commit().await?;
        Ok(PlanCommitOutcome::Deleted { count: found.len() as u64 })
    }
}
