//! Store-level contract checks run against both repository implementations.

use slotkeeper_core::domain::appointment::{AppointmentId, NewAppointment};
use slotkeeper_core::domain::criterion::{Criterion, UpdateField};
use slotkeeper_db::{
    connect_with_settings, migrations, AppointmentRepository, InMemoryAppointmentRepository,
    RepositoryError, SqlAppointmentRepository,
};

async fn sql_repository() -> SqlAppointmentRepository {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    SqlAppointmentRepository::new(pool)
}

fn booking(name: &str, phone: &str, datetime: &str, service: &str) -> NewAppointment {
    NewAppointment::from_input(name, phone, datetime, service).expect("valid booking")
}

async fn jane_doe_scenario(repo: &dyn AppointmentRepository) {
    let id = repo
        .create(booking("Jane Doe", "555-876-5432", "2024-12-25 14:00:00", "Financial Consultation"))
        .await
        .expect("schedule Jane");
    assert_eq!(id, AppointmentId(1));

    let clash = repo
        .create(booking("John Doe", "555-123-4567", "2024-12-25 14:00:00", "Haircut"))
        .await
        .expect_err("slot already booked");
    assert!(matches!(clash, RepositoryError::SlotTaken));

    let found = repo.search(Criterion::CustomerName, "Jane Doe").await.expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);

    let updated = repo
        .update("Jane Doe", UpdateField::CustomerPhone, "555-999-0000")
        .await
        .expect("update phone");
    assert_eq!(updated, 1);
    let found = repo.search(Criterion::CustomerName, "Jane Doe").await.expect("search again");
    assert_eq!(found[0].customer_phone, "555-999-0000");

    let deleted = repo.delete(Criterion::CustomerName, "Jane Doe").await.expect("delete");
    assert_eq!(deleted, 1);
    assert!(repo.search(Criterion::CustomerName, "Jane Doe").await.expect("final").is_empty());
}

#[tokio::test]
async fn jane_doe_scenario_against_sqlite() {
    let repo = sql_repository().await;
    jane_doe_scenario(&repo).await;
}

#[tokio::test]
async fn jane_doe_scenario_against_memory() {
    let repo = InMemoryAppointmentRepository::default();
    jane_doe_scenario(&repo).await;
}

#[tokio::test]
async fn spellings_of_one_instant_share_a_slot() {
    let repo = sql_repository().await;

    repo.create(booking("Jane Doe", "555-876-5432", "2024-12-25 14:00:00", "Haircut"))
        .await
        .expect("canonical");
    let error = repo
        .create(booking("John Doe", "555-123-4567", " 2024-12-25 14:00:00 ", "Haircut"))
        .await
        .expect_err("padded input names the same slot");
    assert!(matches!(error, RepositoryError::SlotTaken));
}
