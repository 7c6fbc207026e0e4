use slotkeeper_core::config::LoadOptions;
use slotkeeper_db::{DemoSeed, SeedResult, SqlAppointmentRepository};

use crate::commands::{build_runtime, load_config, open_store, CommandResult};

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_store(&config).await?;
        let repository = SqlAppointmentRepository::new(pool.clone());
        let seeded = DemoSeed::load(&repository)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8));
        pool.close().await;
        seeded
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_message(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_message(seeded: &SeedResult) -> String {
    let mut lines = vec![format!(
        "demo appointments loaded: {} inserted, {} already present",
        seeded.inserted, seeded.skipped
    )];
    for (name, _, datetime, service) in DemoSeed::entries() {
        lines.push(format!("  - {datetime}: {name} ({service})"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use slotkeeper_db::SeedResult;

    use super::seed_message;

    #[test]
    fn seed_message_lists_every_demo_booking() {
        let message = seed_message(&SeedResult { inserted: 5, skipped: 0 });
        assert!(message.starts_with("demo appointments loaded: 5 inserted, 0 already present"));
        assert!(message.contains("  - 2024-12-25 14:00:00: Jane Doe (Financial Consultation)"));
        assert_eq!(message.lines().count(), 6);
    }
}
