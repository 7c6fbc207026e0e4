use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use slotkeeper_cli::commands::{call, doctor, migrate, seed, tools};
use slotkeeper_core::config::{ConfigOverrides, LoadOptions};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_database(|url| {
        with_env(&[("SLOTKEEPER_DATABASE_URL", url)], || {
            let result = migrate::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        });
    });
}

#[test]
fn migrate_returns_config_failure_for_malformed_env() {
    with_env(&[("SLOTKEEPER_DATABASE_MAX_CONNECTIONS", "many")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_database(|url| {
        with_env(&[("SLOTKEEPER_DATABASE_URL", url)], || {
            let first = seed::run(LoadOptions::default());
            assert_eq!(first.exit_code, 0, "expected first seed invocation success");
            let first_payload = parse_payload(&first.output);
            let first_message = first_payload["message"].as_str().unwrap_or_default();
            assert!(first_message.starts_with("demo appointments loaded: 5 inserted, 0 already"));

            let second = seed::run(LoadOptions::default());
            assert_eq!(second.exit_code, 0, "expected second seed invocation success");
            let second_payload = parse_payload(&second.output);
            let second_message = second_payload["message"].as_str().unwrap_or_default();
            assert!(second_message.starts_with("demo appointments loaded: 0 inserted, 5 already"));
        });
    });
}

#[test]
fn bookings_persist_between_calls() {
    with_database(|url| {
        with_env(&[("SLOTKEEPER_DATABASE_URL", url)], || {
            let scheduled = call::run(
                LoadOptions::default(),
                "schedule_appointment",
                Some(
                    r#"{"customer_name":"Jane Doe","customer_phone":"555-876-5432",
                        "appointment_datetime":"2024-12-25 14:00:00",
                        "service_type":"Financial Consultation"}"#,
                ),
            );
            assert_eq!(scheduled.exit_code, 0);
            assert_eq!(
                parse_payload(&scheduled.output)["message"],
                "Success! Appointment for Jane Doe is scheduled. The appointment ID is 1."
            );

            let found = call::run(
                LoadOptions::default(),
                "search_for_appointments",
                Some(r#"{"criteria":"customer_name","value":"Jane Doe"}"#),
            );
            assert_eq!(
                parse_payload(&found.output)["message"],
                "Found the following appointments:\n\
                 - ID: 1, Name: Jane Doe, DateTime: 2024-12-25 14:00:00, Service: Financial Consultation"
            );
        });
    });
}

#[test]
fn call_rejects_arguments_that_are_not_json_objects() {
    with_env(&[], || {
        let result = call::run(LoadOptions::default(), "list_all_appointments", Some("[]"));
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "call");
        assert_eq!(payload["error_class"], "invalid_arguments");
    });
}

#[test]
fn deletion_plan_survives_between_invocations() {
    with_database(|url| {
        with_env(&[("SLOTKEEPER_DATABASE_URL", url)], || {
            assert_eq!(seed::run(LoadOptions::default()).exit_code, 0);

            let preview = call::run(
                LoadOptions::default(),
                "preview_appointment_deletion",
                Some(r#"{"criteria":"service_type","value":"Maintenance Check"}"#),
            );
            let preview_message = message_of(&preview.output);
            assert!(
                preview_message.starts_with("The following 2 appointment(s) would be deleted:"),
                "{preview_message}"
            );
            let plan_id = preview_message
                .split("confirm deletion plan ")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .unwrap_or_default()
                .to_string();

            let confirmed = call::run(
                LoadOptions::default(),
                "confirm_appointment_deletion",
                Some(&format!(r#"{{"plan_id":"{plan_id}"}}"#)),
            );
            assert_eq!(
                parse_payload(&confirmed.output)["message"],
                "Successfully deleted 2 appointment(s)."
            );
        });
    });
}

#[test]
fn preview_requirement_blocks_direct_bulk_delete() {
    with_database(|url| {
        with_env(&[("SLOTKEEPER_DATABASE_URL", url)], || {
            assert_eq!(seed::run(LoadOptions::default()).exit_code, 0);

            let options = LoadOptions {
                overrides: ConfigOverrides {
                    require_delete_preview: Some(true),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            };
            let result = call::run(
                options,
                "delete_appointment_records",
                Some(r#"{"criteria":"customer_name","value":"John Doe"}"#),
            );
            let message = message_of(&result.output);
            assert!(message.contains("preview_appointment_deletion"), "{message}");

            let still_there = call::run(
                LoadOptions::default(),
                "search_for_appointments",
                Some(r#"{"criteria":"customer_name","value":"John Doe"}"#),
            );
            let listing = message_of(&still_there.output);
            assert_eq!(listing.lines().count(), 3, "{listing}");
        });
    });
}

#[test]
fn doctor_reports_pending_schema_until_migrated() {
    with_database(|url| {
        with_env(&[("SLOTKEEPER_DATABASE_URL", url)], || {
            let before: Value = serde_json::from_str(&doctor::run(LoadOptions::default(), true))
                .expect("doctor json");
            assert_eq!(before["overall_status"], "fail");
            let schema_check = before["checks"]
                .as_array()
                .and_then(|checks| checks.iter().find(|check| check["name"] == "schema_migrations"))
                .cloned()
                .unwrap_or(Value::Null);
            assert_eq!(schema_check["status"], "fail");

            assert_eq!(migrate::run(LoadOptions::default()).exit_code, 0);

            let after: Value = serde_json::from_str(&doctor::run(LoadOptions::default(), true))
                .expect("doctor json");
            assert_eq!(after["overall_status"], "pass", "{after}");
        });
    });
}

#[test]
fn tools_catalog_lists_seven_operations() {
    let result = tools::run();
    assert_eq!(result.exit_code, 0);

    let catalog: Value = serde_json::from_str(&result.output).expect("catalog json");
    let names = catalog
        .as_array()
        .map(|tools| tools.iter().filter_map(|tool| tool["name"].as_str()).collect::<Vec<_>>())
        .unwrap_or_default();
    assert_eq!(names.len(), 7);
    assert!(names.contains(&"confirm_appointment_deletion"));
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn message_of(output: &str) -> String {
    parse_payload(output)["message"].as_str().unwrap_or_default().to_string()
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("slotkeeper.db").display())
}

fn with_database(test_fn: impl FnOnce(&str)) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(dir.path());
    test_fn(&url);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SLOTKEEPER_DATABASE_URL",
        "SLOTKEEPER_DATABASE_MAX_CONNECTIONS",
        "SLOTKEEPER_DATABASE_TIMEOUT_SECS",
        "SLOTKEEPER_LOGGING_LEVEL",
        "SLOTKEEPER_LOGGING_FORMAT",
        "SLOTKEEPER_LOG_LEVEL",
        "SLOTKEEPER_LOG_FORMAT",
        "SLOTKEEPER_SAFETY_REQUIRE_DELETE_PREVIEW",
        "SLOTKEEPER_SAFETY_DELETION_PLAN_TTL_SECS",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
