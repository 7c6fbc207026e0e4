use std::sync::Arc;

use serde_json::Value;
use slotkeeper_agent::{AppointmentGateway, ToolRegistry};
use slotkeeper_core::chrono::Duration;
use slotkeeper_db::{AppointmentRepository, InMemoryAppointmentRepository};

use crate::commands::CommandResult;

/// Prints the tool catalog as JSON Schema. Needs no database: the registry
/// is only inspected, never dispatched.
pub fn run() -> CommandResult {
    let repository: Arc<dyn AppointmentRepository> =
        Arc::new(InMemoryAppointmentRepository::default());
    let registry =
        ToolRegistry::for_gateway(Arc::new(AppointmentGateway::new(repository, Duration::zero())));

    match serde_json::to_string_pretty(&Value::Array(registry.schemas())) {
        Ok(output) => CommandResult::raw(0, output),
        Err(error) => CommandResult::failure(
            "tools",
            "serialization",
            format!("failed to render tool catalog: {error}"),
            6,
        ),
    }
}
