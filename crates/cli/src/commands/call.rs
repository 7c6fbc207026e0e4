use std::sync::Arc;

use serde_json::Value;
use slotkeeper_agent::AgentRuntime;
use slotkeeper_core::config::LoadOptions;
use slotkeeper_db::{AppointmentRepository, SqlAppointmentRepository};

use crate::commands::{build_runtime, load_config, open_store, CommandResult, StepFailure};

/// Runs a single tool call against the configured database. The gateway's
/// sentence is returned as the payload message, whether or not it reports
/// a domain error.
pub fn run(options: LoadOptions, tool: &str, arguments: Option<&str>) -> CommandResult {
    let arguments = match parse_arguments(arguments) {
        Ok(arguments) => arguments,
        Err(message) => return CommandResult::failure("call", "invalid_arguments", message, 6),
    };
    let config = match load_config("call", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("call") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_store(&config).await?;
        let repository: Arc<dyn AppointmentRepository> =
            Arc::new(SqlAppointmentRepository::new(pool.clone()));
        let agent = AgentRuntime::from_config(repository, &config);

        let reply = agent.handle_tool_call(tool, arguments).await;
        pool.close().await;
        Ok::<String, StepFailure>(reply)
    });

    match result {
        Ok(reply) => CommandResult::success("call", reply),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("call", error_class, message, exit_code)
        }
    }
}

fn parse_arguments(raw: Option<&str>) -> Result<Value, String> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Object(_) | Value::Null)) => Ok(value),
        Ok(_) => Err("--args must be a JSON object".to_string()),
        Err(error) => Err(format!("--args is not valid JSON: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::parse_arguments;

    #[test]
    fn arguments_must_be_a_json_object() {
        assert_eq!(parse_arguments(None), Ok(Value::Null));
        assert_eq!(
            parse_arguments(Some(r#"{"criteria":"date","value":"2025-01-08"}"#)),
            Ok(json!({"criteria": "date", "value": "2025-01-08"}))
        );
        assert_eq!(parse_arguments(Some("[1, 2]")), Err("--args must be a JSON object".to_string()));
        assert!(parse_arguments(Some("{oops")).is_err());
    }
}
