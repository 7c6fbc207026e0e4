use std::sync::Arc;

use anyhow::{Context, Result};
use slotkeeper_agent::{AgentRuntime, ToolCall, ToolReply};
use slotkeeper_core::config::LoadOptions;
use slotkeeper_db::{AppointmentRepository, SqlAppointmentRepository};
use tokio::io::{
    stdin, stdout, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

use crate::commands::{build_runtime, load_config, open_store, CommandResult};

/// Answers JSON-lines tool calls on stdin until EOF or ctrl-c.
///
/// Each request line is `{"tool": "...", "arguments": {...}}` and gets
/// exactly one `{"tool": "...", "output": "..."}` line back on stdout.
pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("serve", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("serve") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_store(&config).await?;
        let repository: Arc<dyn AppointmentRepository> =
            Arc::new(SqlAppointmentRepository::new(pool.clone()));
        let agent = AgentRuntime::from_config(repository, &config);

        tracing::info!(event_name = "system.serve.started", "serving tool calls on stdin");
        let served = tokio::select! {
            served = serve_lines(&agent, BufReader::new(stdin()), stdout()) => served
                .map(Some)
                .map_err(|error| ("serve_io", format!("{error:#}"), 6u8)),
            _ = tokio::signal::ctrl_c() => Ok(None),
        };

        pool.close().await;
        served
    });

    match result {
        Ok(Some(count)) => CommandResult::success("serve", format!("served {count} tool call(s)")),
        Ok(None) => CommandResult::success("serve", "interrupted"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("serve", error_class, message, exit_code)
        }
    }
}

/// Returns the number of lines answered. Blank lines are skipped.
pub async fn serve_lines<R, W>(agent: &AgentRuntime, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0;

    while let Some(line) = lines.next_line().await.context("failed to read request line")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ToolCall>(line) {
            Ok(call) => agent.handle(call).await,
            Err(error) => ToolReply {
                tool: String::new(),
                output: format!("Error: Could not parse tool call: {error}."),
            },
        };

        let mut encoded = serde_json::to_string(&reply).context("failed to encode reply")?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await.context("failed to write reply")?;
        writer.flush().await.context("failed to flush reply")?;
        served += 1;
    }

    Ok(served)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use slotkeeper_agent::{AgentRuntime, ToolReply};
    use slotkeeper_core::config::AppConfig;
    use slotkeeper_db::{AppointmentRepository, InMemoryAppointmentRepository};

    use super::serve_lines;

    #[tokio::test]
    async fn every_request_line_gets_one_reply_line() {
        let repository: Arc<dyn AppointmentRepository> =
            Arc::new(InMemoryAppointmentRepository::default());
        let agent = AgentRuntime::from_config(repository, &AppConfig::default());

        let input = concat!(
            r#"{"tool":"schedule_appointment","arguments":{"customer_name":"Jane Doe","customer_phone":"555-876-5432","appointment_datetime":"2024-12-25 14:00:00","service_type":"Financial Consultation"}}"#,
            "\n\n",
            "not json\n",
            r#"{"tool":"list_all_appointments"}"#,
            "\n",
        );
        let mut output = Vec::new();

        let served = serve_lines(&agent, input.as_bytes(), &mut output).await.expect("serve");
        assert_eq!(served, 3);

        let replies = String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str::<ToolReply>(line).expect("reply json"))
            .collect::<Vec<_>>();
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0].tool, "schedule_appointment");
        assert_eq!(
            replies[0].output,
            "Success! Appointment for Jane Doe is scheduled. The appointment ID is 1."
        );
        assert!(replies[1].output.starts_with("Error: Could not parse tool call"));
        assert!(replies[2].output.contains("Name: Jane Doe"));
    }
}
