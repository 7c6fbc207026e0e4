use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotkeeper_core::config::AppConfig;
use slotkeeper_db::AppointmentRepository;

use crate::gateway::AppointmentGateway;
use crate::guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
use crate::tools::ToolRegistry;

/// A tool invocation as produced by the conversational layer.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolReply {
    pub tool: String,
    pub output: String,
}

pub struct AgentRuntime {
    registry: ToolRegistry,
    guardrails: GuardrailPolicy,
}

impl AgentRuntime {
    pub fn new(registry: ToolRegistry, guardrails: GuardrailPolicy) -> Self {
        Self { registry, guardrails }
    }

    /// Wires the full tool catalog over `repository` using the safety
    /// settings from `config`.
    pub fn from_config(repository: Arc<dyn AppointmentRepository>, config: &AppConfig) -> Self {
        let gateway = Arc::new(AppointmentGateway::new(repository, config.deletion_plan_ttl()));
        Self::new(
            ToolRegistry::for_gateway(gateway),
            GuardrailPolicy { require_delete_preview: config.safety.require_delete_preview },
        )
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn guardrails(&self) -> &GuardrailPolicy {
        &self.guardrails
    }

    pub async fn handle_tool_call(&self, tool_name: &str, arguments: Value) -> String {
        let intent = GuardrailIntent::classify(tool_name, &arguments);

        match self.guardrails.evaluate(&intent) {
            GuardrailDecision::Allow => {}
            GuardrailDecision::Deny { reason_code, user_message, fallback_path } => {
                tracing::warn!(
                    event_name = "agent.tool_call.denied",
                    tool = tool_name,
                    action_key = intent.action_key(),
                    reason_code,
                    fallback_path,
                    "tool call blocked by guardrail"
                );
                return user_message;
            }
        }

        tracing::info!(
            event_name = "agent.tool_call.started",
            tool = tool_name,
            action_key = intent.action_key(),
            "dispatching tool call"
        );
        let output = self.registry.dispatch(tool_name, arguments).await;
        tracing::info!(
            event_name = "agent.tool_call.completed",
            tool = tool_name,
            is_error = output.starts_with("Error:"),
            "tool call completed"
        );
        output
    }

    pub async fn handle(&self, call: ToolCall) -> ToolReply {
        let output = self.handle_tool_call(&call.tool, call.arguments).await;
        ToolReply { tool: call.tool, output }
    }
}
