//! Operation gateway for conversational appointment booking.
//!
//! An external conversational layer turns user messages into tool calls;
//! this crate executes them against the appointment store and answers with
//! plain sentences it can relay to the user.
//!
//! # Architecture
//!
//! 1. **Guardrails** (`guardrails`) - policy checks before anything runs
//! 2. **Tools** (`tools`) - named operations with declared parameters
//! 3. **Gateway** (`gateway`) - validation, store calls, response text
//!
//! `AgentRuntime` (see `runtime`) ties the three together.
//!
//! # Safety Principle
//!
//! The conversational layer only translates. Whether a slot is free, what a
//! criterion matches, and whether a deletion plan still holds are decided
//! here and in the store, never by the caller.

pub mod gateway;
pub mod guardrails;
pub mod runtime;
pub mod tools;

pub use gateway::AppointmentGateway;
pub use guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
pub use runtime::{AgentRuntime, ToolCall, ToolReply};
pub use tools::{Tool, ToolParameter, ToolRegistry};
