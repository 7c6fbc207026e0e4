use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::gateway::AppointmentGateway;

pub const SCHEDULE_APPOINTMENT: &str = "schedule_appointment";
pub const SEARCH_FOR_APPOINTMENTS: &str = "search_for_appointments";
pub const LIST_ALL_APPOINTMENTS: &str = "list_all_appointments";
pub const DELETE_APPOINTMENT_RECORDS: &str = "delete_appointment_records";
pub const UPDATE_APPOINTMENT_RECORD: &str = "update_appointment_record";
pub const PREVIEW_APPOINTMENT_DELETION: &str = "preview_appointment_deletion";
pub const CONFIRM_APPOINTMENT_DELETION: &str = "confirm_appointment_deletion";

/// One declared argument of a tool, rendered into its JSON Schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl ToolParameter {
    const fn string(name: &'static str, description: &'static str) -> Self {
        Self { name, kind: "string", description, required: true }
    }
}

/// An operation the conversational layer may invoke by name.
///
/// `execute` only fails on arguments that do not match the declared
/// parameters. Every domain outcome, failures included, is returned as text.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> &'static [ToolParameter];
    async fn execute(&self, input: Value) -> Result<String>;

    fn schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for parameter in self.parameters() {
            properties.insert(
                parameter.name.to_string(),
                json!({ "type": parameter.kind, "description": parameter.description }),
            );
            if parameter.required {
                required.push(parameter.name);
            }
        }

        json!({
            "name": self.name(),
            "description": self.description(),
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            },
        })
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry holding every appointment operation, all sharing one gateway.
    pub fn for_gateway(gateway: Arc<AppointmentGateway>) -> Self {
        let mut registry = Self::default();
        registry.register(ScheduleAppointmentTool { gateway: gateway.clone() });
        registry.register(SearchForAppointmentsTool { gateway: gateway.clone() });
        registry.register(ListAllAppointmentsTool { gateway: gateway.clone() });
        registry.register(DeleteAppointmentRecordsTool { gateway: gateway.clone() });
        registry.register(UpdateAppointmentRecordTool { gateway: gateway.clone() });
        registry.register(PreviewAppointmentDeletionTool { gateway: gateway.clone() });
        registry.register(ConfirmAppointmentDeletionTool { gateway });
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    /// Sorted so catalog output is stable.
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.tools.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn schemas(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(name))
            .map(|tool| tool.schema())
            .collect()
    }

    pub async fn dispatch(&self, name: &str, input: Value) -> String {
        let Some(tool) = self.get(name) else {
            return format!(
                "Error: Unknown operation '{name}'. Available operations: {}.",
                self.names().join(", ")
            );
        };

        match tool.execute(input).await {
            Ok(reply) => reply,
            Err(error) => format!("Error: Invalid arguments for {name}: {error:#}."),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Missing or `null` input counts as an empty object so argument-free
/// tools can be called bare.
fn parse_input<T: DeserializeOwned>(tool: &'static str, input: Value) -> Result<T> {
    let input = if input.is_null() { Value::Object(Map::new()) } else { input };
    serde_json::from_value(input).with_context(|| format!("arguments do not match {tool}"))
}

#[derive(Debug, Deserialize)]
struct ScheduleInput {
    customer_name: String,
    customer_phone: String,
    appointment_datetime: String,
    service_type: String,
}

#[derive(Debug, Deserialize)]
struct CriteriaInput {
    criteria: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct UpdateInput {
    identifier_value: String,
    field_to_update: String,
    new_value: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmInput {
    plan_id: String,
}

#[derive(Debug, Deserialize)]
struct NoInput {}

const CRITERIA_PARAMETERS: &[ToolParameter] = &[
    ToolParameter::string(
        "criteria",
        "One of customer_name, service_type, date (YYYY-MM-DD) or id.",
    ),
    ToolParameter::string("value", "Value the criterion must equal."),
];

const SEARCH_PARAMETERS: &[ToolParameter] = &[
    ToolParameter::string("criteria", "One of customer_name, service_type or date (YYYY-MM-DD)."),
    ToolParameter::string("value", "Value the criterion must equal."),
];

pub struct ScheduleAppointmentTool {
    gateway: Arc<AppointmentGateway>,
}

#[async_trait]
impl Tool for ScheduleAppointmentTool {
    fn name(&self) -> &'static str {
        SCHEDULE_APPOINTMENT
    }

    fn description(&self) -> &'static str {
        "Book a new appointment in a free time slot."
    }

    fn parameters(&self) -> &'static [ToolParameter] {
        const PARAMETERS: &[ToolParameter] = &[
            ToolParameter::string("customer_name", "Full name of the customer."),
            ToolParameter::string("customer_phone", "Contact phone number."),
            ToolParameter::string(
                "appointment_datetime",
                "Start of the appointment, formatted YYYY-MM-DD HH:MM:SS.",
            ),
            ToolParameter::string("service_type", "Service being booked."),
        ];
        PARAMETERS
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let input: ScheduleInput = parse_input(SCHEDULE_APPOINTMENT, input)?;
        Ok(self
            .gateway
            .schedule_appointment(
                &input.customer_name,
                &input.customer_phone,
                &input.appointment_datetime,
                &input.service_type,
            )
            .await)
    }
}

pub struct SearchForAppointmentsTool {
    gateway: Arc<AppointmentGateway>,
}

#[async_trait]
impl Tool for SearchForAppointmentsTool {
    fn name(&self) -> &'static str {
        SEARCH_FOR_APPOINTMENTS
    }

    fn description(&self) -> &'static str {
        "Find confirmed appointments by customer_name, service_type or date."
    }

    fn parameters(&self) -> &'static [ToolParameter] {
        SEARCH_PARAMETERS
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let input: CriteriaInput = parse_input(SEARCH_FOR_APPOINTMENTS, input)?;
        Ok(self.gateway.search_appointments(&input.criteria, &input.value).await)
    }
}

pub struct ListAllAppointmentsTool {
    gateway: Arc<AppointmentGateway>,
}

#[async_trait]
impl Tool for ListAllAppointmentsTool {
    fn name(&self) -> &'static str {
        LIST_ALL_APPOINTMENTS
    }

    fn description(&self) -> &'static str {
        "List every confirmed appointment in chronological order."
    }

    fn parameters(&self) -> &'static [ToolParameter] {
        &[]
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let _: NoInput = parse_input(LIST_ALL_APPOINTMENTS, input)?;
        Ok(self.gateway.list_all_appointments().await)
    }
}

pub struct DeleteAppointmentRecordsTool {
    gateway: Arc<AppointmentGateway>,
}

#[async_trait]
impl Tool for DeleteAppointmentRecordsTool {
    fn name(&self) -> &'static str {
        DELETE_APPOINTMENT_RECORDS
    }

    fn description(&self) -> &'static str {
        "Permanently delete every appointment matching the criterion. Only call after the \
         user has explicitly confirmed; prefer preview_appointment_deletion for anything \
         other than a single id."
    }

    fn parameters(&self) -> &'static [ToolParameter] {
        CRITERIA_PARAMETERS
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let input: CriteriaInput = parse_input(DELETE_APPOINTMENT_RECORDS, input)?;
        Ok(self.gateway.delete_appointment_records(&input.criteria, &input.value).await)
    }
}

pub struct UpdateAppointmentRecordTool {
    gateway: Arc<AppointmentGateway>,
}

#[async_trait]
impl Tool for UpdateAppointmentRecordTool {
    fn name(&self) -> &'static str {
        UPDATE_APPOINTMENT_RECORD
    }

    fn description(&self) -> &'static str {
        "Change one field on every appointment booked under a customer name."
    }

    fn parameters(&self) -> &'static [ToolParameter] {
        const PARAMETERS: &[ToolParameter] = &[
            ToolParameter::string("identifier_value", "Customer name the appointments are under."),
            ToolParameter::string(
                "field_to_update",
                "One of customer_phone, appointment_datetime or service_type.",
            ),
            ToolParameter::string(
                "new_value",
                "Replacement value; datetimes use YYYY-MM-DD HH:MM:SS.",
            ),
        ];
        PARAMETERS
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let input: UpdateInput = parse_input(UPDATE_APPOINTMENT_RECORD, input)?;
        Ok(self
            .gateway
            .update_appointment_record(
                &input.identifier_value,
                &input.field_to_update,
                &input.new_value,
            )
            .await)
    }
}

pub struct PreviewAppointmentDeletionTool {
    gateway: Arc<AppointmentGateway>,
}

#[async_trait]
impl Tool for PreviewAppointmentDeletionTool {
    fn name(&self) -> &'static str {
        PREVIEW_APPOINTMENT_DELETION
    }

    fn description(&self) -> &'static str {
        "Show which appointments a delete would remove and return a plan id to confirm. \
         Deletes nothing."
    }

    fn parameters(&self) -> &'static [ToolParameter] {
        CRITERIA_PARAMETERS
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let input: CriteriaInput = parse_input(PREVIEW_APPOINTMENT_DELETION, input)?;
        Ok(self.gateway.preview_appointment_deletion(&input.criteria, &input.value).await)
    }
}

pub struct ConfirmAppointmentDeletionTool {
    gateway: Arc<AppointmentGateway>,
}

#[async_trait]
impl Tool for ConfirmAppointmentDeletionTool {
    fn name(&self) -> &'static str {
        CONFIRM_APPOINTMENT_DELETION
    }

    fn description(&self) -> &'static str {
        "Carry out a previewed deletion once the user has agreed to it."
    }

    fn parameters(&self) -> &'static [ToolParameter] {
        const PARAMETERS: &[ToolParameter] = &[ToolParameter::string(
            "plan_id",
            "Plan id returned by preview_appointment_deletion.",
        )];
        PARAMETERS
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let input: ConfirmInput = parse_input(CONFIRM_APPOINTMENT_DELETION, input)?;
        Ok(self.gateway.confirm_appointment_deletion(&input.plan_id).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use slotkeeper_core::chrono::Duration;
    use slotkeeper_db::{AppointmentRepository, InMemoryAppointmentRepository};

    use super::ToolRegistry;
    use crate::gateway::AppointmentGateway;

    fn registry() -> ToolRegistry {
        let repository: Arc<dyn AppointmentRepository> =
            Arc::new(InMemoryAppointmentRepository::default());
        ToolRegistry::for_gateway(Arc::new(AppointmentGateway::new(
            repository,
            Duration::minutes(5),
        )))
    }

    #[test]
    fn catalog_declares_every_operation() {
        let registry = registry();
        assert_eq!(registry.len(), 7);
        assert_eq!(
            registry.names(),
            vec![
                "confirm_appointment_deletion",
                "delete_appointment_records",
                "list_all_appointments",
                "preview_appointment_deletion",
                "schedule_appointment",
                "search_for_appointments",
                "update_appointment_record",
            ]
        );
    }

    #[test]
    fn schedule_schema_lists_required_arguments() {
        let registry = registry();
        let schema = registry.get("schedule_appointment").map(|tool| tool.schema());
        let schema = schema.unwrap_or(Value::Null);

        assert_eq!(schema["parameters"]["type"], "object");
        assert_eq!(
            schema["parameters"]["required"],
            json!(["customer_name", "customer_phone", "appointment_datetime", "service_type"])
        );
        assert_eq!(schema["parameters"]["properties"]["appointment_datetime"]["type"], "string");

        let list = registry.get("list_all_appointments").map(|tool| tool.schema());
        assert_eq!(list.unwrap_or(Value::Null)["parameters"]["required"], json!([]));
    }

    #[test]
    fn only_delete_tools_offer_the_id_criterion() {
        let registry = registry();
        let criteria_description = |tool: &str| {
            let schema = registry.get(tool).map(|tool| tool.schema()).unwrap_or(Value::Null);
            schema["parameters"]["properties"]["criteria"]["description"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        };

        let search = criteria_description("search_for_appointments");
        assert!(search.contains("customer_name"), "{search}");
        assert!(!search.split(|c: char| !c.is_alphanumeric()).any(|word| word == "id"), "{search}");

        for tool in ["delete_appointment_records", "preview_appointment_deletion"] {
            assert!(criteria_description(tool).ends_with("or id."), "{tool}");
        }
    }

    #[tokio::test]
    async fn dispatch_runs_operations_by_name() {
        let registry = registry();
        let reply = registry
            .dispatch(
                "schedule_appointment",
                json!({
                    "customer_name": "Jane Doe",
                    "customer_phone": "555-876-5432",
                    "appointment_datetime": "2024-12-25 14:00:00",
                    "service_type": "Financial Consultation",
                }),
            )
            .await;
        assert_eq!(reply, "Success! Appointment for Jane Doe is scheduled. The appointment ID is 1.");

        let listing = registry.dispatch("list_all_appointments", Value::Null).await;
        assert!(listing.starts_with("Here are all the confirmed appointments:"));
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_arguments_become_sentences() {
        let registry = registry();

        let unknown = registry.dispatch("cancel_appointment", json!({})).await;
        assert!(unknown.starts_with("Error: Unknown operation 'cancel_appointment'."), "{unknown}");

        let malformed =
            registry.dispatch("search_for_appointments", json!({"criteria": "date"})).await;
        assert!(
            malformed.starts_with("Error: Invalid arguments for search_for_appointments:"),
            "{malformed}"
        );
        assert!(malformed.contains("value"), "{malformed}");
    }
}
