use serde_json::Value;
use slotkeeper_core::domain::criterion::Criterion;

use crate::tools::{
    DELETE_APPOINTMENT_RECORDS, LIST_ALL_APPOINTMENTS, PREVIEW_APPOINTMENT_DELETION,
    SEARCH_FOR_APPOINTMENTS,
};

/// What a tool call would do, as far as policy is concerned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent {
    ReadOnly,
    Mutation,
    /// Immediate delete. `criterion` is `None` when the caller named an
    /// unknown criterion; such a call matches nothing and is let through.
    DirectDelete { criterion: Option<Criterion> },
}

impl GuardrailIntent {
    pub fn classify(tool_name: &str, arguments: &Value) -> Self {
        match tool_name {
            DELETE_APPOINTMENT_RECORDS => {
                let criterion =
                    arguments.get("criteria").and_then(Value::as_str).and_then(Criterion::parse);
                Self::DirectDelete { criterion }
            }
            SEARCH_FOR_APPOINTMENTS | LIST_ALL_APPOINTMENTS | PREVIEW_APPOINTMENT_DELETION => {
                Self::ReadOnly
            }
            _ => Self::Mutation,
        }
    }

    pub fn action_key(&self) -> &'static str {
        match self {
            Self::ReadOnly => "appointment.read",
            Self::Mutation => "appointment.write",
            Self::DirectDelete { .. } => "appointment.delete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy {
    /// Bulk deletes must go through preview and confirmation.
    pub require_delete_preview: bool,
}

impl GuardrailPolicy {
    pub fn evaluate(&self, intent: &GuardrailIntent) -> GuardrailDecision {
        match intent {
            GuardrailIntent::DirectDelete { criterion: Some(criterion) }
                if self.require_delete_preview && criterion.is_bulk() =>
            {
                GuardrailDecision::Deny {
                    reason_code: "delete_preview_required",
                    user_message: format!(
                        "Deleting by {} can remove several appointments at once. \
                         Use {PREVIEW_APPOINTMENT_DELETION} first, show the user what would be \
                         removed, and confirm the returned plan once they agree.",
                        criterion.as_str()
                    ),
                    fallback_path: PREVIEW_APPOINTMENT_DELETION,
                }
            }
            GuardrailIntent::ReadOnly
            | GuardrailIntent::Mutation
            | GuardrailIntent::DirectDelete { .. } => GuardrailDecision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};

    #[test]
    fn default_policy_allows_direct_bulk_delete() {
        let policy = GuardrailPolicy::default();
        let intent = GuardrailIntent::classify(
            "delete_appointment_records",
            &json!({"criteria": "service_type", "value": "Haircut"}),
        );
        assert_eq!(policy.evaluate(&intent), GuardrailDecision::Allow);
    }

    #[test]
    fn preview_policy_denies_bulk_delete() {
        let policy = GuardrailPolicy { require_delete_preview: true };
        let decision = policy.evaluate(&GuardrailIntent::classify(
            "delete_appointment_records",
            &json!({"criteria": "date", "value": "2025-01-08"}),
        ));

        let (reason_code, user_message, fallback_path) = match decision {
            GuardrailDecision::Deny { reason_code, user_message, fallback_path } => {
                (reason_code, user_message, fallback_path)
            }
            GuardrailDecision::Allow => ("", String::new(), ""),
        };

        assert_eq!(reason_code, "delete_preview_required");
        assert!(user_message.starts_with("Deleting by date"));
        assert_eq!(fallback_path, "preview_appointment_deletion");
    }

    #[test]
    fn preview_policy_allows_id_and_unknown_criteria_and_reads() {
        let policy = GuardrailPolicy { require_delete_preview: true };

        let by_id = GuardrailIntent::classify(
            "delete_appointment_records",
            &json!({"criteria": "id", "value": "3"}),
        );
        assert_eq!(policy.evaluate(&by_id), GuardrailDecision::Allow);

        let search = GuardrailIntent::classify("search_for_appointments", &json!({}));
        assert_eq!(search, GuardrailIntent::ReadOnly);
        assert_eq!(policy.evaluate(&search), GuardrailDecision::Allow);

        let unknown = GuardrailIntent::classify(
            "delete_appointment_records",
            &json!({"criteria": "bogus", "value": "x"}),
        );
        assert_eq!(unknown, GuardrailIntent::DirectDelete { criterion: None });
        assert_eq!(policy.evaluate(&unknown), GuardrailDecision::Allow);

        let confirm = GuardrailIntent::classify("confirm_appointment_deletion", &json!({}));
        assert_eq!(confirm.action_key(), "appointment.write");
        assert_eq!(policy.evaluate(&confirm), GuardrailDecision::Allow);
    }
}
