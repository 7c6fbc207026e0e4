use thiserror::Error;

/// Input rejected before it reaches storage.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid datetime `{value}`, expected YYYY-MM-DD HH:MM:SS")]
    InvalidDateTime { value: String },
    #[error("`{0}` must not be empty")]
    MissingField(&'static str),
}

impl DomainError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidDateTime { .. } => {
                "Error: Invalid datetime format. Please use 'YYYY-MM-DD HH:MM:SS'.".to_string()
            }
            Self::MissingField(field) => format!("Error: {field} must not be empty."),
        }
    }
}
