use serde::{Deserialize, Serialize};

use crate::domain::appointment::{required, Slot};
use crate::errors::DomainError;

/// Field used to select appointments for search and delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    CustomerName,
    ServiceType,
    /// Date portion of `appointment_datetime`, value formatted `YYYY-MM-DD`.
    Date,
    Id,
}

impl Criterion {
    pub const ALL: [Criterion; 4] =
        [Criterion::CustomerName, Criterion::ServiceType, Criterion::Date, Criterion::Id];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerName => "customer_name",
            Self::ServiceType => "service_type",
            Self::Date => "date",
            Self::Id => "id",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "customer_name" => Some(Self::CustomerName),
            "service_type" => Some(Self::ServiceType),
            "date" => Some(Self::Date),
            "id" => Some(Self::Id),
            _ => None,
        }
    }

    /// `id` is accepted for deletion only; searches by id find nothing.
    pub fn is_searchable(&self) -> bool {
        !matches!(self, Self::Id)
    }

    /// Criteria that can select more than one row.
    pub fn is_bulk(&self) -> bool {
        !matches!(self, Self::Id)
    }
}

/// Column an update may rewrite. Identity, status and audit columns are not
/// updatable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateField {
    CustomerPhone,
    AppointmentDatetime,
    ServiceType,
}

impl UpdateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerPhone => "customer_phone",
            Self::AppointmentDatetime => "appointment_datetime",
            Self::ServiceType => "service_type",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "customer_phone" => Some(Self::CustomerPhone),
            "appointment_datetime" => Some(Self::AppointmentDatetime),
            "service_type" => Some(Self::ServiceType),
            _ => None,
        }
    }

    /// Checks a replacement value the way a new booking checks the same
    /// field and returns the text to store.
    pub fn normalise(&self, raw: &str) -> Result<String, DomainError> {
        match self {
            Self::AppointmentDatetime => Slot::parse(raw).map(|slot| slot.to_string()),
            Self::CustomerPhone | Self::ServiceType => required(self.as_str(), raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Criterion, UpdateField};
    use crate::errors::DomainError;

    #[test]
    fn criterion_names_round_trip() {
        for criterion in Criterion::ALL {
            assert_eq!(Criterion::parse(criterion.as_str()), Some(criterion));
        }
    }

    #[test]
    fn unknown_names_do_not_parse() {
        assert_eq!(Criterion::parse("bogus"), None);
        assert_eq!(Criterion::parse("Customer_Name"), None);
        assert_eq!(UpdateField::parse("customer_name"), None);
        assert_eq!(UpdateField::parse("status"), None);
    }

    #[test]
    fn id_is_delete_only() {
        assert!(!Criterion::Id.is_searchable());
        assert!(!Criterion::Id.is_bulk());
        assert!(Criterion::Date.is_searchable());
        assert!(Criterion::ServiceType.is_bulk());
    }

    #[test]
    fn update_values_follow_booking_rules() {
        assert_eq!(
            UpdateField::CustomerPhone.normalise(" 555-000-1111 "),
            Ok("555-000-1111".to_string())
        );
        assert_eq!(
            UpdateField::ServiceType.normalise("   "),
            Err(DomainError::MissingField("service_type"))
        );
        assert_eq!(
            UpdateField::CustomerPhone.normalise(""),
            Err(DomainError::MissingField("customer_phone"))
        );
        assert_eq!(
            UpdateField::AppointmentDatetime.normalise("2025-01-09 09:00:00"),
            Ok("2025-01-09 09:00:00".to_string())
        );
        assert!(UpdateField::AppointmentDatetime.normalise("2025-01-0909:00:00").is_err());
    }
}
