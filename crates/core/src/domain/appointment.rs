use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Wire format for appointment instants, e.g. `2024-12-25 14:00:00`.
pub const SLOT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Wire format for the `date` criterion, e.g. `2024-12-25`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub i64);

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A validated appointment instant.
///
/// Parsing is strict about the field order and separators of [`SLOT_FORMAT`];
/// the stored rendering is always zero padded so two spellings of the same
/// instant collide on the unique slot column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(NaiveDateTime);

impl Slot {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidDateTime { value: raw.to_string() };
        let trimmed = raw.trim();
        if !has_slot_shape(trimmed) {
            return Err(invalid());
        }
        NaiveDateTime::parse_from_str(trimmed, SLOT_FORMAT).map(Self).map_err(|_| invalid())
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for Slot {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(SLOT_FORMAT))
    }
}

/// chrono reads the space in [`SLOT_FORMAT`] as any run of whitespace, so the
/// exact `YYYY-MM-DD HH:MM:SS` layout is checked byte by byte first.
fn has_slot_shape(raw: &str) -> bool {
    const SHAPE: &[u8; 19] = b"0000-00-00 00:00:00";
    raw.len() == SHAPE.len()
        && raw.bytes().zip(SHAPE.iter()).all(|(byte, expected)| match expected {
            b'0' => byte.is_ascii_digit(),
            separator => byte == *separator,
        })
}

/// Date portion of a stored slot, mirroring SQLite's `date()` for the
/// formats this crate writes. Rows holding unparseable text have no date.
pub fn slot_date(stored: &str) -> Option<NaiveDate> {
    let prefix = stored.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAppointment {
    pub customer_name: String,
    pub customer_phone: String,
    pub slot: Slot,
    pub service_type: String,
}

impl NewAppointment {
    /// Builds a booking request from caller supplied text, rejecting blank
    /// fields and malformed datetimes before anything reaches storage.
    pub fn from_input(
        customer_name: &str,
        customer_phone: &str,
        appointment_datetime: &str,
        service_type: &str,
    ) -> Result<Self, DomainError> {
        let customer_name = required("customer_name", customer_name)?;
        let customer_phone = required("customer_phone", customer_phone)?;
        let service_type = required("service_type", service_type)?;
        let slot = Slot::parse(appointment_datetime)?;

        Ok(Self { customer_name, customer_phone, slot, service_type })
    }
}

pub(crate) fn required(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub customer_name: String,
    pub customer_phone: String,
    /// Stored text. Written through [`Slot`] by this crate, but kept as text
    /// because the column predates validation of every write path.
    pub appointment_datetime: String,
    pub service_type: String,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_confirmed(&self) -> bool {
        self.status == AppointmentStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::{slot_date, AppointmentStatus, NewAppointment, Slot};
    use crate::errors::DomainError;

    #[test]
    fn slot_accepts_the_documented_format() {
        let slot = Slot::parse("2024-12-25 14:00:00").expect("valid slot");
        assert_eq!(slot.to_string(), "2024-12-25 14:00:00");
        assert_eq!(slot.date().to_string(), "2024-12-25");

        let padded = Slot::parse("  2024-12-25 14:00:00 ").expect("surrounding space is trimmed");
        assert_eq!(padded, slot);
    }

    #[test]
    fn slot_rejects_other_layouts() {
        for raw in [
            "2024-12-25",
            "2024-12-25T14:00:00",
            "2024-12-2514:00:00",
            "2024-12-25    14:00:00",
            "2024-12-25  4:00:00",
            "2024-12-25\t14:00:00",
            "25/12/2024 14:00:00",
            "tomorrow",
            "",
        ] {
            let error = Slot::parse(raw).expect_err("should reject");
            assert_eq!(error, DomainError::InvalidDateTime { value: raw.to_string() });
        }
    }

    #[test]
    fn slot_rejects_impossible_calendar_values() {
        assert!(Slot::parse("2024-02-30 10:00:00").is_err());
        assert!(Slot::parse("2024-12-25 25:00:00").is_err());
    }

    #[test]
    fn slot_date_reads_date_prefix_only_when_valid() {
        assert_eq!(
            slot_date("2024-12-25 14:00:00").map(|date| date.to_string()),
            Some("2024-12-25".to_string())
        );
        assert_eq!(slot_date("next tuesday"), None);
        assert_eq!(slot_date("2024"), None);
    }

    #[test]
    fn new_appointment_rejects_blank_fields() {
        let error = NewAppointment::from_input("  ", "555-876-5432", "2024-12-25 14:00:00", "Haircut")
            .expect_err("blank name");
        assert_eq!(error, DomainError::MissingField("customer_name"));

        let error = NewAppointment::from_input("Jane Doe", "555-876-5432", "2024-12-25 14:00:00", "")
            .expect_err("blank service");
        assert_eq!(error, DomainError::MissingField("service_type"));
    }

    #[test]
    fn new_appointment_trims_text_fields() {
        let request =
            NewAppointment::from_input(" Jane Doe ", "555-876-5432", "2024-12-25 14:00:00", "Haircut")
                .expect("valid request");
        assert_eq!(request.customer_name, "Jane Doe");
    }

    #[test]
    fn status_round_trips_through_storage_text() {
        assert_eq!(AppointmentStatus::parse("CONFIRMED"), Some(AppointmentStatus::Confirmed));
        assert_eq!(AppointmentStatus::parse("cancelled"), Some(AppointmentStatus::Cancelled));
        assert_eq!(AppointmentStatus::parse("PENDING"), None);
        assert_eq!(AppointmentStatus::Confirmed.as_str(), "CONFIRMED");
    }
}
