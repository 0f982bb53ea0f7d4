use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::location::Location;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AmbulanceType {
    Basic,
    Advanced,
    Air,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    OnTheWay,
    Arrived,
    InTransit,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::OnTheWay,
        BookingStatus::Arrived,
        BookingStatus::InTransit,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::OnTheWay => "on-the-way",
            BookingStatus::Arrived => "arrived",
            BookingStatus::InTransit => "in-transit",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Active and bound to a driver.
    pub fn is_in_service(&self) -> bool {
        matches!(
            self,
            BookingStatus::Accepted
                | BookingStatus::OnTheWay
                | BookingStatus::Arrived
                | BookingStatus::InTransit
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ambulance_id: String,
    pub hospital_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
    pub pickup_location: Location,
    pub hospital_location: Location,
    pub ambulance_type: AmbulanceType,
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_condition: String,
    pub status: BookingStatus,
    pub is_emergency: bool,
    pub booking_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_number: Option<String>,
}

impl Booking {
    /// Builds a fresh pending record from an already validated draft.
    pub fn from_draft(draft: BookingDraft, id: Uuid, booking_time: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            ambulance_id: draft.ambulance_id,
            hospital_id: draft.hospital_id,
            driver_id: None,
            pickup_location: draft.pickup_location,
            hospital_location: draft.hospital_location,
            ambulance_type: draft.ambulance_type,
            patient_name: draft.patient_name,
            patient_age: draft.patient_age,
            patient_condition: draft.patient_condition,
            status: BookingStatus::Pending,
            is_emergency: draft.is_emergency,
            booking_time,
            estimated_arrival: draft.estimated_arrival,
            driver_name: draft.driver_name,
            driver_phone: draft.driver_phone,
            vehicle_number: draft.vehicle_number,
        }
    }
}

/// Creation input. Identity, status and booking time are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub user_id: Uuid,
    pub ambulance_id: String,
    pub hospital_id: String,
    pub pickup_location: Location,
    pub hospital_location: Location,
    pub ambulance_type: AmbulanceType,
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_condition: String,
    #[serde(default)]
    pub is_emergency: bool,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_phone: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub estimated_arrival: Option<String>,
}

impl BookingDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("ambulanceId", &self.ambulance_id)?;
        require_text("hospitalId", &self.hospital_id)?;
        require_text("patientName", &self.patient_name)?;
        require_text("patientCondition", &self.patient_condition)?;

        if self.patient_age == 0 {
            return Err(AppError::Validation(
                "patientAge must be a positive integer".to_string(),
            ));
        }

        for (field, location) in [
            ("pickupLocation", &self.pickup_location),
            ("hospitalLocation", &self.hospital_location),
        ] {
            if !location.point().is_valid() {
                return Err(AppError::Validation(format!(
                    "{field} has out-of-range coordinates"
                )));
            }
            require_text(field, &location.address)?;
        }

        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Accepting driver's profile, copied onto the booking once and never re-read.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSnapshot {
    pub driver_id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle_number: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use uuid::Uuid;

    use super::{AmbulanceType, BookingDraft};
    use crate::models::location::Location;

    pub fn draft(user_id: Uuid) -> BookingDraft {
        BookingDraft {
            user_id,
            ambulance_id: "amb-1".to_string(),
            hospital_id: "hosp-1".to_string(),
            pickup_location: Location {
                lat: 37.7,
                lng: -122.4,
                address: "Current Location".to_string(),
            },
            hospital_location: Location {
                lat: 37.8,
                lng: -122.5,
                address: "1001 Potrero Ave".to_string(),
            },
            ambulance_type: AmbulanceType::Basic,
            patient_name: "Jordan Lee".to_string(),
            patient_age: 42,
            patient_condition: "Chest pain".to_string(),
            is_emergency: false,
            driver_name: None,
            driver_phone: None,
            vehicle_number: None,
            estimated_arrival: Some("15-20 minutes".to_string()),
        }
    }
}
