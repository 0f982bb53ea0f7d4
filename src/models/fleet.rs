use serde::{Deserialize, Serialize};

use crate::models::booking::AmbulanceType;
use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ambulance {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AmbulanceType,
    pub vehicle_number: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub location: GeoPoint,
    pub available: bool,
    pub rating: f64,
    #[serde(default)]
    pub equipment: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HospitalCategory {
    Emergency,
    Cardiology,
    Neurology,
    Orthopedics,
    Gynecology,
    Pediatrics,
    Oncology,
    Multispecialist,
    Gastroenterology,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub location: GeoPoint,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub categories: Vec<HospitalCategory>,
    pub rating: f64,
    pub available: bool,
}
