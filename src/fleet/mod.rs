use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::AppError;
use crate::geo::within_radius;
use crate::models::fleet::{Ambulance, Hospital};
use crate::models::location::GeoPoint;

/// Boundary to an external place lookup service.
#[async_trait]
pub trait PlaceSource: Send + Sync {
    async fn search_nearby(&self, point: GeoPoint, radius_m: f64) -> Result<Vec<Hospital>, AppError>;
}

/// Reference ambulances and hospitals used for matching. Entries are replaced
/// wholesale; matching only ever reads snapshots.
#[derive(Default)]
pub struct FleetRegistry {
    ambulances: DashMap<String, Ambulance>,
    hospitals: DashMap<String, Hospital>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_ambulance(&self, ambulance: Ambulance) {
        self.ambulances.insert(ambulance.id.clone(), ambulance);
    }

    pub fn upsert_hospital(&self, hospital: Hospital) {
        self.hospitals.insert(hospital.id.clone(), hospital);
    }

    pub fn set_ambulance_availability(&self, id: &str, available: bool) -> Result<Ambulance, AppError> {
        let mut ambulance = self
            .ambulances
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("ambulance {id} not found")))?;
        ambulance.available = available;
        Ok(ambulance.clone())
    }

    pub fn hospital(&self, id: &str) -> Option<Hospital> {
        self.hospitals.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot ordered by id, so distance ties rank deterministically.
    pub fn ambulances(&self) -> Vec<Ambulance> {
        let mut all: Vec<Ambulance> = self
            .ambulances
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn hospitals(&self) -> Vec<Hospital> {
        let mut all: Vec<Hospital> = self
            .hospitals
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.ambulances.len(), self.hospitals.len())
    }
}

#[async_trait]
impl PlaceSource for FleetRegistry {
    async fn search_nearby(&self, point: GeoPoint, radius_m: f64) -> Result<Vec<Hospital>, AppError> {
        Ok(within_radius(&point, &self.hospitals(), radius_m / 1_000.0)
            .into_iter()
            .map(|ranked| ranked.item)
            .collect())
    }
}
