use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::extract::AppJson;
use crate::error::AppError;
use crate::fleet::PlaceSource;
use crate::geo::{find_nearest, Ranked};
use crate::models::fleet::{Ambulance, Hospital};
use crate::models::location::GeoPoint;
use crate::state::AppState;

const DEFAULT_NEARBY_LIMIT: usize = 5;
const DEFAULT_SEARCH_RADIUS_M: f64 = 5_000.0;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ambulances", post(register_ambulance).get(list_ambulances))
        .route("/ambulances/nearby", get(nearby_ambulances))
        .route("/ambulances/:id/availability", patch(update_availability))
        .route("/hospitals", post(register_hospital).get(list_hospitals))
        .route("/hospitals/nearby", get(nearby_hospitals))
        .route("/hospitals/search", get(search_hospitals))
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub limit: Option<usize>,
}

impl NearbyQuery {
    fn origin(&self) -> Result<GeoPoint, AppError> {
        valid_point(GeoPoint::new(self.lat, self.lng))
    }
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<f64>,
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

fn valid_point(point: GeoPoint) -> Result<GeoPoint, AppError> {
    if !point.is_valid() {
        return Err(AppError::Validation(
            "coordinates out of range".to_string(),
        ));
    }
    Ok(point)
}

async fn register_ambulance(
    State(state): State<Arc<AppState>>,
    AppJson(mut payload): AppJson<Ambulance>,
) -> Result<Json<Ambulance>, AppError> {
    if payload.id.trim().is_empty() {
        return Err(AppError::Validation("id cannot be empty".to_string()));
    }
    valid_point(payload.location)?;

    payload.rating = payload.rating.clamp(0.0, 5.0);
    state.fleet.upsert_ambulance(payload.clone());
    Ok(Json(payload))
}

async fn list_ambulances(State(state): State<Arc<AppState>>) -> Json<Vec<Ambulance>> {
    Json(state.fleet.ambulances())
}

async fn nearby_ambulances(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<Ranked<Ambulance>>>, AppError> {
    let origin = query.origin()?;
    let limit = query.limit.unwrap_or(DEFAULT_NEARBY_LIMIT);
    Ok(Json(find_nearest(&origin, &state.fleet.ambulances(), limit)))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<AvailabilityRequest>,
) -> Result<Json<Ambulance>, AppError> {
    Ok(Json(
        state
            .fleet
            .set_ambulance_availability(&id, payload.available)?,
    ))
}

async fn register_hospital(
    State(state): State<Arc<AppState>>,
    AppJson(mut payload): AppJson<Hospital>,
) -> Result<Json<Hospital>, AppError> {
    if payload.id.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(AppError::Validation(
            "id and name cannot be empty".to_string(),
        ));
    }
    valid_point(payload.location)?;

    payload.rating = payload.rating.clamp(0.0, 5.0);
    state.fleet.upsert_hospital(payload.clone());
    Ok(Json(payload))
}

async fn list_hospitals(State(state): State<Arc<AppState>>) -> Json<Vec<Hospital>> {
    Json(state.fleet.hospitals())
}

async fn nearby_hospitals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<Ranked<Hospital>>>, AppError> {
    let origin = query.origin()?;
    let limit = query.limit.unwrap_or(DEFAULT_NEARBY_LIMIT);
    Ok(Json(find_nearest(&origin, &state.fleet.hospitals(), limit)))
}

async fn search_hospitals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Hospital>>, AppError> {
    let origin = valid_point(GeoPoint::new(query.lat, query.lng))?;
    let radius = query.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_M);
    Ok(Json(state.fleet.search_nearby(origin, radius).await?))
}
