use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::AppJson;
use crate::api::rest::identity::Caller;
use crate::engine::lifecycle::Actor;
use crate::engine::matching::{match_sos, sos_draft, SosRequest};
use crate::engine::poller::{scope_view, BookingView, Viewer};
use crate::error::AppError;
use crate::models::booking::{Booking, BookingDraft, BookingStatus};
use crate::models::location::GeoPoint;
use crate::models::user::{User, UserRole};
use crate::notify::{dispatch_alert, EmergencyAlert};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/sos", post(emergency_sos))
        .route("/bookings/view", get(booking_view))
        .route("/bookings/active", get(active_booking))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/status", patch(update_status))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosPickup {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosBookingRequest {
    pub pickup: SosPickup,
    #[serde(default)]
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub patient_condition: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
}

fn require_patient(user: &User) -> Result<(), AppError> {
    if user.role != UserRole::Patient {
        return Err(AppError::Forbidden(
            "only patients can request an ambulance".to_string(),
        ));
    }
    Ok(())
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    AppJson(draft): AppJson<BookingDraft>,
) -> Result<Json<Booking>, AppError> {
    require_patient(&user)?;
    if draft.user_id != user.id {
        return Err(AppError::Forbidden(
            "bookings can only be requested for the calling user".to_string(),
        ));
    }

    let booking = state.bookings.create(draft).await?;

    let hospital_name = state
        .fleet
        .hospital(&booking.hospital_id)
        .map(|h| h.name)
        .unwrap_or_else(|| booking.hospital_location.address.clone());
    notify_contacts(&state, &user, &booking, hospital_name);

    Ok(Json(booking))
}

async fn emergency_sos(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    AppJson(payload): AppJson<SosBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    require_patient(&user)?;

    let pickup = GeoPoint::new(payload.pickup.lat, payload.pickup.lng);
    if !pickup.is_valid() {
        return Err(AppError::Validation(
            "pickup has out-of-range coordinates".to_string(),
        ));
    }

    let matched = match_sos(
        &pickup,
        &state.fleet.ambulances(),
        &state.fleet.hospitals(),
        state.sos_search_limit,
    )?;

    let draft = sos_draft(
        &user,
        SosRequest {
            pickup,
            address: payload.pickup.address,
            patient_age: payload.patient_age,
            patient_condition: payload.patient_condition,
        },
        &matched,
    );
    let booking = state.bookings.create(draft).await?;

    tracing::info!(
        booking_id = %booking.id,
        ambulance_id = %matched.ambulance.item.id,
        ambulance_km = matched.ambulance.distance,
        hospital_id = %matched.hospital.item.id,
        "emergency sos dispatched"
    );

    notify_contacts(&state, &user, &booking, matched.hospital.item.name.clone());
    Ok(Json(booking))
}

fn notify_contacts(state: &AppState, user: &User, booking: &Booking, hospital_name: String) {
    let alert = EmergencyAlert {
        patient_name: booking.patient_name.clone(),
        hospital_name,
        hospital_address: booking.hospital_location.address.clone(),
    };
    dispatch_alert(
        state.notifier.clone(),
        user.emergency_contacts.clone(),
        alert,
        state.metrics.clone(),
    );
}

async fn current_view(state: &AppState, user: &User) -> Result<BookingView, AppError> {
    let all = state.bookings.list_all().await?;
    Ok(scope_view(&Viewer::from_user(user), all))
}

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(current_view(&state, &user).await?.bookings))
}

async fn booking_view(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> Result<Json<BookingView>, AppError> {
    Ok(Json(current_view(&state, &user).await?))
}

async fn active_booking(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> Result<Json<Option<Booking>>, AppError> {
    Ok(Json(current_view(&state, &user).await?.active))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.get(id).await?;
    if user.role == UserRole::Patient && booking.user_id != user.id {
        return Err(AppError::Forbidden(format!(
            "booking {id} belongs to another patient"
        )));
    }
    Ok(Json(booking))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<StatusUpdateRequest>,
) -> Result<Json<Booking>, AppError> {
    if let Some(driver_id) = payload.driver_id {
        if driver_id != user.id {
            return Err(AppError::Forbidden(
                "driverId must be the calling driver".to_string(),
            ));
        }
    }

    let booking = state
        .bookings
        .transition_to(id, Actor::from_user(&user), payload.status)
        .await?;
    Ok(Json(booking))
}
