use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::AppJson;
use crate::api::rest::identity::Caller;
use crate::error::AppError;
use crate::models::user::{User, UserRole};
use crate::state::AppState;
use crate::users::{NewContact, Registration};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/:id", get(get_user))
        .route("/users/:id/contacts", post(add_contact))
        .route("/users/:id/contacts/:contact_id", delete(remove_contact))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub role: UserRole,
}

async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<Registration>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.register(payload).await?))
}

async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.login(&payload.email, payload.role).await?))
}

async fn get_user(caller: Caller, Path(id): Path<Uuid>) -> Result<Json<User>, AppError> {
    caller.require_self(id)?;
    Ok(Json(caller.0))
}

async fn add_contact(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<NewContact>,
) -> Result<Json<User>, AppError> {
    caller.require_self(id)?;
    Ok(Json(state.users.add_contact(id, payload).await?))
}

async fn remove_contact(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((id, contact_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<User>, AppError> {
    caller.require_self(id)?;
    Ok(Json(state.users.remove_contact(id, contact_id).await?))
}
