use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::User;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The registered user named by the `x-user-id` header.
pub struct Caller(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;

        let id = raw
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;

        match state.users.get(id).await {
            Ok(user) => Ok(Caller(user)),
            Err(AppError::NotFound(_)) => Err(AppError::Unauthorized(format!("unknown user {id}"))),
            Err(err) => Err(err),
        }
    }
}

impl Caller {
    pub fn require_self(&self, id: Uuid) -> Result<(), AppError> {
        if self.0.id != id {
            return Err(AppError::Forbidden(
                "users may only manage their own profile".to_string(),
            ));
        }
        Ok(())
    }
}
