use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{EmergencyContact, User, UserRole};
use crate::store::storage::{load_collection, save_collection, Storage, USERS_KEY};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub relation: String,
}

/// Registered users, persisted as one collection. Writes are serialized so
/// two registrations cannot both pass the uniqueness check.
pub struct UserDirectory {
    storage: Arc<dyn Storage>,
    write_lock: Mutex<()>,
}

impl UserDirectory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<User, AppError> {
        for (field, value) in [
            ("name", &registration.name),
            ("email", &registration.email),
            ("phone", &registration.phone),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} cannot be empty")));
            }
        }
        if !registration.email.contains('@') {
            return Err(AppError::Validation("email is malformed".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&registration.email))
        {
            return Err(AppError::DuplicateRegistration("email".to_string()));
        }
        if users.iter().any(|u| u.phone == registration.phone) {
            return Err(AppError::DuplicateRegistration("phone number".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: registration.name,
            email: registration.email,
            phone: registration.phone,
            role: registration.role,
            blood_group: registration.blood_group,
            emergency_contacts: Vec::new(),
            vehicle_number: registration.vehicle_number,
            license_number: registration.license_number,
        };

        users.push(user.clone());
        save_collection(self.storage.as_ref(), USERS_KEY, &users).await?;

        info!(user_id = %user.id, role = ?user.role, "user registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, role: UserRole) -> Result<User, AppError> {
        self.load()
            .await?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email) && u.role == role)
            .ok_or_else(|| {
                AppError::Unauthorized("invalid credentials or wrong account type".to_string())
            })
    }

    pub async fn get(&self, id: Uuid) -> Result<User, AppError> {
        self.load()
            .await?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
    }

    pub async fn add_contact(&self, user_id: Uuid, contact: NewContact) -> Result<User, AppError> {
        if contact.name.trim().is_empty() || contact.phone.trim().is_empty() {
            return Err(AppError::Validation(
                "contact name and phone are required".to_string(),
            ));
        }

        self.modify(user_id, |user| {
            user.emergency_contacts.push(EmergencyContact {
                id: Uuid::new_v4(),
                name: contact.name,
                phone: contact.phone,
                relation: contact.relation,
            });
            Ok(())
        })
        .await
    }

    pub async fn remove_contact(&self, user_id: Uuid, contact_id: Uuid) -> Result<User, AppError> {
        self.modify(user_id, |user| {
            let before = user.emergency_contacts.len();
            user.emergency_contacts.retain(|c| c.id != contact_id);
            if user.emergency_contacts.len() == before {
                return Err(AppError::NotFound(format!("contact {contact_id} not found")));
            }
            Ok(())
        })
        .await
    }

    async fn modify<F>(&self, user_id: Uuid, change: F) -> Result<User, AppError>
    where
        F: FnOnce(&mut User) -> Result<(), AppError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;
        change(user)?;
        let updated = user.clone();

        save_collection(self.storage.as_ref(), USERS_KEY, &users).await?;
        Ok(updated)
    }

    async fn load(&self) -> Result<Vec<User>, AppError> {
        load_collection(self.storage.as_ref(), USERS_KEY).await
    }
}
