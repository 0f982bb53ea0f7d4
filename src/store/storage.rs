use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;

pub const BOOKINGS_KEY: &str = "bookings";
pub const USERS_KEY: &str = "users";

/// Durable text values by key. Every collection is read and rewritten whole.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn write(&self, key: &str, contents: String) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn write(&self, key: &str, contents: String) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), contents);
        Ok(())
    }
}

/// One `<key>.json` file per collection under `dir`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|err| {
            AppError::Persistence(format!("failed to create {}: {err}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::Persistence(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    async fn write(&self, key: &str, contents: String) -> Result<(), AppError> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));

        tokio::fs::write(&tmp, contents).await.map_err(|err| {
            AppError::Persistence(format!("failed to write {}: {err}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|err| {
            AppError::Persistence(format!("failed to replace {}: {err}", path.display()))
        })
    }
}

/// A missing key reads as an empty collection.
pub async fn load_collection<T>(storage: &dyn Storage, key: &str) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned,
{
    match storage.read(key).await? {
        Some(contents) => serde_json::from_str(&contents)
            .map_err(|err| AppError::Persistence(format!("corrupt {key} collection: {err}"))),
        None => Ok(Vec::new()),
    }
}

pub async fn save_collection<T>(storage: &dyn Storage, key: &str, records: &[T]) -> Result<(), AppError>
where
    T: Serialize,
{
    let contents = serde_json::to_string(records)
        .map_err(|err| AppError::Persistence(format!("failed to encode {key}: {err}")))?;
    storage.write(key, contents).await
}
