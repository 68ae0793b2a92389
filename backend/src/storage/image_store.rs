use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Refusing to store an empty image")]
    EmptyImage,
}

/// A persisted upload. Immutable once saved.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UploadedImage {
    pub id: i64,
    pub file_name: String,
    pub content_type: String,
    pub sha256: String,
    #[serde(skip)]
    pub image_data: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
    pub owner_id: Option<i64>,
    pub subject_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub file_name: String,
    pub content_type: String,
    pub image_data: Vec<u8>,
    pub owner_id: Option<i64>,
    pub subject_id: Option<i64>,
}

impl NewImage {
    pub fn sha256(&self) -> String {
        calculate_image_hash(&self.image_data)
    }

    pub(crate) fn into_record(self, id: i64, uploaded_at: DateTime<Utc>) -> UploadedImage {
        UploadedImage {
            id,
            sha256: self.sha256(),
            file_name: self.file_name,
            content_type: self.content_type,
            image_data: self.image_data,
            uploaded_at,
            owner_id: self.owner_id,
            subject_id: self.subject_id,
        }
    }
}

pub fn calculate_image_hash(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}

/// Persistence for uploaded image bytes and their metadata.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, image: NewImage) -> Result<UploadedImage, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<UploadedImage>, StoreError>;
}
