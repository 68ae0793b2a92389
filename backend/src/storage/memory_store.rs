use async_trait::async_trait;
use tokio::sync::RwLock;

use super::image_store::{ImageStore, NewImage, StoreError, UploadedImage};

/// Process-local store, used when no database is wanted (tests, demos).
#[derive(Default)]
pub struct MemoryImageStore {
    images: RwLock<Vec<UploadedImage>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn save(&self, image: NewImage) -> Result<UploadedImage, StoreError> {
        if image.image_data.is_empty() {
            return Err(StoreError::EmptyImage);
        }
        let mut images = self.images.write().await;
        let id = images.len() as i64 + 1;
        let record = image.into_record(id, chrono::Utc::now());
        images.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<UploadedImage>, StoreError> {
        let images = self.images.read().await;
        Ok(images.iter().find(|image| image.id == id).cloned())
    }
}
