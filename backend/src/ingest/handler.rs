use shared::{PredictionResult, UploadResponse};
use std::sync::Arc;

use super::error::IngestionError;
use super::upload::UploadForm;
use crate::media;
use crate::prediction::PredictionClient;
use crate::storage::{ImageStore, NewImage};

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionOutcome {
    pub stored_image_id: i64,
    pub prediction: PredictionResult,
}

impl From<IngestionOutcome> for UploadResponse {
    fn from(outcome: IngestionOutcome) -> Self {
        Self {
            stored_image_id: outcome.stored_image_id,
            prediction: outcome.prediction,
        }
    }
}

/// Stores an upload, then asks the classifier about it.
///
/// Only validation and storage can fail a request. Once the image is saved
/// the request succeeds, whatever the classifier does.
#[derive(Clone)]
pub struct IngestionHandler {
    store: Arc<dyn ImageStore>,
    classifier: PredictionClient,
    max_upload_bytes: usize,
}

impl IngestionHandler {
    pub fn new(
        store: Arc<dyn ImageStore>,
        classifier: PredictionClient,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            classifier,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub async fn accept(&self, form: UploadForm) -> Result<IngestionOutcome, IngestionError> {
        let file = form.file.ok_or(IngestionError::NoFile)?;
        if file.bytes.is_empty() {
            return Err(IngestionError::EmptyFile);
        }
        if file.bytes.len() > self.max_upload_bytes {
            return Err(IngestionError::TooLarge {
                limit: self.max_upload_bytes,
            });
        }

        log::debug!(
            "Accepting '{}' from field '{}'",
            file.file_name.as_deref().unwrap_or_default(),
            file.field_name
        );
        let file_name = media::file_name_or_default(file.file_name.as_deref());
        let content_type = media::image_mime(file.content_type.as_deref(), &file.bytes);

        let stored = self
            .store
            .save(NewImage {
                file_name,
                content_type,
                image_data: file.bytes,
                owner_id: form.owner_id,
                subject_id: form.subject_id,
            })
            .await
            .map_err(|e| {
                log::error!("Failed to store upload: {}", e);
                IngestionError::StorageFailed(e)
            })?;
        log::info!(
            "Stored image {} ({}, {} bytes)",
            stored.id,
            stored.file_name,
            stored.image_data.len()
        );

        let prediction = self
            .classifier
            .predict(
                &stored.image_data,
                &stored.file_name,
                Some(&stored.content_type),
            )
            .await;
        match (&prediction.error, prediction.top()) {
            (Some(error), _) => log::warn!("Prediction for image {} degraded: {}", stored.id, error),
            (None, Some(top)) => log::info!(
                "Image {}: {} predictions, top {} ({:.3})",
                stored.id,
                prediction.items.len(),
                top.class_name,
                top.probability
            ),
            (None, None) => log::info!("Image {}: classifier returned no predictions", stored.id),
        }

        Ok(IngestionOutcome {
            stored_image_id: stored.id,
            prediction,
        })
    }
}
