use actix_multipart::MultipartError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;

use crate::storage::StoreError;

/// Failures that stop an ingestion request. Classifier problems are never
/// represented here; they travel inside the prediction result.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("No image file was received. Send a multipart/form-data request with an image file.")]
    NoFile,
    #[error("The uploaded file is empty")]
    EmptyFile,
    #[error("The uploaded file exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),
    /// The store's detail is logged, never sent to the client.
    #[error("Failed to store the uploaded image")]
    StorageFailed(#[from] StoreError),
}

impl From<MultipartError> for IngestionError {
    fn from(err: MultipartError) -> Self {
        match err {
            MultipartError::ContentTypeMissing
            | MultipartError::ContentTypeParse
            | MultipartError::ContentTypeIncompatible => IngestionError::NoFile,
            other => IngestionError::MalformedUpload(other.to_string()),
        }
    }
}

impl ResponseError for IngestionError {
    fn status_code(&self) -> StatusCode {
        match self {
            IngestionError::StorageFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
