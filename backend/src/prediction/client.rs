use reqwest::multipart::{Form, Part};
use reqwest::Client as HttpClient;
use shared::PredictionResult;
use std::time::Duration;
use url::Url;

use super::response::{error_message, parse_prediction_body};
use crate::media;

/// Multipart field the classifier reads the image from.
pub const CLASSIFIER_FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid classifier URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Sends images to the external classifier.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct PredictionClient {
    http_client: HttpClient,
    endpoint: Url,
}

impl PredictionClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ClientBuildError> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            endpoint: predict_endpoint(base_url)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Classifies one image. Every failure is folded into the returned
    /// result's `error`; this never returns an `Err`.
    ///
    /// A declared `image/*` content type is sent as-is; otherwise the type is
    /// sniffed from the bytes.
    pub async fn predict(
        &self,
        image_data: &[u8],
        file_name: &str,
        content_type: Option<&str>,
    ) -> PredictionResult {
        if image_data.is_empty() {
            return PredictionResult::degraded("no image data to classify");
        }
        let file_name = media::file_name_or_default(Some(file_name));
        let mime = media::image_mime(content_type, image_data);

        let part = match Part::bytes(image_data.to_vec())
            .file_name(file_name.clone())
            .mime_str(&mime)
        {
            Ok(part) => part,
            Err(e) => return PredictionResult::degraded(format!("invalid image MIME type: {}", e)),
        };
        let form = Form::new().part(CLASSIFIER_FILE_FIELD, part);

        log::debug!(
            "Sending {} ({} bytes, {}) to {}",
            file_name,
            image_data.len(),
            mime,
            self.endpoint
        );

        let response = match self
            .http_client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(&e),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return transport_failure(&e),
        };

        if !status.is_success() {
            log::warn!("Classifier returned {} for {}", status, file_name);
            let message = match error_message(&body) {
                Some(detail) => format!("classifier returned {}: {}", status, detail),
                None => format!("classifier returned {}", status),
            };
            return PredictionResult::degraded(message);
        }

        let result = parse_prediction_body(&body);
        if let Some(error) = &result.error {
            log::warn!("Classifier response for {} is degraded: {}", file_name, error);
        }
        result
    }
}

/// `<base>/predict`, keeping any path prefix on the base URL.
pub fn predict_endpoint(base_url: &Url) -> Result<Url, url::ParseError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("predict")
}

fn transport_failure(e: &reqwest::Error) -> PredictionResult {
    let message = if e.is_timeout() {
        "classifier request timed out".to_string()
    } else if e.is_connect() {
        format!("classifier unreachable: {}", e)
    } else {
        format!("classifier request failed: {}", e)
    };
    log::warn!("{}", message);
    PredictionResult::degraded(message)
}
