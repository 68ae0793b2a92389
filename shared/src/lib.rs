use serde::{Deserialize, Deserializer, Serialize};

/// One class score reported by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionItem {
    #[serde(rename = "class")]
    pub class_name: String,
    pub probability: f64,
}

/// Normalized classifier output.
///
/// `items` and `error` are not mutually exclusive: a classifier that answers
/// partially may report both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionResult {
    #[serde(rename = "predictions", deserialize_with = "null_as_empty")]
    pub items: Vec<PredictionItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    pub fn top(&self) -> Option<&PredictionItem> {
        self.items
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<PredictionItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<PredictionItem>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub stored_image_id: i64,
    pub prediction: PredictionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
