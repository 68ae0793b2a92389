use actix_multipart::{Field, Multipart};
use futures::StreamExt;

use super::error::IngestionError;

/// Multipart field the upload is expected under. Any other file part is
/// accepted when this one is absent.
pub const UPLOAD_FIELD: &str = "imageFile";
pub const OWNER_FIELD: &str = "ownerId";
pub const SUBJECT_FIELD: &str = "subjectId";

const MAX_TEXT_FIELD: usize = 64;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub owner_id: Option<i64>,
    pub subject_id: Option<i64>,
}

#[cfg(test)]
impl UploadForm {
    pub fn with_file(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file: Some(UploadedFile {
                field_name: UPLOAD_FIELD.to_string(),
                file_name: Some(file_name.to_string()),
                content_type: None,
                bytes,
            }),
            ..Self::default()
        }
    }
}

/// Reads a multipart body into memory.
///
/// The file part named [`UPLOAD_FIELD`] is preferred; otherwise the first
/// file part wins. Each candidate is buffered up to `max_bytes`. A named part
/// one byte over fails with `TooLarge`; an oversized first part only fails
/// once the body ends without a named part.
pub async fn read_upload(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<UploadForm, IngestionError> {
    let mut form = UploadForm::default();
    let mut found_named = false;
    // first file part was over the limit; only a named part can still win
    let mut fallback_too_large = false;

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        if let Some(file_name) = file_name {
            let named = name == UPLOAD_FIELD;
            let is_first = form.file.is_none() && !fallback_too_large;
            if found_named || !(named || is_first) {
                drain(&mut field).await?;
                continue;
            }
            let content_type = field.content_type().map(|mime| mime.essence_str().to_string());
            let Some(bytes) = read_limited(&mut field, max_bytes).await? else {
                if named {
                    return Err(IngestionError::TooLarge { limit: max_bytes });
                }
                log::debug!(
                    "File part '{}' exceeds {} bytes, waiting for '{}'",
                    name,
                    max_bytes,
                    UPLOAD_FIELD
                );
                drain(&mut field).await?;
                fallback_too_large = true;
                continue;
            };
            log::debug!(
                "Received file part '{}' ({}, {} bytes)",
                name,
                file_name,
                bytes.len()
            );
            found_named = named;
            form.file = Some(UploadedFile {
                field_name: name,
                file_name: Some(file_name),
                content_type,
                bytes,
            });
        } else if name.eq_ignore_ascii_case(OWNER_FIELD) {
            form.owner_id = Some(read_id(&mut field, OWNER_FIELD).await?);
        } else if name.eq_ignore_ascii_case(SUBJECT_FIELD) {
            form.subject_id = Some(read_id(&mut field, SUBJECT_FIELD).await?);
        } else {
            drain(&mut field).await?;
        }
    }

    if form.file.is_none() && fallback_too_large {
        return Err(IngestionError::TooLarge { limit: max_bytes });
    }
    Ok(form)
}

/// `None` when the field holds more than `limit` bytes.
async fn read_limited(field: &mut Field, limit: usize) -> Result<Option<Vec<u8>>, IngestionError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk?;
        if buf.len() + data.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&data);
    }
    Ok(Some(buf))
}

async fn drain(field: &mut Field) -> Result<(), IngestionError> {
    while let Some(chunk) = field.next().await {
        chunk?;
    }
    Ok(())
}

async fn read_id(field: &mut Field, key: &str) -> Result<i64, IngestionError> {
    let raw = read_limited(field, MAX_TEXT_FIELD)
        .await?
        .ok_or_else(|| IngestionError::MalformedUpload(format!("{} is too long", key)))?;
    std::str::from_utf8(&raw)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| IngestionError::MalformedUpload(format!("{} must be an integer", key)))
}
