pub const FALLBACK_IMAGE_MIME: &str = "image/jpeg";
pub const DEFAULT_FILE_NAME: &str = "image.jpg";

/// Picks the MIME type to record and forward for an upload.
///
/// A declared `image/*` type is trusted; anything else is sniffed from the
/// leading bytes, falling back to JPEG.
pub fn image_mime(declared: Option<&str>, image_data: &[u8]) -> String {
    if let Some(declared) = declared {
        let declared = declared.trim().to_ascii_lowercase();
        if declared.starts_with("image/") {
            return declared;
        }
    }
    image::guess_format(image_data)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_IMAGE_MIME.to_string())
}

pub fn file_name_or_default(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_FILE_NAME.to_string(),
    }
}
