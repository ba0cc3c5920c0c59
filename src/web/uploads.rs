use axum::extract::multipart::Field;

use crate::domain::Attachment;
use crate::error::{AppError, Result};

/// Announcement images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Complaint evidence: photos plus scanned documents
pub const EVIDENCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "pdf"];

/// Camera snapshots handed to the QR decoder
pub const SNAPSHOT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Validate an uploaded file's name and size and wrap it for the backend.
/// The stored name is a fresh UUID with the original extension.
pub fn to_attachment(
    filename: &str,
    data: Vec<u8>,
    allowed: &[&str],
    max_bytes: usize,
) -> Result<Attachment> {
    if data.is_empty() {
        return Err(AppError::Validation("The selected file is empty".to_string()));
    }

    if data.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "File too large (max {} MB)",
            max_bytes / (1024 * 1024)
        )));
    }

    let extension = extension_of(filename)
        .ok_or_else(|| AppError::Validation("Invalid filename".to_string()))?;

    if !allowed.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "Invalid file type. Allowed: {}",
            allowed.join(", ")
        )));
    }

    Ok(Attachment {
        filename: format!("{}.{}", uuid::Uuid::new_v4(), extension),
        content_type: content_type_for(&extension).to_string(),
        bytes: data,
    })
}

fn extension_of(filename: &str) -> Option<String> {
    let (stem, extension) = filename.trim().rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Read a file field. Browsers send an unnamed empty part when no file was
/// chosen; that reads as `None`.
pub async fn read_file_field(field: Field<'_>) -> Result<Option<(String, Vec<u8>)>> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

    if filename.is_empty() && data.is_empty() {
        return Ok(None);
    }
    Ok(Some((filename, data.to_vec())))
}

pub async fn read_text_field(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_allowed_image() {
        let attachment = to_attachment("Flyer.PNG", vec![1, 2, 3], IMAGE_EXTENSIONS, 1024).unwrap();
        assert!(attachment.filename.ends_with(".png"));
        assert_eq!(attachment.content_type, "image/png");
    }

    #[test]
    fn test_rejects_bad_extension_and_size() {
        assert!(matches!(
            to_attachment("notes.exe", vec![1], IMAGE_EXTENSIONS, 1024),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            to_attachment("photo.jpg", vec![0; 2048], IMAGE_EXTENSIONS, 1024),
            Err(AppError::Validation(_))
        ));
        assert!(to_attachment("noextension", vec![1], IMAGE_EXTENSIONS, 1024).is_err());
        assert!(to_attachment("photo.jpg", Vec::new(), IMAGE_EXTENSIONS, 1024).is_err());
    }

    #[test]
    fn test_evidence_allows_pdf() {
        assert!(to_attachment("scan.pdf", vec![1], EVIDENCE_EXTENSIONS, 1024).is_ok());
        assert!(to_attachment("scan.pdf", vec![1], IMAGE_EXTENSIONS, 1024).is_err());
    }
}
