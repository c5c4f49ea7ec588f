use std::path::Path;

use serde::Serialize;

use crate::core::AppError;

const ALLOWED_EXTENSIONS: [(&str, &str); 4] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("pdf", "application/pdf"),
];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UploadError {
    #[error("File is required")]
    MissingFile,
    #[error("Filename is required")]
    MissingFilename,
    #[error("Only .jpg, .jpeg, .png and .pdf files are allowed")]
    DisallowedExtension,
    #[error("File size exceeds maximum limit ({0} bytes)")]
    TooLarge(usize),
}

impl From<UploadError> for AppError {
    fn from(error: UploadError) -> Self {
        AppError::validation_error(error)
    }
}

/// Lowercased extension and the MIME type stored for it.
pub fn allowed_file_type(filename: &str) -> Result<(String, &'static str), UploadError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .ok_or(UploadError::DisallowedExtension)?;

    ALLOWED_EXTENSIONS
        .iter()
        .find(|(allowed, _)| *allowed == extension)
        .map(|(_, mime)| (extension.clone(), *mime))
        .ok_or(UploadError::DisallowedExtension)
}

#[derive(Debug, Serialize)]
pub struct FileUploadResponse {
    pub file_name: String,
    pub url: String,
    pub file_size: usize,
    pub mime_type: String,
}
