use mime::Mime;
use std::{fmt, path::Path};

use crate::utils::errors::AppError;

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

#[derive(Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Mime,
    pub data: Vec<u8>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type.essence_str())
            .field("size", &self.data.len())
            .finish()
    }
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, content_type: Mime, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data,
        }
    }

    /// Reads a file from disk; its MIME type comes from the content, falling
    /// back to the extension.
    pub async fn from_path(path: &Path) -> Result<Self, AppError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        let content_type = detect_mime(&data, &file_name);

        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

pub fn detect_mime(data: &[u8], file_name: &str) -> Mime {
    if let Some(mime) = infer::get(data).and_then(|kind| kind.mime_type().parse::<Mime>().ok()) {
        return mime;
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("pdf") => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

pub fn field_label(field: &str) -> &str {
    match field {
        "cv" => "CV",
        "lettre_motivation" => "lettre de motivation",
        "demande_stage" => "demande de stage",
        "cv_binome" => "CV du binôme",
        "lettre_motivation_binome" => "lettre de motivation du binôme",
        "demande_stage_binome" => "demande de stage du binôme",
        other => other,
    }
}

/// Only non-empty PDFs up to `max_bytes` are accepted. When the content
/// itself is recognisable it must be a PDF too, whatever was declared.
pub fn validate_file(field: &str, attachment: &Attachment, max_bytes: u64) -> Result<(), AppError> {
    let label = field_label(field);

    if attachment.content_type.essence_str() != mime::APPLICATION_PDF.essence_str() {
        return Err(AppError::UnsupportedMediaType(format!(
            "Le fichier {} doit être au format PDF",
            label
        )));
    }

    if let Some(kind) = infer::get(&attachment.data) {
        if kind.mime_type() != mime::APPLICATION_PDF.essence_str() {
            return Err(AppError::UnsupportedMediaType(format!(
                "Le contenu du fichier {} n'est pas un PDF ({})",
                label,
                kind.mime_type()
            )));
        }
    }

    if attachment.data.is_empty() {
        return Err(AppError::BadRequest(format!("Le fichier {} est vide", label)));
    }

    if attachment.size() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Le fichier {} dépasse la taille maximale de {} Mo",
            label,
            max_bytes / (1024 * 1024)
        )));
    }

    Ok(())
}
