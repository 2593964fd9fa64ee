//! Multipart upload intake: size-capped reading, filename and type checks, and
//! the storage key layout for uploaded files.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::extract::multipart::{Field, Multipart};
use axum::http::{StatusCode, header};
use axum::response::Response;
use common::storage::{Checksum, ObjectStore};
use common::{Phase, SubmissionKind};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::filename::{content_disposition, extension, validate_upload_filename};

const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Route-level body cap for upload endpoints; per-kind limits are checked later.
pub fn upload_body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    // Headroom for multipart framing and the text fields.
    DefaultBodyLimit::max(max_upload_size as usize + 64 * 1024)
}

/// A file part as received, before validation.
#[derive(Debug)]
pub struct RawFile {
    pub filename: String,
    pub declared_type: Option<String>,
    pub data: Vec<u8>,
}

/// Parsed multipart body: the `file` part plus every text field.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<RawFile>,
    pub fields: HashMap<String, String>,
}

/// A file that passed every check for its [`SubmissionKind`].
#[derive(Debug)]
pub struct ValidatedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub extension: String,
    pub checksum: Checksum,
    pub data: Vec<u8>,
}

impl ValidatedFile {
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }
}

async fn read_capped(mut field: Field<'_>, max: u64) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if (data.len() + chunk.len()) as u64 > max {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the {max} byte limit"
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Read a multipart body, keeping at most `max_file_size` bytes of the `file` part.
pub async fn read_form(mut multipart: Multipart, max_file_size: u64) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
            let declared_type = field.content_type().map(str::to_string);
            let data = read_capped(field, max_file_size).await?;
            form.file = Some(RawFile {
                filename,
                declared_type,
                data,
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

/// Content type implied by the leading bytes, for the formats we accept.
fn sniff(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"%PDF-") {
        Some("application/pdf")
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else if data.starts_with(b"PK\x03\x04") {
        // OOXML documents are ZIP containers.
        Some(PPTX_MIME)
    } else {
        None
    }
}

/// Check a raw upload against the rules for `kind`.
pub fn validate_file(kind: SubmissionKind, raw: RawFile) -> Result<ValidatedFile, AppError> {
    let filename = validate_upload_filename(&raw.filename)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();
    let ext = extension(&filename)
        .ok_or_else(|| AppError::Validation("Filename must have an extension".into()))?;

    let allowed = kind.allowed_mime_types();
    let content_type = mime_guess::from_ext(&ext)
        .iter_raw()
        .find_map(|guess| allowed.iter().copied().find(|a| *a == guess))
        .ok_or_else(|| {
            AppError::Validation(format!(
                "File type '.{ext}' is not accepted for {kind}; allowed: {}",
                allowed.join(", ")
            ))
        })?;

    if let Some(declared) = raw.declared_type.as_deref() {
        let declared = declared.split(';').next().unwrap_or_default().trim();
        if !declared.is_empty() && declared != "application/octet-stream" && declared != content_type
        {
            return Err(AppError::Validation(format!(
                "Declared content type '{declared}' does not match '.{ext}'"
            )));
        }
    }

    if raw.data.is_empty() {
        return Err(AppError::Validation("File is empty".into()));
    }
    if raw.data.len() as u64 > kind.max_size() {
        return Err(AppError::PayloadTooLarge(format!(
            "{kind} must be at most {} MiB",
            kind.max_size() / (1024 * 1024)
        )));
    }
    if sniff(&raw.data) != Some(content_type) {
        return Err(AppError::Validation(format!(
            "File content does not look like {content_type}"
        )));
    }

    Ok(ValidatedFile {
        filename,
        content_type,
        extension: ext,
        checksum: Checksum::compute(&raw.data),
        data: raw.data,
    })
}

pub fn registration_payment_key(registration_id: i32, ext: &str) -> String {
    format!("registrations/{registration_id}/payment/{}.{ext}", Uuid::now_v7())
}

pub fn submission_key(registration_id: i32, phase: Phase, kind: SubmissionKind, ext: &str) -> String {
    format!(
        "registrations/{registration_id}/{phase}/{kind}/{}.{ext}",
        Uuid::now_v7()
    )
}

pub fn ticket_payment_key(ticket_id: i32, ext: &str) -> String {
    format!("tickets/{ticket_id}/payment/{}.{ext}", Uuid::now_v7())
}

/// Stream a stored object back as an attachment download.
pub async fn object_response(
    store: &dyn ObjectStore,
    key: &str,
    filename: &str,
) -> Result<Response, AppError> {
    let reader = store.get_stream(key).await?;
    let content_type = mime_guess::from_path(key).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_DISPOSITION, content_disposition(filename))
        .header(header::CACHE_CONTROL, "private, no-store")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
