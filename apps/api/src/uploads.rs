//! Multipart form extraction and transient on-disk storage for uploads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// An uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Fields collected from a multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<Attachment>,
    pub text: HashMap<String, String>,
}

impl UploadForm {
    /// First non-blank text value among `names`.
    pub fn text_field(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.text.get(*name))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }
}

/// Reads a multipart body. Parts named in `file_fields` become the attachment
/// (the first non-empty one wins); every other part is read as text.
pub async fn read_form(
    mut multipart: Multipart,
    file_fields: &[&'static str],
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("body", format!("Invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if file_fields.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let mime_type = field.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string();
            let bytes = field.bytes().await.map_err(|e| {
                AppError::validation(file_fields[0], format!("Invalid file upload: {e}"))
            })?;
            if bytes.is_empty() || form.file.is_some() {
                continue;
            }
            debug!(field = %name, file_name = %file_name, size = bytes.len(), "Received upload");
            form.file = Some(Attachment {
                file_name,
                mime_type,
                bytes,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::validation("body", format!("Invalid form field '{name}': {e}")))?;
            form.text.insert(name, value);
        }
    }

    Ok(form)
}

/// An upload persisted under the upload directory. The file is removed on drop.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
    stem: String,
}

impl StoredUpload {
    pub async fn persist(dir: &Path, attachment: &Attachment) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        let safe_name = sanitize_file_name(&attachment.file_name);
        let path = dir.join(format!("{}-{}", Uuid::new_v4(), safe_name));
        tokio::fs::write(&path, &attachment.bytes)
            .await
            .with_context(|| format!("Failed to store upload at {}", path.display()))?;

        let stem = Path::new(&safe_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload")
            .to_string();

        Ok(Self { path, stem })
    }

    pub async fn read(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read upload at {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitized original file name without extension.
    pub fn stem(&self) -> &str {
        &self.stem
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove upload {}: {e}", self.path.display());
            }
        }
    }
}

/// Keeps `[A-Za-z0-9._-]`, replaces everything else with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
