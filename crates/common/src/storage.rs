//! File storage for uploaded documents, photos and payment proofs.
//!
//! Workflows only ever see the stored path; validation of extension, MIME
//! type and size happens here before anything touches the disk.

use std::path::{Path, PathBuf};

use crate::{AppError, AppResult, IdGenerator};

/// What an upload is for. Each category has its own allow-list and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCategory {
    /// Proof of payment for a clearance request.
    PaymentProof,
    /// Supporting document for an exit permit.
    PermitDocument,
    /// Photo attached to a damage report.
    ReportPhoto,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "jpg", "jpeg", "png"];
const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
];

const MB: usize = 1024 * 1024;

impl UploadCategory {
    /// Directory under the storage root.
    #[must_use]
    pub const fn dir(self) -> &'static str {
        match self {
            Self::PaymentProof => "payments",
            Self::PermitDocument => "permits",
            Self::ReportPhoto => "reports",
        }
    }

    /// Maximum accepted size in bytes.
    #[must_use]
    pub const fn max_bytes(self) -> usize {
        match self {
            Self::PaymentProof => 5 * MB,
            Self::PermitDocument => 10 * MB,
            Self::ReportPhoto => 2 * MB,
        }
    }

    const fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            Self::PaymentProof | Self::ReportPhoto => IMAGE_EXTENSIONS,
            Self::PermitDocument => DOCUMENT_EXTENSIONS,
        }
    }

    const fn allowed_mime_types(self) -> &'static [&'static str] {
        match self {
            Self::PaymentProof | Self::ReportPhoto => IMAGE_MIME_TYPES,
            Self::PermitDocument => DOCUMENT_MIME_TYPES,
        }
    }

    /// Check an upload against this category's rules.
    pub fn validate(self, file: &UploadedFile) -> AppResult<()> {
        if file.data.is_empty() {
            return Err(AppError::BadRequest("File kosong".to_string()));
        }
        if file.data.len() > self.max_bytes() {
            return Err(AppError::BadRequest(format!(
                "Ukuran file melebihi batas {} MB",
                self.max_bytes() / MB
            )));
        }

        let extension = file.extension().unwrap_or_default();
        if !self.allowed_extensions().contains(&extension.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Ekstensi file tidak diizinkan: {}",
                if extension.is_empty() { "-" } else { extension.as_str() }
            )));
        }

        let mime = file.content_type.to_ascii_lowercase();
        if !self.allowed_mime_types().contains(&mime.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Tipe file tidak diizinkan: {mime}"
            )));
        }

        Ok(())
    }
}

/// An upload received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original file name as sent by the client.
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Lowercased extension of the original file name.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Metadata of a stored file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Storage key (path relative to the storage root).
    pub key: String,
    /// Public path recorded on the owning entity.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// MD5 hash of the file.
    pub md5: String,
}

/// File storage capability.
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// Validate and persist an upload, returning where it can be found.
    async fn save(&self, category: UploadCategory, file: &UploadedFile) -> AppResult<StoredFile>;

    /// Delete a stored file.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public path for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    id_gen: IdGenerator,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
            id_gen: IdGenerator::new(),
        }
    }

    fn storage_key(&self, category: UploadCategory, file: &UploadedFile) -> String {
        let extension = file.extension().unwrap_or_else(|| "bin".to_string());
        format!("{}/{}.{extension}", category.dir(), self.id_gen.generate())
    }
}

#[async_trait::async_trait]
impl FileStore for LocalStorage {
    async fn save(&self, category: UploadCategory, file: &UploadedFile) -> AppResult<StoredFile> {
        category.validate(file)?;

        let key = self.storage_key(category, file);
        let path = self.base_path.join(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, &file.data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        let md5 = format!("{:x}", md5::compute(&file.data));
        tracing::debug!(key = %key, size = file.data.len(), "Stored upload");

        Ok(StoredFile {
            path: self.public_url(&key),
            key,
            size: file.data.len() as u64,
            md5,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn image(name: &str, mime: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: mime.to_string(),
            data: vec![0xAB; size],
        }
    }

    #[test]
    fn test_validate_accepts_allowed_image() {
        let file = image("bukti.JPG", "image/jpeg", 1024);
        assert!(UploadCategory::PaymentProof.validate(&file).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_extension() {
        let file = image("bukti.exe", "image/jpeg", 1024);
        assert!(matches!(
            UploadCategory::PaymentProof.validate(&file),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_mime() {
        let file = image("surat.pdf", "text/plain", 1024);
        assert!(UploadCategory::PermitDocument.validate(&file).is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_photo() {
        let file = image("kerusakan.png", "image/png", 2 * MB + 1);
        assert!(UploadCategory::ReportPhoto.validate(&file).is_err());

        // Same size is fine as a permit document
        let doc = image("surat.png", "image/png", 2 * MB + 1);
        assert!(UploadCategory::PermitDocument.validate(&doc).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_file() {
        let file = image("bukti.png", "image/png", 0);
        assert!(UploadCategory::PaymentProof.validate(&file).is_err());
    }

    #[tokio::test]
    async fn test_local_storage_save_and_delete() {
        let root = std::env::temp_dir()
            .join(format!("asrama-storage-{}", IdGenerator::new().generate()));
        let storage = LocalStorage::new(root.clone(), "/uploads/".to_string());

        let stored = storage
            .save(UploadCategory::ReportPhoto, &image("retak.webp", "image/webp", 64))
            .await
            .unwrap();

        assert!(stored.key.starts_with("reports/"));
        assert!(stored.key.ends_with(".webp"));
        assert_eq!(stored.path, format!("/uploads/{}", stored.key));
        assert_eq!(stored.size, 64);
        assert!(root.join(&stored.key).exists());

        storage.delete(&stored.key).await.unwrap();
        assert!(!root.join(&stored.key).exists());

        let _ = std::fs::remove_dir_all(root);
    }
}
