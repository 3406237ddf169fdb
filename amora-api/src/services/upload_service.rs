use std::collections::HashMap;

use axum::extract::Multipart;

use amora_shared::clients::storage::{UploadCategory, UploadStore};
use amora_shared::errors::{AppError, AppResult, ErrorCode};

pub const MIN_PHOTOS: usize = 1;
pub const MAX_PHOTOS: usize = 5;

#[derive(Debug)]
pub struct UploadedFile {
    pub field_name: String,
    pub filename: String,
    pub data: Vec<u8>,
}

/// A fully drained multipart request: text fields by name, file parts in
/// arrival order (which becomes photo order).
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub texts: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    pub fn files_named(&self, name: &str) -> Vec<&UploadedFile> {
        self.files.iter().filter(|f| f.field_name == name).collect()
    }

    pub fn file_named(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field_name == name)
    }
}

pub async fn read_multipart(mut multipart: Multipart) -> AppResult<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::UploadFailed, format!("failed to read multipart: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(filename) if !filename.is_empty() => {
                let data = field.bytes().await.map_err(|e| {
                    AppError::new(ErrorCode::UploadFailed, format!("failed to read file data: {e}"))
                })?;
                form.files.push(UploadedFile {
                    field_name: name,
                    filename,
                    data: data.to_vec(),
                });
            }
            _ => {
                let value = field.text().await.map_err(|e| {
                    AppError::new(ErrorCode::UploadFailed, format!("failed to read field: {e}"))
                })?;
                form.texts.insert(name, value);
            }
        }
    }

    Ok(form)
}

pub fn validate_photo_count(count: usize, what: &str) -> AppResult<()> {
    if !(MIN_PHOTOS..=MAX_PHOTOS).contains(&count) {
        return Err(AppError::new(
            ErrorCode::PhotoCountOutOfRange,
            format!("must upload {MIN_PHOTOS}-{MAX_PHOTOS} {what}"),
        ));
    }
    Ok(())
}

/// Validate every extension up front, then write; a bad file fails the
/// request before anything lands on disk.
pub async fn save_all(
    store: &UploadStore,
    category: UploadCategory,
    files: &[&UploadedFile],
) -> AppResult<Vec<String>> {
    for file in files {
        UploadStore::validate_extension(category, &file.filename)
            .map_err(|e| AppError::new(ErrorCode::InvalidFileType, e))?;
    }

    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = store
            .save(category, &file.filename, &file.data)
            .await
            .map_err(|e| AppError::new(ErrorCode::UploadFailed, e))?;
        paths.push(path);
    }
    Ok(paths)
}

/// Best-effort cleanup for replace-all flows; a missing file is fine.
pub async fn delete_all(store: &UploadStore, paths: &[String]) {
    for path in paths {
        if let Err(e) = store.delete(path).await {
            tracing::warn!(path = %path, error = %e, "failed to delete replaced upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_count_bounds() {
        assert!(validate_photo_count(0, "photos").is_err());
        assert!(validate_photo_count(1, "photos").is_ok());
        assert!(validate_photo_count(5, "photos").is_ok());
        assert!(validate_photo_count(6, "photos").is_err());
    }

    #[test]
    fn files_named_preserves_arrival_order() {
        let form = MultipartForm {
            texts: HashMap::new(),
            files: vec![
                UploadedFile { field_name: "photos".into(), filename: "a.jpg".into(), data: vec![] },
                UploadedFile { field_name: "audio_clip".into(), filename: "c.mp3".into(), data: vec![] },
                UploadedFile { field_name: "photos".into(), filename: "b.jpg".into(), data: vec![] },
            ],
        };

        let photos = form.files_named("photos");
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].filename, "a.jpg");
        assert_eq!(photos[1].filename, "b.jpg");
        assert_eq!(form.file_named("audio_clip").unwrap().filename, "c.mp3");
    }

    #[tokio::test]
    async fn save_all_rejects_batch_with_bad_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        store.init().await.unwrap();

        let good = UploadedFile { field_name: "photos".into(), filename: "a.jpg".into(), data: vec![1] };
        let bad = UploadedFile { field_name: "photos".into(), filename: "b.tiff".into(), data: vec![2] };

        let result = save_all(&store, UploadCategory::ProfilePhoto, &[&good, &bad]).await;
        assert!(result.is_err());

        // nothing written for the rejected batch
        let mut entries = tokio::fs::read_dir(dir.path().join("profiles")).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
