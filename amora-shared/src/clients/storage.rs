use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Where an uploaded file belongs. Each category maps to its own
/// subdirectory under the upload root and carries its own extension
/// allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCategory {
    ProfilePhoto,
    ExampleImage,
    IdealPartnerPhoto,
    AudioClip,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];

impl UploadCategory {
    pub fn subdir(&self) -> &'static str {
        match self {
            Self::ProfilePhoto => "profiles",
            Self::ExampleImage => "expectations",
            Self::IdealPartnerPhoto => "ideal_partners",
            Self::AudioClip => "audio",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::AudioClip => AUDIO_EXTENSIONS,
            _ => IMAGE_EXTENSIONS,
        }
    }
}

/// Disk-backed upload store. Files are written under a category
/// subdirectory with a generated unique name; the returned relative path
/// is what gets persisted in the database, never the bytes.
#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload root and all category subdirectories.
    pub async fn init(&self) -> Result<(), String> {
        for category in [
            UploadCategory::ProfilePhoto,
            UploadCategory::ExampleImage,
            UploadCategory::IdealPartnerPhoto,
            UploadCategory::AudioClip,
        ] {
            let dir = self.root.join(category.subdir());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| format!("failed to create upload dir {}: {e}", dir.display()))?;
        }

        tracing::info!(root = %self.root.display(), "upload store initialized");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored relative path to its location on disk.
    pub fn absolute(&self, stored_path: &str) -> PathBuf {
        self.root.join(stored_path)
    }

    /// Check the original filename against the category allow-list and
    /// return its lowercased extension.
    pub fn validate_extension(category: UploadCategory, filename: &str) -> Result<String, String> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| format!("file has no extension: {filename}"))?;

        if !category.allowed_extensions().contains(&ext.as_str()) {
            return Err(format!(
                "invalid file type .{ext}, accepted: {}",
                category.allowed_extensions().join(", ")
            ));
        }

        Ok(ext)
    }

    /// Write the bytes under a freshly generated unique name and return the
    /// relative path to persist.
    pub async fn save(
        &self,
        category: UploadCategory,
        original_filename: &str,
        data: &[u8],
    ) -> Result<String, String> {
        let ext = Self::validate_extension(category, original_filename)?;
        let stored_path = format!("{}/{}.{ext}", category.subdir(), Uuid::new_v4());

        let target = self.root.join(&stored_path);
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| format!("failed to write {}: {e}", target.display()))?;

        tracing::debug!(path = %stored_path, bytes = data.len(), "upload saved");
        Ok(stored_path)
    }

    /// Remove a previously stored file. Missing files are not an error:
    /// replace-all flows must stay idempotent.
    pub async fn delete(&self, stored_path: &str) -> Result<(), String> {
        let target = self.root.join(stored_path);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("failed to delete {}: {e}", target.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, UploadStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        store.init().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn save_writes_under_category_subdir() {
        let (_dir, store) = store().await;

        let path = store
            .save(UploadCategory::ProfilePhoto, "me.JPG", b"fake-jpeg")
            .await
            .unwrap();

        assert!(path.starts_with("profiles/"));
        assert!(path.ends_with(".jpg"));
        assert_eq!(tokio::fs::read(store.absolute(&path)).await.unwrap(), b"fake-jpeg");
    }

    #[tokio::test]
    async fn saved_names_are_unique() {
        let (_dir, store) = store().await;

        let a = store.save(UploadCategory::ExampleImage, "a.png", b"1").await.unwrap();
        let b = store.save(UploadCategory::ExampleImage, "a.png", b"2").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected() {
        let (_dir, store) = store().await;

        assert!(store.save(UploadCategory::ProfilePhoto, "evil.exe", b"x").await.is_err());
        assert!(store.save(UploadCategory::ProfilePhoto, "noext", b"x").await.is_err());
        assert!(store.save(UploadCategory::AudioClip, "clip.png", b"x").await.is_err());
        assert!(store.save(UploadCategory::AudioClip, "clip.mp3", b"x").await.is_ok());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = store().await;

        let path = store.save(UploadCategory::IdealPartnerPhoto, "p.webp", b"x").await.unwrap();
        store.delete(&path).await.unwrap();
        assert!(!store.absolute(&path).exists());
        store.delete(&path).await.unwrap();
    }
}
