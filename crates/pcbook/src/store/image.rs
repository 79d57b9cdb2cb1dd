//! Disk-backed laptop image store.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use uuid::Uuid;

use super::StoreError;

const MAX_IMAGE_TYPE_LEN: usize = 16;

/// Where an uploaded image lives and what it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    /// Laptop the image was uploaded for
    pub laptop_id: String,
    /// File extension including the dot, e.g. ".jpg"
    pub image_type: String,
    /// Location of the image bytes
    pub path: PathBuf,
}

/// Storage for laptop images.
pub trait ImageStore: Send + Sync {
    /// Persist `data` and return the new image id.
    ///
    /// The record linking the image to its laptop is only registered once
    /// the bytes are fully written.
    fn save(&self, laptop_id: &str, image_type: &str, data: &[u8]) -> Result<String, StoreError>;

    /// Look up the record for an image id.
    fn find(&self, image_id: &str) -> Result<Option<ImageRecord>, StoreError>;
}

/// Stores each image as `<folder>/<image id><image type>`.
#[derive(Debug)]
pub struct DiskImageStore {
    folder: PathBuf,
    images: RwLock<HashMap<String, ImageRecord>>,
}

impl DiskImageStore {
    /// Create a store rooted at `folder`, creating it if needed.
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let folder = folder.into();
        fs::create_dir_all(&folder)?;
        Ok(Self {
            folder,
            images: RwLock::new(HashMap::new()),
        })
    }

    /// The folder images are written to.
    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

/// Accept "" or a dot followed by a short alphanumeric extension.
fn validate_image_type(image_type: &str) -> Result<(), StoreError> {
    if image_type.is_empty() {
        return Ok(());
    }
    let valid = image_type.len() <= MAX_IMAGE_TYPE_LEN
        && image_type
            .strip_prefix('.')
            .is_some_and(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidImageType(image_type.to_string()))
    }
}

impl ImageStore for DiskImageStore {
    fn save(&self, laptop_id: &str, image_type: &str, data: &[u8]) -> Result<String, StoreError> {
        validate_image_type(image_type)?;

        let image_id = Uuid::new_v4().to_string();
        let path = self.folder.join(format!("{image_id}{image_type}"));

        let mut file = fs::File::create_new(&path)?;
        let written = file.write_all(data).and_then(|()| file.sync_all());
        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %cleanup, "cannot remove partial image");
            }
            return Err(e.into());
        }

        self.images.write().insert(
            image_id.clone(),
            ImageRecord {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
                path,
            },
        );
        Ok(image_id)
    }

    fn find(&self, image_id: &str) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.images.read().get(image_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_save_writes_bytes_and_records_link() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path()).unwrap();

        let id = store.save("laptop-1", ".jpg", b"\xff\xd8image-bytes").unwrap();
        let record = store.find(&id).unwrap().unwrap();

        assert_eq!(record.laptop_id, "laptop-1");
        assert_eq!(record.image_type, ".jpg");
        assert_eq!(record.path, dir.path().join(format!("{id}.jpg")));
        assert_eq!(fs::read(&record.path).unwrap(), b"\xff\xd8image-bytes");
    }

    #[test]
    fn test_each_upload_gets_its_own_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path()).unwrap();

        let a = store.save("laptop-1", ".png", b"a").unwrap();
        let b = store.save("laptop-1", ".png", b"a").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("images").join("laptops");
        let store = DiskImageStore::new(&nested).unwrap();

        store.save("laptop-1", "", b"raw").unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_rejects_path_like_image_types() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path()).unwrap();

        for image_type in ["jpg", "./../x", "/etc/passwd", ".", ".j p g", ".verylongextension1"] {
            assert!(
                matches!(
                    store.save("laptop-1", image_type, b"x"),
                    Err(StoreError::InvalidImageType(_))
                ),
                "accepted {image_type:?}"
            );
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_write_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path().join("images")).unwrap();
        fs::remove_dir(store.folder()).unwrap();

        assert!(matches!(
            store.save("laptop-1", ".jpg", b"x"),
            Err(StoreError::Io(_))
        ));
        assert!(store.images.read().is_empty());
    }
}
