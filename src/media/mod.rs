//! Local media storage for uploaded recipe images.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use image::ImageFormat;

use crate::errors::AppError;

/// Directory (relative to the media root) recipe images are written to.
const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

/// Stores uploaded files under a root directory and maps them to public URLs.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate `bytes` as an image and store it under a fresh name.
    ///
    /// Returns the path relative to the media root.
    pub async fn save_recipe_image(&self, bytes: Vec<u8>) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::invalid_field(
                "image",
                "The submitted file is empty.",
            ));
        }

        let (format, bytes) = tokio::task::spawn_blocking(move || {
            let format = image::guess_format(&bytes)?;
            // Decode fully so truncated or corrupt files are rejected up front
            image::load_from_memory_with_format(&bytes, format)?;
            Ok::<_, image::ImageError>((format, bytes))
        })
        .await??;

        let extension = extension_for(format).ok_or_else(|| {
            AppError::invalid_field("image", "Unsupported image format.")
        })?;

        let relative = format!(
            "{}/{}.{}",
            RECIPE_IMAGE_DIR,
            uuid::Uuid::new_v4(),
            extension
        );
        let full_path = self.root.join(&relative);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, &bytes).await?;

        tracing::debug!("Stored recipe image at {}", full_path.display());
        Ok(relative)
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) -> Result<(), AppError> {
        let Some(full_path) = self.resolve(relative) else {
            tracing::warn!("Refusing to remove media path outside root: {}", relative);
            return Ok(());
        };

        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Public URL for a stored file.
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}{}", self.base_url, relative.trim_start_matches('/'))
    }

    /// Join a stored relative path onto the root, rejecting anything that escapes it.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        if path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            Some(self.root.join(path))
        } else {
            None
        }
    }
}

fn extension_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::WebP => Some("webp"),
        _ => None,
    }
}
