use crate::harvester::Result;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// On-disk layout: one flat directory of images, one of metadata documents
#[derive(Debug, Clone)]
pub struct Storage {
    images_dir: PathBuf,
    metadata_dir: PathBuf,
}

impl Storage {
    pub fn new(images_dir: impl Into<PathBuf>, metadata_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            metadata_dir: metadata_dir.into(),
        }
    }

    #[must_use]
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    #[must_use]
    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    /// Create both directories if they don't exist
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.images_dir).await?;
        tokio::fs::create_dir_all(&self.metadata_dir).await?;
        Ok(())
    }

    #[must_use]
    pub fn metadata_path(&self, index: u64) -> PathBuf {
        self.metadata_dir.join(format!("{index}.json"))
    }

    /// `ext` carries its leading dot, or is empty
    #[must_use]
    pub fn image_path(&self, index: u64, ext: &str) -> PathBuf {
        self.images_dir.join(format!("{index}{ext}"))
    }

    /// Write a metadata document pretty-printed with 4-space indentation,
    /// replacing any previous copy
    pub async fn write_metadata(&self, index: u64, metadata: &Value) -> Result<PathBuf> {
        let path = self.metadata_path(index);
        write_file(&path, &to_pretty_json(metadata)?).await?;
        Ok(path)
    }

    /// Write raw image bytes
    pub async fn write_image(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        write_file(path, bytes).await
    }
}

fn to_pretty_json(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}
