use crate::harvester::{HarvestError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};
use walkdir::WalkDir;

/// `{index}.{ext}` for the image types a previous run may have left behind
static IMAGE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\.(jpe?g|png|gif|webp|bmp|svg|tiff?|avif|ico)$")
        .expect("image file pattern is valid")
});

/// Persisted resume cursor.
///
/// The file holds the last completed index as decimal text. Once the file
/// exists it is the only source trusted for resuming; the images directory
/// is only scanned to bootstrap a first run.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last completed index, `None` if no cursor has been written yet
    pub async fn read(&self) -> Result<Option<u64>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        raw.trim().parse::<u64>().map(Some).map_err(|e| {
            HarvestError::Cursor(format!(
                "{} does not hold an index ({:?}): {e}",
                self.path.display(),
                raw.trim()
            ))
        })
    }

    /// Record `index` as the last completed index
    pub async fn write(&self, index: u64) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, index.to_string()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Last completed index: cursor file, else highest image on disk, else 0
    pub async fn last_completed(&self, images_dir: &Path) -> Result<u64> {
        if let Some(index) = self.read().await? {
            debug!("Resuming from cursor file {}: {}", self.path.display(), index);
            return Ok(index);
        }

        let scanned = highest_image_index(images_dir).unwrap_or(0);
        info!(
            "No cursor at {}, bootstrapped from {}: {}",
            self.path.display(),
            images_dir.display(),
            scanned
        );
        Ok(scanned)
    }

    /// First index this run should fetch
    pub async fn resume_index(&self, images_dir: &Path) -> Result<u64> {
        Ok(self.last_completed(images_dir).await?.saturating_add(1))
    }
}

/// Highest numeric filename prefix among image files directly in `dir`
pub fn highest_image_index(dir: &Path) -> Option<u64> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_string();
            IMAGE_FILE
                .captures(&name)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_highest_index() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        for i in 1..=12 {
            File::create(dir.join(format!("{i}.png"))).unwrap();
        }

        assert_eq!(highest_image_index(dir), Some(12));
    }

    #[test]
    fn test_scan_ignores_non_images() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        File::create(dir.join("3.jpg")).unwrap();
        File::create(dir.join("99.json")).unwrap();
        File::create(dir.join("100")).unwrap();
        File::create(dir.join("cover.png")).unwrap();
        fs::create_dir(dir.join("500.png")).unwrap();

        assert_eq!(highest_image_index(dir), Some(3));
    }

    #[test]
    fn test_scan_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        let nested = dir.join("old");
        fs::create_dir(&nested).unwrap();
        File::create(nested.join("50.png")).unwrap();
        File::create(dir.join("2.GIF")).unwrap();

        assert_eq!(highest_image_index(dir), Some(2));
    }

    #[test]
    fn test_scan_empty_or_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(highest_image_index(temp_dir.path()), None);
        assert_eq!(highest_image_index(&temp_dir.path().join("missing")), None);
    }

    #[tokio::test]
    async fn test_write_is_exact_decimal() {
        let temp_dir = TempDir::new().unwrap();
        let store = CursorStore::new(temp_dir.path().join("cursor.txt"));

        store.write(41).await.unwrap();
        store.write(42).await.unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "42");
        assert_eq!(store.read().await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_resume_from_scan_without_cursor() {
        let temp_dir = TempDir::new().unwrap();
        let images = temp_dir.path().join("images");
        fs::create_dir(&images).unwrap();
        for i in 1..=7 {
            File::create(images.join(format!("{i}.png"))).unwrap();
        }

        let store = CursorStore::new(temp_dir.path().join("cursor.txt"));
        assert_eq!(store.resume_index(&images).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_cursor_file_wins_over_scan() {
        let temp_dir = TempDir::new().unwrap();
        let images = temp_dir.path().join("images");
        fs::create_dir(&images).unwrap();
        File::create(images.join("90.png")).unwrap();

        let store = CursorStore::new(temp_dir.path().join("cursor.txt"));
        fs::write(store.path(), "10\n").unwrap();

        assert_eq!(store.resume_index(&images).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_fresh_start_is_one() {
        let temp_dir = TempDir::new().unwrap();
        let store = CursorStore::new(temp_dir.path().join("cursor.txt"));

        assert_eq!(store.resume_index(temp_dir.path()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_cursor_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = CursorStore::new(temp_dir.path().join("cursor.txt"));
        fs::write(store.path(), "twelve").unwrap();

        let err = store.read().await.unwrap_err();
        assert!(matches!(err, HarvestError::Cursor(_)));
    }
}
