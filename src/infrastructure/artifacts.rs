//! Screenshot artifacts
//!
//! Files land under one directory chosen by the caller; only the path
//! travels further into the records.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("file name pattern compiles"));

/// Replace each run of path-hostile characters with a single `_`.
pub fn sanitize_file_name(name: &str) -> String {
    UNSAFE_FILE_CHARS.replace_all(name, "_").into_owned()
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<parcel>.png`, or `<dir>/<parcel>_<n>.png` for the n-th extra record
    pub fn screenshot_path(&self, parcel_id: &str, sequence: usize) -> PathBuf {
        let name = if sequence == 0 {
            format!("{parcel_id}.png")
        } else {
            format!("{parcel_id}_{sequence}.png")
        };
        self.dir.join(sanitize_file_name(&name))
    }

    pub fn error_screenshot_path(&self, parcel_id: &str) -> PathBuf {
        self.dir.join(sanitize_file_name(&format!("error_{parcel_id}.png")))
    }

    /// Write PNG bytes, creating the directory on first use.
    pub async fn write(&self, path: &Path, png: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(path, png).await?;
        debug!("Saved screenshot {:?} ({} bytes)", path, png.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_collapses_runs() {
        assert_eq!(sanitize_file_name("12/34:56"), "12_34_56");
        assert_eq!(sanitize_file_name(r#"a\/:*?"<>|b.png"#), "a_b.png");
        assert_eq!(sanitize_file_name("27-117-21.png"), "27-117-21.png");
    }

    #[test]
    fn test_paths_are_sanitized_inside_dir() {
        let writer = ArtifactWriter::new("shots");
        assert_eq!(writer.screenshot_path("R 12/3", 0), PathBuf::from("shots/R 12_3.png"));
        assert_eq!(writer.screenshot_path("R1", 2), PathBuf::from("shots/R1_2.png"));
        assert_eq!(writer.error_screenshot_path("a|b"), PathBuf::from("shots/error_a_b.png"));
    }

    #[tokio::test]
    async fn test_write_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path().join("nested"));
        let path = writer.screenshot_path("P1", 0);
        writer.write(&path, b"\x89PNG").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
    }
}
