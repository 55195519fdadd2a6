//! Input resolution: turn the image directory into an ordered task list.
//!
//! The listing is non-recursive and sorted by file name, so two runs over
//! the same directory produce the same task order and the checkpoint lines
//! up with the batch it came from.

use crate::error::PublishError;
use crate::output::UploadTask;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

static RE_IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|webp|bmp)$").unwrap());

/// Check whether a file name carries a supported image extension.
pub fn is_image_file(name: &str) -> bool {
    RE_IMAGE_EXT.is_match(name)
}

/// MIME type sent with the multipart upload, derived from the extension.
pub fn mime_for(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    match lower.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// List the image files directly inside `dir`, sorted by file name.
pub fn scan_images(dir: &Path) -> Result<Vec<UploadTask>, PublishError> {
    if !dir.exists() {
        return Err(PublishError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(PublishError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| PublishError::ScanFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut tasks = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PublishError::ScanFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!("Skipping non UTF-8 file name: {}", path.display());
            continue;
        };
        if is_image_file(name) {
            tasks.push(UploadTask::new(name, path.clone()));
        }
    }

    if tasks.is_empty() {
        return Err(PublishError::NoImagesFound {
            path: dir.to_path_buf(),
        });
    }

    tasks.sort_by(|a, b| a.filename.cmp(&b.filename));
    info!("Found {} images in {}", tasks.len(), dir.display());
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file("a.png"));
        assert!(is_image_file("B.JPG"));
        assert!(is_image_file("c.jpeg"));
        assert!(is_image_file("d.webp"));
        assert!(!is_image_file("notes.txt"));
        assert!(!is_image_file("png"));
        assert!(!is_image_file("archive.png.zip"));
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("x.PNG"), "image/png");
        assert_eq!(mime_for("x.jpeg"), "image/jpeg");
        assert_eq!(mime_for("x"), "application/octet-stream");
    }

    #[test]
    fn scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.png", "a.jpg", "readme.md", "b.GIF"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let tasks = scan_images(dir.path()).unwrap();
        let names: Vec<&str> = tasks.iter().map(|t| t.filename.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.GIF", "c.png"]);
        assert_eq!(tasks[0].path, dir.path().join("a.jpg"));
    }

    #[test]
    fn scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            scan_images(&missing),
            Err(PublishError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn scan_file_instead_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            scan_images(&file),
            Err(PublishError::NotADirectory { .. })
        ));
    }

    #[test]
    fn scan_without_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert!(matches!(
            scan_images(dir.path()),
            Err(PublishError::NoImagesFound { .. })
        ));
    }
}
