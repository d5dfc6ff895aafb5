//! Saving exported feedback reports to disk.
//!
//! The server picks the filename, so it is sanitized and confined to the
//! configured download directory before anything is written.

use crate::api::{ApiError, ApiResult, ExportedReport};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

const MAX_FILENAME_BYTES: usize = 255;
const MAX_SUFFIX: usize = 1000;

/// Strip directory components, control characters and leading dots.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    // Backslash is a legal filename character on Unix, so split on it by hand
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .filter(|c| !c.is_control() && *c != ':')
        .collect();
    let sanitized = sanitized.trim().trim_start_matches('.');
    if sanitized.is_empty() {
        return None;
    }

    let mut end = sanitized.len().min(MAX_FILENAME_BYTES);
    while !sanitized.is_char_boundary(end) {
        end -= 1;
    }
    Some(sanitized[..end].to_string())
}

/// Paths to try for `filename` inside `dir`: the sanitized name first, then
/// the same name with a numeric suffix. `None` when the name is unusable.
pub fn download_candidates(dir: &Path, filename: &str) -> Option<Vec<PathBuf>> {
    let sanitized = sanitize_filename(filename)?;
    let first = dir.join(&sanitized);
    if !first.starts_with(dir) {
        return None;
    }

    let as_path = Path::new(&sanitized);
    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    let ext = as_path.extension().and_then(|s| s.to_str());
    let suffixed = (1..MAX_SUFFIX).map(|i| match ext {
        Some(ext) => dir.join(format!("{}_{}.{}", stem, i, ext)),
        None => dir.join(format!("{}_{}", stem, i)),
    });
    Some(std::iter::once(first).chain(suffixed).collect())
}

/// Create the first candidate that does not exist yet. Creation is atomic,
/// so an existing file is never opened, let alone overwritten.
async fn create_unique(candidates: &[PathBuf]) -> std::io::Result<Option<(File, PathBuf)>> {
    for path in candidates {
        match OpenOptions::new().write(true).create_new(true).open(path).await {
            Ok(file) => return Ok(Some((file, path.clone()))),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

fn fallback_name(feedback_id: u64, report: &ExportedReport) -> String {
    match report {
        ExportedReport::Text(_) => format!("feedback-{}.txt", feedback_id),
        ExportedReport::Binary(_) => format!("feedback-{}.pdf", feedback_id),
    }
}

/// Write a report returned by the export endpoint into `dir` and return
/// where it landed.
pub async fn save_report(dir: &Path, feedback_id: u64, report: &ExportedReport) -> ApiResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let fallback = fallback_name(feedback_id, report);
    let requested = match report {
        ExportedReport::Text(payload) => payload.filename.as_str(),
        ExportedReport::Binary(_) => fallback.as_str(),
    };
    let mut created = None;
    for name in [requested, fallback.as_str()] {
        let Some(candidates) = download_candidates(dir, name) else {
            continue;
        };
        created = create_unique(&candidates).await?;
        if created.is_some() {
            break;
        }
    }
    let (mut file, path) = created.ok_or_else(|| {
        ApiError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free filename for {}", fallback),
        ))
    })?;

    let bytes = match report {
        ExportedReport::Text(payload) => payload.content.as_bytes(),
        ExportedReport::Binary(bytes) => bytes.as_slice(),
    };
    file.write_all(bytes).await?;
    file.flush().await?;
    info!(feedback_id, path = %path.display(), "feedback exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ExportPayload;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("feedback-3.txt"), Some("feedback-3.txt".into()));
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd".into()));
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), Some("boot.ini".into()));
        assert_eq!(sanitize_filename(".hidden"), Some("hidden".into()));
        assert_eq!(sanitize_filename("a:b\u{7}.txt"), Some("ab.txt".into()));
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename("dir/"), None);

        let long = "é".repeat(200);
        let cut = sanitize_filename(&long).unwrap();
        assert!(cut.len() <= MAX_FILENAME_BYTES);
    }

    #[test]
    fn test_candidates_add_numeric_suffix() {
        let dir = Path::new("/downloads");
        let candidates = download_candidates(dir, "../report.txt").unwrap();
        assert_eq!(candidates[0], dir.join("report.txt"));
        assert_eq!(candidates[1], dir.join("report_1.txt"));
        assert_eq!(download_candidates(dir, "README").unwrap()[2], dir.join("README_2"));
        assert!(download_candidates(dir, "..").is_none());
    }

    #[tokio::test]
    async fn test_existing_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("feedback-7.txt"), "old").unwrap();
        std::fs::write(dir.path().join("feedback-7_1.txt"), "older").unwrap();
        let report = ExportedReport::Text(ExportPayload {
            content: "new".into(),
            filename: "feedback-7.txt".into(),
        });

        let path = save_report(dir.path(), 7, &report).await.unwrap();
        assert_eq!(path, dir.path().join("feedback-7_2.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("feedback-7.txt")).unwrap(),
            "old"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("feedback-7_1.txt")).unwrap(),
            "older"
        );
    }

    #[tokio::test]
    async fn test_save_text_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = ExportedReport::Text(ExportPayload {
            content: "Feedback Report\n".into(),
            filename: "../feedback-7.txt".into(),
        });
        let path = save_report(dir.path(), 7, &report).await.unwrap();
        assert_eq!(path, dir.path().join("feedback-7.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Feedback Report\n");
    }

    #[tokio::test]
    async fn test_save_binary_report_and_bad_name_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = ExportedReport::Binary(b"%PDF-1.4".to_vec());
        let path = save_report(dir.path(), 2, &pdf).await.unwrap();
        assert_eq!(path, dir.path().join("feedback-2.pdf"));

        let odd = ExportedReport::Text(ExportPayload {
            content: "x".into(),
            filename: "..".into(),
        });
        let path = save_report(dir.path(), 5, &odd).await.unwrap();
        assert_eq!(path, dir.path().join("feedback-5.txt"));
    }
}
