//! Local cache of the static schedule archive.
//!
//! The archive is downloaded into `<cache-dir>/<archive stem>/` and
//! extracted there. A later start reuses the extracted tables while
//! `feed_info.txt` is younger than [`MAX_ARCHIVE_AGE`].

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, bail};
use tracing::info;
use zip::ZipArchive;

pub const MAX_ARCHIVE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const FRESHNESS_MARKER: &str = "feed_info.txt";

/// Directory name for an archive URL: the last path segment without its extension
pub fn archive_stem(url: &str) -> anyhow::Result<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file_name = path.rsplit('/').next().unwrap_or_default();
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    if stem.is_empty() {
        bail!("Cannot derive an archive name from {url}");
    }
    Ok(stem.to_string())
}

/// Whether `dir` holds an extraction younger than `max_age` at `now`
pub fn is_fresh(dir: &Path, now: SystemTime, max_age: Duration) -> bool {
    let Ok(modified) = fs::metadata(dir.join(FRESHNESS_MARKER)).and_then(|meta| meta.modified())
    else {
        return false;
    };

    match now.duration_since(modified) {
        Ok(age) => age <= max_age,
        // Written after `now`, so certainly recent
        Err(_) => true,
    }
}

/// Unpack a zip archive held in memory into `dir`
///
/// Entries are written with fresh timestamps, which keeps the freshness check
/// tied to the time of download. Entries escaping `dir` are skipped.
pub fn extract(bytes: &[u8], dir: &Path) -> anyhow::Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("Invalid schedule archive")?;
    fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let target = dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)
            .with_context(|| format!("Cannot write {}", target.display()))?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    Ok(written)
}

/// Make sure a fresh extraction of the archive at `url` exists under `cache_dir`
///
/// Returns the directory holding the extracted tables.
pub async fn fetch_and_extract(
    client: &reqwest::Client,
    url: &str,
    cache_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let dir = cache_dir.join(archive_stem(url)?);

    if is_fresh(&dir, SystemTime::now(), MAX_ARCHIVE_AGE) {
        info!("Schedule archive at {} is less than 1 day old", dir.display());
        return Ok(dir);
    }

    info!("Updating schedule archive from {url}");
    let bytes = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|| format!("Cannot download {url}"))?
        .bytes()
        .await
        .with_context(|| format!("Cannot download {url}"))?;

    let target = dir.clone();
    let written = tokio::task::spawn_blocking(move || extract(&bytes, &target)).await??;
    info!("Extracted {written} files into {}", dir.display());

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_archive_stem() {
        assert_eq!(archive_stem("https://data.example/gtfs/sweden.zip").unwrap(), "sweden");
        assert_eq!(
            archive_stem("https://data.example/gtfs/sweden.zip?key=secret").unwrap(),
            "sweden"
        );
        assert!(archive_stem("https://data.example/").is_err());
    }

    #[test]
    fn test_extract_then_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("sweden");
        let bytes = archive(&[
            ("feed_info.txt", "feed_publisher_name\nExample\n"),
            ("stops.txt", "stop_id\nS\n"),
        ]);

        assert!(!is_fresh(&target, SystemTime::now(), MAX_ARCHIVE_AGE));
        assert_eq!(extract(&bytes, &target).unwrap(), 2);
        assert_eq!(fs::read_to_string(target.join("stops.txt")).unwrap(), "stop_id\nS\n");

        assert!(is_fresh(&target, SystemTime::now(), MAX_ARCHIVE_AGE));
        let tomorrow = SystemTime::now() + MAX_ARCHIVE_AGE + Duration::from_secs(60);
        assert!(!is_fresh(&target, tomorrow, MAX_ARCHIVE_AGE));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        assert!(extract(b"not a zip", dir.path()).is_err());
    }
}
