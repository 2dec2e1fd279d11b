//! Where the GTFS tables are read from.
//!
//! A feed can be given as an extracted directory, a local `.zip` archive or
//! an `http(s)` URL of one. Archives are unpacked into a temporary directory
//! that lives as long as the returned [`FeedTables`].

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Directory(PathBuf),
    Archive(PathBuf),
    Url(String),
}

impl FeedSource {
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            return Self::Url(input.to_string());
        }

        let path = PathBuf::from(input);
        let is_zip = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("zip"));
        if is_zip {
            Self::Archive(path)
        } else {
            Self::Directory(path)
        }
    }
}

/// Directory holding the tables of an opened feed
#[derive(Debug)]
pub struct FeedTables {
    root: PathBuf,
    _extracted: Option<TempDir>,
}

impl FeedTables {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

pub fn open(source: &FeedSource) -> Result<FeedTables> {
    match source {
        FeedSource::Directory(path) => {
            if !path.is_dir() {
                bail!("Input directory does not exist: {}", path.display());
            }
            Ok(FeedTables {
                root: path.clone(),
                _extracted: None,
            })
        }
        FeedSource::Archive(path) => {
            let file =
                File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
            unpack(file)
        }
        FeedSource::Url(url) => {
            log::info!("Downloading {url}");
            let bytes = reqwest::blocking::get(url)
                .and_then(reqwest::blocking::Response::error_for_status)
                .and_then(reqwest::blocking::Response::bytes)
                .with_context(|| format!("Cannot download {url}"))?;
            log::debug!("Downloaded {} bytes", bytes.len());
            unpack(Cursor::new(bytes))
        }
    }
}

fn unpack(reader: impl Read + Seek) -> Result<FeedTables> {
    let mut archive = ZipArchive::new(reader).context("Invalid GTFS archive")?;
    let dir = TempDir::new()?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        // Tables sit at the top level of a GTFS archive
        if entry.is_dir() || relative.components().count() != 1 {
            continue;
        }

        let mut out = File::create(dir.path().join(&relative))?;
        io::copy(&mut entry, &mut out)?;
    }
    log::info!("Unpacked {} archive entries", archive.len());

    Ok(FeedTables {
        root: dir.path().to_path_buf(),
        _extracted: Some(dir),
    })
}

/// Whether writing to `output` would clobber the feed's own stops.txt
pub fn overwrites_input(source: &FeedSource, output: &Path) -> bool {
    match source {
        FeedSource::Directory(root) => {
            let input = root.join("stops.txt");
            match (fs::canonicalize(&input), fs::canonicalize(output)) {
                (Ok(input), Ok(output)) => input == output,
                _ => input == output,
            }
        }
        FeedSource::Archive(_) | FeedSource::Url(_) => false,
    }
}
