use flate2::read::GzDecoder;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::normalize::normalize;

pub const JSON_NAME: &str = "agg_data.json";
pub const ARCHIVE_NAME: &str = "agg_data.tar.gz";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no dataset at {0} and no archive URL configured")]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not read archive {path}: {source}")]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("archive {path} does not contain {member}")]
    MissingMember { path: PathBuf, member: String },
    #[error("invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset has no \"{channel}\" channel in {section}")]
    MissingChannel {
        section: &'static str,
        channel: String,
    },
}

/// Where the dataset lives on disk and, optionally, where to fetch it from.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    /// Extracted JSON. Used as-is when present.
    pub json_path: PathBuf,
    /// Compressed tarball holding `agg_data.json`.
    pub archive_path: PathBuf,
    /// Remote tarball, downloaded into `archive_path` when nothing is cached.
    pub archive_url: Option<String>,
}

impl DataSource {
    /// Standard file names inside `dir`.
    pub fn in_dir(dir: &Path, archive_url: Option<String>) -> Self {
        Self {
            json_path: dir.join(JSON_NAME),
            archive_path: dir.join(ARCHIVE_NAME),
            archive_url,
        }
    }

    /// A user-supplied path: `.json` is read directly, anything else is the archive.
    pub fn from_path(path: &Path) -> Self {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if path.extension() == Some(OsStr::new("json")) {
            Self {
                json_path: path.to_path_buf(),
                archive_path: dir.join(ARCHIVE_NAME),
                archive_url: None,
            }
        } else {
            Self {
                json_path: dir.join(JSON_NAME),
                archive_path: path.to_path_buf(),
                archive_url: None,
            }
        }
    }

    fn needs_download(&self) -> bool {
        !self.json_path.exists() && !self.archive_path.exists() && self.archive_url.is_some()
    }

    /// Whether the JSON can be rebuilt after being removed.
    pub fn can_refresh(&self) -> bool {
        self.archive_path.exists() || self.archive_url.is_some()
    }
}

/// Per-user cache directory for downloaded and extracted data.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sharescope")
}

/// Fetch (if needed), extract (if needed), parse, validate and normalize.
pub async fn load(source: DataSource) -> Result<Dataset, LoadError> {
    if source.needs_download() {
        if let Some(url) = &source.archive_url {
            download(url, &source.archive_path).await?;
        }
    }
    load_local(&source)
}

/// Same as [`load`] but never touches the network.
pub fn load_local(source: &DataSource) -> Result<Dataset, LoadError> {
    if !source.json_path.exists() {
        if !source.archive_path.exists() {
            return Err(LoadError::NotFound(source.json_path.clone()));
        }
        if let Err(e) = unpack_dataset(source) {
            if matches!(e, LoadError::Archive { .. } | LoadError::MissingMember { .. }) {
                discard_bad_download(source);
            }
            return Err(e);
        }
    }
    read_dataset(&source.json_path)
}

/// A downloaded archive that fails to extract is dropped so the next load
/// fetches it again. Local archives are left alone.
fn discard_bad_download(source: &DataSource) {
    if source.archive_url.is_none() {
        return;
    }
    match fs::remove_file(&source.archive_path) {
        Ok(()) => warn!(path = %source.archive_path.display(), "discarded unreadable archive"),
        Err(e) => warn!(path = %source.archive_path.display(), "could not discard archive: {e}"),
    }
}

/// Drop the extracted JSON so the next load re-extracts it.
pub fn invalidate(source: &DataSource) -> Result<(), LoadError> {
    if source.can_refresh() && source.json_path.exists() {
        fs::remove_file(&source.json_path)?;
        info!(path = %source.json_path.display(), "removed cached dataset");
    }
    Ok(())
}

pub fn read_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let contents = fs::read_to_string(path)?;
    let mut ds = Dataset::from_json(&contents)?;
    ds.validate()?;
    normalize(&mut ds);
    info!(
        path = %path.display(),
        channels = ?ds.channels(),
        "dataset loaded"
    );
    Ok(ds)
}

/// Extract the archive and move `agg_data.json` to `json_path`.
fn unpack_dataset(source: &DataSource) -> Result<(), LoadError> {
    let dest = source
        .json_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dest)?;
    let extracted = extract_archive(&source.archive_path, &dest, JSON_NAME)?;
    if extracted != source.json_path {
        fs::rename(&extracted, &source.json_path)?;
        // Drop the directories the nested member came in, up to `dest`.
        let mut dir = extracted.parent();
        while let Some(d) = dir.filter(|d| *d != dest.as_path() && d.starts_with(&dest)) {
            if fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
    }
    Ok(())
}

/// Unpack every `.json` member of a gzipped tarball into `dest`.
///
/// Returns the extracted path of `member`. Members whose path would land
/// outside `dest` are skipped.
pub fn extract_archive(archive: &Path, dest: &Path, member: &str) -> Result<PathBuf, LoadError> {
    let archive_err = |source: std::io::Error| LoadError::Archive {
        path: archive.to_path_buf(),
        source,
    };

    info!(archive = %archive.display(), dest = %dest.display(), "extracting dataset");
    let file = File::open(archive).map_err(archive_err)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut found = None;
    for entry in tarball.entries().map_err(archive_err)? {
        let mut entry = entry.map_err(archive_err)?;
        let path = entry.path().map_err(archive_err)?.into_owned();
        if path.extension() != Some(OsStr::new("json")) {
            debug!(member = %path.display(), "skipping non-JSON member");
            continue;
        }
        if !entry.unpack_in(dest).map_err(archive_err)? {
            warn!(member = %path.display(), "refusing to unpack member outside destination");
            continue;
        }
        if path.file_name() == Some(OsStr::new(member)) {
            found = Some(dest.join(&path));
        }
    }

    found.ok_or_else(|| LoadError::MissingMember {
        path: archive.to_path_buf(),
        member: member.to_string(),
    })
}

async fn download(url: &str, dest: &Path) -> Result<(), LoadError> {
    info!(%url, "downloading dataset archive");
    let bytes = reqwest::get(url).await?.error_for_status()?.bytes().await?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    // Write beside the target first so a failed transfer never looks cached.
    let partial = dest.with_extension("part");
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, dest)?;
    info!(bytes = bytes.len(), path = %dest.display(), "archive saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::SAMPLE_JSON;
    use crate::dataset::BETA;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_archive(path: &Path, members: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(JSON_NAME), SAMPLE_JSON).unwrap();
        let ds = load_local(&DataSource::in_dir(dir.path(), None)).unwrap();
        // Loaded datasets come back normalized.
        assert!(ds.graphics(BETA).unwrap().gfxs.contains_key("Advanced Micro Devices, Inc. [AMD/ATI]"));
    }

    #[test]
    fn test_extracts_archive_when_json_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            &dir.path().join(ARCHIVE_NAME),
            &[("README.txt", b"hello"), (JSON_NAME, SAMPLE_JSON.as_bytes())],
        );
        let source = DataSource::in_dir(dir.path(), None);
        let ds = load_local(&source).unwrap();
        assert_eq!(ds.summary().release_users, 1000.0);
        assert!(source.json_path.exists());
        assert!(!dir.path().join("README.txt").exists());
    }

    #[test]
    fn test_nested_member_moved_into_place() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            &dir.path().join(ARCHIVE_NAME),
            &[("data/agg_data.json", SAMPLE_JSON.as_bytes())],
        );
        let source = DataSource::in_dir(dir.path(), None);
        load_local(&source).unwrap();
        assert!(source.json_path.exists());
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_nested_dir_kept_when_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            &dir.path().join(ARCHIVE_NAME),
            &[("data/agg_data.json", SAMPLE_JSON.as_bytes()), ("data/extra.json", b"{}")],
        );
        let source = DataSource::in_dir(dir.path(), None);
        load_local(&source).unwrap();
        assert!(dir.path().join("data").join("extra.json").exists());
    }

    #[test]
    fn test_member_escaping_destination_skipped() {
        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("cache");
        fs::create_dir(&dest).unwrap();
        let archive = dest.join(ARCHIVE_NAME);

        let file = File::create(&archive).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let evil = b"{}";
        let mut header = tar::Header::new_gnu();
        let name = b"../escape.json";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(evil.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &evil[..]).unwrap();
        let mut header = tar::Header::new_gnu();
        header.set_size(SAMPLE_JSON.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, JSON_NAME, SAMPLE_JSON.as_bytes()).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let extracted = extract_archive(&archive, &dest, JSON_NAME).unwrap();
        assert_eq!(extracted, dest.join(JSON_NAME));
        assert!(extracted.exists());
        assert!(!root.path().join("escape.json").exists());
    }

    #[test]
    fn test_unreadable_download_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource::in_dir(dir.path(), Some("https://example.invalid/a.tar.gz".into()));
        fs::write(&source.archive_path, b"<html>503</html>").unwrap();
        assert!(!source.needs_download());

        let err = load_local(&source).unwrap_err();
        assert!(matches!(err, LoadError::Archive { .. }));
        assert!(!source.archive_path.exists());
        assert!(source.needs_download());
    }

    #[test]
    fn test_archive_without_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join(ARCHIVE_NAME), &[("other.json", b"{}")]);
        let err = load_local(&DataSource::in_dir(dir.path(), None)).unwrap_err();
        assert!(matches!(err, LoadError::MissingMember { .. }));
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(ARCHIVE_NAME), b"definitely not gzip").unwrap();
        let err = load_local(&DataSource::in_dir(dir.path(), None)).unwrap_err();
        assert!(matches!(err, LoadError::Archive { .. }));
        // No URL to fetch it again, so the user's file stays put.
        assert!(dir.path().join(ARCHIVE_NAME).exists());
    }

    #[test]
    fn test_nothing_available() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource::in_dir(dir.path(), None);
        assert!(matches!(load_local(&source), Err(LoadError::NotFound(_))));
        assert!(!source.needs_download());
        let remote = DataSource::in_dir(dir.path(), Some("https://example.invalid/a.tar.gz".into()));
        assert!(remote.needs_download());
    }

    #[test]
    fn test_invalidate_only_when_refreshable() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource::in_dir(dir.path(), None);
        fs::write(&source.json_path, SAMPLE_JSON).unwrap();
        invalidate(&source).unwrap();
        assert!(source.json_path.exists(), "sole copy must be kept");

        write_archive(&source.archive_path, &[(JSON_NAME, SAMPLE_JSON.as_bytes())]);
        invalidate(&source).unwrap();
        assert!(!source.json_path.exists());
        load_local(&source).unwrap();
        assert!(source.json_path.exists());
    }

    #[test]
    fn test_from_path() {
        let json = DataSource::from_path(Path::new("/tmp/x/data.json"));
        assert_eq!(json.json_path, PathBuf::from("/tmp/x/data.json"));
        let archive = DataSource::from_path(Path::new("/tmp/x/dump.tgz"));
        assert_eq!(archive.archive_path, PathBuf::from("/tmp/x/dump.tgz"));
        assert_eq!(archive.json_path, PathBuf::from("/tmp/x").join(JSON_NAME));
    }

    #[test]
    fn test_missing_channel_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(JSON_NAME);
        fs::write(&path, r#"{"platforms": {"release": {"total": 1}}, "graphics": {}}"#).unwrap();
        assert!(matches!(read_dataset(&path), Err(LoadError::MissingChannel { .. })));
    }
}
