use std::{
    fmt, fs, io,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};

use chrono::{DateTime, Local};
use log::{error, info, warn};
use tracing::{Instrument, info_span};
use walkdir::WalkDir;

use crate::{
    config::ArchiverConfig,
    err,
    errors::{Error, Result},
    fail,
    storage::ObjectStore,
};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// A file discovered during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub absolute_path: PathBuf,
    /// Relative to the scan root, always `/`-separated.
    pub relative_path: String,
    pub last_modified: SystemTime,
}

impl FileRecord {
    pub fn read(root: &Path, path: &Path) -> Result<Self> {
        let last_modified = modified_time(path)?;

        Ok(FileRecord {
            absolute_path: path.to_path_buf(),
            relative_path: relative_path(root, path)?,
            last_modified,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    pub object_key: String,
}

impl UploadTarget {
    pub fn new(bucket: &str, record: &FileRecord, prefix: &str) -> Self {
        UploadTarget {
            bucket: bucket.to_string(),
            object_key: derive_key(&record.relative_path, prefix),
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.object_key)
    }
}

/// Counters for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub scanned: usize,
    pub fresh: usize,
    pub stale: usize,
    pub uploaded: usize,
    pub upload_failures: usize,
    pub deleted: usize,
    pub delete_failures: usize,
    pub skipped: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {}, fresh {}, stale {}, uploaded {}, upload failures {}, deleted {}, deletion failures {}, skipped {}",
            self.scanned,
            self.fresh,
            self.stale,
            self.uploaded,
            self.upload_failures,
            self.deleted,
            self.delete_failures,
            self.skipped
        )
    }
}

/// A file is stale when it was last modified strictly before `now - threshold_days`.
pub fn classify(last_modified: SystemTime, now: SystemTime, threshold_days: u64) -> Freshness {
    let cutoff = threshold_days
        .checked_mul(SECS_PER_DAY)
        .and_then(|secs| now.checked_sub(Duration::from_secs(secs)));

    match cutoff {
        Some(cutoff) if last_modified < cutoff => Freshness::Stale,
        // 阈值超出可表示的时间范围时，没有文件会被视为过期
        _ => Freshness::Fresh,
    }
}

/// Joins `prefix` and `relative_path` into an object key.
///
/// Separators are normalized to `/` and any leading `./` is removed, so the
/// result is stable whatever the host path convention is.
pub fn derive_key(relative_path: &str, prefix: &str) -> String {
    let joined = if prefix.is_empty() {
        relative_path.to_string()
    } else if prefix.ends_with(['/', '\\']) {
        format!("{prefix}{relative_path}")
    } else {
        format!("{prefix}/{relative_path}")
    };

    joined.replace('\\', "/").trim_start_matches("./").to_string()
}

/// Uploads one file and reports the outcome on the console.
pub async fn upload(store: &dyn ObjectStore, local_path: &Path, target: &UploadTarget) -> Result<()> {
    match store
        .put_object(&target.bucket, &target.object_key, local_path)
        .await
    {
        Ok(()) => {
            info!("Successfully uploaded {} to {target}", local_path.display());
            Ok(())
        }
        Err(e) => {
            error!("Error uploading {}: {e}", local_path.display());
            Err(e)
        }
    }
}

/// Removes the local copy of an uploaded file when deletion is enabled.
///
/// Returns whether the file was removed.
pub fn maybe_delete(local_path: &Path, delete_enabled: bool) -> Result<bool> {
    if !delete_enabled {
        return Ok(false);
    }

    match fs::remove_file(local_path) {
        Ok(()) => {
            info!("Successfully deleted local file: {}", local_path.display());
            Ok(true)
        }
        Err(source) => {
            let e = Error::Delete {
                path: local_path.display().to_string(),
                source,
            };
            error!("{e}");
            Err(e)
        }
    }
}

fn modified_time(path: &Path) -> Result<SystemTime> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::ScanRace(path.display().to_string()),
        _ => Error::Io(e),
    })?;

    Ok(metadata.modified()?)
}

fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| fail!("{} is not under {}", path.display(), root.display()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| Error::InvalidPathEncoding(path.display().to_string()))?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => return err!("unexpected component in relative path {}", relative.display()),
        }
    }

    Ok(parts.join("/"))
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub struct Archiver {
    config: ArchiverConfig,
    store: Arc<dyn ObjectStore>,
}

impl Archiver {
    pub fn new(config: ArchiverConfig, store: Arc<dyn ObjectStore>) -> Self {
        Archiver { config, store }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let span = info_span!("archive_run", bucket = %self.config.bucket_name);
        self.run_at(SystemTime::now()).instrument(span).await
    }

    /// Walks the source tree once, judging file ages against `now`.
    ///
    /// Only a missing source directory fails the run, every per-file error is
    /// logged and counted in the report.
    pub async fn run_at(&self, now: SystemTime) -> Result<RunReport> {
        let source = &self.config.source_directory;
        if !source.is_dir() {
            let e = Error::SourceNotFound(source.display().to_string());
            error!("{e}");
            return Err(e);
        }
        let root = fs::canonicalize(source)?;

        info!("Scanning directory: {}", root.display());
        info!(
            "Looking for files older than {} days.",
            self.config.age_threshold_days
        );
        info!(
            "Uploading to bucket: s3://{}/{}",
            self.config.bucket_name, self.config.destination_prefix
        );

        let mut report = RunReport::default();
        for entry in WalkDir::new(&root).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", Error::from(e));
                    report.skipped += 1;
                    continue;
                }
            };
            // 符号链接指向的目录同样跳过
            if entry.file_type().is_dir() || entry.path().is_dir() {
                continue;
            }
            report.scanned += 1;
            self.process(&root, entry.path(), now, &mut report).await;
        }

        info!("Archive run finished: {report}");
        Ok(report)
    }

    async fn process(&self, root: &Path, path: &Path, now: SystemTime, report: &mut RunReport) {
        let record = match FileRecord::read(root, path) {
            Ok(record) => record,
            Err(e @ Error::ScanRace(_)) => {
                warn!("{e}");
                report.skipped += 1;
                return;
            }
            Err(e) => {
                error!("Error processing file {}: {e}", path.display());
                report.skipped += 1;
                return;
            }
        };

        let last_modified = format_time(record.last_modified);
        match classify(record.last_modified, now, self.config.age_threshold_days) {
            Freshness::Fresh => {
                info!(
                    "Skipping recent file: {} (Last modified: {last_modified})",
                    path.display()
                );
                report.fresh += 1;
                return;
            }
            Freshness::Stale => {
                info!(
                    "Found old file: {} (Last modified: {last_modified})",
                    path.display()
                );
                report.stale += 1;
            }
        }

        let target = UploadTarget::new(
            &self.config.bucket_name,
            &record,
            &self.config.destination_prefix,
        );
        if upload(self.store.as_ref(), &record.absolute_path, &target)
            .await
            .is_err()
        {
            report.upload_failures += 1;
            return;
        }
        report.uploaded += 1;

        match maybe_delete(&record.absolute_path, self.config.delete_local_after_upload) {
            Ok(true) => report.deleted += 1,
            Ok(false) => {}
            Err(_) => report.delete_failures += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn days(n: u64) -> Duration {
        Duration::from_secs(n * SECS_PER_DAY)
    }

    #[test]
    fn test_classify_boundary() {
        let now = UNIX_EPOCH + days(100);
        assert_eq!(classify(now - days(7), now, 7), Freshness::Fresh);
        assert_eq!(
            classify(now - days(7) - Duration::from_secs(1), now, 7),
            Freshness::Stale
        );
        assert_eq!(classify(now - days(10), now, 7), Freshness::Stale);
        assert_eq!(classify(now - days(1), now, 7), Freshness::Fresh);
    }

    #[test]
    fn test_classify_zero_threshold() {
        let now = UNIX_EPOCH + days(1);
        assert_eq!(classify(now, now, 0), Freshness::Fresh);
        assert_eq!(
            classify(now - Duration::from_millis(1), now, 0),
            Freshness::Stale
        );
        // 修改时间在未来
        assert_eq!(classify(now + days(1), now, 0), Freshness::Fresh);
    }

    #[test]
    fn test_classify_unrepresentable_cutoff() {
        let now = UNIX_EPOCH + days(1);
        assert_eq!(classify(UNIX_EPOCH, now, 365_000), Freshness::Fresh);
        assert_eq!(classify(UNIX_EPOCH, now, u64::MAX), Freshness::Fresh);
    }

    #[test]
    fn test_derive_key() {
        assert_eq!(derive_key("a.txt", "archive"), "archive/a.txt");
        assert_eq!(derive_key("a.txt", "archive/"), "archive/a.txt");
        assert_eq!(derive_key("sub/b.txt", ""), "sub/b.txt");
        assert_eq!(derive_key("sub\\b.txt", "archive\\"), "archive/sub/b.txt");
        assert_eq!(derive_key("./a.txt", ""), "a.txt");
        assert_eq!(derive_key("a.txt", "./"), "a.txt");
        assert_eq!(derive_key("a.txt", "././logs"), "logs/a.txt");
    }

    #[test]
    fn test_derive_key_is_idempotent() {
        for (relative, prefix) in [
            ("a.txt", ""),
            (".\\x\\y.log", ""),
            ("deep\\nested/file", "backups\\2024"),
        ] {
            let key = derive_key(relative, prefix);
            assert_eq!(key, derive_key(relative, prefix));
            assert_eq!(key, derive_key(&key, ""));
            assert!(!key.contains('\\'));
            assert!(!key.starts_with("./"));
        }
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/srv/data");
        assert_eq!(
            relative_path(root, Path::new("/srv/data/sub/b.txt")).unwrap(),
            "sub/b.txt"
        );
        assert!(relative_path(root, Path::new("/elsewhere/b.txt")).is_err());
    }

    #[test]
    fn test_vanished_file_is_scan_race() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.txt");
        let err = FileRecord::read(dir.path(), &missing).unwrap_err();
        assert!(matches!(err, Error::ScanRace(_)));
    }

    #[test]
    fn test_maybe_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"data").unwrap();

        assert!(!maybe_delete(&path, false).unwrap());
        assert!(path.exists());

        assert!(maybe_delete(&path, true).unwrap());
        assert!(!path.exists());

        let err = maybe_delete(&path, true).unwrap_err();
        assert!(matches!(err, Error::Delete { .. }));
    }

    #[test]
    fn test_report_display() {
        let report = RunReport {
            scanned: 2,
            stale: 1,
            uploaded: 1,
            fresh: 1,
            ..Default::default()
        };
        assert!(report.to_string().starts_with("scanned 2, fresh 1, stale 1, uploaded 1"));
    }
}
