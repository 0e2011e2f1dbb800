use std::path::PathBuf;

use crate::{
    cli::Args,
    errors::{Error, Result},
    vars::{
        ARCHIVER_AGE_THRESHOLD_DAYS, ARCHIVER_BUCKET_NAME, ARCHIVER_DELETE_LOCAL_AFTER_UPLOAD,
        ARCHIVER_DESTINATION_PREFIX, ARCHIVER_SOURCE_DIRECTORY,
    },
};

/// Settings for a single archive run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiverConfig {
    /// Root of the tree to scan.
    pub source_directory: PathBuf,
    /// Destination bucket.
    pub bucket_name: String,
    /// Files older than this many days are archived.
    pub age_threshold_days: u64,
    /// Prepended to every object key, may be empty.
    pub destination_prefix: String,
    /// Remove the local copy after a successful upload.
    pub delete_local_after_upload: bool,
}

impl ArchiverConfig {
    /// Build the configuration from the `ARCHIVER_*` environment, letting
    /// command line arguments take precedence.
    pub fn load(args: &Args) -> Result<Self> {
        let days = match &args.days {
            Some(days) => days.as_str(),
            None => *ARCHIVER_AGE_THRESHOLD_DAYS,
        };
        let delete = if args.delete {
            "true"
        } else {
            *ARCHIVER_DELETE_LOCAL_AFTER_UPLOAD
        };

        Self::from_raw(
            args.source.as_deref().unwrap_or(*ARCHIVER_SOURCE_DIRECTORY),
            args.bucket.as_deref().unwrap_or(*ARCHIVER_BUCKET_NAME),
            days,
            args.prefix.as_deref().unwrap_or(*ARCHIVER_DESTINATION_PREFIX),
            delete,
        )
    }

    pub fn from_raw(
        source_directory: &str,
        bucket_name: &str,
        age_threshold_days: &str,
        destination_prefix: &str,
        delete_local_after_upload: &str,
    ) -> Result<Self> {
        let bucket_name = bucket_name.trim();
        if bucket_name.is_empty() {
            return Err(Error::InvalidConfig {
                key: "bucket_name",
                reason: "must not be empty".to_string(),
            });
        }
        let age_threshold_days =
            age_threshold_days
                .trim()
                .parse::<u64>()
                .map_err(|e| Error::InvalidConfig {
                    key: "age_threshold_days",
                    reason: format!("'{age_threshold_days}' is not a non-negative integer ({e})"),
                })?;

        Ok(Self {
            source_directory: PathBuf::from(source_directory),
            bucket_name: bucket_name.to_string(),
            age_threshold_days,
            destination_prefix: destination_prefix.to_string(),
            delete_local_after_upload: parse_bool(
                "delete_local_after_upload",
                delete_local_after_upload,
            )?,
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(Error::InvalidConfig {
            key,
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        let config = ArchiverConfig::from_raw("/data/logs", "logs-archive", "30", "archive/", "yes")
            .unwrap();
        assert_eq!(config.source_directory, PathBuf::from("/data/logs"));
        assert_eq!(config.bucket_name, "logs-archive");
        assert_eq!(config.age_threshold_days, 30);
        assert_eq!(config.destination_prefix, "archive/");
        assert!(config.delete_local_after_upload);
    }

    #[test]
    fn test_zero_threshold_is_allowed() {
        let config = ArchiverConfig::from_raw("src", "bucket", "0", "", "false").unwrap();
        assert_eq!(config.age_threshold_days, 0);
        assert!(!config.delete_local_after_upload);
    }

    #[test]
    fn test_invalid_threshold() {
        let err = ArchiverConfig::from_raw("src", "bucket", "-1", "", "false").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                key: "age_threshold_days",
                ..
            }
        ));
        assert!(ArchiverConfig::from_raw("src", "bucket", "seven", "", "false").is_err());
    }

    #[test]
    fn test_invalid_bool() {
        let err = ArchiverConfig::from_raw("src", "bucket", "7", "", "maybe").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                key: "delete_local_after_upload",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_bucket() {
        assert!(ArchiverConfig::from_raw("src", "  ", "7", "", "false").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("k", "TRUE").unwrap());
        assert!(parse_bool("k", " on ").unwrap());
        assert!(!parse_bool("k", "Off").unwrap());
        assert!(!parse_bool("k", "").unwrap());
    }
}
