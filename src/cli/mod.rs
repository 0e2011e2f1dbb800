pub mod archive;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(about = "Upload files older than a threshold to object storage")]
pub struct Args {
    /// Directory to scan (overrides ARCHIVER_SOURCE_DIRECTORY)
    #[arg(long)]
    pub source: Option<String>,
    /// Destination bucket (overrides ARCHIVER_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,
    /// Age threshold in days (overrides ARCHIVER_AGE_THRESHOLD_DAYS)
    #[arg(long)]
    pub days: Option<String>,
    /// Object key prefix (overrides ARCHIVER_DESTINATION_PREFIX)
    #[arg(long)]
    pub prefix: Option<String>,
    /// Delete local files after a successful upload
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub delete: bool,
    /// Keep running and archive on a schedule
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub daemon: bool,
    /// Cron expression for daemon mode (overrides ARCHIVER_SCHEDULE)
    #[arg(long)]
    pub schedule: Option<String>,
}
