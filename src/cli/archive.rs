use log::info;

use crate::{archiver::Archiver, errors::Result};

/// Runs a single pass and returns once the walk completes.
pub async fn run(archiver: &Archiver) -> Result<()> {
    let report = archiver.run().await?;
    if report.upload_failures > 0 || report.delete_failures > 0 || report.skipped > 0 {
        info!(
            "Finished with {} upload failure(s), {} deletion failure(s), {} skipped file(s)",
            report.upload_failures, report.delete_failures, report.skipped
        );
    }

    Ok(())
}
