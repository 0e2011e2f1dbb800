use archiver::{
    Archiver, ArchiverConfig, cli,
    cli::Args,
    errors::Result,
    logger,
    scheduler::ArchiveScheduler,
    storage,
    vars::ARCHIVER_SCHEDULE,
};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    // Initialize the logger
    logger::init();
    // Load environment variables from .env file if it exists
    if dotenvy::dotenv().is_ok() {
        info!("loaded .env file");
    }
    let config = ArchiverConfig::load(&args).inspect_err(|e| error!("{e}"))?;
    let store = storage::setup_storage().await;
    let archiver = Arc::new(Archiver::new(config, store));

    if args.daemon {
        let schedule = args.schedule.as_deref().unwrap_or(*ARCHIVER_SCHEDULE);
        ArchiveScheduler::new(archiver, schedule)
            .await?
            .run_until_shutdown()
            .await?;
    } else {
        cli::archive::run(&archiver).await?;
    }

    info!("Archiver finished.");
    Ok(())
}
