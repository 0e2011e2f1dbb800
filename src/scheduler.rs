use std::{pin::Pin, sync::Arc};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::{signal, sync::Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::{archiver::Archiver, errors::Result};

type TaskRun = Arc<
    dyn Fn() -> Pin<Box<dyn std::future::Future<Output = ()> + Send + 'static>>
        + Send
        + Sync
        + 'static,
>;

pub struct Task {
    run: TaskRun,
}

impl Task {
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        Self {
            run: Arc::new(move || Box::pin(run())),
        }
    }

    pub fn create_job(&self, schedule: &str) -> Result<Job> {
        let run = Arc::clone(&self.run);
        let job = Job::new_async(schedule, move |_, _| run())?;

        Ok(job)
    }
}

pub struct ArchiveScheduler {
    sched: JobScheduler,
    job_id: Uuid,
}

impl ArchiveScheduler {
    /// Registers the archive run as a cron job without starting it.
    pub async fn new(archiver: Arc<Archiver>, schedule: &str) -> Result<Self> {
        let sched = JobScheduler::new().await?;
        // 同一时间只允许一次归档运行
        let running = Arc::new(Mutex::new(()));

        let task = Task::new(move || {
            let archiver = Arc::clone(&archiver);
            let running = Arc::clone(&running);
            async move { archive_tick(&archiver, &running).await }
        });
        let job = task.create_job(schedule)?;
        let job_id = job.guid();
        sched.add(job).await?;
        info!("Archiver scheduled with cron expression '{schedule}'");

        Ok(Self { sched, job_id })
    }

    pub async fn next_run(&mut self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.sched.next_tick_for_job(self.job_id).await?)
    }

    /// Starts ticking and blocks until Ctrl+C or SIGTERM.
    pub async fn run_until_shutdown(mut self) -> Result<()> {
        self.sched.set_shutdown_handler(Box::new(|| {
            Box::pin(async move {
                info!("Job scheduler is shutting down");
            })
        }));
        self.sched.start().await?;
        if let Some(next) = self.next_run().await? {
            info!("Next archive run at {next}");
        }

        shutdown_signal().await;
        self.sched.shutdown().await?;

        Ok(())
    }
}

async fn archive_tick(archiver: &Archiver, running: &Mutex<()>) {
    let Ok(_guard) = running.try_lock() else {
        warn!("Previous archive run is still in progress, skipping this tick");
        return;
    };
    if let Err(e) = archiver.run().await {
        error!("Archive run failed: {e}");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, stopping"),
        _ = terminate => info!("SIGTERM received, stopping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ArchiverConfig, storage::ObjectStore};
    use async_trait::async_trait;
    use std::{
        fs::File,
        path::Path,
        sync::atomic::{AtomicUsize, Ordering},
        time::{Duration, SystemTime},
    };

    #[derive(Default)]
    struct CountingStore {
        puts: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn put_object(&self, _bucket: &str, _key: &str, _local_path: &Path) -> Result<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_invalid_cron_expression() {
        let task = Task::new(|| async {});
        assert!(task.create_job("not a cron expression").is_err());
    }

    #[tokio::test]
    async fn test_skips_overlapping_tick() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.log");
        File::create(&path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(30 * 24 * 3600))
            .unwrap();

        let store = Arc::new(CountingStore::default());
        let config = ArchiverConfig {
            source_directory: dir.path().to_path_buf(),
            bucket_name: "bucket".to_string(),
            age_threshold_days: 7,
            destination_prefix: String::new(),
            delete_local_after_upload: false,
        };
        let archiver = Archiver::new(config, store.clone());
        let running = Mutex::new(());

        {
            let _held = running.lock().await;
            archive_tick(&archiver, &running).await;
        }
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);

        archive_tick(&archiver, &running).await;
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }
}
