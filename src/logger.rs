use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Routes `log` records through a `tracing` fmt subscriber, filtered by
/// `RUST_LOG` (default: info for this crate, warn for everything else).
pub fn init() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,archiver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
