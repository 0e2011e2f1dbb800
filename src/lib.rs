pub mod archiver;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logger;
pub mod scheduler;
pub mod storage;
pub mod vars;

pub use archiver::{Archiver, FileRecord, Freshness, RunReport, UploadTarget};
pub use config::ArchiverConfig;
pub use errors::{Error, Result};
pub use storage::ObjectStore;
