pub type Result<T> = std::result::Result<T, Error>;

// 致命错误：配置相关，出现时在任何文件被处理前终止
// 可恢复错误：单个文件的扫描、上传、删除失败，记录日志后继续处理下一个文件

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // 源目录不存在或不是目录
    #[error("source directory '{0}' not found")]
    SourceNotFound(String),
    // 配置值无法解析
    #[error("invalid configuration {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
    // 文件在列出和读取元数据之间消失
    #[error("file not found during scan (possibly moved/deleted while running): {0}")]
    ScanRace(String),
    // 无效的路径编码（对象键必须是 UTF-8）
    #[error("invalid path encoding: {0}")]
    InvalidPathEncoding(String),
    // 对象存储返回的错误
    #[error("object storage error: {0}")]
    Storage(String),
    // 上传成功后删除本地文件失败
    #[error("failed to delete local file {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },
    // 内部通用错误
    #[error("internal error: {0}")]
    Internal(String),
    // 包装 walkdir::Error
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    // 包装 std::io::Error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    // 包装 JobSchedulerError
    #[error("job scheduler error: {0}")]
    JobScheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

#[macro_export]
macro_rules! fail {
    ($msg:expr) => {
        $crate::errors::Error::Internal(format!($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::Error::Internal(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! err {
    ($msg:expr) => {
        Err($crate::fail!($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        Err($crate::fail!($fmt, $($arg)*))
    };
}
