macro_rules! env_config {
    ($name:ident, $env_key:expr, $default:expr) => {
        paste::paste! {
            pub static [<ARCHIVER_ $name>]: ::std::sync::LazyLock<&'static str> = ::std::sync::LazyLock::new(|| {
                ::std::boxed::Box::leak(
                    ::std::env::var($env_key)
                        .unwrap_or_else(|_| $default.to_string())
                        .into_boxed_str()
                )
            });
        }
    };
}

env_config!(SOURCE_DIRECTORY, "ARCHIVER_SOURCE_DIRECTORY", "source");
env_config!(BUCKET_NAME, "ARCHIVER_BUCKET_NAME", "example-bucket");
env_config!(AGE_THRESHOLD_DAYS, "ARCHIVER_AGE_THRESHOLD_DAYS", "7");
env_config!(DESTINATION_PREFIX, "ARCHIVER_DESTINATION_PREFIX", "");
env_config!(
    DELETE_LOCAL_AFTER_UPLOAD,
    "ARCHIVER_DELETE_LOCAL_AFTER_UPLOAD",
    "false"
);
env_config!(S3_ENDPOINT, "ARCHIVER_S3_ENDPOINT", "");
env_config!(S3_REGION, "ARCHIVER_S3_REGION", "us-east-1");
// 每小时执行一次
env_config!(SCHEDULE, "ARCHIVER_SCHEDULE", "0 0 */1 * * *");
