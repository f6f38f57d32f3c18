use std::path::Path;

use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};

/// Starts the process-wide logger writing rotating files into `logs/`.
///
/// `base_level` uses the `RUST_LOG` syntax (`"info"`, `"chromalign=debug"`).
/// The returned handle must be kept alive for the lifetime of the program.
pub fn setup_logging(base_level: &str) -> anyhow::Result<LoggerHandle> {
    setup_logging_in(base_level, Path::new("logs"))
}

/// Like [`setup_logging`] with an explicit log directory. Every record is
/// mirrored to stdout and warnings additionally to stderr.
pub fn setup_logging_in(base_level: &str, directory: &Path) -> anyhow::Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str(base_level)?
        .log_to_file(
            FileSpec::default()
                .directory(directory)
                .basename("chromalign"),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .duplicate_to_stdout(Duplicate::All)
        .rotate(
            Criterion::Size(1024 * 1024), //1MB
            Naming::Timestamps,
            Cleanup::KeepLogFiles(5),
        )
        .start()?;

    Ok(handle)
}
