pub const LOG_FILE_BASENAME: &str = "tasktracker";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 5;

// Blank values fall through to the next source.
pub fn log_spec(primary: Option<String>, fallback: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,task_tracker_lib=debug"
    } else {
        "warn,task_tracker_lib=info"
    };
    primary
        .filter(|value| !value.trim().is_empty())
        .or_else(|| fallback.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(log_dir: Option<&std::path::Path>) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{detailed_format, Cleanup, Criterion, FileSpec, Logger, Naming, WriteMode};

    let spec = log_spec(
        std::env::var("TASK_TRACKER_LOG").ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let logger = Logger::try_with_str(spec)?;

    // The console owns stdout, so unconfigured logging goes to stderr.
    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir)
                        .basename(LOG_FILE_BASENAME)
                        .suffix(LOG_FILE_SUFFIX),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .format_for_files(detailed_format)
                .rotate(
                    Criterion::Size(LOG_ROTATE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
                )
        }
        None => logger.log_to_stderr().format_for_stderr(detailed_format),
    };
    logger.start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        log_dir.map_or_else(|| "<stderr>".to_string(), |dir| dir.display().to_string()),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(())
}

pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string panic payload>".to_string())
}

#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let location = info
            .location()
            .map_or_else(|| "<unknown>".to_string(), |loc| loc.to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!(
            "panic: payload={} location={location}\nbacktrace:\n{backtrace}",
            panic_message(info.payload())
        );
        default_hook(info);
    }));
}
