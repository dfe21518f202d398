pub mod commands;
pub mod console;
pub mod events;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod settings;
pub mod state;

pub use events::ReminderEvent;
pub use models::{Task, TaskError, TaskId};
pub use scheduler::{ReminderScheduler, TickReport};
pub use settings::Settings;
pub use state::TaskStore;

#[cfg(all(feature = "app", not(test)))]
pub fn run() {
    let settings_path = std::env::args_os().nth(1).map(std::path::PathBuf::from);
    let loaded = settings_path.as_deref().map(Settings::load);
    let settings = match &loaded {
        Some(Ok(settings)) => settings.clone(),
        _ => Settings::default(),
    };

    if let Err(err) = logging::init_logging(settings.log_dir.as_deref()) {
        eprintln!("logger init failed: {err}");
    }
    if let Some(Err(err)) = &loaded {
        log::error!("settings load failed; using defaults: {err}");
    }
    log::info!(
        "starting tick_interval_secs={} notify_before_minutes={} undo_limit={:?}",
        settings.tick_interval_secs,
        settings.notify_before_minutes,
        settings.undo_limit
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("tokio runtime build failed: {err}");
            eprintln!("tokio runtime build failed: {err}");
            return;
        }
    };
    runtime.block_on(console::run_console(settings));
}
