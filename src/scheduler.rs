use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{ReminderEvent, EVENT_REMINDER};
use crate::logging::panic_message;
use crate::models::TaskId;
use crate::settings::Settings;
use crate::state::TaskStore;

pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub alerted: Vec<TaskId>,
    pub pruned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickError {
    Panicked(String),
}

impl std::fmt::Display for TickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickError::Panicked(message) => write!(f, "tick panicked: {message}"),
        }
    }
}

impl std::error::Error for TickError {}

pub struct ReminderScheduler {
    shared: Arc<Shared>,
    tick_interval: Duration,
    running: Mutex<Option<Running>>,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared {
    store: TaskStore,
    // Notified task -> its due time, used for pruning.
    notified: Mutex<HashMap<TaskId, NaiveDateTime>>,
    reminder_tx: mpsc::UnboundedSender<ReminderEvent>,
    notify_before: chrono::Duration,
    clock: Clock,
}

impl ReminderScheduler {
    pub fn new(
        store: TaskStore,
        reminder_tx: mpsc::UnboundedSender<ReminderEvent>,
        settings: &Settings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                notified: Mutex::new(HashMap::new()),
                reminder_tx,
                notify_before: settings.notify_before(),
                clock: Arc::new(|| Local::now().naive_local()),
            }),
            tick_interval: settings.tick_interval(),
            running: Mutex::new(None),
        }
    }

    /// Replace the wall clock. Only valid before [`start`](Self::start).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.clock = clock;
        } else {
            log::warn!("with_clock ignored: scheduler already shared");
        }
        self
    }

    // Must run inside a tokio runtime.
    pub fn start(&self) {
        let mut running = self.lock_running();
        if running.is_some() {
            log::warn!("reminder scheduler already running");
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            self.tick_interval,
            cancel.clone(),
        ));
        *running = Some(Running { cancel, handle });
    }

    /// Cancels the loop and waits for an in-flight tick to finish. No alert is
    /// sent once this returns. Repeated calls are no-ops.
    pub async fn stop(&self) {
        let running = self.lock_running().take();
        let Some(Running { cancel, handle }) = running else {
            log::debug!("reminder scheduler stop requested but not running");
            return;
        };
        cancel.cancel();
        if let Err(err) = handle.await {
            log::error!("reminder scheduler task ended abnormally: {err}");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    pub fn task_deleted(&self, id: TaskId) -> bool {
        let removed = self.shared.lock_notified().remove(&id).is_some();
        if removed {
            log::debug!("reminder bookkeeping dropped id={id}");
        }
        removed
    }

    pub fn tick_at(&self, now: NaiveDateTime) -> TickReport {
        self.shared.tick_at(now)
    }

    pub fn notified_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<_> = self.shared.lock_notified().keys().copied().collect();
        ids.sort();
        ids
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.lock_running().take() {
            running.cancel.cancel();
        }
    }
}

async fn run_loop(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    log::info!("reminder scheduler started period_secs={}", period.as_secs());
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        match shared.run_tick() {
            Ok(report) if !report.alerted.is_empty() || report.pruned > 0 => {
                log::debug!(
                    "reminder tick alerted={} pruned={}",
                    report.alerted.len(),
                    report.pruned
                );
            }
            Ok(_) => {}
            Err(err) => log::error!("reminder tick abandoned: {err}"),
        }
    }
    log::info!("reminder scheduler stopped");
}

impl Shared {
    fn run_tick(&self) -> Result<TickReport, TickError> {
        catch_unwind(AssertUnwindSafe(|| {
            let now = (self.clock)();
            self.tick_at(now)
        }))
        .map_err(|payload| TickError::Panicked(panic_message(payload.as_ref())))
    }

    fn tick_at(&self, now: NaiveDateTime) -> TickReport {
        // Hold the bookkeeping lock across the snapshot so a concurrent
        // `task_deleted` lands either before or after the whole tick.
        let mut notified = self.lock_notified();
        let tasks = self.store.list();
        let mut report = TickReport::default();

        for task in &tasks {
            if task.completed || notified.contains_key(&task.id) {
                continue;
            }
            let Some(notify_at) = task.due_at.checked_sub_signed(self.notify_before) else {
                log::warn!("notify window out of range id={} due_at={}", task.id, task.due_at);
                continue;
            };
            if now >= notify_at && now < task.due_at {
                notified.insert(task.id, task.due_at);
                report.alerted.push(task.id);
                log::info!("{EVENT_REMINDER} id={} due_at={}", task.id, task.due_at);
                if self.reminder_tx.send(ReminderEvent::for_task(task)).is_err() {
                    log::warn!("reminder receiver closed; alert for id={} dropped", task.id);
                }
            }
        }

        let before = notified.len();
        notified.retain(|_, due_at| now <= *due_at);
        report.pruned = before - notified.len();
        report
    }

    fn lock_notified(&self) -> MutexGuard<'_, HashMap<TaskId, NaiveDateTime>> {
        self.notified.lock().unwrap_or_else(|poisoned| {
            log::warn!("reminder bookkeeping lock poisoned; recovering");
            poisoned.into_inner()
        })
    }
}
