use crate::events::{StatePayload, EVENT_STATE_UPDATED};
use crate::models::{Task, TaskId};
use crate::scheduler::ReminderScheduler;
use crate::state::TaskStore;

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

pub trait CommandCtx {
    fn emit_state_updated(&self, payload: StatePayload);
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn state_payload(store: &TaskStore) -> StatePayload {
    let (tasks, undo_available) = store.snapshot();
    StatePayload {
        tasks,
        undo_available,
    }
}

fn publish(ctx: &impl CommandCtx, store: &TaskStore) {
    let payload = state_payload(store);
    log::debug!(
        "{EVENT_STATE_UPDATED} tasks={} undo_available={}",
        payload.tasks.len(),
        payload.undo_available
    );
    ctx.emit_state_updated(payload);
}

pub fn load_state(store: &TaskStore) -> CommandResult<StatePayload> {
    ok(state_payload(store))
}

pub fn create_task(
    ctx: &impl CommandCtx,
    store: &TaskStore,
    name: &str,
    due: &str,
) -> CommandResult<Task> {
    if name.trim().is_empty() {
        return err("task name must not be empty");
    }
    match store.add(name, due) {
        Ok(task) => {
            publish(ctx, store);
            ok(task)
        }
        Err(error) => err(&error.to_string()),
    }
}

pub fn delete_task(
    ctx: &impl CommandCtx,
    store: &TaskStore,
    scheduler: &ReminderScheduler,
    task_id: TaskId,
) -> CommandResult<Task> {
    let Some(deleted) = store.delete(task_id) else {
        return err("task not found");
    };
    scheduler.task_deleted(task_id);
    publish(ctx, store);
    ok(deleted)
}

pub fn undo_delete(ctx: &impl CommandCtx, store: &TaskStore) -> CommandResult<Task> {
    let Some(restored) = store.undo() else {
        return err("nothing to undo");
    };
    publish(ctx, store);
    ok(restored)
}

pub fn toggle_complete(
    ctx: &impl CommandCtx,
    store: &TaskStore,
    task_id: TaskId,
) -> CommandResult<Task> {
    let Some(task) = store.toggle_complete(task_id) else {
        return err("task not found");
    };
    publish(ctx, store);
    ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ReminderEvent;
    use crate::settings::Settings;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct TestCtx {
        emitted: Mutex<Vec<StatePayload>>,
    }

    impl TestCtx {
        fn new() -> Self {
            Self {
                emitted: Mutex::new(Vec::new()),
            }
        }

        fn emitted_count(&self) -> usize {
            self.emitted.lock().unwrap().len()
        }

        fn last(&self) -> StatePayload {
            self.emitted.lock().unwrap().last().cloned().expect("payload emitted")
        }
    }

    impl CommandCtx for TestCtx {
        fn emit_state_updated(&self, payload: StatePayload) {
            self.emitted.lock().unwrap().push(payload);
        }
    }

    fn make_env() -> (
        TaskStore,
        ReminderScheduler,
        mpsc::UnboundedReceiver<ReminderEvent>,
    ) {
        let store = TaskStore::new(None);
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = ReminderScheduler::new(store.clone(), tx, &Settings::default());
        (store, scheduler, rx)
    }

    #[test]
    fn ok_and_err_helpers_construct_expected_shape() {
        let r = ok(123);
        assert!(r.ok);
        assert_eq!(r.data, Some(123));
        assert_eq!(r.error, None);

        let r: CommandResult<i32> = err("nope");
        assert!(!r.ok);
        assert_eq!(r.data, None);
        assert_eq!(r.error, Some("nope".to_string()));
    }

    #[test]
    fn create_task_publishes_state() {
        let ctx = TestCtx::new();
        let (store, _scheduler, _rx) = make_env();

        let result = create_task(&ctx, &store, " buy milk ", "2025-06-12 18:30");
        assert!(result.ok);
        let task = result.data.unwrap();
        assert_eq!(task.name, "buy milk");

        assert_eq!(ctx.emitted_count(), 1);
        let payload = ctx.last();
        assert_eq!(payload.tasks, vec![task]);
        assert!(!payload.undo_available);
    }

    #[test]
    fn create_task_rejects_empty_name_and_bad_due() {
        let ctx = TestCtx::new();
        let (store, _scheduler, _rx) = make_env();

        let result = create_task(&ctx, &store, "   ", "2025-06-12 18:30");
        assert_eq!(result.error.as_deref(), Some("task name must not be empty"));

        let result = create_task(&ctx, &store, "x", "next friday");
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("expected YYYY-MM-DD HH:MM"));

        assert!(store.is_empty());
        assert_eq!(ctx.emitted_count(), 0);
    }

    #[test]
    fn delete_task_clears_reminder_bookkeeping() {
        let ctx = TestCtx::new();
        let (store, scheduler, _rx) = make_env();
        let task = store.add("a", "2025-06-12 18:30").unwrap();
        let now = NaiveDate::from_ymd_opt(2025, 6, 12)
            .unwrap()
            .and_hms_opt(18, 25, 0)
            .unwrap();
        scheduler.tick_at(now);
        assert_eq!(scheduler.notified_ids(), vec![task.id]);

        let result = delete_task(&ctx, &store, &scheduler, task.id);
        assert_eq!(result.data, Some(task.clone()));
        assert!(scheduler.notified_ids().is_empty());
        assert!(ctx.last().undo_available);

        let result = delete_task(&ctx, &store, &scheduler, task.id);
        assert_eq!(result.error.as_deref(), Some("task not found"));
        assert_eq!(ctx.emitted_count(), 1);
    }

    #[test]
    fn undo_and_toggle_round_trip() {
        let ctx = TestCtx::new();
        let (store, scheduler, _rx) = make_env();
        let a = store.add("a", "2025-06-12 18:30").unwrap();

        assert_eq!(undo_delete(&ctx, &store).error.as_deref(), Some("nothing to undo"));

        delete_task(&ctx, &store, &scheduler, a.id);
        let restored = undo_delete(&ctx, &store);
        assert_eq!(restored.data, Some(a.clone()));

        let toggled = toggle_complete(&ctx, &store, a.id);
        assert!(toggled.data.unwrap().completed);
        assert!(ctx.last().tasks[0].completed);

        let missing = toggle_complete(&ctx, &store, TaskId::new(42));
        assert_eq!(missing.error.as_deref(), Some("task not found"));
    }

    #[test]
    fn load_state_reports_current_tasks() {
        let (store, _scheduler, _rx) = make_env();
        store.add("a", "2025-06-12 18:30").unwrap();
        let result = load_state(&store);
        assert!(result.ok);
        assert_eq!(result.data.unwrap().tasks.len(), 1);
    }
}
