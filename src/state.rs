use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;

use crate::models::{parse_due, Task, TaskError, TaskId};

#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Mutex<StoreData>>,
}

impl TaskStore {
    // `None` keeps every deletion undoable.
    pub fn new(undo_limit: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreData {
                tasks: Vec::new(),
                undo: VecDeque::new(),
                undo_limit,
                next_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("task store lock poisoned; recovering");
            poisoned.into_inner()
        })
    }

    pub fn add(&self, name: &str, due: &str) -> Result<Task, TaskError> {
        let due_at = parse_due(due).inspect_err(|err| {
            log::debug!("add rejected: {err}");
        })?;
        Ok(self.add_at(name, due_at))
    }

    pub fn add_at(&self, name: &str, due_at: NaiveDateTime) -> Task {
        let mut guard = self.lock();
        let id = TaskId::new(guard.next_id);
        guard.next_id += 1;
        let task = Task::new(id, name, due_at);
        guard.tasks.push(task.clone());
        log::info!("task added id={} due_at={}", task.id, task.due_at);
        task
    }

    pub fn delete(&self, id: TaskId) -> Option<Task> {
        let mut guard = self.lock();
        let index = guard.tasks.iter().position(|task| task.id == id)?;
        let removed = guard.tasks.remove(index);
        guard.push_undo(removed.clone());
        log::info!("task deleted id={id} undo_depth={}", guard.undo.len());
        Some(removed)
    }

    pub fn undo(&self) -> Option<Task> {
        let mut guard = self.lock();
        let restored = guard.undo.pop_back()?;
        guard.tasks.push(restored.clone());
        log::info!("task restored id={}", restored.id);
        Some(restored)
    }

    pub fn toggle_complete(&self, id: TaskId) -> Option<Task> {
        let mut guard = self.lock();
        let task = guard.tasks.iter_mut().find(|task| task.id == id)?;
        task.completed = !task.completed;
        log::info!("task toggled id={id} completed={}", task.completed);
        Some(task.clone())
    }

    /// Tasks and undo availability read under one lock.
    pub fn snapshot(&self) -> (Vec<Task>, bool) {
        let guard = self.lock();
        (guard.tasks.clone(), !guard.undo.is_empty())
    }

    pub fn list(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.lock().tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn undo_available(&self) -> bool {
        !self.lock().undo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tasks.is_empty()
    }
}

#[derive(Debug)]
struct StoreData {
    tasks: Vec<Task>,
    // Back is the most recent deletion.
    undo: VecDeque<Task>,
    undo_limit: Option<usize>,
    next_id: u64,
}

impl StoreData {
    fn push_undo(&mut self, task: Task) {
        self.undo.push_back(task);
        if let Some(limit) = self.undo_limit {
            while self.undo.len() > limit {
                if let Some(evicted) = self.undo.pop_front() {
                    log::debug!("undo history full; dropped id={}", evicted.id);
                }
            }
        }
    }
}
