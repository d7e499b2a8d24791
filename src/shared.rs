//! Cross-tab shared state bridge.
//!
//! The doctor dashboard holds exactly one task collection, observed by
//! both the tasks tab and the analytics tab. Writers commit by
//! whole-collection replacement, never by in-place mutation, and each
//! commit bumps a version counter so observers can detect a change by
//! comparing versions instead of diffing contents.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::models::{DoctorTask, DoctorTaskStatus};

/// Shared handle to the doctor task collection. Cheap to clone; all
/// clones observe the same collection.
#[derive(Clone, Default)]
pub struct SharedTasks {
    inner: Arc<SharedTasksInner>,
}

#[derive(Default)]
struct SharedTasksInner {
    tasks: RwLock<Vec<DoctorTask>>,
    version: AtomicU64,
}

impl SharedTasks {
    pub fn new(initial: Vec<DoctorTask>) -> Self {
        let shared = Self::default();
        shared.replace(initial);
        shared
    }

    /// Snapshot of the current collection.
    pub fn snapshot(&self) -> Vec<DoctorTask> {
        self.inner.tasks.read().map(|g| g.clone()).unwrap_or_default()
    }

    /// Monotonic commit counter. Two equal versions mean no commit
    /// happened in between.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Commit a whole new collection.
    pub fn replace(&self, tasks: Vec<DoctorTask>) {
        if let Ok(mut guard) = self.inner.tasks.write() {
            *guard = tasks;
        }
        self.inner.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Read-modify-replace: builds the next collection from a snapshot
    /// and commits it as a unit.
    pub fn update(&self, f: impl FnOnce(Vec<DoctorTask>) -> Vec<DoctorTask>) {
        let next = f(self.snapshot());
        self.replace(next);
    }

    pub fn add(&self, task: DoctorTask) {
        self.update(|mut tasks| {
            tasks.push(task);
            tasks
        });
    }

    /// Flip a task between pending and completed, stamping or clearing
    /// `completed_at`. Unknown ids are a no-op commit.
    pub fn toggle_completed(&self, task_id: &str) {
        self.update(|tasks| {
            tasks
                .into_iter()
                .map(|mut task| {
                    if task.id == task_id {
                        match task.status {
                            DoctorTaskStatus::Pending => {
                                task.status = DoctorTaskStatus::Completed;
                                task.completed_at =
                                    Some(chrono::Utc::now().to_rfc3339());
                            }
                            DoctorTaskStatus::Completed => {
                                task.status = DoctorTaskStatus::Pending;
                                task.completed_at = None;
                            }
                        }
                    }
                    task
                })
                .collect()
        });
    }

    pub fn remove(&self, task_id: &str) {
        self.update(|tasks| tasks.into_iter().filter(|t| t.id != task_id).collect());
    }

    pub fn pending(&self) -> Vec<DoctorTask> {
        self.snapshot()
            .into_iter()
            .filter(|t| t.status == DoctorTaskStatus::Pending)
            .collect()
    }

    pub fn completed(&self) -> Vec<DoctorTask> {
        self.snapshot()
            .into_iter()
            .filter(|t| t.status == DoctorTaskStatus::Completed)
            .collect()
    }
}

/// Inline notice posted by a controller action, auto-dismissed after a
/// kind-dependent window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: NoticeKind::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: NoticeKind::Error,
        }
    }

    /// Errors linger longer than confirmations.
    pub fn dismiss_after(&self) -> std::time::Duration {
        match self.kind {
            NoticeKind::Success => crate::config::SUCCESS_DISMISS,
            NoticeKind::Error => crate::config::ERROR_DISMISS,
        }
    }
}

/// The dark-mode flag shared by every surface of a dashboard.
#[derive(Clone, Default)]
pub struct DarkMode {
    on: Arc<AtomicBool>,
}

impl DarkMode {
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    pub fn toggle(&self) -> bool {
        !self.on.fetch_xor(true, Ordering::SeqCst)
    }
}
