//! Nurse task board — client-only tasks over the local store.
//!
//! The collection lives exclusively in durable local storage; nothing
//! here touches the backend. Every mutation persists the whole
//! collection back immediately.

use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{NursePriority, NurseTask, NurseTaskStatus};
use crate::store::LocalStore;

/// Validation outcome for the add-task form.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskFormError {
    #[error("Please fill in task title and time")]
    MissingFields,
}

pub struct TaskBoard {
    store: Arc<LocalStore>,
    tasks: Vec<NurseTask>,
}

impl TaskBoard {
    /// Load (or first-run seed) the board from the store.
    pub fn load(store: Arc<LocalStore>) -> Result<Self, StoreError> {
        let tasks = store.load_or_seed_tasks()?;
        Ok(Self { store, tasks })
    }

    pub fn tasks(&self) -> &[NurseTask] {
        &self.tasks
    }

    pub fn upcoming(&self) -> Vec<&NurseTask> {
        self.tasks
            .iter()
            .filter(|t| t.status == NurseTaskStatus::Upcoming)
            .collect()
    }

    pub fn completed(&self) -> Vec<&NurseTask> {
        self.tasks
            .iter()
            .filter(|t| t.status == NurseTaskStatus::Completed)
            .collect()
    }

    /// Add a task from form input. Title and due label are required;
    /// whitespace-only input counts as missing.
    pub fn add(
        &mut self,
        title: &str,
        due: &str,
        priority: NursePriority,
    ) -> Result<&NurseTask, StoreError> {
        let task = NurseTask::new(title.trim(), due.trim(), priority);
        tracing::info!(task_id = %task.id, %task.title, "task added");
        self.tasks.push(task);
        self.persist()?;
        Ok(self.tasks.last().unwrap())
    }

    /// Form-level validation, separate from the mutation so the surface
    /// can reject before committing.
    pub fn validate_form(title: &str, due: &str) -> Result<(), TaskFormError> {
        if title.trim().is_empty() || due.trim().is_empty() {
            return Err(TaskFormError::MissingFields);
        }
        Ok(())
    }

    /// Mark a task completed, stamping `completed_at`. Completing an
    /// already-completed task is a no-op; unknown ids are ignored.
    pub fn complete(&mut self, task_id: &str) -> Result<(), StoreError> {
        let mut changed = false;
        for task in &mut self.tasks {
            if task.id == task_id && task.status == NurseTaskStatus::Upcoming {
                task.status = NurseTaskStatus::Completed;
                task.completed_at = Some(chrono::Utc::now());
                changed = true;
            }
        }
        if changed {
            self.persist()?;
        }
        Ok(())
    }

    pub fn remove(&mut self, task_id: &str) -> Result<(), StoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() != before {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.save_tasks(&self.tasks)
    }
}
