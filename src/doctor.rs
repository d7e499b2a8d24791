//! Doctor dashboard root.
//!
//! Owns one instance of each tab controller plus the single shared task
//! collection that the tasks and analytics surfaces observe together.
//! Navigation runs through the view state machine; the root dispatches
//! each activation effect to the controller that owns it.

use chrono::{Duration, Utc};

use crate::analytics::AnalyticsController;
use crate::api::Backend;
use crate::calendar::{CalendarController, MonthRef};
use crate::error::ApiError;
use crate::models::{DoctorPriority, DoctorTask, DoctorTaskStatus};
use crate::notes::NotesController;
use crate::patients::PatientsController;
use crate::shared::{DarkMode, SharedTasks};
use crate::tabs::{ActivationEffect, DoctorNav, DoctorQuickAction, DoctorView};

/// The two example tasks every fresh doctor session starts with.
fn example_tasks() -> Vec<DoctorTask> {
    let today = Utc::now();
    vec![
        DoctorTask {
            id: "1".into(),
            title: "Review lab results for Patient #1".into(),
            description: "Check blood work and update treatment plan".into(),
            priority: DoctorPriority::High,
            due_date: today.date_naive().to_string(),
            due_time: "14:00".into(),
            status: DoctorTaskStatus::Pending,
            created_at: today.to_rfc3339(),
            completed_at: None,
        },
        DoctorTask {
            id: "2".into(),
            title: "Follow-up consultation - Patient #2".into(),
            description: "Post-surgery check-up and medication review".into(),
            priority: DoctorPriority::Medium,
            due_date: (today + Duration::days(1)).date_naive().to_string(),
            due_time: "10:30".into(),
            status: DoctorTaskStatus::Pending,
            created_at: today.to_rfc3339(),
            completed_at: None,
        },
    ]
}

pub struct DoctorDashboard<B: Backend> {
    backend: B,
    nav: DoctorNav,
    pub tasks: SharedTasks,
    pub dark_mode: DarkMode,
    pub patients: PatientsController,
    pub notes: NotesController,
    pub calendar: CalendarController,
    pub analytics: AnalyticsController,
    calendar_loaded: bool,
}

impl<B: Backend> DoctorDashboard<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            nav: DoctorNav::new(),
            tasks: SharedTasks::new(example_tasks()),
            dark_mode: DarkMode::default(),
            patients: PatientsController::new(),
            notes: NotesController::new(),
            calendar: CalendarController::new(MonthRef::current()),
            analytics: AnalyticsController::new(),
            calendar_loaded: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_view(&self) -> DoctorView {
        self.nav.current()
    }

    /// Navigate and run the landing view's activation effect.
    pub async fn navigate(&mut self, view: DoctorView) -> Result<(), ApiError> {
        match self.nav.goto(view) {
            ActivationEffect::RefetchNotes => self.notes.refetch(&self.backend).await,
            ActivationEffect::LoadIfNeverLoaded => match view {
                DoctorView::Patients => self.patients.activate(&self.backend).await,
                DoctorView::Analytics => self.analytics.activate(&self.backend).await,
                DoctorView::Calendar => {
                    if self.calendar_loaded {
                        return Ok(());
                    }
                    let month = self.calendar.month();
                    self.calendar.load_month(&self.backend, month).await?;
                    self.calendar_loaded = true;
                    Ok(())
                }
                _ => Ok(()),
            },
            ActivationEffect::None => Ok(()),
        }
    }

    /// Calendar month navigation re-windows and refetches regardless of
    /// the one-shot flag.
    pub async fn shift_calendar_month(&mut self, delta: i32) -> Result<(), ApiError> {
        let month = self.calendar.month().shift(delta);
        self.calendar.load_month(&self.backend, month).await
    }

    pub async fn quick_action(&mut self, action: DoctorQuickAction) -> Result<(), ApiError> {
        self.navigate(action.destination()).await
    }
}
