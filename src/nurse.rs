//! Nurse dashboard root.
//!
//! Owns the roster and note working copies, the local-only task board
//! and vitals log, and the structured note flows (manual save and the
//! AI compose chain). The note library re-sorts newest-first at view
//! time; the held collection keeps server order.

use std::path::PathBuf;
use std::sync::Arc;

use crate::analytics::AnalyticsController;
use crate::api::Backend;
use crate::calendar::{CalendarController, MonthRef};
use crate::error::{ApiError, StoreError};
use crate::models::{parse_timestamp, NewNote, Note, NoteSummary, Patient};
use crate::store::LocalStore;
use crate::summary::{self, ComposeError, ComposeRequest, NoteSections, NoteView};
use crate::tabs::{ActivationEffect, NurseNav, NurseQuickAction, NurseView};
use crate::tasks::TaskBoard;
use crate::vitals::VitalsLog;

/// Structured note form. Manual saves and AI composition share it.
#[derive(Debug, Clone)]
pub struct NurseNoteForm {
    pub patient_id: i64,
    pub note_type: String,
    pub visit_date: String,
    pub visit_time: String,
    pub sections: NoteSections,
}

impl Default for NurseNoteForm {
    fn default() -> Self {
        let now = chrono::Utc::now();
        Self {
            patient_id: 1,
            note_type: "Assessment Note".into(),
            visit_date: now.date_naive().to_string(),
            visit_time: now.format("%H:%M").to_string(),
            sections: NoteSections::default(),
        }
    }
}

impl NurseNoteForm {
    pub fn title(&self) -> String {
        format!("{} - {}", self.note_type, self.visit_date)
    }

    /// Manual-save body: the four sections, no AI placeholder.
    fn body(&self) -> String {
        format!(
            "**Vitals**: {}\n\n**Observations**: {}\n\n**Interventions**: {}\n\n**Patient Response**: {}",
            self.sections.vitals,
            self.sections.observations,
            self.sections.interventions,
            self.sections.patient_response
        )
    }
}

pub struct NurseDashboard<B: Backend> {
    backend: B,
    nav: NurseNav,
    patients: Vec<Patient>,
    notes: Vec<NoteSummary>,
    loaded: bool,
    pub tasks: TaskBoard,
    pub vitals: VitalsLog,
    pub calendar: CalendarController,
    pub analytics: AnalyticsController,
    calendar_loaded: bool,
}

impl<B: Backend> NurseDashboard<B> {
    /// Build the dashboard, loading (or seeding) the local-only
    /// collections from the store.
    pub fn new(backend: B, store: Arc<LocalStore>) -> Result<Self, StoreError> {
        Ok(Self {
            backend,
            nav: NurseNav::new(),
            patients: Vec::new(),
            notes: Vec::new(),
            loaded: false,
            tasks: TaskBoard::load(Arc::clone(&store))?,
            vitals: VitalsLog::load(store)?,
            calendar: CalendarController::new(MonthRef::current()),
            analytics: AnalyticsController::new(),
            calendar_loaded: false,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_view(&self) -> NurseView {
        self.nav.current()
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    /// Initial parallel load of roster and notes.
    pub async fn start(&mut self) -> Result<(), ApiError> {
        let (patients, notes) =
            tokio::try_join!(self.backend.get_patients(), self.backend.get_notes())?;
        self.patients = patients;
        self.notes = notes;
        self.loaded = true;
        Ok(())
    }

    pub async fn refetch_notes(&mut self) -> Result<(), ApiError> {
        self.notes = self.backend.get_notes().await?;
        Ok(())
    }

    /// Library view, newest first. Derived at read time; the held
    /// collection keeps the server's order.
    pub fn library(&self) -> Vec<&NoteSummary> {
        let mut view: Vec<&NoteSummary> = self.notes.iter().collect();
        view.sort_by(|a, b| {
            parse_timestamp(&b.created_at).cmp(&parse_timestamp(&a.created_at))
        });
        view
    }

    /// Navigate and run the landing view's activation effect.
    pub async fn navigate(&mut self, view: NurseView) -> Result<(), ApiError> {
        match self.nav.goto(view) {
            ActivationEffect::RefetchNotes => self.refetch_notes().await,
            ActivationEffect::LoadIfNeverLoaded => match view {
                NurseView::Patients => {
                    if self.loaded {
                        return Ok(());
                    }
                    self.start().await
                }
                NurseView::Analytics => self.analytics.activate(&self.backend).await,
                NurseView::Calendar => {
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

    pub async fn quick_action(&mut self, action: NurseQuickAction) -> Result<(), ApiError> {
        self.navigate(action.destination()).await
    }

    /// Manual note save, then refetch so the library shows it.
    pub async fn create_note(&mut self, form: &NurseNoteForm) -> Result<Note, ApiError> {
        let note = self
            .backend
            .create_note(&NewNote {
                patient_id: form.patient_id,
                title: form.title(),
                content: form.body(),
                note_type: "nurse_note".into(),
            })
            .await?;
        self.refetch_notes().await?;
        Ok(note)
    }

    /// AI compose chain, then refetch.
    pub async fn compose_with_ai(&mut self, form: &NurseNoteForm) -> Result<Note, ComposeError> {
        let note = summary::compose_with_ai(
            &self.backend,
            &ComposeRequest {
                patient_id: form.patient_id,
                title: form.title(),
                note_type: "nurse_note".into(),
                sections: form.sections.clone(),
            },
        )
        .await?;
        if let Err(e) = self.refetch_notes().await {
            tracing::warn!(error = %e, "note refetch after compose failed");
        }
        Ok(note)
    }

    /// Open a note: detail backfill plus passive summarization.
    pub async fn view_note(&self, note: NoteSummary) -> NoteView {
        summary::view_note(&self.backend, note).await
    }

    /// Render and write the shift report for the first five patients.
    pub fn export_shift_report(&self, dir: PathBuf) -> Result<PathBuf, StoreError> {
        crate::report::export(&self.patients, dir)
    }
}
