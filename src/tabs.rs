//! Dashboard navigation state machines.
//!
//! Each dashboard's visible surface is one enum value; sub-tabs live
//! inside their parent variant so an illegal tab/sub-tab pairing cannot
//! be expressed. Navigation goes through `goto`, which reports the
//! activation effects (refetch policies) the owning dashboard must run.
//! The quick actions on the analytics surface are two-step navigations
//! (switch tab, then select a sub-tab) collapsed into a single target
//! view here.

use std::fmt;

// ─── Doctor dashboard ─────────────────────────────────────────────────────────

/// Sub-surfaces of the doctor's clinical notes tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotesSubTab {
    #[default]
    Compose,
    Library,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoctorView {
    #[default]
    Dashboard,
    Patients,
    Notes(NotesSubTab),
    Tasks,
    Analytics,
    Calendar,
}

impl fmt::Display for DoctorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorView::Dashboard => write!(f, "dashboard"),
            DoctorView::Patients => write!(f, "patients"),
            DoctorView::Notes(NotesSubTab::Compose) => write!(f, "notes/compose"),
            DoctorView::Notes(NotesSubTab::Library) => write!(f, "notes/library"),
            DoctorView::Notes(NotesSubTab::Search) => write!(f, "notes/search"),
            DoctorView::Tasks => write!(f, "tasks"),
            DoctorView::Analytics => write!(f, "analytics"),
            DoctorView::Calendar => write!(f, "calendar"),
        }
    }
}

/// What the dashboard must do after a navigation lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationEffect {
    /// First entry into a never-loaded collection: fetch behind a
    /// loading state.
    LoadIfNeverLoaded,
    /// Fresh-on-entry surface: refetch every time it becomes active.
    RefetchNotes,
    /// Stale-tolerant surface: show what is held, no fetch.
    None,
}

#[derive(Debug, Default)]
pub struct DoctorNav {
    current: DoctorView,
}

impl DoctorNav {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> DoctorView {
        self.current
    }

    /// Move to a view and report what the owning dashboard must run.
    ///
    /// Library and Search refetch on every activation — a note created
    /// from the compose surface or by the other role must be visible.
    /// Patients is stale-tolerant after its first load.
    pub fn goto(&mut self, view: DoctorView) -> ActivationEffect {
        let effect = match view {
            DoctorView::Notes(NotesSubTab::Library) | DoctorView::Notes(NotesSubTab::Search) => {
                ActivationEffect::RefetchNotes
            }
            DoctorView::Patients
            | DoctorView::Calendar
            | DoctorView::Analytics
            | DoctorView::Notes(NotesSubTab::Compose) => ActivationEffect::LoadIfNeverLoaded,
            DoctorView::Dashboard | DoctorView::Tasks => ActivationEffect::None,
        };
        tracing::debug!(from = %self.current, to = %view, "doctor navigation");
        self.current = view;
        effect
    }
}

/// Quick actions on the doctor analytics surface. Each is a one-click
/// jump to another tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorQuickAction {
    AddTask,
    ViewTasks,
    OpenNote,
}

impl DoctorQuickAction {
    pub fn destination(self) -> DoctorView {
        match self {
            DoctorQuickAction::AddTask | DoctorQuickAction::ViewTasks => DoctorView::Tasks,
            DoctorQuickAction::OpenNote => DoctorView::Notes(NotesSubTab::Library),
        }
    }
}

// ─── Nurse dashboard ──────────────────────────────────────────────────────────

/// Sub-surfaces of the nurse note-taking area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NurseNotesArea {
    #[default]
    Create,
    Library,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskBoardSubTab {
    #[default]
    Upcoming,
    Completed,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VitalsSubTab {
    #[default]
    Record,
    History,
}

/// The nurse "Notes & Tasks" tab hosts three distinct surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NurseNotesSubTab {
    Notes(NurseNotesArea),
    Tasks(TaskBoardSubTab),
    Vitals(VitalsSubTab),
}

impl Default for NurseNotesSubTab {
    fn default() -> Self {
        NurseNotesSubTab::Notes(NurseNotesArea::Create)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NurseView {
    #[default]
    Dashboard,
    Patients,
    Notes(NurseNotesSubTab),
    Analytics,
    Calendar,
}

impl fmt::Display for NurseView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NurseView::Dashboard => write!(f, "dashboard"),
            NurseView::Patients => write!(f, "patients"),
            NurseView::Notes(NurseNotesSubTab::Notes(NurseNotesArea::Create)) => {
                write!(f, "notes/create")
            }
            NurseView::Notes(NurseNotesSubTab::Notes(NurseNotesArea::Library)) => {
                write!(f, "notes/library")
            }
            NurseView::Notes(NurseNotesSubTab::Tasks(_)) => write!(f, "notes/tasks"),
            NurseView::Notes(NurseNotesSubTab::Vitals(_)) => write!(f, "notes/vitals"),
            NurseView::Analytics => write!(f, "analytics"),
            NurseView::Calendar => write!(f, "calendar"),
        }
    }
}

#[derive(Debug, Default)]
pub struct NurseNav {
    current: NurseView,
}

impl NurseNav {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> NurseView {
        self.current
    }

    /// The nurse note library is fresh-on-entry like the doctor's.
    pub fn goto(&mut self, view: NurseView) -> ActivationEffect {
        let effect = match view {
            NurseView::Notes(NurseNotesSubTab::Notes(NurseNotesArea::Library)) => {
                ActivationEffect::RefetchNotes
            }
            NurseView::Patients | NurseView::Analytics | NurseView::Calendar => {
                ActivationEffect::LoadIfNeverLoaded
            }
            _ => ActivationEffect::None,
        };
        tracing::debug!(from = %self.current, to = %view, "nurse navigation");
        self.current = view;
        effect
    }
}

/// Quick actions on the nurse dashboard and analytics surfaces. Each
/// collapses a tab switch plus a sub-tab selection into one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NurseQuickAction {
    AddNote,
    RecordVitals,
    MedicationLog,
    ViewTasks,
    AddTask,
}

impl NurseQuickAction {
    pub fn destination(self) -> NurseView {
        match self {
            NurseQuickAction::AddNote => {
                NurseView::Notes(NurseNotesSubTab::Notes(NurseNotesArea::Create))
            }
            NurseQuickAction::RecordVitals => {
                NurseView::Notes(NurseNotesSubTab::Vitals(VitalsSubTab::Record))
            }
            NurseQuickAction::MedicationLog => NurseView::Patients,
            NurseQuickAction::ViewTasks => {
                NurseView::Notes(NurseNotesSubTab::Tasks(TaskBoardSubTab::Upcoming))
            }
            NurseQuickAction::AddTask => {
                NurseView::Notes(NurseNotesSubTab::Tasks(TaskBoardSubTab::Add))
            }
        }
    }
}
