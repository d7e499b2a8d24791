//! Doctor clinical notes controller.
//!
//! The library and search surfaces are fresh-on-entry: every activation
//! refetches the note list and re-sorts it newest-first (unlike the
//! analytics surface, which shows the server's order untouched). Manual
//! saves and AI generation both end by refetching so the library
//! reflects the new note immediately.

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::{parse_timestamp, NewNote, NoteSummary};
use crate::summary::{self, ComposeError, NoteView};

/// Compose-form input. Template fields are label/value pairs from the
/// selected note template; blank values are skipped when the body is
/// assembled.
#[derive(Debug, Clone, Default)]
pub struct DoctorNoteForm {
    pub patient_id: Option<i64>,
    pub note_type: String,
    pub visit_date: String,
    pub chief_complaint: String,
    pub template_fields: Vec<(String, String)>,
}

impl DoctorNoteForm {
    pub fn title(&self) -> String {
        format!("{} - {}", self.note_type, self.visit_date)
    }

    fn body(&self) -> String {
        let mut content = String::new();
        if !self.chief_complaint.trim().is_empty() {
            content.push_str(&format!("**Chief Complaint:** {}\n\n", self.chief_complaint));
        }
        for (label, value) in &self.template_fields {
            if !value.trim().is_empty() {
                content.push_str(&format!("**{label}:**\n{value}\n\n"));
            }
        }
        let trimmed = content.trim();
        if trimmed.is_empty() {
            "No content provided".to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn has_content(&self) -> bool {
        !self.chief_complaint.trim().is_empty()
            || self.template_fields.iter().any(|(_, v)| !v.trim().is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NoteFormError {
    #[error("Please select a patient")]
    NoPatient,
    #[error("Please enter some content for the note")]
    NoContent,
    #[error("Please enter a chief complaint to generate AI note")]
    NoChiefComplaint,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

#[derive(Default)]
pub struct NotesController {
    notes: Vec<NoteSummary>,
}

impl NotesController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest-first library view.
    pub fn notes(&self) -> &[NoteSummary] {
        &self.notes
    }

    /// Fetch the list and sort it newest-first. Runs on every library or
    /// search activation. On failure the held collection stays.
    pub async fn refetch<B: Backend>(&mut self, backend: &B) -> Result<(), ApiError> {
        let mut notes = backend.get_notes().await?;
        notes.sort_by(|a, b| {
            let a_time = parse_timestamp(&a.created_at);
            let b_time = parse_timestamp(&b.created_at);
            b_time.cmp(&a_time)
        });
        tracing::debug!(count = notes.len(), "note library refreshed");
        self.notes = notes;
        Ok(())
    }

    /// Case-insensitive filter across title, summary, type, patient and
    /// author. A blank term matches everything.
    pub fn search(&self, term: &str) -> Vec<&NoteSummary> {
        if term.is_empty() {
            return self.notes.iter().collect();
        }
        let term = term.to_lowercase();
        self.notes
            .iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&term)
                    || note
                        .summary
                        .as_deref()
                        .map(|s| s.to_lowercase().contains(&term))
                        .unwrap_or(false)
                    || note.note_type.to_lowercase().contains(&term)
                    || note.patient_name.to_lowercase().contains(&term)
                    || note.author_name.to_lowercase().contains(&term)
            })
            .collect()
    }

    /// Manual save: validate, create, refetch.
    pub async fn save_note<B: Backend>(
        &mut self,
        backend: &B,
        form: &DoctorNoteForm,
    ) -> Result<(), NoteFormError> {
        let patient_id = form.patient_id.ok_or(NoteFormError::NoPatient)?;
        if !form.has_content() {
            return Err(NoteFormError::NoContent);
        }

        backend
            .create_note(&NewNote {
                patient_id,
                title: form.title(),
                content: form.body(),
                note_type: "doctor_note".into(),
            })
            .await?;
        self.refetch(backend).await?;
        Ok(())
    }

    /// AI generation: create a provisional note from the chief
    /// complaint, summarize, rewrite with the result, refetch.
    pub async fn generate_with_ai<B: Backend>(
        &mut self,
        backend: &B,
        form: &DoctorNoteForm,
    ) -> Result<(), NoteFormError> {
        let patient_id = form.patient_id.ok_or(NoteFormError::NoPatient)?;
        if form.chief_complaint.trim().is_empty() {
            return Err(NoteFormError::NoChiefComplaint);
        }

        let chief_complaint = form.chief_complaint.clone();
        let payload = NewNote {
            patient_id,
            title: form.title(),
            content: format!(
                "**Chief Complaint:** {chief_complaint}\n\n*AI-generated content will be added upon processing...*"
            ),
            note_type: "doctor_note".into(),
        };
        summary::compose_note_chain(backend, payload, move |result| {
            format!(
                "**Chief Complaint:** {chief_complaint}\n\n**AI Summary:**\n{}\n\n**Risk Level:** {}\n\n**Recommendations:**\n{}",
                result.summary, result.risk_level, result.recommendations
            )
        })
        .await?;

        self.refetch(backend).await?;
        Ok(())
    }

    /// Open a note from the library: detail backfill plus passive
    /// summarization.
    pub async fn view_note<B: Backend>(&self, backend: &B, note: NoteSummary) -> NoteView {
        summary::view_note(backend, note).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use std::sync::atomic::Ordering;

    fn list_item(id: i64, title: &str, created_at: &str) -> NoteSummary {
        NoteSummary {
            id,
            patient_id: Some(1),
            title: title.into(),
            note_type: "doctor_note".into(),
            content: None,
            summary: None,
            risk_level: None,
            recommendations: None,
            created_at: created_at.into(),
            author_name: "Dr. Chen".into(),
            patient_name: "John Doe".into(),
        }
    }

    fn form() -> DoctorNoteForm {
        DoctorNoteForm {
            patient_id: Some(1),
            note_type: "Progress Note".into(),
            visit_date: "2025-06-18".into(),
            chief_complaint: "Persistent headache".into(),
            template_fields: vec![
                ("Assessment".into(), "Tension-type, no red flags".into()),
                ("Plan".into(), "".into()),
            ],
        }
    }

    #[tokio::test]
    async fn refetch_sorts_newest_first_regardless_of_server_order() {
        let mock = MockBackend::new().with_notes(vec![
            list_item(1, "Old", "2025-06-01T08:00:00"),
            list_item(2, "New", "2025-06-18T08:00:00"),
            list_item(3, "Middle", "2025-06-10T08:00:00"),
        ]);
        let mut controller = NotesController::new();
        controller.refetch(&mock).await.unwrap();

        let titles: Vec<_> = controller.notes().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["New", "Middle", "Old"]);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_previous_collection() {
        let mock = MockBackend::new().with_notes(vec![list_item(1, "Kept", "2025-06-01T08:00:00")]);
        let mut controller = NotesController::new();
        controller.refetch(&mock).await.unwrap();

        mock.fail_notes.store(true, Ordering::SeqCst);
        assert!(controller.refetch(&mock).await.is_err());
        assert_eq!(controller.notes().len(), 1);
    }

    #[tokio::test]
    async fn search_matches_across_fields_case_insensitively() {
        let mock = MockBackend::new().with_notes(vec![
            list_item(1, "Follow-up Visit", "2025-06-01T08:00:00"),
            list_item(2, "Annual Physical", "2025-06-02T08:00:00"),
        ]);
        let mut controller = NotesController::new();
        controller.refetch(&mock).await.unwrap();

        assert_eq!(controller.search("follow").len(), 1);
        assert_eq!(controller.search("john doe").len(), 2);
        assert_eq!(controller.search("").len(), 2);
        assert!(controller.search("cardiology").is_empty());
    }

    #[test]
    fn body_skips_blank_template_fields() {
        let body = form().body();
        assert!(body.starts_with("**Chief Complaint:** Persistent headache"));
        assert!(body.contains("**Assessment:**\nTension-type, no red flags"));
        assert!(!body.contains("**Plan:**"));
    }

    #[tokio::test]
    async fn save_requires_patient_and_content() {
        let mock = MockBackend::new();
        let mut controller = NotesController::new();

        let mut no_patient = form();
        no_patient.patient_id = None;
        assert!(matches!(
            controller.save_note(&mock, &no_patient).await,
            Err(NoteFormError::NoPatient)
        ));

        let mut empty = form();
        empty.chief_complaint.clear();
        empty.template_fields.clear();
        assert!(matches!(
            controller.save_note(&mock, &empty).await,
            Err(NoteFormError::NoContent)
        ));
        assert_eq!(mock.create_note_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn save_creates_then_refetches() {
        let mock = MockBackend::new();
        let mut controller = NotesController::new();
        controller.save_note(&mock, &form()).await.unwrap();

        assert_eq!(mock.create_note_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.get_notes_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generate_requires_a_chief_complaint() {
        let mock = MockBackend::new();
        let mut controller = NotesController::new();
        let mut no_complaint = form();
        no_complaint.chief_complaint = "   ".into();

        assert!(matches!(
            controller.generate_with_ai(&mock, &no_complaint).await,
            Err(NoteFormError::NoChiefComplaint)
        ));
    }

    #[tokio::test]
    async fn generate_runs_the_full_chain() {
        let mock = MockBackend::new();
        let mut controller = NotesController::new();
        controller.generate_with_ai(&mock, &form()).await.unwrap();

        assert_eq!(mock.create_note_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.summarize_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.update_note_calls.load(Ordering::SeqCst), 1);

        // Finalized body replaced the placeholder.
        let details = mock.note_details.lock().unwrap();
        let note = details.values().next().unwrap();
        assert!(note.content.contains("**AI Summary:**"));
        assert!(!note.content.contains("upon processing"));
    }

    #[tokio::test]
    async fn generate_surfaces_orphan_when_chain_breaks() {
        let mock = MockBackend::new();
        mock.fail_summarize.store(true, Ordering::SeqCst);
        let mut controller = NotesController::new();

        let err = controller.generate_with_ai(&mock, &form()).await.unwrap_err();
        assert!(matches!(
            err,
            NoteFormError::Compose(ComposeError::AfterCreate { .. })
        ));
    }
}
