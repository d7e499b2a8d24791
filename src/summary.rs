//! AI summary lifecycle.
//!
//! Three flows share the summarization endpoint and have deliberately
//! different failure postures:
//! - viewing a note passively requests a summary when one is missing,
//!   and swallows failure (the summary is decoration, never a blocker);
//! - composing a note with AI is a create → summarize → update chain
//!   where a failure after creation leaves an orphaned provisional note
//!   on the server (there is no delete endpoint) and must report its id;
//! - per-patient summaries are cached and deduplicated so repeated
//!   clicks never stack requests for the same patient.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::{NewNote, Note, NoteSummary, NoteSummaryResult};

// ─── Passive per-note summaries ───────────────────────────────────────────────

/// Where a note's ephemeral summary stands after a view action. A
/// `Ready` value is display-only; it is not written back to the note.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryState {
    /// Nothing requested: the note already has a persisted summary, or
    /// has no content to summarize.
    NotRequested,
    Ready(NoteSummaryResult),
    /// The passive request failed. Not surfaced as an error.
    Failed,
}

/// A note opened for viewing plus its ephemeral summary state.
#[derive(Debug, Clone)]
pub struct NoteView {
    pub note: NoteSummary,
    pub summary: SummaryState,
}

/// Open a note from the list: backfill missing content with a detail
/// fetch, then passively summarize when no summary is persisted.
///
/// Neither fetch may block the view. A failed detail fetch leaves the
/// list projection as-is; a failed summarization leaves `Failed` state
/// and nothing else.
pub async fn view_note<B: Backend>(backend: &B, mut note: NoteSummary) -> NoteView {
    if note.content.is_none() {
        match backend.get_note(note.id).await {
            Ok(detail) => note.merge_detail(&detail),
            Err(e) => {
                tracing::warn!(note_id = note.id, error = %e, "detail fetch failed, viewing list copy");
            }
        }
    }

    let summary = if note.wants_summary() {
        match backend.summarize_note(note.id).await {
            Ok(result) => SummaryState::Ready(result),
            Err(e) => {
                tracing::warn!(note_id = note.id, error = %e, "passive summarization failed");
                SummaryState::Failed
            }
        }
    } else {
        SummaryState::NotRequested
    };

    NoteView { note, summary }
}

// ─── AI-composed notes ────────────────────────────────────────────────────────

/// Structured sections of a nurse note.
#[derive(Debug, Clone, Default)]
pub struct NoteSections {
    pub vitals: String,
    pub observations: String,
    pub interventions: String,
    pub patient_response: String,
}

impl NoteSections {
    /// The compose form requires observations or vitals before AI
    /// generation may start.
    pub fn has_input(&self) -> bool {
        !self.observations.trim().is_empty() || !self.vitals.trim().is_empty()
    }

    /// Body written at creation time, before the summary exists.
    pub fn provisional_content(&self) -> String {
        format!(
            "**Vitals**: {}\n\n**Observations**: {}\n\n**Interventions**: {}\n\n**Patient Response**: {}\n\n*AI-generated summary will be added...*",
            self.vitals, self.observations, self.interventions, self.patient_response
        )
    }

    /// Body written once the summarization result is in hand.
    pub fn final_content(&self, result: &NoteSummaryResult) -> String {
        format!(
            "**Vitals**: {}\n\n**Observations**: {}\n\n**Interventions**: {}\n\n**Patient Response**: {}\n\n---\n\n**AI Summary:**\n{}\n\n**Risk Level:** {}\n\n**Recommendations:**\n{}",
            self.vitals,
            self.observations,
            self.interventions,
            self.patient_response,
            result.summary,
            result.risk_level,
            result.recommendations
        )
    }
}

#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub patient_id: i64,
    pub title: String,
    pub note_type: String,
    pub sections: NoteSections,
}

/// Failure of the compose chain, split by whether a note was already
/// persisted when things went wrong.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Please enter observations or vitals to generate AI note")]
    NoInput,

    /// The initial create failed; the server holds nothing.
    #[error("{0}")]
    BeforeCreate(ApiError),

    /// Summarize or update failed after the provisional note was
    /// created. The note exists server-side with placeholder content
    /// and cannot be rolled back.
    #[error("Note {note_id} was created but AI processing failed: {source}")]
    AfterCreate { note_id: i64, source: ApiError },
}

/// Create the provisional note, summarize it, and rewrite it with the
/// finalized body. Both AI-composed note flows (doctor and nurse) run
/// through here; only the content templates differ.
pub async fn compose_note_chain<B, F>(
    backend: &B,
    payload: NewNote,
    finalize: F,
) -> Result<Note, ComposeError>
where
    B: Backend,
    F: FnOnce(&NoteSummaryResult) -> String,
{
    let created = backend
        .create_note(&payload)
        .await
        .map_err(ComposeError::BeforeCreate)?;
    tracing::info!(note_id = created.id, "provisional note created, summarizing");

    let result = backend
        .summarize_note(created.id)
        .await
        .map_err(|source| ComposeError::AfterCreate {
            note_id: created.id,
            source,
        })?;

    let finalized = NewNote {
        content: finalize(&result),
        ..payload
    };
    backend
        .update_note(created.id, &finalized)
        .await
        .map_err(|source| ComposeError::AfterCreate {
            note_id: created.id,
            source,
        })
}

/// Nurse structured compose over the chain.
pub async fn compose_with_ai<B: Backend>(
    backend: &B,
    request: &ComposeRequest,
) -> Result<Note, ComposeError> {
    if !request.sections.has_input() {
        return Err(ComposeError::NoInput);
    }

    let payload = NewNote {
        patient_id: request.patient_id,
        title: request.title.clone(),
        content: request.sections.provisional_content(),
        note_type: request.note_type.clone(),
    };
    let sections = request.sections.clone();
    compose_note_chain(backend, payload, move |result| {
        sections.final_content(result)
    })
    .await
}

// ─── Cached per-patient summaries ─────────────────────────────────────────────

/// One-shot summary per patient with request deduplication. Concurrent
/// `generate` calls for the same patient collapse to a single backend
/// request; different patients proceed independently.
#[derive(Default)]
pub struct PatientSummaryCache {
    summaries: Mutex<HashMap<i64, String>>,
    in_flight: Mutex<HashSet<i64>>,
}

impl PatientSummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached summary, if one has been generated.
    pub fn get(&self, patient_id: i64) -> Option<String> {
        self.summaries.lock().ok()?.get(&patient_id).cloned()
    }

    pub fn is_loading(&self, patient_id: i64) -> bool {
        self.in_flight
            .lock()
            .map(|g| g.contains(&patient_id))
            .unwrap_or(false)
    }

    /// Request a summary. Returns `Ok(None)` when another request for
    /// this patient is already in flight; the eventual result lands in
    /// the cache for both callers.
    pub async fn generate<B: Backend>(
        &self,
        backend: &B,
        patient_id: i64,
    ) -> Result<Option<String>, ApiError> {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if !in_flight.insert(patient_id) {
                tracing::debug!(patient_id, "summary request already in flight, skipping");
                return Ok(None);
            }
        }

        let outcome = backend.get_patient_summary(patient_id).await;

        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&patient_id);
        }

        let response = outcome?;
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.insert(patient_id, response.summary.clone());
        }
        Ok(Some(response.summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use std::sync::atomic::Ordering;

    fn list_item(id: i64, content: Option<&str>, summary: Option<&str>) -> NoteSummary {
        NoteSummary {
            id,
            patient_id: Some(1),
            title: "Assessment Note - 2025-06-01".into(),
            note_type: "nurse_note".into(),
            content: content.map(Into::into),
            summary: summary.map(Into::into),
            risk_level: None,
            recommendations: None,
            created_at: "2025-06-01T10:00:00".into(),
            author_name: "Nurse Park".into(),
            patient_name: "John Doe".into(),
        }
    }

    fn detail(id: i64) -> Note {
        Note {
            id,
            patient_id: 1,
            author_id: 3,
            note_type: "nurse_note".into(),
            title: "Assessment Note - 2025-06-01".into(),
            content: "Patient resting comfortably.".into(),
            status: "final".into(),
            summary: None,
            risk_level: None,
            recommendations: None,
            created_at: "2025-06-01T10:00:00".into(),
            updated_at: "2025-06-01T10:00:00".into(),
        }
    }

    #[tokio::test]
    async fn view_backfills_content_then_passively_summarizes() {
        let mock = MockBackend::new().with_note_detail(detail(5));
        let view = view_note(&mock, list_item(5, None, None)).await;

        assert_eq!(view.note.content.as_deref(), Some("Patient resting comfortably."));
        assert!(matches!(view.summary, SummaryState::Ready(_)));
        assert_eq!(mock.get_note_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn view_skips_summarize_when_summary_persisted() {
        let mock = MockBackend::new().with_note_detail(detail(5));
        let view = view_note(&mock, list_item(5, Some("content"), Some("existing"))).await;

        assert_eq!(view.summary, SummaryState::NotRequested);
        assert_eq!(mock.summarize_calls.load(Ordering::SeqCst), 0);
        // Content present, so no detail fetch either.
        assert_eq!(mock.get_note_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_passive_summary_never_blocks_the_view() {
        let mock = MockBackend::new().with_note_detail(detail(5));
        mock.fail_summarize.store(true, Ordering::SeqCst);

        let view = view_note(&mock, list_item(5, None, None)).await;

        assert!(view.note.content.is_some());
        assert_eq!(view.summary, SummaryState::Failed);
    }

    fn compose_request() -> ComposeRequest {
        ComposeRequest {
            patient_id: 1,
            title: "Assessment Note - 2025-06-01".into(),
            note_type: "nurse_note".into(),
            sections: NoteSections {
                vitals: "BP 120/80, HR 72".into(),
                observations: "Alert and oriented.".into(),
                interventions: "Meds administered.".into(),
                patient_response: "Tolerated well.".into(),
            },
        }
    }

    #[tokio::test]
    async fn compose_chain_finalizes_content_with_summary_block() {
        let mock = MockBackend::new();
        let note = compose_with_ai(&mock, &compose_request()).await.unwrap();

        assert!(note.content.contains("**AI Summary:**"));
        assert!(!note.content.contains("will be added"));
        assert_eq!(mock.create_note_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.update_note_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn compose_without_input_is_rejected_before_any_call() {
        let mock = MockBackend::new();
        let mut request = compose_request();
        request.sections = NoteSections::default();

        let err = compose_with_ai(&mock, &request).await.unwrap_err();
        assert!(matches!(err, ComposeError::NoInput));
        assert_eq!(mock.create_note_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_after_create_reports_the_orphaned_note_id() {
        let mock = MockBackend::new();
        mock.fail_summarize.store(true, Ordering::SeqCst);

        let err = compose_with_ai(&mock, &compose_request()).await.unwrap_err();
        match err {
            ComposeError::AfterCreate { note_id, .. } => {
                // The provisional note really exists server-side.
                assert!(mock.get_note(note_id).await.is_ok());
            }
            other => panic!("expected AfterCreate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_update_also_reports_the_orphan() {
        let mock = MockBackend::new();
        mock.fail_update_note.store(true, Ordering::SeqCst);

        let err = compose_with_ai(&mock, &compose_request()).await.unwrap_err();
        assert!(matches!(err, ComposeError::AfterCreate { .. }));
        assert_eq!(mock.summarize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_summary_clicks_collapse_to_one_request() {
        let mock = MockBackend::new();
        let cache = PatientSummaryCache::new();

        let (a, b) = tokio::join!(cache.generate(&mock, 1), cache.generate(&mock, 1));

        let resolved = [a.unwrap(), b.unwrap()];
        assert_eq!(resolved.iter().flatten().count(), 1);
        assert_eq!(mock.patient_summary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(1).as_deref(), Some("Stable overall."));
    }

    #[tokio::test]
    async fn different_patients_do_not_dedupe_against_each_other() {
        let mock = MockBackend::new();
        let cache = PatientSummaryCache::new();

        let (a, b) = tokio::join!(cache.generate(&mock, 1), cache.generate(&mock, 2));
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());
        assert_eq!(mock.patient_summary_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn in_flight_flag_clears_after_failure() {
        let mock = MockBackend::new();
        let cache = PatientSummaryCache::new();
        cache.generate(&mock, 1).await.unwrap();
        assert!(!cache.is_loading(1));
    }
}
