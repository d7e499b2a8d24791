//! AI analytics controller.
//!
//! Loads patients, notes, and appointments in one parallel pass on
//! first activation. The recent-notes strip shows the first five notes
//! exactly as the server ordered them — no client re-sort, unlike the
//! note library. High-risk rankings refetch on every request with a
//! fixed limit, and per-patient summaries go through the deduplicating
//! cache.

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::{Appointment, HighRiskPatient, NoteSummary, Patient, PatientTimeline};
use crate::summary::PatientSummaryCache;

/// Ranking size requested from the high-risk endpoint.
pub const HIGH_RISK_LIMIT: usize = 10;

#[derive(Default)]
pub struct AnalyticsController {
    patients: Vec<Patient>,
    notes: Vec<NoteSummary>,
    appointments: Vec<Appointment>,
    high_risk: Vec<HighRiskPatient>,
    pub summaries: PatientSummaryCache,
    loaded: bool,
}

impl AnalyticsController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parallel three-way load, once. Failure keeps previous state and
    /// leaves the controller unloaded for a retry.
    pub async fn activate<B: Backend>(&mut self, backend: &B) -> Result<(), ApiError> {
        if self.loaded {
            return Ok(());
        }
        let (patients, notes, appointments) = tokio::try_join!(
            backend.get_patients(),
            backend.get_notes(),
            backend.get_appointments(None),
        )?;
        tracing::debug!(
            patients = patients.len(),
            notes = notes.len(),
            appointments = appointments.len(),
            "analytics surface loaded"
        );
        self.patients = patients;
        self.notes = notes;
        self.appointments = appointments;
        self.loaded = true;
        Ok(())
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// First five notes in server order. Deliberately not re-sorted.
    pub fn recent_notes(&self) -> &[NoteSummary] {
        let len = self.notes.len().min(5);
        &self.notes[..len]
    }

    /// Recent notes that already carry an AI summary.
    pub fn recent_analyzed_notes(&self) -> Vec<&NoteSummary> {
        self.recent_notes()
            .iter()
            .filter(|n| n.summary.is_some())
            .collect()
    }

    /// Patient cards on the overview strip, capped at six.
    pub fn spotlight_patients(&self) -> &[Patient] {
        let len = self.patients.len().min(6);
        &self.patients[..len]
    }

    pub fn high_risk(&self) -> &[HighRiskPatient] {
        &self.high_risk
    }

    /// Always refetches: rankings shift as notes are analyzed.
    pub async fn refresh_high_risk<B: Backend>(&mut self, backend: &B) -> Result<(), ApiError> {
        self.high_risk = backend.get_high_risk_patients(HIGH_RISK_LIMIT).await?;
        Ok(())
    }

    /// Deduplicated per-patient summary request; the result lands in
    /// `summaries`.
    pub async fn generate_summary<B: Backend>(
        &self,
        backend: &B,
        patient_id: i64,
    ) -> Result<Option<String>, ApiError> {
        self.summaries.generate(backend, patient_id).await
    }

    pub async fn fetch_timeline<B: Backend>(
        &self,
        backend: &B,
        patient_id: i64,
    ) -> Result<PatientTimeline, ApiError> {
        backend.get_patient_timeline(patient_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use std::sync::atomic::Ordering;

    fn patient(id: i64) -> Patient {
        Patient {
            id,
            patient_id: format!("P-{id:04}"),
            first_name: "Pat".into(),
            last_name: format!("Ient{id}"),
            date_of_birth: "1970-01-01".into(),
            medical_record_number: format!("MRN-{id}"),
            allergies: None,
            medical_history: None,
        }
    }

    fn note(id: i64, created_at: &str, summary: Option<&str>) -> NoteSummary {
        NoteSummary {
            id,
            patient_id: Some(1),
            title: format!("Note {id}"),
            note_type: "doctor_note".into(),
            content: None,
            summary: summary.map(Into::into),
            risk_level: None,
            recommendations: None,
            created_at: created_at.into(),
            author_name: "Dr. Chen".into(),
            patient_name: "John Doe".into(),
        }
    }

    fn ranked(patient_id: i64) -> HighRiskPatient {
        HighRiskPatient {
            patient_id,
            patient_name: format!("Patient {patient_id}"),
            risk_level: "high".into(),
            risk_score: 0.9,
            recent_notes_count: 3,
            last_visit: None,
            primary_concerns: vec![],
        }
    }

    #[tokio::test]
    async fn activation_loads_three_collections_in_parallel_once() {
        let mock = MockBackend::new().with_patients(vec![patient(1)]);
        let mut controller = AnalyticsController::new();
        controller.activate(&mock).await.unwrap();
        controller.activate(&mock).await.unwrap();

        assert_eq!(mock.get_patients_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.get_notes_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.get_appointments_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recent_notes_preserve_server_order_unsorted() {
        // Server returns oldest-first on purpose; the strip must not
        // reorder it.
        let mock = MockBackend::new().with_notes(vec![
            note(1, "2025-06-01T08:00:00", Some("s")),
            note(2, "2025-06-18T08:00:00", None),
            note(3, "2025-06-10T08:00:00", Some("s")),
            note(4, "2025-06-02T08:00:00", None),
            note(5, "2025-06-20T08:00:00", Some("s")),
            note(6, "2025-06-21T08:00:00", Some("s")),
        ]);
        let mut controller = AnalyticsController::new();
        controller.activate(&mock).await.unwrap();

        let ids: Vec<_> = controller.recent_notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5]);

        let analyzed: Vec<_> = controller
            .recent_analyzed_notes()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(analyzed, [1, 3, 5]);
    }

    #[tokio::test]
    async fn high_risk_refetches_every_time_with_fixed_limit() {
        let mock = MockBackend::new();
        *mock.high_risk.lock().unwrap() = (1..=15).map(ranked).collect();
        let mut controller = AnalyticsController::new();

        controller.refresh_high_risk(&mock).await.unwrap();
        controller.refresh_high_risk(&mock).await.unwrap();

        assert_eq!(mock.high_risk_calls.load(Ordering::SeqCst), 2);
        assert_eq!(controller.high_risk().len(), HIGH_RISK_LIMIT);
    }

    #[tokio::test]
    async fn summary_requests_land_in_the_shared_cache() {
        let mock = MockBackend::new();
        let controller = AnalyticsController::new();
        let summary = controller.generate_summary(&mock, 3).await.unwrap();
        assert_eq!(summary.as_deref(), Some("Stable overall."));
        assert_eq!(controller.summaries.get(3).as_deref(), Some("Stable overall."));
    }
}
