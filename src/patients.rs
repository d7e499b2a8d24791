//! Patients tab controller.
//!
//! Loads the roster and the note list together, once: the tab is
//! stale-tolerant and never refetches on re-entry. A failed load keeps
//! whatever was previously held and stays unloaded so the next
//! activation retries.

use chrono::{Datelike, NaiveDate, Utc};

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::{NoteSummary, Patient};

/// Outcome of the roster search box.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Blank query: nothing to report.
    Empty,
    Found(Patient),
    NotFound,
}

impl SearchOutcome {
    pub fn message(&self) -> Option<String> {
        match self {
            SearchOutcome::Empty => None,
            SearchOutcome::Found(p) => Some(format!("Located {}", p.display_name())),
            SearchOutcome::NotFound => Some("No patient matched that query.".into()),
        }
    }
}

/// Roster-level aggregates for the analytics sub-surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationInsights {
    pub median_age: u32,
    pub high_risk_count: usize,
    /// Share of patients whose history names a chronic condition, 0-100.
    pub chronic_percentage: u32,
}

const CHRONIC_MARKERS: [&str; 4] = ["diabetes", "hypertension", "copd", "asthma"];

#[derive(Default)]
pub struct PatientsController {
    patients: Vec<Patient>,
    notes: Vec<NoteSummary>,
    loaded: bool,
}

impl PatientsController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Load roster and notes in parallel on first activation; later
    /// activations are no-ops.
    pub async fn activate<B: Backend>(&mut self, backend: &B) -> Result<(), ApiError> {
        if self.loaded {
            return Ok(());
        }
        let (patients, notes) = tokio::try_join!(backend.get_patients(), backend.get_notes())?;
        tracing::debug!(patients = patients.len(), notes = notes.len(), "patients tab loaded");
        self.patients = patients;
        self.notes = notes;
        self.loaded = true;
        Ok(())
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    /// Up to two most recent notes for one patient, in server order.
    pub fn notes_for(&self, patient_id: i64) -> Vec<&NoteSummary> {
        self.notes
            .iter()
            .filter(|n| n.patient_id == Some(patient_id))
            .take(2)
            .collect()
    }

    /// Search by numeric id first, then by case-insensitive name
    /// fragment.
    pub fn search(&self, query: &str) -> SearchOutcome {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return SearchOutcome::Empty;
        }

        if let Ok(id) = query.parse::<i64>() {
            if let Some(found) = self.patients.iter().find(|p| p.id == id) {
                return SearchOutcome::Found(found.clone());
            }
        }

        self.patients
            .iter()
            .find(|p| p.display_name().to_lowercase().contains(&query))
            .map(|p| SearchOutcome::Found(p.clone()))
            .unwrap_or(SearchOutcome::NotFound)
    }

    /// Display risk bucket for a roster row. Rotates by position until
    /// per-patient scoring arrives from the risk endpoint.
    pub fn risk_label(index: usize) -> &'static str {
        ["Low", "Medium", "High"][index % 3]
    }

    pub fn insights(&self) -> PopulationInsights {
        self.insights_on(Utc::now().date_naive())
    }

    fn insights_on(&self, today: NaiveDate) -> PopulationInsights {
        let mut ages: Vec<u32> = self
            .patients
            .iter()
            .map(|p| age_on(&p.date_of_birth, today))
            .collect();
        ages.sort_unstable();
        let median_age = ages.get(ages.len() / 2).copied().unwrap_or(0);

        let high_risk_count = (0..self.patients.len())
            .filter(|&i| Self::risk_label(i) == "High")
            .count();

        let chronic = self
            .patients
            .iter()
            .filter(|p| {
                let history = p
                    .medical_history
                    .as_deref()
                    .unwrap_or("General Care")
                    .to_lowercase();
                CHRONIC_MARKERS.iter().any(|m| history.contains(m))
            })
            .count();
        let chronic_percentage = if self.patients.is_empty() {
            0
        } else {
            (chronic as f64 / self.patients.len() as f64 * 100.0).round() as u32
        };

        PopulationInsights {
            median_age,
            high_risk_count,
            chronic_percentage,
        }
    }
}

/// Whole years between a `YYYY-MM-DD` birth date and `today`.
/// Unparseable input counts as zero.
pub fn age_on(date_of_birth: &str, today: NaiveDate) -> u32 {
    let Ok(birth) = NaiveDate::parse_from_str(date_of_birth, "%Y-%m-%d") else {
        return 0;
    };
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use std::sync::atomic::Ordering;

    fn patient(id: i64, first: &str, last: &str, history: Option<&str>) -> Patient {
        Patient {
            id,
            patient_id: format!("P-{id:04}"),
            first_name: first.into(),
            last_name: last.into(),
            date_of_birth: "1980-02-14".into(),
            medical_record_number: format!("MRN-{id}"),
            allergies: None,
            medical_history: history.map(Into::into),
        }
    }

    fn note(id: i64, patient_id: i64) -> NoteSummary {
        NoteSummary {
            id,
            patient_id: Some(patient_id),
            title: format!("Note {id}"),
            note_type: "doctor_note".into(),
            content: None,
            summary: None,
            risk_level: None,
            recommendations: None,
            created_at: "2025-06-01T10:00:00".into(),
            author_name: "Dr. Chen".into(),
            patient_name: "John Doe".into(),
        }
    }

    #[tokio::test]
    async fn first_activation_loads_both_collections_in_one_pass() {
        let mock = MockBackend::new()
            .with_patients(vec![patient(1, "John", "Doe", None)])
            .with_notes(vec![note(1, 1)]);
        let mut controller = PatientsController::new();

        controller.activate(&mock).await.unwrap();
        assert_eq!(controller.patients().len(), 1);
        assert_eq!(mock.get_patients_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.get_notes_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn re_entry_is_stale_tolerant() {
        let mock = MockBackend::new().with_patients(vec![patient(1, "John", "Doe", None)]);
        let mut controller = PatientsController::new();

        controller.activate(&mock).await.unwrap();
        controller.activate(&mock).await.unwrap();
        controller.activate(&mock).await.unwrap();

        assert_eq!(mock.get_patients_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_state_and_retries_next_time() {
        let mock = MockBackend::new().with_patients(vec![patient(1, "John", "Doe", None)]);
        mock.fail_notes.store(true, Ordering::SeqCst);
        let mut controller = PatientsController::new();

        assert!(controller.activate(&mock).await.is_err());
        assert!(!controller.is_loaded());
        assert!(controller.patients().is_empty());

        mock.fail_notes.store(false, Ordering::SeqCst);
        controller.activate(&mock).await.unwrap();
        assert!(controller.is_loaded());
    }

    #[tokio::test]
    async fn notes_for_takes_first_two_in_server_order() {
        let mock = MockBackend::new()
            .with_patients(vec![patient(1, "John", "Doe", None)])
            .with_notes(vec![note(10, 1), note(11, 1), note(12, 1), note(13, 2)]);
        let mut controller = PatientsController::new();
        controller.activate(&mock).await.unwrap();

        let for_one = controller.notes_for(1);
        assert_eq!(for_one.len(), 2);
        assert_eq!(for_one[0].id, 10);
        assert_eq!(for_one[1].id, 11);
    }

    #[tokio::test]
    async fn search_prefers_id_then_name_fragment() {
        let mock = MockBackend::new().with_patients(vec![
            patient(1, "John", "Doe", None),
            patient(2, "Jane", "Ibsen", None),
        ]);
        let mut controller = PatientsController::new();
        controller.activate(&mock).await.unwrap();

        assert!(matches!(
            controller.search("2"),
            SearchOutcome::Found(p) if p.id == 2
        ));
        assert!(matches!(
            controller.search("jane ib"),
            SearchOutcome::Found(p) if p.id == 2
        ));
        assert_eq!(controller.search("  "), SearchOutcome::Empty);
        assert_eq!(controller.search("nobody"), SearchOutcome::NotFound);
    }

    #[test]
    fn age_handles_birthday_not_yet_reached() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(age_on("1980-02-14", today), 45);
        assert_eq!(age_on("1980-07-01", today), 44);
        assert_eq!(age_on("garbage", today), 0);
    }

    #[tokio::test]
    async fn insights_count_chronic_histories_case_insensitively() {
        let mock = MockBackend::new().with_patients(vec![
            patient(1, "A", "One", Some("Type 2 Diabetes")),
            patient(2, "B", "Two", Some("Hypertension, managed")),
            patient(3, "C", "Three", None),
            patient(4, "D", "Four", Some("Seasonal allergies")),
        ]);
        let mut controller = PatientsController::new();
        controller.activate(&mock).await.unwrap();

        let insights = controller.insights();
        assert_eq!(insights.chronic_percentage, 50);
        // Positions 2, 5, 8... rotate to High.
        assert_eq!(insights.high_risk_count, 1);
    }
}
