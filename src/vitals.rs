//! Vitals log — client-only vitals capture over the local store.
//!
//! Records append in capture order; the history surface derives a
//! newest-first view at read time. Blood pressure is captured as two
//! integers and stored as a composed "sys/dia" string.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Patient, VitalRecord};
use crate::store::LocalStore;

/// Capture form with the standard-adult defaults the record surface
/// starts from.
#[derive(Debug, Clone)]
pub struct VitalsForm {
    pub patient_id: i64,
    pub patient_name: String,
    pub systolic: i32,
    pub diastolic: i32,
    pub heart_rate: i32,
    pub temperature: f64,
    pub respiratory_rate: i32,
    pub spo2: i32,
    /// 0-10 numeric rating scale; out-of-range input is clamped on
    /// record.
    pub pain_scale: u8,
    pub notes: String,
}

impl Default for VitalsForm {
    fn default() -> Self {
        Self {
            patient_id: 1,
            patient_name: String::new(),
            systolic: 120,
            diastolic: 80,
            heart_rate: 72,
            temperature: 98.6,
            respiratory_rate: 16,
            spo2: 98,
            pain_scale: 0,
            notes: String::new(),
        }
    }
}

pub struct VitalsLog {
    store: Arc<LocalStore>,
    vitals: Vec<VitalRecord>,
}

impl VitalsLog {
    pub fn load(store: Arc<LocalStore>) -> Result<Self, StoreError> {
        let vitals = store.load_vitals()?;
        Ok(Self { store, vitals })
    }

    /// Record a capture. The display name resolves against the loaded
    /// patient roster; an unmatched id falls back to the form's free-text
    /// name, then to a placeholder.
    pub fn record(
        &mut self,
        form: &VitalsForm,
        patients: &[Patient],
    ) -> Result<&VitalRecord, StoreError> {
        let patient_name = patients
            .iter()
            .find(|p| p.id == form.patient_id)
            .map(|p| {
                format!(
                    "{} • MRN {}",
                    p.display_name(),
                    p.medical_record_number
                )
            })
            .unwrap_or_else(|| {
                if form.patient_name.is_empty() {
                    "Patient #1".to_string()
                } else {
                    form.patient_name.clone()
                }
            });

        let record = VitalRecord {
            id: Uuid::new_v4().to_string(),
            patient_id: form.patient_id,
            patient_name,
            timestamp: Utc::now(),
            bp: format!("{}/{}", form.systolic, form.diastolic),
            heart_rate: form.heart_rate,
            temperature: form.temperature,
            respiratory_rate: form.respiratory_rate,
            spo2: form.spo2,
            pain_scale: form.pain_scale.min(10),
            notes: form.notes.clone(),
        };
        tracing::info!(record_id = %record.id, patient_id = record.patient_id, "vitals recorded");
        self.vitals.push(record);
        self.store.save_vitals(&self.vitals)?;
        Ok(self.vitals.last().unwrap())
    }

    /// Capture-order records.
    pub fn records(&self) -> &[VitalRecord] {
        &self.vitals
    }

    /// Newest-first history view, optionally narrowed to one patient
    /// display name.
    pub fn history(&self, patient_name: Option<&str>) -> Vec<&VitalRecord> {
        let mut view: Vec<&VitalRecord> = self
            .vitals
            .iter()
            .filter(|v| patient_name.map(|n| v.patient_name == n).unwrap_or(true))
            .collect();
        view.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        view
    }

    /// Distinct patient names for the history filter, in first-seen order.
    pub fn patient_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for record in &self.vitals {
            if !names.contains(&record.patient_name) {
                names.push(record.patient_name.clone());
            }
        }
        names
    }
}
