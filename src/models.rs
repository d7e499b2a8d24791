//! Wire and client-local data shapes.
//!
//! Patient/Note/Appointment are server-owned; the client holds working
//! copies. Tasks exist in two deliberately incompatible shapes
//! (`DoctorTask` vs `NurseTask` — different priority casing and status
//! vocabulary, no conversion) and vitals never leave the client.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
}

// ─── Patients ─────────────────────────────────────────────────────────────────

/// Server-owned identity record. `id` is the stable join key for notes
/// and vitals; `patient_id` is the string MRN alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub medical_record_number: String,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
}

impl Patient {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPatient {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub medical_record_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
}

// ─── Notes ────────────────────────────────────────────────────────────────────

/// Full note as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub patient_id: i64,
    pub author_id: i64,
    pub note_type: String,
    pub title: String,
    pub content: String,
    pub status: String,
    pub summary: Option<String>,
    pub risk_level: Option<String>,
    pub recommendations: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// List projection from `/notes/`. `content` may be absent and must be
/// backfilled with a detail fetch before any consumer needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: i64,
    #[serde(default)]
    pub patient_id: Option<i64>,
    pub title: String,
    pub note_type: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub risk_level: Option<String>,
    pub recommendations: Option<String>,
    pub created_at: String,
    pub author_name: String,
    pub patient_name: String,
}

impl NoteSummary {
    /// Non-destructive merge of a detail fetch into this list item.
    ///
    /// `content` is always taken from the detail response. The AI fields
    /// are only overwritten when the detail response actually carries
    /// them — a detail body lacking `summary`/`risk_level`/
    /// `recommendations` must not discard values already known from the
    /// list endpoint.
    pub fn merge_detail(&mut self, detail: &Note) {
        self.content = Some(detail.content.clone());
        if detail.summary.is_some() {
            self.summary = detail.summary.clone();
        }
        if detail.risk_level.is_some() {
            self.risk_level = detail.risk_level.clone();
        }
        if detail.recommendations.is_some() {
            self.recommendations = detail.recommendations.clone();
        }
    }

    /// Whether the passive summary lifecycle may trigger generation:
    /// content present and non-blank, no persisted summary.
    pub fn wants_summary(&self) -> bool {
        self.summary.is_none()
            && self
                .content
                .as_deref()
                .map(|c| !c.trim().is_empty())
                .unwrap_or(false)
    }
}

/// Creation payload for `/notes/`. `note_type` is restricted server-side
/// to `doctor_note` | `nurse_note`.
#[derive(Debug, Clone, Serialize)]
pub struct NewNote {
    pub patient_id: i64,
    pub title: String,
    pub content: String,
    pub note_type: String,
}

/// Result of `/ai/summarize/{id}/sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummaryResult {
    pub summary: String,
    pub risk_level: String,
    pub recommendations: String,
}

// ─── Appointments ─────────────────────────────────────────────────────────────

/// Calendar entry. `patient_name` is free text, NOT a foreign key —
/// there is no referential integrity with `Patient::id` and callers
/// must not assume it resolves to a patient record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Option<i64>,
    pub title: String,
    pub patient_name: String,
    pub appointment_type: String,
    pub status: String,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
    pub notes: Option<String>,
}

impl Appointment {
    pub fn start(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.start_time)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub title: String,
    pub patient_name: String,
    pub appointment_type: String,
    pub status: String,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ─── AI / risk types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub patient_id: String,
    pub patient_name: String,
    pub risk_level: String,
    pub summary: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighRiskPatient {
    pub patient_id: i64,
    pub patient_name: String,
    pub risk_level: String,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub recent_notes_count: i64,
    pub last_visit: Option<String>,
    #[serde(default)]
    pub primary_concerns: Vec<String>,
}

/// Envelope returned by `/ai/high-risk-patients`.
#[derive(Debug, Clone, Deserialize)]
pub struct HighRiskResponse {
    #[serde(default)]
    pub high_risk_patients: Vec<HighRiskPatient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummaryResponse {
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiStatus {
    pub status: String,
    pub ai_available: bool,
}

/// Aggregate from `/ai/patient-timeline/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientTimeline {
    pub patient: TimelinePatient,
    #[serde(default)]
    pub timeline: Vec<TimelineItem>,
    pub ai_summary: String,
    pub statistics: TimelineStatistics,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelinePatient {
    pub id: i64,
    pub name: String,
    pub mrn: String,
    pub dob: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    pub date: String,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub risk_level: Option<String>,
    pub author: Option<String>,
    pub reason: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineStatistics {
    pub total_visits: i64,
    pub total_appointments: i64,
    #[serde(default)]
    pub risk_distribution: std::collections::HashMap<String, i64>,
    pub last_visit: Option<String>,
}

// ─── Doctor tasks (shared/analytics shape) ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoctorPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoctorTaskStatus {
    Pending,
    Completed,
}

/// Task shape shared between the doctor Tasks tab and the Analytics tab.
/// Field names stay camelCase on disk for parity with the stored form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: DoctorPriority,
    pub due_date: String,
    pub due_time: String,
    pub status: DoctorTaskStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl DoctorTask {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: DoctorPriority,
        due_date: impl Into<String>,
        due_time: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            priority,
            due_date: due_date.into(),
            due_time: due_time.into(),
            status: DoctorTaskStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }
}

// ─── Nurse tasks (local-only shape) ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NursePriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NurseTaskStatus {
    Upcoming,
    Completed,
}

/// Nurse task: persisted only in the local store, never synchronized.
/// Distinct from `DoctorTask` on purpose — capitalized priorities,
/// `upcoming`/`completed` status vocabulary, free-text due label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurseTask {
    pub id: String,
    pub title: String,
    pub due: String,
    pub priority: NursePriority,
    pub status: NurseTaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NurseTask {
    pub fn new(title: impl Into<String>, due: impl Into<String>, priority: NursePriority) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            due: due.into(),
            priority,
            status: NurseTaskStatus::Upcoming,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

// ─── Vitals (local-only) ──────────────────────────────────────────────────────

/// One vitals capture. Owned entirely by the local store; `patient_name`
/// is a denormalized display string and `bp` is "sys/dia".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalRecord {
    pub id: String,
    pub patient_id: i64,
    pub patient_name: String,
    pub timestamp: DateTime<Utc>,
    pub bp: String,
    pub heart_rate: i32,
    pub temperature: f64,
    pub respiratory_rate: i32,
    pub spo2: i32,
    pub pain_scale: u8,
    pub notes: String,
}

// ─── Timestamp parsing ────────────────────────────────────────────────────────

/// Parse a backend timestamp. The API emits ISO 8601, sometimes without
/// an offset; naive values are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}
