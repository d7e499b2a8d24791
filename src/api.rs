//! Remote entity client — the single HTTP gateway to the backend.
//!
//! `Backend` is the seam controllers program against; `ApiClient` is the
//! production implementation over `reqwest`, and `MockBackend` backs the
//! tests. All operations are thin verb/path/body wrappers: no retry, no
//! caching at this layer. The one deliberate side effect lives in
//! `request`: an HTTP 401 clears the held session before the error is
//! returned, so callers can treat `Unauthorized` as "session ended,
//! route to login".

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::models::{
    AiStatus, Appointment, HighRiskPatient, HighRiskResponse, LoginResponse, NewAppointment,
    NewNote, NewPatient, Note, NoteSummary, NoteSummaryResult, Patient, PatientSummaryResponse,
    PatientTimeline, RegisterRequest, RiskReport, User,
};
use crate::session::Session;

/// Inclusive time window for appointment queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// The backend operation surface consumed by the tab controllers.
///
/// Callers never set `Authorization` themselves — the implementation
/// attaches the bearer token when one is held.
#[allow(async_fn_in_trait)]
pub trait Backend {
    // Auth
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;
    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError>;

    // Patients
    async fn get_patients(&self) -> Result<Vec<Patient>, ApiError>;
    async fn get_patient(&self, id: i64) -> Result<Patient, ApiError>;
    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient, ApiError>;
    async fn update_patient(&self, id: i64, patient: &NewPatient) -> Result<Patient, ApiError>;

    // Notes
    async fn get_notes(&self) -> Result<Vec<NoteSummary>, ApiError>;
    async fn get_note(&self, id: i64) -> Result<Note, ApiError>;
    async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError>;
    async fn update_note(&self, id: i64, note: &NewNote) -> Result<Note, ApiError>;

    // Appointments
    async fn get_appointments(&self, window: Option<TimeWindow>)
        -> Result<Vec<Appointment>, ApiError>;
    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, ApiError>;
    async fn update_appointment(
        &self,
        id: i64,
        appointment: &NewAppointment,
    ) -> Result<Appointment, ApiError>;

    // AI services
    async fn summarize_note(&self, note_id: i64) -> Result<NoteSummaryResult, ApiError>;
    async fn get_patient_summary(
        &self,
        patient_id: i64,
    ) -> Result<PatientSummaryResponse, ApiError>;
    async fn get_patient_risk_report(&self, patient_id: i64) -> Result<RiskReport, ApiError>;
    async fn get_high_risk_patients(&self, limit: usize)
        -> Result<Vec<HighRiskPatient>, ApiError>;
    async fn get_patient_timeline(&self, patient_id: i64) -> Result<PatientTimeline, ApiError>;
    async fn check_ai_status(&self) -> Result<AiStatus, ApiError>;
}

// ─── Production client ────────────────────────────────────────────────────────

/// Error body shape the backend is expected to emit: `{detail?, message?}`.
/// `detail` can be a validation array, so only string forms are used.
#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<Session>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            session,
        }
    }

    /// Client pointed at the configured base URL.
    pub fn from_env(session: Arc<Session>) -> Self {
        Self::new(&crate::config::api_base_url(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Single request path every operation funnels through.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(token) = self.session.get() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // Auth-invalidation side effect: no later call may carry the
            // now-dead token.
            self.session.clear();
            tracing::warn!(%url, "received 401, session cleared");
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| {
                    b.detail
                        .as_ref()
                        .and_then(|d| d.as_str().map(str::to_string))
                        .or(b.message)
                })
                .unwrap_or_else(|| format!("HTTP Error: {}", status.as_u16()));
            tracing::debug!(%url, status = status.as_u16(), %message, "backend error");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn json_body<B: serde::Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl Backend for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response: LoginResponse = self
            .request(Method::POST, "/auth/login", Some(body))
            .await?;
        // Side effect of a successful login: the token is held from here on.
        self.session.set(&response.access_token);
        Ok(response)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        self.request(Method::POST, "/auth/register", Some(Self::json_body(request)?))
            .await
    }

    async fn get_patients(&self) -> Result<Vec<Patient>, ApiError> {
        self.request(Method::GET, "/patients/", None).await
    }

    async fn get_patient(&self, id: i64) -> Result<Patient, ApiError> {
        self.request(Method::GET, &format!("/patients/{id}"), None)
            .await
    }

    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient, ApiError> {
        self.request(Method::POST, "/patients/", Some(Self::json_body(patient)?))
            .await
    }

    async fn update_patient(&self, id: i64, patient: &NewPatient) -> Result<Patient, ApiError> {
        self.request(
            Method::PUT,
            &format!("/patients/{id}"),
            Some(Self::json_body(patient)?),
        )
        .await
    }

    async fn get_notes(&self) -> Result<Vec<NoteSummary>, ApiError> {
        self.request(Method::GET, "/notes/", None).await
    }

    async fn get_note(&self, id: i64) -> Result<Note, ApiError> {
        self.request(Method::GET, &format!("/notes/{id}"), None).await
    }

    async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError> {
        self.request(Method::POST, "/notes/", Some(Self::json_body(note)?))
            .await
    }

    async fn update_note(&self, id: i64, note: &NewNote) -> Result<Note, ApiError> {
        self.request(
            Method::PUT,
            &format!("/notes/{id}"),
            Some(Self::json_body(note)?),
        )
        .await
    }

    async fn get_appointments(
        &self,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Appointment>, ApiError> {
        let path = match window {
            Some(w) => format!(
                "/appointments/?start={}&end={}",
                w.start.to_rfc3339_opts(SecondsFormat::Secs, true),
                w.end.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => "/appointments/".to_string(),
        };
        self.request(Method::GET, &path, None).await
    }

    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, ApiError> {
        self.request(
            Method::POST,
            "/appointments/",
            Some(Self::json_body(appointment)?),
        )
        .await
    }

    async fn update_appointment(
        &self,
        id: i64,
        appointment: &NewAppointment,
    ) -> Result<Appointment, ApiError> {
        self.request(
            Method::PUT,
            &format!("/appointments/{id}"),
            Some(Self::json_body(appointment)?),
        )
        .await
    }

    async fn summarize_note(&self, note_id: i64) -> Result<NoteSummaryResult, ApiError> {
        self.request(Method::POST, &format!("/ai/summarize/{note_id}/sync"), None)
            .await
    }

    async fn get_patient_summary(
        &self,
        patient_id: i64,
    ) -> Result<PatientSummaryResponse, ApiError> {
        self.request(
            Method::POST,
            &format!("/ai/patient-summary/{patient_id}"),
            None,
        )
        .await
    }

    async fn get_patient_risk_report(&self, patient_id: i64) -> Result<RiskReport, ApiError> {
        self.request(Method::GET, &format!("/ai/risk-report/{patient_id}"), None)
            .await
    }

    async fn get_high_risk_patients(
        &self,
        limit: usize,
    ) -> Result<Vec<HighRiskPatient>, ApiError> {
        let response: HighRiskResponse = self
            .request(
                Method::GET,
                &format!("/ai/high-risk-patients?limit={limit}"),
                None,
            )
            .await?;
        Ok(response.high_risk_patients)
    }

    async fn get_patient_timeline(&self, patient_id: i64) -> Result<PatientTimeline, ApiError> {
        self.request(
            Method::GET,
            &format!("/ai/patient-timeline/{patient_id}"),
            None,
        )
        .await
    }

    async fn check_ai_status(&self) -> Result<AiStatus, ApiError> {
        self.request(Method::GET, "/ai/ai-status", None).await
    }
}

// ─── Mock backend for tests ───────────────────────────────────────────────────

/// In-memory backend with canned data, per-operation call counters, and
/// togglable failures. Every method yields once before responding so
/// concurrent callers interleave the way real network suspension does.
#[derive(Default)]
pub struct MockBackend {
    pub patients: Mutex<Vec<Patient>>,
    pub notes: Mutex<Vec<NoteSummary>>,
    pub note_details: Mutex<HashMap<i64, Note>>,
    pub appointments: Mutex<Vec<Appointment>>,
    pub high_risk: Mutex<Vec<HighRiskPatient>>,
    pub summary_result: Mutex<Option<NoteSummaryResult>>,
    pub patient_summary_text: Mutex<String>,

    pub fail_notes: std::sync::atomic::AtomicBool,
    pub fail_summarize: std::sync::atomic::AtomicBool,
    pub fail_update_note: std::sync::atomic::AtomicBool,

    pub get_patients_calls: AtomicUsize,
    pub get_notes_calls: AtomicUsize,
    pub get_note_calls: AtomicUsize,
    pub get_appointments_calls: AtomicUsize,
    pub summarize_calls: AtomicUsize,
    pub patient_summary_calls: AtomicUsize,
    pub high_risk_calls: AtomicUsize,
    pub create_note_calls: AtomicUsize,
    pub update_note_calls: AtomicUsize,

    next_note_id: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.next_note_id.store(1000, Ordering::SeqCst);
        *mock.patient_summary_text.lock().unwrap() = "Stable overall.".to_string();
        mock
    }

    pub fn with_patients(self, patients: Vec<Patient>) -> Self {
        *self.patients.lock().unwrap() = patients;
        self
    }

    pub fn with_notes(self, notes: Vec<NoteSummary>) -> Self {
        *self.notes.lock().unwrap() = notes;
        self
    }

    pub fn with_note_detail(self, note: Note) -> Self {
        self.note_details.lock().unwrap().insert(note.id, note);
        self
    }

    pub fn with_appointments(self, appointments: Vec<Appointment>) -> Self {
        *self.appointments.lock().unwrap() = appointments;
        self
    }

    pub fn with_summary_result(self, result: NoteSummaryResult) -> Self {
        *self.summary_result.lock().unwrap() = Some(result);
        self
    }

    fn failing(flag: &std::sync::atomic::AtomicBool, what: &str) -> Result<(), ApiError> {
        if flag.load(Ordering::SeqCst) {
            Err(ApiError::Http {
                status: 500,
                message: format!("{what} unavailable"),
            })
        } else {
            Ok(())
        }
    }
}

impl Backend for MockBackend {
    async fn login(&self, _email: &str, _password: &str) -> Result<LoginResponse, ApiError> {
        tokio::task::yield_now().await;
        Ok(LoginResponse {
            access_token: "mock-token".into(),
            token_type: "bearer".into(),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        tokio::task::yield_now().await;
        Ok(User {
            id: 1,
            email: request.email.clone(),
            full_name: request.full_name.clone(),
            role: request.role.clone(),
        })
    }

    async fn get_patients(&self) -> Result<Vec<Patient>, ApiError> {
        tokio::task::yield_now().await;
        self.get_patients_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.patients.lock().unwrap().clone())
    }

    async fn get_patient(&self, id: i64) -> Result<Patient, ApiError> {
        tokio::task::yield_now().await;
        self.patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(ApiError::Http {
                status: 404,
                message: "Patient not found".into(),
            })
    }

    async fn create_patient(&self, patient: &NewPatient) -> Result<Patient, ApiError> {
        tokio::task::yield_now().await;
        let mut patients = self.patients.lock().unwrap();
        let id = patients.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let created = Patient {
            id,
            patient_id: patient.patient_id.clone(),
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            date_of_birth: patient.date_of_birth.clone(),
            medical_record_number: patient.medical_record_number.clone(),
            allergies: patient.allergies.clone(),
            medical_history: patient.medical_history.clone(),
        };
        patients.push(created.clone());
        Ok(created)
    }

    async fn update_patient(&self, id: i64, patient: &NewPatient) -> Result<Patient, ApiError> {
        tokio::task::yield_now().await;
        let mut patients = self.patients.lock().unwrap();
        let existing = patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ApiError::Http {
                status: 404,
                message: "Patient not found".into(),
            })?;
        existing.first_name = patient.first_name.clone();
        existing.last_name = patient.last_name.clone();
        existing.allergies = patient.allergies.clone();
        existing.medical_history = patient.medical_history.clone();
        Ok(existing.clone())
    }

    async fn get_notes(&self) -> Result<Vec<NoteSummary>, ApiError> {
        tokio::task::yield_now().await;
        self.get_notes_calls.fetch_add(1, Ordering::SeqCst);
        Self::failing(&self.fail_notes, "notes")?;
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn get_note(&self, id: i64) -> Result<Note, ApiError> {
        tokio::task::yield_now().await;
        self.get_note_calls.fetch_add(1, Ordering::SeqCst);
        self.note_details
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ApiError::Http {
                status: 404,
                message: "Note not found".into(),
            })
    }

    async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError> {
        tokio::task::yield_now().await;
        self.create_note_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_note_id.fetch_add(1, Ordering::SeqCst) as i64;
        let created = Note {
            id,
            patient_id: note.patient_id,
            author_id: 1,
            note_type: note.note_type.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            status: "draft".into(),
            summary: None,
            risk_level: None,
            recommendations: None,
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        };
        self.note_details.lock().unwrap().insert(id, created.clone());
        Ok(created)
    }

    async fn update_note(&self, id: i64, note: &NewNote) -> Result<Note, ApiError> {
        tokio::task::yield_now().await;
        self.update_note_calls.fetch_add(1, Ordering::SeqCst);
        Self::failing(&self.fail_update_note, "note update")?;
        let mut details = self.note_details.lock().unwrap();
        let existing = details.get_mut(&id).ok_or(ApiError::Http {
            status: 404,
            message: "Note not found".into(),
        })?;
        existing.title = note.title.clone();
        existing.content = note.content.clone();
        existing.updated_at = Utc::now().to_rfc3339();
        Ok(existing.clone())
    }

    async fn get_appointments(
        &self,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Appointment>, ApiError> {
        tokio::task::yield_now().await;
        self.get_appointments_calls.fetch_add(1, Ordering::SeqCst);
        let appointments = self.appointments.lock().unwrap();
        Ok(match window {
            Some(w) => appointments
                .iter()
                .filter(|a| a.start().map(|s| w.contains(s)).unwrap_or(false))
                .cloned()
                .collect(),
            None => appointments.clone(),
        })
    }

    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, ApiError> {
        tokio::task::yield_now().await;
        let mut appointments = self.appointments.lock().unwrap();
        let id = appointments.len() as i64 + 1;
        let created = Appointment {
            id: Some(id),
            title: appointment.title.clone(),
            patient_name: appointment.patient_name.clone(),
            appointment_type: appointment.appointment_type.clone(),
            status: appointment.status.clone(),
            location: appointment.location.clone(),
            start_time: appointment.start_time.clone(),
            end_time: appointment.end_time.clone(),
            notes: appointment.notes.clone(),
        };
        appointments.push(created.clone());
        Ok(created)
    }

    async fn update_appointment(
        &self,
        id: i64,
        appointment: &NewAppointment,
    ) -> Result<Appointment, ApiError> {
        tokio::task::yield_now().await;
        let mut appointments = self.appointments.lock().unwrap();
        let existing = appointments
            .iter_mut()
            .find(|a| a.id == Some(id))
            .ok_or(ApiError::Http {
                status: 404,
                message: "Appointment not found".into(),
            })?;
        existing.title = appointment.title.clone();
        existing.status = appointment.status.clone();
        existing.start_time = appointment.start_time.clone();
        existing.end_time = appointment.end_time.clone();
        Ok(existing.clone())
    }

    async fn summarize_note(&self, _note_id: i64) -> Result<NoteSummaryResult, ApiError> {
        tokio::task::yield_now().await;
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        Self::failing(&self.fail_summarize, "summarization")?;
        Ok(self
            .summary_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(NoteSummaryResult {
                summary: "Patient stable.".into(),
                risk_level: "low".into(),
                recommendations: "Continue current plan.".into(),
            }))
    }

    async fn get_patient_summary(
        &self,
        _patient_id: i64,
    ) -> Result<PatientSummaryResponse, ApiError> {
        tokio::task::yield_now().await;
        self.patient_summary_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PatientSummaryResponse {
            summary: self.patient_summary_text.lock().unwrap().clone(),
        })
    }

    async fn get_patient_risk_report(&self, patient_id: i64) -> Result<RiskReport, ApiError> {
        tokio::task::yield_now().await;
        Ok(RiskReport {
            patient_id: format!("P-{patient_id:04}"),
            patient_name: "Mock Patient".into(),
            risk_level: "MEDIUM".into(),
            summary: "No acute findings.".into(),
            risk_factors: vec![],
            recommendations: vec![],
        })
    }

    async fn get_high_risk_patients(
        &self,
        limit: usize,
    ) -> Result<Vec<HighRiskPatient>, ApiError> {
        tokio::task::yield_now().await;
        self.high_risk_calls.fetch_add(1, Ordering::SeqCst);
        let list = self.high_risk.lock().unwrap();
        Ok(list.iter().take(limit).cloned().collect())
    }

    async fn get_patient_timeline(&self, patient_id: i64) -> Result<PatientTimeline, ApiError> {
        tokio::task::yield_now().await;
        let patient = self
            .patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == patient_id)
            .cloned()
            .ok_or(ApiError::Http {
                status: 404,
                message: "Patient not found".into(),
            })?;
        Ok(PatientTimeline {
            patient: crate::models::TimelinePatient {
                id: patient.id,
                name: patient.display_name(),
                mrn: patient.medical_record_number.clone(),
                dob: Some(patient.date_of_birth.clone()),
                allergies: patient.allergies.clone(),
                medical_history: patient.medical_history.clone(),
            },
            timeline: vec![],
            ai_summary: "No significant events.".into(),
            statistics: crate::models::TimelineStatistics {
                total_visits: 0,
                total_appointments: 0,
                risk_distribution: Default::default(),
                last_visit: None,
            },
        })
    }

    async fn check_ai_status(&self) -> Result<AiStatus, ApiError> {
        tokio::task::yield_now().await;
        Ok(AiStatus {
            status: "ok".into(),
            ai_available: true,
        })
    }
}
