//! Calendar controller.
//!
//! The fetch window always covers the displayed month, first day 00:00
//! through last day 23:59:59. Month navigation is split into
//! `begin_load` / `complete_load` with a request generation counter:
//! navigating again before the previous response lands invalidates that
//! response, so the displayed set always corresponds to the
//! last-requested month no matter the arrival order.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::api::{Backend, TimeWindow};
use crate::error::ApiError;
use crate::models::{Appointment, NewAppointment};

/// A displayed calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRef {
    pub year: i32,
    /// 1-12.
    pub month: u32,
}

impl MonthRef {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now().date_naive())
    }

    /// Navigate by whole months; delta may be negative.
    pub fn shift(self, delta: i32) -> Self {
        let zero_based = self.year * 12 + (self.month as i32 - 1) + delta;
        Self {
            year: zero_based.div_euclid(12),
            month: (zero_based.rem_euclid(12) + 1) as u32,
        }
    }

    fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
    }

    fn last_day(&self) -> NaiveDate {
        self.shift(1).first_day() - Duration::days(1)
    }

    /// Fetch window: `[first 00:00:00, last 23:59:59]`.
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.first_day().and_hms_opt(0, 0, 0).unwrap().and_utc(),
            end: self.last_day().and_hms_opt(23, 59, 59).unwrap().and_utc(),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant.year() == self.year && instant.month() == self.month
    }
}

/// Token tying a response back to the navigation that requested it.
#[derive(Debug, Clone, Copy)]
pub struct LoadTicket {
    generation: u64,
    pub window: TimeWindow,
}

/// What `complete_load` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer navigation superseded this request; nothing changed.
    Discarded,
    /// The fetch failed; the previous collection stays displayed.
    Failed,
}

/// New-appointment form. `duration_minutes` is added to the combined
/// date and time to produce `end_time`.
#[derive(Debug, Clone)]
pub struct AppointmentForm {
    pub patient: String,
    pub title: String,
    pub visit_type: String,
    pub status: String,
    pub date: String,
    pub time: String,
    pub duration_minutes: i64,
    pub location: String,
    pub notes: String,
}

impl Default for AppointmentForm {
    fn default() -> Self {
        Self {
            patient: String::new(),
            title: String::new(),
            visit_type: "Consultation".into(),
            status: "confirmed".into(),
            date: Utc::now().date_naive().to_string(),
            time: "09:00".into(),
            duration_minutes: 60,
            location: "Telehealth".into(),
            notes: String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Please add the patient name or MRN.")]
    MissingPatient,
    #[error("Please add a visit title.")]
    MissingTitle,
    #[error("Invalid visit date or time")]
    BadDateTime,
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct CalendarController {
    month: MonthRef,
    appointments: Vec<Appointment>,
    generation: u64,
}

impl CalendarController {
    pub fn new(month: MonthRef) -> Self {
        Self {
            month,
            appointments: Vec::new(),
            generation: 0,
        }
    }

    pub fn month(&self) -> MonthRef {
        self.month
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// Start a month navigation. The displayed month switches
    /// immediately; the returned ticket authorizes exactly one
    /// `complete_load` and is invalidated by any later `begin_load`.
    pub fn begin_load(&mut self, month: MonthRef) -> LoadTicket {
        self.month = month;
        self.generation += 1;
        tracing::debug!(
            year = month.year,
            month = month.month,
            generation = self.generation,
            "calendar month requested"
        );
        LoadTicket {
            generation: self.generation,
            window: month.window(),
        }
    }

    /// Land a response. Stale tickets and failures both leave the held
    /// collection untouched.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Vec<Appointment>, ApiError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "stale calendar response discarded"
            );
            return LoadOutcome::Discarded;
        }
        match result {
            Ok(appointments) => {
                self.appointments = appointments;
                LoadOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(error = %e, "calendar load failed");
                LoadOutcome::Failed
            }
        }
    }

    /// One-shot navigation for callers without interleaving concerns.
    pub async fn load_month<B: Backend>(
        &mut self,
        backend: &B,
        month: MonthRef,
    ) -> Result<(), ApiError> {
        let ticket = self.begin_load(month);
        match backend.get_appointments(Some(ticket.window)).await {
            Ok(appointments) => {
                self.complete_load(&ticket, Ok(appointments));
                Ok(())
            }
            Err(e) => {
                self.complete_load(&ticket, Err(ApiError::Network(e.to_string())));
                Err(e)
            }
        }
    }

    /// Validate, create, then reload the displayed month.
    pub async fn schedule<B: Backend>(
        &mut self,
        backend: &B,
        form: &AppointmentForm,
    ) -> Result<(), ScheduleError> {
        if form.patient.trim().is_empty() {
            return Err(ScheduleError::MissingPatient);
        }
        if form.title.trim().is_empty() {
            return Err(ScheduleError::MissingTitle);
        }

        let date = NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d")
            .map_err(|_| ScheduleError::BadDateTime)?;
        let time = NaiveTime::parse_from_str(form.time.trim(), "%H:%M")
            .map_err(|_| ScheduleError::BadDateTime)?;
        let start = date.and_time(time).and_utc();
        let end = start + Duration::minutes(form.duration_minutes);

        let location = form.location.trim();
        let notes = form.notes.trim();
        backend
            .create_appointment(&NewAppointment {
                title: form.title.trim().into(),
                patient_name: form.patient.trim().into(),
                appointment_type: form.visit_type.clone(),
                status: form.status.clone(),
                location: if location.is_empty() { "Clinic".into() } else { location.into() },
                start_time: start.to_rfc3339(),
                end_time: end.to_rfc3339(),
                notes: if notes.is_empty() { None } else { Some(notes.into()) },
            })
            .await?;

        let month = self.month;
        self.load_month(backend, month).await?;
        Ok(())
    }

    /// Appointments whose start falls in the displayed month, for the
    /// grid.
    pub fn in_displayed_month(&self) -> Vec<&Appointment> {
        self.appointments
            .iter()
            .filter(|a| a.start().map(|s| self.month.contains(s)).unwrap_or(false))
            .collect()
    }

    /// Today's agenda, earliest first.
    pub fn todays(&self, today: NaiveDate) -> Vec<&Appointment> {
        let mut agenda: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.start().map(|s| s.date_naive() == today).unwrap_or(false))
            .collect();
        agenda.sort_by_key(|a| a.start());
        agenda
    }

    /// The next three appointments starting after today's midnight,
    /// earliest first. Today's own entries qualify.
    pub fn upcoming(&self, today: NaiveDate) -> Vec<&Appointment> {
        let midnight = today.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let mut soon: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.start().map(|s| s > midnight).unwrap_or(false))
            .collect();
        soon.sort_by_key(|a| a.start());
        soon.truncate(3);
        soon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use std::sync::atomic::Ordering;

    fn appointment(id: i64, start: &str) -> Appointment {
        Appointment {
            id: Some(id),
            title: format!("Visit {id}"),
            patient_name: "John Doe".into(),
            appointment_type: "Consultation".into(),
            status: "confirmed".into(),
            location: "Telehealth".into(),
            start_time: start.into(),
            end_time: start.into(),
            notes: None,
        }
    }

    #[test]
    fn month_window_spans_first_midnight_to_last_second() {
        let june = MonthRef { year: 2025, month: 6 };
        let window = june.window();
        assert_eq!(window.start.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2025-06-30T23:59:59+00:00");
    }

    #[test]
    fn month_shift_wraps_across_year_boundaries() {
        let dec = MonthRef { year: 2025, month: 12 };
        assert_eq!(dec.shift(1), MonthRef { year: 2026, month: 1 });
        let jan = MonthRef { year: 2025, month: 1 };
        assert_eq!(jan.shift(-1), MonthRef { year: 2024, month: 12 });
    }

    #[tokio::test]
    async fn load_month_fetches_the_windowed_set() {
        let mock = MockBackend::new().with_appointments(vec![
            appointment(1, "2025-06-10T09:00:00Z"),
            appointment(2, "2025-07-02T09:00:00Z"),
        ]);
        let mut controller = CalendarController::new(MonthRef { year: 2025, month: 6 });
        controller
            .load_month(&mock, MonthRef { year: 2025, month: 6 })
            .await
            .unwrap();

        assert_eq!(controller.appointments().len(), 1);
        assert_eq!(controller.appointments()[0].id, Some(1));
    }

    #[test]
    fn stale_response_is_discarded_in_favor_of_last_requested_month() {
        let mut controller = CalendarController::new(MonthRef { year: 2025, month: 6 });

        // Two navigations before either response lands.
        let june_ticket = controller.begin_load(MonthRef { year: 2025, month: 6 });
        let july_ticket = controller.begin_load(MonthRef { year: 2025, month: 7 });

        // July's response arrives first and is applied.
        let outcome = controller.complete_load(
            &july_ticket,
            Ok(vec![appointment(2, "2025-07-02T09:00:00Z")]),
        );
        assert_eq!(outcome, LoadOutcome::Applied);

        // June's late response must not clobber it.
        let outcome = controller.complete_load(
            &june_ticket,
            Ok(vec![appointment(1, "2025-06-10T09:00:00Z")]),
        );
        assert_eq!(outcome, LoadOutcome::Discarded);
        assert_eq!(controller.appointments()[0].id, Some(2));
        assert_eq!(controller.month(), MonthRef { year: 2025, month: 7 });
    }

    #[test]
    fn failed_load_keeps_previous_collection() {
        let mut controller = CalendarController::new(MonthRef { year: 2025, month: 6 });
        let ticket = controller.begin_load(MonthRef { year: 2025, month: 6 });
        controller.complete_load(&ticket, Ok(vec![appointment(1, "2025-06-10T09:00:00Z")]));

        let ticket = controller.begin_load(MonthRef { year: 2025, month: 7 });
        let outcome =
            controller.complete_load(&ticket, Err(ApiError::Network("down".into())));
        assert_eq!(outcome, LoadOutcome::Failed);
        assert_eq!(controller.appointments().len(), 1);
    }

    #[tokio::test]
    async fn schedule_validates_then_derives_end_from_duration() {
        let mock = MockBackend::new();
        let mut controller = CalendarController::new(MonthRef { year: 2025, month: 6 });

        let mut form = AppointmentForm {
            patient: "John Doe".into(),
            title: "Post-op check".into(),
            date: "2025-06-10".into(),
            time: "09:30".into(),
            duration_minutes: 45,
            ..Default::default()
        };
        controller.schedule(&mock, &form).await.unwrap();

        let created = &mock.appointments.lock().unwrap()[0];
        assert_eq!(created.start_time, "2025-06-10T09:30:00+00:00");
        assert_eq!(created.end_time, "2025-06-10T10:15:00+00:00");

        form.patient.clear();
        assert!(matches!(
            controller.schedule(&mock, &form).await,
            Err(ScheduleError::MissingPatient)
        ));
    }

    #[tokio::test]
    async fn schedule_reloads_the_displayed_month() {
        let mock = MockBackend::new();
        let mut controller = CalendarController::new(MonthRef { year: 2025, month: 6 });
        let form = AppointmentForm {
            patient: "John Doe".into(),
            title: "Post-op check".into(),
            date: "2025-06-10".into(),
            ..Default::default()
        };
        controller.schedule(&mock, &form).await.unwrap();

        assert_eq!(mock.get_appointments_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.appointments().len(), 1);
    }

    #[test]
    fn todays_agenda_sorts_and_upcoming_caps_at_three() {
        let mut controller = CalendarController::new(MonthRef { year: 2025, month: 6 });
        let ticket = controller.begin_load(MonthRef { year: 2025, month: 6 });
        controller.complete_load(
            &ticket,
            Ok(vec![
                appointment(1, "2025-06-10T14:00:00Z"),
                appointment(2, "2025-06-10T09:00:00Z"),
                appointment(3, "2025-06-11T08:00:00Z"),
                appointment(4, "2025-06-12T08:00:00Z"),
                appointment(5, "2025-06-13T08:00:00Z"),
                appointment(6, "2025-06-09T08:00:00Z"),
            ]),
        );

        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let agenda = controller.todays(today);
        assert_eq!(agenda.iter().map(|a| a.id.unwrap()).collect::<Vec<_>>(), [2, 1]);

        // Today's entries count as upcoming; yesterday's do not.
        let soon = controller.upcoming(today);
        assert_eq!(soon.iter().map(|a| a.id.unwrap()).collect::<Vec<_>>(), [2, 1, 3]);
    }
}
