// libs/scheduling-cell/tests/common/mod.rs
#![allow(dead_code)]

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use scheduling_cell::models::{
    BookedInterval, DaySchedule, DaySnapshot, SessionStatus, Therapist, TherapySession, TimeOfDay,
    TimeRange,
};

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

pub fn t(raw: &str) -> TimeOfDay {
    TimeOfDay::parse(raw).unwrap()
}

pub fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::new(t(start), t(end)).unwrap()
}

pub fn booked(start: &str, end: &str) -> BookedInterval {
    BookedInterval::new(Uuid::new_v4(), t(start), t(end)).unwrap()
}

/// 2026-03-02, a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// 09:00-17:00 with no break and no buffer.
pub fn plain_schedule(therapist_id: Uuid, date: NaiveDate) -> DaySchedule {
    DaySchedule::new(therapist_id, day_of_week(date), t("09:00"), t("17:00"))
}

/// 09:00-17:00 with a 12:00-13:00 break.
pub fn standard_schedule(therapist_id: Uuid, date: NaiveDate) -> DaySchedule {
    plain_schedule(therapist_id, date).with_break(t("12:00"), t("13:00"))
}

pub fn session(therapist_id: Uuid, date: NaiveDate, start: &str, duration_minutes: u32) -> TherapySession {
    TherapySession {
        id: Uuid::new_v4(),
        therapist_id,
        patient_id: Some(Uuid::new_v4()),
        session_date: date,
        start: t(start),
        duration_minutes,
        status: SessionStatus::Scheduled,
    }
}

pub fn intervals(sessions: &[TherapySession]) -> Vec<BookedInterval> {
    sessions.iter().map(|s| s.booked_interval().unwrap()).collect()
}

pub fn snapshot(date: NaiveDate, schedule: Option<DaySchedule>, booked: Vec<BookedInterval>) -> DaySnapshot {
    DaySnapshot { date, schedule, booked }
}

pub fn therapist(name: &str, specialties: &[&str], current_workload: u32, max_workload: u32, rating: Option<f32>) -> Therapist {
    Therapist {
        id: Uuid::new_v4(),
        first_name: name.to_string(),
        last_name: "Tester".to_string(),
        specialties: specialties.iter().map(|s| s.to_string()).collect(),
        current_workload,
        max_workload,
        rating,
        years_experience: Some(6),
        is_active: true,
    }
}
