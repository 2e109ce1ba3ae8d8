// libs/scheduling-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{BookedInterval, DaySchedule, SchedulingError, Therapist, TherapySession};

/// Source of the weekly working pattern in force for a therapist on a date.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    async fn get_day_schedule(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DaySchedule>, SchedulingError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, session_id: Uuid) -> Result<TherapySession, SchedulingError>;

    /// Active sessions only, ordered by start time.
    async fn get_day_sessions(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TherapySession>, SchedulingError>;

    async fn get_booked_intervals(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BookedInterval>, SchedulingError> {
        self.get_day_sessions(therapist_id, date)
            .await?
            .iter()
            .filter(|session| session.status.is_active())
            .map(TherapySession::booked_interval)
            .collect()
    }

    /// Persists the updated session and every shifted session together, or
    /// none of them.
    async fn commit_session_changes(
        &self,
        updated: &TherapySession,
        shifted: &[TherapySession],
    ) -> Result<(), SchedulingError>;
}

#[async_trait]
pub trait TherapistDirectory: Send + Sync {
    /// Active therapists; when `specialty_filter` is non-empty, only those
    /// sharing at least one of the listed specialties.
    async fn get_candidates(&self, specialty_filter: &[String]) -> Result<Vec<Therapist>, SchedulingError>;
}
