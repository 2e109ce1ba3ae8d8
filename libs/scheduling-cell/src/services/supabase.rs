// libs/scheduling-cell/src/services/supabase.rs
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{DaySchedule, SchedulingError, SessionStatus, Therapist, TherapySession};
use crate::services::schedule::resolve_effective_schedule;
use crate::services::store::{ScheduleProvider, SessionStore, TherapistDirectory};

const ACTIVE_STATUSES: [SessionStatus; 3] = [
    SessionStatus::Scheduled,
    SessionStatus::Confirmed,
    SessionStatus::InProgress,
];

pub const COMMIT_FUNCTION: &str = "commit_session_changes";

/// PostgREST-backed implementation of every collaborator the engine needs.
pub struct SupabaseSchedulingStore {
    supabase: SupabaseClient,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<Vec<T>, SchedulingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None)
            .await
            .map_err(|e| {
                error!("Failed to fetch {}: {}", what, e);
                storage_error(e)
            })?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse {}: {}", what, e)))
    }
}

#[async_trait]
impl ScheduleProvider for SupabaseSchedulingStore {
    async fn get_day_schedule(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DaySchedule>, SchedulingError> {
        let path = format!(
            "/rest/v1/therapist_schedules?therapist_id=eq.{}&day_of_week=eq.{}&effective_from=lte.{}&order=effective_from.desc",
            therapist_id,
            date.weekday().num_days_from_sunday(),
            date
        );
        let rows: Vec<DaySchedule> = self.fetch_rows(&path, "therapist schedules").await?;
        debug!("Fetched {} schedule rows for therapist {} on {}", rows.len(), therapist_id, date);

        Ok(resolve_effective_schedule(&rows, date).cloned())
    }
}

#[async_trait]
impl SessionStore for SupabaseSchedulingStore {
    async fn get_session(&self, session_id: Uuid) -> Result<TherapySession, SchedulingError> {
        let path = format!("/rest/v1/therapy_sessions?id=eq.{}", session_id);
        let sessions: Vec<TherapySession> = self.fetch_rows(&path, "therapy session").await?;

        sessions.into_iter().next().ok_or(SchedulingError::SessionNotFound)
    }

    async fn get_day_sessions(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TherapySession>, SchedulingError> {
        let statuses = ACTIVE_STATUSES
            .iter()
            .map(SessionStatus::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/therapy_sessions?therapist_id=eq.{}&session_date=eq.{}&status=in.({})&order=scheduled_time.asc",
            therapist_id, date, statuses
        );

        let sessions: Vec<TherapySession> = self.fetch_rows(&path, "therapy sessions").await?;
        debug!("Fetched {} active sessions for therapist {} on {}", sessions.len(), therapist_id, date);

        Ok(sessions.into_iter().filter(|session| session.status.is_active()).collect())
    }

    async fn commit_session_changes(
        &self,
        updated: &TherapySession,
        shifted: &[TherapySession],
    ) -> Result<(), SchedulingError> {
        let mut sessions = Vec::with_capacity(shifted.len() + 1);
        sessions.push(updated);
        sessions.extend(shifted.iter());

        let args = json!({
            "p_therapist_id": updated.therapist_id,
            "p_session_date": updated.session_date,
            "p_sessions": sessions
                .iter()
                .map(|session| json!({
                    "id": session.id,
                    "scheduled_time": session.start,
                    "duration_minutes": session.duration_minutes,
                }))
                .collect::<Vec<_>>(),
        });

        let _: Value = self
            .supabase
            .rpc(COMMIT_FUNCTION, args)
            .await
            .map_err(|e| {
                error!("Failed to commit changes for session {}: {}", updated.id, e);
                storage_error(e)
            })?;

        info!(
            "Committed duration change for session {} with {} shifted sessions",
            updated.id,
            shifted.len()
        );
        Ok(())
    }
}

#[async_trait]
impl TherapistDirectory for SupabaseSchedulingStore {
    async fn get_candidates(&self, specialty_filter: &[String]) -> Result<Vec<Therapist>, SchedulingError> {
        let mut path = "/rest/v1/therapists?is_active=eq.true".to_string();

        if !specialty_filter.is_empty() {
            let array = postgres_array(specialty_filter);
            path.push_str(&format!("&specialties=ov.{}", urlencoding::encode(&array)));
        }
        path.push_str("&order=id.asc");

        let therapists: Vec<Therapist> = self.fetch_rows(&path, "therapists").await?;
        debug!("Fetched {} candidate therapists", therapists.len());
        Ok(therapists)
    }
}

/// Sorts client failures into the cases callers treat differently: a 409 from
/// the commit function, an unreachable or failing upstream, and everything else.
fn storage_error(err: anyhow::Error) -> SchedulingError {
    match err.downcast_ref::<SupabaseError>() {
        Some(SupabaseError::Conflict(detail)) => SchedulingError::CommitConflict(detail.clone()),
        Some(api) if api.is_server_error() => SchedulingError::StorageUnavailable(err.to_string()),
        Some(_) => SchedulingError::DatabaseError(err.to_string()),
        None => match err.downcast_ref::<reqwest::Error>() {
            Some(transport) if !transport.is_decode() => SchedulingError::StorageUnavailable(err.to_string()),
            _ => SchedulingError::DatabaseError(err.to_string()),
        },
    }
}

/// Postgres array literal with every element double-quoted.
fn postgres_array(values: &[String]) -> String {
    let elements = values
        .iter()
        .map(|value| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{}}}", elements)
}
