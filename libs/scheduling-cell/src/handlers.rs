// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Days, NaiveDate};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AdjustmentOutcome, AssignmentRequest, AvailabilityResult, DaySnapshot, OptimizationStrategy,
    ResolutionConstraints, SchedulingError, TherapistCandidate, TimeOfDay, TimeRange,
};
use crate::services::{
    AvailabilityChecker, ConflictResolver, SessionTimingAdjuster, TherapistAssignmentScorer,
    TimeSlotOptimizer,
};
use crate::state::SchedulingState;

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::SessionNotFound | SchedulingError::ScheduleNotFound { .. } => {
                AppError::NotFound(err.to_string())
            }
            SchedulingError::CommitConflict(_) => AppError::Conflict(err.to_string()),
            SchedulingError::StorageUnavailable(msg) => AppError::ExternalService(msg),
            SchedulingError::DatabaseError(msg) => AppError::Database(msg),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}

// ==============================================================================
// REQUEST TYPES
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub duration_minutes: u32,
    pub exclude_session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct BulkCandidate {
    pub start: TimeOfDay,
    pub duration_minutes: u32,
    pub exclude_session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct BulkCheckRequest {
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    pub candidates: Vec<BulkCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeSlotsRequest {
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    pub candidate_durations: Option<Vec<u32>>,
    #[serde(default)]
    pub strategy: OptimizationStrategy,
}

#[derive(Debug, Deserialize)]
pub struct ResolveConflictRequest {
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub duration_minutes: u32,
    pub constraints: ResolutionConstraints,
}

#[derive(Debug, Deserialize)]
pub struct AdjustDurationRequest {
    pub new_duration_minutes: u32,
    pub reason: String,
    #[serde(default)]
    pub cascade: bool,
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn candidate_range(state: &SchedulingState, start: TimeOfDay, duration_minutes: u32) -> Result<TimeRange, AppError> {
    state.rules.validate_duration(duration_minutes)?;
    Ok(TimeRange::starting_at(start, duration_minutes)?)
}

async fn load_snapshot(
    state: &SchedulingState,
    therapist_id: Uuid,
    date: NaiveDate,
) -> Result<DaySnapshot, SchedulingError> {
    let (schedule, booked) = tokio::join!(
        state.schedules.get_day_schedule(therapist_id, date),
        state.sessions.get_booked_intervals(therapist_id, date),
    );

    Ok(DaySnapshot {
        date,
        schedule: schedule?,
        booked: booked?,
    })
}

// ==============================================================================
// HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "scheduling-cell",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[axum::debug_handler]
#[instrument(skip(state, request), fields(therapist_id = %request.therapist_id, date = %request.date))]
pub async fn check_availability(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<CheckAvailabilityRequest>,
) -> Result<Json<AvailabilityResult>, AppError> {
    let candidate = candidate_range(&state, request.start, request.duration_minutes)?;
    let snapshot = load_snapshot(&state, request.therapist_id, request.date).await?;

    let Some(schedule) = &snapshot.schedule else {
        debug!("No schedule for therapist {} on {}", request.therapist_id, request.date);
        return Ok(Json(AvailabilityResult::therapist_unavailable(request.date)));
    };

    let checker = AvailabilityChecker::new(state.rules.clone());
    let result = checker.check_availability(schedule, &snapshot.booked, candidate, request.exclude_session_id)?;

    Ok(Json(result))
}

#[axum::debug_handler]
#[instrument(skip(state, request), fields(therapist_id = %request.therapist_id, date = %request.date))]
pub async fn bulk_check_availability(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<BulkCheckRequest>,
) -> Result<Json<Value>, AppError> {
    if request.candidates.is_empty() {
        return Err(AppError::ValidationError("At least one candidate is required".to_string()));
    }

    let candidates = request
        .candidates
        .iter()
        .map(|c| -> Result<_, AppError> {
            Ok((candidate_range(&state, c.start, c.duration_minutes)?, c.exclude_session_id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let snapshot = load_snapshot(&state, request.therapist_id, request.date).await?;

    let results = match &snapshot.schedule {
        Some(schedule) => {
            let checker = AvailabilityChecker::new(state.rules.clone());
            checker.check_availability_bulk(schedule, &snapshot.booked, &candidates)?
        }
        None => candidates
            .iter()
            .map(|_| AvailabilityResult::therapist_unavailable(request.date))
            .collect(),
    };

    let available_count = results.iter().filter(|r| r.available).count();

    Ok(Json(json!({
        "therapist_id": request.therapist_id,
        "date": request.date,
        "results": results,
        "available_count": available_count,
        "total_checked": results.len()
    })))
}

#[axum::debug_handler]
#[instrument(skip(state, request), fields(therapist_id = %request.therapist_id, date = %request.date))]
pub async fn optimize_slots(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<OptimizeSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    let durations = request
        .candidate_durations
        .unwrap_or_else(|| state.rules.candidate_durations.clone());
    for &duration in &durations {
        state.rules.validate_duration(duration)?;
    }

    let snapshot = load_snapshot(&state, request.therapist_id, request.date).await?;

    let slots = match &snapshot.schedule {
        Some(schedule) => {
            let optimizer = TimeSlotOptimizer::new(state.rules.clone());
            optimizer.optimize_slots(schedule, &snapshot.booked, &durations, request.strategy)?
        }
        None => {
            debug!("No schedule for therapist {} on {}", request.therapist_id, request.date);
            Vec::new()
        }
    };

    Ok(Json(json!({
        "therapist_id": request.therapist_id,
        "date": request.date,
        "strategy": request.strategy,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
#[instrument(skip(state, request), fields(therapist_id = %request.therapist_id, date = %request.date))]
pub async fn resolve_conflict(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<ResolveConflictRequest>,
) -> Result<Json<Value>, AppError> {
    let candidate = candidate_range(&state, request.start, request.duration_minutes)?;
    let day = load_snapshot(&state, request.therapist_id, request.date).await?;

    let following_days = if request.constraints.allow_different_day {
        let loads = (1..=u64::from(state.rules.max_forward_days))
            .filter_map(|offset| request.date.checked_add_days(Days::new(offset)))
            .map(|date| load_snapshot(&state, request.therapist_id, date));

        join_all(loads).await.into_iter().collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };

    let resolver = ConflictResolver::new(state.rules.clone());
    let resolution = resolver.resolve(&day, candidate, &request.constraints, &following_days)?;

    Ok(Json(json!({
        "therapist_id": request.therapist_id,
        "requested_date": request.date,
        "requested_start": request.start,
        "resolution": resolution
    })))
}

#[axum::debug_handler]
#[instrument(skip(state, request), fields(session_id = %session_id))]
pub async fn adjust_session_duration(
    State(state): State<Arc<SchedulingState>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AdjustDurationRequest>,
) -> Result<Json<Value>, AppError> {
    if request.reason.trim().is_empty() {
        return Err(AppError::ValidationError("An adjustment reason is required".to_string()));
    }

    let session = state.sessions.get_session(session_id).await?;
    let (schedule, day_sessions) = tokio::join!(
        state.schedules.get_day_schedule(session.therapist_id, session.session_date),
        state.sessions.get_day_sessions(session.therapist_id, session.session_date),
    );
    let schedule = schedule?.ok_or(SchedulingError::ScheduleNotFound {
        therapist_id: session.therapist_id,
        date: session.session_date,
    })?;
    let day_sessions = day_sessions?;

    let adjuster = SessionTimingAdjuster::new(state.rules.clone());
    let outcome = adjuster.adjust_duration(
        &session,
        request.new_duration_minutes,
        &request.reason,
        request.cascade,
        &schedule,
        &day_sessions,
    )?;

    if let AdjustmentOutcome::Applied { updated_session, shifted_sessions, .. } = &outcome {
        state
            .sessions
            .commit_session_changes(updated_session, shifted_sessions)
            .await?;
        info!("Duration change for session {} committed", session_id);
    } else {
        warn!("Duration change for session {} rejected", session_id);
    }

    Ok(Json(json!({
        "session_id": session_id,
        "committed": outcome.is_applied(),
        "adjustment": outcome
    })))
}

#[axum::debug_handler]
#[instrument(skip(state, request), fields(date = %request.date))]
pub async fn score_assignment(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<AssignmentRequest>,
) -> Result<Json<Value>, AppError> {
    let therapists = state.therapists.get_candidates(&request.required_specialties).await?;
    debug!("Scoring {} candidate therapists", therapists.len());

    let loads = therapists.into_iter().map(|therapist| {
        let state = &state;
        let date = request.date;
        async move {
            let snapshot = load_snapshot(state, therapist.id, date).await?;
            Ok::<_, SchedulingError>(TherapistCandidate {
                therapist,
                schedule: snapshot.schedule,
                booked: snapshot.booked,
            })
        }
    });
    let candidates = join_all(loads).await.into_iter().collect::<Result<Vec<_>, _>>()?;

    let scorer = TherapistAssignmentScorer::new(state.rules.clone());
    let decision = scorer.score_candidates(&candidates, &request)?;

    Ok(Json(json!({
        "date": request.date,
        "preferred_time": request.preferred_time,
        "candidates_considered": candidates.len(),
        "decision": decision
    })))
}
