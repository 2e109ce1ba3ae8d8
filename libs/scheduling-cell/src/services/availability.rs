// libs/scheduling-cell/src/services/availability.rs
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    AvailabilityResult, BookedInterval, Conflict, ConflictType, DaySchedule, SchedulingError,
    SchedulingRules, Suggestion, SuggestionPriority, TimeRange,
};
use crate::services::optimizer::TimeSlotOptimizer;

/// Decides whether a candidate slot is free on one therapist's day and, when
/// it is not, proposes the nearest free windows of the same length.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityChecker {
    rules: SchedulingRules,
}

impl AvailabilityChecker {
    pub fn new(rules: SchedulingRules) -> Self {
        Self { rules }
    }

    pub fn check_availability(
        &self,
        schedule: &DaySchedule,
        booked: &[BookedInterval],
        candidate: TimeRange,
        exclude_session_id: Option<Uuid>,
    ) -> Result<AvailabilityResult, SchedulingError> {
        debug!(
            "Checking availability of {} for therapist {} against {} bookings",
            candidate, schedule.therapist_id, booked.len()
        );

        schedule.validate()?;
        if candidate.start >= candidate.end {
            return Err(SchedulingError::InvalidTimeRange { start: candidate.start, end: candidate.end });
        }

        let conflicts = detect_conflicts(schedule, booked, candidate, exclude_session_id);
        let has_error = conflicts.iter().any(Conflict::is_error);

        let suggestions = if has_error {
            warn!(
                "Conflict detected for therapist {} at {} - {} conflict(s)",
                schedule.therapist_id, candidate, conflicts.len()
            );
            self.suggest_alternatives(schedule, booked, candidate, exclude_session_id)?
        } else {
            Vec::new()
        };

        Ok(AvailabilityResult::from_conflicts(conflicts, suggestions))
    }

    /// Runs the same check for several candidates against one snapshot.
    pub fn check_availability_bulk(
        &self,
        schedule: &DaySchedule,
        booked: &[BookedInterval],
        candidates: &[(TimeRange, Option<Uuid>)],
    ) -> Result<Vec<AvailabilityResult>, SchedulingError> {
        debug!("Performing bulk availability check for {} candidates", candidates.len());

        candidates
            .iter()
            .map(|(candidate, exclude)| self.check_availability(schedule, booked, *candidate, *exclude))
            .collect()
    }

    fn suggest_alternatives(
        &self,
        schedule: &DaySchedule,
        booked: &[BookedInterval],
        candidate: TimeRange,
        exclude_session_id: Option<Uuid>,
    ) -> Result<Vec<Suggestion>, SchedulingError> {
        let duration = candidate.duration_minutes();
        let optimizer = TimeSlotOptimizer::new(self.rules.clone());
        let windows = optimizer.free_windows(schedule, booked, &[duration], exclude_session_id)?;

        let mut suggestions: Vec<Suggestion> = windows
            .into_iter()
            .filter(|window| window.start != candidate.start)
            .map(|window| proximity_suggestion(window, candidate))
            .collect();

        suggestions.sort_by(|a, b| Suggestion::closest_first(a, b, candidate.start));
        suggestions.truncate(self.rules.max_suggestions);

        debug!("Generated {} alternative slots", suggestions.len());
        Ok(suggestions)
    }
}

/// The three calendar checks plus the daily session cap. Bookings are widened
/// by the schedule's buffer before the overlap test.
pub fn detect_conflicts(
    schedule: &DaySchedule,
    booked: &[BookedInterval],
    candidate: TimeRange,
    exclude_session_id: Option<Uuid>,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    if candidate.start < schedule.work_start || candidate.end > schedule.work_end {
        conflicts.push(Conflict::error(
            ConflictType::OutsideWorkingHours,
            format!(
                "Requested time {} is outside working hours {}",
                candidate,
                schedule.working_hours()
            ),
        ));
    }

    if let Some(break_window) = schedule.break_window() {
        if candidate.overlaps(&break_window) {
            conflicts.push(Conflict::error(
                ConflictType::BreakConflict,
                format!("Requested time {} overlaps the break {}", candidate, break_window),
            ));
        }
    }

    let others: Vec<&BookedInterval> = booked
        .iter()
        .filter(|interval| Some(interval.session_id) != exclude_session_id)
        .collect();

    for interval in &others {
        let range = interval.range();
        if candidate.overlaps(&range) {
            conflicts.push(
                Conflict::error(
                    ConflictType::ExistingSession,
                    format!(
                        "Requested time {} overlaps session {} ({})",
                        candidate, interval.session_id, range
                    ),
                )
                .with_interval(**interval),
            );
        } else if candidate.overlaps_with_buffer(&range, schedule.buffer_minutes) {
            conflicts.push(
                Conflict::error(
                    ConflictType::ExistingSession,
                    format!(
                        "Requested time {} violates the {}-minute buffer around session {} ({})",
                        candidate, schedule.buffer_minutes, interval.session_id, range
                    ),
                )
                .with_interval(**interval),
            );
        }
    }

    if others.len() >= schedule.max_sessions_per_day as usize {
        conflicts.push(Conflict::error(
            ConflictType::ScheduleConflict,
            format!(
                "Daily limit of {} sessions already reached",
                schedule.max_sessions_per_day
            ),
        ));
    }

    conflicts
}

pub(crate) fn proximity_suggestion(window: TimeRange, requested: TimeRange) -> Suggestion {
    let distance = window.start.distance_to(requested.start);
    let priority = match distance {
        0..=60 => SuggestionPriority::High,
        61..=180 => SuggestionPriority::Medium,
        _ => SuggestionPriority::Low,
    };
    let direction = if window.start < requested.start { "before" } else { "after" };

    Suggestion {
        start: window.start,
        end: window.end,
        duration_minutes: window.duration_minutes(),
        priority,
        reason: format!("Same day, {} minutes {} the requested time", distance, direction),
        score: None,
        is_optimal: false,
    }
}
