// libs/scheduling-cell/src/services/adjuster.rs
use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    AdjustmentOutcome, BookedInterval, Conflict, ConflictType, DaySchedule, SchedulingError,
    SchedulingRules, TherapySession, TimeRange,
};
use crate::services::availability::detect_conflicts;

/// Applies a duration change to one session and optionally shifts every later
/// session of the day by the same delta. All or nothing.
#[derive(Debug, Clone, Default)]
pub struct SessionTimingAdjuster {
    rules: SchedulingRules,
}

impl SessionTimingAdjuster {
    pub fn new(rules: SchedulingRules) -> Self {
        Self { rules }
    }

    #[instrument(skip(self, session, schedule, day_sessions), fields(session_id = %session.id))]
    pub fn adjust_duration(
        &self,
        session: &TherapySession,
        new_duration: u32,
        reason: &str,
        cascade: bool,
        schedule: &DaySchedule,
        day_sessions: &[TherapySession],
    ) -> Result<AdjustmentOutcome, SchedulingError> {
        self.rules.validate_duration(new_duration)?;
        if new_duration == session.duration_minutes {
            return Err(SchedulingError::NoOpAdjustment(new_duration));
        }
        schedule.validate()?;

        let original = session.interval()?;
        let delta = new_duration as i32 - session.duration_minutes as i32;
        debug!(
            "Adjusting session {} from {} to {} minutes (delta {}, cascade {})",
            session.id, session.duration_minutes, new_duration, delta, cascade
        );

        let updated = session.with_duration(new_duration);
        let Ok(updated_range) = updated.interval() else {
            return Ok(rejected(
                vec![Conflict::error(
                    ConflictType::OutsideWorkingHours,
                    format!(
                        "Session starting at {} cannot last {} minutes without running past midnight",
                        session.start, new_duration
                    ),
                )],
                reason,
            ));
        };

        let others: Vec<&TherapySession> = day_sessions
            .iter()
            .filter(|other| {
                other.id != session.id
                    && other.status.is_active()
                    && other.therapist_id == session.therapist_id
                    && other.session_date == session.session_date
            })
            .collect();

        let mut to_shift: Vec<&TherapySession> = if cascade {
            others.iter().copied().filter(|other| other.start >= original.end).collect()
        } else {
            Vec::new()
        };
        to_shift.sort_by_key(|other| other.start);
        let shifting: HashSet<Uuid> = to_shift.iter().map(|other| other.id).collect();

        let stationary = others
            .iter()
            .filter(|other| !shifting.contains(&other.id))
            .map(|other| other.booked_interval())
            .collect::<Result<Vec<BookedInterval>, _>>()?;

        let target_conflicts: Vec<Conflict> =
            detect_conflicts(schedule, &stationary, updated_range, Some(session.id))
                .into_iter()
                .filter(Conflict::is_error)
                .collect();
        if !target_conflicts.is_empty() {
            warn!(
                "Rejected duration change for session {}: {} conflict(s)",
                session.id, target_conflicts.len()
            );
            return Ok(rejected(target_conflicts, reason));
        }

        if !cascade {
            info!("Session {} now lasts {} minutes", session.id, new_duration);
            return Ok(AdjustmentOutcome::Applied {
                updated_session: updated,
                shifted_sessions: Vec::new(),
                delta_minutes: delta,
                reason: reason.to_string(),
            });
        }

        let mut conflicts = Vec::new();
        let mut shifted = Vec::with_capacity(to_shift.len());
        for other in &to_shift {
            match other.start.offset_by(delta) {
                Some(new_start) if other.with_start(new_start).end().is_some() => {
                    shifted.push(other.with_start(new_start));
                }
                _ => conflicts.push(Conflict::error(
                    ConflictType::OutsideWorkingHours,
                    format!(
                        "Shifting session {} by {} minutes moves it outside the day",
                        other.id, delta
                    ),
                )),
            }
        }

        if conflicts.is_empty() {
            let mut layout = stationary;
            layout.push(BookedInterval { session_id: updated.id, start: updated_range.start, end: updated_range.end });
            for moved in &shifted {
                layout.push(moved.booked_interval()?);
            }

            for moved in &shifted {
                let range: TimeRange = moved.interval()?;
                conflicts.extend(
                    detect_conflicts(schedule, &layout, range, Some(moved.id))
                        .into_iter()
                        .filter(Conflict::is_error)
                        .map(|conflict| Conflict {
                            message: format!("Shifted session {}: {}", moved.id, conflict.message),
                            ..conflict
                        }),
                );
            }
        }

        if !conflicts.is_empty() {
            warn!(
                "Rejected cascading adjustment of session {}: {} conflict(s) across {} later sessions",
                session.id, conflicts.len(), to_shift.len()
            );
            return Ok(rejected(conflicts, reason));
        }

        info!(
            "Session {} now lasts {} minutes; shifted {} later sessions by {} minutes",
            session.id, new_duration, shifted.len(), delta
        );
        Ok(AdjustmentOutcome::Applied {
            updated_session: updated,
            shifted_sessions: shifted,
            delta_minutes: delta,
            reason: reason.to_string(),
        })
    }
}

fn rejected(conflicts: Vec<Conflict>, reason: &str) -> AdjustmentOutcome {
    AdjustmentOutcome::Rejected {
        conflicts,
        reason: reason.to_string(),
    }
}
