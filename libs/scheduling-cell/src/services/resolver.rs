// libs/scheduling-cell/src/services/resolver.rs
use chrono::{Days, NaiveDate};
use tracing::{debug, info, instrument, warn};

use crate::models::{
    DaySnapshot, Resolution, ResolutionConstraints, SchedulingError, SchedulingRules, Suggestion,
    TimeRange,
};
use crate::services::availability::{proximity_suggestion, AvailabilityChecker};
use crate::services::optimizer::TimeSlotOptimizer;

/// Auto-resolve entry point: confirms the requested slot or picks the closest
/// free alternative within the caller's constraints.
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    checker: AvailabilityChecker,
    optimizer: TimeSlotOptimizer,
    rules: SchedulingRules,
}

impl ConflictResolver {
    pub fn new(rules: SchedulingRules) -> Self {
        Self {
            checker: AvailabilityChecker::new(rules.clone()),
            optimizer: TimeSlotOptimizer::new(rules.clone()),
            rules,
        }
    }

    /// `following_days` holds snapshots for the days after `day.date`; only
    /// those within `max_forward_days` calendar days are searched, in date order.
    #[instrument(skip(self, day, following_days), fields(date = %day.date, candidate = %candidate))]
    pub fn resolve(
        &self,
        day: &DaySnapshot,
        candidate: TimeRange,
        constraints: &ResolutionConstraints,
        following_days: &[DaySnapshot],
    ) -> Result<Resolution, SchedulingError> {
        if let Some(schedule) = &day.schedule {
            let result = self.checker.check_availability(schedule, &day.booked, candidate, None)?;
            if result.available {
                info!("Requested slot is available, no resolution needed");
                return Ok(Resolution {
                    resolved: true,
                    suggested_start: Some(candidate.start),
                    suggested_date: Some(day.date),
                    reason: Some("Requested time is available".to_string()),
                });
            }
        } else {
            debug!("No working schedule on {}", day.date);
        }

        if let Some(suggestion) = self.best_alternative(day, candidate, constraints)? {
            info!("Resolved conflict by moving to {} on {}", suggestion.start, day.date);
            return Ok(Resolution {
                resolved: true,
                suggested_start: Some(suggestion.start),
                suggested_date: Some(day.date),
                reason: Some(format!(
                    "Moved {} minutes from the requested time on the same day",
                    suggestion.start.distance_to(candidate.start)
                )),
            });
        }

        if constraints.allow_different_day {
            let horizon = day
                .date
                .checked_add_days(Days::new(u64::from(self.rules.max_forward_days)))
                .unwrap_or(NaiveDate::MAX);
            let mut later: Vec<&DaySnapshot> = following_days
                .iter()
                .filter(|snapshot| snapshot.date > day.date && snapshot.date <= horizon)
                .collect();
            later.sort_by_key(|snapshot| snapshot.date);

            for snapshot in later {
                if let Some(suggestion) = self.best_alternative(snapshot, candidate, constraints)? {
                    info!("Resolved conflict by moving to {} on {}", suggestion.start, snapshot.date);
                    return Ok(Resolution {
                        resolved: true,
                        suggested_start: Some(suggestion.start),
                        suggested_date: Some(snapshot.date),
                        reason: Some(format!(
                            "No free slot on {}; moved to {}",
                            day.date, snapshot.date
                        )),
                    });
                }
            }
        }

        let reason = unresolved_reason(day.date, candidate, constraints, self.rules.max_forward_days);
        warn!("{}", reason);
        Ok(Resolution {
            resolved: false,
            suggested_start: None,
            suggested_date: None,
            reason: Some(reason),
        })
    }

    /// Closest free window of the candidate's length on `snapshot` that moves
    /// the start by at most `max_time_shift_minutes`.
    fn best_alternative(
        &self,
        snapshot: &DaySnapshot,
        candidate: TimeRange,
        constraints: &ResolutionConstraints,
    ) -> Result<Option<Suggestion>, SchedulingError> {
        let Some(schedule) = &snapshot.schedule else {
            return Ok(None);
        };
        schedule.validate()?;

        let windows = self.optimizer.free_windows(
            schedule,
            &snapshot.booked,
            &[candidate.duration_minutes()],
            None,
        )?;

        let best = windows
            .into_iter()
            .filter(|window| {
                u32::from(window.start.distance_to(candidate.start)) <= constraints.max_time_shift_minutes
            })
            .map(|window| proximity_suggestion(window, candidate))
            .min_by(|a, b| Suggestion::closest_first(a, b, candidate.start));

        Ok(best)
    }
}

fn unresolved_reason(
    date: NaiveDate,
    candidate: TimeRange,
    constraints: &ResolutionConstraints,
    max_forward_days: u32,
) -> String {
    if constraints.allow_different_day {
        format!(
            "No free {}-minute slot within {} minutes of {} on {} or the following {} days",
            candidate.duration_minutes(),
            constraints.max_time_shift_minutes,
            candidate.start,
            date,
            max_forward_days
        )
    } else {
        format!(
            "No free {}-minute slot within {} minutes of {} on {}",
            candidate.duration_minutes(),
            constraints.max_time_shift_minutes,
            candidate.start,
            date
        )
    }
}
