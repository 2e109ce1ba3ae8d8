// libs/scheduling-cell/src/services/optimizer.rs
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    BookedInterval, DaySchedule, OptimizationStrategy, SchedulingError, SchedulingRules,
    Suggestion, SuggestionPriority, TimeOfDay, TimeRange,
};
use crate::services::availability::detect_conflicts;

/// Score at or above which a slot is flagged optimal.
pub const OPTIMAL_SCORE: u32 = 80;

/// Enumerates every free window of a day on a fixed step grid and ranks the
/// windows by a strategy.
#[derive(Debug, Clone, Default)]
pub struct TimeSlotOptimizer {
    rules: SchedulingRules,
}

impl TimeSlotOptimizer {
    pub fn new(rules: SchedulingRules) -> Self {
        Self { rules }
    }

    pub fn optimize_slots(
        &self,
        schedule: &DaySchedule,
        booked: &[BookedInterval],
        candidate_durations: &[u32],
        strategy: OptimizationStrategy,
    ) -> Result<Vec<Suggestion>, SchedulingError> {
        schedule.validate()?;

        let durations: Vec<u32> = if candidate_durations.is_empty() {
            vec![schedule.default_duration]
        } else {
            candidate_durations.to_vec()
        };

        let windows = self.free_windows(schedule, booked, &durations, None)?;
        debug!(
            "Found {} free windows for therapist {} across {} durations",
            windows.len(), schedule.therapist_id, durations.len()
        );

        let mut slots: Vec<Suggestion> = windows
            .into_iter()
            .map(|window| {
                let score = self.score_window(schedule, booked, window, strategy);
                scored_suggestion(window, score, strategy)
            })
            .collect();

        slots.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.duration_minutes.cmp(&b.duration_minutes))
        });

        info!(
            strategy = %strategy,
            slots = slots.len(),
            optimal = slots.iter().filter(|s| s.is_optimal).count(),
            "Slot optimization completed"
        );

        Ok(slots)
    }

    /// Every window of each duration, stepped from `work_start`, that passes
    /// the same checks as the availability checker.
    pub fn free_windows(
        &self,
        schedule: &DaySchedule,
        booked: &[BookedInterval],
        durations: &[u32],
        exclude_session_id: Option<Uuid>,
    ) -> Result<Vec<TimeRange>, SchedulingError> {
        let step = i32::from(self.rules.slot_step_minutes.max(1));
        let mut windows = Vec::new();

        for &duration in durations {
            if duration == 0 {
                return Err(SchedulingError::ValidationError(
                    "Candidate durations must be greater than zero".to_string(),
                ));
            }

            let mut start = Some(schedule.work_start);
            while let Some(slot_start) = start {
                let Some(slot_end) = slot_start.checked_add_minutes(duration) else {
                    break;
                };
                if slot_end > schedule.work_end {
                    break;
                }

                let window = TimeRange { start: slot_start, end: slot_end };
                let is_free = detect_conflicts(schedule, booked, window, exclude_session_id)
                    .iter()
                    .all(|conflict| !conflict.is_error());
                if is_free {
                    windows.push(window);
                }

                start = slot_start.offset_by(step);
            }
        }

        Ok(windows)
    }

    fn score_window(
        &self,
        schedule: &DaySchedule,
        booked: &[BookedInterval],
        window: TimeRange,
        strategy: OptimizationStrategy,
    ) -> u32 {
        match strategy {
            OptimizationStrategy::Efficiency => window.duration_minutes(),
            OptimizationStrategy::PatientComfort => {
                let required = schedule.buffer_minutes;
                let (before, after) = neighbour_gaps(booked, window);
                let roomy = before.map_or(true, |gap| gap >= required)
                    && after.map_or(true, |gap| gap >= required);
                if roomy { 100 } else { 50 }
            }
            OptimizationStrategy::TherapistPreference => {
                if window.duration_minutes() == schedule.default_duration { 100 } else { 80 }
            }
        }
    }
}

/// Minutes between `window` and the nearest booking ending before it and the
/// nearest booking starting after it.
fn neighbour_gaps(booked: &[BookedInterval], window: TimeRange) -> (Option<u32>, Option<u32>) {
    let before = booked
        .iter()
        .filter(|b| b.end <= window.start)
        .map(|b| gap(b.end, window.start))
        .min();
    let after = booked
        .iter()
        .filter(|b| b.start >= window.end)
        .map(|b| gap(window.end, b.start))
        .min();
    (before, after)
}

fn gap(from: TimeOfDay, to: TimeOfDay) -> u32 {
    u32::from(to.minutes().saturating_sub(from.minutes()))
}

fn scored_suggestion(window: TimeRange, score: u32, strategy: OptimizationStrategy) -> Suggestion {
    let is_optimal = score >= OPTIMAL_SCORE;
    let priority = if is_optimal {
        SuggestionPriority::High
    } else if score >= 50 {
        SuggestionPriority::Medium
    } else {
        SuggestionPriority::Low
    };

    let reason = match strategy {
        OptimizationStrategy::Efficiency => {
            format!("Uses {} minutes of therapist capacity", window.duration_minutes())
        }
        OptimizationStrategy::PatientComfort if score == 100 => {
            "Comfortable gap from neighbouring sessions".to_string()
        }
        OptimizationStrategy::PatientComfort => {
            "Close to a neighbouring session".to_string()
        }
        OptimizationStrategy::TherapistPreference if score == 100 => {
            "Matches the therapist's default session length".to_string()
        }
        OptimizationStrategy::TherapistPreference => {
            "Differs from the therapist's default session length".to_string()
        }
    };

    Suggestion {
        start: window.start,
        end: window.end,
        duration_minutes: window.duration_minutes(),
        priority,
        reason,
        score: Some(score),
        is_optimal,
    }
}
