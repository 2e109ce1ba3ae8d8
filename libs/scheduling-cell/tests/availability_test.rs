// libs/scheduling-cell/tests/availability_test.rs
mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use common::*;
use scheduling_cell::models::{
    ConflictType, SchedulingError, SchedulingRules, SuggestionPriority, TimeRange,
};
use scheduling_cell::services::AvailabilityChecker;

fn checker() -> AvailabilityChecker {
    AvailabilityChecker::new(SchedulingRules::default())
}

// ==============================================================================
// CALENDAR CHECKS
// ==============================================================================

#[test]
fn test_free_slot_is_available() {
    let schedule = standard_schedule(Uuid::new_v4(), monday());
    let result = checker()
        .check_availability(&schedule, &[booked("10:00", "11:00")], range("14:00", "15:00"), None)
        .unwrap();

    assert!(result.available);
    assert!(result.reason.is_none());
    assert!(result.conflicts.is_empty());
    assert!(result.suggestions.is_empty());
}

#[test]
fn test_overlap_with_existing_session_scenario() {
    let schedule = standard_schedule(Uuid::new_v4(), monday());
    let existing = booked("10:00", "11:00");

    let result = checker()
        .check_availability(&schedule, &[existing], range("10:30", "11:30"), None)
        .unwrap();

    assert!(!result.available);
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].conflict_type, ConflictType::ExistingSession);
    assert_eq!(result.conflicts[0].conflicting_interval, Some(existing));
    assert!(result.conflicts[0].message.contains("overlaps session"));

    let starts: Vec<String> = result.suggestions.iter().map(|s| s.start.to_string()).collect();
    assert_eq!(starts, vec!["11:00", "09:00", "13:00", "13:15", "13:30"]);
    assert!(!starts.contains(&"12:00".to_string()));
    assert_eq!(result.suggestions[0].priority, SuggestionPriority::High);
    assert!(result.suggestions.iter().all(|s| s.duration_minutes == 60));
}

#[test]
fn test_outside_working_hours() {
    let schedule = standard_schedule(Uuid::new_v4(), monday());

    for candidate in [range("08:00", "09:00"), range("16:30", "17:30")] {
        let result = checker().check_availability(&schedule, &[], candidate, None).unwrap();
        assert!(!result.available);
        assert_eq!(result.conflicts[0].conflict_type, ConflictType::OutsideWorkingHours);
    }

    let edge = checker()
        .check_availability(&schedule, &[], range("16:00", "17:00"), None)
        .unwrap();
    assert!(edge.available);
}

#[test]
fn test_break_window_conflict() {
    let schedule = standard_schedule(Uuid::new_v4(), monday());
    let result = checker()
        .check_availability(&schedule, &[], range("12:30", "13:30"), None)
        .unwrap();

    assert!(!result.available);
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].conflict_type, ConflictType::BreakConflict);

    let touching = checker()
        .check_availability(&schedule, &[], range("11:00", "12:00"), None)
        .unwrap();
    assert!(touching.available);
}

#[test]
fn test_buffer_violation_is_reported_distinctly() {
    let schedule = plain_schedule(Uuid::new_v4(), monday()).with_buffer(15);
    let existing = booked("10:00", "11:00");

    let result = checker()
        .check_availability(&schedule, &[existing], range("11:00", "12:00"), None)
        .unwrap();

    assert!(!result.available);
    assert_eq!(result.conflicts[0].conflict_type, ConflictType::ExistingSession);
    assert!(result.conflicts[0].message.contains("buffer"));
    assert!(!result.conflicts[0].message.contains("overlaps session"));

    let clear = checker()
        .check_availability(&schedule, &[existing], range("11:15", "12:15"), None)
        .unwrap();
    assert!(clear.available);
}

#[test]
fn test_excluded_session_is_ignored() {
    let schedule = plain_schedule(Uuid::new_v4(), monday());
    let existing = booked("10:00", "11:00");

    let result = checker()
        .check_availability(&schedule, &[existing], range("10:00", "11:30"), Some(existing.session_id))
        .unwrap();

    assert!(result.available);
}

#[test]
fn test_daily_session_cap() {
    let schedule = plain_schedule(Uuid::new_v4(), monday()).with_max_sessions(2);
    let first = booked("09:00", "10:00");
    let second = booked("14:00", "15:00");

    let full = checker()
        .check_availability(&schedule, &[first, second], range("11:00", "12:00"), None)
        .unwrap();
    assert!(!full.available);
    assert_eq!(full.conflicts[0].conflict_type, ConflictType::ScheduleConflict);

    let rescheduling = checker()
        .check_availability(&schedule, &[first, second], range("11:00", "12:00"), Some(first.session_id))
        .unwrap();
    assert!(rescheduling.available);
}

// ==============================================================================
// VALIDATION FAULTS
// ==============================================================================

#[test]
fn test_zero_length_candidate_is_a_validation_fault() {
    let schedule = plain_schedule(Uuid::new_v4(), monday());
    let empty = TimeRange { start: t("10:00"), end: t("10:00") };

    assert_matches!(
        checker().check_availability(&schedule, &[], empty, None),
        Err(SchedulingError::InvalidTimeRange { .. })
    );
}

#[test]
fn test_invalid_schedule_is_a_validation_fault() {
    let schedule = plain_schedule(Uuid::new_v4(), monday()).with_break(t("08:00"), t("09:30"));

    assert_matches!(
        checker().check_availability(&schedule, &[], range("10:00", "11:00"), None),
        Err(SchedulingError::InvalidSchedule(_))
    );
}

// ==============================================================================
// SUGGESTIONS AND BULK CHECKS
// ==============================================================================

#[test]
fn test_suggestions_are_themselves_available() {
    let schedule = standard_schedule(Uuid::new_v4(), monday()).with_buffer(10);
    let existing = vec![booked("09:30", "10:30"), booked("13:30", "14:30"), booked("15:00", "16:00")];

    let result = checker()
        .check_availability(&schedule, &existing, range("10:00", "10:45"), None)
        .unwrap();

    assert!(!result.available);
    assert!(!result.suggestions.is_empty());
    assert!(result.suggestions.len() <= 5);
    for suggestion in &result.suggestions {
        let verdict = checker()
            .check_availability(&schedule, &existing, suggestion.range(), None)
            .unwrap();
        assert!(verdict.available, "suggestion {} is not free", suggestion.range());
    }
}

#[test]
fn test_suggestion_order_is_deterministic() {
    let schedule = standard_schedule(Uuid::new_v4(), monday());
    let existing = vec![booked("10:00", "11:00")];

    let first = checker()
        .check_availability(&schedule, &existing, range("10:30", "11:30"), None)
        .unwrap();
    let second = checker()
        .check_availability(&schedule, &existing, range("10:30", "11:30"), None)
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_bulk_check() {
    let schedule = standard_schedule(Uuid::new_v4(), monday());
    let existing = vec![booked("10:00", "11:00")];
    let candidates = vec![
        (range("09:00", "10:00"), None),
        (range("10:30", "11:30"), None),
        (range("12:00", "13:00"), None),
    ];

    let results = checker()
        .check_availability_bulk(&schedule, &existing, &candidates)
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].available);
    assert!(!results[1].available);
    assert_eq!(results[2].conflicts[0].conflict_type, ConflictType::BreakConflict);
}
