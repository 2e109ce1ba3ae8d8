// libs/scheduling-cell/tests/resolver_test.rs
mod common;

use chrono::{Days, NaiveDate};
use uuid::Uuid;

use common::*;
use scheduling_cell::models::{DaySnapshot, ResolutionConstraints, SchedulingRules};
use scheduling_cell::services::ConflictResolver;

fn resolver() -> ConflictResolver {
    ConflictResolver::new(SchedulingRules::default())
}

fn constraints(max_time_shift_minutes: u32, allow_different_day: bool) -> ResolutionConstraints {
    ResolutionConstraints { max_time_shift_minutes, allow_different_day }
}

fn after(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap()
}

fn open_day(therapist_id: Uuid, date: NaiveDate) -> DaySnapshot {
    snapshot(date, Some(standard_schedule(therapist_id, date)), Vec::new())
}

fn full_day(therapist_id: Uuid, date: NaiveDate) -> DaySnapshot {
    snapshot(
        date,
        Some(standard_schedule(therapist_id, date)),
        vec![booked("09:00", "12:00"), booked("13:00", "17:00")],
    )
}

#[test]
fn test_available_slot_resolves_in_place() {
    let therapist = Uuid::new_v4();
    let day = open_day(therapist, monday());

    let resolution = resolver()
        .resolve(&day, range("10:00", "11:00"), &constraints(30, false), &[])
        .unwrap();

    assert!(resolution.resolved);
    assert_eq!(resolution.suggested_start, Some(t("10:00")));
    assert_eq!(resolution.suggested_date, Some(monday()));
}

#[test]
fn test_same_day_shift_picks_closest_alternative() {
    let therapist = Uuid::new_v4();
    let day = snapshot(
        monday(),
        Some(standard_schedule(therapist, monday())),
        vec![booked("10:00", "11:00")],
    );

    let resolution = resolver()
        .resolve(&day, range("10:30", "11:30"), &constraints(60, false), &[])
        .unwrap();

    assert!(resolution.resolved);
    assert_eq!(resolution.suggested_start, Some(t("11:00")));
    assert_eq!(resolution.suggested_date, Some(monday()));
}

#[test]
fn test_shift_limit_is_respected() {
    let therapist = Uuid::new_v4();
    let day = snapshot(
        monday(),
        Some(standard_schedule(therapist, monday())),
        vec![booked("10:00", "11:00")],
    );

    let resolution = resolver()
        .resolve(&day, range("10:30", "11:30"), &constraints(15, false), &[])
        .unwrap();

    assert!(!resolution.resolved);
    assert!(resolution.suggested_start.is_none());
    assert!(resolution.suggested_date.is_none());
    assert!(resolution.reason.unwrap().contains("within 15 minutes"));
}

#[test]
fn test_moves_to_next_working_day() {
    let therapist = Uuid::new_v4();
    let today = full_day(therapist, monday());
    let day_off = snapshot(after(monday(), 1), None, Vec::new());
    let open = open_day(therapist, after(monday(), 2));

    let resolution = resolver()
        .resolve(&today, range("10:30", "11:30"), &constraints(60, true), &[open, day_off])
        .unwrap();

    assert!(resolution.resolved);
    assert_eq!(resolution.suggested_date, Some(after(monday(), 2)));
    assert_eq!(resolution.suggested_start, Some(t("10:30")));
}

#[test]
fn test_different_day_disallowed() {
    let therapist = Uuid::new_v4();
    let today = full_day(therapist, monday());
    let open = open_day(therapist, after(monday(), 1));

    let resolution = resolver()
        .resolve(&today, range("10:30", "11:30"), &constraints(60, false), &[open])
        .unwrap();

    assert!(!resolution.resolved);
}

#[test]
fn test_forward_search_is_bounded() {
    let therapist = Uuid::new_v4();
    let rules = SchedulingRules { max_forward_days: 2, ..SchedulingRules::default() };
    let today = full_day(therapist, monday());
    let following = vec![
        full_day(therapist, after(monday(), 1)),
        full_day(therapist, after(monday(), 2)),
        open_day(therapist, after(monday(), 3)),
    ];

    let resolution = ConflictResolver::new(rules)
        .resolve(&today, range("10:30", "11:30"), &constraints(60, true), &following)
        .unwrap();

    assert!(!resolution.resolved);
    assert!(resolution.reason.unwrap().contains("following 2 days"));
}

#[test]
fn test_forward_search_stops_at_calendar_horizon() {
    let therapist = Uuid::new_v4();
    let today = full_day(therapist, monday());
    let distant = vec![open_day(therapist, after(monday(), 28))];

    let resolution = resolver()
        .resolve(&today, range("10:30", "11:30"), &constraints(60, true), &distant)
        .unwrap();

    assert!(!resolution.resolved);
    assert_eq!(resolution.suggested_date, None);

    let sparse = vec![
        open_day(therapist, after(monday(), 7)),
        open_day(therapist, after(monday(), 8)),
    ];
    let resolution = resolver()
        .resolve(&today, range("10:30", "11:30"), &constraints(60, true), &sparse)
        .unwrap();

    assert!(resolution.resolved);
    assert_eq!(resolution.suggested_date, Some(after(monday(), 7)));
}

#[test]
fn test_no_schedule_today_still_searches_forward() {
    let therapist = Uuid::new_v4();
    let today = snapshot(monday(), None, Vec::new());
    let open = open_day(therapist, after(monday(), 1));

    let resolution = resolver()
        .resolve(&today, range("10:00", "11:00"), &constraints(0, true), &[open])
        .unwrap();

    assert!(resolution.resolved);
    assert_eq!(resolution.suggested_date, Some(after(monday(), 1)));
    assert_eq!(resolution.suggested_start, Some(t("10:00")));
}

#[test]
fn test_resolve_is_idempotent() {
    let therapist = Uuid::new_v4();
    let today = snapshot(
        monday(),
        Some(standard_schedule(therapist, monday()).with_buffer(15)),
        vec![booked("09:30", "10:30"), booked("11:30", "12:00"), booked("14:00", "15:00")],
    );
    let following = vec![open_day(therapist, after(monday(), 1))];
    let request = range("10:00", "11:00");
    let limits = constraints(120, true);

    let first = resolver().resolve(&today, request, &limits, &following).unwrap();
    let second = resolver().resolve(&today, request, &limits, &following).unwrap();

    assert_eq!(first, second);
    assert!(first.resolved);
}
