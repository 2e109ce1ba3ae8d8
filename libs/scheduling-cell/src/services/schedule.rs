// libs/scheduling-cell/src/services/schedule.rs
use chrono::NaiveDate;

use crate::models::DaySchedule;

/// Picks the schedule row in force on `date`: the row for that weekday whose
/// effective range contains the date, preferring the latest `effective_from`.
pub fn resolve_effective_schedule(rows: &[DaySchedule], date: NaiveDate) -> Option<&DaySchedule> {
    rows.iter()
        .filter(|row| row.is_effective_on(date))
        .max_by_key(|row| row.effective_from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeOfDay;
    use uuid::Uuid;

    fn row(therapist: Uuid, day_of_week: u8, start: &str, from: NaiveDate, until: Option<NaiveDate>) -> DaySchedule {
        DaySchedule::new(
            therapist,
            day_of_week,
            TimeOfDay::parse(start).unwrap(),
            TimeOfDay::parse("17:00").unwrap(),
        )
        .effective_between(from, until)
    }

    #[test]
    fn test_latest_effective_row_wins() {
        let therapist = Uuid::new_v4();
        // 2026-03-02 is a Monday
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let rows = vec![
            row(therapist, 1, "09:00", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), None),
            row(therapist, 1, "10:00", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), None),
            row(therapist, 1, "11:00", NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(), None),
        ];

        let chosen = resolve_effective_schedule(&rows, monday).unwrap();
        assert_eq!(chosen.work_start.to_string(), "10:00");
    }

    #[test]
    fn test_expired_and_other_weekday_rows_are_ignored() {
        let therapist = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let rows = vec![
            row(
                therapist,
                1,
                "08:00",
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                Some(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()),
            ),
            row(therapist, 2, "09:00", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), None),
        ];

        assert!(resolve_effective_schedule(&rows, monday).is_none());
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let therapist = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let rows = vec![row(therapist, 1, "09:00", monday, Some(monday))];

        assert!(resolve_effective_schedule(&rows, monday).is_some());
    }
}
