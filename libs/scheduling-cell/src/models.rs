// libs/scheduling-cell/src/models.rs
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use shared_config::AppConfig;

// ==============================================================================
// TIME MODEL
// ==============================================================================

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Minutes since midnight, 0..=1439. All engine arithmetic happens on this
/// type; "HH:MM" strings only exist at the serde boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    pub fn from_minutes(minutes: u16) -> Result<Self, SchedulingError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(SchedulingError::InvalidTime(format!(
                "{} minutes is past the end of the day",
                minutes
            )));
        }
        Ok(Self(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, SchedulingError> {
        if hour >= 24 || minute >= 60 {
            return Err(SchedulingError::InvalidTime(format!("{:02}:{:02}", hour, minute)));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Accepts "HH:MM" and the "HH:MM:SS" form Postgres uses for `time` columns.
    pub fn parse(raw: &str) -> Result<Self, SchedulingError> {
        let trimmed = raw.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|_| SchedulingError::InvalidTime(format!("'{}' is not a valid HH:MM time", raw)))?;
        Ok(Self::from(time))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Shifts by a signed number of minutes; `None` when the result leaves the day.
    pub fn offset_by(self, delta_minutes: i32) -> Option<Self> {
        let shifted = i32::from(self.0) + delta_minutes;
        if (0..i32::from(MINUTES_PER_DAY)).contains(&shifted) {
            Some(Self(shifted as u16))
        } else {
            None
        }
    }

    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        i32::try_from(minutes).ok().and_then(|m| self.offset_by(m))
    }

    pub fn distance_to(self, other: TimeOfDay) -> u16 {
        self.0.abs_diff(other.0)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = SchedulingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Half-open `[start, end)` interval within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Deserialize)]
struct RawTimeRange {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = SchedulingError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn starting_at(start: TimeOfDay, duration_minutes: u32) -> Result<Self, SchedulingError> {
        if duration_minutes == 0 {
            return Err(SchedulingError::ValidationError(
                "Session duration must be greater than zero".to_string(),
            ));
        }
        let end = start.checked_add_minutes(duration_minutes).ok_or_else(|| {
            SchedulingError::InvalidTime(format!(
                "{} + {} minutes runs past midnight",
                start, duration_minutes
            ))
        })?;
        Self::new(start, end)
    }

    pub fn duration_minutes(&self) -> u32 {
        u32::from(self.end.minutes() - self.start.minutes())
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Overlap test with `other` widened by `buffer_minutes` on both sides.
    pub fn overlaps_with_buffer(&self, other: &TimeRange, buffer_minutes: u32) -> bool {
        let buffer = i64::from(buffer_minutes);
        let other_start = i64::from(other.start.minutes()) - buffer;
        let other_end = i64::from(other.end.minutes()) + buffer;
        i64::from(self.start.minutes()) < other_end && i64::from(self.end.minutes()) > other_start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// ==============================================================================
// CALENDAR MODEL
// ==============================================================================

/// Recurring weekly availability of one therapist for one weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub therapist_id: Uuid,
    pub day_of_week: u8, // 0 = Sunday, 1 = Monday, etc.
    pub work_start: TimeOfDay,
    pub work_end: TimeOfDay,
    #[serde(default)]
    pub break_start: Option<TimeOfDay>,
    #[serde(default)]
    pub break_end: Option<TimeOfDay>,
    pub max_sessions_per_day: u32,
    pub default_duration: u32,
    #[serde(default)]
    pub buffer_minutes: u32,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_until: Option<NaiveDate>,
}

impl DaySchedule {
    /// A schedule with no break, no buffer, eight sessions a day of 60 minutes,
    /// effective indefinitely.
    pub fn new(therapist_id: Uuid, day_of_week: u8, work_start: TimeOfDay, work_end: TimeOfDay) -> Self {
        Self {
            therapist_id,
            day_of_week,
            work_start,
            work_end,
            break_start: None,
            break_end: None,
            max_sessions_per_day: 8,
            default_duration: 60,
            buffer_minutes: 0,
            effective_from: NaiveDate::default(),
            effective_until: None,
        }
    }

    pub fn with_break(mut self, start: TimeOfDay, end: TimeOfDay) -> Self {
        self.break_start = Some(start);
        self.break_end = Some(end);
        self
    }

    pub fn with_buffer(mut self, buffer_minutes: u32) -> Self {
        self.buffer_minutes = buffer_minutes;
        self
    }

    pub fn with_max_sessions(mut self, max_sessions_per_day: u32) -> Self {
        self.max_sessions_per_day = max_sessions_per_day;
        self
    }

    pub fn with_default_duration(mut self, default_duration: u32) -> Self {
        self.default_duration = default_duration;
        self
    }

    pub fn effective_between(mut self, from: NaiveDate, until: Option<NaiveDate>) -> Self {
        self.effective_from = from;
        self.effective_until = until;
        self
    }

    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.day_of_week > 6 {
            return Err(SchedulingError::InvalidSchedule(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if self.work_start >= self.work_end {
            return Err(SchedulingError::InvalidSchedule(format!(
                "Working hours {}-{} must start before they end",
                self.work_start, self.work_end
            )));
        }
        match (self.break_start, self.break_end) {
            (None, None) => {}
            (Some(start), Some(end)) => {
                if !(self.work_start <= start && start < end && end <= self.work_end) {
                    return Err(SchedulingError::InvalidSchedule(format!(
                        "Break {}-{} must fall inside working hours {}-{}",
                        start, end, self.work_start, self.work_end
                    )));
                }
            }
            _ => {
                return Err(SchedulingError::InvalidSchedule(
                    "Break start and end must be set together".to_string(),
                ));
            }
        }
        if self.max_sessions_per_day == 0 {
            return Err(SchedulingError::InvalidSchedule(
                "Maximum sessions per day must be at least 1".to_string(),
            ));
        }
        if self.default_duration == 0 {
            return Err(SchedulingError::InvalidSchedule(
                "Default session duration must be greater than zero".to_string(),
            ));
        }
        if let Some(until) = self.effective_until {
            if until < self.effective_from {
                return Err(SchedulingError::InvalidSchedule(format!(
                    "Effective range {} to {} is empty",
                    self.effective_from, until
                )));
            }
        }
        Ok(())
    }

    pub fn working_hours(&self) -> TimeRange {
        TimeRange { start: self.work_start, end: self.work_end }
    }

    pub fn break_window(&self) -> Option<TimeRange> {
        match (self.break_start, self.break_end) {
            (Some(start), Some(end)) if start < end => Some(TimeRange { start, end }),
            _ => None,
        }
    }

    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        u32::from(self.day_of_week) == date.weekday().num_days_from_sunday()
            && self.effective_from <= date
            && self.effective_until.map_or(true, |until| date <= until)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionStatus {
    /// Only active sessions occupy calendar time.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionStatus::Scheduled | SessionStatus::Confirmed | SessionStatus::InProgress
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Confirmed => "confirmed",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapySession {
    pub id: Uuid,
    pub therapist_id: Uuid,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    pub session_date: NaiveDate,
    #[serde(rename = "scheduled_time")]
    pub start: TimeOfDay,
    pub duration_minutes: u32,
    pub status: SessionStatus,
}

impl TherapySession {
    pub fn end(&self) -> Option<TimeOfDay> {
        self.start.checked_add_minutes(self.duration_minutes)
    }

    pub fn interval(&self) -> Result<TimeRange, SchedulingError> {
        TimeRange::starting_at(self.start, self.duration_minutes)
    }

    pub fn booked_interval(&self) -> Result<BookedInterval, SchedulingError> {
        let range = self.interval()?;
        Ok(BookedInterval { session_id: self.id, start: range.start, end: range.end })
    }

    pub fn with_start(&self, start: TimeOfDay) -> Self {
        Self { start, ..self.clone() }
    }

    pub fn with_duration(&self, duration_minutes: u32) -> Self {
        Self { duration_minutes, ..self.clone() }
    }
}

/// Calendar time occupied by one booked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookedInterval {
    pub session_id: Uuid,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl BookedInterval {
    pub fn new(session_id: Uuid, start: TimeOfDay, end: TimeOfDay) -> Result<Self, SchedulingError> {
        let range = TimeRange::new(start, end)?;
        Ok(Self { session_id, start: range.start, end: range.end })
    }

    pub fn range(&self) -> TimeRange {
        TimeRange { start: self.start, end: self.end }
    }
}

/// Everything the engine needs to reason about one therapist on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub date: NaiveDate,
    pub schedule: Option<DaySchedule>,
    pub booked: Vec<BookedInterval>,
}

// ==============================================================================
// CONFLICTS AND SUGGESTIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    ScheduleConflict,
    BreakConflict,
    OutsideWorkingHours,
    ExistingSession,
    TherapistUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_interval: Option<BookedInterval>,
}

impl Conflict {
    pub fn error(conflict_type: ConflictType, message: impl Into<String>) -> Self {
        Self {
            conflict_type,
            severity: ConflictSeverity::Error,
            message: message.into(),
            conflicting_interval: None,
        }
    }

    pub fn with_interval(mut self, interval: BookedInterval) -> Self {
        self.conflicting_interval = Some(interval);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ConflictSeverity::Error
    }
}

/// Declaration order gives `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration_minutes: u32,
    pub priority: SuggestionPriority,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default)]
    pub is_optimal: bool,
}

impl Suggestion {
    pub fn range(&self) -> TimeRange {
        TimeRange { start: self.start, end: self.end }
    }

    /// Priority descending, then distance from `requested` ascending, then
    /// earliest start, then shortest duration.
    pub fn closest_first(a: &Suggestion, b: &Suggestion, requested: TimeOfDay) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.start.distance_to(requested).cmp(&b.start.distance_to(requested)))
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.duration_minutes.cmp(&b.duration_minutes))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub conflicts: Vec<Conflict>,
    pub suggestions: Vec<Suggestion>,
}

impl AvailabilityResult {
    pub fn from_conflicts(conflicts: Vec<Conflict>, suggestions: Vec<Suggestion>) -> Self {
        let first_error = conflicts.iter().find(|c| c.is_error());
        let available = first_error.is_none();
        let reason = first_error.map(|c| c.message.clone());
        Self { available, reason, conflicts, suggestions }
    }

    /// The therapist has no working schedule on `date` at all.
    pub fn therapist_unavailable(date: NaiveDate) -> Self {
        Self::from_conflicts(
            vec![Conflict::error(
                ConflictType::TherapistUnavailable,
                format!("Therapist has no working schedule on {}", date),
            )],
            Vec::new(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationStrategy {
    #[default]
    Efficiency,
    PatientComfort,
    TherapistPreference,
}

impl fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStrategy::Efficiency => write!(f, "EFFICIENCY"),
            OptimizationStrategy::PatientComfort => write!(f, "PATIENT_COMFORT"),
            OptimizationStrategy::TherapistPreference => write!(f, "THERAPIST_PREFERENCE"),
        }
    }
}

// ==============================================================================
// RESOLUTION AND ADJUSTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConstraints {
    pub max_time_shift_minutes: u32,
    #[serde(default)]
    pub allow_different_day: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_start: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of a duration change. Either every mutation is returned or none is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdjustmentOutcome {
    Applied {
        updated_session: TherapySession,
        shifted_sessions: Vec<TherapySession>,
        delta_minutes: i32,
        reason: String,
    },
    Rejected {
        conflicts: Vec<Conflict>,
        reason: String,
    },
}

impl AdjustmentOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, AdjustmentOutcome::Applied { .. })
    }
}

// ==============================================================================
// THERAPIST ASSIGNMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Therapist {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub current_workload: u32,
    pub max_workload: u32,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub years_experience: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Therapist {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_specialty(&self, specialty: &str) -> bool {
        let wanted = specialty.trim();
        self.specialties.iter().any(|s| s.trim().eq_ignore_ascii_case(wanted))
    }
}

/// A therapist together with their calendar for the requested date.
#[derive(Debug, Clone, PartialEq)]
pub struct TherapistCandidate {
    pub therapist: Therapist,
    pub schedule: Option<DaySchedule>,
    pub booked: Vec<BookedInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    #[serde(default)]
    pub required_specialties: Vec<String>,
    pub preferred_time: TimeOfDay,
    pub date: NaiveDate,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapistScore {
    pub therapist_id: Uuid,
    pub score: f64,
    pub reasons: Vec<String>,
    pub available: bool,
    pub current_workload: u32,
    pub max_workload: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentDecision {
    pub assigned: Option<TherapistScore>,
    pub alternatives: Vec<TherapistScore>,
    pub strategy: String,
}

// ==============================================================================
// RULES
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingRules {
    pub slot_step_minutes: u16,
    pub max_suggestions: usize,
    pub max_forward_days: u32,
    pub min_session_minutes: u32,
    pub max_session_minutes: u32,
    pub assignment_threshold: f64,
    pub candidate_durations: Vec<u32>,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            slot_step_minutes: 15,
            max_suggestions: 5,
            max_forward_days: 7,
            min_session_minutes: 15,
            max_session_minutes: 480,
            assignment_threshold: 60.0,
            candidate_durations: vec![30, 45, 60, 90, 120],
        }
    }
}

impl SchedulingRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            slot_step_minutes: config.slot_step_minutes.max(1),
            max_forward_days: config.max_forward_search_days,
            assignment_threshold: config.assignment_threshold.clamp(0.0, 100.0),
            ..Self::default()
        }
    }

    pub fn validate_duration(&self, minutes: u32) -> Result<(), SchedulingError> {
        if minutes < self.min_session_minutes || minutes > self.max_session_minutes {
            return Err(SchedulingError::InvalidDuration {
                minutes,
                min: self.min_session_minutes,
                max: self.max_session_minutes,
            });
        }
        Ok(())
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Faults only. Business conflicts are returned as data, never as errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidTimeRange { start: TimeOfDay, end: TimeOfDay },

    #[error("Duration of {minutes} minutes is outside the allowed {min}-{max} minute range")]
    InvalidDuration { minutes: u32, min: u32, max: u32 },

    #[error("Session already lasts {0} minutes; nothing to adjust")]
    NoOpAdjustment(u32),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("No working schedule for therapist {therapist_id} on {date}")]
    ScheduleNotFound { therapist_id: Uuid, date: NaiveDate },

    #[error("Schedule changed while committing: {0}")]
    CommitConflict(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
