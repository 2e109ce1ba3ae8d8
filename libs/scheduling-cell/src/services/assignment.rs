// libs/scheduling-cell/src/services/assignment.rs
use tracing::{debug, info, instrument};

use crate::models::{
    AssignmentDecision, AssignmentRequest, Conflict, SchedulingError, SchedulingRules,
    TherapistCandidate, TherapistScore, TimeRange,
};
use crate::services::availability::detect_conflicts;

const SPECIALTY_WEIGHT: f64 = 0.4;
const AVAILABILITY_WEIGHT: f64 = 0.3;
const WORKLOAD_WEIGHT: f64 = 0.2;
const RATING_WEIGHT: f64 = 0.1;

const NEUTRAL_RATING_SCORE: f64 = 50.0;
const MAX_RATING: f64 = 5.0;

pub const NO_MATCH_STRATEGY: &str = "No suitable therapist found";

/// Weighted multi-criteria ranking of candidate therapists for one request.
#[derive(Debug, Clone, Default)]
pub struct TherapistAssignmentScorer {
    rules: SchedulingRules,
}

impl TherapistAssignmentScorer {
    pub fn new(rules: SchedulingRules) -> Self {
        Self { rules }
    }

    #[instrument(skip(self, candidates, request), fields(date = %request.date, candidates = candidates.len()))]
    pub fn score_candidates(
        &self,
        candidates: &[TherapistCandidate],
        request: &AssignmentRequest,
    ) -> Result<AssignmentDecision, SchedulingError> {
        if let Some(duration) = request.duration_minutes {
            self.rules.validate_duration(duration)?;
        }

        let mut scores = candidates
            .iter()
            .map(|candidate| self.score_candidate(candidate, request))
            .collect::<Result<Vec<_>, _>>()?;

        scores.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.available.cmp(&a.available))
                .then_with(|| a.therapist_id.cmp(&b.therapist_id))
        });

        let threshold = self.rules.assignment_threshold;
        let assigned_index = scores
            .iter()
            .position(|score| score.available && score.score >= threshold);
        let assigned = assigned_index.map(|index| scores.remove(index));

        let strategy = match &assigned {
            Some(score) => strategy_label(score.score).to_string(),
            None => NO_MATCH_STRATEGY.to_string(),
        };

        match &assigned {
            Some(score) => info!(
                therapist_id = %score.therapist_id,
                score = score.score,
                alternatives = scores.len(),
                "Therapist assigned: {}", strategy
            ),
            None => info!(alternatives = scores.len(), "No therapist cleared the {} threshold", threshold),
        }

        Ok(AssignmentDecision {
            assigned,
            alternatives: scores,
            strategy,
        })
    }

    fn score_candidate(
        &self,
        candidate: &TherapistCandidate,
        request: &AssignmentRequest,
    ) -> Result<TherapistScore, SchedulingError> {
        let therapist = &candidate.therapist;
        let mut reasons = Vec::new();

        let specialty_score = if request.required_specialties.is_empty() {
            100.0
        } else {
            let matched: Vec<&String> = request
                .required_specialties
                .iter()
                .filter(|specialty| therapist.has_specialty(specialty))
                .collect();
            let missing: Vec<&String> = request
                .required_specialties
                .iter()
                .filter(|specialty| !therapist.has_specialty(specialty))
                .collect();

            if !matched.is_empty() {
                reasons.push(format!(
                    "Specializes in {} ({}/{} required)",
                    join(&matched),
                    matched.len(),
                    request.required_specialties.len()
                ));
            }
            if !missing.is_empty() {
                reasons.push(format!("Missing specialties: {}", join(&missing)));
            }
            100.0 * matched.len() as f64 / request.required_specialties.len() as f64
        };

        let available = self.is_available(candidate, request, &mut reasons)?;
        let availability_score = if available { 100.0 } else { 0.0 };

        let workload_score = if therapist.max_workload == 0 {
            0.0
        } else {
            let load = therapist.current_workload.min(therapist.max_workload) as f64;
            100.0 * (1.0 - load / therapist.max_workload as f64)
        };
        reasons.push(format!(
            "Workload {}/{} ({:.0}% headroom)",
            therapist.current_workload, therapist.max_workload, workload_score
        ));

        let rating_score = match therapist.rating {
            Some(rating) => {
                if rating >= 4.0 {
                    reasons.push(format!("Highly rated ({:.1}/5.0)", rating));
                }
                (f64::from(rating) / MAX_RATING).clamp(0.0, 1.0) * 100.0
            }
            None => {
                reasons.push("No rating yet (neutral)".to_string());
                NEUTRAL_RATING_SCORE
            }
        };

        if let Some(years) = therapist.years_experience {
            if years >= 5 {
                reasons.push(format!("{} years of experience", years));
            }
        }

        let score = (SPECIALTY_WEIGHT * specialty_score
            + AVAILABILITY_WEIGHT * availability_score
            + WORKLOAD_WEIGHT * workload_score
            + RATING_WEIGHT * rating_score)
            .clamp(0.0, 100.0);

        debug!(
            "{} ({}) scored {:.1} (specialty {:.0}, availability {:.0}, workload {:.0}, rating {:.0})",
            therapist.full_name(), therapist.id, score, specialty_score, availability_score, workload_score, rating_score
        );

        Ok(TherapistScore {
            therapist_id: therapist.id,
            score,
            reasons,
            available,
            current_workload: therapist.current_workload,
            max_workload: therapist.max_workload,
        })
    }

    fn is_available(
        &self,
        candidate: &TherapistCandidate,
        request: &AssignmentRequest,
        reasons: &mut Vec<String>,
    ) -> Result<bool, SchedulingError> {
        if !candidate.therapist.is_active {
            reasons.push("Therapist is not accepting sessions".to_string());
            return Ok(false);
        }

        let Some(schedule) = candidate
            .schedule
            .as_ref()
            .filter(|schedule| schedule.is_effective_on(request.date))
        else {
            reasons.push(format!("Not working on {}", request.date));
            return Ok(false);
        };
        schedule.validate()?;

        let duration = request.duration_minutes.unwrap_or(schedule.default_duration);
        let Ok(slot) = TimeRange::starting_at(request.preferred_time, duration) else {
            reasons.push(format!(
                "A {}-minute session at {} runs past midnight",
                duration, request.preferred_time
            ));
            return Ok(false);
        };

        let blocking: Option<Conflict> = detect_conflicts(schedule, &candidate.booked, slot, None)
            .into_iter()
            .find(Conflict::is_error);

        match blocking {
            None => {
                reasons.push(format!("Available at {} on {}", slot, request.date));
                Ok(true)
            }
            Some(conflict) => {
                reasons.push(format!("Unavailable: {}", conflict.message));
                Ok(false)
            }
        }
    }
}

/// Band label for an assigned score.
pub fn strategy_label(score: f64) -> &'static str {
    if score >= 85.0 {
        "Optimal match"
    } else if score >= 70.0 {
        "Good match"
    } else if score >= 60.0 {
        "Acceptable match"
    } else {
        "Suboptimal — limited availability"
    }
}

fn join(values: &[&String]) -> String {
    values.iter().map(|value| value.as_str()).collect::<Vec<_>>().join(", ")
}
