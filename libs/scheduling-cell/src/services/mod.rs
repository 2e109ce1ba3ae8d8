pub mod availability;
pub mod optimizer;
pub mod resolver;
pub mod adjuster;
pub mod assignment;
pub mod schedule;
pub mod store;
pub mod supabase;

pub use availability::{detect_conflicts, AvailabilityChecker};
pub use optimizer::TimeSlotOptimizer;
pub use resolver::ConflictResolver;
pub use adjuster::SessionTimingAdjuster;
pub use assignment::TherapistAssignmentScorer;
pub use schedule::resolve_effective_schedule;
pub use store::{ScheduleProvider, SessionStore, TherapistDirectory};
pub use supabase::SupabaseSchedulingStore;
