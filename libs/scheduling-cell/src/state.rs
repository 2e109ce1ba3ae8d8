// libs/scheduling-cell/src/state.rs
use std::sync::Arc;

use shared_config::AppConfig;

use crate::models::SchedulingRules;
use crate::services::{ScheduleProvider, SessionStore, SupabaseSchedulingStore, TherapistDirectory};

/// Shared handler state: engine tunables plus the storage collaborators.
#[derive(Clone)]
pub struct SchedulingState {
    pub rules: SchedulingRules,
    pub schedules: Arc<dyn ScheduleProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub therapists: Arc<dyn TherapistDirectory>,
}

impl SchedulingState {
    pub fn new(
        rules: SchedulingRules,
        schedules: Arc<dyn ScheduleProvider>,
        sessions: Arc<dyn SessionStore>,
        therapists: Arc<dyn TherapistDirectory>,
    ) -> Self {
        Self {
            rules,
            schedules,
            sessions,
            therapists,
        }
    }

    /// Wires every collaborator to one Supabase-backed store.
    pub fn from_config(config: &AppConfig) -> Self {
        let store = Arc::new(SupabaseSchedulingStore::new(config));
        Self::new(
            SchedulingRules::from_config(config),
            store.clone(),
            store.clone(),
            store,
        )
    }
}
