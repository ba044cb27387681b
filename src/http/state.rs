use crate::task::Orchestrator;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Task orchestrator (owns the task table)
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}
