use std::sync::Arc;

use crate::config::Settings;
use crate::services::SummaryController;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub controller: Arc<SummaryController>,
}

impl AppState {
    pub fn new(settings: Settings, controller: SummaryController) -> Self {
        Self {
            settings: Arc::new(settings),
            controller: Arc::new(controller),
        }
    }
}
