//! HTTP API for greenroom

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::interview::InterviewService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub interviews: Arc<InterviewService>,
}

impl AppState {
    pub fn new(interviews: InterviewService) -> Self {
        Self {
            interviews: Arc::new(interviews),
        }
    }
}
