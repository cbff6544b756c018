use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

use crate::domain::job::{JobRunner, TriggerOutcome};

pub struct JobController {
    runner: Arc<JobRunner>,
}

impl JobController {
    pub fn new(runner: Arc<JobRunner>) -> Self {
        Self { runner }
    }

    /// GET / - liveness plus a short usage hint for the scheduler operator
    pub async fn index(State(controller): State<Arc<JobController>>) -> (StatusCode, String) {
        let state = if controller.runner.is_running() {
            "running"
        } else {
            "idle"
        };
        (
            StatusCode::OK,
            format!(
                "wordaudio backend is alive (job {}). Hit /run to start audio generation.",
                state
            ),
        )
    }

    /// GET /run - start the generation job if idle; never waits for it
    pub async fn run(
        State(controller): State<Arc<JobController>>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        match controller.runner.trigger() {
            TriggerOutcome::Started => (
                StatusCode::OK,
                Json(json!({
                    "status": "started",
                    "message": "audio generation job started"
                })),
            ),
            TriggerOutcome::AlreadyRunning => (
                StatusCode::OK,
                Json(json!({
                    "status": "already_running",
                    "message": "audio generation job already running"
                })),
            ),
        }
    }
}
