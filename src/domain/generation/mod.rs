pub mod audio;
pub mod service;
pub mod voices;

pub use service::{GenerationService, PacingConfig, RunSummary, RunTarget, WordOutcome};
