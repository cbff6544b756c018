pub mod runner;

pub use runner::{JobRunner, TriggerOutcome};
