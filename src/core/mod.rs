pub mod classifier;
pub mod fallback;
pub mod orchestrator;
pub mod prompt;
pub mod reveal;
pub mod stage;
