pub mod commands;
pub mod orchestrator;
mod types;

pub use orchestrator::{DONE_BANNER, Plan, START_BANNER, plan, run_extraction};
pub use types::{ExtractInput, ExtractReport, RunStatus};
