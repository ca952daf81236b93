// Container runtime plumbing: availability check, process spawning, streamed output, cancellation.

pub mod engine;
pub mod run;
pub mod types;

pub use engine::{ensure_available, parse_runtime, user_args};
pub use run::spawn;
pub use types::{CancelToken, ContainerCommand, ContainerResult, Mount, OutputLine};
