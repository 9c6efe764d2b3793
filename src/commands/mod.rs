//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod run;
pub mod upload;
pub mod verify;

// Re-export commonly used entry points
pub use run::{run as run_bot, run_until, shutdown_signal};
pub use upload::run as upload_run;
pub use verify::run as verify_run;
