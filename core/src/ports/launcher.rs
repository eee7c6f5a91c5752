//! Session launcher port (interface).

use tokio::process::Child;

use crate::domain::ForwardTarget;

/// Port for starting one forwarding child process.
///
/// Implementations must put the child in its own process group so that the
/// orchestrator alone decides when it is terminated.
pub trait SessionLauncher: Send + Sync {
    /// The command line that forwards `target`, for display and logging.
    fn command_line(&self, target: &ForwardTarget) -> String;

    /// Spawn the forwarding process for `target`.
    fn spawn(&self, target: &ForwardTarget) -> std::io::Result<Child>;
}
