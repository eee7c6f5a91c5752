//! Shell launcher for `kubectl port-forward` sessions.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::domain::ForwardTarget;
use crate::ports::SessionLauncher;

/// Builds the port-forward command line for a target.
///
/// Ports are space-joined in declared order. With no ports the line still
/// ends with the separating space, which downstream scripts rely on.
pub fn forward_command(kubectl: &str, target: &ForwardTarget) -> String {
    format!(
        "{} --context {} -n {} port-forward service/{} {}",
        kubectl,
        target.context,
        target.namespace,
        target.name,
        target.ports.join(" ")
    )
}

/// Runs each forwarding command through `bash -c` in its own process group.
///
/// Stdout and stderr are inherited so the forwarders' output is visible live.
pub struct ShellLauncher {
    shell: PathBuf,
    kubectl: String,
}

impl ShellLauncher {
    /// Creates a launcher using `bash` and the `kubectl` found on `PATH`.
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from("bash"),
            kubectl: "kubectl".to_string(),
        }
    }

    /// Creates a launcher with a custom kubectl path.
    pub fn with_kubectl(kubectl: impl Into<String>) -> Self {
        Self {
            kubectl: kubectl.into(),
            ..Self::new()
        }
    }

    /// Use a different shell (must accept `-c <command>`).
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLauncher for ShellLauncher {
    fn command_line(&self, target: &ForwardTarget) -> String {
        forward_command(&self.kubectl, target)
    }

    fn spawn(&self, target: &ForwardTarget) -> std::io::Result<Child> {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(self.command_line(target))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // New process group: an interrupt aimed at us must not reach the forwarders.
        #[cfg(unix)]
        command.process_group(0);

        command.spawn()
    }
}
