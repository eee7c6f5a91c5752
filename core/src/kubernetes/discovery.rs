//! Kubernetes discovery using kubectl commands.

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::domain::ServiceRecord;
use crate::error::{Error, Result};
use crate::ports::ServiceLister;

/// Default paths to search for kubectl.
const KUBECTL_PATHS: &[&str] = &[
    "/opt/homebrew/bin/kubectl", // Apple Silicon
    "/usr/local/bin/kubectl",    // Intel Mac / Homebrew
    "/usr/bin/kubectl",          // System
];

/// Timeout for kubectl discovery commands.
const KUBECTL_TIMEOUT: Duration = Duration::from_secs(15);

/// Placeholder kubectl prints for a service without ports.
const NO_PORTS: &str = "<none>";

/// Lists contexts, namespaces and services through kubectl.
pub struct KubectlServiceLister {
    kubectl_path: Option<PathBuf>,
    timeout: Duration,
}

impl KubectlServiceLister {
    /// Creates a new lister, searching for kubectl.
    pub fn new() -> Self {
        Self::with_path(find_kubectl())
    }

    /// Creates a new lister with a custom kubectl path.
    pub fn with_path(kubectl_path: Option<PathBuf>) -> Self {
        Self {
            kubectl_path,
            timeout: KUBECTL_TIMEOUT,
        }
    }

    /// Overrides the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the kubectl path if found.
    pub fn kubectl_path(&self) -> Option<&PathBuf> {
        self.kubectl_path.as_ref()
    }

    /// Returns true if kubectl is available.
    pub fn is_kubectl_available(&self) -> bool {
        self.kubectl_path.is_some()
    }

    /// Executes a kubectl command and returns its non-blank output lines.
    ///
    /// Every failure, including a missing kubectl and a timeout, is an
    /// [`Error::List`] naming the context and namespace from `args`.
    async fn execute_kubectl(&self, args: &[String]) -> Result<Vec<String>> {
        let kubectl_path = self
            .kubectl_path
            .as_ref()
            .ok_or_else(|| list_error(args, "kubectl not found in PATH or well-known locations"))?;
        tracing::debug!(kubectl = %kubectl_path.display(), ?args, "running kubectl");

        let result = timeout(self.timeout, async {
            // A timed-out kubectl is killed when this future is dropped.
            let output = Command::new(kubectl_path)
                .args(args)
                .kill_on_drop(true)
                .output()
                .await?;

            Ok::<_, std::io::Error>((output.status, output.stdout, output.stderr))
        })
        .await;

        match result {
            Ok(Ok((status, stdout, stderr))) => {
                if status.success() {
                    Ok(split_lines(&String::from_utf8_lossy(&stdout)))
                } else {
                    let stderr_str = String::from_utf8_lossy(&stderr);
                    Err(list_error(args, stderr_str.trim()))
                }
            }
            Ok(Err(e)) => Err(list_error(args, &e.to_string())),
            Err(_) => Err(list_error(
                args,
                &format!("kubectl timed out after {:?}", self.timeout),
            )),
        }
    }
}

impl Default for KubectlServiceLister {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceLister for KubectlServiceLister {
    async fn list_services(&self, context: &str, namespace: &str) -> Result<Vec<ServiceRecord>> {
        let mut args = target_args(context, namespace);
        args.extend(
            [
                "get",
                "svc",
                "--no-headers",
                "-o",
                "custom-columns=:metadata.name,:spec.ports[*].port",
            ]
            .map(String::from),
        );

        let lines = self.execute_kubectl(&args).await?;

        Ok(parse_services(&lines, context, namespace))
    }

    async fn list_contexts(&self) -> Result<Vec<String>> {
        let args = ["config", "get-contexts", "--output=name"].map(String::from);
        self.execute_kubectl(&args).await
    }

    async fn list_namespaces(&self, context: &str) -> Result<Vec<String>> {
        let mut args = target_args(context, "");
        args.extend(
            [
                "get",
                "ns",
                "--no-headers",
                "-o",
                "custom-columns=:metadata.name",
            ]
            .map(String::from),
        );
        self.execute_kubectl(&args).await
    }
}

/// `--context`/`-n` arguments, omitting the empty ones.
fn target_args(context: &str, namespace: &str) -> Vec<String> {
    let mut args = Vec::new();
    if !context.is_empty() {
        args.extend(["--context".to_string(), context.to_string()]);
    }
    if !namespace.is_empty() {
        args.extend(["-n".to_string(), namespace.to_string()]);
    }
    args
}

/// Parses `name port,port` lines from the custom-columns service listing.
fn parse_services(lines: &[String], context: &str, namespace: &str) -> Vec<ServiceRecord> {
    lines
        .iter()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let ports: Vec<&str> = match fields.next() {
                Some(NO_PORTS) | None => Vec::new(),
                Some(ports) => ports.split(',').filter(|p| !p.is_empty()).collect(),
            };
            Some(ServiceRecord::new(context, namespace, name, ports))
        })
        .collect()
}

fn split_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn list_error(args: &[String], reason: &str) -> Error {
    let arg_value = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_default()
    };
    Error::List {
        context: arg_value("--context"),
        namespace: arg_value("-n"),
        reason: reason.to_string(),
    }
}

/// Finds kubectl in the well-known locations, then in `PATH`.
fn find_kubectl() -> Option<PathBuf> {
    find_executable(KUBECTL_PATHS).or_else(|| {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join("kubectl"))
            .find(|candidate| candidate.is_file())
    })
}

/// Finds an executable in the given paths.
fn find_executable(paths: &[&str]) -> Option<PathBuf> {
    paths.iter().map(PathBuf::from).find(|path| path.exists())
}
