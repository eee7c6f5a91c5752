//! Kubernetes module for service discovery, profile storage and port forwarding.
//!
//! This module provides:
//! - Context, namespace and service discovery via kubectl
//! - YAML persistence of the profile collection
//! - Launching `kubectl port-forward` in isolated process groups
//! - Orchestration of the running forwarding sessions

pub mod config_store;
pub mod discovery;
pub mod launcher;
pub mod process_manager;

// Re-export commonly used types
pub use config_store::{YamlProfileStore, DEFAULT_CONFIG_FILE};
pub use discovery::KubectlServiceLister;
pub use launcher::{forward_command, ShellLauncher};
pub use process_manager::{ForwardingOrchestrator, SessionInfo, StartOutcome};
