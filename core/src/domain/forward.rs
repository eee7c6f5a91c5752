//! Forwarding request and session state models.

use std::fmt;

use serde::Serialize;

use super::{ProfileService, ServiceRecord};

// ============================================================================
// ForwardRequest
// ============================================================================

/// A service to forward, before coordinates are resolved.
///
/// Built from either a saved [`ProfileService`] or a discovered [`ServiceRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequest {
    pub name: String,
    pub ports: Vec<String>,
    pub context: Option<String>,
    pub namespace: Option<String>,
}

impl ForwardRequest {
    /// Resolve against the caller's defaults; the request's own values win.
    pub fn resolve(&self, default_context: &str, default_namespace: &str) -> ForwardTarget {
        ForwardTarget {
            context: self
                .context
                .clone()
                .unwrap_or_else(|| default_context.to_string()),
            namespace: self
                .namespace
                .clone()
                .unwrap_or_else(|| default_namespace.to_string()),
            name: self.name.clone(),
            ports: self.ports.clone(),
        }
    }
}

impl From<&ProfileService> for ForwardRequest {
    fn from(service: &ProfileService) -> Self {
        Self {
            name: service.name.clone(),
            ports: service.ports.iter().map(u16::to_string).collect(),
            context: service.context_override().map(str::to_string),
            namespace: service.namespace_override().map(str::to_string),
        }
    }
}

impl From<&ServiceRecord> for ForwardRequest {
    fn from(record: &ServiceRecord) -> Self {
        let non_empty = |s: &String| (!s.is_empty()).then(|| s.clone());
        Self {
            name: record.name.clone(),
            ports: record.ports.clone(),
            context: non_empty(&record.context),
            namespace: non_empty(&record.namespace),
        }
    }
}

// ============================================================================
// ForwardTarget
// ============================================================================

/// A fully resolved service to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    pub context: String,
    pub namespace: String,
    pub name: String,
    pub ports: Vec<String>,
}

impl ForwardTarget {
    /// Identity used to track this target's session.
    pub fn key(&self) -> SessionKey {
        SessionKey {
            context: self.context.clone(),
            namespace: self.namespace.clone(),
            service: self.name.clone(),
        }
    }
}

// ============================================================================
// Session identity and state
// ============================================================================

/// Identifies a forwarding session by the service it forwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionKey {
    pub context: String,
    pub namespace: String,
    pub service: String,
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.context, self.namespace, self.service)
    }
}

/// Lifecycle of a forwarding session.
///
/// `Created -> Running -> {Exited | Killed}`, or `Created -> Error` when the
/// process could not be spawned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum SessionState {
    #[default]
    Created,
    Running {
        pid: Option<u32>,
    },
    /// The child ended on its own. `code` is `None` when it died from a signal.
    Exited {
        code: Option<i32>,
    },
    Killed,
    Error {
        message: String,
    },
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running { .. } => "running",
            Self::Exited { .. } => "exited",
            Self::Killed => "killed",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited { .. } | Self::Killed | Self::Error { .. })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { pid: Some(pid) } => write!(f, "running (pid {})", pid),
            Self::Exited { code: Some(code) } => write!(f, "exited with code {}", code),
            Self::Exited { code: None } => write!(f, "exited by signal"),
            Self::Error { message } => write!(f, "error: {}", message),
            other => f.write_str(other.as_str()),
        }
    }
}
