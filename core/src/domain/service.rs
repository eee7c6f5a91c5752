//! Discovered service domain model.

use serde::Serialize;

/// A service as reported by a service lister.
///
/// Ports are kept as the raw tokens the lister returned. They are only parsed
/// into numbers when the service is turned into a [`ProfileService`](super::ProfileService).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceRecord {
    pub context: String,
    pub namespace: String,
    pub name: String,
    pub ports: Vec<String>,
}

impl ServiceRecord {
    /// Create a record for a service in the given context and namespace.
    pub fn new(
        context: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        ports: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            context: context.into(),
            namespace: namespace.into(),
            name: name.into(),
            ports: ports.into_iter().map(Into::into).collect(),
        }
    }

    /// Ports joined with single spaces, in declared order.
    pub fn ports_display(&self) -> String {
        self.ports.join(" ")
    }
}
