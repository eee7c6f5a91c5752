//! Service discovery application service.

use serde::Serialize;

use crate::domain::{detect_conflicts, ServiceRecord};
use crate::error::Result;
use crate::ports::ServiceLister;

/// Services found in one context/namespace and the ports they clash on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub context: String,
    pub namespace: String,
    pub services: Vec<ServiceRecord>,
    pub conflicts: Vec<String>,
}

impl DiscoveryReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Application service for discovery operations.
///
/// Uses the `ServiceLister` trait for enumeration, so a fake lister can be
/// injected in tests.
pub struct DiscoveryService<L: ServiceLister> {
    lister: L,
}

impl<L: ServiceLister> DiscoveryService<L> {
    /// Create a new discovery service with the given lister.
    pub fn new(lister: L) -> Self {
        Self { lister }
    }

    /// List the services of a namespace and check them for port conflicts.
    ///
    /// Lister failures are returned as-is; nothing is retried.
    pub async fn discover(&self, context: &str, namespace: &str) -> Result<DiscoveryReport> {
        let services = self.lister.list_services(context, namespace).await?;
        let conflicts = detect_conflicts(&services);

        tracing::debug!(
            context,
            namespace,
            services = services.len(),
            conflicts = conflicts.len(),
            "discovery finished"
        );

        Ok(DiscoveryReport {
            context: context.to_string(),
            namespace: namespace.to_string(),
            services,
            conflicts,
        })
    }

    /// List the available contexts.
    pub async fn contexts(&self) -> Result<Vec<String>> {
        self.lister.list_contexts().await
    }

    /// List the namespaces of a context.
    pub async fn namespaces(&self, context: &str) -> Result<Vec<String>> {
        self.lister.list_namespaces(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Mock lister for testing.
    struct MockLister {
        services: Vec<(&'static str, Vec<&'static str>)>,
        fail: bool,
    }

    impl ServiceLister for MockLister {
        async fn list_services(&self, context: &str, namespace: &str) -> Result<Vec<ServiceRecord>> {
            if self.fail {
                return Err(Error::List {
                    context: context.to_string(),
                    namespace: namespace.to_string(),
                    reason: "Unable to connect to the server".to_string(),
                });
            }
            Ok(self
                .services
                .iter()
                .map(|(name, ports)| ServiceRecord::new(context, namespace, *name, ports.clone()))
                .collect())
        }

        async fn list_contexts(&self) -> Result<Vec<String>> {
            Ok(vec!["kind-dev".to_string(), "prod".to_string()])
        }

        async fn list_namespaces(&self, _context: &str) -> Result<Vec<String>> {
            Ok(vec!["default".to_string()])
        }
    }

    #[tokio::test]
    async fn test_discover_reports_conflicts() {
        let service = DiscoveryService::new(MockLister {
            services: vec![("a", vec!["80", "443"]), ("b", vec!["443", "22"])],
            fail: false,
        });

        let report = service.discover("kind-dev", "apps").await.unwrap();
        assert_eq!(report.services.len(), 2);
        assert_eq!(report.services[0].context, "kind-dev");
        assert_eq!(report.conflicts, vec!["443"]);
        assert!(report.has_conflicts());
    }

    #[tokio::test]
    async fn test_discover_without_conflicts() {
        let service = DiscoveryService::new(MockLister {
            services: vec![("a", vec!["80"]), ("b", vec![])],
            fail: false,
        });

        let report = service.discover("", "").await.unwrap();
        assert!(!report.has_conflicts());
    }

    #[tokio::test]
    async fn test_discover_propagates_list_error() {
        let service = DiscoveryService::new(MockLister {
            services: vec![],
            fail: true,
        });

        let result = service.discover("prod", "payments").await;
        assert!(matches!(result, Err(Error::List { .. })));
    }

    #[test]
    fn test_contexts_and_namespaces() {
        let service = DiscoveryService::new(MockLister {
            services: vec![],
            fail: false,
        });

        let contexts = tokio_test::block_on(service.contexts()).unwrap();
        assert_eq!(contexts.len(), 2);
        let namespaces = tokio_test::block_on(service.namespaces("prod")).unwrap();
        assert_eq!(namespaces, vec!["default"]);
    }
}
