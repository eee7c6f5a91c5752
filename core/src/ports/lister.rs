//! Service lister port (interface).

use crate::domain::ServiceRecord;
use crate::error::Result;

/// Port for enumerating cluster contexts, namespaces and services.
///
/// Implementations surface enumeration failures as [`Error::List`](crate::Error::List)
/// and never retry on their own.
pub trait ServiceLister: Send + Sync {
    /// List the services of a namespace. Empty arguments mean "the current one".
    fn list_services(
        &self,
        context: &str,
        namespace: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ServiceRecord>>> + Send;

    /// List the available contexts.
    fn list_contexts(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// List the namespaces of a context.
    fn list_namespaces(
        &self,
        context: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}
