//! Profile store port (interface).

use crate::domain::ProfileCollection;
use crate::error::Result;

/// Port for profile persistence.
///
/// Every save replaces the whole document; there are no partial updates.
pub trait ProfileStore: Send + Sync {
    /// Whether a document exists yet.
    fn exists(&self) -> bool;

    /// Human-readable location of the document, for diagnostics.
    fn location(&self) -> String;

    /// Load the document. Fails with `NotFound` when there is none.
    fn load(&self) -> impl std::future::Future<Output = Result<ProfileCollection>> + Send;

    /// Replace the document with `profiles`.
    fn save(
        &self,
        profiles: &ProfileCollection,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
