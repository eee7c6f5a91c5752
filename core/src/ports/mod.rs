//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with external systems. Implementations live in `kubernetes`.

mod launcher;
mod lister;
mod store;

pub use launcher::SessionLauncher;
pub use lister::ServiceLister;
pub use store::ProfileStore;
