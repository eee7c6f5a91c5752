//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

mod conflicts;
mod forward;
mod profile;
mod service;

// Re-export all domain types
pub use conflicts::detect_conflicts;
pub use forward::{ForwardRequest, ForwardTarget, SessionKey, SessionState};
pub use profile::{merge, PortParseError, Profile, ProfileCollection, ProfileService};
pub use service::ServiceRecord;
