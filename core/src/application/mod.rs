//! Application layer - Use case services.
//!
//! This module contains application services that orchestrate
//! domain logic and adapter interactions.
//!
//! Services are designed to be thin orchestrators that:
//! - Accept domain types as inputs
//! - Use ports (traits) for external dependencies
//! - Return domain types as outputs

mod discovery_service;
mod profile_manager;

pub use discovery_service::{DiscoveryReport, DiscoveryService};
pub use profile_manager::{InitOutcome, ProfileManager, ResolvedProfile, SavedProfile};
