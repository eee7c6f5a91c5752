//! portfwd Core Library
//!
//! Discovers services in a Kubernetes namespace and forwards them locally.
//! Provides functionality to:
//! - List contexts, namespaces and services through kubectl
//! - Detect ports declared by more than one service
//! - Save discovered services as named profiles and merge them into a YAML store
//! - Run one isolated `kubectl port-forward` process per profile service
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure business logic and data models
//! - `ports`: Trait definitions (interfaces)
//! - `kubernetes`: kubectl, YAML and process implementations of the ports
//! - `application`: Use case services
//!
//! # Platform Support
//! Process-group isolation of forwarding sessions needs a unix platform.
//! Elsewhere sessions are still started and stopped, one process at a time.

// Hexagonal architecture layers
pub mod application;
pub mod domain;
pub mod kubernetes;
pub mod ports;

pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    detect_conflicts, merge, ForwardRequest, ForwardTarget, PortParseError, Profile,
    ProfileCollection, ProfileService, ServiceRecord, SessionKey, SessionState,
};

// Re-export other commonly used types
pub use application::{
    DiscoveryReport, DiscoveryService, InitOutcome, ProfileManager, ResolvedProfile, SavedProfile,
};
pub use error::{Error, Result};
pub use kubernetes::{
    ForwardingOrchestrator, KubectlServiceLister, SessionInfo, ShellLauncher, StartOutcome,
    YamlProfileStore,
};
pub use ports::{ProfileStore, ServiceLister, SessionLauncher};
