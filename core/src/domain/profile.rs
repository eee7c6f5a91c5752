//! Profile domain models and merge rules.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ServiceRecord;
use crate::error::{Error, Result};

// ============================================================================
// PortParseError
// ============================================================================

/// A discovered port token that is not a valid port number.
///
/// Not fatal: the token is dropped and the rest of the service is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("skipping port {token:?} of service {service}: {reason}")]
pub struct PortParseError {
    pub service: String,
    pub token: String,
    pub reason: String,
}

// ============================================================================
// ProfileService
// ============================================================================

/// A service entry inside a saved profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileService {
    pub name: String,
    /// Ports in declared order, without duplicates.
    #[serde(default)]
    pub ports: Vec<u16>,
    /// Context override; empty means "use the profile's".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    /// Namespace override; empty means "use the profile's".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ProfileService {
    /// Create a service entry without coordinate overrides.
    pub fn new(name: impl Into<String>, ports: impl IntoIterator<Item = u16>) -> Self {
        let mut service = Self {
            name: name.into(),
            ..Self::default()
        };
        for port in ports {
            service.add_port(port);
        }
        service
    }

    /// Convert a discovered record, parsing its port tokens.
    ///
    /// Tokens that do not parse as a port are returned as errors; the
    /// service keeps every port that did parse.
    pub fn from_record(record: &ServiceRecord) -> (Self, Vec<PortParseError>) {
        let mut service = Self {
            name: record.name.clone(),
            ports: Vec::with_capacity(record.ports.len()),
            context: record.context.clone(),
            namespace: record.namespace.clone(),
        };
        let mut skipped = Vec::new();

        for token in &record.ports {
            match token.trim().parse::<u16>() {
                Ok(port) => service.add_port(port),
                Err(e) => skipped.push(PortParseError {
                    service: record.name.clone(),
                    token: token.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        (service, skipped)
    }

    /// Context override, if any.
    pub fn context_override(&self) -> Option<&str> {
        non_empty(&self.context)
    }

    /// Namespace override, if any.
    pub fn namespace_override(&self) -> Option<&str> {
        non_empty(&self.namespace)
    }

    fn add_port(&mut self, port: u16) {
        if !self.ports.contains(&port) {
            self.ports.push(port);
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

/// A named bundle of services plus the coordinates needed to reach them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default)]
    pub services: Vec<ProfileService>,
}

impl Profile {
    /// Create an empty profile.
    pub fn new(
        name: impl Into<String>,
        context: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            context: context.into(),
            namespace: namespace.into(),
            services: Vec::new(),
        }
    }

    /// Add a service (builder style).
    pub fn with_service(mut self, service: ProfileService) -> Self {
        self.services.push(service);
        self
    }

    /// Build a profile from discovered services.
    ///
    /// Returns the profile together with every port token that had to be skipped.
    pub fn from_discovery(
        name: impl Into<String>,
        context: impl Into<String>,
        namespace: impl Into<String>,
        records: &[ServiceRecord],
    ) -> (Self, Vec<PortParseError>) {
        let mut profile = Self::new(name, context, namespace);
        let mut skipped = Vec::new();

        for record in records {
            let (service, errors) = ProfileService::from_record(record);
            for error in &errors {
                tracing::warn!(service = %error.service, token = %error.token, "{}", error.reason);
            }
            profile.services.push(service);
            skipped.extend(errors);
        }

        (profile, skipped)
    }
}

// ============================================================================
// ProfileCollection
// ============================================================================

/// The full persisted document: global defaults plus every saved profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileCollection {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(
        rename = "default-profile",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub default_profile: String,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl ProfileCollection {
    /// A collection holding a single profile that is also the default.
    pub fn with_default(profile: Profile) -> Self {
        Self {
            default_profile: profile.name.clone(),
            profiles: vec![profile],
            ..Self::default()
        }
    }

    /// Starter document written by `profiles --init`.
    pub fn sample(context: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            namespace: namespace.into(),
            default_profile: String::new(),
            profiles: vec![Profile::new("example", "", "default")
                .with_service(ProfileService::new("web", [8080]))
                .with_service(ProfileService::new("postgres", [5432]))],
        }
    }

    /// Finds the first profile with the given name.
    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Resolves the profile to run: the given name, else the default profile.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Profile> {
        let target = match name.and_then(non_empty) {
            Some(name) => name,
            None => non_empty(&self.default_profile).ok_or(Error::NoDefaultProfile)?,
        };

        self.find(target)
            .ok_or_else(|| Error::ProfileNotFound(target.to_string()))
    }

    /// Profile names that appear more than once.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for profile in &self.profiles {
            let name = profile.name.as_str();
            if !seen.insert(name) && !duplicates.contains(&name) {
                duplicates.push(name);
            }
        }
        duplicates
    }

    /// Folds `incoming` into this collection; see [`merge`].
    pub fn merge(&self, incoming: &ProfileCollection) -> ProfileCollection {
        merge(self, incoming)
    }
}

/// Merges a freshly built collection into a persisted one.
///
/// Global fields of `existing` win when non-empty. Profiles are appended, not
/// upserted by name: merging the same incoming collection twice leaves two
/// copies of each of its profiles.
pub fn merge(existing: &ProfileCollection, incoming: &ProfileCollection) -> ProfileCollection {
    let pick = |own: &String, other: &String| {
        if own.is_empty() {
            other.clone()
        } else {
            own.clone()
        }
    };

    let merged = ProfileCollection {
        context: pick(&existing.context, &incoming.context),
        namespace: pick(&existing.namespace, &incoming.namespace),
        default_profile: pick(&existing.default_profile, &incoming.default_profile),
        profiles: existing
            .profiles
            .iter()
            .chain(incoming.profiles.iter())
            .cloned()
            .collect(),
    };

    for name in merged.duplicate_names() {
        tracing::warn!(profile = name, "profile name now appears more than once");
    }

    merged
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(context: &str, namespace: &str, default: &str, names: &[&str]) -> ProfileCollection {
        ProfileCollection {
            context: context.to_string(),
            namespace: namespace.to_string(),
            default_profile: default.to_string(),
            profiles: names.iter().map(|n| Profile::new(*n, "", "")).collect(),
        }
    }

    #[test]
    fn test_from_record_skips_invalid_ports() {
        let record = ServiceRecord::new("kind", "default", "api", ["8080", "http", "70000", "9090"]);
        let (service, skipped) = ProfileService::from_record(&record);

        assert_eq!(service.name, "api");
        assert_eq!(service.ports, vec![8080, 9090]);
        assert_eq!(service.context, "kind");
        assert_eq!(service.namespace, "default");

        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].token, "http");
        assert_eq!(skipped[1].token, "70000");
        assert!(skipped.iter().all(|e| e.service == "api"));
    }

    #[test]
    fn test_from_record_dedupes_keeping_order() {
        let record = ServiceRecord::new("", "", "api", ["443", "80", "443"]);
        let (service, skipped) = ProfileService::from_record(&record);
        assert_eq!(service.ports, vec![443, 80]);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_from_discovery_keeps_services_with_no_valid_ports() {
        let records = vec![
            ServiceRecord::new("kind", "default", "web", ["80"]),
            ServiceRecord::new("kind", "default", "weird", ["<none>"]),
        ];
        let (profile, skipped) = Profile::from_discovery("dev", "kind", "default", &records);

        assert_eq!(profile.name, "dev");
        assert_eq!(profile.services.len(), 2);
        assert!(profile.services[1].ports.is_empty());
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_merge_appends_profiles() {
        let existing = collection("", "", "", &["a", "b"]);
        let incoming = collection("", "", "", &["c"]);
        let merged = merge(&existing, &incoming);

        let names: Vec<_> = merged.profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_is_not_idempotent() {
        let existing = collection("ctx", "ns", "a", &["a", "b"]);
        let incoming = collection("", "", "c", &["c", "d"]);

        let twice = merge(&merge(&existing, &incoming), &incoming);
        assert_eq!(
            twice.profiles.len(),
            existing.profiles.len() + 2 * incoming.profiles.len()
        );
        assert_eq!(twice.duplicate_names(), vec!["c", "d"]);
    }

    #[test]
    fn test_merge_existing_globals_win() {
        let existing = collection("prod", "payments", "main", &[]);
        let incoming = collection("staging", "orders", "other", &[]);
        let merged = merge(&existing, &incoming);

        assert_eq!(merged.context, "prod");
        assert_eq!(merged.namespace, "payments");
        assert_eq!(merged.default_profile, "main");
    }

    #[test]
    fn test_merge_adopts_incoming_when_existing_empty() {
        let existing = collection("", "payments", "", &[]);
        let incoming = collection("staging", "orders", "new-one", &["new-one"]);
        let merged = existing.merge(&incoming);

        assert_eq!(merged.context, "staging");
        assert_eq!(merged.namespace, "payments");
        assert_eq!(merged.default_profile, "new-one");
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let existing = collection("prod", "", "", &["a"]);
        let incoming = collection("", "ns", "b", &["b"]);
        let (e, i) = (existing.clone(), incoming.clone());

        let _ = merge(&existing, &incoming);
        assert_eq!(existing, e);
        assert_eq!(incoming, i);
    }

    #[test]
    fn test_resolve_profile() {
        let profiles = collection("", "", "b", &["a", "b"]);

        assert_eq!(profiles.resolve(Some("a")).unwrap().name, "a");
        assert_eq!(profiles.resolve(None).unwrap().name, "b");
        assert_eq!(profiles.resolve(Some("")).unwrap().name, "b");
        assert!(matches!(
            profiles.resolve(Some("zzz")),
            Err(Error::ProfileNotFound(name)) if name == "zzz"
        ));

        let no_default = collection("", "", "", &["a"]);
        assert!(matches!(no_default.resolve(None), Err(Error::NoDefaultProfile)));

        let dangling = collection("", "", "gone", &["a"]);
        assert!(matches!(dangling.resolve(None), Err(Error::ProfileNotFound(_))));
    }

    #[test]
    fn test_resolve_takes_first_duplicate() {
        let mut profiles = collection("", "", "", &[]);
        profiles.profiles.push(Profile::new("dup", "first", ""));
        profiles.profiles.push(Profile::new("dup", "second", ""));

        assert_eq!(profiles.resolve(Some("dup")).unwrap().context, "first");
    }

    #[test]
    fn test_yaml_omits_empty_fields() {
        let profiles = ProfileCollection::with_default(
            Profile::new("dev", "", "default").with_service(ProfileService::new("web", [80, 443])),
        );
        let yaml = serde_yaml::to_string(&profiles).unwrap();

        assert!(yaml.contains("default-profile: dev"));
        assert!(yaml.contains("namespace: default"));
        assert!(!yaml.contains("context"));
        assert!(!yaml.contains("null"));

        let back: ProfileCollection = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, profiles);
    }

    #[test]
    fn test_yaml_reads_hand_written_document() {
        let yaml = r#"
context: kind-dev
namespace: default
default-profile: backend
profiles:
  - name: backend
    namespace: apps
    services:
      - name: api
        ports: [8080, 9090]
        context: other
      - name: db
        ports:
          - 5432
"#;
        let profiles: ProfileCollection = serde_yaml::from_str(yaml).unwrap();
        let backend = profiles.resolve(None).unwrap();

        assert_eq!(profiles.context, "kind-dev");
        assert_eq!(backend.namespace, "apps");
        assert_eq!(backend.services[0].context_override(), Some("other"));
        assert_eq!(backend.services[0].namespace_override(), None);
        assert_eq!(backend.services[1].ports, vec![5432]);
    }
}
