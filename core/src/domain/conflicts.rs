//! Port conflict detection over discovered services.

use std::collections::{BTreeSet, HashSet};

use super::ServiceRecord;

/// Returns every port token declared more than once across `services`.
///
/// A repeat counts no matter which service declares it, including the same
/// service listing a port twice. The result is sorted as strings, not numbers.
pub fn detect_conflicts(services: &[ServiceRecord]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicated: BTreeSet<&str> = BTreeSet::new();

    for port in services.iter().flat_map(|svc| svc.ports.iter()) {
        if !seen.insert(port.as_str()) {
            duplicated.insert(port.as_str());
        }
    }

    duplicated.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(name: &str, ports: &[&str]) -> ServiceRecord {
        ServiceRecord::new("ctx", "ns", name, ports.iter().copied())
    }

    #[test]
    fn test_empty_input() {
        assert!(detect_conflicts(&[]).is_empty());
    }

    #[test]
    fn test_no_conflicts() {
        let services = vec![svc("a", &["80", "443"]), svc("b", &["22"]), svc("c", &[])];
        assert!(detect_conflicts(&services).is_empty());
    }

    #[test]
    fn test_conflict_across_services() {
        let services = vec![svc("a", &["80", "443"]), svc("b", &["443", "22"])];
        assert_eq!(detect_conflicts(&services), vec!["443"]);
    }

    #[test]
    fn test_self_duplication_counts() {
        let services = vec![svc("a", &["80", "80"])];
        assert_eq!(detect_conflicts(&services), vec!["80"]);
    }

    #[test]
    fn test_reported_once_and_sorted_as_strings() {
        let services = vec![
            svc("a", &["80", "8", "9000"]),
            svc("b", &["9000", "80"]),
            svc("c", &["8", "80", "9000"]),
        ];
        // "8" < "80" < "9000" lexicographically; each port appears once.
        assert_eq!(detect_conflicts(&services), vec!["8", "80", "9000"]);

        let services = vec![svc("a", &["10", "9"]), svc("b", &["9", "10"])];
        assert_eq!(detect_conflicts(&services), vec!["10", "9"]);
    }

    #[test]
    fn test_non_numeric_tokens() {
        let services = vec![svc("a", &["http", "<none>"]), svc("b", &["http"])];
        assert_eq!(detect_conflicts(&services), vec!["http"]);
    }
}
