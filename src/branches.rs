//! Pairing of `testing/<version>` branches with their stable counterparts.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Prefixes a stable branch may carry, in the order they are tried.
const STABLE_CONVENTIONS: [&str; 2] = ["release", "stable"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRole {
    Testing,
    Stable,
    Other,
}

/// Classifies a branch by name alone. This is the coarse substring filter;
/// pairing additionally requires the literal `testing/` prefix.
pub fn classify(name: &str) -> BranchRole {
    if name.contains("testing") {
        BranchRole::Testing
    } else if name.contains("release") || name.contains("stable") {
        BranchRole::Stable
    } else {
        BranchRole::Other
    }
}

fn testing_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^testing/(.*)$").expect("static regex"))
}

/// Returns the `<version>` of a `testing/<version>` branch.
pub fn testing_version(name: &str) -> Option<&str> {
    testing_pattern()
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Maps each stable branch to the testing branch sharing its version.
///
/// Only names from `branches` appear in the result. When several testing
/// branches resolve to the same stable branch, the last one in input order
/// wins. A testing branch with both `release/<v>` and `stable/<v>`
/// counterparts yields two pairs.
pub fn pair_branches<S: AsRef<str>>(branches: &[S]) -> BTreeMap<String, String> {
    let mut testing = Vec::new();
    let mut stable = Vec::new();
    for branch in branches.iter().map(AsRef::as_ref) {
        // A name like "release-testing" lands in both sets, as with the
        // substring filter it is classified by.
        if branch.contains("testing") {
            testing.push(branch);
        }
        if branch.contains("release") || branch.contains("stable") {
            stable.push(branch);
        }
    }

    let mut pairs = BTreeMap::new();
    for branch in testing {
        let Some(version) = testing_version(branch) else {
            continue;
        };
        for convention in STABLE_CONVENTIONS {
            let candidate = format!("{}/{}", convention, version);
            if stable.contains(&candidate.as_str()) {
                pairs.insert(candidate, branch.to_string());
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn pairs_release_branch() {
        assert_eq!(
            pair_branches(&["testing/1.0", "release/1.0"]),
            map(&[("release/1.0", "testing/1.0")])
        );
    }

    #[test]
    fn pairs_both_conventions() {
        assert_eq!(
            pair_branches(&["testing/1.0", "stable/1.0", "release/1.0"]),
            map(&[("stable/1.0", "testing/1.0"), ("release/1.0", "testing/1.0")])
        );
    }

    #[test]
    fn substring_testing_does_not_pair() {
        assert!(
            pair_branches(&["not-testing-prefixed-but-contains-testing-word", "release/2.0"])
                .is_empty()
        );
    }

    #[test]
    fn no_testing_branches_yield_nothing() {
        let empty: [&str; 0] = [];
        assert!(pair_branches(&empty).is_empty());
        assert!(pair_branches(&["release/1.0"]).is_empty());
    }

    #[test]
    fn versions_must_match_exactly() {
        assert_eq!(
            pair_branches(&[
                "master",
                "testing/1.2.11",
                "testing/1.2.8",
                "stable/1.2.11",
                "release/1.2",
            ]),
            map(&[("stable/1.2.11", "testing/1.2.11")])
        );
    }

    #[test]
    fn nested_testing_prefix_is_ignored() {
        assert!(pair_branches(&["feature/testing/1.0", "release/1.0"]).is_empty());
    }

    #[test]
    fn results_only_contain_input_names() {
        let input = [
            "testing/1.0",
            "testing/2.0",
            "release/1.0",
            "stable/2.0",
            "stable/3.0",
            "develop",
            "testing/",
            "release/",
        ];
        let pairs = pair_branches(&input);
        assert!(!pairs.is_empty());
        for (stable, testing) in &pairs {
            assert!(input.contains(&stable.as_str()));
            assert!(input.contains(&testing.as_str()));
            assert_eq!(classify(testing), BranchRole::Testing);
            assert_eq!(classify(stable), BranchRole::Stable);
        }
    }

    #[test]
    fn classification() {
        assert_eq!(classify("testing/1.0"), BranchRole::Testing);
        assert_eq!(classify("release/1.0"), BranchRole::Stable);
        assert_eq!(classify("stable/1.0"), BranchRole::Stable);
        assert_eq!(classify("master"), BranchRole::Other);
        assert_eq!(testing_version("testing/4.1.0"), Some("4.1.0"));
        assert_eq!(testing_version("master"), None);
    }
}
