//! Attribute maps carried by every event occurrence.

use std::collections::{BTreeMap, BTreeSet};

/// Attribute values keyed by attribute name.
///
/// Keys are kept sorted so that serialization and hashing of the same
/// logical attributes are byte-for-byte identical.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Build an [`Attributes`] map from name/value pairs.
///
/// ```rust
/// use switchyard_events::attributes;
///
/// let attrs = attributes([("account_id", 1), ("profile_id", 2)]);
/// assert_eq!(attrs["profile_id"], 2);
/// ```
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Difference between a declared attribute set and an observed one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDiff {
    /// Declared names that were not observed.
    pub missing: Vec<String>,
    /// Observed names that were not declared.
    pub unexpected: Vec<String>,
}

impl AttributeDiff {
    /// Compare a declared name set against observed names.
    pub fn between<'a>(
        declared: &BTreeSet<String>,
        observed: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let observed: BTreeSet<&str> = observed.into_iter().collect();
        let missing = declared
            .iter()
            .filter(|name| !observed.contains(name.as_str()))
            .cloned()
            .collect();
        let unexpected = observed
            .iter()
            .filter(|name| !declared.contains(**name))
            .map(|name| (*name).to_owned())
            .collect();
        Self {
            missing,
            unexpected,
        }
    }

    /// True when the observed set equals the declared set.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn test_exact_match() {
        let diff = AttributeDiff::between(&declared(&["a", "b"]), ["b", "a"]);
        assert!(diff.is_exact());
    }

    #[test]
    fn test_subset_reports_missing() {
        let diff = AttributeDiff::between(&declared(&["a", "b"]), ["a"]);
        assert_eq!(diff.missing, vec!["b".to_owned()]);
        assert!(diff.unexpected.is_empty());
    }

    #[test]
    fn test_superset_reports_unexpected() {
        let diff = AttributeDiff::between(&declared(&["a"]), ["a", "z"]);
        assert!(diff.missing.is_empty());
        assert_eq!(diff.unexpected, vec!["z".to_owned()]);
    }

    #[test]
    fn test_attributes_builder_sorts_keys() {
        let attrs = attributes([("zeta", 1), ("alpha", 2)]);
        let keys: Vec<&str> = attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }
}
