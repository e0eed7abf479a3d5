use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A plugin filename with case-insensitive identity.
///
/// Plugin names on Windows filesystems are case-insensitive, and the games'
/// manifests freely mix cases for the same file. `PluginName` keeps the
/// original spelling for display and I/O, but compares, hashes and orders by
/// a case-folded form computed once at construction. Folding goes through
/// Unicode lowercasing rather than byte-wise ASCII mapping, so names such as
/// `Blàñk.esm` behave the same as their ASCII cousins.
#[derive(Clone, Debug)]
pub struct PluginName {
    display: String,
    folded: String,
}

impl PluginName {
    pub fn new(name: &str) -> Self {
        Self {
            display: name.to_string(),
            folded: fold(name),
        }
    }

    /// The name as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The case-folded form used for identity.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Case-insensitive comparison against a raw string.
    pub fn matches(&self, other: &str) -> bool {
        // Fast path for names that already agree byte-for-byte.
        self.display == other || self.folded == fold(other)
    }
}

fn fold(name: &str) -> String {
    name.chars().flat_map(char::to_lowercase).collect()
}

impl PartialEq for PluginName {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for PluginName {}

impl Hash for PluginName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for PluginName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PluginName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for PluginName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_is_case_insensitive() {
        assert_eq!(PluginName::new("Blank.esm"), PluginName::new("blank.esm"));
        assert_eq!(PluginName::new("Blank.esm"), PluginName::new("BLANK.ESM"));
        assert_ne!(
            PluginName::new("Blank.esm"),
            PluginName::new("Blank - Different.esm")
        );
    }

    #[test]
    fn test_equality_folds_non_ascii() {
        assert_eq!(PluginName::new("Blàñk.esm"), PluginName::new("BLÀÑK.ESM"));
        assert_ne!(PluginName::new("Blàñk.esm"), PluginName::new("Blank.esm"));
    }

    #[test]
    fn test_display_form_is_preserved() {
        let name = PluginName::new("Blank - Different.ESP");
        assert_eq!(name.as_str(), "Blank - Different.ESP");
        assert_eq!(name.folded(), "blank - different.esp");
    }

    #[test]
    fn test_hashing_matches_equality() {
        let mut set = HashSet::new();
        set.insert(PluginName::new("Blank.esm"));
        assert!(set.contains(&PluginName::new("blank.ESM")));
        assert!(!set.insert(PluginName::new("BLANK.esm")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ordering_uses_folded_form() {
        let mut names = vec![
            PluginName::new("b.esp"),
            PluginName::new("A.esp"),
            PluginName::new("C.esp"),
        ];
        names.sort();
        let sorted: Vec<&str> = names.iter().map(PluginName::as_str).collect();
        assert_eq!(sorted, vec!["A.esp", "b.esp", "C.esp"]);
    }

    #[test]
    fn test_matches_raw_string() {
        let name = PluginName::new("Blàñk.esm");
        assert!(name.matches("blàñk.esm"));
        assert!(name.matches("Blàñk.esm"));
        assert!(!name.matches("Blank.esm"));
    }
}
