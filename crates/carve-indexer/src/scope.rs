//! Class name canonicalization and the prefix-plus-deny-list scope filter

use carve_core::{full_match_regex, simple_name, ExtractConfig, Result};
use regex::Regex;

/// Canonical dotted name of an internal class name.
///
/// `com/example/Outer$Inner` becomes `com.example.Outer`: separators turn
/// into dots, anything from the first `<` is dropped, then anything from
/// the first `$`.
pub fn canonical_name(internal: &str) -> String {
    let name = internal.split('<').next().unwrap_or(internal);
    let name = name.split('$').next().unwrap_or(name);
    name.replace('/', ".")
}

/// Decides which classes belong in the graph.
///
/// A canonical name is in scope when it starts with the package prefix and
/// its simple name fully matches none of the ignored-class patterns.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    prefix: String,
    ignored: Vec<Regex>,
}

impl ScopeFilter {
    pub fn new<S: AsRef<str>>(prefix: impl Into<String>, ignored: &[S]) -> Result<Self> {
        let ignored = ignored
            .iter()
            .map(|pattern| full_match_regex(pattern.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(ScopeFilter {
            prefix: prefix.into(),
            ignored,
        })
    }

    pub fn from_config(config: &ExtractConfig) -> Result<Self> {
        Self::new(config.package_prefix.clone(), &config.ignored_classes)
    }

    /// Accept everything.
    pub fn all() -> Self {
        ScopeFilter {
            prefix: String::new(),
            ignored: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_in_scope(&self, canonical: &str) -> bool {
        if canonical.is_empty() || !canonical.starts_with(&self.prefix) {
            return false;
        }
        let simple = simple_name(canonical);
        !self.ignored.iter().any(|pattern| pattern.is_match(simple))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("com/example/Foo"), "com.example.Foo");
        assert_eq!(canonical_name("com/example/Foo$Bar$1"), "com.example.Foo");
        assert_eq!(canonical_name("com/example/Box<T>"), "com.example.Box");
        assert_eq!(canonical_name("Standalone"), "Standalone");
    }

    #[test]
    fn test_prefix_and_patterns() {
        let filter = ScopeFilter::new("com.example", &[".*_Factory", "R", "Dagger.*"]).unwrap();
        assert!(filter.is_in_scope("com.example.feed.FeedScreen"));
        assert!(!filter.is_in_scope("org.other.FeedScreen"));
        assert!(!filter.is_in_scope("com.example.feed.FeedScreen_Factory"));
        assert!(!filter.is_in_scope("com.example.R"));
        assert!(!filter.is_in_scope("com.example.DaggerAppComponent"));
        // Full match only: "R" does not exclude "Router"
        assert!(filter.is_in_scope("com.example.Router"));
    }

    #[test]
    fn test_default_patterns_from_config() {
        let filter = ScopeFilter::from_config(&ExtractConfig {
            package_prefix: "com.example".to_string(),
            ..ExtractConfig::default()
        })
        .unwrap();
        assert!(filter.is_in_scope("com.example.Main"));
        assert!(!filter.is_in_scope("com.example.MainBinding"));
        assert!(!filter.is_in_scope("com.example.Main_MembersInjector"));
        assert!(!filter.is_in_scope("com.example.LiveLiterals"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ScopeFilter::new("", &["("]).is_err());
        assert!(ScopeFilter::all().is_in_scope("anything.At.All"));
    }
}
