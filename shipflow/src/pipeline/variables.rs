//! The run's immutable variable set.

use crate::errors::VariableError;
use std::collections::HashMap;
use std::sync::Arc;

/// Function that produces the run's variable set.
///
/// Invoked exactly once, at run start; a resolution failure aborts the
/// run before any stage executes.
pub type ResolveVariables =
    Box<dyn Fn() -> Result<HashMap<String, String>, VariableError> + Send + Sync>;

/// The variable set for one pipeline run.
///
/// Resolved once at run start and immutable thereafter; every stage
/// observes the same values. Cloning is cheap and shares the backing map.
#[derive(Clone, Default)]
pub struct Variables(Arc<HashMap<String, String>>);

impl Variables {
    /// Returns a variable's value, if defined.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns a variable's value, or a missing-variable error.
    pub fn require(&self, key: &str) -> Result<&str, VariableError> {
        self.get(key).ok_or_else(|| VariableError::missing(key))
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for Variables {
    fn from(map: HashMap<String, String>) -> Self {
        Self(Arc::new(map))
    }
}

impl std::fmt::Debug for Variables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Variables {
        let mut map = HashMap::new();
        map.insert("revision".to_string(), "abc123".to_string());
        map.insert("image".to_string(), "registry/app:42".to_string());
        Variables::from(map)
    }

    #[test]
    fn test_get_and_require() {
        let vars = sample();

        assert_eq!(vars.get("revision"), Some("abc123"));
        assert_eq!(vars.require("image").unwrap(), "registry/app:42");
        assert_eq!(
            vars.require("absent").unwrap_err(),
            VariableError::missing("absent")
        );
    }

    #[test]
    fn test_clones_share_values() {
        let vars = sample();
        let clone = vars.clone();

        assert_eq!(clone.len(), vars.len());
        assert_eq!(clone.get("revision"), vars.get("revision"));
    }

    #[test]
    fn test_empty_default() {
        let vars = Variables::default();
        assert!(vars.is_empty());
        assert_eq!(vars.len(), 0);
    }
}
