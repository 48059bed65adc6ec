//! Gating predicates evaluated before a stage runs.

use crate::pipeline::Variables;

/// A predicate over the resolved variables, evaluated before a stage's
/// action runs.
///
/// A false gate skips the stage; it never fails it.
pub struct Gate {
    description: String,
    predicate: Box<dyn Fn(&Variables) -> bool + Send + Sync>,
}

impl Gate {
    /// Creates a gate from a closure.
    #[must_use]
    pub fn when<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Variables) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Creates a gate that passes when a variable equals a value.
    #[must_use]
    pub fn var_equals(key: impl Into<String>, expected: impl Into<String>) -> Self {
        let key = key.into();
        let expected = expected.into();
        let description = format!("{key} == {expected}");
        Self::when(description, move |vars| vars.get(&key) == Some(expected.as_str()))
    }

    /// Creates a gate that passes when a variable is defined.
    #[must_use]
    pub fn var_defined(key: impl Into<String>) -> Self {
        let key = key.into();
        let description = format!("{key} is defined");
        Self::when(description, move |vars| vars.get(&key).is_some())
    }

    /// Evaluates the gate.
    #[must_use]
    pub fn allows(&self, variables: &Variables) -> bool {
        (self.predicate)(variables)
    }

    /// Returns the gate's description, used in skip reasons.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Variables::from(map)
    }

    #[test]
    fn test_var_equals_gate() {
        let gate = Gate::var_equals("branch", "main");

        assert!(gate.allows(&vars(&[("branch", "main")])));
        assert!(!gate.allows(&vars(&[("branch", "develop")])));
        assert!(!gate.allows(&vars(&[])));
        assert_eq!(gate.description(), "branch == main");
    }

    #[test]
    fn test_var_defined_gate() {
        let gate = Gate::var_defined("image");

        assert!(gate.allows(&vars(&[("image", "registry/app:1")])));
        assert!(!gate.allows(&vars(&[])));
    }

    #[test]
    fn test_closure_gate() {
        let gate = Gate::when("build number is even", |vars| {
            vars.get("build")
                .and_then(|b| b.parse::<u64>().ok())
                .is_some_and(|b| b % 2 == 0)
        });

        assert!(gate.allows(&vars(&[("build", "42")])));
        assert!(!gate.allows(&vars(&[("build", "41")])));
    }
}
