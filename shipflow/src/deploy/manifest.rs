//! Deployment manifest placeholder substitution.
//!
//! The resolved image reference is written into an externally-owned
//! descriptor file once per run, immediately before the deploy call.
//! Substitution is structured (`${VAR}` lookups against the immutable
//! variable set), never shell interpolation.

use crate::errors::StageError;
use crate::pipeline::Variables;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Error raised while rendering a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read or written.
    #[error("manifest io error: {0}")]
    Io(#[from] std::io::Error),

    /// Placeholders remained unresolved after substitution.
    #[error("unresolved manifest placeholders: {}", missing.join(", "))]
    UnresolvedPlaceholders {
        /// The placeholder names with no matching variable.
        missing: Vec<String>,
    },
}

impl From<ManifestError> for StageError {
    fn from(err: ManifestError) -> Self {
        Self::action(err.to_string())
    }
}

#[allow(clippy::expect_used)]
fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes `${VAR}` placeholders with values from the variable set.
///
/// Every placeholder must resolve; unresolved names are an error rather
/// than a silently broken descriptor.
pub fn substitute(template: &str, variables: &Variables) -> Result<String, ManifestError> {
    let mut missing = Vec::new();
    let rendered = placeholder_re().replace_all(template, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        match variables.get(key) {
            Some(value) => value.to_string(),
            None => {
                missing.push(key.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        missing.sort();
        missing.dedup();
        Err(ManifestError::UnresolvedPlaceholders { missing })
    }
}

/// Renders a manifest file in place.
pub async fn render_file(path: &Path, variables: &Variables) -> Result<(), ManifestError> {
    let template = tokio::fs::read_to_string(path).await?;
    let rendered = substitute(&template, variables)?;
    tokio::fs::write(path, rendered).await?;
    Ok(())
}
