use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Validation error for malformed or duplicated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    EmptyEntry { asset: String, entry: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::EmptyEntry { asset, entry } => {
                write!(f, "entry '{entry}' in asset '{asset}' has no script text")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate content bundles and the dance roster.
///
/// ```
/// use pageant_data::{ContentDef, EventBundleDef, validate_content};
/// use std::collections::BTreeMap;
///
/// let content = ContentDef {
///     bundles: vec![EventBundleDef {
///         asset: "Data/Events/Town".into(),
///         entries: BTreeMap::from([("100".to_string(), "none/follow/farmer 1 1 2/end".to_string())]),
///     }],
///     dance_roster: None,
/// };
/// assert!(validate_content(&content).is_empty());
/// ```
pub fn validate_content(content: &ContentDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut assets = HashSet::new();
    track_ids(
        "asset",
        content.bundles.iter().map(|b| b.asset.as_str()),
        &mut assets,
        &mut errors,
    );

    for bundle in &content.bundles {
        if bundle.asset.trim().is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: "bundle asset name missing".to_string(),
            });
        }
        for (entry, text) in &bundle.entries {
            if text.trim().is_empty() {
                errors.push(ValidationError::EmptyEntry {
                    asset: bundle.asset.clone(),
                    entry: entry.clone(),
                });
            }
        }
    }

    if let Some(roster) = &content.dance_roster {
        let mut dancers = HashSet::new();
        track_ids(
            "dancer",
            roster.leaders().chain(roster.followers()),
            &mut dancers,
            &mut errors,
        );
        if roster.pairs.is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: "dance roster has no pairs".to_string(),
            });
        }
    }

    errors
}

fn track_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    set: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    for id in ids {
        if !set.insert(id.to_string()) {
            errors.push(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}
