//! Component reference strings.
//!
//! Map documents point at components with strings of the form
//! `type.model.name`, where `model` is optional and `name` may itself contain
//! dots, spaces, brackets, and colons. This module provides the parsing and
//! normalization primitives the resolver is built on.

/// Normalizes a reference for matching: trim surrounding whitespace and
/// lowercase.
///
/// Nothing else is stripped — interior punctuation is part of the component
/// identity (tag prefixes like `[rwx]` are semantically significant).
#[must_use]
pub fn normalize(reference: &str) -> String {
    reference.trim().to_lowercase()
}

/// Normalizes a component name to the filename convention used by the
/// upstream export tool: lowercase, spaces replaced with underscores.
///
/// Brackets, parentheses, and periods are preserved verbatim, matching the
/// filenames the exporter generates.
///
/// # Examples
///
/// ```
/// use studioplan::domain::reference::filename_form;
///
/// assert_eq!(
///     filename_form("[bom] Populate Variant BoMs (Dynabraid)"),
///     "[bom]_populate_variant_boms_(dynabraid)"
/// );
/// ```
#[must_use]
pub fn filename_form(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// A reference split into its `type`, `model`, and `name` segments.
///
/// The split is asymmetric: at most two dots are consumed, because `name`
/// may legitimately contain dots (version numbers, abbreviations) while the
/// type and model segments never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefParts {
    /// The component-type segment (`field`, `view`, ...), as written.
    pub kind: String,
    /// The model segment, when at least three segments are present.
    pub model: Option<String>,
    /// Everything after the second dot, rejoined; may contain dots.
    pub name: String,
}

impl RefParts {
    /// Splits a reference on `.` with at most two initial splits.
    ///
    /// - one segment: `model` is `None` and `name` is empty,
    /// - two segments: `type.name` (no model),
    /// - three or more: `type.model.name-with-remaining-dots`.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        let mut segments = reference.splitn(3, '.');
        let kind = segments.next().unwrap_or_default().to_string();
        let second = segments.next();
        let third = segments.next();

        match (second, third) {
            (Some(model), Some(name)) => Self {
                kind,
                model: Some(model.to_string()),
                name: name.to_string(),
            },
            (Some(name), None) => Self {
                kind,
                model: None,
                name: name.to_string(),
            },
            _ => Self {
                kind,
                model: None,
                name: String::new(),
            },
        }
    }

    /// Generates the candidate key strings to try when matching.
    ///
    /// When a model is present, three variants are emitted (the literal
    /// model, dots folded to underscores, underscores folded to dots),
    /// deduplicated when the spellings coincide. Map documents and source
    /// extractions disagree on the spelling (`stock_move_line` vs
    /// `stock.move.line`), so both directions are needed.
    #[must_use]
    pub fn candidate_keys(&self) -> Vec<String> {
        let mut candidates = Vec::new();

        if let Some(model) = &self.model {
            candidates.push(format!("{}.{model}.{}", self.kind, self.name));

            let underscored = model.replace('.', "_");
            if underscored != *model {
                candidates.push(format!("{}.{underscored}.{}", self.kind, self.name));
            }

            let dotted = model.replace('_', ".");
            if dotted != *model {
                candidates.push(format!("{}.{dotted}.{}", self.kind, self.name));
            }
        } else {
            candidates.push(format!("{}.{}", self.kind, self.name));
        }

        candidates
    }
}
