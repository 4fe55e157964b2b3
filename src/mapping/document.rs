//! The feature/user-story map document.
//!
//! A TOML file mapping feature names to user stories, each story declaring
//! the component references it implements:
//!
//! ```toml
//! [metadata]
//! generated_at = "2025-12-13T10:00:00"
//! extraction_count = 10
//!
//! [features."Sales Approval"]
//! description = "Order approval workflow"
//!
//! [features."Sales Approval".user_stories."Configure Fields"]
//! description = "Configure approval fields"
//! components = ["field.sale_order.x_approval_status"]
//! ```
//!
//! Two story layouts exist in the wild: the current named-table form above,
//! and a legacy array form where each story is an inline table and the
//! description doubles as the name. Both parse into the same canonical
//! ordered list of [`StoryDef`]s; nothing downstream sees the difference.

use std::{fmt, path::Path, path::PathBuf, str::FromStr};

use chrono::NaiveDateTime;
use serde::{
    de::{MapAccess, SeqAccess, Visitor},
    Deserialize, Deserializer,
};

use crate::mapping::ordered::OrderedMap;

/// A parsed map document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MapDocument {
    /// Bookkeeping about the generating extraction.
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    features: OrderedMap<FeatureDef>,
}

/// Bookkeeping recorded when the document was generated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Metadata {
    /// When the document was generated.
    #[serde(default)]
    pub generated_at: Option<NaiveDateTime>,
    /// How many components the generating extraction held.
    #[serde(default)]
    pub extraction_count: Option<u64>,
    /// Fingerprint of the generating extraction's component pool.
    #[serde(default)]
    pub fingerprint: Option<String>,
}

/// One feature's entry in the document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeatureDef {
    /// Short human-readable description.
    #[serde(default)]
    pub description: String,
    /// Marks a feature retained in the document but no longer present in
    /// the extraction; deprecated features fall back to default grouping.
    #[serde(default, rename = "_deprecated")]
    pub deprecated: bool,
    /// The declared user stories, in declaration order.
    #[serde(default)]
    pub user_stories: Stories,
    /// Components declared directly on the feature. Structurally disallowed
    /// — retained only so validation can flag it.
    #[serde(default)]
    pub components: Option<toml::Value>,
}

/// One user story's canonical definition.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryDef {
    /// The story's name (table key, or synthesized for the legacy form).
    pub name: String,
    /// The story's description; defaults to the name when absent.
    pub description: String,
    /// The declared component references, in declaration order.
    pub components: Vec<String>,
}

/// The declared stories of one feature, in declaration order.
///
/// Parses from either the named-table form or the legacy array form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stories(pub Vec<StoryDef>);

impl Stories {
    /// Whether no stories are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct StoryBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    components: Vec<RefEntry>,
}

/// A component reference entry: a plain string, or an inline table carrying
/// the reference under a `ref` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RefEntry {
    Plain(String),
    Table {
        #[serde(default, rename = "ref")]
        reference: String,
    },
}

impl RefEntry {
    fn into_reference(self) -> String {
        match self {
            Self::Plain(reference) | Self::Table { reference } => reference,
        }
    }
}

impl StoryBody {
    fn into_def(self, name: String) -> StoryDef {
        let description = self.description.unwrap_or_else(|| name.clone());
        StoryDef {
            name,
            description,
            components: self
                .components
                .into_iter()
                .map(RefEntry::into_reference)
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for Stories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StoriesVisitor;

        impl<'de> Visitor<'de> for StoriesVisitor {
            type Value = Stories;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a table of user stories or an array of user stories")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut stories = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, body)) = access.next_entry::<String, StoryBody>()? {
                    stories.push(body.into_def(name));
                }
                Ok(Stories(stories))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut stories = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(body) = access.next_element::<StoryBody>()? {
                    let name = body
                        .description
                        .clone()
                        .unwrap_or_else(|| format!("Story {}", stories.len() + 1));
                    stories.push(body.into_def(name));
                }
                Ok(Stories(stories))
            }
        }

        deserializer.deserialize_any(StoriesVisitor)
    }
}

/// Errors raised while loading a map document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file was not a valid map document.
    #[error("Failed to parse map document: {0}")]
    Parse(#[from] toml::de::Error),
}

impl MapDocument {
    /// Loads a map document from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(content.parse()?)
    }

    /// Looks a feature up by name.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&FeatureDef> {
        self.features.get(name)
    }

    /// All features in declaration order.
    pub fn features(&self) -> impl Iterator<Item = (&str, &FeatureDef)> {
        self.features
            .0
            .iter()
            .map(|(name, def)| (name.as_str(), def))
    }

    /// Names of all non-deprecated features, in declaration order.
    #[must_use]
    pub fn active_feature_names(&self) -> Vec<&str> {
        self.features()
            .filter(|(_, def)| !def.deprecated)
            .map(|(name, _)| name)
            .collect()
    }
}

impl FromStr for MapDocument {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED_FORM: &str = r#"
[metadata]
generated_at = "2025-12-13T10:00:00"
extraction_count = 10
fingerprint = "abc123"

[features."Sales Approval"]
description = "Order approval workflow"

[features."Sales Approval".user_stories."Configure Fields"]
description = "Configure approval fields"
components = [
    "field.sale_order.x_approval_status",
    { ref = "field.sale_order.x_approval_date" },
]

[features."Sales Approval".user_stories."Update Views"]
components = ["view.sale_order.Approval Form"]
"#;

    const LEGACY_FORM: &str = r#"
[features."Sales Approval"]
description = "Order approval workflow"
user_stories = [
    { description = "Configure Custom Fields", components = [
        "field.x_approval_status",
        "field.x_approval_date",
    ] },
    { description = "Update Views", components = [
        "view.sale_order_approval_view",
    ] },
]
"#;

    #[test]
    fn parses_named_form_in_declaration_order() {
        let document: MapDocument = NAMED_FORM.parse().unwrap();

        let feature = document.feature("Sales Approval").unwrap();
        assert!(!feature.deprecated);
        assert_eq!(feature.description, "Order approval workflow");

        let stories = &feature.user_stories.0;
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].name, "Configure Fields");
        assert_eq!(stories[0].description, "Configure approval fields");
        assert_eq!(
            stories[0].components,
            vec![
                "field.sale_order.x_approval_status",
                "field.sale_order.x_approval_date"
            ]
        );
        // Description falls back to the story name.
        assert_eq!(stories[1].description, "Update Views");
    }

    #[test]
    fn parses_legacy_array_form() {
        let document: MapDocument = LEGACY_FORM.parse().unwrap();

        let stories = &document.feature("Sales Approval").unwrap().user_stories.0;
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].name, "Configure Custom Fields");
        assert_eq!(stories[0].components.len(), 2);
        assert_eq!(stories[1].components, vec!["view.sale_order_approval_view"]);
    }

    #[test]
    fn legacy_story_without_description_gets_a_positional_name() {
        let document: MapDocument = r#"
[features."F"]
user_stories = [
    { components = ["field.x_a"] },
]
"#
        .parse()
        .unwrap();

        let stories = &document.feature("F").unwrap().user_stories.0;
        assert_eq!(stories[0].name, "Story 1");
        assert_eq!(stories[0].description, "Story 1");
    }

    #[test]
    fn metadata_is_optional() {
        let document: MapDocument = "[features.\"F\"]\n".parse().unwrap();
        assert!(document.metadata.generated_at.is_none());
        assert!(document.metadata.fingerprint.is_none());
        assert!(document.feature("F").unwrap().user_stories.is_empty());
    }

    #[test]
    fn metadata_parses_timestamp_and_fingerprint() {
        let document: MapDocument = NAMED_FORM.parse().unwrap();
        assert_eq!(document.metadata.extraction_count, Some(10));
        assert_eq!(document.metadata.fingerprint.as_deref(), Some("abc123"));
        assert!(document.metadata.generated_at.is_some());
    }

    #[test]
    fn deprecated_flag_and_direct_components_are_preserved() {
        let document: MapDocument = r#"
[features."Old"]
description = "gone"
_deprecated = true
components = ["field.x_old"]
"#
        .parse()
        .unwrap();

        let feature = document.feature("Old").unwrap();
        assert!(feature.deprecated);
        assert!(feature.components.is_some());
    }

    #[test]
    fn active_feature_names_skip_deprecated() {
        let document: MapDocument = r#"
[features."Current"]
[features."Old"]
_deprecated = true
"#
        .parse()
        .unwrap();

        assert_eq!(document.active_feature_names(), vec!["Current"]);
    }

    #[test]
    fn unknown_feature_is_absent() {
        let document: MapDocument = NAMED_FORM.parse().unwrap();
        assert!(document.feature("Missing").is_none());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let result: Result<MapDocument, _> = "features = nonsense".parse();
        assert!(result.is_err());
    }
}
