//! Pattern-driven feature detection.
//!
//! Before user stories can be mapped, the extraction pool is grouped into
//! features. A JSON configuration declares name patterns per feature; any
//! component left unmatched is grouped by its Odoo model instead.
//!
//! Pattern forms:
//! - `[tag]` — matches names carrying the tag prefix, case-insensitively
//!   (e.g. `[rwx]` matches `[rwx] Check Credit`),
//! - anything else — a shell-style wildcard (`*`, `?`) matched
//!   case-insensitively against the whole name (e.g. `x_credit_*`).

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    domain::{Component, Feature, FeatureName},
    mapping::ordered::OrderedMap,
};

/// Display names for common Odoo models, used when synthesizing feature
/// names for unmatched components.
const MODEL_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("sale.order", "Sales Order"),
    ("sale.order.line", "Sales Order Line"),
    ("purchase.order", "Purchase Order"),
    ("purchase.order.line", "Purchase Order Line"),
    ("res.partner", "Contact"),
    ("res.users", "User"),
    ("res.company", "Company"),
    ("product.product", "Product"),
    ("product.template", "Product Template"),
    ("stock.picking", "Inventory Transfer"),
    ("stock.move", "Stock Move"),
    ("stock.quant", "Stock Quant"),
    ("account.move", "Journal Entry"),
    ("account.move.line", "Journal Item"),
    ("account.payment", "Payment"),
    ("mrp.production", "Manufacturing Order"),
    ("mrp.bom", "Bill of Materials"),
    ("project.project", "Project"),
    ("project.task", "Project Task"),
    ("hr.employee", "Employee"),
    ("crm.lead", "Lead/Opportunity"),
    ("helpdesk.ticket", "Helpdesk Ticket"),
];

/// What to do with components no pattern matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedHandling {
    /// Group unmatched components by their Odoo model (default).
    #[default]
    GroupByModel,
    /// Drop unmatched components from the feature list.
    Discard,
}

/// Errors raised while loading detection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file was not valid JSON.
    #[error("Failed to parse {path}: {source}")]
    Json {
        /// The file that failed.
        path: PathBuf,
        /// The underlying deserialization error.
        source: serde_json::Error,
    },

    /// A feature was declared with an empty name.
    #[error("Feature names in the detection configuration must not be empty")]
    EmptyFeatureName,

    /// A pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {source}")]
    BadPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex error.
        source: regex::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    features: OrderedMap<RawFeature>,
    #[serde(default)]
    unmapped_handling: UnmappedHandling,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    description: String,
    #[serde(default)]
    patterns: Vec<String>,
}

/// A compiled feature detector.
#[derive(Debug)]
pub struct Detector {
    features: Vec<CompiledFeature>,
    unmapped_handling: UnmappedHandling,
}

#[derive(Debug)]
struct CompiledFeature {
    name: FeatureName,
    description: String,
    patterns: Vec<Regex>,
}

impl Detector {
    /// Loads and compiles a detection configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, a
    /// feature name is empty, or a pattern fails to compile.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_raw(raw)
    }

    /// A detector with no patterns: every component groups by model.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
            unmapped_handling: UnmappedHandling::GroupByModel,
        }
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut features = Vec::with_capacity(raw.features.0.len());

        for (name, feature) in raw.features.0 {
            let name = FeatureName::new(&name).map_err(|_| ConfigError::EmptyFeatureName)?;
            let patterns = feature
                .patterns
                .iter()
                .map(|pattern| compile_pattern(pattern))
                .collect::<Result<Vec<_>, _>>()?;
            features.push(CompiledFeature {
                name,
                description: feature.description,
                patterns,
            });
        }

        Ok(Self {
            features,
            unmapped_handling: raw.unmapped_handling,
        })
    }

    /// Groups a component pool into features.
    ///
    /// Components are tested against each feature's patterns in declaration
    /// order; the first matching feature claims the component. Unmatched
    /// components are grouped by model (or discarded, per configuration).
    /// Features appear in order of their first claimed component.
    #[instrument(skip_all, fields(components = pool.len()))]
    #[must_use]
    pub fn detect(&self, pool: &[Component]) -> Vec<Feature> {
        let mut features: Vec<Feature> = Vec::new();
        let mut unmatched: Vec<&Component> = Vec::new();

        for component in pool {
            match self.match_component(component) {
                Some(compiled) => {
                    push_component(&mut features, &compiled.name, &compiled.description, component);
                }
                None => unmatched.push(component),
            }
        }

        if self.unmapped_handling == UnmappedHandling::GroupByModel {
            for component in unmatched {
                let model = if component.model.is_empty() {
                    "unknown"
                } else {
                    component.model.as_str()
                };
                let name = model_feature_name(model);
                let description = format!("Customizations for {model}");
                push_component(&mut features, &name, &description, component);
            }
        }

        features
    }

    fn match_component(&self, component: &Component) -> Option<&CompiledFeature> {
        self.features.iter().find(|feature| {
            feature
                .patterns
                .iter()
                .any(|pattern| pattern.is_match(&component.name))
        })
    }
}

fn push_component(
    features: &mut Vec<Feature>,
    name: &FeatureName,
    description: &str,
    component: &Component,
) {
    if let Some(feature) = features.iter_mut().find(|f| f.name == *name) {
        feature.components.push(component.clone());
    } else {
        features.push(Feature {
            name: name.clone(),
            description: description.to_string(),
            components: vec![component.clone()],
        });
    }
}

/// Synthesizes a feature name for a model group.
///
/// # Panics
///
/// Panics if the synthesized name is empty, which cannot happen for a
/// non-empty model string.
fn model_feature_name(model: &str) -> FeatureName {
    let display = MODEL_DISPLAY_NAMES
        .iter()
        .find(|(known, _)| *known == model)
        .map_or_else(|| title_case(model), |(_, display)| (*display).to_string());

    FeatureName::new(&format!("{display} Customizations")).expect("this should never fail")
}

/// Converts `model.name` to `Model Name`.
fn title_case(model: &str) -> String {
    model
        .replace('.', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compiles one declared pattern into a regex.
fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    let source = if let Some(tag) = pattern
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map(|(tag, _)| tag)
    {
        // Tag prefix: anchored at the start, rest of the name free.
        format!("(?i)^\\[{}\\]", regex::escape(tag))
    } else {
        // Shell-style wildcard over the whole name.
        let mut translated = String::from("(?i)^");
        for ch in pattern.chars() {
            match ch {
                '*' => translated.push_str(".*"),
                '?' => translated.push('.'),
                other => translated.push_str(&regex::escape(&other.to_string())),
            }
        }
        translated.push('$');
        translated
    };

    Regex::new(&source).map_err(|source| ConfigError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use crate::domain::{Complexity, ComponentType};

    use super::*;

    fn component(id: u32, name: &str, model: &str) -> Component {
        Component {
            id,
            name: name.to_string(),
            display_name: String::new(),
            component_type: ComponentType::Field,
            model: model.to_string(),
            complexity: Complexity::Simple,
            file_path: None,
        }
    }

    fn detector(json: &str) -> Detector {
        let raw: RawConfig = serde_json::from_str(json).unwrap();
        Detector::from_raw(raw).unwrap()
    }

    #[test]
    fn wildcard_patterns_match_case_insensitively() {
        let detector = detector(
            r#"{"features": {"Credit Control": {
                "description": "Credit checks",
                "patterns": ["x_credit_*"]
            }}}"#,
        );

        let pool = vec![
            component(1, "X_Credit_Limit", "sale.order"),
            component(2, "x_credit_hold", "sale.order"),
            component(3, "x_delivery_window", "sale.order"),
        ];

        let features = detector.detect(&pool);
        assert_eq!(features[0].name.as_str(), "Credit Control");
        assert_eq!(features[0].components.len(), 2);
    }

    #[test]
    fn wildcard_requires_full_match() {
        let detector = detector(
            r#"{"features": {"F": {"patterns": ["credit"]}}}"#,
        );
        // "credit" without wildcards only matches the exact name.
        let pool = vec![
            component(1, "x_credit_limit", "sale.order"),
            component(2, "credit", "sale.order"),
        ];

        let features = detector.detect(&pool);
        let claimed: Vec<&str> = features
            .iter()
            .find(|f| f.name.as_str() == "F")
            .unwrap()
            .components
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(claimed, vec!["credit"]);
    }

    #[test]
    fn tag_patterns_anchor_at_the_start() {
        let detector = detector(
            r#"{"features": {"Warehouse Actions": {"patterns": ["[wh]*"]}}}"#,
        );

        let pool = vec![
            component(1, "[WH] Rebalance Quants", "stock.quant"),
            component(2, "Cleanup [wh] later", "stock.quant"),
        ];

        let features = detector.detect(&pool);
        let warehouse = features
            .iter()
            .find(|f| f.name.as_str() == "Warehouse Actions")
            .unwrap();
        assert_eq!(warehouse.components.len(), 1);
        assert_eq!(warehouse.components[0].id, 1);
    }

    #[test]
    fn first_matching_feature_claims_the_component() {
        let detector = detector(
            r#"{"features": {
                "First": {"patterns": ["x_shared_*"]},
                "Second": {"patterns": ["x_shared_thing"]}
            }}"#,
        );

        let pool = vec![component(1, "x_shared_thing", "sale.order")];
        let features = detector.detect(&pool);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name.as_str(), "First");
    }

    #[test]
    fn unmatched_components_group_by_model() {
        let detector = Detector::empty();
        let pool = vec![
            component(1, "x_a", "sale.order"),
            component(2, "x_b", "custom.widget.model"),
            component(3, "x_c", ""),
            component(4, "x_d", "sale.order"),
        ];

        let features = detector.detect(&pool);
        let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Sales Order Customizations",
                "Custom Widget Model Customizations",
                "Unknown Customizations",
            ]
        );
        assert_eq!(features[0].components.len(), 2);
        assert_eq!(features[0].description, "Customizations for sale.order");
    }

    #[test]
    fn discard_handling_drops_unmatched_components() {
        let detector = detector(
            r#"{"features": {"F": {"patterns": ["x_keep_*"]}},
                "unmapped_handling": "discard"}"#,
        );

        let pool = vec![
            component(1, "x_keep_this", "sale.order"),
            component(2, "x_drop_this", "sale.order"),
        ];

        let features = detector.detect(&pool);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].components.len(), 1);
    }

    #[test]
    fn empty_feature_name_is_a_config_error() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"features": {"  ": {"patterns": []}}}"#).unwrap();
        assert!(matches!(
            Detector::from_raw(raw),
            Err(ConfigError::EmptyFeatureName)
        ));
    }

    #[test]
    fn load_reads_configuration_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("feature-mapping.json");
        std::fs::write(
            &path,
            r#"{"features": {"Credit": {"patterns": ["x_credit_*"]}}}"#,
        )
        .unwrap();

        let detector = Detector::load(&path).unwrap();
        let features = detector.detect(&[component(1, "x_credit_limit", "sale.order")]);
        assert_eq!(features[0].name.as_str(), "Credit");
    }
}
