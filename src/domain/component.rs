use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

/// The kind of customization artifact extracted from an Odoo instance.
///
/// The wire names (`field`, `view`, `server_action`, `automation`, `report`)
/// match the reference prefixes used in map documents and the filenames of
/// the extraction output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// A custom field added to a model.
    Field,
    /// A view customization (form, tree, kanban, ...).
    View,
    /// A server action (ad-hoc code or object action).
    ServerAction,
    /// An automated action (`base.automation` record).
    Automation,
    /// A report template.
    Report,
}

impl ComponentType {
    /// All component types, in the order extraction files are processed.
    pub const ALL: [Self; 5] = [
        Self::Field,
        Self::View,
        Self::ServerAction,
        Self::Automation,
        Self::Report,
    ];

    /// The lowercase wire name used in references and extraction output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::View => "view",
            Self::ServerAction => "server_action",
            Self::Automation => "automation",
            Self::Report => "report",
        }
    }

    /// Human-readable label for report output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Field => "Field",
            Self::View => "View",
            Self::ServerAction => "Server Action",
            Self::Automation => "Automation",
            Self::Report => "Report",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a recognised component type.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown component type '{0}': expected one of field, view, server_action, automation, report")]
pub struct UnknownTypeError(String);

impl FromStr for ComponentType {
    type Err = UnknownTypeError;

    /// Parses a wire name. Accepts the legacy aliases `cron` (automation)
    /// and `action` (server action) found in older map documents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "field" => Ok(Self::Field),
            "view" => Ok(Self::View),
            "server_action" | "action" => Ok(Self::ServerAction),
            "automation" | "cron" => Ok(Self::Automation),
            "report" => Ok(Self::Report),
            _ => Err(UnknownTypeError(s.to_string())),
        }
    }
}

/// Coarse implementation-complexity label attached to a component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Trivial change (plain field, small view tweak).
    Simple,
    /// Routine change.
    Medium,
    /// Substantial change (computed fields, long code actions).
    Complex,
    /// Large, multi-file change.
    VeryComplex,
}

impl Complexity {
    /// All levels, simplest first. Rule matching relies on this order.
    pub const ALL: [Self; 4] = [Self::Simple, Self::Medium, Self::Complex, Self::VeryComplex];

    /// The lowercase wire name (`simple`, `medium`, `complex`, `very_complex`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
            Self::VeryComplex => "very_complex",
        }
    }

    /// Normalizes a free-form complexity label.
    ///
    /// Upstream tools are inconsistent (`moderate`, `very complex`, mixed
    /// case); anything unrecognised falls back to [`Self::Medium`].
    #[must_use]
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "simple" => Self::Simple,
            "complex" => Self::Complex,
            "very_complex" | "very complex" => Self::VeryComplex,
            _ => Self::Medium,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted Odoo customization.
///
/// Components are created once per extraction run and read-only thereafter.
/// `id` is unique within a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Extractor-assigned identifier, stable within one extraction run.
    pub id: u32,
    /// Technical name (a field's technical name, a generated method name, ...).
    pub name: String,
    /// Name shown in the Odoo UI; may differ from `name` for Studio exports.
    #[serde(default)]
    pub display_name: String,
    /// Which kind of artifact this is.
    pub component_type: ComponentType,
    /// Dotted Odoo model the component belongs to. May be empty, or a
    /// placeholder model when the true target could not be determined.
    #[serde(default)]
    pub model: String,
    /// Coarse effort label.
    pub complexity: Complexity,
    /// Source file the component was extracted from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl Component {
    /// Whether `model` is one of the placeholder models (`ir.actions.server`,
    /// `base.automation`) that signal "target model unknown".
    ///
    /// Both dotted and underscored spellings are recognised.
    #[must_use]
    pub fn has_placeholder_model(&self) -> bool {
        let folded = fold_model(&self.model);
        folded == "ir.actions.server" || folded == "base.automation"
    }
}

/// Canonicalizes a model name for comparison: lowercase, every separator
/// (dot or underscore) folded to a dot.
#[must_use]
pub fn fold_model(model: &str) -> String {
    model.replace('.', "_").replace('_', ".").to_lowercase()
}
