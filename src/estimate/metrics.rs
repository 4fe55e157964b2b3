//! The effort table.
//!
//! Development effort is looked up from a `time_metrics.json` file mapping
//! component type and complexity to hours, split by activity. The table is
//! authoritative: it is validated for completeness at load time, so lookups
//! never fall back to silent defaults.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::domain::{Complexity, Component, ComponentType};

/// Hours for one component, split by activity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeBreakdown {
    /// Implementation hours.
    pub development: f64,
    /// Requirements/analysis hours.
    pub requirements: f64,
    /// Testing hours.
    pub testing: f64,
}

impl TimeBreakdown {
    /// Total hours across all activities.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.development + self.requirements + self.testing
    }
}

/// Anything that can price a component in hours.
///
/// The mapper only needs this capability; the concrete table lives behind
/// it so tests can substitute fixed rates.
pub trait EffortModel {
    /// Estimated total hours for one component.
    fn hours(&self, component: &Component) -> f64;
}

/// The per-type, per-complexity effort table.
#[derive(Debug, Clone, PartialEq)]
pub struct EffortTable {
    // Dense: indexed by type then complexity, validated complete at load.
    entries: [[TimeBreakdown; 4]; 5],
}

/// Errors raised while loading the effort table.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
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

    /// The `time_metrics` section was absent.
    #[error("{path} is missing the 'time_metrics' section")]
    MissingSection {
        /// The file that failed.
        path: PathBuf,
    },

    /// A type/complexity combination had no entry.
    #[error("No hours configured for {component_type}/{complexity}")]
    MissingEntry {
        /// The component type lacking an entry.
        component_type: ComponentType,
        /// The complexity level lacking an entry.
        complexity: Complexity,
    },
}

#[derive(Debug, Deserialize)]
struct MetricsFile {
    time_metrics: Option<BTreeMap<ComponentType, BTreeMap<Complexity, RawHours>>>,
}

#[derive(Debug, Deserialize)]
struct RawHours {
    #[serde(default)]
    dev: f64,
    #[serde(default)]
    req: f64,
    #[serde(default)]
    test: f64,
}

impl EffortTable {
    /// Loads and validates the table from a `time_metrics.json` file.
    ///
    /// # Errors
    ///
    /// Returns a [`MetricsError`] if the file cannot be read or parsed, the
    /// `time_metrics` section is absent, or any type/complexity combination
    /// is missing — the table must be complete.
    pub fn load(path: &Path) -> Result<Self, MetricsError> {
        let content = std::fs::read_to_string(path).map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: MetricsFile =
            serde_json::from_str(&content).map_err(|source| MetricsError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let raw = file.time_metrics.ok_or_else(|| MetricsError::MissingSection {
            path: path.to_path_buf(),
        })?;

        Self::from_map(&raw)
    }

    fn from_map(
        raw: &BTreeMap<ComponentType, BTreeMap<Complexity, RawHours>>,
    ) -> Result<Self, MetricsError> {
        let mut entries = [[TimeBreakdown::default(); 4]; 5];

        for (type_index, ty) in ComponentType::ALL.into_iter().enumerate() {
            for (level_index, complexity) in Complexity::ALL.into_iter().enumerate() {
                let hours = raw
                    .get(&ty)
                    .and_then(|levels| levels.get(&complexity))
                    .ok_or(MetricsError::MissingEntry {
                        component_type: ty,
                        complexity,
                    })?;
                entries[type_index][level_index] = TimeBreakdown {
                    development: hours.dev,
                    requirements: hours.req,
                    testing: hours.test,
                };
            }
        }

        Ok(Self { entries })
    }

    /// The hours breakdown for a type/complexity combination.
    #[must_use]
    pub fn breakdown(&self, ty: ComponentType, complexity: Complexity) -> TimeBreakdown {
        self.entries[type_index(ty)][level_index(complexity)]
    }

    /// The hours breakdown for a component.
    #[must_use]
    pub fn component_breakdown(&self, component: &Component) -> TimeBreakdown {
        self.breakdown(component.component_type, component.complexity)
    }
}

impl EffortModel for EffortTable {
    fn hours(&self, component: &Component) -> f64 {
        self.component_breakdown(component).total()
    }
}

fn type_index(ty: ComponentType) -> usize {
    ComponentType::ALL
        .iter()
        .position(|t| *t == ty)
        .unwrap_or_default()
}

fn level_index(complexity: Complexity) -> usize {
    Complexity::ALL
        .iter()
        .position(|c| *c == complexity)
        .unwrap_or_default()
}
