//! Project planning for Odoo Studio customizations.
//!
//! Extraction output (components exported from an Odoo instance) is grouped
//! into features and user stories, priced from an effort table, and rendered
//! into project-management artifacts.

pub mod domain;
pub use domain::{Complexity, Component, ComponentType, Feature, FeatureName, UserStory};

/// Reference resolution against a component pool.
pub mod resolve;

/// Extraction loading and pool fingerprinting.
pub mod storage;
pub use storage::ExtractionFilters;

/// Feature detection and user-story mapping.
pub mod mapping;
pub use mapping::{Detector, MapDocument};

/// Effort estimation.
pub mod estimate;
pub use estimate::{EffortModel, EffortTable, TimeBreakdown};

/// Report rendering.
pub mod report;
