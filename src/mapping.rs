//! Feature detection and user-story mapping.
//!
//! The pipeline: [`detect`] groups an extraction pool into [`Feature`]s,
//! then [`mapper`] turns each feature into user stories driven by the
//! declarative [`document::MapDocument`].
//!
//! [`Feature`]: crate::domain::Feature

/// Pattern-driven grouping of components into features.
pub mod detect;
/// The TOML map document.
pub mod document;
/// Story building and document validation.
pub mod mapper;
mod ordered;

pub use detect::Detector;
pub use document::MapDocument;
pub use mapper::{build_user_stories, check_freshness, validate, GroupByType, MapWarning};
