//! Domain models for customization planning.
//!
//! This module contains the core domain types: extracted components,
//! component references, features and user stories, and declarative record
//! filters.

/// Extracted components and their type/complexity labels.
pub mod component;
pub use component::{Complexity, Component, ComponentType};

/// Declarative record filters (Odoo domain expressions).
pub mod filter;
pub use filter::DomainExpr;

/// Component reference parsing and normalization.
pub mod reference;
pub use reference::RefParts;

/// Features and user stories.
pub mod story;
pub use story::{Feature, FeatureName, UserStory};
