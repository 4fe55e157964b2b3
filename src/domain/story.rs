//! Features and user stories.
//!
//! A feature is a human-defined grouping of components; a user story is a
//! unit of plannable work within a feature, carrying the components it
//! implements and the estimated effort.

use std::{collections::BTreeSet, fmt, str::FromStr};

use non_empty_string::NonEmptyString;
use nonempty::NonEmpty;

use crate::domain::Component;

/// A validated, non-empty feature name.
///
/// Feature names key the map document and the detection configuration, so an
/// empty or whitespace-only name is never meaningful.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureName(NonEmptyString);

impl FeatureName {
    /// Creates a feature name from a string.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeatureNameError` if the trimmed string is empty.
    pub fn new(s: &str) -> Result<Self, InvalidFeatureNameError> {
        let trimmed = s.trim();
        NonEmptyString::new(trimmed.to_string())
            .map(Self)
            .map_err(|_| InvalidFeatureNameError)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for FeatureName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FeatureName {
    type Err = InvalidFeatureNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for FeatureName {
    type Error = InvalidFeatureNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Error returned when a feature name is empty.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Feature name must not be empty")]
pub struct InvalidFeatureNameError;

/// A logical grouping of related components.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// The feature's name, as keyed in the map document.
    pub name: FeatureName,
    /// Short human-readable description.
    pub description: String,
    /// The components detected as belonging to this feature.
    pub components: Vec<Component>,
}

impl Feature {
    /// The set of Odoo models touched by this feature's components.
    ///
    /// Empty models are skipped. The set is ordered for stable output.
    #[must_use]
    pub fn affected_models(&self) -> BTreeSet<&str> {
        self.components
            .iter()
            .map(|c| c.model.as_str())
            .filter(|m| !m.is_empty())
            .collect()
    }
}

/// A unit of plannable work within a feature.
///
/// A story always holds at least one component: stories that resolve no
/// components are dropped before construction.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStory {
    /// The story's title.
    pub title: String,
    /// Short description of the work.
    pub description: String,
    /// The components this story implements, in declaration order.
    pub components: NonEmpty<Component>,
    /// Total estimated effort, in hours, rounded to one decimal.
    pub estimated_hours: f64,
}

impl UserStory {
    /// Number of components in this story.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{Complexity, ComponentType};

    use super::*;

    fn component(id: u32, model: &str) -> Component {
        Component {
            id,
            name: format!("x_field_{id}"),
            display_name: String::new(),
            component_type: ComponentType::Field,
            model: model.to_string(),
            complexity: Complexity::Simple,
            file_path: None,
        }
    }

    #[test]
    fn feature_name_rejects_empty() {
        assert!(FeatureName::new("").is_err());
        assert!(FeatureName::new("   ").is_err());
    }

    #[test]
    fn feature_name_trims() {
        let name = FeatureName::new("  Sales Approval  ").unwrap();
        assert_eq!(name.as_str(), "Sales Approval");
    }

    #[test]
    fn affected_models_skips_empty_and_deduplicates() {
        let feature = Feature {
            name: "Sales".parse().unwrap(),
            description: String::new(),
            components: vec![
                component(1, "sale.order"),
                component(2, "sale.order"),
                component(3, ""),
                component(4, "res.partner"),
            ],
        };
        let models: Vec<&str> = feature.affected_models().into_iter().collect();
        assert_eq!(models, vec!["res.partner", "sale.order"]);
    }

    #[test]
    fn user_story_component_count() {
        let story = UserStory {
            title: "Configure fields".to_string(),
            description: "Implement 2 component(s)".to_string(),
            components: NonEmpty::from((component(1, "sale.order"), vec![component(2, "sale.order")])),
            estimated_hours: 3.5,
        };
        assert_eq!(story.component_count(), 2);
    }
}
