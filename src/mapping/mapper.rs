//! Building user stories from the map document.
//!
//! The mapper walks a feature's declared stories in order, resolves each
//! component reference against the feature's pool, and claims components
//! first-come-first-served: a component matched by one story is never
//! re-claimed by a later one. Whatever the declared stories leave unclaimed
//! lands in a synthesized "Other Components" story, so the union of all
//! story components is always exactly the feature's pool.

use std::collections::HashSet;

use nonempty::NonEmpty;
use tracing::{debug, instrument};

use crate::{
    domain::{Component, Feature, UserStory},
    estimate::EffortModel,
    mapping::document::{FeatureDef, MapDocument},
    resolve,
};

/// A fallback grouping used for features the map document does not cover.
pub trait GroupingStrategy {
    /// Builds the stories for a feature absent from (or deprecated in) the
    /// map document.
    fn group(&self, feature: &Feature) -> Vec<UserStory>;
}

/// The default fallback: one story per component type present in the
/// feature, in the fixed type order.
#[derive(Debug, Clone, Copy)]
pub struct GroupByType<'a, E> {
    estimator: &'a E,
}

impl<'a, E: EffortModel> GroupByType<'a, E> {
    /// Creates the strategy around an effort model.
    #[must_use]
    pub const fn new(estimator: &'a E) -> Self {
        Self { estimator }
    }
}

impl<E: EffortModel> GroupingStrategy for GroupByType<'_, E> {
    fn group(&self, feature: &Feature) -> Vec<UserStory> {
        crate::domain::ComponentType::ALL
            .into_iter()
            .filter_map(|ty| {
                let components: Vec<Component> = feature
                    .components
                    .iter()
                    .filter(|comp| comp.component_type == ty)
                    .cloned()
                    .collect();
                let components = NonEmpty::from_vec(components)?;
                Some(story(
                    format!("Implement {}s", ty.label()),
                    components,
                    self.estimator,
                ))
            })
            .collect()
    }
}

/// Builds the user stories for one feature.
///
/// Features absent from the document, marked deprecated, or mapped with no
/// stories delegate entirely to the fallback strategy. Otherwise stories are
/// built in declaration order; stories that resolve zero components are
/// dropped, and unclaimed components are gathered into a final
/// "Other Components" story when any remain.
#[instrument(skip_all, fields(feature = %feature.name))]
#[must_use]
pub fn build_user_stories<E: EffortModel>(
    feature: &Feature,
    document: &MapDocument,
    estimator: &E,
    fallback: &dyn GroupingStrategy,
) -> Vec<UserStory> {
    let Some(def) = document.feature(feature.name.as_str()) else {
        debug!("feature not in map, using fallback grouping");
        return fallback.group(feature);
    };

    if def.deprecated || def.user_stories.is_empty() {
        debug!("feature deprecated or empty in map, using fallback grouping");
        return fallback.group(feature);
    }

    let mut claimed: HashSet<u32> = HashSet::new();
    let mut stories = Vec::new();

    for story_def in &def.user_stories.0 {
        let mut components: Vec<Component> = Vec::new();

        for reference in &story_def.components {
            if reference.is_empty() {
                continue;
            }
            if let Some(found) = resolve::resolve(reference, &feature.components) {
                if claimed.insert(found.id) {
                    components.push(found.clone());
                }
            } else {
                debug!(reference, "unresolved reference");
            }
        }

        if let Some(components) = NonEmpty::from_vec(components) {
            stories.push(UserStory {
                title: story_def.description.clone(),
                description: format!("Implement {} component(s)", components.len()),
                estimated_hours: rounded_total(&components, estimator),
                components,
            });
        }
    }

    let unclaimed: Vec<Component> = feature
        .components
        .iter()
        .filter(|comp| !claimed.contains(&comp.id))
        .cloned()
        .collect();

    if let Some(unclaimed) = NonEmpty::from_vec(unclaimed) {
        stories.push(UserStory {
            title: "Other Components".to_string(),
            description: format!("Implement {} additional component(s)", unclaimed.len()),
            estimated_hours: rounded_total(&unclaimed, estimator),
            components: unclaimed,
        });
    }

    stories
}

fn story<E: EffortModel>(title: String, components: NonEmpty<Component>, estimator: &E) -> UserStory {
    UserStory {
        title,
        description: format!("Implement {} component(s)", components.len()),
        estimated_hours: rounded_total(&components, estimator),
        components,
    }
}

fn rounded_total<E: EffortModel>(components: &NonEmpty<Component>, estimator: &E) -> f64 {
    let total: f64 = components.iter().map(|comp| estimator.hours(comp)).sum();
    (total * 10.0).round() / 10.0
}

/// A problem found in a map document.
///
/// All findings are warnings: a partially-correct document is still
/// processed for its valid entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapWarning {
    /// A feature is marked deprecated but still present.
    #[error("Feature '{feature}' is marked as deprecated; consider removing it from the map")]
    DeprecatedFeature {
        /// The offending feature.
        feature: String,
    },

    /// A feature declares components directly instead of under stories.
    #[error(
        "Feature '{feature}' contains direct components; components must be declared under user stories"
    )]
    DirectComponents {
        /// The offending feature.
        feature: String,
    },

    /// A feature declares no user stories.
    #[error("Feature '{feature}' has no user stories defined")]
    NoUserStories {
        /// The offending feature.
        feature: String,
    },

    /// A story declares no components.
    #[error("Feature '{feature}' user story '{story}' has no components")]
    EmptyStory {
        /// The offending feature.
        feature: String,
        /// The offending story.
        story: String,
    },

    /// The document was generated against a different extraction.
    #[error(
        "Map was generated against a different extraction (recorded fingerprint {recorded}, pool fingerprint {actual})"
    )]
    StaleFingerprint {
        /// The fingerprint recorded in the document metadata.
        recorded: String,
        /// The fingerprint of the loaded pool.
        actual: String,
    },
}

/// Scans a map document for structural problems, without touching any
/// component pool.
#[must_use]
pub fn validate(document: &MapDocument) -> Vec<MapWarning> {
    let mut warnings = Vec::new();

    for (name, def) in document.features() {
        if def.deprecated {
            warnings.push(MapWarning::DeprecatedFeature {
                feature: name.to_string(),
            });
            continue;
        }

        validate_feature(name, def, &mut warnings);
    }

    warnings
}

fn validate_feature(name: &str, def: &FeatureDef, warnings: &mut Vec<MapWarning>) {
    if def.components.is_some() {
        warnings.push(MapWarning::DirectComponents {
            feature: name.to_string(),
        });
    }

    if def.user_stories.is_empty() {
        warnings.push(MapWarning::NoUserStories {
            feature: name.to_string(),
        });
        return;
    }

    for story_def in &def.user_stories.0 {
        if story_def.components.is_empty() {
            warnings.push(MapWarning::EmptyStory {
                feature: name.to_string(),
                story: story_def.name.clone(),
            });
        }
    }
}

/// Checks whether the document was generated against the given pool
/// fingerprint.
///
/// Documents without a recorded fingerprint predate the field and pass
/// silently.
#[must_use]
pub fn check_freshness(document: &MapDocument, pool_fingerprint: &str) -> Option<MapWarning> {
    let recorded = document.metadata.fingerprint.as_deref()?;
    (recorded != pool_fingerprint).then(|| MapWarning::StaleFingerprint {
        recorded: recorded.to_string(),
        actual: pool_fingerprint.to_string(),
    })
}
