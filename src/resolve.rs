//! Reference resolution.
//!
//! Resolves a map-document reference string against a pool of extracted
//! components. Resolution is a pure function of the reference and the pool:
//! four strategies are applied in strict order and the first hit wins.
//! Within a strategy, pool iteration order breaks ties.
//!
//! 1. **Filename match** — the reference name, in filename form, against the
//!    stem of the component's source file.
//! 2. **Direct key match** — exact candidate-key equality. Substring
//!    containment is deliberately not a match.
//! 3. **Model+name fallback** — model and name equality ignoring the
//!    declared component type, recovering references mislabelled with the
//!    wrong type.
//! 4. **Filename fallback** — filename-form comparison restricted to
//!    matching types, with an allowance for placeholder models.
//!
//! Failure to resolve is an ordinary outcome ([`None`]), used by callers to
//! build "unassigned" buckets; nothing in this module errors.

use std::path::Path;

use crate::domain::{
    component::fold_model,
    reference::{filename_form, normalize},
    Component, RefParts,
};

/// Finds the component a reference points at, if any.
///
/// Deterministic and free of hidden state; see the module docs for the
/// strategy order. When two components could match the same key through
/// `name` on one and `display_name` on the other, the first in pool order
/// wins.
#[must_use]
pub fn resolve<'a>(reference: &str, pool: &'a [Component]) -> Option<&'a Component> {
    let normalized = normalize(reference);
    let parts = RefParts::parse(&normalized);

    if let Some(found) = filename_match(&parts, pool) {
        return Some(found);
    }

    if let Some(found) = direct_key_match(reference, &normalized, pool) {
        return Some(found);
    }

    // The remaining strategies re-split naively on every dot: the second
    // segment is taken as the model and the rest as the name.
    let segments: Vec<&str> = normalized.split('.').collect();
    if segments.len() < 3 {
        return None;
    }
    let kind = segments[0];
    let model_guess = segments[1];
    let name_guess = segments[2..].join(".");

    if let Some(found) = cross_type_match(model_guess, &name_guess, pool) {
        return Some(found);
    }

    filename_fallback(kind, model_guess, &name_guess, pool)
}

/// Strategy 1: match the reference name, in filename form, against the
/// component's source-file stem.
///
/// Requires type equality, and model compatibility under dot/underscore
/// folding — or a component whose model is empty or a placeholder, since
/// extraction cannot always determine the owning model of generically-typed
/// actions.
fn filename_match<'a>(parts: &RefParts, pool: &'a [Component]) -> Option<&'a Component> {
    let ref_filename = filename_form(&parts.name);
    let ref_model = parts.model.as_deref().unwrap_or("");

    pool.iter().find(|comp| {
        let Some(stem) = file_stem_lower(comp) else {
            return false;
        };
        stem == ref_filename
            && comp.component_type.as_str() == parts.kind
            && model_compatible(&comp.model, ref_model, comp)
    })
}

fn model_compatible(comp_model: &str, ref_model: &str, comp: &Component) -> bool {
    let comp_model = comp_model.to_lowercase();
    comp_model == ref_model
        || comp_model.replace('.', "_") == ref_model
        || comp_model.replace('_', ".") == ref_model
        || comp.has_placeholder_model()
        || comp_model.is_empty()
}

/// Strategy 2: exact membership of the reference in each component's
/// candidate-key set.
///
/// Equality only — a reference whose name is a strict substring of a
/// component's name must not match here.
fn direct_key_match<'a>(
    reference: &str,
    normalized: &str,
    pool: &'a [Component],
) -> Option<&'a Component> {
    let keys: Vec<Vec<String>> = pool.iter().map(component_keys).collect();

    if let Some(index) = keys
        .iter()
        .position(|k| k.iter().any(|key| key == normalized))
    {
        return pool.get(index);
    }

    let lowercased = reference.to_lowercase();
    keys.iter()
        .position(|k| k.iter().any(|key| *key == lowercased))
        .and_then(|index| pool.get(index))
}

/// Builds every key a component can be addressed by: `type.model.name` with
/// the model in its literal, underscored, and dotted spellings, and the same
/// variants using the display name when it differs. Components without a
/// model get plain `type.name` keys.
fn component_keys(comp: &Component) -> Vec<String> {
    let ty = comp.component_type.as_str();
    let mut keys = Vec::new();

    let display = (!comp.display_name.is_empty() && comp.display_name != comp.name)
        .then_some(comp.display_name.as_str());

    if comp.model.is_empty() {
        keys.push(format!("{ty}.{}", comp.name).to_lowercase());
        if let Some(display) = display {
            keys.push(format!("{ty}.{display}").to_lowercase());
        }
    } else {
        let mut models = vec![comp.model.clone()];
        let underscored = comp.model.replace('.', "_");
        if underscored != comp.model {
            models.push(underscored);
        }
        let dotted = comp.model.replace('_', ".");
        if dotted != comp.model {
            models.push(dotted);
        }

        for model in &models {
            keys.push(format!("{ty}.{model}.{}", comp.name).to_lowercase());
        }
        if let Some(display) = display {
            for model in &models {
                keys.push(format!("{ty}.{model}.{display}").to_lowercase());
            }
        }
    }

    keys
}

/// Strategy 3: model and name equality across component types.
///
/// Exists to recover references mislabelled with the wrong type in the map
/// document (an automation written down as a `server_action`, say).
fn cross_type_match<'a>(
    model_guess: &str,
    name_guess: &str,
    pool: &'a [Component],
) -> Option<&'a Component> {
    pool.iter().find(|comp| {
        let folded = if comp.model.is_empty() {
            String::new()
        } else {
            fold_model(&comp.model)
        };
        let model_matches = folded == model_guess
            || folded.replace('.', "_") == model_guess
            || folded.replace('_', ".") == model_guess;

        let name_matches = comp.name.to_lowercase() == name_guess
            || comp.display_name.to_lowercase() == name_guess;

        model_matches && name_matches
    })
}

/// Strategy 4: filename-form comparison with a placeholder-model allowance.
///
/// Entered only when everything else failed. Requires type equality; the
/// model must match under folding, or be a placeholder. The reference name
/// is compared, in filename form, against the file stem, the component name,
/// and the display name.
fn filename_fallback<'a>(
    kind: &str,
    model_guess: &str,
    name_guess: &str,
    pool: &'a [Component],
) -> Option<&'a Component> {
    let ref_filename = filename_form(name_guess);

    pool.iter().find(|comp| {
        if comp.component_type.as_str() != kind {
            return false;
        }

        let folded = if comp.model.is_empty() {
            String::new()
        } else {
            fold_model(&comp.model)
        };
        let model_matches = folded == model_guess
            || folded.replace('.', "_") == model_guess
            || folded.replace('_', ".") == model_guess;

        if !model_matches && !comp.has_placeholder_model() {
            return false;
        }

        if file_stem_lower(comp).is_some_and(|stem| stem == ref_filename) {
            return true;
        }

        let name_form = filename_form(&comp.name);
        let display_form = if comp.display_name.is_empty() {
            String::new()
        } else {
            filename_form(&comp.display_name)
        };

        ref_filename == name_form || ref_filename == display_form
    })
}

fn file_stem_lower(comp: &Component) -> Option<String> {
    comp.file_path
        .as_deref()
        .and_then(Path::file_stem)
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
}

/// Advisory fuzzy matching, for a human fixing an unresolved reference.
///
/// Never part of automatic resolution. The component type is a hard filter;
/// name similarity is then scored (exact match highest, substring
/// containment in either direction lower), ties broken by pool order.
/// Returns at most `max_suggestions` components, best first.
#[must_use]
pub fn suggest<'a>(
    reference: &str,
    pool: &'a [Component],
    max_suggestions: usize,
) -> Vec<&'a Component> {
    let normalized = normalize(reference);
    let parts = RefParts::parse(&normalized);
    let name = parts.name.as_str();

    let mut scored: Vec<(&Component, u8)> = pool
        .iter()
        .filter(|comp| comp.component_type.as_str() == parts.kind)
        .filter_map(|comp| {
            let comp_name = comp.name.to_lowercase();
            let comp_display = comp.display_name.to_lowercase();

            let score = if !name.is_empty() && (name == comp_name || name == comp_display) {
                100
            } else if !name.is_empty()
                && (comp_name.contains(name) || comp_display.contains(name))
            {
                50
            } else if (!comp_name.is_empty() && name.contains(&comp_name))
                || (!comp_display.is_empty() && name.contains(&comp_display))
            {
                25
            } else {
                0
            };

            (score > 0).then_some((comp, score))
        })
        .collect();

    // Stable sort keeps pool order within a score tier.
    scored.sort_by_key(|&(_, score)| std::cmp::Reverse(score));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(comp, _)| comp)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::domain::{Complexity, ComponentType};

    use super::*;

    fn component(id: u32, ty: ComponentType, model: &str, name: &str) -> Component {
        Component {
            id,
            name: name.to_string(),
            display_name: String::new(),
            component_type: ty,
            model: model.to_string(),
            complexity: Complexity::Simple,
            file_path: None,
        }
    }

    fn with_display(mut comp: Component, display: &str) -> Component {
        comp.display_name = display.to_string();
        comp
    }

    fn with_file(mut comp: Component, path: &str) -> Component {
        comp.file_path = Some(PathBuf::from(path));
        comp
    }

    #[test]
    fn direct_key_matches_qualified_reference() {
        let pool = vec![
            component(1, ComponentType::Field, "sale.order", "x_credit_limit"),
            component(2, ComponentType::Field, "sale.order", "x_credit_hold"),
        ];

        let found = resolve("field.sale_order.x_credit_limit", &pool).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn direct_key_accepts_both_model_spellings() {
        let pool = vec![component(
            7,
            ComponentType::Field,
            "stock.move.line",
            "x_lot_weight",
        )];

        assert_eq!(
            resolve("field.stock_move_line.x_lot_weight", &pool).unwrap().id,
            7
        );
        assert_eq!(
            resolve("field.stock.move.line.x_lot_weight", &pool).unwrap().id,
            7
        );
    }

    #[test]
    fn resolution_is_case_insensitive() {
        let pool = vec![component(
            3,
            ComponentType::ServerAction,
            "sale.order",
            "TestAction",
        )];

        let upper = resolve("SERVER_ACTION.SALE_ORDER.TestAction", &pool);
        let lower = resolve("server_action.sale_order.testaction", &pool);
        assert_eq!(upper.map(|c| c.id), Some(3));
        assert_eq!(upper.map(|c| c.id), lower.map(|c| c.id));
    }

    #[test]
    fn substring_containment_is_not_a_match() {
        let pool = vec![component(
            1,
            ComponentType::Field,
            "res.partner",
            "long_component_name_with_extra_text",
        )];

        assert!(resolve("field.res_partner.component_name", &pool).is_none());

        // And the other direction: reference name longer than the component's.
        let pool = vec![component(2, ComponentType::Field, "res.partner", "component_name")];
        assert!(
            resolve("field.res_partner.long_component_name_with_extra_text", &pool).is_none()
        );
    }

    #[test]
    fn display_name_keys_match() {
        let pool = vec![with_display(
            component(4, ComponentType::View, "product.product", "view_technical_id"),
            "Product List Customization",
        )];

        let found = resolve("view.product_product.Product List Customization", &pool).unwrap();
        assert_eq!(found.id, 4);
    }

    #[test]
    fn legacy_unqualified_reference_matches_modelless_component() {
        let pool = vec![component(9, ComponentType::Field, "", "x_legacy")];
        assert_eq!(resolve("field.x_legacy", &pool).unwrap().id, 9);
    }

    #[test]
    fn pool_order_breaks_name_vs_display_ties() {
        // One component matches by name, another by display name, on the same
        // key. Whichever comes first in the pool wins.
        let by_display = with_display(
            component(1, ComponentType::Field, "sale.order", "x_other"),
            "x_total",
        );
        let by_name = component(2, ComponentType::Field, "sale.order", "x_total");

        let pool = vec![by_display.clone(), by_name.clone()];
        assert_eq!(resolve("field.sale_order.x_total", &pool).unwrap().id, 1);

        let pool = vec![by_name, by_display];
        assert_eq!(resolve("field.sale_order.x_total", &pool).unwrap().id, 2);
    }

    #[test]
    fn cross_type_fallback_recovers_mislabelled_references() {
        let pool = vec![component(
            11,
            ComponentType::Automation,
            "sale.order",
            "Auto Update Status",
        )];

        // The map document says server_action; the component is an automation.
        let found = resolve("server_action.sale_order.Auto Update Status", &pool).unwrap();
        assert_eq!(found.id, 11);
    }

    #[test]
    fn filename_match_handles_exported_studio_names() {
        let pool = vec![with_file(
            component(21, ComponentType::ServerAction, "mrp.bom", "action_execute"),
            "extracted/source/[bom]_populate_variant_boms_(dynabraid).py",
        )];

        let found = resolve(
            "server_action.mrp_bom.[bom] Populate Variant BoMs (Dynabraid)",
            &pool,
        )
        .unwrap();
        assert_eq!(found.id, 21);
    }

    #[test]
    fn filename_match_allows_placeholder_models() {
        // Extraction could not determine the target model, so the component
        // carries the generic server-action model; the declared model in the
        // reference does not have to agree.
        let pool = vec![with_file(
            component(22, ComponentType::ServerAction, "ir.actions.server", "run_batch"),
            "src/[stock]_rebalance_quants.py",
        )];

        let found = resolve("server_action.stock_quant.[stock] Rebalance Quants", &pool).unwrap();
        assert_eq!(found.id, 22);
    }

    #[test]
    fn filename_match_requires_type_equality() {
        let pool = vec![with_file(
            component(23, ComponentType::Automation, "base.automation", "notify"),
            "src/notify_sales_team.py",
        )];

        assert!(resolve("server_action.sale_order.Notify Sales Team", &pool).is_none());
    }

    #[test]
    fn filename_fallback_compares_component_names_too() {
        // No file path on the component, but its display name in filename
        // form equals the reference's.
        let pool = vec![with_display(
            component(24, ComponentType::Automation, "base_automation", "x_auto_17"),
            "Auto Archive Old Leads",
        )];

        let found = resolve("automation.crm_lead.Auto Archive Old Leads", &pool).unwrap();
        assert_eq!(found.id, 24);
    }

    #[test]
    fn malformed_references_are_not_found() {
        let pool = vec![component(1, ComponentType::Field, "sale.order", "x_total")];
        assert!(resolve("field", &pool).is_none());
        assert!(resolve("", &pool).is_none());
        assert!(resolve("field.sale_order", &pool).is_none());
    }

    #[test]
    fn unknown_type_segment_still_resolves_by_model_and_name() {
        // The model+name fallback deliberately ignores the type segment, so
        // even an unrecognised prefix resolves when model and name agree.
        let pool = vec![component(1, ComponentType::Field, "sale.order", "x_total")];
        assert_eq!(resolve("nonsense.sale_order.x_total", &pool).unwrap().id, 1);
    }

    #[test]
    fn unresolved_reference_returns_none_without_error() {
        let pool = vec![component(1, ComponentType::Field, "sale.order", "x_total")];
        assert!(resolve("field.sale_order.x_missing", &pool).is_none());
    }

    #[test]
    fn suggest_requires_type_equality() {
        let pool = vec![
            component(1, ComponentType::Field, "sale.order", "x_total"),
            component(2, ComponentType::View, "sale.order", "x_total"),
        ];

        let suggestions = suggest("field.sale_order.x_total", &pool, 5);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].id, 1);
    }

    #[test]
    fn suggest_ranks_exact_above_substring() {
        let pool = vec![
            component(1, ComponentType::Field, "sale.order", "x_credit_limit_old"),
            component(2, ComponentType::Field, "sale.order", "x_credit_limit"),
            component(3, ComponentType::Field, "sale.order", "x_unrelated"),
        ];

        let suggestions = suggest("field.sale_order.x_credit_limit", &pool, 5);
        let ids: Vec<u32> = suggestions.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn suggest_caps_results_and_keeps_pool_order_within_a_tier() {
        let pool = vec![
            component(1, ComponentType::Field, "sale.order", "x_tag_a"),
            component(2, ComponentType::Field, "sale.order", "x_tag_b"),
            component(3, ComponentType::Field, "sale.order", "x_tag_c"),
        ];

        let suggestions = suggest("field.sale_order.x_tag", &pool, 2);
        let ids: Vec<u32> = suggestions.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
