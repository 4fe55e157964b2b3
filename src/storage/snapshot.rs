//! Extraction snapshot fingerprinting.
//!
//! A map document is written against one particular extraction. When the
//! extraction is re-run, the document may silently drift out of date; the
//! fingerprint recorded in the document's metadata lets validation detect
//! that without comparing file contents.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};

use crate::domain::Component;

/// Calculates a stable fingerprint for a component pool.
///
/// The fingerprint hashes the ordered component identities (id, type, name,
/// model) — the attributes references resolve against. Payload details that
/// do not affect resolution (complexity, file paths) are excluded, so a
/// re-extraction that only re-scores complexity does not invalidate the map.
///
/// # Panics
///
/// Panics if borsh serialization fails (which should never happen for this
/// data structure).
#[must_use]
pub fn fingerprint(pool: &[Component]) -> String {
    #[derive(BorshSerialize)]
    struct Identity<'a> {
        id: u32,
        component_type: &'a str,
        name: &'a str,
        model: &'a str,
    }

    let identities: Vec<Identity> = pool
        .iter()
        .map(|comp| Identity {
            id: comp.id,
            component_type: comp.component_type.as_str(),
            name: &comp.name,
            model: &comp.model,
        })
        .collect();

    let encoded = borsh::to_vec(&identities).expect("this should never fail");
    let hash = Sha256::digest(encoded);
    format!("{hash:x}")
}

#[cfg(test)]
mod tests {
    use crate::domain::{Complexity, ComponentType};

    use super::*;

    fn component(id: u32, name: &str, complexity: Complexity) -> Component {
        Component {
            id,
            name: name.to_string(),
            display_name: String::new(),
            component_type: ComponentType::Field,
            model: "sale.order".to_string(),
            complexity,
            file_path: None,
        }
    }

    #[test]
    fn identical_pools_share_a_fingerprint() {
        let a = vec![component(1, "x_total", Complexity::Simple)];
        let b = vec![component(1, "x_total", Complexity::Simple)];
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn identity_changes_change_the_fingerprint() {
        let a = vec![component(1, "x_total", Complexity::Simple)];
        let renamed = vec![component(1, "x_grand_total", Complexity::Simple)];
        let extended = vec![
            component(1, "x_total", Complexity::Simple),
            component(2, "x_other", Complexity::Simple),
        ];
        assert_ne!(fingerprint(&a), fingerprint(&renamed));
        assert_ne!(fingerprint(&a), fingerprint(&extended));
    }

    #[test]
    fn rescoring_complexity_does_not_change_the_fingerprint() {
        let before = vec![component(1, "x_total", Complexity::Simple)];
        let after = vec![component(1, "x_total", Complexity::Complex)];
        assert_eq!(fingerprint(&before), fingerprint(&after));
    }

    #[test]
    fn pool_order_matters() {
        let ab = vec![
            component(1, "x_a", Complexity::Simple),
            component(2, "x_b", Complexity::Simple),
        ];
        let ba = vec![
            component(2, "x_b", Complexity::Simple),
            component(1, "x_a", Complexity::Simple),
        ];
        assert_ne!(fingerprint(&ab), fingerprint(&ba));
    }
}
