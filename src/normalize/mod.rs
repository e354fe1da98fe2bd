//! Rewrites the raw token tree into a canonical one: brackets structured,
//! locants canonical, stems merged, ring tokens turned into SMILES and the
//! irregular tokens corrected.

use tracing::*;

use crate::config::Config;
use crate::error::{ChemError, Result};
use crate::fragment::ChemEl;
use crate::tree::*;

mod ambiguity;
pub use ambiguity::*;

mod brackets;
pub use brackets::*;

mod irregular;
pub use irregular::*;

mod locants;
pub use locants::*;

mod rings;
pub use rings::*;

mod stems;
pub use stems::*;

/// Every scope a group lives in, spiro components included.
fn scopes(tree: &ParseTree) -> Vec<NodeId> {
    let mut out = tree.substituents_and_roots(tree.root());
    out.extend(tree.descendants_of_kind(tree.root(), |k| k == NodeKind::SpiroComponent));
    out
}

fn normalize_scope(tree: &mut ParseTree, scope: NodeId, config: &Config) -> Result<()> {
    check_multiplier_stem_split(tree, scope)?;
    convert_numeric_fusion_brackets(tree, scope)?;

    merge_alkane_stems(tree, scope)?;
    apply_stem_modifiers(tree, scope)?;
    build_hetero_chains(tree, scope)?;

    process_cyclo(tree, scope)?;
    process_annulenes(tree, scope)?;
    process_hydrocarbon_families(tree, scope)?;
    process_von_baeyer(tree, scope)?;
    process_spiro(tree, scope)?;

    apply_irregularities(tree, scope, config)
}

/// Every substituent and root holds exactly one group (or one polycyclic
/// spiro system), and every spiro component exactly one group.
pub fn check_groups(tree: &ParseTree) -> Result<()> {
    for scope in tree.substituents_and_roots(tree.root()) {
        let groups = tree.children_of_kind(scope, |k| k.is_group() || matches!(k, NodeKind::PolyCyclicSpiro(_)));
        if groups.len() != 1 {
            return Err(ChemError::component_at(
                format!("Expected one group in {}, found {}", scope, groups.len()),
                tree.subtree_text(scope),
            ));
        }
    }
    for component in tree.descendants_of_kind(tree.root(), |k| k == NodeKind::SpiroComponent) {
        if tree.children_of_kind(component, |k| k.is_group()).len() != 1 {
            return Err(ChemError::component_at(
                "Spiro component must hold exactly one ring",
                tree.subtree_text(component),
            ));
        }
    }
    Ok(())
}

#[instrument(skip_all, fields(words = tree.words().len()))]
pub fn normalize(tree: ParseTree, config: &Config) -> Result<ParseTree> {
    let tree = structure_brackets(tree)?;
    let mut tree = canonicalize_locants(tree)?;
    for scope in scopes(&tree) {
        normalize_scope(&mut tree, scope, config)?;
    }
    check_groups(&tree)?;
    debug!("normalized tree:\n{}", tree);
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclohexane() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {cyclo "cyclo"} {group type=chain subType=alkaneStem value=CCCCCC labels=numeric "hex"}
                {unsaturator value=0 "ane"}}}}}"#,
        )
        .unwrap();
        let tree = normalize(tree, &Config::new()).unwrap();
        let group = tree.descendants_of_kind(tree.root(), |k| k.is_group())[0];
        assert_eq!(tree.attr(group, "value"), Some("C1CCCCC1"));
        assert_eq!(tree.kind(group), NodeKind::Group(GroupType::Ring, Some(GroupSubType::Cycloalkane)));
        assert_eq!(tree.text(group), "cyclohex");
    }

    #[test]
    fn test_small_cyclo_is_rejected() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {cyclo "cyclo"} {group type=chain subType=alkaneStem value=CC labels=numeric "eth"}
                {unsaturator value=0 "ane"}}}}}"#,
        )
        .unwrap();
        assert!(matches!(
            normalize(tree, &Config::new()),
            Err(ChemError::ComponentGeneration { .. })
        ));
    }

    #[test]
    fn test_bicycloheptane() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {multiplier value=2 type=VonBaeyer "bi"} {vonBaeyer "cyclo[2.2.1]"}
                {group type=chain subType=alkaneStem value=CCCCCCC labels=numeric "hept"}
                {unsaturator value=0 "ane"}}}}}"#,
        )
        .unwrap();
        let tree = normalize(tree, &Config::new()).unwrap();
        let root = tree.substituents_and_roots(tree.root())[0];
        let kinds: Vec<NodeKind> = tree.children(root).iter().map(|&c| tree.kind(c)).collect();
        assert_eq!(kinds.len(), 2);
        let group = tree.scope_group(root).unwrap();
        assert_eq!(tree.kind(group), NodeKind::Group(GroupType::Ring, Some(GroupSubType::VonBaeyer)));
        assert_eq!(tree.text(group), "bicyclo[2.2.1]hept");
    }

    #[test]
    fn test_wrong_bridge_sum_is_rejected() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {multiplier value=2 type=VonBaeyer "bi"} {vonBaeyer "cyclo[2.2.2]"}
                {group type=chain subType=alkaneStem value=CCCCCCC labels=numeric "hept"}
                {unsaturator value=0 "ane"}}}}}"#,
        )
        .unwrap();
        let err = normalize(tree, &Config::new()).unwrap_err();
        assert!(matches!(err, ChemError::ComponentGeneration { .. }));
    }

    #[test]
    fn test_tetracene_family() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {multiplier value=4 type=group "tetra"}
                {group type=ring subType=hydrocarbonFusedRingSystem value=acene "cene"}}}}}"#,
        )
        .unwrap();
        let tree = normalize(tree, &Config::new()).unwrap();
        let group = tree.descendants_of_kind(tree.root(), |k| k.is_group())[0];
        assert_eq!(tree.attr(group, "labels"), Some("none"));
        assert_eq!(tree.attr(group, "value").map(|v| v.matches('c').count()), Some(18));
    }

    #[test]
    fn test_group_count_is_checked() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root {unsaturator value=0 "ane"}}}}}"#,
        )
        .unwrap();
        assert!(normalize(tree, &Config::new()).is_err());
    }
}
