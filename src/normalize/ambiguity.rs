//! Rejection of lexical splits that the surrounding tokens contradict.

use tracing::*;

use super::*;

fn skip_hyphens(tree: &ParseTree, nodes: Vec<NodeId>) -> Option<NodeId> {
    nodes.into_iter().find(|&n| tree.kind(n) != NodeKind::Hyphen)
}

fn locant_count(tree: &ParseTree, locant: NodeId) -> usize {
    match tree.attr(locant, "locant") {
        Some(l) => l.split(',').count(),
        None => split_locants(tree.text(locant)).len(),
    }
}

/// "1-tetradecyl" cannot be four decyl groups: a multiplier directly before an
/// alkane stem must agree with the locant in front of it.
pub fn check_multiplier_stem_split(tree: &ParseTree, scope: NodeId) -> Result<()> {
    for multiplier in tree.children_of_kind(scope, |k| matches!(k, NodeKind::Multiplier(_, MultiplierType::Basic))) {
        let NodeKind::Multiplier(value, _) = tree.kind(multiplier) else {
            continue;
        };
        let stem_follows = tree
            .next_sibling(multiplier)
            .map(|n| matches!(tree.kind(n), NodeKind::Group(_, Some(GroupSubType::AlkaneStem))))
            .unwrap_or(false);
        if !stem_follows {
            continue;
        }
        let Some(locant) = skip_hyphens(tree, tree.preceding_siblings(multiplier))
            .filter(|&n| matches!(tree.kind(n), NodeKind::Locant(_)))
        else {
            continue;
        };
        let count = locant_count(tree, locant);
        if count != value as usize {
            let stem = tree.next_sibling(multiplier).map(|n| tree.text(n).to_string()).unwrap_or_default();
            return Err(ChemError::component_at(
                format!(
                    "{} locant(s) cannot go with the multiplier {}; {}{} is a single stem",
                    count,
                    tree.text(multiplier),
                    tree.text(multiplier),
                    stem
                ),
                tree.subtree_text(scope),
            ));
        }
    }
    Ok(())
}

/// Total heteroatoms written between `start` and the next group, multipliers included.
fn heteroatoms_before_group(tree: &ParseTree, start: NodeId) -> (usize, Option<NodeId>) {
    let mut count = 0;
    let mut pending = 1;
    for n in tree.following_siblings(start) {
        match tree.kind(n) {
            NodeKind::Multiplier(v, _) => pending = v as usize,
            NodeKind::Heteroatom(_) => {
                count += pending;
                pending = 1;
            }
            NodeKind::Group(..) => return (count, Some(n)),
            NodeKind::Hyphen | NodeKind::Locant(_) => {}
            _ => return (count, None),
        }
    }
    (count, None)
}

/// "benzo[1,3]dioxole": a fusion bracket holding only numbers is really the
/// heteroatom locants of the Hantzsch-Widman ring after it.
pub fn convert_numeric_fusion_brackets(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for fusion in tree.children_of_kind(scope, |k| k == NodeKind::Fusion) {
        let inner = tree.text(fusion).trim_start_matches('[').trim_end_matches(']').to_string();
        let numeric = !inner.is_empty() && inner.split(',').all(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit()));
        if !numeric {
            continue;
        }
        let (count, group) = heteroatoms_before_group(tree, fusion);
        let is_hw = group
            .map(|g| matches!(tree.kind(g), NodeKind::Group(_, Some(GroupSubType::HantzschWidman))))
            .unwrap_or(false);
        let locants = inner.split(',').count();
        if !is_hw || count != locants {
            return Err(ChemError::component_at(
                format!("Fusion bracket {} does not match the {} heteroatom(s) that follow", tree.text(fusion), count),
                tree.subtree_text(scope),
            ));
        }
        let locant = tree.create(NodeKind::Locant(LocantRole::Unresolved), tree.text(fusion).to_string());
        tree.set_attr(locant, "locant", inner);
        tree.replace(fusion, locant)?;
        debug!("fusion bracket reinterpreted as heteroatom locants");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locant_contradicts_multiplier() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full
            {substituent {locant "1"} {hyphen "-"} {multiplier value=4 "tetra"}
                {group type=chain subType=alkaneStem value=CCCCCCCCCC "dec"} {suffix type=inline value=yl "yl"}}
            {root {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#;
        let tree = ParseTree::parse(text).unwrap();
        let scope = tree.substituents_and_roots(tree.root())[0];
        assert!(check_multiplier_stem_split(&tree, scope).is_err());

        let agreeing = text.replace(r#"{locant "1"}"#, r#"{locant "1,2,3,4"}"#);
        let tree = ParseTree::parse(&agreeing).unwrap();
        let scope = tree.substituents_and_roots(tree.root())[0];
        assert!(check_multiplier_stem_split(&tree, scope).is_ok());
    }

    #[test]
    fn test_numeric_fusion_bracket_becomes_locant() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {fusionPrefix value=c1ccccc1 "benzo"} {fusion "[1,3]"} {multiplier value=2 "di"}
            {heteroatom value=O "ox"} {group type=ring subType=hantzschWidman value=c1cccc1 labels=numeric "ole"}}}}}"#;
        let mut tree = ParseTree::parse(text).unwrap();
        let scope = tree.substituents_and_roots(tree.root())[0];
        convert_numeric_fusion_brackets(&mut tree, scope).unwrap();
        let locants = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Locant(_)));
        assert_eq!(tree.locants(locants[0]), vec!["1", "3"]);

        let wrong = text.replace("[1,3]", "[1,2,3]");
        let mut tree = ParseTree::parse(&wrong).unwrap();
        let scope = tree.substituents_and_roots(tree.root())[0];
        assert!(convert_numeric_fusion_brackets(&mut tree, scope).is_err());
    }
}
