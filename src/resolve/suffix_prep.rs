//! Getting suffixes ready for the rule engine: multiplied suffixes become
//! one node per occurrence, default positions are filled in, and charge
//! suffixes go last.

use tracing::*;

use super::*;
use crate::suffix::{is_terminal, rules_for, Applicability, SuffixRule};

/// Suffixes whose rules close a ring through two atoms take two locants
/// per occurrence.
fn locants_per_occurrence(applicability: Applicability, value: &str, subgroup: Option<&str>) -> usize {
    let cyclic = rules_for(applicability, value, subgroup)
        .map(|rules| {
            rules.rules.iter().any(|r| {
                matches!(r, SuffixRule::AddGroup { smiles, .. } if smiles.matches('R').count() == 2)
            })
        })
        .unwrap_or(false);
    if cyclic {
        2
    } else {
        1
    }
}

fn is_out_atom_suffix(value: &str) -> bool {
    matches!(value, "yl" | "ylidene" | "ylidyne")
}

/// The locants the group's `suffixAppliesTo` ids stand for.
fn applies_to_locants(state: &BuildState, tree: &ParseTree, group: NodeId, frag: FragId, by_default: bool) -> Result<Option<Vec<String>>> {
    let key = if by_default { "suffixAppliesToByDefault" } else { "suffixAppliesTo" };
    let Some(ids) = tree.attr(group, key) else {
        return Ok(None);
    };
    let mut locants = Vec::new();
    for id in parse_ids(ids)? {
        let atom = atom_at(&state.mgr, frag, id)?;
        let locant = state.mgr[atom]
            .first_locant()
            .ok_or_else(|| ChemError::internal(format!("{} atom {id} has no locant for its suffix", tree.text(group))))?;
        locants.push(locant.to_string());
    }
    Ok(Some(locants))
}

/// Puts the group's own suffix positions on its unlocanted suffixes.
fn apply_suffix_applies_to(state: &BuildState, tree: &mut ParseTree, group: NodeId, frag: FragId, suffixes: &[NodeId]) -> Result<()> {
    let forced = applies_to_locants(state, tree, group, frag, false)?;
    let default = applies_to_locants(state, tree, group, frag, true)?;
    for &suffix in suffixes {
        if tree.kind(suffix) == NodeKind::Suffix(SuffixType::Charge) {
            continue;
        }
        let locanted = tree.has_attr(suffix, "locant");
        let locants = match (&forced, &default) {
            (Some(l), _) => {
                if locanted && tree.locants(suffix) != *l {
                    return Err(ChemError::component_at(
                        format!("Suffix locants conflict with {}", tree.text(group)),
                        tree.text(suffix),
                    ));
                }
                l
            }
            (None, Some(l)) if !locanted => l,
            _ => continue,
        };
        let multiplier = tree.multiplier(suffix) as usize;
        if multiplier > 1 && multiplier != locants.len() {
            return Err(ChemError::component_at(
                format!("{} occurrences of a suffix that applies to {} atoms", multiplier, locants.len()),
                tree.text(suffix),
            ));
        }
        tree.set_attr(suffix, "locant", locants.join(","));
        tree.set_attr(suffix, "multiplier", locants.len().to_string());
    }
    Ok(())
}

/// One node per occurrence of a multiplied suffix, each with its share of
/// the locants.
fn expand_multiplied(tree: &mut ParseTree, suffix: NodeId, per: usize) -> Result<Vec<NodeId>> {
    let n = tree.multiplier(suffix) as usize;
    tree.remove_attr(suffix, "multiplier");
    if n <= 1 {
        return Ok(vec![suffix]);
    }
    let locants = tree.locants(suffix);
    let chunks: Vec<Vec<String>> = if locants.is_empty() {
        vec![Vec::new(); n]
    } else if locants.len() == n * per {
        locants.chunks(per).map(<[String]>::to_vec).collect()
    } else if locants.len() == n {
        locants.into_iter().map(|l| vec![l]).collect()
    } else {
        return Err(ChemError::component_at(
            format!("{} locants given for {} suffixes", locants.len(), n),
            tree.text(suffix),
        ));
    };
    let mut out = Vec::with_capacity(n);
    let mut anchor = suffix;
    for (i, chunk) in chunks.into_iter().enumerate() {
        let node = if i == 0 { suffix } else { tree.deep_copy(suffix) };
        if chunk.is_empty() {
            tree.remove_attr(node, "locant");
        } else {
            tree.set_attr(node, "locant", chunk.join(","));
        }
        if i > 0 {
            tree.insert_after(anchor, node)?;
            anchor = node;
        }
        out.push(node);
    }
    Ok(out)
}

fn highest_numeric_locant(state: &BuildState, frag: FragId) -> Result<Option<String>> {
    Ok(state
        .mgr
        .frag(frag)?
        .atoms
        .iter()
        .flat_map(|&a| state.mgr[a].locants.iter())
        .filter_map(|l| l.parse::<usize>().ok())
        .max()
        .map(|n| n.to_string()))
}

/// Chain ends for terminal and attachment suffixes: the first one goes on
/// 1, the second on the other end.
fn default_chain_ends(state: &BuildState, tree: &mut ParseTree, group: NodeId, frag: FragId, suffixes: &[NodeId]) -> Result<()> {
    if !matches!(tree.kind(group), NodeKind::Group(GroupType::Chain, _)) {
        return Ok(());
    }
    let applicability = Applicability::of(tree.kind(group));
    let Some(last) = highest_numeric_locant(state, frag)? else {
        return Ok(());
    };
    let mut ends = vec!["1".to_string(), last].into_iter();
    for &suffix in suffixes {
        let value = tree.attr_or_err(suffix, "value")?.to_string();
        if tree.has_attr(suffix, "locant") || !(is_terminal(applicability, &value) || is_out_atom_suffix(&value)) {
            continue;
        }
        match ends.next() {
            Some(end) => {
                trace!("{} defaults to chain end {}", value, end);
                tree.set_attr(suffix, "locant", end);
            }
            None => break,
        }
    }
    Ok(())
}

/// Returns the suffix nodes of a scope in the order they are to be applied.
pub fn prepare_suffixes(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, group: NodeId, frag: FragId) -> Result<Vec<NodeId>> {
    let suffixes = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Suffix(_)));
    if suffixes.is_empty() {
        return Ok(suffixes);
    }
    apply_suffix_applies_to(state, tree, group, frag, &suffixes)?;

    let applicability = Applicability::of(tree.kind(group));
    let subgroup = match tree.kind(group) {
        NodeKind::Group(_, Some(sub)) => Some(sub.tag()),
        _ => None,
    };
    let mut expanded = Vec::new();
    for suffix in suffixes {
        let value = tree.attr_or_err(suffix, "value")?.to_string();
        let per = locants_per_occurrence(applicability, &value, subgroup);
        expanded.extend(expand_multiplied(tree, suffix, per)?);
    }
    default_chain_ends(state, tree, group, frag, &expanded)?;

    let (charges, mut ordered): (Vec<NodeId>, Vec<NodeId>) = expanded
        .into_iter()
        .partition(|&s| tree.kind(s) == NodeKind::Suffix(SuffixType::Charge));
    ordered.extend(charges);
    debug!("{} suffix(es) on {}", ordered.len(), tree.text(group));
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::{resolved, root_formula};

    #[test]
    fn test_dione_expands_to_two_occurrences() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=chain subType=alkaneStem value=CCCCC labels=numeric "pentane"} {hyphen "-"}
                {locant "2,4"} {hyphen "-"} {multiplier value=2 "di"} {suffix type=root value=one "one"}}}}}"#,
        );
        let root = tree.substituents_and_roots(tree.root())[0];
        let suffixes = tree.children_of_kind(root, |k| matches!(k, NodeKind::Suffix(_)));
        assert_eq!(suffixes.len(), 2);
        assert_eq!(tree.locants(suffixes[1]), vec!["4"]);
        assert_eq!(root_formula(&state, &tree), "C5H8O2");
    }

    #[test]
    fn test_unlocanted_dioic_acid_takes_both_ends() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=chain subType=alkaneStem value=CCCC labels=numeric "butane"}
                {multiplier value=2 "di"} {suffix type=root value="oic acid" "oic acid"}}}}}"#,
        );
        assert_eq!(root_formula(&state, &tree), "C4H6O4");
        assert!(!state.ambiguous);
    }

    #[test]
    fn test_propyl_defaults_to_the_chain_end() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=substituent {word type=substituent {substituent
                {group type=chain subType=alkaneStem value=CCC labels=numeric "prop"} {suffix type=inline value=yl "yl"}}}}}"#,
        );
        let sub = tree.substituents_and_roots(tree.root())[0];
        let frag = state.frag_of(tree.scope_group(sub).unwrap()).unwrap();
        let out = state.mgr.frag(frag).unwrap().out_atoms[0].atom;
        assert!(state.mgr[out].has_locant("1"));
        assert!(!state.ambiguous);
    }

    #[test]
    fn test_suffix_applies_to_group_atoms() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=acidStem value=CC labels=1/2 suffixAppliesTo=1,2 "oxal"} {suffix type=root value=ic "ic acid"}}}}}"#,
        );
        assert_eq!(root_formula(&state, &tree), "C2H2O4");
    }

    #[test]
    fn test_charge_suffixes_go_last() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=ring subType=heteroarene value=n1ccccc1 labels=numeric "pyridin"}
                {suffix type=charge value=ium "ium"} {hyphen "-"} {locant "2"} {hyphen "-"} {suffix type=root value=amine "amine"}}}}}"#,
        );
        let root = tree.substituents_and_roots(tree.root())[0];
        let frag = state.frag_of(tree.scope_group(root).unwrap()).unwrap();
        let ring_n = state.mgr.atom_by_locant(frag, "1").unwrap();
        // the amine is placed first, so the charge still lands on the ring nitrogen
        assert_eq!(state.mgr[ring_n].charge, 1);
        assert_eq!(state.mgr.to_molecule(frag).unwrap().net_charge(), 1);
    }
}
