//! Polycyclic spiro systems made of named rings:
//! "spiro[cyclohexane-1,1'-indene]", "cyclopentanespirocyclohexane",
//! "1,1'-spirobi[indene]".

use tracing::*;

use super::*;

/// Builds one spiro component's ring on its own, modifiers included.
fn component_fragment(state: &mut BuildState, tree: &mut ParseTree, component: NodeId) -> Result<FragId> {
    resolve_scope_locants(tree, component)?;
    let group = tree.scope_group_or_err(component)?;
    let frag = group_fragment(state, tree, group)?;
    if !tree.children_of_kind(component, |k| matches!(k, NodeKind::Heteroatom(_))).is_empty() {
        if matches!(tree.kind(group), NodeKind::Group(_, Some(GroupSubType::HantzschWidman))) {
            place_hantzsch_widman_heteroatoms(state, tree, component, frag)?;
        } else {
            replace_heteroatoms(state, tree, component, frag)?;
        }
    }
    apply_group_modifiers(state, tree, component, group, frag)?;
    Ok(frag)
}

/// Makes `keep` the spiro atom: `gone`'s bonds move onto it and its
/// locants are kept alongside.
fn spiro_join(state: &mut BuildState, keep: AtomId, gone: AtomId) -> Result<()> {
    if state.mgr[keep].frag == state.mgr[gone].frag {
        return Err(ChemError::building(format!(
            "{} and {} are in the same ring and cannot be a spiro atom",
            state.mgr.describe(keep),
            state.mgr.describe(gone)
        )));
    }
    let locants = state.mgr[gone].locants.clone();
    state.mgr.replace_atom_preserving_connectivity(gone, keep)?;
    state.mgr[keep].locants.extend(locants);
    state.mgr[keep].spare_valency = false;
    trace!("spiro atom {}", state.mgr.describe(keep));
    Ok(())
}

fn atom_in(state: &BuildState, frags: &[FragId], locant: &str) -> Result<AtomId> {
    frags
        .iter()
        .find_map(|&f| state.mgr.atom_by_locant(f, locant))
        .ok_or_else(|| ChemError::building(format!("Cannot find spiro atom {locant}")))
}

fn pair(locants: &[String]) -> Result<(String, String)> {
    match locants {
        [a, b] => Ok((a.clone(), b.clone())),
        _ => Err(ChemError::component(format!(
            "A spiro junction needs two locants, {} given",
            locants.len()
        ))),
    }
}

/// "spiro[A-x,y'-B-z',w''-C]": component k is primed k times and each
/// locant pair joins it to what came before.
fn bracketed(state: &mut BuildState, tree: &mut ParseTree, node: NodeId) -> Result<Vec<FragId>> {
    let mut frags: Vec<FragId> = Vec::new();
    let mut junction: Option<Vec<String>> = None;
    for child in tree.child_vec(node) {
        match tree.kind(child) {
            NodeKind::Locant(_) => junction = Some(tree.locants(child)),
            NodeKind::SpiroComponent => {
                let frag = component_fragment(state, tree, child)?;
                state.mgr.add_primes(frag, frags.len())?;
                if !frags.is_empty() {
                    let locants = junction
                        .take()
                        .ok_or_else(|| ChemError::component_at("Spiro components must be joined by locants", tree.subtree_text(node)))?;
                    let (left, right) = pair(&locants)?;
                    let keep = atom_in(state, &frags, &left)?;
                    let gone = state.mgr.atom_by_locant_or_err(frag, &right)?;
                    spiro_join(state, keep, gone)?;
                }
                frags.push(frag);
            }
            _ => {}
        }
    }
    Ok(frags)
}

/// The spiro atom of a component without locants: "1" if free, else the
/// first CH2.
fn old_method_atom(state: &mut BuildState, frag: FragId, used: Option<AtomId>) -> Result<AtomId> {
    if let Some(one) = state.mgr.atom_by_locant(frag, "1").filter(|&a| Some(a) != used) {
        return Ok(one);
    }
    let candidates: Vec<AtomId> = state
        .mgr
        .frag(frag)?
        .atoms
        .iter()
        .copied()
        .filter(|&a| Some(a) != used && state.mgr.substitutable_hydrogens(a) >= 2)
        .collect();
    let first = *candidates
        .first()
        .ok_or_else(|| ChemError::building("No atom can be the spiro atom"))?;
    if !state.mgr.all_equivalent(frag, &candidates)? {
        state.flag_ambiguity("unlocanted spiro atom");
    }
    Ok(first)
}

/// "cyclopentanespirocyclohexane": neighbouring components share their
/// first atoms.
fn old_method(state: &mut BuildState, tree: &mut ParseTree, node: NodeId) -> Result<Vec<FragId>> {
    let mut frags: Vec<FragId> = Vec::new();
    let mut previous_spiro: Option<AtomId> = None;
    for component in tree.children_of_kind(node, |k| k == NodeKind::SpiroComponent) {
        let frag = component_fragment(state, tree, component)?;
        state.mgr.add_primes(frag, frags.len())?;
        if let Some(&last) = frags.last() {
            let keep = old_method_atom(state, last, previous_spiro)?;
            let gone = old_method_atom(state, frag, None)?;
            spiro_join(state, keep, gone)?;
            previous_spiro = Some(keep);
        }
        frags.push(frag);
    }
    Ok(frags)
}

/// "spirobi[indene]", "spiroter[...]": one component repeated.
fn repeated(state: &mut BuildState, tree: &mut ParseTree, node: NodeId, copies: usize) -> Result<Vec<FragId>> {
    let component = tree
        .children_of_kind(node, |k| k == NodeKind::SpiroComponent)
        .first()
        .copied()
        .ok_or_else(|| ChemError::component_at("Spiro system without a component", tree.text(node)))?;
    let first = component_fragment(state, tree, component)?;
    let mut frags = vec![first];
    for k in 1..copies {
        frags.push(state.mgr.copy_and_relabel(first, k)?);
    }
    let locants = match tree.attr(node, "locant") {
        Some(text) => text.to_string(),
        None if copies == 2 => "1,1'".to_string(),
        None => {
            return Err(ChemError::component_at("spiroter systems need locants", tree.text(node)));
        }
    };
    let flat: Vec<String> = locants
        .split(|c| c == ',' || c == ':')
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if flat.len() != 2 * (copies - 1) {
        return Err(ChemError::component_at(
            format!("{} locants given for {} spiro atoms", flat.len(), copies - 1),
            tree.text(node),
        ));
    }
    for (k, chunk) in flat.chunks(2).enumerate() {
        let (left, right) = pair(chunk)?;
        let keep = atom_in(state, &frags[..=k], &left)?;
        let gone = state.mgr.atom_by_locant_or_err(frags[k + 1], &right)?;
        spiro_join(state, keep, gone)?;
    }
    Ok(frags)
}

/// Builds the polycyclic spiro system of a scope, turns its node into the
/// scope's group and returns that node.
pub fn build_polycyclic_spiro(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId) -> Result<NodeId> {
    let node = tree
        .children_of_kind(scope, |k| matches!(k, NodeKind::PolyCyclicSpiro(_)))
        .first()
        .copied()
        .ok_or_else(|| ChemError::internal(format!("{scope} has neither a group nor a spiro system")))?;
    let NodeKind::PolyCyclicSpiro(spiro_type) = tree.kind(node) else {
        return Err(ChemError::internal("spiro node changed kind"));
    };
    let frags = match spiro_type {
        SpiroType::Bracketed => bracketed(state, tree, node)?,
        SpiroType::OldMethod => old_method(state, tree, node)?,
        SpiroType::Bi => repeated(state, tree, node, 2)?,
        SpiroType::Ter => repeated(state, tree, node, 3)?,
    };
    let (&first, rest) = frags
        .split_first()
        .ok_or_else(|| ChemError::component_at("Spiro system without components", tree.text(node)))?;
    for &frag in rest {
        state.mgr.incorporate_fragment(frag, first)?;
    }
    {
        let fragment = state.mgr.frag_mut(first)?;
        fragment.group_type = Some(GroupType::Ring);
        fragment.sub_type = Some(GroupSubType::PolyCyclicSpiro);
    }
    let text = tree.subtree_text(node);
    for child in tree.child_vec(node) {
        tree.detach(child);
    }
    tree.remove_attr(node, "locant");
    tree[node].kind = NodeKind::Group(GroupType::Ring, Some(GroupSubType::PolyCyclicSpiro));
    tree[node].text = text;
    state.group_frags.insert(node, first);
    debug!("spiro system {} with {} components", tree.text(node), frags.len());
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::{resolved, root_formula};

    #[test]
    fn test_bracketed_spiro() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {polyCyclicSpiro type=bracketed "spiro["
                    {spiroComponent {cyclo "cyclo"} {group type=chain subType=alkaneStem value=CCCCCC labels=numeric "hexane"}}
                    {locant "1,1'"}
                    {spiroComponent {cyclo "cyclo"} {group type=chain subType=alkaneStem value=CCCCC labels=numeric "pentane"}}}}}}}"#,
        );
        assert_eq!(root_formula(&state, &tree), "C10H18");
        let root = tree.substituents_and_roots(tree.root())[0];
        let group = tree.scope_group(root).unwrap();
        assert_eq!(tree.kind(group), NodeKind::Group(GroupType::Ring, Some(GroupSubType::PolyCyclicSpiro)));
        let frag = state.frag_of(group).unwrap();
        let spiro = state.mgr.atom_by_locant(frag, "1").unwrap();
        assert_eq!(state.mgr.degree(spiro), 4);
        assert!(state.mgr[spiro].has_locant("1'"));
    }

    #[test]
    fn test_spirobi_defaults_to_first_atoms() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {polyCyclicSpiro type=bi "spirobi"
                    {spiroComponent {cyclo "cyclo"} {group type=chain subType=alkaneStem value=CCCCC labels=numeric "pentane"}}}}}}}"#,
        );
        assert_eq!(root_formula(&state, &tree), "C9H16");
    }

    #[test]
    fn test_spiroter_needs_locants() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {polyCyclicSpiro type=ter "spiroter"
                    {spiroComponent {cyclo "cyclo"} {group type=chain subType=alkaneStem value=CCCCC labels=numeric "pentane"}}}}}}}"#,
        )
        .unwrap();
        let config = crate::config::Config::new();
        let tree = crate::normalize::normalize(tree, &config).unwrap();
        let mut state = BuildState::new(&config);
        assert!(resolve(&mut state, tree).is_err());
    }
}
