//! Substitutive assembly inside a word or bracket: every substituent is
//! bonded to the group it substitutes, working left to right so that a
//! substituent is complete before it is attached.

use tracing::*;

use super::*;

/// The fragments a scope stands for: one per copy when it is multiplied.
#[derive(Debug, Clone)]
struct Scope {
    node: NodeId,
    frags: Vec<FragId>,
}

/// Takes the first pending attachment point off a fragment.
pub fn take_out_atom(state: &mut BuildState, frag: FragId) -> Result<OutAtom> {
    let fragment = state.mgr.frag_mut(frag)?;
    if fragment.out_atoms.is_empty() {
        let token = fragment.token.clone();
        return Err(ChemError::building(format!("{token} has no free attachment point")));
    }
    Ok(fragment.out_atoms.remove(0))
}

/// Bonds the first out atom of `sub` to `atom` with the out atom's valency.
pub fn bond_out_atom(state: &mut BuildState, sub: FragId, atom: AtomId) -> Result<()> {
    let out = take_out_atom(state, sub)?;
    if !(1..=3).contains(&out.valency) {
        return Err(ChemError::building(format!(
            "Cannot form a bond of order {} from {}",
            out.valency,
            state.mgr.describe(out.atom)
        )));
    }
    trace!("{} -> {}", state.mgr.describe(out.atom), state.mgr.describe(atom));
    state.mgr.create_bond(out.atom, atom, out.valency as u8)?;
    Ok(())
}

/// Copies of a fragment, the original first.
pub fn multiply_fragment(state: &mut BuildState, frag: FragId, copies: usize) -> Result<Vec<FragId>> {
    let mut out = vec![frag];
    for _ in 1..copies {
        out.push(state.mgr.copy_fragment(frag)?.0);
    }
    Ok(out)
}

fn has_substitutable_atom(state: &BuildState, frag: FragId, valency: u32) -> Result<bool> {
    Ok(state.mgr.frag(frag)?.atoms.iter().any(|&a| {
        let atom = &state.mgr[a];
        atom.el != ChemEl::R && !atom.characteristic && state.mgr.substitutable_hydrogens(a) >= valency
    }))
}

fn first_out_valency(state: &BuildState, frag: FragId) -> Result<u32> {
    let fragment = state.mgr.frag(frag)?;
    fragment
        .out_atoms
        .first()
        .map(|o| o.valency)
        .ok_or_else(|| ChemError::building(format!("{} has no free attachment point", fragment.token)))
}

fn attach_at_locant(state: &mut BuildState, sub: FragId, locant: &str, targets: &[FragId]) -> Result<()> {
    let Some((target, atom)) = targets
        .iter()
        .find_map(|&f| state.mgr.atom_by_locant(f, locant).map(|a| (f, a)))
    else {
        let token = state.mgr.frag(sub)?.token.clone();
        return Err(ChemError::building(format!("Cannot find atom with locant {locant} to attach {token} to")));
    };
    bond_out_atom(state, sub, atom)?;
    state.mgr.incorporate_fragment(sub, target)
}

/// Unlocanted: the parent of the scope first (the `k`th copy of it for the
/// `k`th copy of the substituent), then anything else to the right.
fn attach_unlocanted(state: &mut BuildState, sub: FragId, parents: &[FragId], k: usize, targets: &[FragId]) -> Result<()> {
    let valency = first_out_valency(state, sub)?;
    let mut order: Vec<FragId> = parents.to_vec();
    if !order.is_empty() {
        let len = order.len();
        order.rotate_left(k % len);
    }
    order.extend(targets.iter().copied().filter(|f| !parents.contains(f)));
    for target in order {
        if has_substitutable_atom(state, target, valency)? {
            let atom = find_atom_for_substitution(state, target, valency)?;
            bond_out_atom(state, sub, atom)?;
            return state.mgr.incorporate_fragment(sub, target);
        }
    }
    let token = state.mgr.frag(sub)?.token.clone();
    Err(ChemError::building(format!("Nowhere to attach {token}")))
}

/// "1,4-epoxy": one substituent, one locant per out atom, all in one group.
fn bridge(state: &mut BuildState, sub: FragId, locants: &[String], targets: &[FragId]) -> Result<()> {
    let target = targets
        .iter()
        .copied()
        .find(|&f| locants.iter().all(|l| state.mgr.atom_by_locant(f, l).is_some()))
        .ok_or_else(|| ChemError::building(format!("No group holds all of the locants {}", locants.join(","))))?;
    for locant in locants {
        let atom = state.mgr.atom_by_locant_or_err(target, locant)?;
        bond_out_atom(state, sub, atom)?;
    }
    debug!("bridge across {}", locants.join(","));
    state.mgr.incorporate_fragment(sub, target)
}

fn substitute(state: &mut BuildState, tree: &ParseTree, index: usize, scopes: &[Scope]) -> Result<()> {
    let node = scopes[index].node;
    let multiplier = tree.multiplier(node) as usize;
    let locants = tree.locants(node);
    let frag = scopes[index].frags[0];
    let targets: Vec<FragId> = scopes[index + 1..].iter().flat_map(|s| s.frags.iter().copied()).collect();
    let parents = scopes.last().map(|s| s.frags.clone()).unwrap_or_default();

    let out_count = state.mgr.frag(frag)?.out_atoms.len();
    if multiplier == 1 && locants.len() > 1 && locants.len() == out_count {
        return bridge(state, frag, &locants, &targets);
    }
    if !locants.is_empty() && locants.len() != multiplier {
        return Err(ChemError::component_at(
            format!("{} locants given for {} substituent(s)", locants.len(), multiplier),
            tree.subtree_text(node),
        ));
    }
    for (k, copy) in multiply_fragment(state, frag, multiplier)?.into_iter().enumerate() {
        match locants.get(k) {
            Some(locant) => attach_at_locant(state, copy, locant, &targets)?,
            None => attach_unlocanted(state, copy, &parents, k, &targets)?,
        }
    }
    Ok(())
}

/// "methylenedibenzene": the linker's out atoms go one to each copy of the
/// root, at the multiplicative locants when given.
fn link_multiplied(state: &mut BuildState, tree: &ParseTree, linker: &Scope, root: &Scope) -> Result<()> {
    let frag = linker.frags[0];
    let locants: Vec<String> = tree
        .attr(root.node, "multiplicativeLocant")
        .map(|t| t.split(',').filter(|l| !l.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();
    if !locants.is_empty() && locants.len() != root.frags.len() {
        return Err(ChemError::component_at(
            format!("{} multiplicative locants for {} parents", locants.len(), root.frags.len()),
            tree.subtree_text(root.node),
        ));
    }
    for (k, &copy) in root.frags.iter().enumerate() {
        let atom = match locants.get(k) {
            Some(l) => state.mgr.atom_by_locant_or_err(copy, l)?,
            None => {
                let valency = first_out_valency(state, frag)?;
                find_atom_for_substitution(state, copy, valency)?
            }
        };
        bond_out_atom(state, frag, atom)?;
    }
    state.mgr.incorporate_fragment(frag, root.frags[0])?;
    for &copy in &root.frags[1..] {
        state.mgr.incorporate_fragment(copy, root.frags[0])?;
    }
    debug!("{} parents joined by {}", root.frags.len(), tree.subtree_text(linker.node));
    Ok(())
}

fn scope_fragment(state: &mut BuildState, tree: &ParseTree, scope: NodeId) -> Result<FragId> {
    match tree.kind(scope) {
        NodeKind::Bracket(_) => match build_container(state, tree, scope)?.as_slice() {
            [single] => Ok(*single),
            _ => Err(ChemError::component_at(
                "A bracket must describe a single substituent",
                tree.subtree_text(scope),
            )),
        },
        _ => state.frag_of(tree.scope_group_or_err(scope)?),
    }
}

/// Builds the scopes of a word or bracket into the fragment(s) of its last
/// scope. More than one fragment comes back only for a multiplied parent
/// with nothing linking its copies ("disodium").
pub fn build_container(state: &mut BuildState, tree: &ParseTree, container: NodeId) -> Result<Vec<FragId>> {
    let nodes = tree.children_of_kind(container, |k| k.is_scope());
    if nodes.is_empty() {
        return Err(ChemError::internal(format!(
            "<{}> {} holds no substituent or root",
            tree.kind(container).tag(),
            container
        )));
    }
    let mut scopes = Vec::with_capacity(nodes.len());
    for &node in &nodes {
        scopes.push(Scope {
            node,
            frags: vec![scope_fragment(state, tree, node)?],
        });
    }

    let last = scopes.len() - 1;
    let parent_copies = tree.multiplier(nodes[last]) as usize;
    let mut linker = None;
    if parent_copies > 1 {
        let original = scopes[last].frags[0];
        for k in 1..parent_copies {
            let copy = state.mgr.copy_and_relabel(original, k)?;
            scopes[last].frags.push(copy);
        }
        let links = last > 0
            && tree.multiplier(nodes[last - 1]) == 1
            && state.mgr.frag(scopes[last - 1].frags[0])?.out_atoms.len() == parent_copies;
        if links {
            linker = Some(last - 1);
        } else if tree.kind(nodes[last]) == NodeKind::Root {
            info!("{} unlinked copies of {}", parent_copies, tree.subtree_text(nodes[last]));
            state.explicit_stoichiometry = true;
        }
    }

    for i in 0..last {
        if Some(i) == linker {
            link_multiplied(state, tree, &scopes[i], &scopes[last])?;
            scopes[last].frags.truncate(1);
        } else {
            substitute(state, tree, i, &scopes)?;
        }
    }
    Ok(scopes[last].frags.clone())
}

/// The fragment(s) a word builds.
pub fn build_word(state: &mut BuildState, tree: &ParseTree, word: NodeId) -> Result<Vec<FragId>> {
    let frags = build_container(state, tree, word)?;
    trace!("word {} -> {} fragment(s)", tree.subtree_text(word), frags.len());
    Ok(frags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::tests::built;

    #[test]
    fn test_locanted_substituent() {
        let molecule = built(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "2"} {hyphen "-"} {group type=chain subType=alkaneStem value=C labels=numeric "meth"} {suffix type=inline value=yl "yl"}}
                {root {group type=chain subType=alkaneStem value=CCCC labels=numeric "but"} {unsaturator value=0 "ane"}}}}}"#,
        );
        assert_eq!(molecule.formula(), "C5H12");
        let c2 = molecule.atom_with_locant("2").unwrap();
        assert_eq!(molecule.degree(c2), 3);
    }

    #[test]
    fn test_multiplied_substituents_are_copied() {
        let molecule = built(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "1,2"} {hyphen "-"} {multiplier value=2 "di"} {group type=substituent value=Cl labels=none outIDs=1 "chloro"}}
                {root {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        );
        assert_eq!(molecule.formula(), "C6H4Cl2");
        let c1 = molecule.atom_with_locant("1").unwrap();
        let c2 = molecule.atom_with_locant("2").unwrap();
        assert_eq!(molecule.degree(c1), 3);
        assert_eq!(molecule.degree(c2), 3);
    }

    #[test]
    fn test_unlocanted_substituent_goes_on_the_parent() {
        let molecule = built(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {group type=substituent value=Cl labels=none outIDs=1 "chloro"}}
                {root {group type=chain subType=alkaneStem value=C labels=numeric "meth"} {unsaturator value=0 "ane"}}}}}"#,
        );
        assert_eq!(molecule.formula(), "CH3Cl");
    }

    #[test]
    fn test_bracket_is_built_first() {
        // (2-chloroethyl)benzene
        let molecule = built(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {openBracket "("} {locant "2"} {hyphen "-"} {group type=substituent value=Cl labels=none outIDs=1 "chloro"}}
                {substituent {group type=chain subType=alkaneStem value=CC labels=numeric "eth"} {suffix type=inline value=yl "yl"} {closeBracket ")"}}
                {root {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        );
        assert_eq!(molecule.formula(), "C8H9Cl");
        let cl = molecule.atoms().find(|&a| molecule.atom(a).el == ChemEl::Cl).unwrap();
        let carbon = molecule.neighbours(cl)[0];
        // the chlorine sits on the far end of the ethyl, away from the ring
        assert_eq!(molecule.atom(carbon).hydrogens, 2);
        assert!(molecule.neighbours(carbon).iter().all(|&n| molecule.atom(n).hydrogens == 2 || n == cl));
    }

    #[test]
    fn test_multiplicative_root() {
        // 1,1'-oxydibenzene
        let molecule = built(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "1,1'"} {hyphen "-"} {group type=substituent value=O labels=none outIDs=1,1 "oxy"}}
                {root {multiplier value=2 "di"} {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        );
        assert_eq!(molecule.formula(), "C12H10O");
        assert_eq!(molecule.component_count(), 1);
    }

    #[test]
    fn test_unlinked_multiplied_root() {
        let tree = crate::tree::ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {root {multiplier value=2 "di"} {group type=elementaryAtom subType=metal value=[Na] labels=none "sodium"}}}}}"#,
        )
        .unwrap();
        let config = crate::config::Config::new();
        let tree = crate::normalize::normalize(tree, &config).unwrap();
        let mut state = BuildState::new(&config);
        let tree = crate::resolve::resolve(&mut state, tree).unwrap();
        let word = tree.words()[0];
        let frags = build_word(&mut state, &tree, word).unwrap();
        assert_eq!(frags.len(), 2);
        assert!(state.explicit_stoichiometry);
    }
}
