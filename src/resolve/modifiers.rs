//! Prefix and infix modifiers of a group: unsaturation, hydro prefixes,
//! indicated and added hydrogen, the lambda convention, and charge and
//! oxidation number specifiers.

use std::collections::BTreeSet;

use tracing::*;

use super::*;

fn modifier_nodes(tree: &ParseTree, scope: NodeId, pred: impl Fn(NodeKind) -> bool) -> Vec<NodeId> {
    tree.children_of_kind(scope, pred)
}

/// A locant that is an element symbol ("P" in "phosphinic") names the
/// first atom of that element.
fn atom_for_locant(state: &BuildState, frag: FragId, locant: &str) -> Result<AtomId> {
    if let Some(atom) = state.mgr.atom_by_locant(frag, locant) {
        return Ok(atom);
    }
    if let Some(el) = ChemEl::from_symbol(locant) {
        if let Some(&atom) = state.mgr.frag(frag)?.atoms.iter().find(|&&a| state.mgr[a].el == el) {
            return Ok(atom);
        }
    }
    state.mgr.atom_by_locant_or_err(frag, locant)
}

fn first_real_atom(state: &BuildState, frag: FragId) -> Result<AtomId> {
    state
        .mgr
        .frag(frag)?
        .atoms
        .iter()
        .copied()
        .find(|&a| state.mgr[a].el != ChemEl::R)
        .ok_or_else(|| ChemError::internal("fragment without atoms"))
}

pub fn apply_lambda(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, frag: FragId) -> Result<()> {
    for node in modifier_nodes(tree, scope, |k| matches!(k, NodeKind::Lambda(_))) {
        let NodeKind::Lambda(valency) = tree.kind(node) else {
            continue;
        };
        let atom = match tree.locants(node).first() {
            Some(l) => atom_for_locant(state, frag, l)?,
            None => {
                let heteroatoms: Vec<AtomId> = state
                    .mgr
                    .frag(frag)?
                    .atoms
                    .iter()
                    .copied()
                    .filter(|&a| state.mgr[a].el.is_heteroatom())
                    .collect();
                match heteroatoms[..] {
                    [only] => only,
                    _ => {
                        return Err(ChemError::component_at(
                            "Lambda convention without a locant needs exactly one heteroatom",
                            tree.text(node),
                        ))
                    }
                }
            }
        };
        state.mgr[atom].lambda = Some(valency);
        trace!("{} is lambda{}", state.mgr.describe(atom), valency);
        tree.detach(node);
    }
    Ok(())
}

pub fn apply_charge_specifiers(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, frag: FragId) -> Result<()> {
    for node in modifier_nodes(tree, scope, |k| matches!(k, NodeKind::ChargeSpecifier(_))) {
        let NodeKind::ChargeSpecifier(charge) = tree.kind(node) else {
            continue;
        };
        let atom = match tree.locants(node).first() {
            Some(l) => atom_for_locant(state, frag, l)?,
            None => first_real_atom(state, frag)?,
        };
        state.mgr[atom].charge = charge;
        tree.detach(node);
    }
    Ok(())
}

pub fn apply_oxidation_numbers(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, frag: FragId) -> Result<()> {
    for node in modifier_nodes(tree, scope, |k| matches!(k, NodeKind::OxidationNumber(_))) {
        let NodeKind::OxidationNumber(n) = tree.kind(node) else {
            continue;
        };
        let atom = match tree.locants(node).first() {
            Some(l) => atom_for_locant(state, frag, l)?,
            None => first_real_atom(state, frag)?,
        };
        state.mgr[atom].oxidation_number = Some(n);
        tree.detach(node);
    }
    Ok(())
}

/// "1H-indene" and "quinolin-2(1H)-one": the named atoms keep their
/// hydrogen when the ring's double bonds are placed.
pub fn apply_indicated_hydrogen(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, group: NodeId, frag: FragId) -> Result<()> {
    let mut locants: Vec<String> = tree
        .attr(group, "indicatedHydrogen")
        .map(|v| v.split(',').filter(|l| !l.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();
    let added = modifier_nodes(tree, scope, |k| k == NodeKind::AddedHydrogen);
    for &node in &added {
        locants.extend(tree.locants(node));
    }
    for locant in locants {
        let atom = state.mgr.atom_by_locant_or_err(frag, &locant)?;
        state.mgr[atom].keeps_hydrogen = true;
    }
    for node in added {
        tree.detach(node);
    }
    Ok(())
}

fn can_take_hydro(state: &BuildState, atom: AtomId) -> bool {
    let el = state.mgr[atom].el;
    state.mgr[atom].spare_valency && !el.is_chalcogen() && matches!(el, ChemEl::C | ChemEl::N)
}

/// Hydro prefixes remove the double bond an atom would otherwise take part in.
pub fn apply_hydro(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, frag: FragId) -> Result<()> {
    for node in modifier_nodes(tree, scope, |k| matches!(k, NodeKind::Hydro(_))) {
        let NodeKind::Hydro(hydro) = tree.kind(node) else {
            continue;
        };
        match hydro {
            HydroType::Dehydro => {
                return Err(ChemError::component_at("dehydro prefixes are not supported", tree.text(node)));
            }
            HydroType::Perhydro => {
                for atom in state.mgr.frag(frag)?.atoms.clone() {
                    state.mgr[atom].spare_valency = false;
                }
            }
            HydroType::Hydro => {
                let locants = tree.locants(node);
                if locants.is_empty() {
                    let wanted = tree.multiplier(node) as usize;
                    let eligible: Vec<AtomId> = state
                        .mgr
                        .frag(frag)?
                        .atoms
                        .iter()
                        .copied()
                        .filter(|&a| can_take_hydro(state, a))
                        .collect();
                    if eligible.len() < wanted {
                        return Err(ChemError::building(format!("{} atoms cannot be hydrogenated", wanted)));
                    }
                    if eligible.len() != wanted {
                        state.flag_ambiguity("unlocanted hydro prefix");
                    }
                    for &atom in &eligible[..wanted] {
                        state.mgr[atom].spare_valency = false;
                    }
                } else {
                    for locant in locants {
                        let atom = state.mgr.atom_by_locant_or_err(frag, &locant)?;
                        if !state.mgr[atom].spare_valency {
                            return Err(ChemError::building(format!(
                                "Hydro prefix at {} has no double bond to remove",
                                state.mgr.describe(atom)
                            )));
                        }
                        state.mgr[atom].spare_valency = false;
                    }
                }
            }
        }
        tree.detach(node);
    }
    Ok(())
}

/// The other end of the bond a locant names: "2" is the 2-3 bond, "2(7)"
/// the 2-7 bond, and in a ring the highest locant wraps round to 1.
fn bond_partner(state: &BuildState, frag: FragId, locant: &str) -> Result<(AtomId, AtomId)> {
    if let Some((first, rest)) = locant.split_once('(') {
        let second = rest.trim_end_matches(')');
        let a = state.mgr.atom_by_locant_or_err(frag, first)?;
        let b = state.mgr.atom_by_locant_or_err(frag, second)?;
        return Ok((a, b));
    }
    let a = state.mgr.atom_by_locant_or_err(frag, locant)?;
    let digits: String = locant.chars().take_while(|c| c.is_ascii_digit()).collect();
    let primes = &locant[digits.len()..];
    let n: usize = digits
        .parse()
        .map_err(|_| ChemError::building(format!("Cannot place a multiple bond at {locant}")))?;
    for next in [format!("{}{primes}", n + 1), format!("1{primes}")] {
        if let Some(b) = state.mgr.atom_by_locant(frag, &next) {
            if state.mgr.bond_between(a, b).is_some() {
                return Ok((a, b));
            }
        }
    }
    Err(ChemError::building(format!("No bond from {locant} to the next atom")))
}

fn raise_bond(state: &mut BuildState, a: AtomId, b: AtomId, order: u8) -> Result<()> {
    let bond = state
        .mgr
        .bond_between(a, b)
        .ok_or_else(|| ChemError::building(format!("{} and {} are not bonded", state.mgr.describe(a), state.mgr.describe(b))))?;
    if state.mgr.bond(bond).order != 1 {
        return Err(ChemError::building(format!(
            "The bond between {} and {} is already a multiple bond",
            state.mgr.describe(a),
            state.mgr.describe(b)
        )));
    }
    state.mgr.bond_mut(bond).order = order;
    state.mgr[a].spare_valency = false;
    state.mgr[b].spare_valency = false;
    Ok(())
}

/// Single bonds of a fragment that could become a bond of `order`, lowest
/// atoms first.
fn unsaturation_candidates(state: &BuildState, frag: FragId, order: u8) -> Result<Vec<(AtomId, AtomId)>> {
    let extra = (order - 1) as u32;
    let atoms = state.mgr.frag(frag)?.atoms.clone();
    let mut out = Vec::new();
    for (i, &a) in atoms.iter().enumerate() {
        for &b in &atoms[i + 1..] {
            if state.mgr.bond_order(a, b) == Some(1)
                && state.mgr.substitutable_hydrogens(a) >= extra
                && state.mgr.substitutable_hydrogens(b) >= extra
            {
                out.push((a, b));
            }
        }
    }
    Ok(out)
}

/// "ene" and "yne". An unlocanted one goes on the lowest available bond,
/// and is ambiguous unless every candidate bond is equivalent.
pub fn apply_unsaturators(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, frag: FragId) -> Result<()> {
    for node in modifier_nodes(tree, scope, |k| matches!(k, NodeKind::Unsaturator(_))) {
        let NodeKind::Unsaturator(order) = tree.kind(node) else {
            continue;
        };
        if order < 2 {
            tree.detach(node);
            continue;
        }
        let locants = tree.locants(node);
        if locants.is_empty() {
            for _ in 0..tree.multiplier(node) {
                let candidates = unsaturation_candidates(state, frag, order)?;
                let Some(&(a, b)) = candidates.first() else {
                    return Err(ChemError::building(format!("No bond can take the {}", tree.text(node))));
                };
                let all: Vec<AtomId> = state.mgr.frag(frag)?.atoms.clone();
                let classes = state.mgr.symmetry_classes(&all);
                let kinds: BTreeSet<(usize, usize)> = candidates
                    .iter()
                    .map(|(x, y)| {
                        let (cx, cy) = (classes.get(x).copied().unwrap_or(0), classes.get(y).copied().unwrap_or(0));
                        (cx.min(cy), cx.max(cy))
                    })
                    .collect();
                if kinds.len() > 1 {
                    state.flag_ambiguity(format!("unlocanted {}", tree.text(node)));
                }
                raise_bond(state, a, b, order)?;
            }
        } else {
            for locant in locants {
                let (a, b) = bond_partner(state, frag, &locant)?;
                raise_bond(state, a, b, order)?;
            }
        }
        tree.detach(node);
    }
    Ok(())
}

/// Applies every modifier of a scope to its freshly built group fragment.
pub fn apply_group_modifiers(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, group: NodeId, frag: FragId) -> Result<()> {
    apply_lambda(state, tree, scope, frag)?;
    apply_charge_specifiers(state, tree, scope, frag)?;
    apply_oxidation_numbers(state, tree, scope, frag)?;
    apply_indicated_hydrogen(state, tree, scope, group, frag)?;
    apply_hydro(state, tree, scope, frag)?;
    apply_unsaturators(state, tree, scope, frag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::{resolved, root_formula};

    fn root_frag(state: &BuildState, tree: &ParseTree) -> FragId {
        let root = tree.descendants_of_kind(tree.root(), |k| k == NodeKind::Root)[0];
        state.frag_of(tree.scope_group(root).unwrap()).unwrap()
    }

    #[test]
    fn test_but_2_ene() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=chain subType=alkaneStem value=CCCC labels=numeric "but"} {hyphen "-"} {locant "2"} {hyphen "-"}
                {unsaturator value=2 "ene"}}}}}"#,
        );
        let frag = root_frag(&state, &tree);
        let c2 = state.mgr.atom_by_locant(frag, "2").unwrap();
        let c3 = state.mgr.atom_by_locant(frag, "3").unwrap();
        assert_eq!(state.mgr.bond_order(c2, c3), Some(2));
        assert_eq!(root_formula(&state, &tree), "C4H8");
    }

    #[test]
    fn test_unlocanted_ethyne_is_not_ambiguous() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=chain subType=alkaneStem value=CC labels=numeric "eth"} {unsaturator value=3 "yne"}}}}}"#,
        );
        assert_eq!(root_formula(&state, &tree), "C2H2");
        assert!(!state.ambiguous);
    }

    #[test]
    fn test_unlocanted_butene_is_ambiguous() {
        let (state, _) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=chain subType=alkaneStem value=CCCC labels=numeric "but"} {unsaturator value=2 "ene"}}}}}"#,
        );
        assert!(state.ambiguous);
    }

    #[test]
    fn test_unlocanted_cyclohexene_is_not_ambiguous() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {cyclo "cyclo"} {group type=chain subType=alkaneStem value=CCCCCC labels=numeric "hex"}
                {unsaturator value=2 "ene"}}}}}"#,
        );
        assert_eq!(root_formula(&state, &tree), "C6H10");
        assert!(!state.ambiguous);
    }

    #[test]
    fn test_tetrahydronaphthalene() {
        let (mut state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {locant "1,2,3,4"} {hyphen "-"} {multiplier value=4 "tetra"} {hydro "hydro"}
                {group type=ring subType=fusedRing value=c1cccc2ccccc12 labels=1/2/3/4/4a/5/6/7/8/8a "naphthalene"}}}}}"#,
        );
        let frag = root_frag(&state, &tree);
        state.mgr.convert_spare_valencies_to_double_bonds(frag).unwrap();
        assert_eq!(root_formula(&state, &tree), "C10H12");
    }

    #[test]
    fn test_indicated_hydrogen_keeps_hydrogen() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {indicatedHydrogen "1H-"}
                {group type=ring subType=fusedRing value=C1C=Cc2ccccc12 labels=1/2/3/3a/4/5/6/7/7a "indene"}}}}}"#,
        );
        let frag = root_frag(&state, &tree);
        let c1 = state.mgr.atom_by_locant(frag, "1").unwrap();
        assert!(state.mgr[c1].keeps_hydrogen);
    }

    #[test]
    fn test_phosphinic_lambda_on_element_locant() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=nonCarboxylicAcid subType=phosphorusOxoacid value=P(=O)O labels=none "phosphin"}}}}}"#,
        );
        let frag = root_frag(&state, &tree);
        let p = state.mgr.frag(frag).unwrap().atoms[0];
        assert_eq!(state.mgr[p].lambda, Some(5));
    }

    #[test]
    fn test_dehydro_is_rejected() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {hydro value=dehydro "dehydro"}
                {group type=chain subType=alkaneStem value=CC labels=numeric "eth"} {unsaturator value=0 "ane"}}}}}"#,
        )
        .unwrap();
        let config = crate::config::Config::new();
        let tree = crate::normalize::normalize(tree, &config).unwrap();
        let mut state = BuildState::new(&config);
        assert!(resolve(&mut state, tree).is_err());
    }
}
