//! Heteroatoms of Hantzsch-Widman rings and replacement ("oxa") prefixes.

use std::collections::HashMap;

use lazy_static::lazy_static;
use tracing::*;

use super::*;

use ChemEl::{B, C, N, O, S, Se, Te};

lazy_static! {
    /// Rings whose trivial Hantzsch-Widman names fix the heteroatom order
    /// when no locants are given. Keyed by the prefixes in written order and
    /// the ring size; the value is the element at each ring position.
    static ref SPECIAL_HW_RINGS: HashMap<(Vec<ChemEl>, usize), Vec<ChemEl>> = {
        let mut m = HashMap::new();
        // oxazole, thiazole, selenazole, tellurazole
        m.insert((vec![O, N], 5), vec![O, C, N, C, C]);
        m.insert((vec![S, N], 5), vec![S, C, N, C, C]);
        m.insert((vec![Se, N], 5), vec![Se, C, N, C, C]);
        m.insert((vec![Te, N], 5), vec![Te, C, N, C, C]);
        // boroxine, borazine, borthiin
        m.insert((vec![B, O], 6), vec![O, B, O, B, O, B]);
        m.insert((vec![B, N], 6), vec![N, B, N, B, N, B]);
        m.insert((vec![B, S], 6), vec![S, B, S, B, S, B]);
        m
    };
}

/// Heteroatom prefix nodes of a scope with their element and locant.
fn heteroatom_nodes(tree: &ParseTree, scope: NodeId) -> Vec<(NodeId, ChemEl, Option<String>)> {
    tree.children_of_kind(scope, |k| matches!(k, NodeKind::Heteroatom(_)))
        .into_iter()
        .filter_map(|h| match tree.kind(h) {
            NodeKind::Heteroatom(el) => Some((h, el, tree.locants(h).into_iter().next())),
            _ => None,
        })
        .collect()
}

fn set_element(state: &mut BuildState, atom: AtomId, el: ChemEl) -> Result<()> {
    if state.mgr[atom].el != C {
        return Err(ChemError::building(format!(
            "Two heteroatoms were placed at {}",
            state.mgr.describe(atom)
        )));
    }
    state.mgr[atom].el = el;
    Ok(())
}

/// The special ordering for a ring, when the name gives no locants.
pub fn special_hw_ring(prefixes: &[ChemEl], size: usize) -> Option<&'static [ChemEl]> {
    SPECIAL_HW_RINGS.get(&(prefixes.to_vec(), size)).map(Vec::as_slice)
}

/// Puts the heteroatoms of a Hantzsch-Widman ring in place: at their
/// locants, by the special ring table, or, unlocanted, in order of
/// seniority at the lowest free positions.
pub fn place_hantzsch_widman_heteroatoms(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, frag: FragId) -> Result<()> {
    let heteroatoms = heteroatom_nodes(tree, scope);
    let ring: Vec<AtomId> = state.mgr.frag(frag)?.atoms.clone();
    let unlocanted = heteroatoms.iter().all(|(_, _, l)| l.is_none());
    let prefixes: Vec<ChemEl> = heteroatoms.iter().map(|&(_, el, _)| el).collect();

    if let Some(pattern) = special_hw_ring(&prefixes, ring.len()).filter(|_| unlocanted) {
        for (&atom, &el) in ring.iter().zip(pattern) {
            state.mgr[atom].el = el;
        }
        debug!("{} uses the special ring ordering", state.mgr.frag(frag)?.token);
    } else {
        let mut pending = Vec::new();
        for (_, el, locant) in &heteroatoms {
            match locant {
                Some(l) => {
                    let atom = state.mgr.atom_by_locant_or_err(frag, l)?;
                    set_element(state, atom, *el)?;
                }
                None => pending.push(*el),
            }
        }
        // most senior heteroatom first, written order breaks ties
        pending.sort_by_key(|el| std::cmp::Reverse(el.hw_priority().unwrap_or(0)));
        for el in pending {
            let atom = ring
                .iter()
                .copied()
                .find(|&a| state.mgr[a].el == C)
                .ok_or_else(|| ChemError::building("No free ring position for a heteroatom"))?;
            state.mgr[atom].el = el;
        }
    }
    for (node, _, _) in heteroatoms {
        tree.detach(node);
    }
    Ok(())
}

/// Replacement nomenclature: "2-oxa" swaps carbon 2 for oxygen.
pub fn replace_heteroatoms(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, frag: FragId) -> Result<()> {
    for (node, el, locant) in heteroatom_nodes(tree, scope) {
        let atom = match locant {
            Some(l) => state.mgr.atom_by_locant_or_err(frag, &l)?,
            None => {
                let carbons: Vec<AtomId> = state
                    .mgr
                    .frag(frag)?
                    .atoms
                    .iter()
                    .copied()
                    .filter(|&a| state.mgr[a].el == C)
                    .collect();
                let first = *carbons
                    .first()
                    .ok_or_else(|| ChemError::building(format!("No carbon left to replace with {el}")))?;
                if !state.mgr.all_equivalent(frag, &carbons)? {
                    state.flag_ambiguity(format!("unlocanted replacement by {el}"));
                }
                first
            }
        };
        set_element(state, atom, el)?;
        trace!("{} replaced by {}", state.mgr.describe(atom), el);
        tree.detach(node);
    }
    Ok(())
}
