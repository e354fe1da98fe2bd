//! Ring assemblies: "biphenyl", "2,2'-bipyridine", "terphenyl".

use std::collections::{HashMap, VecDeque};

use tracing::*;

use super::*;

/// Locant pairs, one per inter-ring bond. Both `:` and `,` separate.
fn locant_pairs(text: &str, bonds: usize) -> Result<Vec<(String, String)>> {
    let flat: Vec<String> = text
        .split(|c| c == ':' || c == ',')
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if flat.len() != bonds * 2 {
        return Err(ChemError::component_at(
            format!("Ring assembly needs {} locants, {} given", bonds * 2, flat.len()),
            text,
        ));
    }
    Ok(flat.chunks(2).map(|c| (c[0].clone(), c[1].clone())).collect())
}

fn can_bond(state: &BuildState, atom: AtomId) -> bool {
    state.mgr.substitutable_hydrogens(atom) >= 1
}

/// The first atom of a ring that can take the inter-ring bond.
fn default_attachment(state: &mut BuildState, frag: FragId) -> Result<AtomId> {
    let candidates: Vec<AtomId> = state
        .mgr
        .frag(frag)?
        .atoms
        .iter()
        .copied()
        .filter(|&a| can_bond(state, a))
        .collect();
    let first = *candidates
        .first()
        .ok_or_else(|| ChemError::building("No atom of the ring assembly can be bonded"))?;
    if !state.mgr.all_equivalent(frag, &candidates)? {
        state.flag_ambiguity("unlocanted ring assembly");
    }
    Ok(first)
}

/// The bondable atom furthest from `from` within its ring; "terphenyl"
/// continues para to the previous bond.
fn furthest_from(state: &BuildState, frag: FragId, from: AtomId) -> Result<AtomId> {
    let mut distance = HashMap::from([(from, 0usize)]);
    let mut queue = VecDeque::from([from]);
    while let Some(a) = queue.pop_front() {
        for n in state.mgr.neighbours(a) {
            if state.mgr[n].frag == frag && !distance.contains_key(&n) {
                distance.insert(n, distance[&a] + 1);
                queue.push_back(n);
            }
        }
    }
    let atoms = &state.mgr.frag(frag)?.atoms;
    atoms
        .iter()
        .copied()
        .filter(|&a| a != from && can_bond(state, a))
        .max_by_key(|a| (distance.get(a).copied().unwrap_or(0), std::cmp::Reverse(a.index())))
        .ok_or_else(|| ChemError::building("No atom left to continue the ring assembly"))
}

fn find_in(state: &BuildState, frags: &[FragId], locant: &str) -> Result<AtomId> {
    frags
        .iter()
        .find_map(|&f| state.mgr.atom_by_locant(f, locant))
        .ok_or_else(|| ChemError::building(format!("Cannot find atom with locant {locant} in the ring assembly")))
}

/// Copies the ring of `frag` once per extra ring, primes each copy's
/// locants, and joins neighbouring copies with single bonds.
pub fn form_ring_assembly(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, frag: FragId) -> Result<()> {
    let Some(node) = tree.children_of_kind(scope, |k| matches!(k, NodeKind::RingAssembly(_))).first().copied() else {
        return Ok(());
    };
    let NodeKind::RingAssembly(rings) = tree.kind(node) else {
        return Err(ChemError::internal("ring assembly node changed kind"));
    };
    if rings < 2 {
        return Err(ChemError::component_at("A ring assembly needs at least two rings", tree.text(node)));
    }
    let rings = rings as usize;
    let mut copies = vec![frag];
    for k in 1..rings {
        copies.push(state.mgr.copy_and_relabel(frag, k)?);
    }

    match tree.attr(node, "locant").map(str::to_string) {
        Some(text) => {
            for (left, right) in locant_pairs(&text, rings - 1)? {
                let a = find_in(state, &copies, &left)?;
                let b = find_in(state, &copies, &right)?;
                if state.mgr[a].frag == state.mgr[b].frag {
                    return Err(ChemError::building(format!("Locants {left} and {right} are on the same ring")));
                }
                state.mgr.create_bond(a, b, 1)?;
            }
        }
        None => {
            let mut incoming: Option<AtomId> = None;
            for k in 0..rings - 1 {
                let a = match incoming {
                    None => default_attachment(state, copies[k])?,
                    Some(previous) => furthest_from(state, copies[k], previous)?,
                };
                let b = default_attachment(state, copies[k + 1])?;
                state.mgr.create_bond(a, b, 1)?;
                incoming = Some(b);
            }
        }
    }

    for &copy in &copies[1..] {
        state.mgr.incorporate_fragment(copy, frag)?;
    }
    state.mgr.frag_mut(frag)?.sub_type = Some(GroupSubType::RingAssembly);
    if let Some(group) = tree.scope_group(scope) {
        let NodeKind::Group(group_type, _) = tree.kind(group) else {
            return Err(ChemError::internal("scope group is not a group"));
        };
        tree[group].kind = NodeKind::Group(group_type, Some(GroupSubType::RingAssembly));
        let text = format!("{}{}", tree.text(node), tree.text(group));
        tree[group].text = text;
    }
    tree.detach(node);
    debug!("ring assembly of {} rings", rings);
    Ok(())
}
