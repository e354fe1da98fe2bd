//! Benzo fusion onto a monocycle ("benzofuran", "benzo[b]thiophene",
//! "1,3-benzodioxole") and the peripheral renumbering of the result.

use tracing::*;

use super::*;

const BENZO: &str = "c1ccccc1";

/// The ring bond a fusion letter names: `a` is 1-2, `b` is 2-3 ...
fn lettered_bond(state: &BuildState, frag: FragId, letter: char, size: usize) -> Result<(AtomId, AtomId)> {
    let index = (letter as u8).wrapping_sub(b'a') as usize;
    if !letter.is_ascii_lowercase() || index >= size {
        return Err(ChemError::component_at("Fusion letter outside the ring", letter.to_string()));
    }
    let first = state.mgr.atom_by_locant_or_err(frag, &(index + 1).to_string())?;
    let second = state.mgr.atom_by_locant_or_err(frag, &((index + 1) % size + 1).to_string())?;
    Ok((first, second))
}

/// Without a letter benzo goes on the first carbon-carbon bond whose atoms
/// both carry hydrogen.
fn default_fusion_bond(state: &BuildState, frag: FragId, size: usize) -> Result<(AtomId, AtomId)> {
    for i in 1..=size {
        let (Some(a), Some(b)) = (
            state.mgr.atom_by_locant(frag, &i.to_string()),
            state.mgr.atom_by_locant(frag, &(i % size + 1).to_string()),
        ) else {
            continue;
        };
        let fusable = |x: AtomId| state.mgr[x].el == ChemEl::C && state.mgr.substitutable_hydrogens(x) >= 1;
        if fusable(a) && fusable(b) && state.mgr.bond_between(a, b).is_some() {
            return Ok((a, b));
        }
    }
    Err(ChemError::building("No bond available for benzo fusion"))
}

/// Atoms of the ring walked from `from` to `to` the long way round.
fn ring_path(state: &BuildState, from: AtomId, to: AtomId) -> Result<Vec<AtomId>> {
    let mut path = vec![from];
    let mut previous = to;
    let mut current = from;
    while current != to || path.len() == 1 {
        let next = state
            .mgr
            .neighbours(current)
            .into_iter()
            .find(|&n| n != previous && !(current == from && n == to))
            .ok_or_else(|| ChemError::internal("monocycle is not a closed ring"))?;
        previous = current;
        current = next;
        path.push(current);
        if path.len() > state.mgr.frag(state.mgr[from].frag)?.atoms.len() + 1 {
            return Err(ChemError::internal("ring walk did not close"));
        }
    }
    Ok(path)
}

/// One candidate numbering of the fused bicycle: the atom order around the
/// periphery and the two fusion atoms.
struct Numbering {
    locants: Vec<(AtomId, String)>,
}

impl Numbering {
    /// `first` and `second` are the non-fusion atoms of each ring in the
    /// order they are numbered; `join` follows `first`, `close` follows `second`.
    fn new(first: &[AtomId], join: AtomId, second: &[AtomId], close: AtomId) -> Self {
        let mut locants = Vec::new();
        for (i, &a) in first.iter().enumerate() {
            locants.push((a, (i + 1).to_string()));
        }
        locants.push((join, format!("{}a", first.len())));
        for (i, &a) in second.iter().enumerate() {
            locants.push((a, (first.len() + i + 1).to_string()));
        }
        locants.push((close, format!("{}a", first.len() + second.len())));
        Numbering { locants }
    }

    /// Lower is better: heteroatom locants as a set, then the more senior
    /// heteroatom on the lower locant.
    fn score(&self, state: &BuildState) -> (Vec<usize>, Vec<std::cmp::Reverse<u32>>) {
        let mut hetero: Vec<(usize, u32)> = self
            .locants
            .iter()
            .filter(|(a, _)| state.mgr[*a].el.is_heteroatom())
            .filter_map(|(a, l)| l.parse::<usize>().ok().map(|n| (n, state.mgr[*a].el.hw_priority().unwrap_or(0))))
            .collect();
        hetero.sort();
        (
            hetero.iter().map(|&(n, _)| n).collect(),
            hetero.iter().map(|&(_, p)| std::cmp::Reverse(p)).collect(),
        )
    }
}

/// Chooses the numbering of a benzo fused bicycle: the smaller ring is
/// numbered first, then heteroatoms get the lowest locants.
pub fn peripheral_numbering(state: &BuildState, fa: AtomId, fb: AtomId, mono: &[AtomId], benzo: &[AtomId]) -> Vec<(AtomId, String)> {
    let reversed = |v: &[AtomId]| v.iter().rev().copied().collect::<Vec<_>>();
    let mut rings: Vec<&[AtomId]> = vec![mono, benzo];
    rings.sort_by_key(|r| r.len());
    let first_choices: Vec<usize> = if mono.len() == benzo.len() { vec![0, 1] } else { vec![0] };

    let mut candidates = Vec::new();
    for &i in &first_choices {
        let first = rings[i];
        let second = rings[1 - i];
        // both paths run from fa to fb
        candidates.push(Numbering::new(first, fb, &reversed(second), fa));
        candidates.push(Numbering::new(&reversed(first), fa, second, fb));
    }
    candidates
        .into_iter()
        .min_by_key(|n| n.score(state))
        .map(|n| n.locants)
        .unwrap_or_default()
}

/// Fuses a benzene ring onto the monocycle of `frag` and renumbers the
/// bicycle.
pub fn benzo_fuse(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId, group: NodeId, frag: FragId) -> Result<()> {
    let prefixes = tree.children_of_kind(scope, |k| k == NodeKind::FusionPrefix);
    let [prefix] = prefixes[..] else {
        return Err(ChemError::component_at("Only a single benzo prefix can be fused", tree.subtree_text(scope)));
    };
    if tree.attr(prefix, "value").unwrap_or(BENZO) != BENZO {
        return Err(ChemError::component_at("Only benzo fusion is supported", tree.text(prefix)));
    }
    let ring: Vec<AtomId> = state.mgr.frag(frag)?.atoms.clone();
    if ring.iter().any(|&a| state.mgr.degree(a) != 2) {
        return Err(ChemError::component_at("Benzo can only be fused onto a monocycle", tree.subtree_text(scope)));
    }
    let size = ring.len();
    let fusion = tree.children_of_kind(scope, |k| k == NodeKind::Fusion).first().copied();
    let letter = fusion.and_then(|f| tree.text(f).trim_matches(|c| c == '[' || c == ']').chars().next());
    let (fa, fb) = match letter {
        Some(l) => lettered_bond(state, frag, l, size)?,
        None => default_fusion_bond(state, frag, size)?,
    };

    let path = ring_path(state, fa, fb)?;
    let mono: Vec<AtomId> = path[1..path.len() - 1].to_vec();
    let mut benzo = Vec::with_capacity(4);
    for _ in 0..4 {
        let atom = state.mgr.create_atom(ChemEl::C, frag)?;
        state.mgr[atom].spare_valency = true;
        benzo.push(atom);
    }
    state.mgr.create_bond(fa, benzo[0], 1)?;
    for pair in benzo.windows(2) {
        state.mgr.create_bond(pair[0], pair[1], 1)?;
    }
    state.mgr.create_bond(benzo[3], fb, 1)?;
    state.mgr[fa].spare_valency = true;
    state.mgr[fb].spare_valency = true;

    let numbering = peripheral_numbering(state, fa, fb, &mono, &benzo);
    for &a in ring.iter().chain(&benzo) {
        state.mgr[a].locants.clear();
    }
    for (atom, locant) in numbering {
        state.mgr[atom].locants.push(locant);
    }

    state.mgr.frag_mut(frag)?.sub_type = Some(GroupSubType::FusedRing);
    let text = format!("{}{}", tree.text(prefix), tree.text(group));
    tree[group].text = text;
    tree[group].kind = NodeKind::Group(GroupType::Ring, Some(GroupSubType::FusedRing));
    tree.detach(prefix);
    if let Some(f) = fusion {
        tree.detach(f);
    }
    debug!("benzo fused onto a {}-membered ring", size);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::{resolved, root_formula};

    fn fused(text: &str) -> (BuildState, FragId) {
        let (state, tree) = resolved(text);
        let root = tree.substituents_and_roots(tree.root())[0];
        let frag = state.frag_of(tree.scope_group(root).unwrap()).unwrap();
        (state, frag)
    }

    #[test]
    fn test_indole_numbering() {
        let (state, frag) = fused(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {fusionPrefix value=c1ccccc1 "benzo"}
                {group type=ring subType=heteroarene value=n1cccc1 labels=numeric "pyrrole"}}}}}"#,
        );
        let n = state.mgr.atom_by_locant(frag, "1").unwrap();
        assert_eq!(state.mgr[n].el, ChemEl::N);
        assert!(state.mgr.atom_by_locant(frag, "3a").is_some());
        assert!(state.mgr.atom_by_locant(frag, "7a").is_some());
        assert_eq!(state.mgr.frag(frag).unwrap().atoms.len(), 9);
    }

    #[test]
    fn test_quinoline_from_lettered_fusion() {
        let (state, frag) = fused(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {fusionPrefix value=c1ccccc1 "benzo"} {fusion "[b]"}
                {group type=ring subType=heteroarene value=n1ccccc1 labels=numeric "pyridine"}}}}}"#,
        );
        let n = state.mgr.atom_by_locant(frag, "1").unwrap();
        assert_eq!(state.mgr[n].el, ChemEl::N);
        assert!(state.mgr.atom_by_locant(frag, "4a").is_some());
        assert!(state.mgr.atom_by_locant(frag, "8a").is_some());
    }

    #[test]
    fn test_benzodioxole() {
        let (state, tree) = resolved(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {locant "1,3"} {hyphen "-"} {fusionPrefix value=c1ccccc1 "benzo"} {multiplier value=2 "di"}
                {heteroatom value=O "ox"} {group type=ring subType=hantzschWidman value=c1cccc1 labels=numeric "ole"}}}}}"#,
        );
        let mut state = state;
        let root = tree.substituents_and_roots(tree.root())[0];
        let frag = state.frag_of(tree.scope_group(root).unwrap()).unwrap();
        for l in ["1", "3"] {
            let o = state.mgr.atom_by_locant(frag, l).unwrap();
            assert_eq!(state.mgr[o].el, ChemEl::O);
        }
        state.mgr.convert_spare_valencies_to_double_bonds(frag).unwrap();
        assert_eq!(root_formula(&state, &tree), "C7H6O2");
    }
}
