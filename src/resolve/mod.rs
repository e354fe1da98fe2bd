//! Per word resolution: every locant finds its target, every group becomes
//! a fragment, and suffixes are applied to it.
//!
//! Substituents are not attached to each other here; that is left to the
//! word rules in `build`.

use tracing::*;

use crate::build::{BuildState, PendingStereo};
use crate::error::{ChemError, Result};
use crate::fragment::{AtomId, ChemEl, FragId, FragmentManager, Labels};
use crate::suffix::apply_suffixes;
use crate::tree::*;

mod locants;
pub use locants::*;

mod brackets;
pub use brackets::*;

mod hantzsch;
pub use hantzsch::*;

mod fusion;
pub use fusion::*;

mod assembly;
pub use assembly::*;

mod spiro;
pub use spiro::*;

mod modifiers;
pub use modifiers::*;

mod suffix_prep;
pub use suffix_prep::*;

/// Parses an atom id list such as `1,3` (1 based).
pub fn parse_ids(text: &str) -> Result<Vec<usize>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse()
                .map_err(|_| ChemError::TreeFormat(format!("bad atom id '{t}'")))
        })
        .collect()
}

/// The `id`th atom (1 based) of a fragment.
pub fn atom_at(mgr: &FragmentManager, frag: FragId, id: usize) -> Result<AtomId> {
    let fragment = mgr.frag(frag)?;
    id.checked_sub(1)
        .and_then(|i| fragment.atoms.get(i))
        .copied()
        .ok_or_else(|| ChemError::internal(format!("atom id {id} outside {}", fragment.token)))
}

/// Builds the fragment a group's SMILES describes and transfers the
/// group's attachment annotations onto it.
pub fn group_fragment(state: &mut BuildState, tree: &ParseTree, group: NodeId) -> Result<FragId> {
    let NodeKind::Group(group_type, sub_type) = tree.kind(group) else {
        return Err(ChemError::internal(format!("{group} is not a group")));
    };
    let smiles = tree.attr_or_err(group, "value")?;
    let labels = Labels::parse(tree.attr(group, "labels").unwrap_or("numeric"));
    let frag = state.mgr.build_from_smiles(smiles, &labels)?;
    {
        let fragment = state.mgr.frag_mut(frag)?;
        fragment.group_type = Some(group_type);
        fragment.sub_type = sub_type;
        fragment.token = tree.text(group).to_string();
    }
    if let Some(ids) = tree.attr(group, "outIDs") {
        for id in parse_ids(ids)? {
            let atom = atom_at(&state.mgr, frag, id)?;
            state.mgr.add_out_atom(frag, atom, 1, false)?;
        }
    }
    if let Some(ids) = tree.attr(group, "functionalIDs") {
        for id in parse_ids(ids)? {
            let atom = atom_at(&state.mgr, frag, id)?;
            state.mgr.frag_mut(frag)?.functional_atoms.push(atom);
        }
    }
    if let Some(id) = tree.attr(group, "defaultInID") {
        let id = parse_ids(id)?.first().copied().unwrap_or(1);
        let atom = atom_at(&state.mgr, frag, id)?;
        state.mgr.frag_mut(frag)?.default_in_atom = Some(atom);
    }
    // a bare metal has no implicit hydrogens whatever its charge
    if group_type == GroupType::ElementaryAtom || sub_type == Some(GroupSubType::Metal) {
        for atom in state.mgr.frag(frag)?.atoms.clone() {
            if state.mgr[atom].el.is_metal() && state.mgr[atom].explicit_h.is_none() {
                state.mgr[atom].explicit_h = Some(0);
            }
        }
    }
    Ok(frag)
}

fn has_child(tree: &ParseTree, scope: NodeId, pred: impl Fn(NodeKind) -> bool) -> bool {
    !tree.children_of_kind(scope, pred).is_empty()
}

/// Turns the group of one scope into its finished fragment: ring system
/// built, modifiers applied, suffixes attached.
pub fn build_group(state: &mut BuildState, tree: &mut ParseTree, scope: NodeId) -> Result<FragId> {
    let group = match tree.scope_group(scope) {
        Some(g) => g,
        None => build_polycyclic_spiro(state, tree, scope)?,
    };
    let frag = match state.group_frags.get(&group) {
        Some(&f) => f,
        None => {
            let f = group_fragment(state, tree, group)?;
            state.group_frags.insert(group, f);
            f
        }
    };

    if has_child(tree, scope, |k| matches!(k, NodeKind::Heteroatom(_))) {
        if matches!(tree.kind(group), NodeKind::Group(_, Some(GroupSubType::HantzschWidman))) {
            place_hantzsch_widman_heteroatoms(state, tree, scope, frag)?;
        } else {
            replace_heteroatoms(state, tree, scope, frag)?;
        }
    }
    if has_child(tree, scope, |k| k == NodeKind::FusionPrefix) {
        benzo_fuse(state, tree, scope, group, frag)?;
    }
    if has_child(tree, scope, |k| matches!(k, NodeKind::RingAssembly(_))) {
        form_ring_assembly(state, tree, scope, frag)?;
    }
    apply_group_modifiers(state, tree, scope, group, frag)?;

    let suffixes = prepare_suffixes(state, tree, scope, group, frag)?;
    let added = apply_suffixes(state, tree, group, &suffixes)?;
    for f in added {
        state.mgr.incorporate_fragment(f, frag)?;
    }
    debug!("{} -> fragment {} ({} atoms)", tree.text(group), frag.0, state.mgr.frag(frag)?.atoms.len());
    Ok(frag)
}

/// Stereodescriptors of a word become pending stereo on the atoms their
/// locants name, looked up from the root of the word backwards.
pub fn collect_stereo(state: &mut BuildState, tree: &mut ParseTree, word: NodeId) -> Result<()> {
    let frags: Vec<FragId> = tree
        .substituents_and_roots(word)
        .into_iter()
        .rev()
        .filter_map(|s| tree.scope_group(s))
        .filter_map(|g| state.group_frags.get(&g).copied())
        .collect();
    for node in tree.descendants_of_kind(word, |k| matches!(k, NodeKind::StereoChemistry(_))) {
        let NodeKind::StereoChemistry(kind) = tree.kind(node) else {
            continue;
        };
        let value = tree.attr_or_err(node, "value")?.to_string();
        let atom = match tree.attr(node, "locant") {
            Some(locant) => Some(
                frags
                    .iter()
                    .find_map(|&f| state.mgr.atom_by_locant(f, locant))
                    .ok_or_else(|| ChemError::building(format!("Could not find atom {locant} for stereodescriptor {value}")))?,
            ),
            None => None,
        };
        trace!("stereodescriptor {} pending", tree.text(node));
        state.stereo.push(PendingStereo { atom, kind, value });
        tree.detach(node);
    }
    Ok(())
}

/// Resolves one word in place.
pub fn resolve_word(state: &mut BuildState, tree: &mut ParseTree, word: NodeId) -> Result<()> {
    for scope in tree.descendants_of_kind(word, |k| k.is_scope()) {
        resolve_scope_locants(tree, scope)?;
    }
    implicit_brackets(tree, word)?;
    for scope in tree.substituents_and_roots(word) {
        build_group(state, tree, scope)?;
    }
    collect_stereo(state, tree, word)
}

#[instrument(skip_all, fields(words = tree.words().len()))]
pub fn resolve(state: &mut BuildState, mut tree: ParseTree) -> Result<ParseTree> {
    for word in tree.words() {
        if tree.kind(word) == NodeKind::Word(WordType::FunctionalTerm) {
            continue;
        }
        resolve_word(state, &mut tree, word)?;
    }
    info!("resolved {} group(s)", state.group_frags.len());
    debug!("resolved tree:\n{}", tree);
    Ok(tree)
}
