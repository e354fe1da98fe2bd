//! Word level assembly. Substituents are bonded to what they substitute,
//! the words of a name are combined according to its word rule, and the
//! combined structure is finished: charges from oxidation numbers, radical
//! policy, double bonds, valency check, stereochemistry, charge balance.

use tracing::*;

use crate::error::{ChemError, Result};
use crate::fragment::*;
use crate::suffix::{find_atom_for_substitution, hydroxy_oxygens};
use crate::tree::*;

mod state;
pub use state::*;

mod substitutive;
pub use substitutive::*;

mod terms;
pub use terms::*;

mod wordrules;
pub use wordrules::*;

mod cip;
pub use cip::*;

mod stereo;
pub use stereo::*;

mod charge;
pub use charge::*;

/// Elementary atoms given an oxidation number and bonded to nothing carry
/// it as their charge.
pub fn oxidation_numbers_to_charges(state: &mut BuildState, components: &[FragId]) -> Result<()> {
    for &frag in components {
        for atom in state.mgr.frag(frag)?.atoms.clone() {
            let Some(n) = state.mgr[atom].oxidation_number else {
                continue;
            };
            if state.mgr.degree(atom) == 0 && state.mgr[atom].charge == 0 {
                debug!("{} takes its oxidation number {} as charge", state.mgr.describe(atom), n);
                state.mgr[atom].charge = n;
            }
        }
    }
    Ok(())
}

/// What happens to out atoms nothing was bonded to.
pub fn apply_radical_policy(state: &mut BuildState, components: &[FragId]) -> Result<()> {
    for &frag in components {
        let outs = state.mgr.frag(frag)?.out_atoms.clone();
        if outs.is_empty() {
            continue;
        }
        if state.config.output_radicals_as_wildcard_atoms {
            for out in outs {
                let dummy = state.mgr.create_atom(ChemEl::R, frag)?;
                state.mgr.create_bond(out.atom, dummy, out.valency as u8)?;
            }
            state.mgr.frag_mut(frag)?.out_atoms.clear();
            debug!("radicals of fragment {} written as wildcard atoms", frag.0);
        } else if state.config.allow_radicals {
            debug!("fragment {} left with {} radical centre(s)", frag.0, outs.len());
        } else {
            let token = state.mgr.frag(frag)?.token.clone();
            return Err(ChemError::building(format!(
                "{token} is a radical or substituent; radicals are not allowed"
            )));
        }
    }
    Ok(())
}

pub fn check_hypervalency(state: &BuildState, components: &[FragId]) -> Result<()> {
    for &frag in components {
        for &atom in &state.mgr.frag(frag)?.atoms {
            state.mgr.check_valency(atom)?;
        }
    }
    Ok(())
}

/// The word rules directly below the molecule node.
fn top_level_word_rules(tree: &ParseTree) -> Vec<NodeId> {
    tree.children_of_kind(tree.root(), |k| matches!(k, NodeKind::WordRule(_)))
}

/// Builds the molecule a resolved tree describes.
#[instrument(skip_all, fields(rules = tree.word_rules().len()))]
pub fn build(state: &mut BuildState, tree: ParseTree) -> Result<Molecule> {
    let mut components = Vec::new();
    for rule in top_level_word_rules(&tree) {
        components.extend(build_word_rule(state, &tree, rule)?);
    }
    if components.is_empty() {
        return Err(ChemError::internal("the tree holds no word rule"));
    }

    oxidation_numbers_to_charges(state, &components)?;
    apply_radical_policy(state, &components)?;
    for &frag in &components {
        state.mgr.convert_spare_valencies_to_double_bonds(frag)?;
    }
    check_hypervalency(state, &components)?;
    apply_stereochemistry(state, &components)?;
    let components = balance_charges(state, components)?;

    let (&first, rest) = components
        .split_first()
        .ok_or_else(|| ChemError::internal("charge balancing removed every component"))?;
    for &frag in rest {
        state.mgr.incorporate_fragment(frag, first)?;
    }
    let molecule = state.mgr.to_molecule(first)?;
    info!(
        "built {} ({} atoms, {} component(s))",
        molecule.formula(),
        molecule.atom_count(),
        molecule.component_count()
    );
    Ok(molecule)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::normalize::normalize;
    use crate::resolve::resolve;

    pub(crate) fn built_with(text: &str, config: &Config) -> Result<(Molecule, bool)> {
        let tree = normalize(ParseTree::parse(text)?, config)?;
        let mut state = BuildState::new(config);
        let tree = resolve(&mut state, tree)?;
        let molecule = build(&mut state, tree)?;
        Ok((molecule, state.ambiguous))
    }

    pub(crate) fn built(text: &str) -> Molecule {
        built_with(text, &Config::new()).unwrap().0
    }

    const METHYL: &str = r#"{molecule {wordRule wordRule=substituent {word type=substituent {substituent
        {group type=chain subType=alkaneStem value=C labels=numeric "meth"} {suffix type=inline value=yl "yl"}}}}}"#;

    #[test]
    fn test_radicals_are_rejected_by_default() {
        let err = built_with(METHYL, &Config::new()).unwrap_err();
        assert!(matches!(err, ChemError::StructureBuilding(_)));
    }

    #[test]
    fn test_radicals_when_allowed() {
        let (molecule, _) = built_with(METHYL, &Config::new().allow_radicals(true)).unwrap();
        assert_eq!(molecule.atom_count(), 1);
        let atom = molecule.atoms().next().unwrap();
        assert_eq!(molecule.atom(atom).radical, 1);
        assert_eq!(molecule.atom(atom).hydrogens, 3);
    }

    #[test]
    fn test_radicals_as_wildcards() {
        let (molecule, _) = built_with(METHYL, &Config::new().output_radicals_as_wildcard_atoms(true)).unwrap();
        assert_eq!(molecule.count_element(ChemEl::R), 1);
        assert_eq!(molecule.to_smiles(), "C*");
    }

    #[test]
    fn test_oxidation_number_becomes_charge() {
        let molecule = built(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=elementaryAtom subType=metal value=[Fe] labels=none "iron"} {oxidationNumber value=2 "(II)"}}}}}"#,
        );
        assert_eq!(molecule.net_charge(), 2);
    }

    #[test]
    fn test_benzene_is_kekulized() {
        let molecule = built(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        );
        assert_eq!(molecule.formula(), "C6H6");
        let doubles = molecule.graph.edge_weights().filter(|b| b.order == 2).count();
        assert_eq!(doubles, 3);
    }
}
