use tracing::*;

use super::table::*;
use crate::build::BuildState;
use crate::error::{ChemError, Result};
use crate::fragment::{AtomId, ChemEl, FragId, FragmentManager, Labels};
use crate::tree::*;

/// Atoms of a fragment starting at its default atom, then in order.
fn atoms_from_default(mgr: &FragmentManager, frag: FragId) -> Result<Vec<AtomId>> {
    let fragment = mgr.frag(frag)?;
    let mut atoms = fragment.atoms.clone();
    if let Some(start) = fragment.default_in_atom.and_then(|d| atoms.iter().position(|&a| a == d)) {
        atoms.rotate_left(start);
    }
    Ok(atoms)
}

/// The atom an unlocanted suffix or substituent goes on: the first one,
/// from the default atom, with `valency` hydrogens to spare. Picking between
/// inequivalent candidates marks the build ambiguous.
pub fn find_atom_for_substitution(state: &mut BuildState, frag: FragId, valency: u32) -> Result<AtomId> {
    let candidates: Vec<AtomId> = atoms_from_default(&state.mgr, frag)?
        .into_iter()
        .filter(|&a| {
            let atom = &state.mgr[a];
            atom.el != ChemEl::R && !atom.characteristic && state.mgr.substitutable_hydrogens(a) >= valency
        })
        .collect();
    let Some(&first) = candidates.first() else {
        let token = state.mgr.frag(frag)?.token.clone();
        return Err(ChemError::building(format!("No suitable atom found for substitution on {token}")));
    };
    if !state.mgr.all_equivalent(frag, &candidates)? {
        let choice = state.mgr.describe(first);
        state.flag_ambiguity(format!("{} candidate atoms, chose {choice}", candidates.len()));
    }
    Ok(first)
}

/// Unlocanted charges prefer nitrogen, then other heteroatoms, then carbon,
/// and only then an atom that is already charged.
pub fn find_atom_for_charge(mgr: &FragmentManager, frag: FragId) -> Result<AtomId> {
    let atoms = atoms_from_default(mgr, frag)?;
    let tiers: [&dyn Fn(AtomId) -> bool; 4] = [
        &|a| mgr[a].el == ChemEl::N && mgr[a].charge == 0,
        &|a| !matches!(mgr[a].el, ChemEl::C | ChemEl::R) && mgr[a].charge == 0,
        &|a| mgr[a].el == ChemEl::C && mgr[a].charge == 0,
        &|a| mgr[a].el != ChemEl::R,
    ];
    tiers
        .iter()
        .find_map(|tier| atoms.iter().copied().find(|&a| tier(a)))
        .ok_or_else(|| ChemError::building("No atom can take the charge"))
}

/// O atoms singly bonded to one neighbour and carrying one hydrogen.
pub fn hydroxy_oxygens(mgr: &FragmentManager, frag: FragId) -> Result<Vec<AtomId>> {
    Ok(mgr
        .frag(frag)?
        .atoms
        .iter()
        .copied()
        .filter(|&a| {
            mgr[a].el == ChemEl::O
                && mgr[a].charge == 0
                && mgr.bonded(a).len() == 1
                && mgr.bonded(a)[0].1 == 1
                && mgr.hydrogen_count(a) == 1
        })
        .collect())
}

fn is_element_locant(locant: &str, el: ChemEl) -> bool {
    locant
        .strip_prefix(el.symbol())
        .map(|rest| rest.chars().all(|c| c == '\''))
        .unwrap_or(false)
}

/// Gives heteroatoms added by a suffix their element locants: `N`, then
/// `N'`, `N''`..., plus `N1` style locants naming the atom they hang off.
fn label_heteroatoms(mgr: &mut FragmentManager, existing: &[FragId], suffix: FragId, target: Option<AtomId>) -> Result<()> {
    let target_locant = target.and_then(|t| mgr[t].first_locant().map(str::to_string));
    let atoms = mgr.frag(suffix)?.atoms.clone();
    for atom in atoms {
        let el = mgr[atom].el;
        if matches!(el, ChemEl::C | ChemEl::H | ChemEl::R) {
            continue;
        }
        let mut count = 0;
        for &f in existing.iter().chain(std::iter::once(&suffix)) {
            count += mgr
                .frag(f)?
                .atoms
                .iter()
                .filter(|&&a| mgr[a].locants.iter().any(|l| is_element_locant(l, el)))
                .count();
        }
        let mut locants = vec![format!("{}{}", el.symbol(), "'".repeat(count))];
        if let Some(t) = &target_locant {
            locants.push(format!("{}{}", el.symbol(), t));
        }
        mgr[atom].locants.extend(locants);
    }
    Ok(())
}

struct Application<'a> {
    state: &'a mut BuildState,
    group_frag: FragId,
    created: Vec<FragId>,
    /// Every fragment whose atoms already hold element locants.
    labelled: Vec<FragId>,
    /// Atom chosen for the current unlocanted suffix; its later rules reuse it.
    anchor: Option<AtomId>,
}

impl Application<'_> {
    fn atom(&self, locant: &str) -> Result<AtomId> {
        self.state.mgr.atom_by_locant_or_err(self.group_frag, locant)
    }

    fn unlocanted(&mut self, valency: u32) -> Result<AtomId> {
        if let Some(anchor) = self.anchor {
            return Ok(anchor);
        }
        let atom = find_atom_for_substitution(self.state, self.group_frag, valency)?;
        self.anchor = Some(atom);
        Ok(atom)
    }

    fn add_group(&mut self, rule: &SuffixRule, locants: &[String]) -> Result<()> {
        let SuffixRule::AddGroup {
            smiles,
            labels,
            functional_ids,
            out_ids,
            at_first,
            at_last,
        } = rule
        else {
            return Err(ChemError::internal("add_group called with another rule"));
        };
        let suffix = self.state.mgr.build_from_smiles(smiles, &Labels::parse(labels))?;
        let atoms = self.state.mgr.frag(suffix)?.atoms.clone();
        let dummies: Vec<AtomId> = atoms.iter().copied().filter(|&a| self.state.mgr[a].el == ChemEl::R).collect();
        let real: Vec<AtomId> = atoms.iter().copied().filter(|&a| self.state.mgr[a].el != ChemEl::R).collect();

        let mut attachments = Vec::with_capacity(dummies.len());
        for &dummy in &dummies {
            let [(neighbour, order)] = self.state.mgr.bonded(dummy)[..] else {
                return Err(ChemError::internal(format!("dummy atom of {smiles} must have exactly one bond")));
            };
            attachments.push((neighbour, order));
        }

        let targets: Vec<AtomId> = match (dummies.len(), locants.len()) {
            (1, n) if *at_last && n >= 2 => vec![self.atom(&locants[n - 1])?],
            (1, 2) if *at_first => vec![self.atom(&locants[0])?],
            (1, _) if *at_first => vec![self.atom("1")?],
            (1, 0) => vec![self.unlocanted(attachments[0].1 as u32)?],
            (1, _) => vec![self.atom(&locants[0])?],
            (2, 0) => {
                let a = find_atom_for_substitution(self.state, self.group_frag, 1)?;
                let b = self
                    .state
                    .mgr
                    .neighbours(a)
                    .into_iter()
                    .find(|&n| self.state.mgr.substitutable_hydrogens(n) >= 1 && self.state.mgr[n].frag == self.group_frag)
                    .ok_or_else(|| ChemError::building(format!("No second atom to close the ring of {smiles}")))?;
                vec![a, b]
            }
            (2, 1) => vec![self.atom("1")?, self.atom(&locants[0])?],
            (2, _) => vec![self.atom(&locants[0])?, self.atom(&locants[1])?],
            (n, _) => return Err(ChemError::internal(format!("{smiles} has {n} dummy atoms"))),
        };

        for (&dummy, (&target, &(neighbour, order))) in dummies.iter().zip(targets.iter().zip(&attachments)) {
            self.state.mgr.remove_atom(dummy)?;
            if order >= 2 && self.state.mgr[target].spare_valency {
                self.state.mgr[target].spare_valency = false;
            }
            self.state.mgr.create_bond(neighbour, target, order)?;
        }
        for &id in functional_ids {
            let atom = *real
                .get(id.wrapping_sub(1))
                .ok_or_else(|| ChemError::internal(format!("functional id {id} outside {smiles}")))?;
            self.state.mgr.frag_mut(suffix)?.functional_atoms.push(atom);
        }
        for &id in out_ids {
            let atom = *real
                .get(id.wrapping_sub(1))
                .ok_or_else(|| ChemError::internal(format!("out id {id} outside {smiles}")))?;
            self.state.mgr.add_out_atom(suffix, atom, 1, false)?;
        }
        for &a in &real {
            self.state.mgr[a].characteristic = true;
        }
        label_heteroatoms(&mut self.state.mgr, &self.labelled, suffix, targets.first().copied())?;
        self.labelled.push(suffix);
        self.created.push(suffix);
        trace!("added {} to {}", smiles, self.state.mgr.describe(targets[0]));
        Ok(())
    }

    fn apply(&mut self, rule: &SuffixRule, locants: &[String]) -> Result<()> {
        let frag = self.group_frag;
        match rule {
            SuffixRule::AddGroup { .. } => self.add_group(rule, locants)?,
            SuffixRule::ChangeCharge { charge, protons } => {
                let atom = match locants.first() {
                    Some(l) => self.atom(l)?,
                    None => find_atom_for_charge(&self.state.mgr, frag)?,
                };
                self.state.mgr.change_charge(atom, *charge, *protons);
            }
            SuffixRule::SetOutAtom { valency } => {
                let (atom, explicit) = match locants.first() {
                    Some(l) => (self.atom(l)?, true),
                    None => (self.unlocanted(*valency)?, false),
                };
                self.state.mgr.add_out_atom(frag, atom, *valency, explicit)?;
            }
            SuffixRule::AddFunctionalAtomsToHydroxyGroups => {
                for o in hydroxy_oxygens(&self.state.mgr, frag)? {
                    let fragment = self.state.mgr.frag_mut(frag)?;
                    if !fragment.functional_atoms.contains(&o) {
                        fragment.functional_atoms.push(o);
                    }
                }
            }
            SuffixRule::ChargeHydroxyGroups => {
                for o in hydroxy_oxygens(&self.state.mgr, frag)? {
                    self.state.mgr.change_charge(o, -1, -1);
                    let fragment = self.state.mgr.frag_mut(frag)?;
                    if !fragment.functional_atoms.contains(&o) {
                        fragment.functional_atoms.push(o);
                    }
                }
            }
            SuffixRule::RemoveTerminalOxygen { order } => {
                let mgr = &self.state.mgr;
                let oxygen = mgr
                    .frag(frag)?
                    .atoms
                    .iter()
                    .copied()
                    .find(|&a| {
                        mgr[a].el == ChemEl::O
                            && matches!(mgr.bonded(a)[..], [(_, o)] if o == *order)
                            && (*order != 1 || mgr.hydrogen_count(a) == 1)
                    })
                    .ok_or_else(|| ChemError::building("No terminal oxygen to remove"))?;
                self.state.mgr.remove_atom(oxygen)?;
            }
            SuffixRule::ConvertHydroxyGroupsToOutAtoms | SuffixRule::ConvertHydroxyGroupsToPositiveCharge => {
                let hydroxys = hydroxy_oxygens(&self.state.mgr, frag)?;
                if hydroxys.is_empty() {
                    return Err(ChemError::building("No hydroxy groups to convert"));
                }
                for o in hydroxys {
                    let centre = self.state.mgr.bonded(o)[0].0;
                    self.state.mgr.remove_atom(o)?;
                    if matches!(rule, SuffixRule::ConvertHydroxyGroupsToOutAtoms) {
                        self.state.mgr.add_out_atom(frag, centre, 1, false)?;
                    } else {
                        self.state.mgr.change_charge(centre, 1, 0);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Applies the suffixes of a group in order. Fragments added by the suffixes
/// are bonded to the group but not yet merged into it; they are returned
/// (and recorded per suffix node) for the caller to incorporate.
pub fn apply_suffixes(state: &mut BuildState, tree: &ParseTree, group: NodeId, suffixes: &[NodeId]) -> Result<Vec<FragId>> {
    let group_frag = state.frag_of(group)?;
    let applicability = Applicability::of(tree.kind(group));
    let subgroup = match tree.kind(group) {
        NodeKind::Group(_, Some(sub)) => Some(sub.tag()),
        _ => None,
    };
    let mut application = Application {
        state,
        group_frag,
        created: Vec::new(),
        labelled: vec![group_frag],
        anchor: None,
    };
    for &suffix in suffixes {
        let value = tree.attr_or_err(suffix, "value")?;
        let rules = rules_for(applicability, value, subgroup)
            .map_err(|_| ChemError::component_at(format!("Suffix {value} cannot be applied to {}", tree.text(group)), tree.text(suffix)))?;
        let locants = tree.locants(suffix);
        let before = application.created.len();
        application.anchor = None;
        for rule in &rules.rules {
            application.apply(rule, &locants)?;
        }
        let added = application.created[before..].to_vec();
        debug!("suffix {} on {} added {} fragment(s)", value, tree.text(group), added.len());
        application.state.suffix_frags.insert(suffix, added);
    }
    Ok(application.created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn group_with_suffixes(smiles: &str, labels: &str, suffixes: &[(&str, Option<&str>)], group_type: &str) -> (BuildState, ParseTree, NodeId, Vec<NodeId>) {
        let mut text = format!(
            r#"{{molecule {{wordRule wordRule=simple {{word type=full {{root {{group type={group_type} value={smiles} labels={labels} "g"}}"#
        );
        for (value, locant) in suffixes {
            match locant {
                Some(l) => text.push_str(&format!(r#" {{suffix type=root value="{value}" locant={l} "{value}"}}"#)),
                None => text.push_str(&format!(r#" {{suffix type=root value="{value}" "{value}"}}"#)),
            }
        }
        text.push_str("}}}}");
        let tree = ParseTree::parse(&text).unwrap();
        let root = tree.substituents_and_roots(tree.root())[0];
        let group = tree.scope_group(root).unwrap();
        let suffix_nodes = tree.children_of_kind(root, |k| matches!(k, NodeKind::Suffix(_)));
        let mut state = BuildState::new(&Config::new());
        let frag = state.mgr.build_from_smiles(smiles, &Labels::parse(labels)).unwrap();
        state.group_frags.insert(group, frag);
        (state, tree, group, suffix_nodes)
    }

    fn merged_smiles(state: &mut BuildState, group: NodeId, added: &[FragId]) -> String {
        let frag = state.frag_of(group).unwrap();
        for &f in added {
            state.mgr.incorporate_fragment(f, frag).unwrap();
        }
        state.mgr.to_molecule(frag).unwrap().formula()
    }

    #[test]
    fn test_ethanol() {
        let (mut state, tree, group, suffixes) = group_with_suffixes("CC", "numeric", &[("ol", None)], "chain");
        let added = apply_suffixes(&mut state, &tree, group, &suffixes).unwrap();
        assert_eq!(added.len(), 1);
        assert!(!state.ambiguous);
        assert_eq!(merged_smiles(&mut state, group, &added), "C2H6O");
    }

    #[test]
    fn test_unlocanted_choice_on_propane_is_ambiguous() {
        let (mut state, tree, group, suffixes) = group_with_suffixes("CCC", "numeric", &[("ol", None)], "chain");
        apply_suffixes(&mut state, &tree, group, &suffixes).unwrap();
        assert!(state.ambiguous);
    }

    #[test]
    fn test_acetic_acid_marks_a_functional_oxygen() {
        let (mut state, tree, group, suffixes) = group_with_suffixes("CC", "1/2", &[("ic", Some("1"))], "acidStem");
        let added = apply_suffixes(&mut state, &tree, group, &suffixes).unwrap();
        let frag = state.frag_of(group).unwrap();
        for &f in &added {
            state.mgr.incorporate_fragment(f, frag).unwrap();
        }
        let functional = state.mgr.frag(frag).unwrap().functional_atoms.clone();
        assert_eq!(functional.len(), 1);
        assert_eq!(state.mgr[functional[0]].el, ChemEl::O);
        assert!(state.mgr[functional[0]].locants.iter().any(|l| l == "O'"));
        assert_eq!(state.mgr.to_molecule(frag).unwrap().formula(), "C2H4O2");
    }

    #[test]
    fn test_chloride_takes_the_negative_charge() {
        let (mut state, tree, group, suffixes) = group_with_suffixes("Cl", "none", &[("ide", None)], "simple");
        apply_suffixes(&mut state, &tree, group, &suffixes).unwrap();
        let frag = state.frag_of(group).unwrap();
        let mol = state.mgr.to_molecule(frag).unwrap();
        assert_eq!(mol.net_charge(), -1);
        assert_eq!(mol.formula(), "Cl");
    }

    #[test]
    fn test_sulfate_charges_both_hydroxy_groups() {
        let (mut state, tree, group, suffixes) =
            group_with_suffixes("S(=O)(=O)(O)O", "none", &[("ate", None)], "nonCarboxylicAcid");
        apply_suffixes(&mut state, &tree, group, &suffixes).unwrap();
        let frag = state.frag_of(group).unwrap();
        assert_eq!(state.mgr.frag(frag).unwrap().functional_atoms.len(), 2);
        assert_eq!(state.mgr.to_molecule(frag).unwrap().net_charge(), -2);
    }

    #[test]
    fn test_lactone_closes_a_ring() {
        let (mut state, tree, group, suffixes) = group_with_suffixes("CCCC", "numeric", &[("olide", Some("4"))], "chain");
        let added = apply_suffixes(&mut state, &tree, group, &suffixes).unwrap();
        let c1 = state.mgr.atom_by_locant(state.frag_of(group).unwrap(), "1").unwrap();
        let c4 = state.mgr.atom_by_locant(state.frag_of(group).unwrap(), "4").unwrap();
        assert_eq!(merged_smiles(&mut state, group, &added), "C4H6O2");
        assert_eq!(state.mgr.degree(c1), 3);
        assert_eq!(state.mgr.degree(c4), 2);
    }

    #[test]
    fn test_amine_nitrogen_gets_element_locants() {
        let (mut state, tree, group, suffixes) =
            group_with_suffixes("CC", "numeric", &[("amine", Some("1")), ("amine", Some("2"))], "chain");
        let added = apply_suffixes(&mut state, &tree, group, &suffixes).unwrap();
        let first = state.mgr.frag(added[0]).unwrap().atoms[0];
        let second = state.mgr.frag(added[1]).unwrap().atoms[0];
        assert_eq!(state.mgr[first].locants, vec!["N", "N1"]);
        assert_eq!(state.mgr[second].locants, vec!["N'", "N2"]);
    }

    #[test]
    fn test_missing_locant_is_a_building_error() {
        let (mut state, tree, group, suffixes) = group_with_suffixes("CC", "numeric", &[("ol", Some("5"))], "chain");
        let err = apply_suffixes(&mut state, &tree, group, &suffixes).unwrap_err();
        assert!(matches!(err, ChemError::StructureBuilding(_)));
    }
}
