//! Applying stereodescriptors to the finished structure.
//!
//! Descriptors are applied right to left. One written without a locant goes
//! on the last stereocentre (or stereogenic double bond) not yet given one.

use std::collections::{HashMap, HashSet, VecDeque};

use super::*;

/// Double bonds closing a ring smaller than this cannot be E or Z.
const MIN_STEREO_RING: usize = 8;

/// Neighbours the Morgan classes already tell are equivalent rule the atom
/// out before any CIP ranking is attempted.
fn has_equivalent_neighbours(mgr: &FragmentManager, classes: &HashMap<AtomId, usize>, atom: AtomId) -> bool {
    let mut seen = HashSet::new();
    stereo_refs(mgr, atom).into_iter().any(|r| {
        let class = match r {
            StereoRef::Atom(a) => classes.get(&a).map(|c| c + 1),
            StereoRef::ImplicitH => Some(0),
        };
        !seen.insert(class)
    })
}

fn stereocentres(mgr: &FragmentManager, components: &[FragId]) -> Result<Vec<AtomId>> {
    let mut out = Vec::new();
    for &frag in components {
        let atoms = mgr.frag(frag)?.atoms.clone();
        let classes = mgr.symmetry_classes(&atoms);
        for &atom in &atoms {
            if stereo_refs(mgr, atom).len() == 4
                && !has_equivalent_neighbours(mgr, &classes, atom)
                && neighbour_ranking(mgr, atom).is_some()
            {
                out.push(atom);
            }
        }
    }
    Ok(out)
}

/// Length of the smallest ring through the bond a-b, if there is one.
fn smallest_ring_through(mgr: &FragmentManager, a: AtomId, b: AtomId) -> Option<usize> {
    let mut seen = HashSet::from([a]);
    let mut queue = VecDeque::from([(a, 0usize)]);
    while let Some((atom, dist)) = queue.pop_front() {
        for n in mgr.neighbours(atom) {
            if atom == a && n == b {
                continue;
            }
            if n == b {
                return Some(dist + 2);
            }
            if seen.insert(n) {
                queue.push_back((n, dist + 1));
            }
        }
    }
    None
}

fn is_stereogenic_double_bond(mgr: &FragmentManager, a: AtomId, b: AtomId) -> bool {
    if mgr.bond_order(a, b) != Some(2) {
        return false;
    }
    if smallest_ring_through(mgr, a, b).is_some_and(|size| size < MIN_STEREO_RING) {
        return false;
    }
    highest_other_branch(mgr, a, b).is_some() && highest_other_branch(mgr, b, a).is_some()
}

fn stereo_double_bonds(mgr: &FragmentManager, components: &[FragId]) -> Result<Vec<(AtomId, AtomId)>> {
    let mut out = Vec::new();
    for &frag in components {
        for &a in &mgr.frag(frag)?.atoms {
            for (b, order) in mgr.bonded(a) {
                if order == 2 && a.index() < b.index() && is_stereogenic_double_bond(mgr, a, b) {
                    out.push((a, b));
                }
            }
        }
    }
    Ok(out)
}

/// A real atom standing for one end's higher ranked side; `true` when it
/// lies on the opposite side to that substituent.
fn reference_atom(mgr: &FragmentManager, atom: AtomId, partner: AtomId) -> Result<(AtomId, bool)> {
    match highest_other_branch(mgr, atom, partner) {
        Some(StereoRef::Atom(r)) => Ok((r, false)),
        Some(StereoRef::ImplicitH) => mgr
            .neighbours(atom)
            .into_iter()
            .find(|&n| n != partner)
            .map(|n| (n, true))
            .ok_or_else(|| ChemError::internal(format!("{} has no heavy neighbour", mgr.describe(atom)))),
        None => Err(ChemError::building(format!(
            "The double bond at {} is not stereogenic",
            mgr.describe(atom)
        ))),
    }
}

fn set_double_bond(mgr: &mut FragmentManager, a: AtomId, b: AtomId, same_side: bool) -> Result<()> {
    let (ra, flip_a) = reference_atom(mgr, a, b)?;
    let (rb, flip_b) = reference_atom(mgr, b, a)?;
    let bond = mgr
        .bond_between(a, b)
        .ok_or_else(|| ChemError::internal("double bond vanished"))?;
    mgr.bond_mut(bond).stereo = Some(BondStereo {
        refs: [ra, a, b, rb],
        cis: same_side ^ flip_a ^ flip_b,
    });
    debug!("{}={} set {}", mgr.describe(a), mgr.describe(b), if same_side { "Z" } else { "E" });
    Ok(())
}

fn set_tetrahedral(mgr: &mut FragmentManager, centre: AtomId, value: &str) -> Result<()> {
    if value.len() > 1 {
        // RS, SR: racemic, no configuration to record
        return Ok(());
    }
    let ranking = neighbour_ranking(mgr, centre)
        .ok_or_else(|| ChemError::building(format!("{} is not a stereocentre", mgr.describe(centre))))?;
    // looking from the lowest priority neighbour, R runs anticlockwise
    mgr[centre].parity = Some(AtomParity {
        refs: [ranking[3], ranking[0], ranking[1], ranking[2]],
        clockwise: value == "S",
    });
    debug!("{} set {}", mgr.describe(centre), value);
    Ok(())
}

fn pick<T: Copy + Eq + std::hash::Hash>(candidates: &[T], used: &HashSet<T>, pred: impl Fn(&T) -> bool) -> Option<T> {
    candidates.iter().rev().copied().find(|c| !used.contains(c) && pred(c))
}

/// Applies every pending stereodescriptor.
pub fn apply_stereochemistry(state: &mut BuildState, components: &[FragId]) -> Result<()> {
    if state.stereo.is_empty() {
        return Ok(());
    }
    let pending = std::mem::take(&mut state.stereo);
    let mgr = &mut state.mgr;
    let centres = stereocentres(mgr, components)?;
    let bonds = stereo_double_bonds(mgr, components)?;
    let mut used_centres = HashSet::new();
    let mut used_bonds = HashSet::new();

    for stereo in pending.into_iter().rev() {
        if let Some(atom) = stereo.atom {
            if !mgr.contains_atom(atom) {
                return Err(ChemError::building(format!(
                    "The atom of stereodescriptor {} is no longer in the structure",
                    stereo.value
                )));
            }
        }
        match stereo.kind {
            StereoType::RorS => {
                let centre = match stereo.atom {
                    Some(atom) if centres.contains(&atom) => atom,
                    Some(atom) => {
                        return Err(ChemError::building(format!(
                            "{} is not a stereocentre, so cannot be {}",
                            mgr.describe(atom),
                            stereo.value
                        )))
                    }
                    None => pick(&centres, &used_centres, |_| true)
                        .ok_or_else(|| ChemError::building(format!("No stereocentre left for {}", stereo.value)))?,
                };
                used_centres.insert(centre);
                set_tetrahedral(mgr, centre, &stereo.value)?;
            }
            StereoType::EorZ | StereoType::CisOrTrans => {
                let bond = match stereo.atom {
                    Some(atom) => pick(&bonds, &used_bonds, |&(a, b)| a == atom || b == atom),
                    None => pick(&bonds, &used_bonds, |_| true),
                };
                let Some((a, b)) = bond else {
                    if stereo.kind == StereoType::CisOrTrans {
                        warn!("{} does not describe a double bond here; ignored", stereo.value);
                        continue;
                    }
                    return Err(ChemError::building(format!("No stereogenic double bond for {}", stereo.value)));
                };
                used_bonds.insert((a, b));
                set_double_bond(mgr, a, b, matches!(stereo.value.as_str(), "Z" | "cis"))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::tests::{built, built_with};
    use crate::config::Config;

    fn butanol(descriptor: &str) -> String {
        format!(
            r#"{{molecule {{wordRule wordRule=simple {{word type=full {{root
                {{stereoChemistry type=RorS "({descriptor})-"}}
                {{group type=chain subType=alkaneStem value=CCCC labels=numeric "but"}} {{unsaturator value=0 "an"}}
                {{hyphen "-"}} {{locant "2"}} {{hyphen "-"}} {{suffix type=root value=ol "ol"}}}}}}}}}}"#
        )
    }

    fn butene(descriptor: &str) -> String {
        format!(
            r#"{{molecule {{wordRule wordRule=simple {{word type=full {{root
                {{stereoChemistry type=EorZ "({descriptor})-"}}
                {{group type=chain subType=alkaneStem value=CCCC labels=numeric "but"}}
                {{locant "2"}} {{hyphen "-"}} {{unsaturator value=2 "ene"}}}}}}}}}}"#
        )
    }

    #[test]
    fn test_r_and_s_are_opposite() {
        let r = built(&butanol("2R"));
        let s = built(&butanol("2S"));
        let centre = r.atom_with_locant("2").unwrap();
        let pr = r.atom(centre).parity.unwrap();
        let ps = s.atom(s.atom_with_locant("2").unwrap()).parity.unwrap();
        assert_ne!(pr.clockwise, ps.clockwise);
        assert_eq!(pr.refs[0], StereoRef::ImplicitH);
        assert_ne!(r.to_smiles(), s.to_smiles());
    }

    #[test]
    fn test_unlocanted_descriptor_finds_the_only_centre() {
        let molecule = built(&butanol("R"));
        let centre = molecule.atom_with_locant("2").unwrap();
        assert!(molecule.atom(centre).parity.is_some());
    }

    #[test]
    fn test_descriptor_on_a_non_stereocentre() {
        let err = built_with(&butanol("1R"), &Config::new()).unwrap_err();
        assert!(matches!(err, ChemError::StructureBuilding(_)));
    }

    #[test]
    fn test_e_and_z() {
        let e = built(&butene("2E"));
        let z = built(&butene("2Z"));
        let stereo = |m: &Molecule| m.graph.edge_weights().find_map(|b| b.stereo).unwrap();
        assert!(!stereo(&e).cis);
        assert!(stereo(&z).cis);
        assert!(e.to_smiles().contains('/'));
    }

    #[test]
    fn test_ring_double_bonds_are_not_stereogenic() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("C1=CCCCC1", &Labels::Numeric).unwrap();
        let (a, b) = (mgr.atom_by_locant(frag, "1").unwrap(), mgr.atom_by_locant(frag, "2").unwrap());
        assert_eq!(smallest_ring_through(&mgr, a, b), Some(6));
        assert!(!is_stereogenic_double_bond(&mgr, a, b));
    }
}
