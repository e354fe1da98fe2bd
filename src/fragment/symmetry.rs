//! Morgan-style symmetry classes.
//!
//! Atoms start with a label from their element, charge, hydrogen count and
//! degree; each round hashes an atom's label together with the sorted labels
//! of its neighbours. Refinement stops once a round no longer splits any class.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use super::*;

fn compute_hash<T: Hash>(t: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    t.hash(&mut hasher);
    hasher.finish()
}

fn class_count(labels: &HashMap<AtomId, u64>) -> usize {
    labels.values().collect::<BTreeSet<_>>().len()
}

impl FragmentManager {
    fn initial_label(&self, atom: AtomId) -> u64 {
        let a = &self[atom];
        let bond_orders: Vec<u8> = {
            let mut orders: Vec<u8> = self.bonded(atom).iter().map(|&(_, o)| o).collect();
            orders.sort();
            orders
        };
        compute_hash(&(
            a.el.atomic_number(),
            a.charge,
            self.hydrogen_count(atom),
            bond_orders,
            a.spare_valency,
        ))
    }

    /// Symmetry class of every atom in `atoms`. Equivalent atoms share a class;
    /// class numbers are dense and start at 0.
    pub fn symmetry_classes(&self, atoms: &[AtomId]) -> HashMap<AtomId, usize> {
        let mut labels: HashMap<AtomId, u64> = atoms.iter().map(|&a| (a, self.initial_label(a))).collect();
        let mut classes = class_count(&labels);

        for _ in 0..atoms.len().max(1) {
            let mut updated = HashMap::with_capacity(labels.len());
            for &atom in atoms {
                let mut neighbour_labels: Vec<(u64, u8)> = self
                    .bonded(atom)
                    .into_iter()
                    .filter_map(|(n, order)| labels.get(&n).map(|&l| (l, order)))
                    .collect();
                neighbour_labels.sort();
                updated.insert(atom, compute_hash(&(labels[&atom], neighbour_labels)));
            }
            let refined = class_count(&updated);
            if refined <= classes {
                break;
            }
            classes = refined;
            labels = updated;
        }

        let distinct: Vec<u64> = labels.values().copied().collect::<BTreeSet<_>>().into_iter().collect();
        labels
            .into_iter()
            .map(|(atom, label)| (atom, distinct.binary_search(&label).unwrap_or(0)))
            .collect()
    }

    /// True when every atom of `candidates` is symmetry equivalent within `frag`.
    pub fn all_equivalent(&self, frag: FragId, candidates: &[AtomId]) -> Result<bool> {
        if candidates.len() < 2 {
            return Ok(true);
        }
        let atoms = self.frag(frag)?.atoms.clone();
        let classes = self.symmetry_classes(&atoms);
        let first = classes.get(&candidates[0]);
        Ok(candidates.iter().all(|c| classes.get(c) == first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ends_of_propane_are_equivalent() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("CCC", &Labels::Numeric).unwrap();
        let atoms = mgr.frag(frag).unwrap().atoms.clone();
        let classes = mgr.symmetry_classes(&atoms);
        assert_eq!(classes[&atoms[0]], classes[&atoms[2]]);
        assert_ne!(classes[&atoms[0]], classes[&atoms[1]]);
    }

    #[test]
    fn test_butanol_carbons_are_distinct() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("CCCCO", &Labels::Numeric).unwrap();
        let atoms = mgr.frag(frag).unwrap().atoms.clone();
        let classes = mgr.symmetry_classes(&atoms);
        let distinct: BTreeSet<usize> = atoms.iter().map(|a| classes[a]).collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn test_benzene_is_one_class() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("c1ccccc1", &Labels::Numeric).unwrap();
        let atoms = mgr.frag(frag).unwrap().atoms.clone();
        assert!(mgr.all_equivalent(frag, &atoms).unwrap());
    }
}
