//! Turns spare valencies into explicit double bonds.
//!
//! Atoms flagged with spare valency must each end up in exactly one double
//! bond with another such atom. This is a perfect matching problem over the
//! spare-valency subgraph, solved with augmenting paths. Components with an
//! odd number of atoms first give up one atom, which keeps a hydrogen
//! instead (the "indicated hydrogen" of pyrrole or 1H-indene).

use std::collections::{HashMap, VecDeque};

use super::*;

impl FragmentManager {
    /// Converts every spare valency in `frag` into a double bond.
    pub fn convert_spare_valencies_to_double_bonds(&mut self, frag: FragId) -> Result<()> {
        let atoms: Vec<AtomId> = self.frag(frag)?.atoms.clone();
        // an atom with no room for another bond cannot keep its spare valency
        for &a in &atoms {
            if self[a].spare_valency && !self.can_take_double_bond(a) {
                debug!("dropping spare valency on {}", self.describe(a));
                self[a].spare_valency = false;
            }
        }
        let spare: Vec<AtomId> = atoms.iter().copied().filter(|&a| self[a].spare_valency).collect();
        if spare.is_empty() {
            return Ok(());
        }

        for component in self.spare_components(&spare) {
            let mut component = component;
            if component.len() % 2 == 1 {
                let dropped = self.choose_atom_without_double_bond(&component)?;
                self[dropped].spare_valency = false;
                component.retain(|&a| a != dropped);
            }
            let matching = self.perfect_matching(&component).ok_or_else(|| {
                ChemError::building(format!(
                    "Unable to assign all double bonds in the ring system containing {}",
                    self.describe(component[0])
                ))
            })?;
            for (a, b) in matching {
                if let Some(edge) = self.bond_between(a, b) {
                    self.bond_mut(edge).order += 1;
                }
                self[a].spare_valency = false;
                self[b].spare_valency = false;
            }
        }
        Ok(())
    }

    fn can_take_double_bond(&self, atom: AtomId) -> bool {
        let a = &self[atom];
        if a.keeps_hydrogen {
            return false;
        }
        let shift = charge_valency_shift(a.el, a.charge);
        let max = match a.lambda {
            Some(l) => l as i32,
            None => match a.el.valencies().iter().map(|&v| v as i32 + shift).max() {
                Some(v) => v,
                None => return false,
            },
        };
        let outs = self.frag(a.frag).map(|f| f.out_valency_of(atom)).unwrap_or(0);
        let bonded = (self.incoming_valency(atom) + outs) as i32;
        let explicit = a.explicit_h.map(|h| h as i32).unwrap_or(0);
        bonded + explicit < max && a.el.valencies().first().map(|&v| (v as i32 + shift) > bonded).unwrap_or(false)
    }

    fn spare_components(&self, spare: &[AtomId]) -> Vec<Vec<AtomId>> {
        let mut seen: Vec<AtomId> = Vec::new();
        let mut components = Vec::new();
        for &start in spare {
            if seen.contains(&start) {
                continue;
            }
            let mut component = vec![start];
            seen.push(start);
            let mut stack = vec![start];
            while let Some(a) = stack.pop() {
                for n in self.neighbours(a) {
                    if self[n].spare_valency && !seen.contains(&n) && self.bond_order(a, n) == Some(1) {
                        seen.push(n);
                        component.push(n);
                        stack.push(n);
                    }
                }
            }
            component.sort();
            components.push(component);
        }
        components
    }

    /// Picks the atom of an odd component that keeps a hydrogen: a heteroatom
    /// that can be saturated, else the first carbon whose removal leaves a
    /// perfect matching.
    fn choose_atom_without_double_bond(&self, component: &[AtomId]) -> Result<AtomId> {
        let leaves_matching = |candidate: AtomId| {
            let rest: Vec<AtomId> = component.iter().copied().filter(|&a| a != candidate).collect();
            self.perfect_matching(&rest).is_some()
        };
        let hetero = component
            .iter()
            .copied()
            .filter(|&a| matches!(self[a].el, ChemEl::N | ChemEl::P | ChemEl::As | ChemEl::B));
        for candidate in hetero {
            if leaves_matching(candidate) {
                return Ok(candidate);
            }
        }
        for &candidate in component {
            if leaves_matching(candidate) {
                return Ok(candidate);
            }
        }
        Err(ChemError::building(format!(
            "No atom of the ring system containing {} can carry indicated hydrogen",
            self.describe(component[0])
        )))
    }

    /// Maximum matching by augmenting paths; `None` unless every atom is matched.
    fn perfect_matching(&self, atoms: &[AtomId]) -> Option<Vec<(AtomId, AtomId)>> {
        if atoms.len() % 2 == 1 {
            return None;
        }
        let index: HashMap<AtomId, usize> = atoms.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        let adjacency: Vec<Vec<usize>> = atoms
            .iter()
            .map(|&a| {
                self.neighbours(a)
                    .into_iter()
                    .filter(|n| self.bond_order(a, *n) == Some(1))
                    .filter_map(|n| index.get(&n).copied())
                    .collect()
            })
            .collect();
        let n = atoms.len();
        let mut mate: Vec<Option<usize>> = vec![None; n];

        // greedy start: atoms with a single candidate partner first
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| adjacency[i].len());
        for &i in &order {
            if mate[i].is_some() {
                continue;
            }
            if let Some(&j) = adjacency[i].iter().find(|&&j| mate[j].is_none()) {
                mate[i] = Some(j);
                mate[j] = Some(i);
            }
        }

        for start in 0..n {
            if mate[start].is_none() && !augment(&adjacency, &mut mate, start) {
                return None;
            }
        }

        let mut pairs = Vec::new();
        for (i, m) in mate.iter().enumerate() {
            match m {
                Some(j) if i < *j => pairs.push((atoms[i], atoms[*j])),
                Some(_) => {}
                None => return None,
            }
        }
        Some(pairs)
    }
}

/// Searches for an augmenting path from an unmatched vertex with a BFS over
/// alternating paths, flipping it when found. Handles odd cycles by blossom-free
/// search, which suffices for the small ring systems names describe.
fn augment(adjacency: &[Vec<usize>], mate: &mut [Option<usize>], start: usize) -> bool {
    let n = adjacency.len();
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();
    visited[start] = true;
    queue.push_back(start);

    while let Some(u) = queue.pop_front() {
        for &v in &adjacency[u] {
            if visited[v] || mate[u] == Some(v) {
                continue;
            }
            visited[v] = true;
            prev[v] = Some(u);
            match mate[v] {
                None => {
                    // flip the path start ... u - v
                    let mut cur = v;
                    while let Some(p) = prev[cur] {
                        let next = mate[p];
                        mate[p] = Some(cur);
                        mate[cur] = Some(p);
                        match next {
                            Some(nx) if p != start => cur = nx,
                            _ => break,
                        }
                    }
                    return true;
                }
                Some(w) => {
                    if !visited[w] {
                        visited[w] = true;
                        prev[w] = Some(v);
                        queue.push_back(w);
                    }
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double_bonds(mgr: &FragmentManager, frag: FragId) -> usize {
        let atoms = mgr.frag(frag).unwrap().atoms.clone();
        let mut count = 0;
        for &a in &atoms {
            for (b, order) in mgr.bonded(a) {
                if a < b && order == 2 {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_benzene() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("c1ccccc1", &Labels::Numeric).unwrap();
        mgr.convert_spare_valencies_to_double_bonds(frag).unwrap();
        assert_eq!(double_bonds(&mgr, frag), 3);
        let atoms = mgr.frag(frag).unwrap().atoms.clone();
        assert!(atoms.iter().all(|&a| mgr.hydrogen_count(a) == 1));
    }

    #[test]
    fn test_naphthalene() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("c1ccc2ccccc2c1", &Labels::Numeric).unwrap();
        mgr.convert_spare_valencies_to_double_bonds(frag).unwrap();
        assert_eq!(double_bonds(&mgr, frag), 5);
    }

    #[test]
    fn test_pyrrole_nitrogen_keeps_hydrogen() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("n1cccc1", &Labels::Numeric).unwrap();
        mgr.convert_spare_valencies_to_double_bonds(frag).unwrap();
        let n = mgr.atom_by_locant(frag, "1").unwrap();
        assert_eq!(mgr.hydrogen_count(n), 1);
        assert_eq!(double_bonds(&mgr, frag), 2);
    }

    #[test]
    fn test_furan_oxygen_loses_spare_valency() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("o1cccc1", &Labels::Numeric).unwrap();
        mgr.convert_spare_valencies_to_double_bonds(frag).unwrap();
        assert_eq!(double_bonds(&mgr, frag), 2);
    }

    #[test]
    fn test_indicated_hydrogen_is_respected() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("c1cccc1", &Labels::Numeric).unwrap();
        let c3 = mgr.atom_by_locant(frag, "3").unwrap();
        mgr[c3].keeps_hydrogen = true;
        mgr.convert_spare_valencies_to_double_bonds(frag).unwrap();
        assert_eq!(mgr.hydrogen_count(c3), 2);
        assert_eq!(double_bonds(&mgr, frag), 2);
    }
}
