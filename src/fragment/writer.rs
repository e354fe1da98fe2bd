//! SMILES output for finished molecules.
//!
//! Two passes: a DFS records the spanning tree and the ring closures, then
//! the string is generated from the tree, writing branches in parentheses
//! and ring closure digits (reusing freed digits, `%NN` above 9).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::NodeIndex;
use tracing::*;

use super::*;

/// A back edge of the DFS, written as a pair of ring closure digits.
#[derive(Debug, Clone)]
struct RingClosure {
    opening: NodeIndex,
    closing: NodeIndex,
    order: u8,
    digit: usize,
}

fn format_ring(digit: usize) -> String {
    if digit < 10 {
        digit.to_string()
    } else {
        format!("%{digit}")
    }
}

fn bond_symbol(order: u8) -> &'static str {
    match order {
        2 => "=",
        3 => "#",
        4 => "$",
        _ => "",
    }
}

struct Walk {
    parent: BTreeMap<NodeIndex, NodeIndex>,
    children: BTreeMap<NodeIndex, Vec<NodeIndex>>,
    closures: Vec<RingClosure>,
}

/// First pass: spanning tree and ring closures from `start`.
fn compute_spanning_tree_and_ring_closures(mol: &Molecule, start: NodeIndex, visited: &mut BTreeSet<NodeIndex>) -> Walk {
    let mut walk = Walk {
        parent: BTreeMap::new(),
        children: BTreeMap::new(),
        closures: Vec::new(),
    };
    let mut path: Vec<NodeIndex> = Vec::new();

    fn dfs(mol: &Molecule, current: NodeIndex, walk: &mut Walk, visited: &mut BTreeSet<NodeIndex>, path: &mut Vec<NodeIndex>) {
        visited.insert(current);
        path.push(current);
        for nbr in mol.neighbours(current) {
            if walk.parent.get(&current) == Some(&nbr) {
                continue;
            }
            if !visited.contains(&nbr) {
                walk.parent.insert(nbr, current);
                walk.children.entry(current).or_default().push(nbr);
                dfs(mol, nbr, walk, visited, path);
            } else if path.contains(&nbr) {
                // back edge to an ancestor: a ring closure, recorded once
                let already = walk.closures.iter().any(|rc| {
                    (rc.opening == nbr && rc.closing == current) || (rc.opening == current && rc.closing == nbr)
                });
                if !already {
                    walk.closures.push(RingClosure {
                        opening: nbr,
                        closing: current,
                        order: mol.bond_order(current, nbr).unwrap_or(1),
                        digit: 0,
                    });
                }
            }
        }
        path.pop();
    }

    dfs(mol, start, &mut walk, visited, &mut path);
    walk
}

/// Assigns ring closure digits in writing order, reusing digits once closed.
fn assign_digits(order: &[NodeIndex], closures: &mut [RingClosure]) {
    let position: HashMap<NodeIndex, usize> = order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let mut events: Vec<(usize, bool, usize)> = Vec::new();
    for (i, rc) in closures.iter().enumerate() {
        events.push((position[&rc.opening], true, i));
        events.push((position[&rc.closing], false, i));
    }
    // closings at an atom are handled before openings at the same atom
    events.sort_by_key(|&(pos, opening, i)| (pos, opening, i));
    let mut in_use: BTreeSet<usize> = BTreeSet::new();
    for (_, opening, i) in events {
        if opening {
            let digit = (1..).find(|d| !in_use.contains(d)).unwrap_or(1);
            in_use.insert(digit);
            closures[i].digit = digit;
        } else {
            in_use.remove(&closures[i].digit);
        }
    }
}

fn preorder(walk: &Walk, node: NodeIndex, out: &mut Vec<NodeIndex>) {
    out.push(node);
    if let Some(children) = walk.children.get(&node) {
        for &c in children {
            preorder(walk, c, out);
        }
    }
}

fn implied_hydrogens(el: ChemEl, bond_sum: u32) -> Option<u32> {
    if !el.in_organic_subset() {
        return None;
    }
    el.valencies().iter().find(|&&v| v >= bond_sum).map(|v| v - bond_sum)
}

/// Parity of the permutation taking `from` to `to`; both hold the same items.
fn is_odd_permutation<T: PartialEq + Copy>(from: &[T], to: &[T]) -> bool {
    let mut items: Vec<T> = from.to_vec();
    let mut swaps = 0;
    for i in 0..items.len() {
        if items[i] != to[i] {
            if let Some(j) = (i + 1..items.len()).find(|&j| items[j] == to[i]) {
                items.swap(i, j);
                swaps += 1;
            }
        }
    }
    swaps % 2 == 1
}

struct Writer<'a> {
    mol: &'a Molecule,
    walk: Walk,
    opens: BTreeMap<NodeIndex, Vec<usize>>,
    closes: BTreeMap<NodeIndex, Vec<usize>>,
    marks: HashMap<(NodeIndex, NodeIndex), char>,
}

impl<'a> Writer<'a> {
    fn atom_text(&self, node: NodeIndex) -> String {
        let atom = &self.mol.graph[node];
        if atom.el == ChemEl::R {
            return "*".to_string();
        }
        let bond_sum: u32 = self
            .mol
            .neighbours(node)
            .iter()
            .map(|&n| self.mol.bond_order(node, n).unwrap_or(1) as u32)
            .sum();
        let chirality = self.chirality(node);
        let plain = chirality.is_none()
            && atom.charge == 0
            && atom.radical == 0
            && implied_hydrogens(atom.el, bond_sum) == Some(atom.hydrogens);
        if plain {
            return atom.el.symbol().to_string();
        }
        let mut s = format!("[{}", atom.el.symbol());
        if let Some(mark) = chirality {
            s.push_str(mark);
        }
        match atom.hydrogens {
            0 => {}
            1 => s.push('H'),
            h => s.push_str(&format!("H{h}")),
        }
        match atom.charge {
            0 => {}
            1 => s.push('+'),
            -1 => s.push('-'),
            c if c > 0 => s.push_str(&format!("+{c}")),
            c => s.push_str(&format!("-{}", -c)),
        }
        s.push(']');
        s
    }

    /// Neighbours in the order the SMILES string presents them to `node`.
    fn written_neighbours(&self, node: NodeIndex) -> Vec<StereoRef> {
        let mut out = Vec::new();
        if let Some(&p) = self.walk.parent.get(&node) {
            out.push(StereoRef::Atom(p));
        }
        if self.mol.graph[node].hydrogens == 1 {
            out.push(StereoRef::ImplicitH);
        }
        let mut rings: Vec<(usize, NodeIndex)> = Vec::new();
        for &i in self.opens.get(&node).into_iter().flatten() {
            let rc = &self.walk.closures[i];
            rings.push((rc.digit, rc.closing));
        }
        for &i in self.closes.get(&node).into_iter().flatten() {
            let rc = &self.walk.closures[i];
            rings.push((rc.digit, rc.opening));
        }
        for (_, partner) in rings {
            out.push(StereoRef::Atom(partner));
        }
        for &c in self.walk.children.get(&node).into_iter().flatten() {
            out.push(StereoRef::Atom(c));
        }
        out
    }

    fn chirality(&self, node: NodeIndex) -> Option<&'static str> {
        let parity = self.mol.graph[node].parity?;
        let written = self.written_neighbours(node);
        if written.len() != 4 || !parity.refs.iter().all(|r| written.contains(r)) {
            return None;
        }
        let odd = is_odd_permutation(&parity.refs, &written);
        // `@@` means clockwise looking from the first written neighbour
        Some(if parity.clockwise != odd { "@@" } else { "@" })
    }

    fn generate(&self, node: NodeIndex) -> String {
        let mut s = self.atom_text(node);
        let mut rings: Vec<&RingClosure> = Vec::new();
        for &i in self.opens.get(&node).into_iter().flatten() {
            rings.push(&self.walk.closures[i]);
        }
        for &i in self.closes.get(&node).into_iter().flatten() {
            rings.push(&self.walk.closures[i]);
        }
        for rc in rings {
            if rc.opening == node {
                s.push_str(bond_symbol(rc.order));
            }
            s.push_str(&format_ring(rc.digit));
        }
        let children = self.walk.children.get(&node).cloned().unwrap_or_default();
        for (i, &child) in children.iter().enumerate() {
            let mut bond = bond_symbol(self.mol.bond_order(node, child).unwrap_or(1)).to_string();
            if let Some(mark) = self.marks.get(&(node, child)) {
                bond = if bond.is_empty() { mark.to_string() } else { bond };
            }
            let body = format!("{}{}", bond, self.generate(child));
            if i + 1 < children.len() {
                s.push_str(&format!("({body})"));
            } else {
                s.push_str(&body);
            }
        }
        s
    }

    /// Places `/` and `\` marks for stereo double bonds written along the tree.
    fn mark_double_bonds(&mut self) {
        for edge in self.mol.graph.edge_indices() {
            let Some(stereo) = self.mol.graph[edge].stereo else {
                continue;
            };
            let Some((x, y)) = self.mol.graph.edge_endpoints(edge) else {
                continue;
            };
            let (b, c) = if self.walk.parent.get(&y) == Some(&x) {
                (x, y)
            } else if self.walk.parent.get(&x) == Some(&y) {
                (y, x)
            } else {
                continue;
            };
            let refs = if stereo.refs[1] == b {
                stereo.refs
            } else {
                [stereo.refs[3], stereo.refs[2], stereo.refs[1], stereo.refs[0]]
            };
            let Some(&a) = self.walk.parent.get(&b) else {
                debug!("double bond starts the SMILES; configuration not written");
                continue;
            };
            let Some(&d) = self
                .walk
                .children
                .get(&c)
                .and_then(|children| children.iter().find(|&&n| self.mol.bond_order(c, n) == Some(1)))
            else {
                continue;
            };
            let mut cis = stereo.cis;
            if a != refs[0] {
                cis = !cis;
            }
            if d != refs[3] {
                cis = !cis;
            }
            let first = *self.marks.entry((a, b)).or_insert('/');
            let flipped = if first == '/' { '\\' } else { '/' };
            self.marks.insert((c, d), if cis { flipped } else { first });
        }
    }
}

/// Writes a molecule as SMILES, one dot-separated part per component.
pub fn molecule_to_smiles(mol: &Molecule) -> String {
    let mut visited: BTreeSet<NodeIndex> = BTreeSet::new();
    let mut parts = Vec::new();
    for start in mol.atoms() {
        if visited.contains(&start) {
            continue;
        }
        let mut walk = compute_spanning_tree_and_ring_closures(mol, start, &mut visited);
        let mut order = Vec::new();
        preorder(&walk, start, &mut order);
        assign_digits(&order, &mut walk.closures);
        let mut opens: BTreeMap<NodeIndex, Vec<usize>> = BTreeMap::new();
        let mut closes: BTreeMap<NodeIndex, Vec<usize>> = BTreeMap::new();
        for (i, rc) in walk.closures.iter().enumerate() {
            opens.entry(rc.opening).or_default().push(i);
            closes.entry(rc.closing).or_default().push(i);
        }
        let mut writer = Writer {
            mol,
            walk,
            opens,
            closes,
            marks: HashMap::new(),
        };
        writer.mark_double_bonds();
        parts.push(writer.generate(start));
    }
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(smiles: &str) -> String {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles(smiles, &Labels::Numeric).unwrap();
        mgr.convert_spare_valencies_to_double_bonds(frag).unwrap();
        mgr.to_molecule(frag).unwrap().to_smiles()
    }

    #[test]
    fn test_write_chain_and_branch() {
        assert_eq!(round_trip("CCO"), "CCO");
        assert_eq!(round_trip("CC(C)C"), "CC(C)C");
        assert_eq!(round_trip("CC(=O)O"), "CC(=O)O");
    }

    #[test]
    fn test_write_ring() {
        assert_eq!(round_trip("C1CCCCC1"), "C1CCCCC1");
    }

    #[test]
    fn test_write_ions() {
        assert_eq!(round_trip("[Mg+2].[Cl-].[Cl-]"), "[Mg+2].[Cl-].[Cl-]");
        assert_eq!(round_trip("C[NH3+]"), "C[NH3+]");
    }

    #[test]
    fn test_ring_digits_are_reused() {
        let smiles = round_trip("C1CC1C1CC1");
        assert_eq!(smiles.matches('2').count(), 0);
    }

    #[test]
    fn test_permutation_parity() {
        assert!(!is_odd_permutation(&[1, 2, 3, 4], &[1, 2, 3, 4]));
        assert!(is_odd_permutation(&[1, 2, 3, 4], &[2, 1, 3, 4]));
        assert!(!is_odd_permutation(&[1, 2, 3, 4], &[2, 3, 1, 4]));
    }
}
