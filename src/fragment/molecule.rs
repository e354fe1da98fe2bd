use std::collections::{BTreeMap, HashMap};

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};

use super::*;

/// An atom of a finished structure.
#[derive(Debug, Clone, PartialEq)]
pub struct MolAtom {
    pub el: ChemEl,
    pub charge: i32,
    pub hydrogens: u32,
    pub locants: Vec<String>,
    pub parity: Option<AtomParity>,
    /// Unsatisfied valency left by a radical name.
    pub radical: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MolBond {
    pub order: u8,
    pub stereo: Option<BondStereo>,
}

/// The finished structure handed to the caller. Owns its graph; nothing in
/// it refers back to the build.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    pub graph: UnGraph<MolAtom, MolBond>,
}

impl Molecule {
    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn atom(&self, atom: NodeIndex) -> &MolAtom {
        &self.graph[atom]
    }

    pub fn count_element(&self, el: ChemEl) -> usize {
        self.graph.node_weights().filter(|a| a.el == el).count()
    }

    pub fn net_charge(&self) -> i32 {
        self.graph.node_weights().map(|a| a.charge).sum()
    }

    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    pub fn neighbours(&self, atom: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors(atom).collect();
        out.sort();
        out
    }

    pub fn degree(&self, atom: NodeIndex) -> usize {
        self.graph.neighbors(atom).count()
    }

    pub fn bond_order(&self, a: NodeIndex, b: NodeIndex) -> Option<u8> {
        self.graph.find_edge(a, b).map(|e| self.graph[e].order)
    }

    pub fn atom_with_locant(&self, locant: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&n| self.graph[n].locants.iter().any(|l| l == locant))
    }

    /// Hill formula, e.g. `C2H6O`.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();
        let mut hydrogens = 0;
        for atom in self.graph.node_weights() {
            hydrogens += atom.hydrogens;
            if atom.el == ChemEl::H {
                hydrogens += 1;
            } else if atom.el != ChemEl::R {
                *counts.entry(atom.el.symbol()).or_default() += 1;
            }
        }
        let mut out = String::new();
        let mut push = |symbol: &str, n: u32| {
            if n == 1 {
                out.push_str(symbol);
            } else if n > 1 {
                out.push_str(&format!("{symbol}{n}"));
            }
        };
        if let Some(c) = counts.remove("C") {
            push("C", c);
            push("H", hydrogens);
            for (symbol, n) in counts {
                push(symbol, n);
            }
        } else {
            if hydrogens > 0 {
                counts.insert("H", hydrogens);
            }
            for (symbol, n) in counts {
                push(symbol, n);
            }
        }
        out
    }

    pub fn to_smiles(&self) -> String {
        molecule_to_smiles(self)
    }
}

impl FragmentManager {
    /// Copies a fragment out of the manager into a standalone `Molecule`.
    /// Remaining out atoms are reported as radical valency.
    pub fn to_molecule(&self, frag: FragId) -> Result<Molecule> {
        let fragment = self.frag(frag)?;
        let mut molecule = Molecule::default();
        let mut map: HashMap<AtomId, NodeIndex> = HashMap::new();
        for &a in &fragment.atoms {
            let atom = &self[a];
            let index = molecule.graph.add_node(MolAtom {
                el: atom.el,
                charge: atom.charge,
                hydrogens: self.hydrogen_count(a),
                locants: atom.locants.clone(),
                parity: None,
                radical: fragment.out_valency_of(a),
            });
            map.insert(a, index);
        }
        for &a in &fragment.atoms {
            for b in self.neighbours(a) {
                if a < b {
                    let (Some(&na), Some(&nb)) = (map.get(&a), map.get(&b)) else {
                        return Err(ChemError::internal(format!(
                            "{} is bonded outside its fragment",
                            self.describe(a)
                        )));
                    };
                    let Some(edge) = self.bond_between(a, b) else {
                        continue;
                    };
                    let bond = self.bond(edge);
                    let stereo = match bond.stereo {
                        Some(s) => {
                            let refs = s.refs.map(|r| map.get(&r).copied());
                            match refs {
                                [Some(r0), Some(r1), Some(r2), Some(r3)] => Some(BondStereo {
                                    refs: [r0, r1, r2, r3],
                                    cis: s.cis,
                                }),
                                _ => None,
                            }
                        }
                        None => None,
                    };
                    molecule.graph.add_edge(
                        na,
                        nb,
                        MolBond {
                            order: bond.order,
                            stereo,
                        },
                    );
                }
            }
        }
        for &a in &fragment.atoms {
            if let Some(parity) = self[a].parity {
                let mut refs = [StereoRef::ImplicitH; 4];
                let mut complete = true;
                for (slot, r) in refs.iter_mut().zip(parity.refs) {
                    *slot = match r {
                        StereoRef::Atom(x) => match map.get(&x) {
                            Some(&n) => StereoRef::Atom(n),
                            None => {
                                complete = false;
                                StereoRef::ImplicitH
                            }
                        },
                        StereoRef::ImplicitH => StereoRef::ImplicitH,
                    };
                }
                if complete {
                    molecule.graph[map[&a]].parity = Some(AtomParity {
                        refs,
                        clockwise: parity.clockwise,
                    });
                }
            }
        }
        Ok(molecule)
    }
}
