//! Atoms, bonds and fragments, and the manager that owns them while a name
//! is being built.
//!
//! Every atom of every fragment lives in one `StableUnGraph`, so bonds between
//! fragments are ordinary edges and merging two fragments only moves
//! bookkeeping, never atoms.

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use tracing::*;

use crate::error::{ChemError, Result};
use crate::tree::{GroupSubType, GroupType};

mod element;
pub use element::*;

mod smiles;
pub use smiles::*;

mod kekule;

mod molecule;
pub use molecule::*;

mod symmetry;

mod valency;
pub use valency::*;

mod writer;
pub use writer::*;

pub type AtomId = NodeIndex;
pub type BondId = EdgeIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragId(pub usize);

/// A neighbour of a stereocentre: an atom, or the implicit hydrogen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoRef {
    Atom(AtomId),
    ImplicitH,
}

/// Tetrahedral configuration. Looking from `refs[0]` towards the centre,
/// `refs[1..]` run clockwise when `clockwise` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomParity {
    pub refs: [StereoRef; 4],
    pub clockwise: bool,
}

/// Double bond configuration `refs[0]-refs[1]=refs[2]-refs[3]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondStereo {
    pub refs: [AtomId; 4],
    pub cis: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub el: ChemEl,
    pub charge: i32,
    /// Hydrogens added (positive) or removed beyond what the valency implies.
    pub proton_delta: i32,
    /// Hydrogen count fixed by a bracket atom.
    pub explicit_h: Option<u32>,
    pub lambda: Option<u32>,
    /// Will take part in a double bond once spare valencies are resolved.
    pub spare_valency: bool,
    pub parity: Option<AtomParity>,
    pub locants: Vec<String>,
    pub frag: FragId,
    /// Added by a suffix (the O of an -ol, the N of an amine).
    pub characteristic: bool,
    /// Marked by indicated or added hydrogen; keeps its hydrogen when spare
    /// valencies become double bonds.
    pub keeps_hydrogen: bool,
    pub oxidation_number: Option<i32>,
}

impl Atom {
    pub fn new(el: ChemEl, frag: FragId) -> Self {
        Atom {
            el,
            charge: 0,
            proton_delta: 0,
            explicit_h: None,
            lambda: None,
            spare_valency: false,
            parity: None,
            locants: Vec::new(),
            frag,
            characteristic: false,
            keeps_hydrogen: false,
            oxidation_number: None,
        }
    }

    pub fn has_locant(&self, locant: &str) -> bool {
        self.locants.iter().any(|l| l == locant)
    }

    pub fn first_locant(&self) -> Option<&str> {
        self.locants.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub order: u8,
    pub stereo: Option<BondStereo>,
}

impl Bond {
    pub fn new(order: u8) -> Self {
        Bond { order, stereo: None }
    }
}

/// A pending attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutAtom {
    pub atom: AtomId,
    pub valency: u32,
    /// Given by a locant rather than chosen by default.
    pub set_explicitly: bool,
}

/// How atoms of a freshly built fragment are labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Labels {
    /// 1, 2, 3 ... in SMILES order, `R` dummies excluded.
    Numeric,
    None,
    /// One entry per atom, each entry holding zero or more locants.
    Explicit(Vec<Vec<String>>),
}

impl Labels {
    /// Parses `numeric`, `none`, or a slash separated list such as
    /// `1/2/3,alpha//4a`.
    pub fn parse(text: &str) -> Labels {
        match text {
            "numeric" => Labels::Numeric,
            "none" | "" => Labels::None,
            _ => Labels::Explicit(
                text.split('/')
                    .map(|entry| {
                        entry
                            .split(',')
                            .filter(|l| !l.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fragment {
    pub id: FragId,
    pub atoms: Vec<AtomId>,
    pub group_type: Option<GroupType>,
    pub sub_type: Option<GroupSubType>,
    pub out_atoms: Vec<OutAtom>,
    pub functional_atoms: Vec<AtomId>,
    pub default_in_atom: Option<AtomId>,
    /// The token text this fragment was built from, for diagnostics.
    pub token: String,
}

impl Fragment {
    fn new(id: FragId) -> Self {
        Fragment {
            id,
            atoms: Vec::new(),
            group_type: None,
            sub_type: None,
            out_atoms: Vec::new(),
            functional_atoms: Vec::new(),
            default_in_atom: None,
            token: String::new(),
        }
    }

    pub fn first_atom(&self) -> Option<AtomId> {
        self.atoms.first().copied()
    }

    pub fn out_valency_of(&self, atom: AtomId) -> u32 {
        self.out_atoms
            .iter()
            .filter(|o| o.atom == atom)
            .map(|o| o.valency)
            .sum()
    }

    pub fn contains(&self, atom: AtomId) -> bool {
        self.atoms.contains(&atom)
    }
}

/// Owns every atom, bond and fragment created while one name is built.
#[derive(Debug, Default)]
pub struct FragmentManager {
    graph: StableUnGraph<Atom, Bond>,
    fragments: Vec<Option<Fragment>>,
}

impl std::ops::Index<AtomId> for FragmentManager {
    type Output = Atom;

    fn index(&self, atom: AtomId) -> &Atom {
        &self.graph[atom]
    }
}

impl std::ops::IndexMut<AtomId> for FragmentManager {
    fn index_mut(&mut self, atom: AtomId) -> &mut Atom {
        &mut self.graph[atom]
    }
}

impl FragmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_fragment(&mut self) -> FragId {
        let id = FragId(self.fragments.len());
        self.fragments.push(Some(Fragment::new(id)));
        id
    }

    pub fn frag(&self, id: FragId) -> Result<&Fragment> {
        self.fragments
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| ChemError::internal(format!("fragment {} no longer exists", id.0)))
    }

    pub fn frag_mut(&mut self, id: FragId) -> Result<&mut Fragment> {
        self.fragments
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| ChemError::internal(format!("fragment {} no longer exists", id.0)))
    }

    pub fn contains_atom(&self, atom: AtomId) -> bool {
        self.graph.contains_node(atom)
    }

    /// Builds a fragment from a SMILES string of the token vocabulary.
    ///
    /// Aromatic (lowercase) atoms get spare valency. `R` dummies are kept as
    /// atoms of element `R` and never receive labels.
    pub fn build_from_smiles(&mut self, smiles: &str, labels: &Labels) -> Result<FragId> {
        let parsed = parse_smiles(smiles)?;
        let frag = self.new_fragment();
        let mut ids = Vec::with_capacity(parsed.atoms.len());
        for smiles_atom in &parsed.atoms {
            let mut atom = Atom::new(smiles_atom.el, frag);
            atom.charge = smiles_atom.charge;
            atom.explicit_h = smiles_atom.explicit_h;
            atom.spare_valency = smiles_atom.aromatic;
            let id = self.graph.add_node(atom);
            ids.push(id);
        }
        for bond in &parsed.bonds {
            self.graph
                .add_edge(ids[bond.from], ids[bond.to], Bond::new(bond.order));
        }

        let labelled: Vec<AtomId> = ids
            .iter()
            .copied()
            .filter(|&a| self.graph[a].el != ChemEl::R)
            .collect();
        match labels {
            Labels::Numeric => {
                for (i, &a) in labelled.iter().enumerate() {
                    self.graph[a].locants.push((i + 1).to_string());
                }
            }
            Labels::None => {}
            Labels::Explicit(entries) => {
                if entries.len() != labelled.len() {
                    return Err(ChemError::internal(format!(
                        "{} labels given for {} atoms in {}",
                        entries.len(),
                        labelled.len(),
                        smiles
                    )));
                }
                for (entry, &a) in entries.iter().zip(&labelled) {
                    self.graph[a].locants.extend(entry.iter().cloned());
                }
            }
        }

        let fragment = self.frag_mut(frag)?;
        fragment.atoms = ids;
        fragment.token = smiles.to_string();
        debug!("built fragment {} from {}", frag.0, smiles);
        Ok(frag)
    }

    pub fn create_atom(&mut self, el: ChemEl, frag: FragId) -> Result<AtomId> {
        let id = self.graph.add_node(Atom::new(el, frag));
        self.frag_mut(frag)?.atoms.push(id);
        Ok(id)
    }

    /// Removes an atom, its bonds, and every reference its fragment holds to it.
    pub fn remove_atom(&mut self, atom: AtomId) -> Result<()> {
        let frag = self
            .graph
            .node_weight(atom)
            .map(|a| a.frag)
            .ok_or_else(|| ChemError::internal("removing an atom that does not exist"))?;
        let fragment = self.frag_mut(frag)?;
        fragment.atoms.retain(|&a| a != atom);
        fragment.out_atoms.retain(|o| o.atom != atom);
        fragment.functional_atoms.retain(|&a| a != atom);
        if fragment.default_in_atom == Some(atom) {
            fragment.default_in_atom = None;
        }
        self.graph.remove_node(atom);
        Ok(())
    }

    pub fn bond_between(&self, a: AtomId, b: AtomId) -> Option<BondId> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_order(&self, a: AtomId, b: AtomId) -> Option<u8> {
        self.bond_between(a, b).map(|e| self.graph[e].order)
    }

    pub fn bond(&self, bond: BondId) -> &Bond {
        &self.graph[bond]
    }

    pub fn bond_mut(&mut self, bond: BondId) -> &mut Bond {
        &mut self.graph[bond]
    }

    pub fn bond_endpoints(&self, bond: BondId) -> Option<(AtomId, AtomId)> {
        self.graph.edge_endpoints(bond)
    }

    pub fn create_bond(&mut self, a: AtomId, b: AtomId, order: u8) -> Result<BondId> {
        if a == b {
            return Err(ChemError::internal("attempted to bond an atom to itself"));
        }
        if self.graph.find_edge(a, b).is_some() {
            return Err(ChemError::building(format!(
                "atoms {} and {} are already bonded",
                self.describe(a),
                self.describe(b)
            )));
        }
        Ok(self.graph.add_edge(a, b, Bond::new(order)))
    }

    pub fn remove_bond(&mut self, a: AtomId, b: AtomId) -> Result<Bond> {
        let edge = self
            .graph
            .find_edge(a, b)
            .ok_or_else(|| ChemError::internal("removing a bond that does not exist"))?;
        self.graph
            .remove_edge(edge)
            .ok_or_else(|| ChemError::internal("bond vanished during removal"))
    }

    /// Neighbours in creation order.
    pub fn neighbours(&self, atom: AtomId) -> Vec<AtomId> {
        let mut out: Vec<AtomId> = self.graph.neighbors(atom).collect();
        out.sort();
        out
    }

    /// (neighbour, bond order) pairs in creation order.
    pub fn bonded(&self, atom: AtomId) -> Vec<(AtomId, u8)> {
        let mut out: Vec<(AtomId, u8)> = self
            .graph
            .edges(atom)
            .map(|e| {
                let other = if e.source() == atom { e.target() } else { e.source() };
                (other, e.weight().order)
            })
            .collect();
        out.sort();
        out
    }

    pub fn bonds_of(&self, atom: AtomId) -> Vec<BondId> {
        self.graph.edges(atom).map(|e| e.id()).collect()
    }

    pub fn degree(&self, atom: AtomId) -> usize {
        self.graph.neighbors(atom).count()
    }

    /// Moves every atom and annotation of `src` into `dst`; `src` ceases to exist.
    pub fn incorporate_fragment(&mut self, src: FragId, dst: FragId) -> Result<()> {
        if src == dst {
            return Ok(());
        }
        let source = self
            .fragments
            .get_mut(src.0)
            .and_then(Option::take)
            .ok_or_else(|| ChemError::internal("incorporating a fragment that does not exist"))?;
        for &a in &source.atoms {
            self.graph[a].frag = dst;
        }
        let target = self.frag_mut(dst)?;
        target.atoms.extend(source.atoms);
        target.out_atoms.extend(source.out_atoms);
        target.functional_atoms.extend(source.functional_atoms);
        Ok(())
    }

    /// Bonds `src_atom` to `dst_atom` and merges `src` into `dst`.
    pub fn incorporate_fragment_bonded(
        &mut self,
        src: FragId,
        src_atom: AtomId,
        dst: FragId,
        dst_atom: AtomId,
        order: u8,
    ) -> Result<()> {
        self.create_bond(src_atom, dst_atom, order)?;
        self.incorporate_fragment(src, dst)
    }

    /// Deep copy of a fragment. Returns the copy and the old → new atom map.
    pub fn copy_fragment(&mut self, frag: FragId) -> Result<(FragId, HashMap<AtomId, AtomId>)> {
        let original = self.frag(frag)?.clone();
        let copy = self.new_fragment();
        let mut map = HashMap::new();
        let mut atoms = Vec::with_capacity(original.atoms.len());
        for &a in &original.atoms {
            let mut atom = self.graph[a].clone();
            atom.frag = copy;
            atom.parity = None;
            let id = self.graph.add_node(atom);
            map.insert(a, id);
            atoms.push(id);
        }
        for &a in &original.atoms {
            for (b, order) in self.bonded(a) {
                if let Some(&nb) = map.get(&b) {
                    let na = map[&a];
                    if a < b {
                        self.graph.add_edge(na, nb, Bond::new(order));
                    }
                }
            }
        }
        let fragment = self.frag_mut(copy)?;
        fragment.atoms = atoms;
        fragment.group_type = original.group_type;
        fragment.sub_type = original.sub_type;
        fragment.token = original.token.clone();
        fragment.out_atoms = original
            .out_atoms
            .iter()
            .map(|o| OutAtom {
                atom: map[&o.atom],
                ..*o
            })
            .collect();
        fragment.functional_atoms = original.functional_atoms.iter().map(|a| map[a]).collect();
        fragment.default_in_atom = original.default_in_atom.map(|a| map[&a]);
        Ok((copy, map))
    }

    /// Copies a fragment and appends `primes` apostrophes to every locant of the copy.
    pub fn copy_and_relabel(&mut self, frag: FragId, primes: usize) -> Result<FragId> {
        let (copy, _) = self.copy_fragment(frag)?;
        self.add_primes(copy, primes)?;
        Ok(copy)
    }

    pub fn add_primes(&mut self, frag: FragId, primes: usize) -> Result<()> {
        let suffix = "'".repeat(primes);
        let atoms = self.frag(frag)?.atoms.clone();
        for a in atoms {
            for locant in self.graph[a].locants.iter_mut() {
                locant.push_str(&suffix);
            }
        }
        Ok(())
    }

    /// Moves every bond of `old` onto `new` and removes `old`. Locants of
    /// `old` are not carried over.
    pub fn replace_atom_preserving_connectivity(&mut self, old: AtomId, new: AtomId) -> Result<()> {
        for (neighbour, order) in self.bonded(old) {
            self.remove_bond(old, neighbour)?;
            if neighbour != new && self.bond_between(new, neighbour).is_none() {
                self.create_bond(new, neighbour, order)?;
            }
        }
        let old_frag = self.graph[old].frag;
        let new_frag = self.graph[new].frag;
        let outs: Vec<OutAtom> = self
            .frag(old_frag)?
            .out_atoms
            .iter()
            .filter(|o| o.atom == old)
            .copied()
            .collect();
        for out in outs {
            self.frag_mut(new_frag)?.out_atoms.push(OutAtom { atom: new, ..out });
        }
        self.remove_atom(old)
    }

    pub fn atom_by_locant(&self, frag: FragId, locant: &str) -> Option<AtomId> {
        let fragment = self.frag(frag).ok()?;
        fragment
            .atoms
            .iter()
            .copied()
            .find(|&a| self.graph[a].has_locant(locant))
    }

    pub fn atom_by_locant_or_err(&self, frag: FragId, locant: &str) -> Result<AtomId> {
        self.atom_by_locant(frag, locant).ok_or_else(|| {
            let token = self.frag(frag).map(|f| f.token.clone()).unwrap_or_default();
            ChemError::building(format!("Cannot find atom with locant {locant} in {token}"))
        })
    }

    /// Removes a fragment and all of its atoms.
    pub fn remove_fragment(&mut self, frag: FragId) -> Result<()> {
        let atoms = self.frag(frag)?.atoms.clone();
        for a in atoms {
            self.graph.remove_node(a);
        }
        self.fragments[frag.0] = None;
        Ok(())
    }

    pub fn add_out_atom(&mut self, frag: FragId, atom: AtomId, valency: u32, set_explicitly: bool) -> Result<()> {
        self.frag_mut(frag)?.out_atoms.push(OutAtom {
            atom,
            valency,
            set_explicitly,
        });
        Ok(())
    }

    /// A short human readable description of an atom for error messages.
    pub fn describe(&self, atom: AtomId) -> String {
        match self.graph.node_weight(atom) {
            Some(a) => match a.first_locant() {
                Some(l) => format!("{}{}", a.el, l),
                None => format!("{}#{}", a.el, atom.index()),
            },
            None => format!("#{}", atom.index()),
        }
    }

    /// Atoms reachable from `start` through bonds.
    pub fn connected_atoms(&self, start: AtomId) -> Vec<AtomId> {
        let mut seen = vec![start];
        let mut stack = vec![start];
        while let Some(a) = stack.pop() {
            for n in self.neighbours(a) {
                if !seen.contains(&n) {
                    seen.push(n);
                    stack.push(n);
                }
            }
        }
        seen.sort();
        seen
    }
}
