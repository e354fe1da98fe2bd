//! Cahn-Ingold-Prelog priorities.
//!
//! Branches are compared sphere by sphere over the hierarchical digraph
//! rooted at the stereocentre: multiple bonds contribute duplicate atoms,
//! ring closures become duplicates of the atom they close on, implicit
//! hydrogens count as Z = 1. Each node's substituent set is padded to three
//! with phantom atoms (Z = 0). Isotopes and the rules past rule 1 are not
//! considered; a tie is reported as such.

use std::cmp::Ordering;

use super::*;

#[derive(Debug, Clone)]
struct Node {
    atom: Option<AtomId>,
    z: u32,
    duplicate: bool,
    /// Atoms from the centre down to this node's parent.
    path: Vec<AtomId>,
}

impl Node {
    fn root(mgr: &FragmentManager, centre: AtomId, r: StereoRef) -> Node {
        match r {
            StereoRef::Atom(atom) => Node {
                atom: Some(atom),
                z: mgr[atom].el.atomic_number(),
                duplicate: false,
                path: vec![centre],
            },
            StereoRef::ImplicitH => Node::hydrogen(),
        }
    }

    fn hydrogen() -> Node {
        Node {
            atom: None,
            z: 1,
            duplicate: false,
            path: Vec::new(),
        }
    }

    fn duplicate_of(mgr: &FragmentManager, atom: AtomId) -> Node {
        Node {
            atom: Some(atom),
            z: mgr[atom].el.atomic_number(),
            duplicate: true,
            path: Vec::new(),
        }
    }

    /// Substituents one sphere further out, highest Z first.
    fn children(&self, mgr: &FragmentManager) -> Vec<Node> {
        let Some(atom) = self.atom else {
            return Vec::new();
        };
        if self.duplicate {
            return Vec::new();
        }
        let from = self.path.last().copied();
        let mut path = self.path.clone();
        path.push(atom);

        let mut out = Vec::new();
        for (n, order) in mgr.bonded(atom) {
            let extra = order.saturating_sub(1);
            if Some(n) == from {
                for _ in 0..extra {
                    out.push(Node::duplicate_of(mgr, n));
                }
                continue;
            }
            if self.path.contains(&n) {
                out.push(Node::duplicate_of(mgr, n));
            } else {
                out.push(Node {
                    atom: Some(n),
                    z: mgr[n].el.atomic_number(),
                    duplicate: false,
                    path: path.clone(),
                });
            }
            for _ in 0..extra {
                out.push(Node::duplicate_of(mgr, n));
            }
        }
        for _ in 0..mgr.hydrogen_count(atom) {
            out.push(Node::hydrogen());
        }
        out.sort_by(|a, b| b.z.cmp(&a.z));
        out
    }
}

fn padded(set: &[Node]) -> Vec<u32> {
    let mut zs: Vec<u32> = set.iter().map(|n| n.z).collect();
    while zs.len() < 3 {
        zs.push(0);
    }
    zs
}

/// Orders two neighbours of `centre` by priority; `Greater` means `a` ranks
/// higher.
pub fn compare_branches(mgr: &FragmentManager, centre: AtomId, a: StereoRef, b: StereoRef) -> Ordering {
    let mut fa = vec![Node::root(mgr, centre, a)];
    let mut fb = vec![Node::root(mgr, centre, b)];
    match fa[0].z.cmp(&fb[0].z) {
        Ordering::Equal => {}
        other => return other,
    }

    let limit = mgr.connected_atoms(centre).len() + 1;
    for _ in 0..limit {
        let sa: Vec<Vec<Node>> = fa.iter().map(|n| n.children(mgr)).collect();
        let sb: Vec<Vec<Node>> = fb.iter().map(|n| n.children(mgr)).collect();
        for (ca, cb) in sa.iter().zip(&sb) {
            match padded(ca).cmp(&padded(cb)) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        fa = sa.into_iter().flatten().collect();
        fb = sb.into_iter().flatten().collect();
        if fa.is_empty() && fb.is_empty() {
            break;
        }
    }
    Ordering::Equal
}

/// Everything bonded to `atom`, implicit hydrogens included.
pub fn stereo_refs(mgr: &FragmentManager, atom: AtomId) -> Vec<StereoRef> {
    let mut refs: Vec<StereoRef> = mgr.neighbours(atom).into_iter().map(StereoRef::Atom).collect();
    for _ in 0..mgr.hydrogen_count(atom) {
        refs.push(StereoRef::ImplicitH);
    }
    refs
}

/// The four neighbours of a tetrahedral centre, highest priority first, or
/// `None` when there are not four or two of them tie.
pub fn neighbour_ranking(mgr: &FragmentManager, centre: AtomId) -> Option<Vec<StereoRef>> {
    let mut refs = stereo_refs(mgr, centre);
    if refs.len() != 4 {
        return None;
    }
    refs.sort_by(|&a, &b| compare_branches(mgr, centre, b, a));
    let distinct = refs
        .windows(2)
        .all(|w| compare_branches(mgr, centre, w[0], w[1]) == Ordering::Greater);
    distinct.then_some(refs)
}

/// The higher ranked substituent on `atom` other than `partner`, for one end
/// of a double bond. `None` when the end has two identical substituents.
pub fn highest_other_branch(mgr: &FragmentManager, atom: AtomId, partner: AtomId) -> Option<StereoRef> {
    let refs: Vec<StereoRef> = stereo_refs(mgr, atom)
        .into_iter()
        .filter(|&r| r != StereoRef::Atom(partner))
        .collect();
    match refs.as_slice() {
        [only] => Some(*only),
        [x, y] => match compare_branches(mgr, atom, *x, *y) {
            Ordering::Greater => Some(*x),
            Ordering::Less => Some(*y),
            Ordering::Equal => None,
        },
        _ => None,
    }
}
