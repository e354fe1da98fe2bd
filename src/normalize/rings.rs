//! Ring tokens turned into SMILES: cyclo, annulenes, the hydrocarbon fused
//! ring families, von Baeyer systems and spiro systems.
//!
//! Every generated system is written atom by atom in locant order so that
//! `labels=numeric` numbers it correctly; bonds that are not between
//! consecutive atoms become ring closures.

use std::collections::BTreeSet;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
};
use tracing::*;

use super::stems::chain_length;
use super::*;

type Bridge = (usize, Option<Vec<usize>>);

fn number(input: &str) -> Res<'_, usize> {
    map_res(digit1, str::parse)(input)
}

fn superscript(input: &str) -> Res<'_, Vec<usize>> {
    alt((
        delimited(tag("^{"), separated_list1(char(','), number), char('}')),
        delimited(tag("<sup>"), separated_list1(char(','), number), tag("</sup>")),
        delimited(char('('), separated_list1(char(','), number), char(')')),
        preceded(char('^'), separated_list1(char(','), number)),
    ))(input)
}

fn bridge(input: &str) -> Res<'_, Bridge> {
    pair(number, opt(superscript))(input)
}

/// Parses `cyclo[2.2.1.0^{2,6}]` or `spiro[4.5]` into bridges/segments.
pub fn parse_ring_descriptor<'a>(keyword: &'static str, text: &'a str) -> Result<Vec<Bridge>> {
    let text = text.trim_end_matches('-');
    let parsed: Res<'a, Vec<Bridge>> = all_consuming(preceded(
        tag(keyword),
        delimited(char('['), separated_list1(char('.'), bridge), char(']')),
    ))(text);
    match parsed {
        Ok((_, bridges)) => Ok(bridges),
        Err(_) => Err(ChemError::component_at(format!("Invalid {keyword} descriptor"), text)),
    }
}

fn format_ring_number(n: usize) -> String {
    if n < 10 {
        n.to_string()
    } else {
        format!("%{n}")
    }
}

/// Writes atoms `1..=n` in order; bonds between consecutive atoms are written
/// inline, all others as ring closures (digits reused once closed).
pub fn bonds_to_smiles(n: usize, bonds: &[(usize, usize)], atom: &str) -> Result<String> {
    let mut set: BTreeSet<(usize, usize)> = BTreeSet::new();
    for &(a, b) in bonds {
        if a == b || a == 0 || b == 0 || a > n || b > n {
            return Err(ChemError::component(format!("Ring bond {a}-{b} is outside a system of {n} atoms")));
        }
        if !set.insert((a.min(b), a.max(b))) {
            return Err(ChemError::component(format!("Ring bond {a}-{b} is specified twice")));
        }
    }
    let mut open: Vec<Option<(usize, usize)>> = vec![None; 100];
    let mut smiles = String::new();
    for i in 1..=n {
        if i > 1 && !set.contains(&(i - 1, i)) {
            smiles.push('.');
        }
        smiles.push_str(atom);
        let mut freed = Vec::new();
        for &(a, b) in set.iter().filter(|&&(a, b)| b == i && b != a + 1) {
            let number = open
                .iter()
                .position(|o| *o == Some((a, b)))
                .ok_or_else(|| ChemError::internal("ring closure closed before it was opened"))?;
            smiles.push_str(&format_ring_number(number));
            freed.push(number);
        }
        for &(a, b) in set.iter().filter(|&&(a, b)| a == i && b != a + 1) {
            let number = (1..100)
                .find(|&k| open[k].is_none() && !freed.contains(&k))
                .ok_or_else(|| ChemError::component("Ring system needs more than 99 ring closures"))?;
            open[number] = Some((a, b));
            smiles.push_str(&format_ring_number(number));
        }
        for k in freed {
            open[k] = None;
        }
    }
    Ok(smiles)
}

/// Bonds of a von Baeyer system. Atom 1 and atom `b1 + 2` are the main
/// bridgeheads; the main bridge is numbered from the end nearer atom 1 and
/// secondary bridges from the end nearer the higher numbered bridgehead.
pub fn von_baeyer_bonds(bridges: &[Bridge], rings: usize, chain: usize) -> Result<Vec<(usize, usize)>> {
    if rings < 2 {
        return Err(ChemError::component(format!("A von Baeyer system has at least two rings, not {rings}")));
    }
    if bridges.len() != rings + 1 {
        return Err(ChemError::component(format!(
            "Number of von Baeyer bridges ({}) does not match the number of rings ({})",
            bridges.len(),
            rings
        )));
    }
    let sum: usize = bridges.iter().map(|b| b.0).sum();
    if sum + 2 != chain {
        return Err(ChemError::component(format!(
            "Von Baeyer descriptor describes {} atoms but the chain has {}",
            sum + 2,
            chain
        )));
    }
    if bridges[..3].iter().any(|b| b.1.is_some()) || bridges[3..].iter().any(|b| b.1.is_none()) {
        return Err(ChemError::component(
            "Only secondary von Baeyer bridges take superscript locants",
        ));
    }
    let (b1, b2, b3) = (bridges[0].0, bridges[1].0, bridges[2].0);
    if b1 < b2 || b2 < b3 {
        return Err(ChemError::component("Main von Baeyer bridges must be in decreasing order"));
    }
    let mut bonds = Vec::new();
    let main_ring = b1 + b2 + 2;
    for i in 1..main_ring {
        bonds.push((i, i + 1));
    }
    bonds.push((main_ring, 1));

    let mut next = main_ring + 1;
    let mut add_bridge = |from: usize, to: usize, length: usize, bonds: &mut Vec<(usize, usize)>| {
        let mut prev = from;
        for _ in 0..length {
            bonds.push((prev, next));
            prev = next;
            next += 1;
        }
        bonds.push((prev, to));
    };
    add_bridge(1, b1 + 2, b3, &mut bonds);
    for (length, locants) in &bridges[3..] {
        let Some(locants) = locants else { continue };
        let [x, y] = locants[..] else {
            return Err(ChemError::component("A secondary bridge needs exactly two superscript locants"));
        };
        if x == 0 || y == 0 || x > chain || y > chain {
            return Err(ChemError::component(format!("Superscript locants {x},{y} are outside the system")));
        }
        add_bridge(x.max(y), x.min(y), *length, &mut bonds);
    }
    Ok(bonds)
}

/// Bonds of a spiro system from its segments. Walks the segments keeping a
/// stack of spiro atoms entered but not yet returned to.
pub fn spiro_bonds(segments: &[Bridge], spiro_atoms: usize, chain: usize) -> Result<Vec<(usize, usize)>> {
    let sum: usize = segments.iter().map(|s| s.0).sum();
    if sum + spiro_atoms != chain {
        return Err(ChemError::component(format!(
            "Spiro descriptor describes {} atoms but the chain has {}",
            sum + spiro_atoms,
            chain
        )));
    }
    let mut bonds = Vec::new();
    let mut atoms = 0;
    let mut created = 0;
    let mut stack: Vec<usize> = Vec::new();
    let mut prev: Option<usize> = None;
    for (length, superscript) in segments {
        for _ in 0..*length {
            atoms += 1;
            if let Some(p) = prev {
                bonds.push((p, atoms));
            }
            prev = Some(atoms);
        }
        let target = match superscript.as_deref() {
            Some([locant]) => {
                if *locant == 0 || *locant > atoms {
                    return Err(ChemError::component(format!("Spiro superscript {locant} refers to an unknown atom")));
                }
                stack.retain(|&s| s != *locant);
                *locant
            }
            Some(_) => return Err(ChemError::component("A spiro segment takes a single superscript locant")),
            None if created < spiro_atoms => {
                atoms += 1;
                created += 1;
                stack.push(atoms);
                atoms
            }
            None => stack
                .pop()
                .ok_or_else(|| ChemError::component("Spiro descriptor returns to a spiro atom that does not exist"))?,
        };
        let from = prev.ok_or_else(|| ChemError::component("Spiro descriptor starts with an empty segment"))?;
        bonds.push((from, target));
        prev = Some(target);
    }
    if created != spiro_atoms || !stack.is_empty() {
        return Err(ChemError::component(format!(
            "Spiro descriptor creates {created} spiro atoms but {spiro_atoms} were expected"
        )));
    }
    if let Some(last) = prev {
        if last != 1 {
            bonds.push((last, 1));
        }
    }
    Ok(bonds)
}

/// Rings built by repeated ortho fusion; each ring is its atoms in cyclic order.
#[derive(Debug, Default)]
pub struct RingLayout {
    pub atoms: usize,
    pub bonds: Vec<(usize, usize)>,
    pub rings: Vec<Vec<usize>>,
}

impl RingLayout {
    pub fn ring(size: usize) -> Self {
        let mut layout = RingLayout::default();
        let atoms: Vec<usize> = (1..=size).collect();
        for i in 0..size {
            layout.bonds.push((atoms[i], atoms[(i + 1) % size]));
        }
        layout.atoms = size;
        layout.rings.push(atoms);
        layout
    }

    /// Fuses a new ring of `size` onto edge (`position`, `position + 1`) of
    /// ring `ring`. The new ring lists the shared edge reversed, then its new
    /// atoms, so all rings share one orientation.
    pub fn fuse(&mut self, ring: usize, position: usize, size: usize) -> usize {
        let old = &self.rings[ring];
        let a = old[position % old.len()];
        let b = old[(position + 1) % old.len()];
        let mut new_ring = vec![b, a];
        let mut prev = a;
        for _ in 0..size - 2 {
            self.atoms += 1;
            self.bonds.push((prev, self.atoms));
            new_ring.push(self.atoms);
            prev = self.atoms;
        }
        self.bonds.push((prev, b));
        self.rings.push(new_ring);
        self.rings.len() - 1
    }

    pub fn to_smiles(&self) -> Result<String> {
        bonds_to_smiles(self.atoms, &self.bonds, "c")
    }
}

/// Position of the edge opposite the shared one in a hexagon (linear fusion).
const LINEAR: usize = 3;
/// Position of the edge one bond round from the shared one (angular fusion).
const ANGULAR: usize = 2;

pub fn polyacene(n: usize) -> RingLayout {
    let mut layout = RingLayout::ring(6);
    let mut last = 0;
    for i in 1..n {
        last = layout.fuse(last, if i == 1 { 0 } else { LINEAR }, 6);
    }
    layout
}

/// Two linear runs of rings joined by one angular fusion on ring `(n - 1) / 2`,
/// so odd members have a central kinked ring.
pub fn polyaphene(n: usize) -> RingLayout {
    let kink = n.saturating_sub(1) / 2;
    let mut layout = RingLayout::ring(6);
    let mut last = 0;
    for i in 1..n {
        let position = if i == 1 {
            0
        } else if i - 1 == kink {
            ANGULAR
        } else {
            LINEAR
        };
        last = layout.fuse(last, position, 6);
    }
    layout
}

pub fn polyhelicene(n: usize) -> RingLayout {
    let mut layout = RingLayout::ring(6);
    let mut last = 0;
    for i in 1..n {
        last = layout.fuse(last, if i == 1 { 0 } else { ANGULAR }, 6);
    }
    layout
}

pub fn polyalene(size: usize) -> RingLayout {
    let mut layout = RingLayout::ring(size);
    layout.fuse(0, 0, size);
    layout
}

/// A central ring of `2n` atoms with a benzene (or naphthalene) unit fused
/// onto every other edge.
pub fn polyphenylene(n: usize, naphthylene: bool) -> RingLayout {
    let mut layout = RingLayout::ring(2 * n);
    for k in 0..n {
        let unit = layout.fuse(0, 2 * k, 6);
        if naphthylene {
            layout.fuse(unit, LINEAR, 6);
        }
    }
    layout
}

fn multiplier_before(tree: &ParseTree, node: NodeId) -> Option<(NodeId, u32)> {
    let prev = tree
        .preceding_siblings(node)
        .into_iter()
        .find(|&n| tree.kind(n) != NodeKind::Hyphen)?;
    match tree.kind(prev) {
        NodeKind::Multiplier(v, _) => Some((prev, v)),
        _ => None,
    }
}

fn carbon_chain_after(tree: &ParseTree, node: NodeId) -> Result<NodeId> {
    tree.following_siblings(node)
        .into_iter()
        .find(|&n| tree.kind(n) != NodeKind::Hyphen)
        .filter(|&n| {
            tree.kind(n).is_group()
                && tree.attr(n, "value").map(|v| !v.is_empty() && v.chars().all(|c| c == 'C')).unwrap_or(false)
        })
        .ok_or_else(|| ChemError::component_at(format!("{} must be followed by a chain", tree.text(node)), tree.text(node)))
}

fn make_ring(tree: &mut ParseTree, group: NodeId, sub_type: GroupSubType, smiles: String, labels: &str, prefix: &str) {
    tree[group].kind = NodeKind::Group(GroupType::Ring, Some(sub_type));
    let text = format!("{}{}", prefix, tree.text(group));
    tree[group].text = text;
    tree.set_attr(group, "value", smiles);
    tree.set_attr(group, "labels", labels);
}

pub fn process_cyclo(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for cyclo in tree.children_of_kind(scope, |k| k == NodeKind::Cyclo) {
        let group = carbon_chain_after(tree, cyclo)?;
        let n = chain_length(tree, group)?;
        if n < 3 {
            return Err(ChemError::component_at("Alkane chain too small to create a cycle", tree.subtree_text(scope)));
        }
        let smiles = format!("C1{}1", "C".repeat(n - 1));
        let prefix = tree.text(cyclo).to_string();
        make_ring(tree, group, GroupSubType::Cycloalkane, smiles, "numeric", &prefix);
        tree.detach(cyclo);
    }
    Ok(())
}

pub fn process_annulenes(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for group in tree.children_of_kind(scope, |k| matches!(k, NodeKind::Group(_, Some(GroupSubType::Annulen)))) {
        if tree.has_attr(group, "value") {
            continue;
        }
        let text = tree.text(group).to_string();
        let digits: String = text.chars().skip_while(|c| !c.is_ascii_digit()).take_while(|c| c.is_ascii_digit()).collect();
        let n: usize = digits
            .parse()
            .map_err(|_| ChemError::component_at("Annulene without a ring size", text.clone()))?;
        if n < 3 {
            return Err(ChemError::component_at("Annulene ring size must be at least 3", text));
        }
        tree.set_attr(group, "value", format!("c1{}1", "c".repeat(n - 1)));
        tree.set_attr(group, "labels", "numeric");
        tree[group].kind = NodeKind::Group(GroupType::Ring, Some(GroupSubType::Annulen));
    }
    Ok(())
}

pub fn process_hydrocarbon_families(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    let groups = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Group(_, Some(GroupSubType::HydrocarbonFusedRingSystem))));
    for group in groups {
        let family = tree.attr_or_err(group, "value")?.to_string();
        let Some((multiplier, n)) = multiplier_before(tree, group) else {
            return Err(ChemError::component_at("Fused ring family without a multiplier", tree.text(group)));
        };
        let n = n as usize;
        let minimum = match family.as_str() {
            "acene" | "aphene" => 4,
            "alene" => 5,
            "phenylene" | "naphthylene" => 2,
            "helicene" => 6,
            other => return Err(ChemError::component_at(format!("Unknown fused ring family {other}"), tree.text(group))),
        };
        if n < minimum {
            return Err(ChemError::component_at(
                format!("poly{family} needs a multiplier of at least {minimum}"),
                tree.subtree_text(scope),
            ));
        }
        let layout = match family.as_str() {
            "acene" => polyacene(n),
            "aphene" => polyaphene(n),
            "alene" => polyalene(n),
            "phenylene" => polyphenylene(n, false),
            "naphthylene" => polyphenylene(n, true),
            _ => polyhelicene(n),
        };
        let prefix = tree.text(multiplier).to_string();
        make_ring(tree, group, GroupSubType::HydrocarbonFusedRingSystem, layout.to_smiles()?, "none", &prefix);
        tree.detach(multiplier);
        debug!("{} built with {} atoms", tree.text(group), layout.atoms);
    }
    Ok(())
}

pub fn process_von_baeyer(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for vb in tree.children_of_kind(scope, |k| k == NodeKind::VonBaeyer) {
        let text = tree.text(vb).to_string();
        let bridges = parse_ring_descriptor("cyclo", &text)?;
        let (multiplier, rings) = match multiplier_before(tree, vb) {
            Some((m, v)) => (Some(m), v as usize),
            None => (None, 2),
        };
        let group = carbon_chain_after(tree, vb)?;
        let n = chain_length(tree, group)?;
        let bonds = von_baeyer_bonds(&bridges, rings, n).map_err(|e| match e {
            ChemError::ComponentGeneration { message, .. } => ChemError::component_at(message, tree.subtree_text(scope)),
            other => other,
        })?;
        let smiles = bonds_to_smiles(n, &bonds, "C")?;
        let mut prefix = String::new();
        if let Some(m) = multiplier {
            prefix.push_str(tree.text(m));
            tree.detach(m);
        }
        prefix.push_str(&text);
        make_ring(tree, group, GroupSubType::VonBaeyer, smiles, "numeric", &prefix);
        tree.detach(vb);
        debug!("von Baeyer system {} -> {}", tree.text(group), tree.attr(group, "value").unwrap_or_default());
    }
    Ok(())
}

pub fn process_spiro(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for spiro in tree.children_of_kind(scope, |k| k == NodeKind::Spiro) {
        let text = tree.text(spiro).to_string();
        let segments = parse_ring_descriptor("spiro", &text)?;
        let (multiplier, spiro_atoms) = match multiplier_before(tree, spiro) {
            Some((m, v)) => (Some(m), v as usize),
            None => (None, 1),
        };
        let group = carbon_chain_after(tree, spiro)?;
        let n = chain_length(tree, group)?;
        let bonds = spiro_bonds(&segments, spiro_atoms, n).map_err(|e| match e {
            ChemError::ComponentGeneration { message, .. } => ChemError::component_at(message, tree.subtree_text(scope)),
            other => other,
        })?;
        let smiles = bonds_to_smiles(n, &bonds, "C")?;
        let mut prefix = String::new();
        if let Some(m) = multiplier {
            prefix.push_str(tree.text(m));
            tree.detach(m);
        }
        prefix.push_str(&text);
        make_ring(tree, group, GroupSubType::Spiro, smiles, "numeric", &prefix);
        tree.detach(spiro);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{FragmentManager, Labels};

    fn ring_sizes(smiles: &str) -> (usize, usize) {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles(smiles, &Labels::Numeric).unwrap();
        let atoms = mgr.frag(frag).unwrap().atoms.clone();
        let bonds: usize = atoms.iter().map(|&a| mgr.degree(a)).sum::<usize>() / 2;
        (atoms.len(), bonds)
    }

    #[test]
    fn test_descriptor_parsing() {
        let bridges = parse_ring_descriptor("cyclo", "cyclo[2.2.1.0^{2,6}]").unwrap();
        assert_eq!(bridges, vec![(2, None), (2, None), (1, None), (0, Some(vec![2, 6]))]);
        let bridges = parse_ring_descriptor("cyclo", "cyclo[3.3.1.1(3,7)]").unwrap();
        assert_eq!(bridges[3], (1, Some(vec![3, 7])));
        assert!(parse_ring_descriptor("spiro", "spiro[4.5").is_err());
    }

    #[test]
    fn test_norbornane() {
        let bridges = parse_ring_descriptor("cyclo", "cyclo[2.2.1]").unwrap();
        let bonds = von_baeyer_bonds(&bridges, 2, 7).unwrap();
        assert_eq!(bonds.len(), 8);
        assert!(bonds.contains(&(1, 7)) && bonds.contains(&(7, 4)));
        let smiles = bonds_to_smiles(7, &bonds, "C").unwrap();
        assert_eq!(ring_sizes(&smiles), (7, 8));
    }

    #[test]
    fn test_von_baeyer_invariant() {
        let bridges = parse_ring_descriptor("cyclo", "cyclo[2.2.1]").unwrap();
        for chain in [5, 6, 8, 9] {
            let err = von_baeyer_bonds(&bridges, 2, chain).unwrap_err();
            assert!(matches!(err, ChemError::ComponentGeneration { .. }));
        }
        assert!(von_baeyer_bonds(&bridges, 3, 7).is_err());
    }

    #[test]
    fn test_adamantane() {
        let bridges = parse_ring_descriptor("cyclo", "cyclo[3.3.1.1^{3,7}]").unwrap();
        let bonds = von_baeyer_bonds(&bridges, 3, 10).unwrap();
        assert_eq!(bonds.len(), 12);
        let smiles = bonds_to_smiles(10, &bonds, "C").unwrap();
        assert_eq!(ring_sizes(&smiles), (10, 12));
    }

    #[test]
    fn test_spiro_systems() {
        let segments = parse_ring_descriptor("spiro", "spiro[4.5]").unwrap();
        let bonds = spiro_bonds(&segments, 1, 10).unwrap();
        assert_eq!(bonds.len(), 11);
        assert!(bonds.contains(&(5, 1)) && bonds.contains(&(10, 5)));

        let segments = parse_ring_descriptor("spiro", "spiro[4.2.4.2]").unwrap();
        let bonds = spiro_bonds(&segments, 2, 14).unwrap();
        let smiles = bonds_to_smiles(14, &bonds, "C").unwrap();
        assert_eq!(ring_sizes(&smiles), (14, 16));

        assert!(spiro_bonds(&segments, 2, 15).is_err());
        assert!(spiro_bonds(&segments, 3, 15).is_err());
    }

    #[test]
    fn test_hydrocarbon_families() {
        assert_eq!(polyacene(4).atoms, 18);
        assert_eq!(polyaphene(4).atoms, 18);
        assert_eq!(polyhelicene(6).atoms, 26);
        assert_eq!(polyalene(5).atoms, 8);
        assert_eq!(polyphenylene(2, false).atoms, 12);
        assert_eq!(polyphenylene(3, false).atoms, 18);
        assert_eq!(polyphenylene(3, true).atoms, 30);
        let (atoms, bonds) = ring_sizes(&polyacene(4).to_smiles().unwrap());
        assert_eq!((atoms, bonds), (18, 21));
    }

    fn class_count(layout: &RingLayout) -> usize {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles(&layout.to_smiles().unwrap(), &Labels::Numeric).unwrap();
        let atoms = mgr.frag(frag).unwrap().atoms.clone();
        let classes: BTreeSet<usize> = mgr.symmetry_classes(&atoms).into_values().collect();
        classes.len()
    }

    /// Sum of shortest path lengths over all atom pairs.
    fn wiener_index(layout: &RingLayout) -> usize {
        let mut adjacent = vec![Vec::new(); layout.atoms + 1];
        for &(a, b) in &layout.bonds {
            adjacent[a].push(b);
            adjacent[b].push(a);
        }
        let mut total = 0;
        for start in 1..=layout.atoms {
            let mut dist = vec![usize::MAX; layout.atoms + 1];
            dist[start] = 0;
            let mut queue = std::collections::VecDeque::from([start]);
            while let Some(atom) = queue.pop_front() {
                for &n in &adjacent[atom] {
                    if dist[n] == usize::MAX {
                        dist[n] = dist[atom] + 1;
                        queue.push_back(n);
                    }
                }
            }
            total += dist[start + 1..].iter().sum::<usize>();
        }
        total
    }

    #[test]
    fn test_polyaphene_topology() {
        // odd members are symmetric about the central kinked ring
        assert_eq!(polyaphene(5).atoms, 22);
        assert_eq!(class_count(&polyaphene(5)), 11);
        assert_eq!(polyaphene(7).atoms, 30);
        assert_eq!(class_count(&polyaphene(7)), 15);
        // tetraphene has no symmetry left
        assert_eq!(class_count(&polyaphene(4)), 18);
        // and is not the linear acene
        assert_ne!(wiener_index(&polyaphene(4)), wiener_index(&polyacene(4)));
    }

    #[test]
    fn test_polyhelicene_topology() {
        // every angular fusion turns the same way
        let helicene = polyhelicene(6);
        let mut zigzag = RingLayout::ring(6);
        let mut last = 0;
        for i in 1..6 {
            last = zigzag.fuse(last, if i == 1 { 0 } else if i % 2 == 0 { ANGULAR } else { 6 - ANGULAR }, 6);
        }
        assert_eq!(helicene.atoms, zigzag.atoms);
        assert_eq!(helicene.bonds.len(), zigzag.bonds.len());
        assert!(wiener_index(&helicene) < wiener_index(&zigzag));
        assert_eq!(class_count(&helicene), 13);
    }

    #[test]
    fn test_von_baeyer_needs_two_rings() {
        let bridges = parse_ring_descriptor("cyclo", "cyclo[3.2]").unwrap();
        for rings in [0, 1] {
            let err = von_baeyer_bonds(&bridges, rings, 7).unwrap_err();
            assert!(matches!(err, ChemError::ComponentGeneration { .. }));
        }
    }

    #[test]
    fn test_family_multiplier_checked_before_building() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {multiplier value=1 "mono"} {group type=ring subType=hydrocarbonFusedRingSystem value=alene "alene"}}}}}"#;
        let mut tree = ParseTree::parse(text).unwrap();
        let scope = tree.substituents_and_roots(tree.root())[0];
        let err = process_hydrocarbon_families(&mut tree, scope).unwrap_err();
        assert!(matches!(err, ChemError::ComponentGeneration { .. }));
    }

    #[test]
    fn test_closure_digits_above_nine() {
        let n = 30;
        let bonds: Vec<(usize, usize)> = (1..=n).map(|i| (i, if i == n { 1 } else { i + 1 })).chain((1..=12).map(|i| (i, i + 14))).collect();
        let smiles = bonds_to_smiles(n, &bonds, "C").unwrap();
        assert!(smiles.contains('%'));
        assert_eq!(ring_sizes(&smiles), (30, 42));
    }
}
