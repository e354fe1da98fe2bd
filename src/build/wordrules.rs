//! The word rules: how the separately built words of a name are bonded into
//! one structure (or kept apart as the components of a salt).

use tracing::*;

use super::*;

/// One word of a word rule, built.
#[derive(Debug, Clone)]
pub enum Part {
    Full(Vec<FragId>),
    /// Substituent fragments, with the locant each was given, if any.
    Substituent(Vec<(FragId, Option<String>)>),
    Term(Term),
}

fn read_parts(state: &mut BuildState, tree: &ParseTree, rule: NodeId) -> Result<Vec<Part>> {
    let mut parts = Vec::new();
    for child in tree.child_vec(rule) {
        let part = match tree.kind(child) {
            NodeKind::WordRule(_) => Part::Full(build_word_rule(state, tree, child)?),
            NodeKind::Word(WordType::Full) => Part::Full(build_word(state, tree, child)?),
            NodeKind::Word(WordType::Substituent) => {
                let locants = tree
                    .children_of_kind(child, |k| k.is_scope())
                    .last()
                    .map(|&s| tree.locants(s))
                    .unwrap_or_default();
                let frags = build_word(state, tree, child)?;
                Part::Substituent(
                    frags
                        .into_iter()
                        .enumerate()
                        .map(|(k, f)| (f, locants.get(k).cloned()))
                        .collect(),
                )
            }
            NodeKind::Word(WordType::FunctionalTerm) => Part::Term(Term::read(tree, child)?),
            _ => continue,
        };
        parts.push(part);
    }
    Ok(parts)
}

fn full_frags(parts: &[Part]) -> Vec<FragId> {
    parts
        .iter()
        .flat_map(|p| match p {
            Part::Full(frags) => frags.clone(),
            _ => Vec::new(),
        })
        .collect()
}

fn substituents(parts: &[Part]) -> Vec<(FragId, Option<String>)> {
    parts
        .iter()
        .flat_map(|p| match p {
            Part::Substituent(subs) => subs.clone(),
            _ => Vec::new(),
        })
        .collect()
}

fn substituent_frags(parts: &[Part]) -> Vec<FragId> {
    substituents(parts).into_iter().map(|(f, _)| f).collect()
}

fn terms(parts: &[Part]) -> Vec<Term> {
    parts
        .iter()
        .filter_map(|p| match p {
            Part::Term(t) => Some(t.clone()),
            _ => None,
        })
        .collect()
}

fn single_term(parts: &[Part], rule: WordRule) -> Result<Term> {
    match terms(parts).as_slice() {
        [term] => Ok(term.clone()),
        [] => Err(ChemError::component(format!("The {rule} word rule needs a functional term"))),
        more => Err(ChemError::component(format!("The {rule} word rule takes one functional term, not {}", more.len()))),
    }
}

fn out_count(state: &BuildState, frags: &[FragId]) -> Result<usize> {
    let mut n = 0;
    for &f in frags {
        n += state.mgr.frag(f)?.out_atoms.len();
    }
    Ok(n)
}

fn has_out_atoms(state: &BuildState, frag: FragId) -> Result<bool> {
    Ok(!state.mgr.frag(frag)?.out_atoms.is_empty())
}

/// Merges fragments that have become bonded to each other; returns one
/// fragment per connected structure, in their original order.
pub fn merge_connected(state: &mut BuildState, frags: Vec<FragId>) -> Result<Vec<FragId>> {
    let mut remaining: Vec<FragId> = Vec::with_capacity(frags.len());
    for f in frags {
        if !remaining.contains(&f) {
            remaining.push(f);
        }
    }
    let mut out = Vec::new();
    while !remaining.is_empty() {
        let frag = remaining.remove(0);
        loop {
            let atoms = state.mgr.frag(frag)?.atoms.clone();
            let other = atoms
                .iter()
                .flat_map(|&a| state.mgr.neighbours(a))
                .map(|n| state.mgr[n].frag)
                .find(|&f| f != frag);
            match other {
                Some(o) => {
                    state.mgr.incorporate_fragment(o, frag)?;
                    remaining.retain(|&f| f != o);
                }
                None => break,
            }
        }
        out.push(frag);
    }
    Ok(out)
}

/// The single neighbour of a terminal atom.
fn sole_neighbour(state: &BuildState, atom: AtomId) -> Result<AtomId> {
    match state.mgr.neighbours(atom).as_slice() {
        [n] => Ok(*n),
        _ => Err(ChemError::building(format!("{} is not a terminal atom", state.mgr.describe(atom)))),
    }
}

fn next_functional_atom(state: &BuildState, acids: &[FragId], locant: Option<&str>) -> Result<AtomId> {
    let mut candidates = Vec::new();
    for &acid in acids {
        candidates.extend(state.mgr.frag(acid)?.functional_atoms.iter().copied());
    }
    match locant {
        Some(l) => candidates
            .into_iter()
            .find(|&f| state.mgr[f].has_locant(l) || state.mgr.neighbours(f).iter().any(|&n| state.mgr[n].has_locant(l)))
            .ok_or_else(|| ChemError::building(format!("No acid group at locant {l}"))),
        None => candidates
            .first()
            .copied()
            .ok_or_else(|| ChemError::building("No acid group left to use")),
    }
}

fn use_functional_atom(state: &mut BuildState, atom: AtomId) -> Result<()> {
    let frag = state.mgr[atom].frag;
    state.mgr.frag_mut(frag)?.functional_atoms.retain(|&a| a != atom);
    let a = &mut state.mgr[atom];
    if a.charge < 0 {
        a.charge = 0;
        a.proton_delta = 0;
    }
    Ok(())
}

/// Pairs every out atom of the alkyl groups with an acid group.
fn esterify(state: &mut BuildState, alkyls: Vec<(FragId, Option<String>)>, acids: Vec<FragId>) -> Result<Vec<FragId>> {
    if acids.is_empty() {
        return Err(ChemError::component("An ester needs an acid"));
    }
    let alkyl_frags: Vec<FragId> = alkyls.iter().map(|&(f, _)| f).collect();
    let outs = out_count(state, &alkyl_frags)?;
    let mut functional = 0;
    for &acid in &acids {
        functional += state.mgr.frag(acid)?.functional_atoms.len();
    }
    let mut acids = acids;
    if outs > functional {
        if acids.len() == 1 && functional > 0 && outs % functional == 0 {
            acids = multiply_fragment(state, acids[0], outs / functional)?;
            debug!("acid taken {} times for {} ester groups", acids.len(), outs);
        } else {
            return Err(ChemError::building(format!(
                "{outs} ester group(s) but {functional} acid group(s)"
            )));
        }
    }
    for (alkyl, locant) in alkyls {
        let mut locant = locant;
        while has_out_atoms(state, alkyl)? {
            let oxygen = next_functional_atom(state, &acids, locant.take().as_deref())?;
            use_functional_atom(state, oxygen)?;
            bond_out_atom(state, alkyl, oxygen)?;
        }
    }
    merge_connected(state, acids.into_iter().chain(alkyl_frags).collect())
}

fn ester(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    esterify(state, substituents(parts), full_frags(parts))
}

/// "ethyl propanoate methyl butanoate": each acid takes the alkyl words
/// written before it.
fn multi_ester(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let mut components = Vec::new();
    let mut pending = Vec::new();
    for part in parts {
        match part {
            Part::Substituent(subs) => pending.extend(subs.iter().cloned()),
            Part::Full(frags) => components.extend(esterify(state, std::mem::take(&mut pending), frags.clone())?),
            Part::Term(_) => {}
        }
    }
    if !pending.is_empty() {
        return Err(ChemError::component("Ester groups without an acid"));
    }
    Ok(components)
}

/// "diethyl ether": the term joins two groups.
fn divalent_functional_group(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let term = single_term(parts, WordRule::DivalentFunctionalGroup)?;
    let (frag, attach) = term.instantiate(state)?;
    if attach.len() != 2 {
        return Err(ChemError::component_at("This term does not join two groups", term.name.clone()));
    }
    let subs = substituent_frags(parts);
    let mut slots = attach.into_iter();
    for &sub in &subs {
        while has_out_atoms(state, sub)? {
            let atom = slots
                .next()
                .ok_or_else(|| ChemError::building(format!("Too many groups for {}", term.name)))?;
            bond_out_atom(state, sub, atom)?;
        }
    }
    if slots.next().is_some() {
        return Err(ChemError::building(format!("{} needs two groups", term.name)));
    }
    merge_connected(state, std::iter::once(frag).chain(subs).collect())
}

/// "ethyl alcohol", "ethylene dibromide": one copy of the term per out atom.
fn monovalent_functional_group(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let term = single_term(parts, WordRule::MonovalentFunctionalGroup)?;
    let subs = substituent_frags(parts);
    let outs = out_count(state, &subs)?;
    if term.multiplier > 1 && term.multiplier as usize != outs {
        return Err(ChemError::building(format!(
            "{} {} for {} attachment point(s)",
            term.multiplier, term.name, outs
        )));
    }
    let mut frags = subs.clone();
    for &sub in &subs {
        while has_out_atoms(state, sub)? {
            let (frag, attach) = term.instantiate(state)?;
            let atom = *attach
                .first()
                .ok_or_else(|| ChemError::component_at("This term cannot be attached", term.name.clone()))?;
            bond_out_atom(state, sub, atom)?;
            frags.push(frag);
        }
    }
    merge_connected(state, frags)
}

fn functional_class_ester(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let term = single_term(parts, WordRule::FunctionalClassEster)?;
    if !term.is("ester") {
        return Err(ChemError::component_at("Expected the word ester", term.name));
    }
    esterify(state, substituents(parts), full_frags(parts))
}

const OXIDE_PREFERENCE: [ChemEl; 7] = [ChemEl::N, ChemEl::P, ChemEl::As, ChemEl::Sb, ChemEl::S, ChemEl::Se, ChemEl::Te];

fn oxide_atom(state: &BuildState, frags: &[FragId], locant: Option<&str>, done: &[AtomId]) -> Result<AtomId> {
    let mut atoms = Vec::new();
    for &f in frags {
        atoms.extend(state.mgr.frag(f)?.atoms.iter().copied().filter(|a| !done.contains(a)));
    }
    let found = match locant {
        Some(l) => atoms.iter().copied().find(|&a| state.mgr[a].has_locant(l)).or_else(|| {
            ChemEl::from_symbol(l).and_then(|el| atoms.iter().copied().find(|&a| state.mgr[a].el == el))
        }),
        None => OXIDE_PREFERENCE
            .iter()
            .find_map(|&el| atoms.iter().copied().find(|&a| state.mgr[a].el == el && state.mgr[a].charge == 0)),
    };
    found.ok_or_else(|| ChemError::building(format!("No atom to form the oxide at {}", locant.unwrap_or("any position"))))
}

/// "pyridine N-oxide" is charge separated; "triphenylphosphine oxide" has P=O.
fn oxide(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let term = single_term(parts, WordRule::Oxide)?;
    let fulls = full_frags(parts);
    let mut done = Vec::new();
    for k in 0..term.multiplier as usize {
        let atom = oxide_atom(state, &fulls, term.locants.get(k).map(String::as_str), &done)?;
        let frag = state.mgr[atom].frag;
        let oxygen = state.mgr.create_atom(ChemEl::O, frag)?;
        if state.mgr[atom].el == ChemEl::N {
            state.mgr.create_bond(atom, oxygen, 1)?;
            state.mgr[atom].charge += 1;
            state.mgr[oxygen].charge = -1;
        } else {
            state.mgr.create_bond(atom, oxygen, 2)?;
        }
        debug!("oxide on {}", state.mgr.describe(atom));
        done.push(atom);
    }
    merge_connected(state, fulls)
}

/// A C=O oxygen, on the carbon with `locant` when one is given. Ketone and
/// aldehyde oxygens are preferred over acid and amide ones.
fn carbonyl_oxygen(state: &BuildState, frags: &[FragId], locant: Option<&str>) -> Result<AtomId> {
    let mut found = Vec::new();
    for &f in frags {
        for &a in &state.mgr.frag(f)?.atoms {
            if state.mgr[a].el != ChemEl::O || state.mgr[a].charge != 0 {
                continue;
            }
            if let [(c, 2)] = state.mgr.bonded(a)[..] {
                if state.mgr[c].el == ChemEl::C && locant.map_or(true, |l| state.mgr[c].has_locant(l)) {
                    found.push((a, c));
                }
            }
        }
    }
    let plain = |&(a, c): &(AtomId, AtomId)| {
        state
            .mgr
            .neighbours(c)
            .iter()
            .all(|&n| n == a || !matches!(state.mgr[n].el, ChemEl::O | ChemEl::N | ChemEl::S))
    };
    found
        .iter()
        .find(|&p| plain(p))
        .or_else(|| found.first())
        .map(|&(a, _)| a)
        .ok_or_else(|| ChemError::building(format!("No carbonyl group found{}", locant.map(|l| format!(" at {l}")).unwrap_or_default())))
}

/// "acetone oxime": the term replaces the carbonyl oxygen.
fn carbonyl_derivative(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let term = single_term(parts, WordRule::CarbonylDerivative)?;
    let fulls = full_frags(parts);
    let mut frags = fulls.clone();
    let mut added = Vec::new();
    for k in 0..term.multiplier as usize {
        let oxygen = carbonyl_oxygen(state, &fulls, term.locants.get(k).map(String::as_str))?;
        let carbon = sole_neighbour(state, oxygen)?;
        state.mgr.remove_atom(oxygen)?;
        let (frag, attach) = term.instantiate(state)?;
        let atom = *attach
            .first()
            .ok_or_else(|| ChemError::component_at("This term cannot replace a carbonyl", term.name.clone()))?;
        state.mgr.create_bond(carbon, atom, 2)?;
        added.push(frag);
    }
    // "acetone O-methyloxime": substituent words go on the term
    for sub in substituent_frags(parts) {
        let target = *added
            .first()
            .ok_or_else(|| ChemError::building("Nothing to attach the substituent to"))?;
        let valency = state.mgr.frag(sub)?.out_atoms.first().map(|o| o.valency).unwrap_or(1);
        let atom = find_atom_for_substitution(state, target, valency)?;
        bond_out_atom(state, sub, atom)?;
        frags.push(sub);
    }
    frags.extend(added);
    merge_connected(state, frags)
}

/// Joins two acid groups through `keep`; the other oxygen goes.
fn join_acids(state: &mut BuildState, keep: AtomId, gone: AtomId) -> Result<()> {
    let carbon = sole_neighbour(state, gone)?;
    state.mgr.remove_atom(gone)?;
    use_functional_atom(state, keep)?;
    state.mgr.create_bond(carbon, keep, 1)?;
    Ok(())
}

fn functional_atoms(state: &BuildState, frag: FragId) -> Result<Vec<AtomId>> {
    let fragment = state.mgr.frag(frag)?;
    if fragment.functional_atoms.is_empty() {
        return Err(ChemError::building(format!("{} has no acid group to form an anhydride", fragment.token)));
    }
    Ok(fragment.functional_atoms.clone())
}

/// "acetic anhydride", "acetic propanoic anhydride", "succinic anhydride".
fn anhydride(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let term = single_term(parts, WordRule::Anhydride)?;
    if !term.name.ends_with("anhydride") {
        return Err(ChemError::component_at("Expected the word anhydride", term.name));
    }
    let acids = full_frags(parts);
    match acids.as_slice() {
        [acid] => {
            let atoms = functional_atoms(state, *acid)?;
            if atoms.len() >= 2 {
                join_acids(state, atoms[0], atoms[1])?;
                Ok(vec![*acid])
            } else {
                let (copy, _) = state.mgr.copy_fragment(*acid)?;
                let other = functional_atoms(state, copy)?;
                join_acids(state, atoms[0], other[0])?;
                merge_connected(state, vec![*acid, copy])
            }
        }
        [a, b] => {
            let keep = functional_atoms(state, *a)?[0];
            let gone = functional_atoms(state, *b)?[0];
            join_acids(state, keep, gone)?;
            merge_connected(state, vec![*a, *b])
        }
        _ => Err(ChemError::component("An anhydride is formed from one or two acids")),
    }
}

/// "sulfuric dichloride": each halide replaces an acid hydroxy group.
fn acid_halide(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let acids = full_frags(parts);
    let mut frags = acids.clone();
    for term in terms(parts) {
        for _ in 0..term.multiplier {
            let oxygen = next_functional_atom(state, &acids, None)
                .map_err(|_| ChemError::building(format!("Not enough acid groups for {}", term.name)))?;
            let centre = sole_neighbour(state, oxygen)?;
            state.mgr.remove_atom(oxygen)?;
            let (frag, attach) = term.instantiate(state)?;
            let atom = *attach
                .first()
                .ok_or_else(|| ChemError::component_at("This term cannot replace an acid group", term.name.clone()))?;
            state.mgr.create_bond(centre, atom, 1)?;
            frags.push(frag);
        }
    }
    merge_connected(state, frags)
}

/// "copper sulfate pentahydrate": separate components in a stated ratio.
fn addition_compound(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let mut components = full_frags(parts);
    for term in terms(parts) {
        for _ in 0..term.multiplier {
            let (frag, _) = term.instantiate(state)?;
            components.push(frag);
        }
    }
    state.explicit_stoichiometry = true;
    Ok(components)
}

/// HO-X-OH, or HO-X-O-X-OH for "diethylene glycol". Returns the structure
/// and its two terminal oxygens.
fn glycol_chain(state: &mut BuildState, links: &[FragId]) -> Result<(FragId, [AtomId; 2])> {
    if links.is_empty() {
        return Err(ChemError::component("A glycol needs a divalent group"));
    }
    let mut frags = Vec::new();
    let first = state.mgr.build_from_smiles("O", &Labels::None)?;
    let mut previous = state.mgr.frag(first)?.atoms[0];
    let start = previous;
    frags.push(first);
    for &link in links {
        if state.mgr.frag(link)?.out_atoms.len() != 2 {
            return Err(ChemError::building(format!(
                "{} is not a divalent group",
                state.mgr.frag(link)?.token
            )));
        }
        bond_out_atom(state, link, previous)?;
        let next = state.mgr.build_from_smiles("O", &Labels::None)?;
        let oxygen = state.mgr.frag(next)?.atoms[0];
        bond_out_atom(state, link, oxygen)?;
        frags.push(link);
        frags.push(next);
        previous = oxygen;
    }
    let merged = merge_connected(state, frags)?;
    match merged.as_slice() {
        [single] => Ok((*single, [start, previous])),
        _ => Err(ChemError::internal("glycol chain is not connected")),
    }
}

fn glycol(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let term = single_term(parts, WordRule::Glycol)?;
    if !term.is("glycol") {
        return Err(ChemError::component_at("Expected the word glycol", term.name));
    }
    let (frag, _) = glycol_chain(state, &substituent_frags(parts))?;
    Ok(vec![frag])
}

/// "ethylene glycol dimethyl ether": the groups after "glycol" cap its
/// hydroxy ends.
fn glycol_ether(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let split = parts
        .iter()
        .position(|p| matches!(p, Part::Term(t) if t.is("glycol")))
        .ok_or_else(|| ChemError::component("A glycol ether needs the word glycol"))?;
    let (frag, ends) = glycol_chain(state, &substituent_frags(&parts[..split]))?;
    let caps = substituent_frags(&parts[split + 1..]);
    let mut ends = ends.into_iter();
    for &cap in &caps {
        while has_out_atoms(state, cap)? {
            let oxygen = ends
                .next()
                .ok_or_else(|| ChemError::building("A glycol has only two ends to form ethers with"))?;
            bond_out_atom(state, cap, oxygen)?;
        }
    }
    merge_connected(state, std::iter::once(frag).chain(caps).collect())
}

/// "acetaldehyde diethyl acetal": the carbonyl oxygen becomes two oxygens
/// that the alkyl groups go on.
fn acetal(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let term = single_term(parts, WordRule::Acetal)?;
    let fulls = full_frags(parts);
    let mut oxygens = Vec::new();
    for k in 0..term.multiplier as usize {
        let oxygen = carbonyl_oxygen(state, &fulls, term.locants.get(k).map(String::as_str))?;
        let carbon = sole_neighbour(state, oxygen)?;
        state.mgr.remove_atom(oxygen)?;
        let frag = state.mgr[carbon].frag;
        for _ in 0..2 {
            let o = state.mgr.create_atom(ChemEl::O, frag)?;
            state.mgr.create_bond(carbon, o, 1)?;
            oxygens.push(o);
        }
    }
    let subs = substituent_frags(parts);
    let mut slots = oxygens.into_iter();
    for &sub in &subs {
        while has_out_atoms(state, sub)? {
            let oxygen = slots
                .next()
                .ok_or_else(|| ChemError::building(format!("Too many groups for the {}", term.name)))?;
            bond_out_atom(state, sub, oxygen)?;
        }
    }
    merge_connected(state, fulls.into_iter().chain(subs).collect())
}

/// "glycerol triacetate": each acid word esterifies a hydroxy group of the
/// alcohol.
fn potential_alcohol_ester(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let mut fulls = parts.iter().filter_map(|p| match p {
        Part::Full(frags) => Some(frags.clone()),
        _ => None,
    });
    let alcohol = fulls
        .next()
        .and_then(|f| f.first().copied())
        .ok_or_else(|| ChemError::component("An alcohol ester needs an alcohol"))?;
    let acids: Vec<FragId> = fulls.flatten().collect();
    let hydroxys = hydroxy_oxygens(&state.mgr, alcohol)?;
    if acids.len() > hydroxys.len() {
        return Err(ChemError::building(format!(
            "{} acid(s) for {} hydroxy group(s)",
            acids.len(),
            hydroxys.len()
        )));
    }
    for (&acid, &oxygen) in acids.iter().zip(&hydroxys) {
        let gone = *functional_atoms(state, acid)?
            .first()
            .ok_or_else(|| ChemError::internal("functional atoms vanished"))?;
        let carbon = sole_neighbour(state, gone)?;
        state.mgr.remove_atom(gone)?;
        state.mgr.create_bond(carbon, oxygen, 1)?;
    }
    merge_connected(state, std::iter::once(alcohol).chain(acids).collect())
}

/// "cyclo(glycylglycyl...)": the terminal amine bonds to the terminal acid.
fn cyclic_peptide(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let merged = merge_connected(state, full_frags(parts))?;
    let frag = match merged.as_slice() {
        [single] => *single,
        _ => return Err(ChemError::component("A cyclic peptide must be one chain")),
    };
    let atoms = state.mgr.frag(frag)?.atoms.clone();
    let nitrogen = atoms
        .iter()
        .copied()
        .find(|&a| state.mgr[a].el == ChemEl::N && state.mgr.hydrogen_count(a) >= 1)
        .ok_or_else(|| ChemError::building("No amino terminus to close the peptide"))?;
    let hydroxy = hydroxy_oxygens(&state.mgr, frag)?
        .into_iter()
        .rev()
        .find(|&o| {
            state.mgr.neighbours(o).first().map_or(false, |&c| {
                state.mgr.bonded(c).iter().any(|&(n, order)| order == 2 && state.mgr[n].el == ChemEl::O)
            })
        })
        .ok_or_else(|| ChemError::building("No carboxy terminus to close the peptide"))?;
    let carbon = sole_neighbour(state, hydroxy)?;
    state.mgr.remove_atom(hydroxy)?;
    state.mgr.create_bond(carbon, nitrogen, 1)?;
    debug!("peptide closed between {} and {}", state.mgr.describe(carbon), state.mgr.describe(nitrogen));
    Ok(vec![frag])
}

fn first_amine_nitrogen(state: &BuildState, frag: FragId) -> Result<Option<AtomId>> {
    Ok(state
        .mgr
        .frag(frag)?
        .atoms
        .iter()
        .copied()
        .find(|&a| state.mgr[a].el == ChemEl::N && state.mgr.substitutable_hydrogens(a) >= 1))
}

/// "ethylenediaminetetraacetic acid": the linker's out atoms go on the
/// amine nitrogens of the copies of the rest of the name.
fn amine_di_conjunctive_suffix(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let links = substituent_frags(parts);
    let needed = out_count(state, &links)?;
    let mut amines = full_frags(parts);
    if amines.len() == 1 && needed > 1 {
        amines = multiply_fragment(state, amines[0], needed)?;
    }
    let mut nitrogens = Vec::new();
    for &amine in &amines {
        if let Some(n) = first_amine_nitrogen(state, amine)? {
            nitrogens.push(n);
        }
    }
    if nitrogens.len() < needed {
        return Err(ChemError::building(format!("{needed} amine nitrogens needed, {} found", nitrogens.len())));
    }
    let mut slots = nitrogens.into_iter();
    for &link in &links {
        while has_out_atoms(state, link)? {
            let n = slots.next().ok_or_else(|| ChemError::internal("amine nitrogens ran out"))?;
            bond_out_atom(state, link, n)?;
        }
    }
    merge_connected(state, amines.into_iter().chain(links).collect())
}

/// "poly(oxyethylene)": one repeat unit, its open ends written as wildcards.
fn polymer(state: &mut BuildState, parts: &[Part]) -> Result<Vec<FragId>> {
    let units = substituent_frags(parts);
    if units.is_empty() {
        return Err(ChemError::component("A polymer needs a repeat unit"));
    }
    for &unit in &units {
        while has_out_atoms(state, unit)? {
            let out = take_out_atom(state, unit)?;
            let end = state.mgr.create_atom(ChemEl::R, unit)?;
            state.mgr.create_bond(out.atom, end, out.valency as u8)?;
        }
    }
    merge_connected(state, units)
}

fn no_terms(parts: &[Part], rule: WordRule) -> Result<()> {
    match terms(parts).first() {
        Some(t) => Err(ChemError::component_at(format!("Unexpected functional term in a {rule} name"), t.name.clone())),
        None => Ok(()),
    }
}

/// Builds every word of a word rule and combines them. Returns the
/// disconnected components.
pub fn build_word_rule(state: &mut BuildState, tree: &ParseTree, rule: NodeId) -> Result<Vec<FragId>> {
    let NodeKind::WordRule(kind) = tree.kind(rule) else {
        return Err(ChemError::internal(format!("{rule} is not a word rule")));
    };
    let parts = read_parts(state, tree, rule)?;
    state.word_rule = Some(kind);
    debug!("word rule {} over {} word(s)", kind, parts.len());
    let components = match kind {
        WordRule::Simple | WordRule::Substituent => {
            no_terms(&parts, kind)?;
            full_frags(&parts).into_iter().chain(substituent_frags(&parts)).collect()
        }
        WordRule::Ester => ester(state, &parts)?,
        WordRule::MultiEster => multi_ester(state, &parts)?,
        WordRule::DivalentFunctionalGroup => divalent_functional_group(state, &parts)?,
        WordRule::MonovalentFunctionalGroup => monovalent_functional_group(state, &parts)?,
        WordRule::FunctionalClassEster => functional_class_ester(state, &parts)?,
        WordRule::Oxide => oxide(state, &parts)?,
        WordRule::CarbonylDerivative => carbonyl_derivative(state, &parts)?,
        WordRule::Anhydride => anhydride(state, &parts)?,
        WordRule::AcidHalideOrPseudoHalide => acid_halide(state, &parts)?,
        WordRule::AdditionCompound => addition_compound(state, &parts)?,
        WordRule::Glycol => glycol(state, &parts)?,
        WordRule::GlycolEther => glycol_ether(state, &parts)?,
        WordRule::Acetal => acetal(state, &parts)?,
        WordRule::PotentialAlcoholEster => potential_alcohol_ester(state, &parts)?,
        WordRule::CyclicPeptide => cyclic_peptide(state, &parts)?,
        WordRule::AmineDiConjunctiveSuffix => amine_di_conjunctive_suffix(state, &parts)?,
        WordRule::Polymer => polymer(state, &parts)?,
    };
    Ok(components)
}
