//! Named corrections for tokens whose meaning depends on their neighbours.

use tracing::*;

use super::*;

fn suffixes(tree: &ParseTree, scope: NodeId) -> Vec<NodeId> {
    tree.children_of_kind(scope, |k| matches!(k, NodeKind::Suffix(_)))
}

fn suffix_value<'a>(tree: &'a ParseTree, suffix: NodeId) -> &'a str {
    tree.attr(suffix, "value").unwrap_or_default()
}

/// The locant written directly before `node`, hyphens skipped.
fn locant_before(tree: &ParseTree, node: NodeId) -> Option<NodeId> {
    tree.preceding_siblings(node)
        .into_iter()
        .find(|&n| tree.kind(n) != NodeKind::Hyphen)
        .filter(|&n| matches!(tree.kind(n), NodeKind::Locant(_)))
}

/// The locant governing a suffix: directly in front of it, or in front of
/// the whole scope when nothing else there claims it.
fn suffix_locant(tree: &ParseTree, scope: NodeId, suffix: NodeId) -> Option<NodeId> {
    if let Some(l) = locant_before(tree, suffix) {
        return Some(l);
    }
    let first = *tree.children(scope).first()?;
    matches!(tree.kind(first), NodeKind::Locant(_)).then_some(first)
}

fn new_multiplier(tree: &mut ParseTree, value: u32, text: &str) -> NodeId {
    tree.create(NodeKind::Multiplier(value, MultiplierType::Basic), text)
}

pub fn remove_mono(tree: &mut ParseTree, scope: NodeId) {
    for m in tree.children_of_kind(scope, |k| k == NodeKind::Multiplier(1, MultiplierType::Basic)) {
        trace!("dropped multiplier {}", tree.text(m));
        tree.detach(m);
    }
}

/// "benzoquinone" is a dione: the suffix becomes "one" under a doubled
/// multiplier, and a two valued locant in front of the group moves onto it.
pub fn quinone_to_dione(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for suffix in suffixes(tree, scope) {
        if suffix_value(tree, suffix) != "quinone" {
            continue;
        }
        tree.set_attr(suffix, "value", "one");
        let existing = tree
            .prev_sibling(suffix)
            .filter(|&p| matches!(tree.kind(p), NodeKind::Multiplier(_, MultiplierType::Basic)));
        let multiplier = match existing {
            Some(m) => {
                let NodeKind::Multiplier(v, t) = tree.kind(m) else {
                    return Err(ChemError::internal("multiplier kind changed under us"));
                };
                tree[m].kind = NodeKind::Multiplier(v * 2, t);
                m
            }
            None => {
                let m = new_multiplier(tree, 2, "");
                tree.insert_before(suffix, m)?;
                m
            }
        };
        if let Some(locant) = suffix_locant(tree, scope, suffix) {
            if tree.locants(locant).len() == 2 && tree.next_sibling(locant) != Some(multiplier) {
                tree.insert_before(multiplier, locant)?;
            }
        }
        debug!("quinone read as dione in {}", tree.subtree_text(scope));
    }
    Ok(())
}

/// "ylene" is two "yl"s, or one "ylidene" when a single locant is given.
pub fn ylene_to_diyl(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for suffix in suffixes(tree, scope) {
        if suffix_value(tree, suffix) != "ylene" {
            continue;
        }
        let locant = suffix_locant(tree, scope, suffix);
        let count = locant.map(|l| tree.locants(l).len()).unwrap_or(0);
        if count == 1 {
            tree.set_attr(suffix, "value", "ylidene");
            continue;
        }
        tree.set_attr(suffix, "value", "yl");
        let multiplier = new_multiplier(tree, 2, "");
        tree.insert_before(suffix, multiplier)?;
        match locant {
            Some(l) if count == 2 => tree.insert_before(multiplier, l)?,
            Some(_) => {
                return Err(ChemError::component_at(
                    "ylene takes one or two locants",
                    tree.subtree_text(scope),
                ))
            }
            None => {
                let group = tree.scope_group_or_err(scope)?;
                if matches!(tree.kind(group), NodeKind::Group(GroupType::Chain, _)) {
                    let chain = tree.attr(group, "value").map(str::len).unwrap_or(0);
                    let default = if chain == 1 { "1,1" } else { "1,2" };
                    let l = tree.create(NodeKind::Locant(LocantRole::Unresolved), "");
                    tree.set_attr(l, "locant", default);
                    tree.insert_before(multiplier, l)?;
                }
            }
        }
    }
    Ok(())
}

/// Picks the SMILES of phosphoric/phosphonic/phosphinic (and -ous) acids
/// from the stem text and suffix.
pub fn phosphorus_oxoacid(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    let Some(group) = tree.scope_group(scope) else {
        return Ok(());
    };
    if !matches!(tree.kind(group), NodeKind::Group(_, Some(GroupSubType::PhosphorusOxoacid))) {
        return Ok(());
    }
    let stem = tree.text(group).to_lowercase();
    let ous = suffixes(tree, scope).iter().any(|&s| matches!(suffix_value(tree, s), "ous" | "ite"));
    let (smiles, lambda) = match (stem.as_str(), ous) {
        (s, false) if s.starts_with("phosphor") => ("P(=O)(O)(O)O", None),
        (s, false) if s.starts_with("phosphon") => ("P(=O)(O)O", None),
        (s, false) if s.starts_with("phosphin") => ("P(=O)O", Some(5)),
        (s, true) if s.starts_with("phosphor") => ("P(O)(O)O", None),
        (s, true) if s.starts_with("phosphon") => ("P(O)O", None),
        (s, true) if s.starts_with("phosphin") => ("PO", None),
        _ => {
            return Err(ChemError::component_at("Unknown phosphorus oxoacid stem", tree.text(group)));
        }
    };
    tree.set_attr(group, "value", smiles);
    tree.set_attr(group, "labels", "none");
    if let Some(v) = lambda {
        let node = tree.create(NodeKind::Lambda(v), "");
        tree.set_attr(node, "locant", "P");
        tree.insert_before(group, node)?;
    }
    Ok(())
}

/// "phospho" on a nucleotide or sugar is the phosphate monoester group
/// rather than the bare PO2 substituent.
pub fn is_biochemical_phospho_context(tree: &ParseTree, scope: NodeId) -> bool {
    let Some(word) = tree.word_of(scope) else {
        return false;
    };
    let scopes = tree.substituents_and_roots(word);
    let Some(index) = scopes.iter().position(|&s| s == scope) else {
        return false;
    };
    scopes[index + 1..]
        .iter()
        .filter_map(|&s| tree.scope_group(s))
        .next()
        .map(|g| {
            matches!(
                tree.kind(g),
                NodeKind::Group(_, Some(GroupSubType::Biochemical | GroupSubType::Carbohydrate))
            )
        })
        .unwrap_or(false)
}

pub fn biochemical_phospho(tree: &mut ParseTree, scope: NodeId) {
    let Some(group) = tree.scope_group(scope) else {
        return;
    };
    if tree.text(group) != "phospho" || tree.attr(group, "value") != Some("P(=O)=O") {
        return;
    }
    if is_biochemical_phospho_context(tree, scope) {
        tree.set_attr(group, "value", "P(=O)(O)O");
        debug!("phospho read as a phosphate group");
    }
}

const NINE_POSITION_RINGS: &[&str] = &["anthracen", "xanthen", "acridin", "thioxanthen"];

/// Anthrone, xanthone and friends put an unlocanted one/ol/ylidene at 9.
pub fn default_locant_nine(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    let Some(group) = tree.scope_group(scope) else {
        return Ok(());
    };
    let text = tree.text(group).to_lowercase();
    if !NINE_POSITION_RINGS.iter().any(|r| text.starts_with(r)) {
        return Ok(());
    }
    if !tree.children_of_kind(scope, |k| matches!(k, NodeKind::Locant(_))).is_empty() {
        return Ok(());
    }
    for suffix in suffixes(tree, scope) {
        if matches!(suffix_value(tree, suffix), "one" | "ol" | "ylidene") {
            let locant = tree.create(NodeKind::Locant(LocantRole::Unresolved), "");
            tree.set_attr(locant, "locant", "9");
            tree.insert_before(suffix, locant)?;
            debug!("{} suffix on {} placed at 9", suffix_value(tree, suffix), text);
        }
    }
    Ok(())
}

/// aldehydo-/keto- select the open chain form of an aldose or ketose.
pub fn open_chain_carbohydrate(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    let Some(group) = tree.scope_group(scope) else {
        return Ok(());
    };
    let Some(prefix) = tree.remove_attr(group, "openChain") else {
        return Ok(());
    };
    let expected = match prefix.as_str() {
        "aldehydo" => "aldose",
        "keto" => "ketose",
        other => return Err(ChemError::component_at(format!("Unknown open chain prefix {other}"), other)),
    };
    if tree.attr(group, "carbohydrateType") != Some(expected) {
        return Err(ChemError::component_at(
            format!("{prefix} can only be applied to an {expected}"),
            tree.subtree_text(scope),
        ));
    }
    if let Some(value) = tree.remove_attr(group, "openChainValue") {
        tree.set_attr(group, "value", value);
    }
    if let Some(labels) = tree.remove_attr(group, "openChainLabels") {
        tree.set_attr(group, "labels", labels);
    }
    Ok(())
}

/// "sel" only appears where "selena" lost its vowel in front of another
/// Hantzsch-Widman prefix or stem.
pub fn sel_is_elided_hw_prefix(tree: &ParseTree, heteroatom: NodeId) -> bool {
    tree.following_siblings(heteroatom)
        .into_iter()
        .find(|&n| !matches!(tree.kind(n), NodeKind::Hyphen | NodeKind::Locant(_) | NodeKind::Multiplier(..)))
        .map(|n| {
            matches!(
                tree.kind(n),
                NodeKind::Heteroatom(_) | NodeKind::Group(_, Some(GroupSubType::HantzschWidman))
            )
        })
        .unwrap_or(false)
}

pub fn check_sel_prefixes(tree: &ParseTree, scope: NodeId) -> Result<()> {
    for h in tree.children_of_kind(scope, |k| k == NodeKind::Heteroatom(ChemEl::Se)) {
        if tree.text(h).eq_ignore_ascii_case("sel") && !sel_is_elided_hw_prefix(tree, h) {
            return Err(ChemError::component_at(
                "sel is only an elided selena prefix",
                tree.subtree_text(scope),
            ));
        }
    }
    Ok(())
}

/// "acetic" alone is only an acid when the configuration allows it.
pub fn check_acid_written_without_acid(tree: &ParseTree, scope: NodeId, config: &Config) -> Result<()> {
    if config.allow_interpretation_of_acids_without_the_word_acid {
        return Ok(());
    }
    let Some(group) = tree.scope_group(scope) else {
        return Ok(());
    };
    if !matches!(tree.kind(group), NodeKind::Group(GroupType::AcidStem | GroupType::NonCarboxylicAcid, _)) {
        return Ok(());
    }
    let simple = tree
        .ancestor(scope, |k| matches!(k, NodeKind::WordRule(_)))
        .map(|r| tree.kind(r) == NodeKind::WordRule(WordRule::Simple))
        .unwrap_or(false);
    if !simple || tree.kind(scope) != NodeKind::Root {
        return Ok(());
    }
    let acid_word_follows = tree
        .word_of(scope)
        .and_then(|w| tree.next_sibling(w))
        .map(|w| tree.subtree_text(w).trim().eq_ignore_ascii_case("acid"))
        .unwrap_or(false);
    for suffix in suffixes(tree, scope) {
        if matches!(suffix_value(tree, suffix), "ic" | "ous")
            && !tree.text(suffix).contains("acid")
            && !acid_word_follows
        {
            return Err(ChemError::component_at(
                "Acid written without the word acid",
                tree.subtree_text(scope),
            ));
        }
    }
    Ok(())
}

/// Moves an indicated hydrogen prefix onto the group it applies to.
pub fn indicated_hydrogen_to_group(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for ih in tree.children_of_kind(scope, |k| k == NodeKind::IndicatedHydrogen) {
        let locants = match tree.attr(ih, "locant") {
            Some(l) => l.to_string(),
            None => split_locants(tree.text(ih).trim_end_matches('-'))
                .iter()
                .map(|l| l.trim_end_matches('H').to_string())
                .collect::<Vec<_>>()
                .join(","),
        };
        let group = tree
            .following_siblings(ih)
            .into_iter()
            .find(|&n| tree.kind(n).is_group())
            .or_else(|| tree.scope_group(scope))
            .ok_or_else(|| ChemError::component_at("Indicated hydrogen without a group", tree.text(ih)))?;
        let merged = match tree.attr(group, "indicatedHydrogen") {
            Some(existing) if !existing.is_empty() => format!("{existing},{locants}"),
            _ => locants,
        };
        tree.set_attr(group, "indicatedHydrogen", merged);
        tree.detach(ih);
    }
    Ok(())
}

/// Locant of the `id`th atom of a group's SMILES, read from its labels.
fn label_of_id(tree: &ParseTree, group: NodeId, id: usize) -> Option<String> {
    match tree.attr(group, "labels")? {
        "numeric" => Some(id.to_string()),
        "none" => None,
        labels => labels
            .split('/')
            .nth(id.checked_sub(1)?)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
    }
}

/// The locants of the two acid ends of a dicarboxylic trivial acid.
fn acid_ends(tree: &ParseTree, group: NodeId) -> Option<[String; 2]> {
    let ids: Vec<usize> = tree
        .attr(group, "suffixAppliesTo")?
        .split(',')
        .map(|id| id.trim().parse().ok())
        .collect::<Option<_>>()?;
    match ids[..] {
        [a, b] => Some([label_of_id(tree, group, a)?, label_of_id(tree, group, b)?]),
        _ => None,
    }
}

/// "succinamic acid", "phthalaldehydic acid" and "succinimide" treat the
/// two ends of a dicarboxylic acid differently: amic and aldehydic acids
/// become the amide or aldehyde on the first end and the acid on the
/// second, an imide bridges both ends through one nitrogen.
pub fn dibasic_acid_suffixes(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    let Some(group) = tree.scope_group(scope) else {
        return Ok(());
    };
    if !matches!(tree.kind(group), NodeKind::Group(GroupType::AcidStem, _)) {
        return Ok(());
    }
    for suffix in suffixes(tree, scope) {
        let value = suffix_value(tree, suffix).to_string();
        let first_end = match value.as_str() {
            "amic acid" => "amide",
            "aldehydic acid" => "aldehyde",
            "imide" => "imide",
            _ => continue,
        };
        let [first, second] = acid_ends(tree, group).ok_or_else(|| {
            ChemError::component_at(format!("{value} needs a dicarboxylic acid"), tree.subtree_text(scope))
        })?;
        tree.remove_attr(group, "suffixAppliesTo");
        tree.remove_attr(group, "suffixAppliesToByDefault");
        if first_end == "imide" {
            tree.set_attr(suffix, "locant", format!("{first},{second}"));
        } else {
            tree.set_attr(suffix, "value", first_end);
            tree.set_attr(suffix, "locant", first);
            let acid = tree.create(NodeKind::Suffix(SuffixType::Root), "ic acid");
            tree.set_attr(acid, "value", "ic");
            tree.set_attr(acid, "locant", second);
            tree.insert_after(suffix, acid)?;
        }
        debug!("{} on {} split over both acid ends", value, tree.text(group));
    }
    Ok(())
}

/// "thioacetic acid", "dithiobenzoic acid", "selenopropanoic acid": a
/// chalcogen prefix on an acid stem replaces oxygen in the acid group.
pub fn chalcogen_acids(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    let Some(group) = tree.scope_group(scope) else {
        return Ok(());
    };
    if !matches!(tree.kind(group), NodeKind::Group(GroupType::AcidStem, _)) {
        return Ok(());
    }
    let Some(prefix) = tree
        .preceding_siblings(group)
        .into_iter()
        .find(|&n| tree.kind(n) != NodeKind::Hyphen)
    else {
        return Ok(());
    };
    let name = match tree.kind(prefix) {
        NodeKind::Heteroatom(ChemEl::S) => "thio",
        NodeKind::Heteroatom(ChemEl::Se) => "seleno",
        NodeKind::Heteroatom(ChemEl::Te) => "telluro",
        _ => return Ok(()),
    };
    if !tree.text(prefix).to_lowercase().starts_with(name) {
        // thia, selena: skeletal replacement, not an acid spelling
        return Ok(());
    }
    let multiplier = tree
        .prev_sibling(prefix)
        .filter(|&m| matches!(tree.kind(m), NodeKind::Multiplier(_, MultiplierType::Basic)));
    let count = match multiplier.map(|m| tree.kind(m)) {
        Some(NodeKind::Multiplier(v, _)) => v,
        _ => 1,
    };
    let spelling = match (count, name) {
        (1, _) => name.to_string(),
        (2, "thio") => "dithio".to_string(),
        _ => {
            return Err(ChemError::component_at(
                format!("An acid group cannot hold {count} {name} replacements"),
                tree.subtree_text(scope),
            ))
        }
    };
    let mut replaced = 0;
    for suffix in suffixes(tree, scope) {
        let value = suffix_value(tree, suffix);
        if matches!(value, "ic" | "ate") {
            let value = format!("{spelling}{value}");
            tree.set_attr(suffix, "value", value);
            replaced += 1;
        }
    }
    if replaced == 0 {
        return Err(ChemError::component_at(
            format!("{name} must be followed by an acid"),
            tree.subtree_text(scope),
        ));
    }
    tree.detach(prefix);
    if let Some(m) = multiplier {
        tree.detach(m);
    }
    debug!("{}{} acid", spelling, tree.text(group));
    Ok(())
}

/// No lowercase aromatic atoms and no double or triple bonds.
fn is_saturated_smiles(smiles: &str) -> bool {
    let mut depth = 0;
    let mut prev = ' ';
    for c in smiles.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            '=' | '#' => return false,
            c if depth == 0 && c.is_ascii_lowercase() && !matches!((prev, c), ('C', 'l') | ('B', 'r')) => return false,
            _ => {}
        }
        prev = c;
    }
    true
}

/// True when every atom is written as an aromatic one.
fn is_fully_aromatic_smiles(smiles: &str) -> bool {
    smiles.chars().any(|c| c.is_ascii_lowercase()) && !smiles.chars().any(|c| c.is_ascii_uppercase())
}

/// Hydro prefixes need double bonds to remove.
pub fn check_hydro_on_saturated_parent(tree: &ParseTree, scope: NodeId) -> Result<()> {
    let hydro = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Hydro(HydroType::Hydro | HydroType::Perhydro)));
    let Some(&first) = hydro.first() else {
        return Ok(());
    };
    let Some(value) = tree.scope_group(scope).and_then(|g| tree.attr(g, "value")) else {
        return Ok(());
    };
    let unsaturated = !tree
        .children_of_kind(scope, |k| matches!(k, NodeKind::Unsaturator(n) if n > 0))
        .is_empty();
    if is_saturated_smiles(value) && !unsaturated {
        return Err(ChemError::component_at(
            format!("{} on a parent without double bonds", tree.text(first)),
            tree.subtree_text(scope),
        ));
    }
    Ok(())
}

/// A ring atom has at most two hydrogens to give up, and an atom of a fully
/// aromatic ring only one unless hydro prefixes or added hydrogen free it.
pub fn check_ring_out_atom_suffixes(tree: &ParseTree, scope: NodeId) -> Result<()> {
    let Some(group) = tree.scope_group(scope) else {
        return Ok(());
    };
    if !matches!(tree.kind(group), NodeKind::Group(GroupType::Ring, _)) {
        return Ok(());
    }
    let aromatic = tree.attr(group, "value").map(is_fully_aromatic_smiles).unwrap_or(false);
    let hydrogen_added = tree.has_attr(group, "indicatedHydrogen")
        || !tree
            .children_of_kind(scope, |k| {
                matches!(k, NodeKind::Hydro(_) | NodeKind::AddedHydrogen | NodeKind::IndicatedHydrogen)
            })
            .is_empty();
    for suffix in suffixes(tree, scope) {
        let problem = match suffix_value(tree, suffix) {
            "ylidyne" => "ylidyne cannot be on a ring atom",
            "ylidene" if aromatic && !hydrogen_added => "ylidene on an aromatic ring needs added hydrogen",
            _ => continue,
        };
        return Err(ChemError::component_at(problem, tree.subtree_text(scope)));
    }
    Ok(())
}

pub fn apply_irregularities(tree: &mut ParseTree, scope: NodeId, config: &Config) -> Result<()> {
    remove_mono(tree, scope);
    quinone_to_dione(tree, scope)?;
    ylene_to_diyl(tree, scope)?;
    phosphorus_oxoacid(tree, scope)?;
    biochemical_phospho(tree, scope);
    default_locant_nine(tree, scope)?;
    open_chain_carbohydrate(tree, scope)?;
    check_sel_prefixes(tree, scope)?;
    check_acid_written_without_acid(tree, scope, config)?;
    dibasic_acid_suffixes(tree, scope)?;
    chalcogen_acids(tree, scope)?;
    check_hydro_on_saturated_parent(tree, scope)?;
    check_ring_out_atom_suffixes(tree, scope)?;
    indicated_hydrogen_to_group(tree, scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_scope(tree: &ParseTree) -> NodeId {
        tree.substituents_and_roots(tree.root())[0]
    }

    #[test]
    fn test_quinone_doubles_and_takes_the_locant() {
        let mut tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {locant locant=1,4 "1,4-"} {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzo"}
                {suffix type=root value=quinone "quinone"}}}}}"#,
        )
        .unwrap();
        let scope = first_scope(&tree);
        quinone_to_dione(&mut tree, scope).unwrap();
        let kinds: Vec<NodeKind> = tree.children(scope).iter().map(|&c| tree.kind(c)).collect();
        assert!(matches!(kinds[0], NodeKind::Group(..)));
        assert_eq!(kinds[1], NodeKind::Locant(LocantRole::Unresolved));
        assert_eq!(kinds[2], NodeKind::Multiplier(2, MultiplierType::Basic));
        let suffix = suffixes(&tree, scope)[0];
        assert_eq!(suffix_value(&tree, suffix), "one");
    }

    #[test]
    fn test_ylene_defaults() {
        let text = r#"{molecule {wordRule wordRule=substituent {word type=substituent {substituent
            {group type=chain subType=alkaneStem value=CC labels=numeric "eth"}
            {suffix type=inline value=ylene "ylene"}}}}}"#;
        let mut tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        ylene_to_diyl(&mut tree, scope).unwrap();
        let locant = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Locant(_)))[0];
        assert_eq!(tree.locants(locant), vec!["1", "2"]);

        let mut tree = ParseTree::parse(&text.replace("value=CC ", "value=C ")).unwrap();
        let scope = first_scope(&tree);
        ylene_to_diyl(&mut tree, scope).unwrap();
        let locant = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Locant(_)))[0];
        assert_eq!(tree.locants(locant), vec!["1", "1"]);
    }

    #[test]
    fn test_single_locant_ylene_is_ylidene() {
        let mut tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=substituent {word type=substituent {substituent
                {group type=chain subType=alkaneStem value=CCC labels=numeric "prop"}
                {locant locant=2 "2-"} {suffix type=inline value=ylene "ylene"}}}}}"#,
        )
        .unwrap();
        let scope = first_scope(&tree);
        ylene_to_diyl(&mut tree, scope).unwrap();
        assert_eq!(suffix_value(&tree, suffixes(&tree, scope)[0]), "ylidene");
        assert!(tree.children_of_kind(scope, |k| matches!(k, NodeKind::Multiplier(..))).is_empty());
    }

    #[test]
    fn test_biochemical_phospho() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full
            {substituent {group type=substituent value=P(=O)=O labels=none outIDs=1 "phospho"}}
            {root {group type=ring subType=biochemical value=OCC1OC(O)C(O)C1O labels=none "ribose"}}}}}"#;
        let tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        assert!(is_biochemical_phospho_context(&tree, scope));

        let plain = text.replace("subType=biochemical", "subType=arene");
        let tree = ParseTree::parse(&plain).unwrap();
        let scope = first_scope(&tree);
        assert!(!is_biochemical_phospho_context(&tree, scope));
    }

    #[test]
    fn test_phosphinic_acid_gets_lambda_five() {
        let mut tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=nonCarboxylicAcid subType=phosphorusOxoacid value=P "phosphin"}
                {suffix type=root value=ic "ic acid"}}}}}"#,
        )
        .unwrap();
        let scope = first_scope(&tree);
        phosphorus_oxoacid(&mut tree, scope).unwrap();
        let group = tree.scope_group(scope).unwrap();
        assert_eq!(tree.attr(group, "value"), Some("P(=O)O"));
        assert_eq!(tree.children_of_kind(scope, |k| k == NodeKind::Lambda(5)).len(), 1);
    }

    #[test]
    fn test_xanthone_locant() {
        let mut tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=ring value=c1ccc2c(c1)Cc1ccccc1O2 labels=2/3/4/4a/9a/1/9/8a/8/7/6/5/10a/10 "xanthen"}
                {suffix type=root value=one "one"}}}}}"#,
        )
        .unwrap();
        let scope = first_scope(&tree);
        default_locant_nine(&mut tree, scope).unwrap();
        let locant = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Locant(_)))[0];
        assert_eq!(tree.locants(locant), vec!["9"]);
    }

    #[test]
    fn test_sel_guard() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {heteroatom value=Se "sel"} {heteroatom value=N "az"}
            {group type=ring subType=hantzschWidman value=c1cccc1 labels=numeric "ole"}}}}}"#;
        let tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        assert!(check_sel_prefixes(&tree, scope).is_ok());

        let bare = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {heteroatom value=Se "sel"} {group type=chain subType=alkaneStem value=CC "eth"}}}}}"#;
        let tree = ParseTree::parse(bare).unwrap();
        let scope = first_scope(&tree);
        assert!(check_sel_prefixes(&tree, scope).is_err());
    }

    #[test]
    fn test_acid_without_the_word_acid() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {group type=acidStem value=CC labels=1/2 suffixAppliesTo=1 "acet"}
            {suffix type=root value=ic "ic"}}}}}"#;
        let tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        assert!(check_acid_written_without_acid(&tree, scope, &Config::new()).is_err());
        let lenient = Config::new().allow_acids_without_acid(true);
        assert!(check_acid_written_without_acid(&tree, scope, &lenient).is_ok());
    }

    #[test]
    fn test_open_chain_prefix_checks_sugar_type() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {group type=ring subType=carbohydrate value=OCC1OC(O)C(O)C(O)C1O labels=none
                openChain=keto carbohydrateType=aldose openChainValue=OCC(O)C(O)C(O)C(O)C=O "glucose"}}}}}"#;
        let mut tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        assert!(open_chain_carbohydrate(&mut tree, scope).is_err());

        let mut tree = ParseTree::parse(&text.replace("openChain=keto", "openChain=aldehydo")).unwrap();
        let scope = first_scope(&tree);
        open_chain_carbohydrate(&mut tree, scope).unwrap();
        let group = tree.scope_group(scope).unwrap();
        assert_eq!(tree.attr(group, "value"), Some("OCC(O)C(O)C(O)C(O)C=O"));
    }

    fn suffix_summary(tree: &ParseTree, scope: NodeId) -> Vec<(String, Vec<String>)> {
        suffixes(tree, scope)
            .into_iter()
            .map(|s| (suffix_value(tree, s).to_string(), tree.locants(s)))
            .collect()
    }

    #[test]
    fn test_amic_acid_splits_the_acid_ends() {
        let mut tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=acidStem value=CCCC labels=numeric suffixAppliesTo=1,4 "succin"}
                {suffix type=root value="amic acid" "amic acid"}}}}}"#,
        )
        .unwrap();
        let scope = first_scope(&tree);
        dibasic_acid_suffixes(&mut tree, scope).unwrap();
        assert_eq!(
            suffix_summary(&tree, scope),
            vec![("amide".to_string(), vec!["1".to_string()]), ("ic".to_string(), vec!["4".to_string()])]
        );
        let group = tree.scope_group(scope).unwrap();
        assert!(!tree.has_attr(group, "suffixAppliesTo"));
    }

    #[test]
    fn test_imide_spans_both_ends() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {group type=acidStem value=c1ccc(C)c(C)c1 labels=5/6/7/7a/1/3a/3/4 suffixAppliesTo=5,7 "phthal"}
            {suffix type=root value=imide "imide"}}}}}"#;
        let mut tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        dibasic_acid_suffixes(&mut tree, scope).unwrap();
        assert_eq!(suffix_summary(&tree, scope), vec![("imide".to_string(), vec!["1".to_string(), "3".to_string()])]);

        let mono = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {group type=acidStem value=CC labels=numeric suffixAppliesTo=1 "acet"}
            {suffix type=root value=imide "imide"}}}}}"#;
        let mut tree = ParseTree::parse(mono).unwrap();
        let scope = first_scope(&tree);
        let err = dibasic_acid_suffixes(&mut tree, scope).unwrap_err();
        assert!(err.to_string().contains("dicarboxylic"));
    }

    #[test]
    fn test_chalcogen_acid_spellings() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {heteroatom value=S "thio"} {group type=acidStem value=CC labels=numeric "acet"}
            {suffix type=root value=ic "ic acid"}}}}}"#;
        let mut tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        chalcogen_acids(&mut tree, scope).unwrap();
        assert_eq!(suffix_summary(&tree, scope)[0].0, "thioic");
        assert!(tree.children_of_kind(scope, |k| matches!(k, NodeKind::Heteroatom(_))).is_empty());

        let dithio = text.replace(r#"{heteroatom"#, r#"{multiplier value=2 "di"} {heteroatom"#);
        let mut tree = ParseTree::parse(&dithio).unwrap();
        let scope = first_scope(&tree);
        chalcogen_acids(&mut tree, scope).unwrap();
        assert_eq!(suffix_summary(&tree, scope)[0].0, "dithioic");
        assert!(tree.children_of_kind(scope, |k| matches!(k, NodeKind::Multiplier(..))).is_empty());

        let ate = text.replace(r#"value=S "thio""#, r#"value=Se "seleno""#).replace(r#"value=ic "ic acid""#, r#"value=ate "ate""#);
        let mut tree = ParseTree::parse(&ate).unwrap();
        let scope = first_scope(&tree);
        chalcogen_acids(&mut tree, scope).unwrap();
        assert_eq!(suffix_summary(&tree, scope)[0].0, "selenoate");

        let diseleno = ate.replace(r#"{heteroatom"#, r#"{multiplier value=2 "di"} {heteroatom"#);
        let mut tree = ParseTree::parse(&diseleno).unwrap();
        let scope = first_scope(&tree);
        assert!(chalcogen_acids(&mut tree, scope).is_err());

        // skeletal "thia" is left for the resolver
        let thia = text.replace(r#""thio""#, r#""thia""#);
        let mut tree = ParseTree::parse(&thia).unwrap();
        let scope = first_scope(&tree);
        chalcogen_acids(&mut tree, scope).unwrap();
        assert_eq!(suffix_summary(&tree, scope)[0].0, "ic");
    }

    #[test]
    fn test_hydro_needs_double_bonds() {
        let text = r#"{molecule {wordRule wordRule=simple {word type=full {root
            {multiplier value=2 "di"} {hydro "hydro"}
            {group type=ring subType=cycloalkane value=C1CCCCC1 labels=numeric "cyclohexane"}}}}}"#;
        let tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        assert!(check_hydro_on_saturated_parent(&tree, scope).is_err());

        let aromatic = text.replace("value=C1CCCCC1", "value=c1ccc2ccccc2c1");
        let tree = ParseTree::parse(&aromatic).unwrap();
        let scope = first_scope(&tree);
        assert!(check_hydro_on_saturated_parent(&tree, scope).is_ok());

        assert!(is_saturated_smiles("ClCCBr"));
        assert!(!is_saturated_smiles("C=CCl"));
        assert!(is_saturated_smiles("C[N+](C)(C)C"));
    }

    #[test]
    fn test_ring_out_atom_suffixes() {
        let text = r#"{molecule {wordRule wordRule=substituent {word type=substituent {substituent
            {group type=ring subType=cycloalkane value=C1CCCCC1 labels=numeric "cyclohex"}
            {suffix type=inline value=ylidene "ylidene"}}}}}"#;
        let tree = ParseTree::parse(text).unwrap();
        let scope = first_scope(&tree);
        assert!(check_ring_out_atom_suffixes(&tree, scope).is_ok());

        let ylidyne = text.replace("value=ylidene", "value=ylidyne");
        let tree = ParseTree::parse(&ylidyne).unwrap();
        let scope = first_scope(&tree);
        assert!(check_ring_out_atom_suffixes(&tree, scope).is_err());

        let benzene = text.replace("subType=cycloalkane value=C1CCCCC1", "subType=arene value=c1ccccc1");
        let tree = ParseTree::parse(&benzene).unwrap();
        let scope = first_scope(&tree);
        assert!(check_ring_out_atom_suffixes(&tree, scope).is_err());

        let freed = benzene.replace("{group", r#"{indicatedHydrogen "4H-"} {group"#);
        let tree = ParseTree::parse(&freed).unwrap();
        let scope = first_scope(&tree);
        assert!(check_ring_out_atom_suffixes(&tree, scope).is_ok());
    }
}
