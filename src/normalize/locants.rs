//! Locant canonicalization.
//!
//! Locant tokens arrive as written ("2,3", "2N", "N^2", "2(R)", "4(1H)",
//! "Alpha"). They leave as a `locant` attribute holding a comma separated
//! canonical list, with stereo and added hydrogen annotations moved out into
//! sibling nodes.

use tracing::*;

use super::*;

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa", "lambda", "mu", "nu",
    "xi", "omicron", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi", "psi", "omega",
];

/// Splits a comma separated locant list, ignoring commas inside brackets.
pub fn split_locants(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}

/// Removes superscript markup: `N^2`, `N^{2}`, `N<sup>2</sup>` all become `N2`.
pub fn flatten_superscripts(locant: &str) -> String {
    locant
        .replace("<sup>", "")
        .replace("</sup>", "")
        .replace("^{", "")
        .replace('^', "")
        .replace('}', "")
}

/// Rewrites a legacy digit-letter element locant (`2N`) to letter-digit (`N2`).
pub fn swap_legacy_element_locant(locant: &str) -> String {
    let digits: String = locant.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return locant.to_string();
    }
    let rest = &locant[digits.len()..];
    let symbol: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let primes = &rest[symbol.len()..];
    let is_element = symbol.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false)
        && symbol != "H"
        && ChemEl::from_symbol(&symbol).is_some();
    if is_element && primes.chars().all(|c| c == '\'') {
        format!("{symbol}{digits}{primes}")
    } else {
        locant.to_string()
    }
}

pub fn lowercase_greek(locant: &str) -> String {
    let lower = locant.to_lowercase();
    let word: String = lower.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if GREEK.contains(&word.as_str()) {
        lower
    } else {
        locant.to_string()
    }
}

/// Splits `2(R)` into `2` and `R`, and `4(1H)` into `4` and `1H`.
fn split_annotation(locant: &str) -> (String, Option<String>) {
    match (locant.find('('), locant.ends_with(')')) {
        (Some(open), true) if open > 0 => (
            locant[..open].to_string(),
            Some(locant[open + 1..locant.len() - 1].to_string()),
        ),
        _ => (locant.to_string(), None),
    }
}

fn is_added_hydrogen(annotation: &str) -> bool {
    annotation.split(',').all(|part| {
        let part = part.trim();
        part.len() > 1 && part.ends_with('H') && part[..part.len() - 1].chars().all(|c| c.is_ascii_alphanumeric() || c == '\'')
    })
}

/// Parses one stereodescriptor (`2R`, `E`, `1'S`, `cis`) into locant and value.
pub fn parse_stereo_descriptor(text: &str) -> Result<(Option<String>, StereoType, String)> {
    let text = text.trim();
    for (word, t) in [("cis", StereoType::CisOrTrans), ("trans", StereoType::CisOrTrans)] {
        if let Some(locant) = text.strip_suffix(word) {
            let locant = locant.trim_end_matches('-');
            return Ok(((!locant.is_empty()).then(|| locant.to_string()), t, word.to_string()));
        }
    }
    let value_len = text.chars().rev().take_while(|c| matches!(c, 'R' | 'S' | 'E' | 'Z')).count();
    let value = text[text.len() - value_len..].to_string();
    let stereo_type = match value.as_str() {
        "R" | "S" | "RS" | "SR" => StereoType::RorS,
        "E" | "Z" => StereoType::EorZ,
        _ => return Err(ChemError::component_at("Unrecognised stereodescriptor", text)),
    };
    let locant = text[..text.len() - value.len()].trim_end_matches('-');
    Ok(((!locant.is_empty()).then(|| locant.to_string()), stereo_type, value))
}

/// Normalizes every locant node of the tree.
pub fn canonicalize_locants(mut tree: ParseTree) -> Result<ParseTree> {
    for omp in tree.descendants_of_kind(tree.root(), |k| k == NodeKind::OrthoMetaPara) {
        ortho_meta_para_to_locant(&mut tree, omp)?;
    }
    for stereo in tree.descendants_of_kind(tree.root(), |k| matches!(k, NodeKind::StereoChemistry(_))) {
        split_stereochemistry(&mut tree, stereo)?;
    }
    for locant in tree.descendants_of_kind(tree.root(), |k| matches!(k, NodeKind::Locant(_))) {
        if tree.has_attr(locant, "locant") {
            continue;
        }
        let text = tree.text(locant).trim_start_matches('-').trim_end_matches('-').to_string();
        let mut canonical = Vec::new();
        for raw in split_locants(&text) {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(ChemError::component_at("Empty locant", tree.text(locant)));
            }
            let (bare, annotation) = split_annotation(raw);
            let bare = lowercase_greek(&swap_legacy_element_locant(&flatten_superscripts(&bare)));
            if let Some(annotation) = annotation {
                if is_added_hydrogen(&annotation) {
                    let added = tree.create(NodeKind::AddedHydrogen, annotation.clone());
                    tree.set_attr(added, "locant", annotation.replace('H', ""));
                    tree.insert_before(locant, added)?;
                } else {
                    let (_, stereo_type, value) = parse_stereo_descriptor(&annotation)?;
                    let stereo = tree.create(NodeKind::StereoChemistry(stereo_type), format!("{bare}({annotation})"));
                    tree.set_attr(stereo, "locant", bare.clone());
                    tree.set_attr(stereo, "value", value);
                    tree.insert_before(locant, stereo)?;
                }
            }
            canonical.push(bare);
        }
        trace!("locant {} -> {}", tree.text(locant), canonical.join(","));
        tree.set_attr(locant, "locant", canonical.join(","));
    }
    Ok(tree)
}

/// `o`, `m`, `p` become `1,2`, `1,3`, `1,4` before a "di" multiplier and a
/// single locant otherwise.
fn ortho_meta_para_to_locant(tree: &mut ParseTree, omp: NodeId) -> Result<()> {
    let position = match tree.text(omp).trim_end_matches('-').to_lowercase().as_str() {
        "o" | "ortho" => 2,
        "m" | "meta" => 3,
        "p" | "para" => 4,
        other => return Err(ChemError::component_at("Unknown ortho/meta/para prefix", other)),
    };
    let next = tree
        .following_siblings(omp)
        .into_iter()
        .find(|&n| tree.kind(n) != NodeKind::Hyphen);
    let doubled = matches!(next.map(|n| tree.kind(n)), Some(NodeKind::Multiplier(2, _)));
    let value = if doubled { format!("1,{position}") } else { position.to_string() };
    let locant = tree.create(NodeKind::Locant(LocantRole::Unresolved), tree.text(omp).to_string());
    tree.set_attr(locant, "locant", value);
    tree.replace(omp, locant)
}

/// Splits `(2R,3S)` into one stereochemistry node per descriptor.
fn split_stereochemistry(tree: &mut ParseTree, stereo: NodeId) -> Result<()> {
    if tree.has_attr(stereo, "value") {
        return Ok(());
    }
    let text = tree.text(stereo).to_string();
    let inner = text.trim_end_matches('-').trim_start_matches('(').trim_end_matches(')');
    for part in split_locants(inner) {
        let (locant, stereo_type, value) = parse_stereo_descriptor(&part)?;
        let node = tree.create(NodeKind::StereoChemistry(stereo_type), part.trim().to_string());
        if let Some(locant) = locant {
            tree.set_attr(node, "locant", locant);
        }
        tree.set_attr(node, "value", value);
        tree.insert_before(stereo, node)?;
    }
    tree.detach(stereo);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_respects_brackets() {
        assert_eq!(split_locants("1,2(1H,2H),3"), vec!["1", "2(1H,2H)", "3"]);
        assert_eq!(split_locants("2,2'"), vec!["2", "2'"]);
        for text in ["1,2(1H,2H),3", "4a,8a", "N^{2},3"] {
            assert_eq!(split_locants(text).join(","), text);
        }
    }

    #[test]
    fn test_legacy_element_locants() {
        assert_eq!(swap_legacy_element_locant("2N"), "N2");
        assert_eq!(swap_legacy_element_locant("1'N"), "1'N");
        assert_eq!(swap_legacy_element_locant("4a"), "4a");
        assert_eq!(swap_legacy_element_locant("1H"), "1H");
    }

    #[test]
    fn test_superscripts_and_greek() {
        assert_eq!(flatten_superscripts("N^2"), "N2");
        assert_eq!(flatten_superscripts("N<sup>2</sup>"), "N2");
        assert_eq!(flatten_superscripts("N^{2}"), "N2");
        assert_eq!(lowercase_greek("Alpha"), "alpha");
        assert_eq!(lowercase_greek("N"), "N");
    }

    #[test]
    fn test_stereo_descriptors() {
        let (locant, t, value) = parse_stereo_descriptor("2R").unwrap();
        assert_eq!((locant.as_deref(), t, value.as_str()), (Some("2"), StereoType::RorS, "R"));
        let (locant, t, _) = parse_stereo_descriptor("E").unwrap();
        assert_eq!((locant, t), (None, StereoType::EorZ));
        assert!(parse_stereo_descriptor("2Q").is_err());
    }

    #[test]
    fn test_annotations_become_siblings() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full {root
                {group type=ring value=c1ccc2ccccc2c1 labels=1/2/3/4/4a/5/6/7/8/8a "naphthalen"}
                {locant "2(1H)"} {suffix type=root value=one "one"}}}}}"#,
        )
        .unwrap();
        let tree = canonicalize_locants(tree).unwrap();
        let added = tree.descendants_of_kind(tree.root(), |k| k == NodeKind::AddedHydrogen);
        assert_eq!(added.len(), 1);
        assert_eq!(tree.attr(added[0], "locant"), Some("1"));
        let locant = tree.descendants_of_kind(tree.root(), |k| matches!(k, NodeKind::Locant(_)))[0];
        assert_eq!(tree.attr(locant, "locant"), Some("2"));
    }

    #[test]
    fn test_para_before_di_is_a_pair() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {orthoMetaPara "p-"} {multiplier value=2 "di"} {group type=substituent value=Cl labels=none "chloro"}}
                {root {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        )
        .unwrap();
        let tree = canonicalize_locants(tree).unwrap();
        let locant = tree.descendants_of_kind(tree.root(), |k| matches!(k, NodeKind::Locant(_)))[0];
        assert_eq!(tree.locants(locant), vec!["1", "4"]);
    }
}
