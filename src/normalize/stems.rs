//! Alkane stems, skeletal modifiers, and heteroatom hydride chains.

use tracing::*;

use super::*;

/// Carbon count of an alkane stem value (`CCCC` → 4).
pub fn chain_length(tree: &ParseTree, group: NodeId) -> Result<usize> {
    let value = tree.attr_or_err(group, "value")?;
    if value.is_empty() || !value.chars().all(|c| c == 'C') {
        return Err(ChemError::internal(format!("alkane stem {} has value {}", tree.text(group), value)));
    }
    Ok(value.len())
}

fn is_alkane_stem(tree: &ParseTree, node: NodeId) -> bool {
    matches!(tree.kind(node), NodeKind::Group(_, Some(GroupSubType::AlkaneStem)))
}

/// Merges adjacent alkane stem components ("hen" + "icos") into one chain.
pub fn merge_alkane_stems(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    let mut i = 0;
    loop {
        let children = tree.child_vec(scope);
        if i + 1 >= children.len() {
            return Ok(());
        }
        let (a, b) = (children[i], children[i + 1]);
        if is_alkane_stem(tree, a) && is_alkane_stem(tree, b) {
            let total = chain_length(tree, a)? + chain_length(tree, b)?;
            let text = format!("{}{}", tree.text(a), tree.text(b));
            tree[a].text = text;
            tree.set_attr(a, "value", "C".repeat(total));
            tree.set_attr(a, "labels", "numeric");
            tree.detach(b);
            debug!("merged alkane stem components into {} carbons", total);
        } else {
            i += 1;
        }
    }
}

/// Applies iso/sec/tert/neo to the alkane stem that follows.
pub fn apply_stem_modifiers(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for modifier in tree.children_of_kind(scope, |k| matches!(k, NodeKind::StemModifier(_))) {
        let NodeKind::StemModifier(kind) = tree.kind(modifier) else {
            continue;
        };
        let group = tree
            .following_siblings(modifier)
            .into_iter()
            .find(|&n| tree.kind(n) != NodeKind::Hyphen)
            .filter(|&n| is_alkane_stem(tree, n))
            .ok_or_else(|| ChemError::component_at(format!("{kind} must precede an alkane stem"), tree.text(modifier)))?;
        let n = chain_length(tree, group)?;
        let has_suffix = !tree.children_of_kind(scope, |k| matches!(k, NodeKind::Suffix(_))).is_empty();
        let (minimum, smiles) = match kind {
            StemModifier::Iso => (3, format!("{}C(C)C", "C".repeat(n.saturating_sub(3)))),
            StemModifier::Sec => {
                if !has_suffix {
                    return Err(ChemError::component_at("sec modifier requires a suffix", tree.text(modifier)));
                }
                (3, format!("C(C){}", "C".repeat(n.saturating_sub(2))))
            }
            StemModifier::Tert => (4, format!("C(C)(C){}", "C".repeat(n.saturating_sub(3)))),
            StemModifier::Neo => (5, format!("{}C(C)(C)C", "C".repeat(n.saturating_sub(4)))),
        };
        if n < minimum {
            return Err(ChemError::component_at(
                format!("{kind} modifier requires a chain of at least {minimum} carbons"),
                tree.subtree_text(scope),
            ));
        }
        tree.set_attr(group, "value", smiles);
        tree.set_attr(group, "labels", "none");
        tree.set_attr(group, "defaultInID", "1");
        let text = format!("{}{}", tree.text(modifier), tree.text(group));
        tree[group].text = text;
        tree.detach(modifier);
    }
    Ok(())
}

fn heteroatom_node(tree: &mut ParseTree, el: ChemEl, locants: &[usize]) -> NodeId {
    let node = tree.create(NodeKind::Heteroatom(el), "");
    let locants: Vec<String> = locants.iter().map(usize::to_string).collect();
    tree.set_attr(node, "locant", locants.join(","));
    node
}

/// Builds homogeneous ("triphosphane") and alternating ("disilazane")
/// heteroatom chains as carbon chains plus located heteroatom replacements.
pub fn build_hetero_chains(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    // homogeneous: [multiplier] heteroStem
    for group in tree.children_of_kind(scope, |k| matches!(k, NodeKind::Group(_, Some(GroupSubType::HeteroStem)))) {
        if tree.attr(group, "value").map(|v| v.chars().all(|c| c == 'C')).unwrap_or(false) {
            continue;
        }
        let symbol = tree.attr_or_err(group, "value")?.to_string();
        let el = ChemEl::from_symbol(&symbol)
            .ok_or_else(|| ChemError::component_at("Unknown heteroatom stem", tree.text(group)))?;
        let multiplier = tree
            .prev_sibling(group)
            .filter(|&p| matches!(tree.kind(p), NodeKind::Multiplier(_, MultiplierType::Basic)));
        let n = match multiplier {
            Some(m) => match tree.kind(m) {
                NodeKind::Multiplier(v, _) => v as usize,
                _ => 1,
            },
            None => 1,
        };
        if n == 0 {
            return Err(ChemError::component_at("A heteroatom chain needs at least one atom", tree.subtree_text(scope)));
        }
        if let Some(m) = multiplier {
            tree.detach(m);
        }
        tree.set_attr(group, "value", "C".repeat(n));
        tree.set_attr(group, "labels", "numeric");
        let locants: Vec<usize> = (1..=n).collect();
        let hetero = heteroatom_node(tree, el, &locants);
        tree.insert_before(group, hetero)?;
        debug!("{} chain of {} {}", tree.text(group), n, el);
    }

    // alternating: multiplier heteroatom heteroatom "ane", no group
    if tree.scope_group(scope).is_some() {
        return Ok(());
    }
    let children = tree.child_vec(scope);
    let window = children.windows(4).find(|w| {
        matches!(tree.kind(w[0]), NodeKind::Multiplier(_, MultiplierType::Basic))
            && matches!(tree.kind(w[1]), NodeKind::Heteroatom(_))
            && matches!(tree.kind(w[2]), NodeKind::Heteroatom(_))
            && tree.kind(w[3]) == NodeKind::Unsaturator(0)
    });
    let Some(w) = window else {
        return Ok(());
    };
    let (NodeKind::Multiplier(n, _), NodeKind::Heteroatom(first), NodeKind::Heteroatom(second)) =
        (tree.kind(w[0]), tree.kind(w[1]), tree.kind(w[2]))
    else {
        return Ok(());
    };
    let (p1, p2) = (first.hw_priority(), second.hw_priority());
    if p1 > p2 {
        return Err(ChemError::component_at(
            format!("{first}{second} chain must be named as a Hantzsch-Widman ring"),
            tree.subtree_text(scope),
        ));
    }
    let n = n as usize;
    if n < 2 {
        return Err(ChemError::component_at(
            format!("An alternating {first}{second} chain needs a multiplier of at least 2"),
            tree.subtree_text(scope),
        ));
    }
    let length = 2 * n - 1;
    let text = format!("{}{}{}", tree.text(w[0]), tree.text(w[1]), tree.text(w[2]));
    let group = tree.create(NodeKind::Group(GroupType::Chain, Some(GroupSubType::HeteroStem)), text);
    tree.set_attr(group, "value", "C".repeat(length));
    tree.set_attr(group, "labels", "numeric");
    let odd: Vec<usize> = (1..=length).step_by(2).collect();
    let even: Vec<usize> = (2..=length).step_by(2).collect();
    let a = heteroatom_node(tree, first, &odd);
    let b = heteroatom_node(tree, second, &even);
    tree.insert_before(w[3], a)?;
    tree.insert_before(w[3], b)?;
    tree.insert_before(w[3], group)?;
    for &old in &w[..3] {
        tree.detach(old);
    }
    debug!("alternating {}/{} chain of {} atoms", first, second, length);
    Ok(())
}
