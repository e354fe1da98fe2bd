//! Deciding what each locant and multiplier refers to.
//!
//! After this pass no `locant` or `multiplier` node is left in a word. Their
//! values live on as attributes: `locant`/`multiplier` on the scope (where a
//! substituent attaches and how often), on a modifier or suffix (where it
//! applies), or `multiplicativeLocant` on a multiplied root.

use tracing::*;

use super::*;

fn next_significant(tree: &ParseTree, node: NodeId) -> Option<NodeId> {
    tree.following_siblings(node)
        .into_iter()
        .find(|&n| tree.kind(n) != NodeKind::Hyphen)
}

fn at_scope_start(tree: &ParseTree, node: NodeId) -> bool {
    tree.preceding_siblings(node)
        .iter()
        .all(|&n| tree.kind(n) == NodeKind::Hyphen)
}

fn multiplier_value(tree: &ParseTree, node: NodeId) -> Option<u32> {
    match tree.kind(node) {
        NodeKind::Multiplier(v, MultiplierType::Basic | MultiplierType::Group) => Some(v),
        _ => None,
    }
}

/// Nodes a locant can be written directly in front of.
fn is_modifier(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Heteroatom(_)
            | NodeKind::Unsaturator(_)
            | NodeKind::Suffix(_)
            | NodeKind::Hydro(_)
            | NodeKind::AddedHydrogen
            | NodeKind::Lambda(_)
            | NodeKind::ChargeSpecifier(_)
            | NodeKind::OxidationNumber(_)
            | NodeKind::StereoChemistry(_)
            | NodeKind::RingAssembly(_)
            | NodeKind::PolyCyclicSpiro(_)
            | NodeKind::Fusion
            | NodeKind::FusionPrefix
    )
}

/// The run of heteroatom prefixes starting at `first`, with the multiplier
/// written before each.
fn heteroatom_run(tree: &ParseTree, first: NodeId) -> Vec<(NodeId, u32)> {
    let mut run = Vec::new();
    let mut pending = 1;
    let mut node = Some(first);
    while let Some(n) = node {
        match tree.kind(n) {
            NodeKind::Heteroatom(_) => {
                run.push((n, pending));
                pending = 1;
            }
            NodeKind::Multiplier(v, _) => pending = v,
            NodeKind::Hyphen => {}
            _ => break,
        }
        node = tree.next_sibling(n);
    }
    run
}

fn is_hantzsch_widman(tree: &ParseTree, scope: NodeId) -> bool {
    tree.scope_group(scope)
        .map(|g| matches!(tree.kind(g), NodeKind::Group(_, Some(GroupSubType::HantzschWidman))))
        .unwrap_or(false)
}

/// A single locant in front of a Hantzsch-Widman ring with a single
/// heteroatom says where the ring is substituted; the heteroatom itself is
/// at position 1 anyway.
pub fn locant_is_not_hw_heteroatom_locant(tree: &ParseTree, locant: NodeId) -> bool {
    let Some(scope) = tree.parent(locant) else {
        return false;
    };
    if tree.locants(locant).len() != 1 || !is_hantzsch_widman(tree, scope) {
        return false;
    }
    let Some(first) = next_significant(tree, locant) else {
        return false;
    };
    let run = heteroatom_run(tree, first);
    let single = run.len() == 1 && run[0].1 == 1;
    if single {
        debug!("locant {} before {} is a substitution locant", tree.text(locant), tree.text(run[0].0));
    }
    single
}

/// Suffixes that leave attachment points, each with how many it leaves.
fn out_atom_suffixes(tree: &ParseTree, scope: NodeId) -> Vec<(NodeId, u32)> {
    tree.children_of_kind(scope, |k| matches!(k, NodeKind::Suffix(_)))
        .into_iter()
        .filter(|&s| matches!(tree.attr(s, "value"), Some("yl" | "ylidene" | "ylidyne" | "oyl" | "carbonyl")))
        .map(|s| {
            let preceding = tree.prev_sibling(s).and_then(|p| multiplier_value(tree, p));
            (s, preceding.unwrap_or_else(|| tree.multiplier(s)))
        })
        .collect()
}

/// The multiplied root this substituent links, when it is the last scope
/// before the root of its word.
fn multiplicative_root(tree: &ParseTree, scope: NodeId, count: usize) -> Option<NodeId> {
    if tree.kind(scope) != NodeKind::Substituent {
        return None;
    }
    let next = tree.next_sibling(scope)?;
    if tree.kind(next) != NodeKind::Root {
        return None;
    }
    let leading = tree
        .children(next)
        .iter()
        .copied()
        .find(|&c| tree.kind(c) != NodeKind::Hyphen)
        .and_then(|c| multiplier_value(tree, c))
        .or_else(|| tree.attr(next, "multiplier").and_then(|m| m.parse().ok()))?;
    (leading as usize == count && count > 1).then_some(next)
}

fn move_locant(tree: &mut ParseTree, locant: NodeId, target: NodeId, multiplier: Option<NodeId>) {
    let values = tree.attr(locant, "locant").unwrap_or_default().to_string();
    tree.set_attr(target, "locant", values);
    if let Some(m) = multiplier {
        if let Some(v) = multiplier_value(tree, m) {
            tree.set_attr(target, "multiplier", v.to_string());
        }
        tree.detach(m);
    }
    tree.detach(locant);
}

/// Spreads locants over a run of heteroatom prefixes, one locant per
/// (multiplied) heteroatom.
fn distribute_over_heteroatoms(tree: &mut ParseTree, locant: NodeId, run: &[(NodeId, u32)]) -> Result<()> {
    let values = tree.locants(locant);
    let needed: u32 = run.iter().map(|&(_, m)| m).sum();
    if values.len() != needed as usize {
        return Err(ChemError::component_at(
            format!("{} locants given for {} heteroatoms", values.len(), needed),
            tree.text(locant),
        ));
    }
    let mut values = values.into_iter();
    for &(hetero, m) in run {
        let chunk: Vec<String> = values.by_ref().take(m as usize).collect();
        tree.set_attr(hetero, "locant", chunk.join(","));
        if m > 1 {
            tree.set_attr(hetero, "multiplier", m.to_string());
        }
        if let Some(prev) = tree.prev_sibling(hetero).filter(|&p| multiplier_value(tree, p).is_some()) {
            tree.detach(prev);
        }
    }
    tree.detach(locant);
    Ok(())
}

fn resolve_before_group(tree: &mut ParseTree, locant: NodeId, scope: NodeId, group: NodeId, start: bool, multiplier: Option<NodeId>) -> Result<LocantRole> {
    let values = tree.locants(locant);
    let count = values.len();
    let primed = values.iter().any(|l| l.ends_with('\''));
    let outs = out_atom_suffixes(tree, scope);
    let out_count: u32 = outs.iter().map(|&(_, n)| n).sum();
    let linked_root = if start && multiplier.is_none() { multiplicative_root(tree, scope, count) } else { None };

    if let Some(root) = linked_root.filter(|_| primed || out_count as usize != count) {
        let text = values.join(",");
        tree.set_attr(root, "multiplicativeLocant", text);
        tree.detach(locant);
        return Ok(LocantRole::Multiplicative);
    }
    if start && multiplier.is_none() && count > 1 && out_count as usize == count && tree.kind(scope) == NodeKind::Substituent {
        let mut values = values.into_iter();
        for (s, n) in outs {
            let chunk: Vec<String> = values.by_ref().take(n as usize).collect();
            tree.set_attr(s, "locant", chunk.join(","));
        }
        tree.detach(locant);
        return Ok(LocantRole::OutAtom);
    }
    if start && tree.kind(scope) != NodeKind::Root {
        move_locant(tree, locant, scope, multiplier);
        return Ok(LocantRole::Substitution);
    }
    // "2-propanol": the locant belongs to what follows the group
    let target = tree
        .following_siblings(group)
        .into_iter()
        .find(|&n| {
            !tree.has_attr(n, "locant") && matches!(tree.kind(n), NodeKind::Suffix(_) | NodeKind::Unsaturator(2..=3))
        })
        .ok_or_else(|| ChemError::component_at("Locant could not be assigned", tree.text(locant)))?;
    move_locant(tree, locant, target, multiplier);
    Ok(LocantRole::Substitution)
}

/// Decides what a locant node refers to, moves its value there, and removes
/// the node.
pub fn determine_locant_meaning(tree: &mut ParseTree, locant: NodeId) -> Result<LocantRole> {
    let scope = tree
        .parent(locant)
        .ok_or_else(|| ChemError::internal("locant outside any scope"))?;
    let count = tree.locants(locant).len();
    let Some(mut next) = next_significant(tree, locant) else {
        return Err(ChemError::component_at("Locant is not followed by anything it can apply to", tree.text(locant)));
    };
    let start = at_scope_start(tree, locant);

    // "1,3-benzodioxole": the locants go past the fusion prefix
    let mut probe = Some(next);
    while let Some(p) = probe.filter(|&p| matches!(tree.kind(p), NodeKind::FusionPrefix | NodeKind::Fusion)) {
        probe = next_significant(tree, p);
    }
    let run = probe.map(|p| heteroatom_run(tree, p)).unwrap_or_default();
    let run_size: u32 = run.iter().map(|&(_, m)| m).sum();
    if !run.is_empty() && (probe == Some(next) || run_size as usize == count) {
        let role = if start && locant_is_not_hw_heteroatom_locant(tree, locant) {
            move_locant(tree, locant, scope, None);
            LocantRole::Substitution
        } else {
            distribute_over_heteroatoms(tree, locant, &run)?;
            if is_hantzsch_widman(tree, scope) {
                LocantRole::HwHeteroatom
            } else {
                LocantRole::Substitution
            }
        };
        return Ok(role);
    }

    let mut multiplier = None;
    if let Some(v) = multiplier_value(tree, next) {
        if v as usize == count {
            multiplier = Some(next);
            next = next_significant(tree, next)
                .ok_or_else(|| ChemError::component_at("Multiplier is not followed by anything", tree.text(locant)))?;
        } else {
            return Err(ChemError::component_at(
                format!("{count} locants given for multiplier {v}"),
                tree.subtree_text(scope),
            ));
        }
    }

    let role = match tree.kind(next) {
        NodeKind::RingAssembly(_) => {
            move_locant(tree, locant, next, multiplier);
            LocantRole::RingAssembly
        }
        kind if is_modifier(kind) => {
            move_locant(tree, locant, next, multiplier);
            LocantRole::Substitution
        }
        NodeKind::Group(..) => resolve_before_group(tree, locant, scope, next, start, multiplier)?,
        NodeKind::Substituent | NodeKind::Bracket(_) | NodeKind::Root => {
            let target = if tree.kind(scope).is_scope() && start { scope } else { next };
            move_locant(tree, locant, target, multiplier);
            LocantRole::Substitution
        }
        _ => {
            return Err(ChemError::component_at(
                format!("Locant cannot apply to {}", tree.text(next)),
                tree.text(locant),
            ))
        }
    };
    trace!("locant {} resolved as {}", tree.text(locant), role);
    Ok(role)
}

/// Gives each remaining multiplier of a scope to what it multiplies.
pub fn assign_multipliers(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for m in tree.children_of_kind(scope, |k| matches!(k, NodeKind::Multiplier(_, MultiplierType::Basic | MultiplierType::Group))) {
        let Some(v) = multiplier_value(tree, m) else {
            continue;
        };
        let Some(next) = next_significant(tree, m) else {
            return Err(ChemError::component_at("Multiplier is not followed by anything", tree.text(m)));
        };
        match tree.kind(next) {
            NodeKind::Heteroatom(_) => tree.set_attr(next, "multiplier", v.to_string()),
            kind if is_modifier(kind) => tree.set_attr(next, "multiplier", v.to_string()),
            NodeKind::Group(..) | NodeKind::Substituent | NodeKind::Bracket(_) if at_scope_start(tree, m) => {
                tree.set_attr(scope, "multiplier", v.to_string())
            }
            _ => {
                return Err(ChemError::component_at(
                    format!("Multiplier cannot apply to {}", tree.text(next)),
                    tree.text(m),
                ))
            }
        }
        tree.detach(m);
    }
    Ok(())
}

/// Splits multiplied heteroatom prefixes into one node per atom, each with
/// at most one locant.
pub fn expand_heteroatoms(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for hetero in tree.children_of_kind(scope, |k| matches!(k, NodeKind::Heteroatom(_))) {
        let locants = tree.locants(hetero);
        let n = match tree.attr(hetero, "multiplier") {
            Some(_) => tree.multiplier(hetero) as usize,
            None => locants.len().max(1),
        };
        if !locants.is_empty() && locants.len() != n {
            return Err(ChemError::component_at(
                format!("{} locants given for {} heteroatoms", locants.len(), n),
                tree.text(hetero),
            ));
        }
        tree.remove_attr(hetero, "multiplier");
        let mut anchor = hetero;
        for i in 0..n {
            let node = if i == 0 { hetero } else { tree.deep_copy(hetero) };
            match locants.get(i) {
                Some(l) => tree.set_attr(node, "locant", l.clone()),
                None => {
                    tree.remove_attr(node, "locant");
                }
            }
            if i > 0 {
                tree.insert_after(anchor, node)?;
                anchor = node;
            }
        }
    }
    Ok(())
}

/// Resolves every locant and multiplier directly inside `scope`.
pub fn resolve_scope_locants(tree: &mut ParseTree, scope: NodeId) -> Result<()> {
    for locant in tree.children_of_kind(scope, |k| matches!(k, NodeKind::Locant(_))) {
        if tree.parent(locant) == Some(scope) {
            determine_locant_meaning(tree, locant)?;
        }
    }
    assign_multipliers(tree, scope)?;
    expand_heteroatoms(tree, scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope_of(text: &str) -> (ParseTree, NodeId) {
        let tree = ParseTree::parse(text).unwrap();
        let tree = crate::normalize::canonicalize_locants(tree).unwrap();
        let scope = tree.substituents_and_roots(tree.root())[0];
        (tree, scope)
    }

    #[test]
    fn test_multiplied_substituent() {
        let (mut tree, scope) = scope_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "2,3"} {hyphen "-"} {multiplier value=2 "di"}
                    {group type=chain subType=alkaneStem value=C labels=numeric "meth"} {suffix type=inline value=yl "yl"}}}}}"#,
        );
        resolve_scope_locants(&mut tree, scope).unwrap();
        assert_eq!(tree.locants(scope), vec!["2", "3"]);
        assert_eq!(tree.multiplier(scope), 2);
        assert!(tree.children_of_kind(scope, |k| matches!(k, NodeKind::Locant(_) | NodeKind::Multiplier(..))).is_empty());
    }

    #[test]
    fn test_suffix_locant_in_root() {
        let (mut tree, scope) = scope_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {root {group type=chain subType=alkaneStem value=CCC labels=numeric "propan"} {hyphen "-"}
                    {locant "1,2"} {hyphen "-"} {multiplier value=2 "di"} {suffix type=root value=ol "ol"}}}}}"#,
        );
        resolve_scope_locants(&mut tree, scope).unwrap();
        let suffix = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Suffix(_)))[0];
        assert_eq!(tree.locants(suffix), vec!["1", "2"]);
        assert_eq!(tree.multiplier(suffix), 2);
    }

    #[test]
    fn test_old_style_locant_moves_to_suffix() {
        let (mut tree, scope) = scope_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {root {locant "2"} {hyphen "-"} {group type=chain subType=alkaneStem value=CCC labels=numeric "propan"}
                    {suffix type=root value=ol "ol"}}}}}"#,
        );
        resolve_scope_locants(&mut tree, scope).unwrap();
        let suffix = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Suffix(_)))[0];
        assert_eq!(tree.locants(suffix), vec!["2"]);
    }

    #[test]
    fn test_hw_heteroatom_locants() {
        let (mut tree, scope) = scope_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {root {locant "1,3"} {hyphen "-"} {heteroatom value=O "ox"} {heteroatom value=N "az"}
                    {group type=ring subType=hantzschWidman value=c1cccc1 labels=numeric "ole"}}}}}"#,
        );
        let locant = tree.children(scope)[0];
        assert_eq!(determine_locant_meaning(&mut tree, locant).unwrap(), LocantRole::HwHeteroatom);
        let heteroatoms = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Heteroatom(_)));
        assert_eq!(tree.locants(heteroatoms[0]), vec!["1"]);
        assert_eq!(tree.locants(heteroatoms[1]), vec!["3"]);
    }

    #[test]
    fn test_single_locant_before_single_heteroatom_ring() {
        let (mut tree, scope) = scope_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "2"} {hyphen "-"} {heteroatom value=S "thi"}
                    {group type=ring subType=hantzschWidman value=c1cccc1 labels=numeric "ophen"}
                    {suffix type=inline value=yl "yl"}}
                {root {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        );
        let locant = tree.children(scope)[0];
        assert!(locant_is_not_hw_heteroatom_locant(&tree, locant));
        assert_eq!(determine_locant_meaning(&mut tree, locant).unwrap(), LocantRole::Substitution);
        assert_eq!(tree.locants(scope), vec!["2"]);
    }

    #[test]
    fn test_out_atom_locants() {
        let (mut tree, scope) = scope_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "1,4"} {hyphen "-"}
                    {group type=ring subType=arene value=c1ccccc1 labels=numeric "phen"}
                    {multiplier value=2 "di"} {suffix type=inline value=yl "yl"}}}}}"#,
        );
        resolve_scope_locants(&mut tree, scope).unwrap();
        let suffix = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Suffix(_)))[0];
        assert_eq!(tree.locants(suffix), vec!["1", "4"]);
        assert!(tree.locants(scope).is_empty());
    }

    #[test]
    fn test_multiplicative_locants() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "1,1'"} {hyphen "-"}
                    {group type=chain subType=alkaneStem value=C labels=numeric "meth"} {suffix type=inline value=ylidene "ylene"}}
                {root {multiplier value=2 "di"} {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        )
        .unwrap();
        let mut tree = crate::normalize::canonicalize_locants(tree).unwrap();
        let scopes = tree.substituents_and_roots(tree.root());
        let locant = tree.children(scopes[0])[0];
        assert_eq!(determine_locant_meaning(&mut tree, locant).unwrap(), LocantRole::Multiplicative);
        assert_eq!(tree.attr(scopes[1], "multiplicativeLocant"), Some("1,1'"));
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let (mut tree, scope) = scope_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "2"} {hyphen "-"} {multiplier value=3 "tri"}
                    {group type=chain subType=alkaneStem value=C labels=numeric "meth"} {suffix type=inline value=yl "yl"}}}}}"#,
        );
        assert!(resolve_scope_locants(&mut tree, scope).is_err());
    }

    #[test]
    fn test_multiplied_heteroatoms_expand() {
        let (mut tree, scope) = scope_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {root {locant "3,6"} {hyphen "-"} {multiplier value=2 "di"} {heteroatom value=O "oxa"}
                    {group type=chain subType=alkaneStem value=CCCCCCCC labels=numeric "octane"}}}}}"#,
        );
        resolve_scope_locants(&mut tree, scope).unwrap();
        let heteroatoms = tree.children_of_kind(scope, |k| matches!(k, NodeKind::Heteroatom(_)));
        assert_eq!(heteroatoms.len(), 2);
        assert_eq!(tree.locants(heteroatoms[0]), vec!["3"]);
        assert_eq!(tree.locants(heteroatoms[1]), vec!["6"]);
    }
}
