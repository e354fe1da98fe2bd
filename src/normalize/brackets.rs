//! Bracket structuring.
//!
//! The tokenizer leaves `(` and `)` as tokens inside substituents. Each
//! matched pair becomes a `bracket` node holding every substituent from the
//! one with the opening token to the one with the closing token. Whatever
//! preceded the opening token (locants, multipliers) moves onto the bracket.

use tracing::*;

use super::*;

fn bracket_tokens(tree: &ParseTree, word: NodeId) -> Vec<NodeId> {
    tree.descendants_of_kind(word, |k| matches!(k, NodeKind::OpenBracket | NodeKind::CloseBracket))
}

fn mismatch(tree: &ParseTree, word: NodeId) -> ChemError {
    ChemError::component_at("Brackets do not match!", tree.subtree_text(word))
}

/// The child of `ancestor` that contains `node`.
fn child_containing(tree: &ParseTree, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        let parent = tree.parent(current)?;
        if parent == ancestor {
            return Some(current);
        }
        current = parent;
    }
}

pub fn structure_brackets(mut tree: ParseTree) -> Result<ParseTree> {
    for word in tree.words() {
        loop {
            let tokens = bracket_tokens(&tree, word);
            if tokens.is_empty() {
                break;
            }
            let Some(close_index) = tokens.iter().position(|&t| tree.kind(t) == NodeKind::CloseBracket) else {
                return Err(mismatch(&tree, word));
            };
            let Some(open_index) = tokens[..close_index]
                .iter()
                .rposition(|&t| tree.kind(t) == NodeKind::OpenBracket)
            else {
                return Err(mismatch(&tree, word));
            };
            let (open, close) = (tokens[open_index], tokens[close_index]);
            let first = tree.parent(open).ok_or_else(|| mismatch(&tree, word))?;
            let container = tree.parent(first).ok_or_else(|| mismatch(&tree, word))?;
            let last = child_containing(&tree, container, close).ok_or_else(|| mismatch(&tree, word))?;
            wrap(&mut tree, container, first, open, last, close)?;
        }
    }
    Ok(tree)
}

fn wrap(tree: &mut ParseTree, container: NodeId, first: NodeId, open: NodeId, last: NodeId, close: NodeId) -> Result<()> {
    let siblings = tree.child_vec(container);
    let start = siblings.iter().position(|&s| s == first);
    let end = siblings.iter().position(|&s| s == last);
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ChemError::internal("bracket tokens are not below one container"));
    };
    if end < start {
        return Err(ChemError::component_at(
            "Brackets do not match!",
            tree.subtree_text(container),
        ));
    }
    let bracket = tree.create(NodeKind::Bracket(BracketType::Structural), "");
    tree.insert_before(first, bracket)?;

    // prefixes written before the "(" belong to the whole bracket
    let before_open: Vec<NodeId> = tree
        .children(first)
        .iter()
        .copied()
        .take_while(|&c| c != open)
        .collect();
    for node in before_open {
        tree.append_child(bracket, node);
    }
    for &s in &siblings[start..=end] {
        tree.append_child(bracket, s);
    }
    tree.detach(open);
    tree.detach(close);

    // the closing substituent may now hold only hyphens
    for s in tree.child_vec(bracket) {
        if tree.kind(s).is_scope()
            && tree.children(s).iter().all(|&c| tree.kind(c) == NodeKind::Hyphen)
        {
            let hyphens = tree.child_vec(s);
            for h in hyphens {
                tree.insert_after(bracket, h)?;
            }
            tree.detach(s);
        }
    }
    debug!("structured bracket {}", tree.subtree_text(bracket));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_wraps_substituents() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {locant "2"} {hyphen "-"} {openBracket "("} {locant "2"} {hyphen "-"}
                    {group type=substituent value=Cl labels=none "chloro"}}
                {substituent {group type=chain subType=alkaneStem value=CC labels=numeric "eth"}
                    {suffix type=inline value=yl "yl"} {closeBracket ")"}}
                {root {group type=chain subType=alkaneStem value=CCC labels=numeric "prop"}
                    {unsaturator value=0 "ane"}}}}}"#,
        )
        .unwrap();
        let tree = structure_brackets(tree).unwrap();
        let word = tree.words()[0];
        let top: Vec<NodeKind> = tree.children(word).iter().map(|&c| tree.kind(c)).collect();
        assert_eq!(top, vec![NodeKind::Bracket(BracketType::Structural), NodeKind::Root]);
        let bracket = tree.children(word)[0];
        let inside: Vec<NodeKind> = tree.children(bracket).iter().map(|&c| tree.kind(c)).collect();
        assert_eq!(inside[0], NodeKind::Locant(LocantRole::Unresolved));
        assert_eq!(inside[1], NodeKind::Hyphen);
        assert_eq!(inside[2..], [NodeKind::Substituent, NodeKind::Substituent]);
    }

    #[test]
    fn test_unclosed_bracket_is_rejected() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=substituent {word type=substituent
                {substituent {multiplier value=3 "tri"} {hyphen "-"} {openBracket "("} {locant "2"} {hyphen "-"}
                    {suffix type=inline value=yl "yl"}}}}}"#,
        )
        .unwrap();
        let err = structure_brackets(tree).unwrap_err();
        assert!(err.to_string().contains("Brackets do not match!"));
        assert_eq!(err.token(), Some("tri-(2-yl"));
    }
}
