//! Implicit bracketing: "methylaminobenzene" is (methylamino)benzene when
//! nothing in the name says otherwise.

use tracing::*;

use super::*;

fn is_element_locant(locant: &str) -> bool {
    let symbol: String = locant.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    symbol.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false) && ChemEl::from_symbol(&symbol).is_some()
}

fn is_joiner(tree: &ParseTree, scope: NodeId) -> bool {
    tree.scope_group(scope)
        .and_then(|g| tree.attr(g, "usableAsJoiner"))
        .map(|v| v != "no")
        .unwrap_or(false)
}

fn separated_by_hyphen(tree: &ParseTree, left: NodeId, right: NodeId) -> bool {
    let last = tree.children(left).last().map(|&c| tree.kind(c));
    let first = tree.children(right).first().map(|&c| tree.kind(c));
    last == Some(NodeKind::Hyphen) || first == Some(NodeKind::Hyphen)
}

/// Whether `left` and the joiner `right` should be wrapped in a bracket.
pub fn should_bracket_implicitly(tree: &ParseTree, left: NodeId, right: NodeId) -> bool {
    if tree.kind(left) != NodeKind::Substituent || tree.kind(right) != NodeKind::Substituent {
        return false;
    }
    if !is_joiner(tree, right) || separated_by_hyphen(tree, left, right) {
        return false;
    }
    if !tree.locants(left).iter().all(|l| is_element_locant(l)) {
        return false;
    }
    let Some(parent) = tree.parent(right) else {
        return false;
    };
    let siblings = tree.children_of_kind(parent, |k| k.is_scope());
    !(matches!(tree.kind(parent), NodeKind::Bracket(_)) && siblings == [left, right])
}

/// Wraps each substituent and the joiner following it in an implicit
/// bracket. The joiner's locant and multiplier move to the bracket.
pub fn implicit_brackets(tree: &mut ParseTree, word: NodeId) -> Result<()> {
    for right in tree.descendants_of_kind(word, |k| k == NodeKind::Substituent) {
        let Some(left) = tree.prev_sibling(right) else {
            continue;
        };
        if !should_bracket_implicitly(tree, left, right) {
            continue;
        }
        let bracket = tree.create(NodeKind::Bracket(BracketType::Implicit), "");
        tree.insert_before(left, bracket)?;
        tree.append_child(bracket, left);
        tree.append_child(bracket, right);
        for key in ["locant", "multiplier"] {
            if let Some(value) = tree.remove_attr(right, key) {
                tree.set_attr(bracket, key, value);
            }
        }
        debug!("implicit bracket around {}", tree.subtree_text(bracket));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_of(text: &str) -> (ParseTree, NodeId) {
        let tree = ParseTree::parse(text).unwrap();
        let word = tree.words()[0];
        (tree, word)
    }

    #[test]
    fn test_methylamino_is_bracketed() {
        let (mut tree, word) = word_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent {group type=chain subType=alkaneStem value=C labels=numeric "meth"} {suffix type=inline value=yl "yl"}}
                {substituent {group type=substituent value=N labels=none outIDs=1 usableAsJoiner=yes "amino"}}
                {root {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        );
        implicit_brackets(&mut tree, word).unwrap();
        let brackets = tree.descendants_of_kind(word, |k| k == NodeKind::Bracket(BracketType::Implicit));
        assert_eq!(brackets.len(), 1);
        assert_eq!(tree.children(brackets[0]).len(), 2);
    }

    #[test]
    fn test_numeric_locant_blocks_bracketing() {
        let (mut tree, word) = word_of(
            r#"{molecule {wordRule wordRule=simple {word type=full
                {substituent locant=4 {group type=chain subType=alkaneStem value=C labels=numeric "meth"} {suffix type=inline value=yl "yl"}}
                {substituent {group type=substituent value=N labels=none outIDs=1 usableAsJoiner=yes "amino"}}
                {root {group type=ring subType=arene value=c1ccccc1 labels=numeric "benzene"}}}}}"#,
        );
        implicit_brackets(&mut tree, word).unwrap();
        assert!(tree.descendants_of_kind(word, |k| matches!(k, NodeKind::Bracket(_))).is_empty());
    }

    #[test]
    fn test_element_locants_allow_bracketing() {
        assert!(is_element_locant("N"));
        assert!(is_element_locant("N'"));
        assert!(is_element_locant("O2"));
        assert!(!is_element_locant("2"));
        assert!(!is_element_locant("alpha"));
    }
}
