use crate::grammar::MarkupGrammar;
use crate::node::MarkupNode;

/// Whether `node` should receive the location attribute `key`.
///
/// Only elements and components qualify, excluded tag names never do, and
/// a node that already names `key` explicitly is left alone. Spread
/// attributes cannot prove the key is present, so they never block.
pub fn is_eligible(grammar: &dyn MarkupGrammar, node: &MarkupNode, key: &str) -> bool {
    if !node.kind.is_element() {
        return false;
    }
    if grammar.excluded_tags().contains(&node.name.as_str()) {
        return false;
    }
    !is_tagged(grammar, node, key)
}

pub fn is_tagged(grammar: &dyn MarkupGrammar, node: &MarkupNode, key: &str) -> bool {
    node.attributes
        .iter()
        .filter_map(|attr| attr.name.as_deref())
        .any(|name| grammar.carries_key(name, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionGrammar;
    use crate::node::{Attribute, NodeKind, Position};
    use crate::template::TemplateGrammar;

    const KEY: &str = "data-react-inspector";

    fn element(kind: NodeKind, name: &str, attributes: Vec<Attribute>) -> MarkupNode {
        let mut node = MarkupNode::leaf(kind, Position::default(), 10);
        node.name = name.to_string();
        node.attributes = attributes;
        node
    }

    #[test]
    fn test_only_elements_and_components() {
        let g = ExpressionGrammar::for_filename("a.tsx");
        assert!(is_eligible(&g, &element(NodeKind::Element, "div", vec![]), KEY));
        assert!(is_eligible(&g, &element(NodeKind::Component, "Foo", vec![]), KEY));
        assert!(!is_eligible(&g, &element(NodeKind::Fragment, "", vec![]), KEY));
        assert!(!is_eligible(&g, &element(NodeKind::Text, "", vec![]), KEY));
        assert!(!is_eligible(&TemplateGrammar, &element(NodeKind::Slot, "slot", vec![]), KEY));
    }

    #[test]
    fn test_excluded_tags_per_grammar() {
        let expr = ExpressionGrammar::for_filename("a.jsx");
        assert!(!is_eligible(&expr, &element(NodeKind::Element, "script", vec![]), KEY));
        assert!(!is_eligible(&expr, &element(NodeKind::Element, "style", vec![]), KEY));
        // `template` is only a wrapper in the template grammar
        assert!(is_eligible(&expr, &element(NodeKind::Element, "template", vec![]), KEY));
        assert!(!is_eligible(&TemplateGrammar, &element(NodeKind::Element, "template", vec![]), KEY));
    }

    #[test]
    fn test_existing_key_blocks_but_spread_does_not() {
        let g = ExpressionGrammar::for_filename("a.tsx");
        let tagged = element(NodeKind::Element, "div", vec![Attribute::named(KEY, 5, 9)]);
        assert!(!is_eligible(&g, &tagged, KEY));
        let spread = element(NodeKind::Element, "div", vec![Attribute::spread(5, 9)]);
        assert!(is_eligible(&g, &spread, KEY));
        let ignore = element(NodeKind::Element, "div", vec![Attribute::named("data-react-inspector-ignore", 5, 9)]);
        assert!(is_eligible(&g, &ignore, KEY));
    }
}
