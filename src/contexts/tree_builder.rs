use crate::data::{Element, Props, Spec};
use serde_json::Value;
use std::collections::BTreeMap;

/// A nested, programmatically built element description
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub node_type: String,
    pub props: Props,
    pub children: Vec<Node>,
}

/// Starts a node of the given type with no props and no children
pub fn node(node_type: impl Into<String>) -> Node {
    Node {
        node_type: node_type.into(),
        props: Props::new(),
        children: Vec::new(),
    }
}

impl Node {
    /// Replaces all props with the fields of `props`; non-objects are ignored
    pub fn props(mut self, props: Value) -> Self {
        if let Value::Object(map) = props {
            self.props = map;
        }
        self
    }

    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.props.insert(name.to_string(), value.into());
        self
    }

    pub fn children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}

/// Flattens a nested node description into a [`Spec`].
///
/// Keys are `lowercase(type)-N` with one counter shared by the whole build,
/// assigned in pre-order, so the root is always `<type>-0`.
pub fn create_tree(root: &Node) -> Spec {
    let mut builder = TreeBuilder::default();
    let root_key = builder.walk(root, None);
    Spec {
        root: root_key,
        elements: builder.elements,
    }
}

#[derive(Default)]
struct TreeBuilder {
    counter: usize,
    elements: BTreeMap<String, Element>,
}

impl TreeBuilder {
    fn walk(&mut self, node: &Node, parent_key: Option<&str>) -> String {
        let key = format!("{}-{}", node.node_type.to_lowercase(), self.counter);
        self.counter += 1;

        let children = node
            .children
            .iter()
            .map(|child| self.walk(child, Some(&key)))
            .collect();

        self.elements.insert(
            key.clone(),
            Element {
                key: key.clone(),
                element_type: node.node_type.clone(),
                props: node.props.clone(),
                children,
                parent_key: parent_key.map(str::to_string),
            },
        );

        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_node_tree() {
        let spec = create_tree(&node("Card"));
        assert_eq!(spec.root, "card-0");
        assert_eq!(spec.len(), 1);
        let root = spec.root_element().unwrap();
        assert!(root.children.is_empty());
        assert_eq!(root.parent_key, None);
    }

    #[test]
    fn test_keys_follow_preorder_counter() {
        let tree = node("Card").children(vec![
            node("Heading").prop("text", "Skills?"),
            node("List").children(vec![
                node("ListItem").prop("content", "a"),
                node("ListItem").prop("content", "b"),
            ]),
            node("Text").prop("content", "done"),
        ]);

        let spec = create_tree(&tree);
        assert_eq!(spec.root, "card-0");
        assert_eq!(
            spec.get("card-0").unwrap().children,
            vec!["heading-1", "list-2", "text-5"]
        );
        assert_eq!(spec.get("list-2").unwrap().children, vec!["listitem-3", "listitem-4"]);
        assert_eq!(spec.get("listitem-4").unwrap().parent_key.as_deref(), Some("list-2"));
        assert_eq!(spec.check_invariants(), Ok(()));
    }

    #[test]
    fn test_props_are_copied_verbatim() {
        let spec = create_tree(&node("Tag").props(json!({"text": "Rust", "weight": 3})));
        let tag = spec.root_element().unwrap();
        assert_eq!(tag.prop_str("text"), Some("Rust"));
        assert_eq!(tag.props["weight"], 3);
    }

    #[test]
    fn test_non_object_props_are_ignored() {
        let built = node("Text").prop("content", "kept").props(json!("not an object"));
        assert_eq!(built.props["content"], "kept");
    }

    #[test]
    fn test_each_build_restarts_the_counter() {
        let first = create_tree(&node("Card").child(node("Text")));
        let second = create_tree(&node("Card").child(node("Text")));
        assert_eq!(first, second);
    }
}
