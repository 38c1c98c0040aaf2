use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Renderer-owned properties of an element. The core never looks inside.
pub type Props = serde_json::Map<String, Value>;

/// One visual unit of a UI tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub key: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub props: Props,
    /// Ordered child keys, omitted from JSON when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Key of the owning element, `None` only for the root
    #[serde(default)]
    pub parent_key: Option<String>,
}

impl Element {
    pub fn new(key: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            element_type: element_type.into(),
            props: Props::new(),
            children: Vec::new(),
            parent_key: None,
        }
    }

    /// Reads a string prop, ignoring values of any other JSON type
    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }
}

/// A canonical flat UI tree: a single root plus every element by key.
///
/// Values are immutable once produced; a newer extraction for the same
/// message yields a fresh `Spec` instead of mutating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub root: String,
    pub elements: BTreeMap<String, Element>,
}

/// A broken structural invariant found by [`Spec::check_invariants`]
#[derive(Debug, Clone, PartialEq)]
pub enum SpecViolation {
    MissingRoot(String),
    KeyMismatch { map_key: String, element_key: String },
    RootHasParent(String),
    ExtraParentless(String),
    DanglingChild { parent: String, child: String },
    ParentMismatch { parent: String, child: String },
    UnlistedChild { parent: String, child: String },
    Unreachable(String),
    Cycle(String),
}

impl fmt::Display for SpecViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SpecViolation::MissingRoot(root) => {
                write!(f, "Root '{}' is not in the element map", root)
            }
            SpecViolation::KeyMismatch { map_key, element_key } => write!(
                f,
                "Element stored under '{}' carries key '{}'",
                map_key, element_key
            ),
            SpecViolation::RootHasParent(root) => {
                write!(f, "Root '{}' has a parent", root)
            }
            SpecViolation::ExtraParentless(key) => {
                write!(f, "Element '{}' has no parent but is not the root", key)
            }
            SpecViolation::DanglingChild { parent, child } => {
                write!(f, "'{}' lists unknown child '{}'", parent, child)
            }
            SpecViolation::ParentMismatch { parent, child } => write!(
                f,
                "'{}' lists child '{}' whose parentKey points elsewhere",
                parent, child
            ),
            SpecViolation::UnlistedChild { parent, child } => write!(
                f,
                "'{}' claims parent '{}' which does not list it",
                child, parent
            ),
            SpecViolation::Unreachable(key) => {
                write!(f, "Element '{}' is not reachable from the root", key)
            }
            SpecViolation::Cycle(key) => write!(f, "Element '{}' is its own descendant", key),
        }
    }
}

impl std::error::Error for SpecViolation {}

impl Spec {
    pub fn get(&self, key: &str) -> Option<&Element> {
        self.elements.get(key)
    }

    pub fn root_element(&self) -> Option<&Element> {
        self.elements.get(&self.root)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Children of `key` in listed order; unknown keys are skipped
    pub fn children_of<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements
            .get(key)
            .map(|element| element.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.elements.get(child))
    }

    /// Elements of the given type, in key order
    pub fn elements_of_type<'a>(&'a self, element_type: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements
            .values()
            .filter(move |element| element.element_type == element_type)
    }

    /// Verifies every structural invariant of a canonical tree
    pub fn check_invariants(&self) -> Result<(), SpecViolation> {
        let root = self
            .elements
            .get(&self.root)
            .ok_or_else(|| SpecViolation::MissingRoot(self.root.clone()))?;
        if root.parent_key.is_some() {
            return Err(SpecViolation::RootHasParent(self.root.clone()));
        }

        for (map_key, element) in &self.elements {
            if *map_key != element.key {
                return Err(SpecViolation::KeyMismatch {
                    map_key: map_key.clone(),
                    element_key: element.key.clone(),
                });
            }

            match &element.parent_key {
                None if *map_key != self.root => {
                    return Err(SpecViolation::ExtraParentless(map_key.clone()));
                }
                Some(parent) => {
                    let listed = self
                        .elements
                        .get(parent)
                        .is_some_and(|p| p.children.iter().any(|c| c == map_key));
                    if !listed {
                        return Err(SpecViolation::UnlistedChild {
                            parent: parent.clone(),
                            child: map_key.clone(),
                        });
                    }
                }
                None => {}
            }

            for child in &element.children {
                let Some(child_element) = self.elements.get(child) else {
                    return Err(SpecViolation::DanglingChild {
                        parent: map_key.clone(),
                        child: child.clone(),
                    });
                };
                if child_element.parent_key.as_deref() != Some(map_key.as_str()) {
                    return Err(SpecViolation::ParentMismatch {
                        parent: map_key.clone(),
                        child: child.clone(),
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        let mut stack = vec![self.root.as_str()];
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                return Err(SpecViolation::Cycle(key.to_string()));
            }
            if let Some(element) = self.elements.get(key) {
                stack.extend(element.children.iter().rev().map(String::as_str));
            }
        }
        if let Some(key) = self.elements.keys().find(|key| !seen.contains(key.as_str())) {
            return Err(SpecViolation::Unreachable(key.clone()));
        }

        Ok(())
    }
}
