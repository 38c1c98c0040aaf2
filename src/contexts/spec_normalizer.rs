//! Converges "almost right" model output onto one canonical [`Spec`].
//!
//! Repairs run in a fixed order: key assignment and inline-child registration,
//! child-list cleanup, back-reference reconciliation, root resolution and,
//! last, adoption of anything the resolved root cannot reach. Every repair
//! that changes the source structure is reported as a named [`RepairRule`].

use crate::data::{Element, Props, Spec};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Element type used for synthesized container roots
pub const WRAPPER_TYPE: &str = "Card";

const GENERIC_KEY_BASE: &str = "el";
const WRAPPER_KEY_BASE: &str = "root";

/// Which family of source JSON an input belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    /// `{"root": "...", "elements": {...}}`
    Flat,
    /// `{"type": "...", "props": {...}, "children": [...]}`
    Nested,
}

/// Classifies a parsed value, or `None` when it is neither shape
pub fn classify(value: &Value) -> Option<SourceShape> {
    let object = value.as_object()?;
    let has_root = object.get("root").is_some_and(Value::is_string);
    let has_elements = object.get("elements").is_some_and(Value::is_object);
    if has_root && has_elements {
        Some(SourceShape::Flat)
    } else if object.get("type").is_some_and(Value::is_string) {
        Some(SourceShape::Nested)
    } else {
        None
    }
}

/// A structural repair applied while normalizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairRule {
    /// Element entry was not an object or had no string `type`
    SkippedMalformedElement,
    /// Source key already taken; a suffixed key was assigned
    RenamedDuplicateKey,
    /// Source gave no key; one was generated
    SynthesizedKey,
    /// An inline child object was registered as its own element
    InlinedChild,
    /// Child reference to an unknown key, to itself, or repeated
    DroppedDanglingChild,
    /// A forward `children` link overrode the stated `parentKey`
    ReassignedParent,
    /// Several parents listed one child; only the last lister keeps it
    DetachedContestedChild,
    /// A valid `parentKey` whose parent did not list the child
    RestoredForwardLink,
    /// The resolved root was listed as someone's child
    DetachedRootFromParent,
    /// The declared root was missing; a container was synthesized for its orphans
    AdoptedOrphansUnderDeclaredRoot,
    /// The only masterless element became the root
    PromotedSoleMasterless,
    /// Several masterless elements were wrapped under a synthesized root
    WrappedMasterless,
    /// Every element had a parent; the first one became the root
    BrokeCycle,
    /// An element unreachable from the root was adopted by it
    AdoptedStrayElement,
}

impl fmt::Display for RepairRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One applied repair and the element key it concerns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub rule: RepairRule,
    pub key: String,
}

/// A canonical tree together with the repairs that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub spec: Spec,
    pub shape: SourceShape,
    pub repairs: Vec<Repair>,
}

impl Normalized {
    pub fn applied(&self, rule: RepairRule) -> bool {
        self.repairs.iter().any(|repair| repair.rule == rule)
    }
}

/// Normalizes a parsed value into a canonical tree, discarding the repair log
pub fn normalize_spec(value: &Value) -> Option<Spec> {
    normalize(value).map(|normalized| normalized.spec)
}

/// Normalizes a parsed flat or nested value.
///
/// Returns `None` when the value is neither shape or no element survives
/// registration.
pub fn normalize(value: &Value) -> Option<Normalized> {
    let shape = classify(value)?;
    let object = value.as_object()?;

    let mut normalizer = Normalizer::default();
    let declared_root = match shape {
        SourceShape::Flat => {
            normalizer.register_flat(object);
            object
                .get("root")
                .and_then(Value::as_str)
                .filter(|root| !root.is_empty())
                .map(str::to_string)
        }
        SourceShape::Nested => normalizer.register_described(object, None),
    };

    normalizer.clean_child_lists();
    normalizer.reconcile_parents();
    let root = normalizer.resolve_root(declared_root)?;
    normalizer.adopt_strays(root);

    for repair in &normalizer.repairs {
        tracing::debug!(rule = %repair.rule, key = %repair.key, "applied repair");
    }

    let root_key = normalizer.drafts[root].key.clone();
    let elements: BTreeMap<String, Element> = normalizer
        .drafts
        .into_iter()
        .map(|draft| {
            (
                draft.key.clone(),
                Element {
                    key: draft.key,
                    element_type: draft.element_type,
                    props: draft.props,
                    children: draft.children,
                    parent_key: draft.parent_key,
                },
            )
        })
        .collect();

    Some(Normalized {
        spec: Spec {
            root: root_key,
            elements,
        },
        shape,
        repairs: normalizer.repairs,
    })
}

#[derive(Debug)]
struct Draft {
    key: String,
    element_type: String,
    props: Props,
    children: Vec<String>,
    parent_key: Option<String>,
}

#[derive(Default)]
struct Normalizer {
    /// Registered elements in encounter order
    drafts: Vec<Draft>,
    index: HashMap<String, usize>,
    /// Top-level keys of a flat source, kept away from inline registrations
    reserved: HashSet<String>,
    repairs: Vec<Repair>,
}

impl Normalizer {
    fn note(&mut self, rule: RepairRule, key: &str) {
        self.repairs.push(Repair {
            rule,
            key: key.to_string(),
        });
    }

    fn is_taken(&self, key: &str) -> bool {
        self.index.contains_key(key) || self.reserved.contains(key)
    }

    fn fresh_key(&self, base: &str) -> String {
        (1..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !self.is_taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Key assignment: keep the wanted key unless it is taken or absent
    fn claim_key(&mut self, wanted: Option<&str>) -> String {
        match wanted.filter(|key| !key.is_empty()) {
            Some(key) if !self.is_taken(key) => key.to_string(),
            Some(key) => {
                let fresh = self.fresh_key(key);
                self.note(RepairRule::RenamedDuplicateKey, &fresh);
                fresh
            }
            None => {
                let fresh = self.fresh_key(GENERIC_KEY_BASE);
                self.note(RepairRule::SynthesizedKey, &fresh);
                fresh
            }
        }
    }

    fn register_flat(&mut self, source: &Map<String, Value>) {
        let Some(elements) = source.get("elements").and_then(Value::as_object) else {
            return;
        };
        self.reserved = elements
            .keys()
            .filter(|key| !key.is_empty())
            .cloned()
            .collect();

        for (map_key, entry) in elements {
            let described = entry
                .as_object()
                .filter(|object| object.get("type").is_some_and(Value::is_string));
            let Some(object) = described else {
                self.note(RepairRule::SkippedMalformedElement, map_key);
                continue;
            };

            let key = if map_key.is_empty() {
                self.claim_key(object.get("key").and_then(Value::as_str))
            } else {
                map_key.clone()
            };
            let stated_parent = object
                .get("parentKey")
                .and_then(Value::as_str)
                .filter(|parent| !parent.is_empty())
                .map(str::to_string);
            self.register(key, object, stated_parent);
        }
    }

    /// Registers a self-describing element object (nested root or inline
    /// child) and returns its assigned key.
    fn register_described(
        &mut self,
        object: &Map<String, Value>,
        parent: Option<&str>,
    ) -> Option<String> {
        let key_hint = object.get("key").and_then(Value::as_str);
        if !object.get("type").is_some_and(Value::is_string) {
            let subject = key_hint.or(parent).unwrap_or(GENERIC_KEY_BASE).to_string();
            self.note(RepairRule::SkippedMalformedElement, &subject);
            return None;
        }

        let key = self.claim_key(key_hint);
        if parent.is_some() {
            self.note(RepairRule::InlinedChild, &key);
        }
        self.register(key.clone(), object, parent.map(str::to_string));
        Some(key)
    }

    fn register(&mut self, key: String, object: &Map<String, Value>, parent_key: Option<String>) {
        let position = self.drafts.len();
        self.index.insert(key.clone(), position);
        self.drafts.push(Draft {
            key: key.clone(),
            element_type: object
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(WRAPPER_TYPE)
                .to_string(),
            props: object
                .get("props")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            children: Vec::new(),
            parent_key,
        });

        let mut children = Vec::new();
        for entry in object
            .get("children")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            match entry {
                Value::String(reference) => children.push(reference.clone()),
                Value::Object(inline) => {
                    if let Some(child_key) = self.register_described(inline, Some(key.as_str())) {
                        children.push(child_key);
                    }
                }
                _ => {}
            }
        }
        self.drafts[position].children = children;
    }

    fn has_valid_parent(&self, position: usize) -> bool {
        let draft = &self.drafts[position];
        draft
            .parent_key
            .as_deref()
            .is_some_and(|parent| parent != draft.key && self.index.contains_key(parent))
    }

    fn detach_from_parent(&mut self, position: usize) {
        if self.has_valid_parent(position) {
            let key = self.drafts[position].key.clone();
            if let Some(parent) = self.drafts[position]
                .parent_key
                .as_deref()
                .and_then(|parent| self.index.get(parent).copied())
            {
                self.drafts[parent].children.retain(|child| *child != key);
            }
        }
        self.drafts[position].parent_key = None;
    }

    /// Drops references to unknown keys, self-references and repeats
    fn clean_child_lists(&mut self) {
        let Self {
            drafts,
            index,
            repairs,
            ..
        } = self;
        for draft in drafts.iter_mut() {
            let mut seen = HashSet::new();
            let own_key = draft.key.clone();
            draft.children.retain(|child| {
                let keep =
                    *child != own_key && index.contains_key(child) && seen.insert(child.clone());
                if !keep {
                    repairs.push(Repair {
                        rule: RepairRule::DroppedDanglingChild,
                        key: child.clone(),
                    });
                }
                keep
            });
        }
    }

    /// Forward links win over stated back-links, the last lister wins a
    /// contested child, and valid unlisted back-links are restored.
    fn reconcile_parents(&mut self) {
        let stated: Vec<Option<String>> = self
            .drafts
            .iter()
            .map(|draft| draft.parent_key.clone())
            .collect();
        let mut claims: Vec<Vec<usize>> = vec![Vec::new(); self.drafts.len()];

        for parent in 0..self.drafts.len() {
            let parent_key = self.drafts[parent].key.clone();
            for child in self.drafts[parent].children.clone() {
                let position = self.index[&child];
                self.drafts[position].parent_key = Some(parent_key.clone());
                claims[position].push(parent);
            }
        }

        for (position, claimed_by) in claims.iter().enumerate() {
            let key = self.drafts[position].key.clone();
            if let [earlier @ .., _winner] = claimed_by.as_slice() {
                for &loser in earlier {
                    self.drafts[loser].children.retain(|child| *child != key);
                }
                if !earlier.is_empty() {
                    self.note(RepairRule::DetachedContestedChild, &key);
                }
                if stated[position]
                    .as_ref()
                    .is_some_and(|parent| Some(parent) != self.drafts[position].parent_key.as_ref())
                {
                    self.note(RepairRule::ReassignedParent, &key);
                }
            } else if self.has_valid_parent(position) {
                let parent = self.drafts[position]
                    .parent_key
                    .as_deref()
                    .and_then(|parent| self.index.get(parent).copied());
                if let Some(parent) = parent {
                    self.drafts[parent].children.push(key.clone());
                    self.note(RepairRule::RestoredForwardLink, &key);
                }
            }
        }
    }

    fn push_draft(&mut self, key: String, children: Vec<String>) -> usize {
        let position = self.drafts.len();
        for child in &children {
            let child_position = self.index[child];
            self.drafts[child_position].parent_key = Some(key.clone());
        }
        self.index.insert(key.clone(), position);
        self.drafts.push(Draft {
            key,
            element_type: WRAPPER_TYPE.to_string(),
            props: Props::new(),
            children,
            parent_key: None,
        });
        position
    }

    /// Root resolution in priority order; `None` when nothing was registered
    fn resolve_root(&mut self, declared: Option<String>) -> Option<usize> {
        if self.drafts.is_empty() {
            return None;
        }

        if let Some(declared) = declared {
            if let Some(&root) = self.index.get(&declared) {
                if self.has_valid_parent(root) {
                    self.note(RepairRule::DetachedRootFromParent, &declared);
                }
                self.detach_from_parent(root);
                return Some(root);
            }

            let orphans: Vec<String> = self
                .drafts
                .iter()
                .filter(|draft| draft.parent_key.as_deref() == Some(declared.as_str()))
                .map(|draft| draft.key.clone())
                .collect();
            if !orphans.is_empty() {
                self.note(RepairRule::AdoptedOrphansUnderDeclaredRoot, &declared);
                return Some(self.push_draft(declared, orphans));
            }
        }

        let masterless: Vec<usize> = (0..self.drafts.len())
            .filter(|&position| !self.has_valid_parent(position))
            .collect();

        match masterless.as_slice() {
            [] => {
                let root = 0;
                let key = self.drafts[root].key.clone();
                self.note(RepairRule::BrokeCycle, &key);
                self.detach_from_parent(root);
                Some(root)
            }
            [only] => {
                let key = self.drafts[*only].key.clone();
                self.note(RepairRule::PromotedSoleMasterless, &key);
                self.drafts[*only].parent_key = None;
                Some(*only)
            }
            several => {
                let children = several
                    .iter()
                    .map(|&position| self.drafts[position].key.clone())
                    .collect();
                let key = if self.is_taken(WRAPPER_KEY_BASE) {
                    self.fresh_key(WRAPPER_KEY_BASE)
                } else {
                    WRAPPER_KEY_BASE.to_string()
                };
                self.note(RepairRule::WrappedMasterless, &key);
                Some(self.push_draft(key, children))
            }
        }
    }

    fn mark_reachable(&self, from: usize, reachable: &mut [bool]) {
        let mut stack = vec![from];
        while let Some(position) = stack.pop() {
            if std::mem::replace(&mut reachable[position], true) {
                continue;
            }
            stack.extend(
                self.drafts[position]
                    .children
                    .iter()
                    .filter_map(|child| self.index.get(child).copied()),
            );
        }
    }

    /// Adopts under the root every element it cannot reach: masterless
    /// elements first, then members of parent cycles, each in encounter order.
    fn adopt_strays(&mut self, root: usize) {
        let mut reachable = vec![false; self.drafts.len()];
        self.mark_reachable(root, &mut reachable);

        let (tops, cyclic): (Vec<usize>, Vec<usize>) = (0..self.drafts.len())
            .filter(|&position| !reachable[position])
            .partition(|&position| !self.has_valid_parent(position));

        let root_key = self.drafts[root].key.clone();
        for position in tops.into_iter().chain(cyclic) {
            if reachable[position] {
                continue;
            }
            let key = self.drafts[position].key.clone();
            self.detach_from_parent(position);
            self.drafts[position].parent_key = Some(root_key.clone());
            self.drafts[root].children.push(key.clone());
            self.note(RepairRule::AdoptedStrayElement, &key);
            self.mark_reachable(position, &mut reachable);
        }
    }
}
