//! Winds a flat layout into a forest of window trees.
//!
//! Windows are indexed first. Every other object is then attached as soon
//! as its parent has been placed, rescanning the pending objects until none
//! are left, no pass makes progress, or [`MAX_PASSES`] is reached. Objects
//! that never find their parent (cycles, dangling references) are dropped
//! with a [`Diagnostic`] instead of failing the whole layout, and so are
//! objects nested deeper than [`MAX_DEPTH`].

use std::collections::HashMap;

use log::{debug, error, warn};
use serde::Serialize;

use crate::layout::{FlatLayout, LayoutAttributes, LayoutObject, ObjectKind};

/// Upper bound on rescans of the pending set.
pub const MAX_PASSES: usize = 1000;

/// Deepest nesting kept below a window; windows are at depth 0.
///
/// Everything built from a resolved hierarchy walks it recursively, so
/// deeper objects are dropped here.
pub const MAX_DEPTH: usize = 128;

/// A resolved layout object with its children attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    /// Object name from the flat layout.
    pub name: String,
    /// Declared type.
    pub kind: ObjectKind,
    /// Attributes copied from the flat object.
    pub attributes: LayoutAttributes,
    /// Children, ordered by their `order` attribute.
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(&node.children);
        }
        count
    }

    /// Always `false`; a node counts itself.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Find a descendant (or `self`) by name, depth-first.
    pub fn find(&self, name: &str) -> Option<&HierarchyNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.name == name {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }
}

/// Why an object was dropped during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A non-window object has no `parent` attribute.
    MissingParent { name: String },
    /// The parent never appeared, either because it doesn't exist or
    /// because the parent chain is cyclic.
    Unresolved { name: String, parent: String, passes: usize },
    /// The object sits deeper than [`MAX_DEPTH`] below its window.
    TooDeep { name: String, depth: usize },
}

impl Diagnostic {
    /// Name of the dropped object.
    pub fn name(&self) -> &str {
        match self {
            Diagnostic::MissingParent { name }
            | Diagnostic::Unresolved { name, .. }
            | Diagnostic::TooDeep { name, .. } => name,
        }
    }
}

/// Result of resolving a flat layout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    /// Root window trees.
    pub windows: Vec<HierarchyNode>,
    /// Objects that were dropped, in the order they were dropped.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of rescans of the pending set.
    pub passes: usize,
}

impl Resolution {
    /// Total number of placed nodes.
    pub fn node_count(&self) -> usize {
        self.windows.iter().map(HierarchyNode::len).sum()
    }

    /// Find a placed node by name.
    pub fn find(&self, name: &str) -> Option<&HierarchyNode> {
        self.windows.iter().find_map(|window| window.find(name))
    }
}

/// A placed object awaiting assembly into the tree.
struct Slot {
    name: String,
    kind: ObjectKind,
    attributes: LayoutAttributes,
    children: Vec<usize>,
}

/// Where a resolved name ended up.
#[derive(Clone, Copy)]
struct Placement {
    /// Slot index, or `None` if the object was dropped for its depth.
    slot: Option<usize>,
    depth: usize,
}

/// Resolve `layout` into window trees.
pub fn resolve(layout: FlatLayout) -> Resolution {
    let mut slots: Vec<Slot> = Vec::with_capacity(layout.len());
    let mut index: HashMap<String, Placement> = HashMap::with_capacity(layout.len());
    let mut roots = Vec::new();
    let mut pending: Vec<(String, String, LayoutObject)> = Vec::new();
    let mut diagnostics = Vec::new();

    for (name, object) in layout {
        if object.kind.is_window() {
            let mut attributes = object.attributes;
            attributes.strip_empty();
            index.insert(name.clone(), Placement { slot: Some(slots.len()), depth: 0 });
            roots.push(slots.len());
            slots.push(Slot { name, kind: ObjectKind::Window, attributes, children: Vec::new() });
            continue;
        }

        match object.parent.clone() {
            Some(parent) => pending.push((name, parent, object)),
            None => {
                warn!("Dropping layout object {name:?}: no parent declared");
                diagnostics.push(Diagnostic::MissingParent { name });
            },
        }
    }

    let mut passes = 0;
    while !pending.is_empty() && passes < MAX_PASSES {
        passes += 1;
        let before = pending.len();

        let mut waiting = Vec::with_capacity(before);
        for (name, parent, object) in pending.drain(..) {
            let Some(&parent_at) = index.get(&parent) else {
                waiting.push((name, parent, object));
                continue;
            };

            let depth = parent_at.depth + 1;
            let slot = match parent_at.slot {
                Some(parent_idx) if depth <= MAX_DEPTH => {
                    let idx = slots.len();
                    slots.push(Slot {
                        name: name.clone(),
                        kind: object.kind,
                        attributes: object.attributes,
                        children: Vec::new(),
                    });
                    slots[parent_idx].children.push(idx);
                    Some(idx)
                },
                _ => {
                    warn!("Dropping layout object {name:?}: nested {depth} levels deep");
                    diagnostics.push(Diagnostic::TooDeep { name: name.clone(), depth });
                    None
                },
            };
            // Dropped objects stay indexed so their descendants are dropped too.
            index.insert(name, Placement { slot, depth });
        }
        pending = waiting;

        // No progress now means none later: stop instead of spinning up to
        // MAX_PASSES; the leftovers are reported below as if the cap was hit.
        if pending.len() == before {
            break;
        }
    }

    if !pending.is_empty() {
        if passes >= MAX_PASSES {
            error!("Hit the maximum of {MAX_PASSES} layout passes; dropping unresolved objects");
        }
        for (name, parent, _) in pending {
            warn!("Dropping layout object {name:?}: parent {parent:?} never resolved");
            diagnostics.push(Diagnostic::Unresolved { name, parent, passes });
        }
    }

    debug!("Resolved {} layout objects in {passes} passes", slots.len());

    let windows = assemble(slots, roots);
    Resolution { windows, diagnostics, passes }
}

/// Move the placed slots into [`HierarchyNode`] trees.
///
/// A child is always placed after its parent, so walking the slots from the
/// back builds every subtree before the node that owns it.
fn assemble(slots: Vec<Slot>, roots: Vec<usize>) -> Vec<HierarchyNode> {
    let mut built: Vec<Option<HierarchyNode>> = Vec::with_capacity(slots.len());
    built.resize_with(slots.len(), || None);

    for (idx, slot) in slots.into_iter().enumerate().rev() {
        let mut children: Vec<HierarchyNode> =
            slot.children.iter().filter_map(|&child| built[child].take()).collect();
        // Stable: unordered children keep placement order, after the ordered ones.
        children.sort_by_key(|child| (child.attributes.order.is_none(), child.attributes.order));

        built[idx] = Some(HierarchyNode {
            name: slot.name,
            kind: slot.kind,
            attributes: slot.attributes,
            children,
        });
    }

    roots.into_iter().filter_map(|root| built[root].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(kind: &str, parent: Option<&str>) -> LayoutObject {
        LayoutObject::new(kind, parent)
    }

    fn layout(objects: &[(&str, LayoutObject)]) -> FlatLayout {
        objects.iter().map(|(name, object)| (name.to_string(), object.clone())).collect()
    }

    #[test]
    fn window_with_terminal() {
        let window = object("window", None).with(|a| a.size = Some((80, 24)));
        let resolution =
            resolve(layout(&[("A", window), ("B", object("terminal", Some("A")))]));

        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.windows.len(), 1);
        let root = &resolution.windows[0];
        assert_eq!(root.name, "A");
        assert_eq!(root.attributes.size, Some((80, 24)));
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "B");
        assert_eq!(root.children[0].kind, ObjectKind::Terminal);
    }

    #[test]
    fn child_listed_before_parent() {
        // "A" sorts first, so the child is scanned before its parent exists.
        let resolution =
            resolve(layout(&[("A", object("terminal", Some("B"))), ("B", object("window", None))]));

        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.node_count(), 2);
        assert_eq!(resolution.windows[0].name, "B");
        assert_eq!(resolution.windows[0].children[0].name, "A");
    }

    #[test]
    fn deep_chain_in_reverse_order() {
        let resolution = resolve(layout(&[
            ("a", object("terminal", Some("b"))),
            ("b", object("hpaned", Some("c"))),
            ("c", object("notebook", Some("d"))),
            ("d", object("window", None)),
        ]));

        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.node_count(), 4);
        assert!(resolution.find("a").is_some());
        assert_eq!(resolution.find("b").unwrap().children[0].name, "a");
    }

    #[test]
    fn self_parent_is_dropped() {
        let resolution = resolve(layout(&[("A", object("terminal", Some("A")))]));

        assert!(resolution.windows.is_empty());
        assert_eq!(
            resolution.diagnostics,
            vec![Diagnostic::Unresolved { name: "A".into(), parent: "A".into(), passes: 1 }]
        );
    }

    #[test]
    fn cycle_does_not_affect_valid_nodes() {
        let resolution = resolve(layout(&[
            ("w", object("window", None)),
            ("t", object("terminal", Some("w"))),
            ("x", object("hpaned", Some("y"))),
            ("y", object("hpaned", Some("x"))),
        ]));

        assert_eq!(resolution.node_count(), 2);
        let mut dropped: Vec<_> = resolution.diagnostics.iter().map(Diagnostic::name).collect();
        dropped.sort_unstable();
        assert_eq!(dropped, vec!["x", "y"]);
    }

    #[test]
    fn missing_parent_is_dropped_immediately() {
        let resolution = resolve(layout(&[
            ("w", object("window", None)),
            ("orphan", object("terminal", None)),
        ]));

        assert_eq!(resolution.node_count(), 1);
        assert_eq!(resolution.diagnostics, vec![Diagnostic::MissingParent { name: "orphan".into() }]);
    }

    #[test]
    fn window_attributes_drop_empty_strings() {
        let window = object("Window", None).with(|a| {
            a.title = Some(String::new());
            a.extra.insert("note".into(), String::new());
        });
        let resolution = resolve(layout(&[("w", window)]));
        let root = &resolution.windows[0];
        assert_eq!(root.attributes.title, None);
        assert!(root.attributes.extra.is_empty());
    }

    #[test]
    fn children_follow_order_attribute() {
        let tab = |order| object("terminal", Some("nb")).with(|a| a.order = Some(order));
        let resolution = resolve(layout(&[
            ("w", object("window", None)),
            ("nb", object("notebook", Some("w"))),
            ("t_a", tab(2)),
            ("t_b", tab(0)),
            ("t_c", object("terminal", Some("nb"))),
            ("t_d", tab(1)),
        ]));

        let names: Vec<_> =
            resolution.find("nb").unwrap().children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["t_b", "t_d", "t_a", "t_c"]);
    }

    #[test]
    fn empty_layout_resolves_to_nothing() {
        let resolution = resolve(FlatLayout::new());
        assert!(resolution.windows.is_empty());
        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.passes, 0);
    }

    /// A single chain `n0 (window) <- n1 <- ... <- n{levels}`, named so that
    /// either parents or children sort first.
    fn chain(levels: usize, parents_first: bool) -> FlatLayout {
        let name = |level: usize| {
            let key = if parents_first { level } else { levels - level };
            format!("n{key:05}")
        };
        (0..=levels)
            .map(|level| {
                let object = match level {
                    0 => object("window", None),
                    _ => object("vpaned", Some(&name(level - 1))),
                };
                (name(level), object)
            })
            .collect()
    }

    /// Follow first children from `node` and return the depth reached.
    fn depth_of(node: &HierarchyNode) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(child) = current.children.first() {
            depth += 1;
            current = child;
        }
        depth
    }

    #[test]
    fn very_deep_chain_is_cut_at_max_depth() {
        let levels = 5000;
        let resolution = resolve(chain(levels, true));

        assert_eq!(resolution.passes, 1);
        assert_eq!(resolution.windows.len(), 1);
        assert_eq!(resolution.node_count(), MAX_DEPTH + 1);
        assert_eq!(depth_of(&resolution.windows[0]), MAX_DEPTH);
        assert_eq!(resolution.diagnostics.len(), levels - MAX_DEPTH);
        assert!(
            resolution.diagnostics.iter().all(|d| matches!(d, Diagnostic::TooDeep { depth, .. } if *depth > MAX_DEPTH))
        );
    }

    #[test]
    fn pass_cap_stops_long_reverse_chain() {
        let levels = MAX_PASSES + 5;
        let resolution = resolve(chain(levels, false));

        assert_eq!(resolution.passes, MAX_PASSES);
        assert_eq!(resolution.node_count(), MAX_DEPTH + 1);
        assert_eq!(depth_of(&resolution.windows[0]), MAX_DEPTH);

        let unresolved: Vec<&Diagnostic> = resolution
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Unresolved { passes, .. } if *passes == MAX_PASSES))
            .collect();
        assert_eq!(unresolved.len(), 5);
        let too_deep =
            resolution.diagnostics.iter().filter(|d| matches!(d, Diagnostic::TooDeep { .. })).count();
        assert_eq!(too_deep, MAX_PASSES - MAX_DEPTH);

        // Placed objects keep their declared parents.
        let mut node = &resolution.windows[0];
        for level in 1..=MAX_DEPTH {
            node = &node.children[0];
            assert_eq!(node.name, format!("n{:05}", levels - level));
        }
    }
}
