//! Container/pane tree beneath a window.
//!
//! Panes themselves live in the registry; the tree only references them by
//! [`PaneId`]. Building from a resolved hierarchy and describing back into a
//! flat layout are inverse operations up to object names.

use std::collections::BTreeMap;

use log::warn;

use crate::layout::{FlatLayout, LayoutAttributes, LayoutObject, ObjectKind};
use crate::pane::PaneId;
use crate::resolver::HierarchyNode;

/// Kind of a container node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Tabbed container; each child is a page.
    Notebook,
    /// Side-by-side split.
    HPaned,
    /// Stacked split.
    VPaned,
}

impl ContainerKind {
    fn from_kind(kind: &ObjectKind) -> Option<Self> {
        match kind {
            ObjectKind::Notebook => Some(ContainerKind::Notebook),
            ObjectKind::HPaned => Some(ContainerKind::HPaned),
            ObjectKind::VPaned => Some(ContainerKind::VPaned),
            _ => None,
        }
    }

    fn object_kind(self) -> ObjectKind {
        match self {
            ContainerKind::Notebook => ObjectKind::Notebook,
            ContainerKind::HPaned => ObjectKind::HPaned,
            ContainerKind::VPaned => ObjectKind::VPaned,
        }
    }
}

/// A tabbed or split container.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    /// Container kind.
    pub kind: ContainerKind,
    /// Child nodes, in display order.
    pub children: Vec<Node>,
    /// Split ratio for paned containers.
    pub ratio: Option<f32>,
    /// Tab labels, by page.
    pub labels: BTreeMap<usize, String>,
    /// Selected page of a notebook.
    pub active_page: usize,
    /// Most recently focused pane, by child position.
    pub last_active: BTreeMap<usize, PaneId>,
}

impl Container {
    /// Create an empty container.
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            ratio: None,
            labels: BTreeMap::new(),
            active_page: 0,
            last_active: BTreeMap::new(),
        }
    }

    /// First pane among the direct children of page `page`.
    ///
    /// A page that is itself a pane resolves to that pane.
    pub fn first_pane_on_page(&self, page: usize) -> Option<PaneId> {
        match self.children.get(page)? {
            Node::Pane(id) => Some(*id),
            Node::Container(container) => container.children.iter().find_map(|child| match child {
                Node::Pane(id) => Some(*id),
                Node::Container(_) => None,
            }),
        }
    }
}

/// A node of a window's tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A terminal pane.
    Pane(PaneId),
    /// A nested container.
    Container(Container),
}

impl Node {
    /// Collect all pane ids in depth-first order.
    pub fn pane_ids(&self) -> Vec<PaneId> {
        let mut ids = Vec::new();
        self.collect_pane_ids(&mut ids);
        ids
    }

    fn collect_pane_ids(&self, out: &mut Vec<PaneId>) {
        match self {
            Node::Pane(id) => out.push(*id),
            Node::Container(container) => {
                for child in &container.children {
                    child.collect_pane_ids(out);
                }
            },
        }
    }

    /// Whether the tree references `id`.
    pub fn contains(&self, id: PaneId) -> bool {
        match self {
            Node::Pane(pane) => *pane == id,
            Node::Container(container) => container.children.iter().any(|child| child.contains(id)),
        }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        match self {
            Node::Pane(_) => 1,
            Node::Container(container) => {
                1 + container.children.iter().map(Node::len).sum::<usize>()
            },
        }
    }

    /// Always `false`; a node counts itself.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Remove pane `id`, collapsing containers left with a single child.
    ///
    /// Returns `None` if the tree is now empty.
    pub fn remove_pane(self, id: PaneId) -> Option<Node> {
        match self {
            Node::Pane(pane) if pane == id => None,
            Node::Pane(_) => Some(self),
            Node::Container(mut container) => {
                let mut kept = Vec::with_capacity(container.children.len());
                let mut last_active = BTreeMap::new();
                let mut labels = BTreeMap::new();
                for (position, child) in container.children.into_iter().enumerate() {
                    let Some(child) = child.remove_pane(id) else { continue };
                    if let Some(pane) = container.last_active.get(&position).filter(|p| **p != id) {
                        last_active.insert(kept.len(), *pane);
                    }
                    if let Some(label) = container.labels.remove(&position) {
                        labels.insert(kept.len(), label);
                    }
                    kept.push(child);
                }

                match kept.len() {
                    0 => None,
                    1 if container.kind != ContainerKind::Notebook => kept.pop(),
                    len => {
                        container.children = kept;
                        container.last_active = last_active;
                        container.labels = labels;
                        container.active_page = container.active_page.min(len - 1);
                        Some(Node::Container(container))
                    },
                }
            },
        }
    }
}

/// Build the tree for a resolved node.
///
/// `make_pane` registers a pane for each `Terminal` node and returns its id.
/// Unknown node types are skipped with a warning.
pub fn build(
    node: &HierarchyNode,
    make_pane: &mut dyn FnMut(&LayoutAttributes) -> PaneId,
) -> Option<Node> {
    if node.kind == ObjectKind::Terminal {
        if !node.children.is_empty() {
            warn!("Ignoring {} children of terminal {:?}", node.children.len(), node.name);
        }
        return Some(Node::Pane(make_pane(&node.attributes)));
    }

    let Some(kind) = ContainerKind::from_kind(&node.kind) else {
        warn!("Skipping layout object {:?} of unsupported type {}", node.name, node.kind);
        return None;
    };

    let mut container = Container::new(kind);
    container.ratio = node.attributes.ratio;
    container.active_page = node.attributes.active_page.unwrap_or(0);

    let attributes = &node.attributes;
    for (index, child) in node.children.iter().enumerate() {
        let Some(child_node) = build(child, make_pane) else { continue };
        let position = container.children.len();
        if let Some(pane) = attributes.last_active_term.get(index).and_then(|s| PaneId::parse(s)) {
            container.last_active.insert(position, pane);
        }
        if let Some(label) = attributes.labels.get(index).filter(|label| !label.is_empty()) {
            container.labels.insert(position, label.clone());
        }
        container.children.push(child_node);
    }

    if container.children.is_empty() {
        warn!("Skipping empty container {:?}", node.name);
        return None;
    }
    if kind != ContainerKind::Notebook && container.children.len() != 2 {
        warn!("Split {:?} has {} children, expected 2", node.name, container.children.len());
    }
    container.active_page = container.active_page.min(container.children.len() - 1);

    Some(Node::Container(container))
}

/// Serialize `node` into `out` beneath `parent`, depth-first.
///
/// `counter` seeds fresh object names; the advanced counter is returned.
/// `pane_attributes` supplies the attributes stored for each pane.
pub fn describe(
    node: &Node,
    mut counter: usize,
    parent: &str,
    order: usize,
    out: &mut FlatLayout,
    depth: usize,
    pane_attributes: &dyn Fn(PaneId) -> LayoutAttributes,
) -> usize {
    match node {
        Node::Pane(id) => {
            let name = format!("terminal{counter}");
            counter += 1;
            let mut object = LayoutObject::new(ObjectKind::Terminal, Some(parent));
            object.attributes = pane_attributes(*id);
            object.attributes.order = Some(order as u32);
            out.insert(name, object);
        },
        Node::Container(container) => {
            let name = format!("child{counter}");
            counter += 1;
            let object =
                LayoutObject::new(container.kind.object_kind(), Some(parent)).with(|attributes| {
                    attributes.order = Some(order as u32);
                    attributes.ratio = container.ratio;
                    if container.kind == ContainerKind::Notebook {
                        attributes.active_page = Some(container.active_page);
                        attributes.labels = (0..container.children.len())
                            .map(|page| container.labels.get(&page).cloned().unwrap_or_default())
                            .collect();
                        attributes.last_active_term = (0..container.children.len())
                            .map(|page| {
                                container.last_active.get(&page).map(PaneId::urn).unwrap_or_default()
                            })
                            .collect();
                        attributes.strip_empty();
                    }
                });
            out.insert(name.clone(), object);

            for (position, child) in container.children.iter().enumerate() {
                counter =
                    describe(child, counter, &name, position, out, depth + 1, pane_attributes);
            }
        },
    }
    counter
}
