//! Top-level windows.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::{FlatLayout, LayoutAttributes, LayoutObject, ObjectKind};
use crate::pane::PaneId;
use crate::surface::WindowSurface;
use crate::tree::{self, ContainerKind, Node};

/// Unique identifier for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub Uuid);

impl WindowId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.urn())
    }
}

/// A registered top-level window owning one tree of containers and panes.
#[derive(Debug)]
pub struct Window<W> {
    /// Unique window identifier.
    pub id: WindowId,
    /// Root of the window's tree; a single pane or a container.
    pub root: Option<Node>,
    /// Screen position.
    pub position: Option<(i32, i32)>,
    /// Window size.
    pub size: Option<(i32, i32)>,
    /// Title override.
    pub title: Option<String>,
    /// Whether the window is maximised.
    pub maximised: bool,
    /// Whether the window is fullscreen.
    pub fullscreen: bool,
    /// Most recently focused pane when the root isn't a notebook.
    pub last_active_pane: Option<PaneId>,
    /// Surface drawing this window.
    pub surface: W,
}

impl<W: WindowSurface> Window<W> {
    /// Create an empty window.
    pub fn new(id: WindowId, surface: W) -> Self {
        Self {
            id,
            root: None,
            position: None,
            size: None,
            title: None,
            maximised: false,
            fullscreen: false,
            last_active_pane: None,
            surface,
        }
    }

    /// Move the window.
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.position = Some((x, y));
        self.surface.move_to(x, y);
    }

    /// Resize the window. Degenerate sizes (either side ≤ 1) are ignored.
    pub fn resize(&mut self, width: i32, height: i32) -> bool {
        if width <= 1 || height <= 1 {
            debug!("Ignoring degenerate size {width}x{height} for window {}", self.id);
            return false;
        }
        self.size = Some((width, height));
        self.surface.resize(width, height);
        true
    }

    /// Force the window title.
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_owned());
        self.surface.set_title(title);
    }

    /// Maximise or restore the window.
    pub fn set_maximised(&mut self, maximised: bool) {
        self.maximised = maximised;
        self.surface.set_maximized(maximised);
    }

    /// Enter or leave fullscreen.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
        self.surface.set_fullscreen(fullscreen);
    }

    /// Apply the window-level attributes of a layout object.
    pub fn apply_attributes(&mut self, attributes: &LayoutAttributes) {
        if let Some((x, y)) = attributes.parsed_position() {
            self.move_to(x, y);
        }
        if let Some((width, height)) = attributes.size {
            self.resize(width, height);
        }
        if let Some(title) = &attributes.title {
            self.set_title(title);
        }
        if let Some(maximised) = attributes.maximised {
            self.set_maximised(maximised);
        }
        if let Some(fullscreen) = attributes.fullscreen {
            self.set_fullscreen(fullscreen);
        }
        if let Some(pane) = attributes.last_active_term.first().and_then(|urn| PaneId::parse(urn)) {
            self.last_active_pane = Some(pane);
        }
    }
}

impl<W> Window<W> {
    /// Whether the window's root is a notebook.
    pub fn is_child_notebook(&self) -> bool {
        matches!(&self.root, Some(Node::Container(c)) if c.kind == ContainerKind::Notebook)
    }

    /// Panes of this window in depth-first order.
    pub fn pane_ids(&self) -> Vec<PaneId> {
        self.root.as_ref().map(Node::pane_ids).unwrap_or_default()
    }

    /// Whether the window's tree references `pane`.
    pub fn contains_pane(&self, pane: PaneId) -> bool {
        self.root.as_ref().is_some_and(|root| root.contains(pane))
    }

    /// Drop `pane` from the tree. Returns `true` if the tree is now empty.
    pub fn remove_pane(&mut self, pane: PaneId) -> bool {
        self.root = self.root.take().and_then(|root| root.remove_pane(pane));
        if self.last_active_pane == Some(pane) {
            self.last_active_pane = None;
        }
        self.root.is_none()
    }

    /// Serialize this window and its tree into `out`, depth-first.
    ///
    /// `counter` seeds fresh object names and the advanced counter is
    /// returned, so several windows can share one flat layout.
    pub fn describe_layout(
        &self,
        mut counter: usize,
        parent: Option<&str>,
        out: &mut FlatLayout,
        depth: usize,
        last_active: bool,
        pane_attributes: &dyn Fn(PaneId) -> LayoutAttributes,
    ) -> usize {
        let name = format!("window{counter}");
        counter += 1;

        let object = LayoutObject::new(ObjectKind::Window, parent).with(|attributes| {
            attributes.position = self.position.map(|(x, y)| format!("{x}:{y}"));
            attributes.size = self.size;
            attributes.title = self.title.clone();
            attributes.maximised = Some(self.maximised);
            attributes.fullscreen = Some(self.fullscreen);
            attributes.last_active_term = self.last_active_pane.iter().map(PaneId::urn).collect();
            attributes.last_active_window = last_active.then_some(true);
        });
        out.insert(name.clone(), object);

        if let Some(root) = &self.root {
            counter = tree::describe(root, counter, &name, 0, out, depth + 1, pane_attributes);
        }
        counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessToolkit, SurfaceEvent};
    use crate::surface::Toolkit;

    fn window(toolkit: &mut HeadlessToolkit) -> Window<crate::headless::HeadlessWindow> {
        let id = WindowId::generate();
        Window::new(id, toolkit.create_window(id))
    }

    #[test]
    fn degenerate_resize_is_ignored() {
        let mut toolkit = HeadlessToolkit::new();
        let mut w = window(&mut toolkit);
        assert!(!w.resize(1, 600));
        assert!(!w.resize(800, 0));
        assert_eq!(w.size, None);
        assert!(w.resize(2, 2));
        assert_eq!(w.size, Some((2, 2)));
        assert_eq!(toolkit.count(|e| matches!(e, SurfaceEvent::WindowResized { .. })), 1);
    }

    #[test]
    fn apply_attributes_drives_surface() {
        let mut toolkit = HeadlessToolkit::new();
        let mut w = window(&mut toolkit);
        let attributes = LayoutAttributes {
            position: Some("5:7".into()),
            size: Some((640, 480)),
            title: Some("logs".into()),
            maximised: Some(false),
            fullscreen: Some(true),
            ..Default::default()
        };
        w.apply_attributes(&attributes);

        assert_eq!(w.position, Some((5, 7)));
        assert_eq!(w.size, Some((640, 480)));
        assert_eq!(w.title.as_deref(), Some("logs"));
        assert!(!w.maximised);
        assert!(w.fullscreen);
        assert!(toolkit.events().contains(&SurfaceEvent::WindowMoved { window: w.id, x: 5, y: 7 }));
    }

    #[test]
    fn describe_empty_window() {
        let mut toolkit = HeadlessToolkit::new();
        let mut w = window(&mut toolkit);
        w.resize(100, 50);

        let mut out = FlatLayout::new();
        let counter = w.describe_layout(3, None, &mut out, 0, true, &|_| LayoutAttributes::default());
        assert_eq!(counter, 4);
        let object = &out["window3"];
        assert!(object.kind.is_window());
        assert_eq!(object.attributes.size, Some((100, 50)));
        assert_eq!(object.attributes.last_active_window, Some(true));
    }

    #[test]
    fn remove_last_pane_empties_window() {
        let mut toolkit = HeadlessToolkit::new();
        let mut w = window(&mut toolkit);
        let pane = PaneId::generate();
        w.root = Some(Node::Pane(pane));
        w.last_active_pane = Some(pane);

        assert!(w.contains_pane(pane));
        assert!(w.remove_pane(pane));
        assert_eq!(w.last_active_pane, None);
        assert!(w.pane_ids().is_empty());
    }
}
