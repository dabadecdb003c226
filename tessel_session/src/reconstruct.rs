//! Building live windows from a layout.

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::error::{SessionError, SessionResult};
use crate::layout::LayoutAttributes;
use crate::registry::Registry;
use crate::resolver::{self, Diagnostic, HierarchyNode};
use crate::surface::{Toolkit, WindowSurface};
use crate::tree::{self, Node};
use crate::window::{Window, WindowId};

/// Outcome of [`Registry::create_layout`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutReport {
    /// Windows created, in creation order.
    pub windows: Vec<WindowId>,
    /// Objects dropped while resolving the layout.
    pub diagnostics: Vec<Diagnostic>,
    /// Whether the layout was missing and a default window was opened.
    pub missing_layout: bool,
}

impl<T: Toolkit> Registry<T> {
    /// Create every window described by the layout called `name`.
    ///
    /// The initial layout, if one was set, takes precedence over the
    /// configured one. A missing layout opens a single default window.
    /// Leaves the registry in layout mode; call [`Registry::layout_done`]
    /// once the caller has finished its own setup.
    pub fn create_layout(&mut self, name: &str) -> SessionResult<LayoutReport> {
        self.doing_layout = true;

        let layout = self
            .initial_layout
            .clone()
            .filter(|layout| !layout.is_empty())
            .or_else(|| self.config.layout_definition(name))
            .filter(|layout| !layout.is_empty());
        let Some(layout) = layout else {
            warn!("Layout {name:?} not defined, opening a default window");
            let (window, _) = self.new_window(None, None);
            return Ok(LayoutReport { windows: vec![window], missing_layout: true, ..Default::default() });
        };

        let resolution = resolver::resolve(layout);
        let mut report = LayoutReport { diagnostics: resolution.diagnostics, ..Default::default() };

        for root in &resolution.windows {
            if !root.kind.is_window() {
                error!("Invalid layout: root {:?} is a {}", root.name, root.kind);
                return Err(SessionError::InvalidLayout(format!(
                    "root object {:?} has type {}, expected Window",
                    root.name, root.kind
                )));
            }
            debug!("Creating window {:?}", root.name);
            report.windows.push(self.materialize_window(root)?);
        }

        info!(
            "Created {} windows from layout {name:?} ({} objects dropped)",
            report.windows.len(),
            report.diagnostics.len()
        );
        self.layout_name = Some(name.to_owned());
        Ok(report)
    }

    /// Create, configure and populate one window.
    fn materialize_window(&mut self, root: &HierarchyNode) -> SessionResult<WindowId> {
        let id = WindowId::generate();
        let mut window = Window::new(id, self.toolkit.create_window(id));
        window.surface.show();
        window.apply_attributes(&root.attributes);
        self.register_window(window);

        if root.attributes.last_active_window == Some(true) {
            self.last_active_window = Some(id);
        }

        self.build_subtree(id, root)?;
        Ok(id)
    }

    /// Build the panes and containers beneath window `id`.
    ///
    /// A window can hold one root child; extra children are ignored and a
    /// window without children gets a single default pane.
    pub fn build_subtree(&mut self, id: WindowId, node: &HierarchyNode) -> SessionResult<()> {
        if self.window(id).is_none() {
            return Err(SessionError::WindowNotFound(id));
        }
        if node.children.len() > 1 {
            warn!(
                "Window {:?} has {} children; only the first is built",
                node.name,
                node.children.len()
            );
        }

        let mut make_pane = |attributes: &LayoutAttributes| self.create_pane_from_layout(id, attributes);
        let root = match node.children.first() {
            Some(child) => tree::build(child, &mut make_pane),
            None => None,
        };
        let root = root.unwrap_or_else(|| Node::Pane(make_pane(&LayoutAttributes::default())));

        let window = self.window_mut(id).ok_or(SessionError::WindowNotFound(id))?;
        window.root = Some(root);
        Ok(())
    }
}
