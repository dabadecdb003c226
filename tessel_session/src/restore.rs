//! Post-construction session restore.
//!
//! Runs once every window of a layout exists: spawns the deferred pane
//! processes and puts focus back where the session left it.

use std::collections::{BTreeMap, HashMap};

use log::{debug, error};
use serde::Serialize;

use crate::pane::PaneId;
use crate::registry::Registry;
use crate::surface::{PaneSurface, Toolkit, WindowSurface};
use crate::tree::{ContainerKind, Node};
use crate::window::WindowId;

/// Last-active pane per window, captured before anything is spawned.
#[derive(Debug, Clone, PartialEq)]
enum FocusSnapshot {
    /// Per-page entries of a notebook root.
    Pages(BTreeMap<usize, PaneId>),
    /// Single entry of any other root.
    Single(Option<PaneId>),
}

/// Outcome of [`Registry::layout_done`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    /// Panes whose process was spawned.
    pub spawned: Vec<PaneId>,
    /// Panes whose process failed to spawn.
    pub spawn_failures: Vec<PaneId>,
    /// Panes made visible and focused, in order.
    pub focused: Vec<PaneId>,
    /// Notebook pages without any pane to focus.
    pub skipped_pages: Vec<(WindowId, usize)>,
    /// Windows revealed as the last active window.
    pub presented: Vec<WindowId>,
}

impl<T: Toolkit> Registry<T> {
    /// Finish restoring a session after [`Registry::create_layout`].
    ///
    /// The layout-in-progress flag is left untouched; call
    /// [`Registry::finish_layout`] afterwards.
    pub fn layout_done(&mut self) -> RestoreReport {
        let mut report = RestoreReport::default();

        // Spawning may move focus, so capture the mapping first.
        let snapshot: HashMap<WindowId, FocusSnapshot> =
            self.windows.iter().map(|window| (window.id, Self::focus_snapshot(window))).collect();

        let unspawned: Vec<PaneId> =
            self.panes.iter().filter(|pane| !pane.has_process()).map(|pane| pane.id).collect();
        for id in unspawned {
            if self.spawn_pane(id) {
                report.spawned.push(id);
            } else {
                report.spawn_failures.push(id);
            }
        }

        let window_ids: Vec<WindowId> = self.windows.iter().map(|window| window.id).collect();
        for window_id in window_ids {
            match snapshot.get(&window_id) {
                Some(FocusSnapshot::Pages(pages)) => {
                    self.restore_notebook_focus(window_id, pages, &mut report)
                },
                Some(FocusSnapshot::Single(Some(pane))) => {
                    if self.focus_pane(*pane) {
                        report.focused.push(*pane);
                    }
                },
                Some(FocusSnapshot::Single(None)) | None => {},
            }
        }

        if let Some(last_active) = self.last_active_window {
            for window in self.windows.iter_mut().filter(|window| window.id == last_active) {
                window.surface.present();
                report.presented.push(window.id);
            }
        }

        debug!(
            "Restored session: {} spawned, {} focused, {} pages skipped",
            report.spawned.len(),
            report.focused.len(),
            report.skipped_pages.len()
        );
        report
    }

    fn focus_snapshot(window: &crate::window::Window<T::Window>) -> FocusSnapshot {
        match &window.root {
            Some(Node::Container(notebook)) if notebook.kind == ContainerKind::Notebook => {
                FocusSnapshot::Pages(notebook.last_active.clone())
            },
            _ => FocusSnapshot::Single(window.last_active_pane),
        }
    }

    fn restore_notebook_focus(
        &mut self,
        window_id: WindowId,
        pages: &BTreeMap<usize, PaneId>,
        report: &mut RestoreReport,
    ) {
        let page_count = match self.window(window_id).and_then(|window| window.root.as_ref()) {
            Some(Node::Container(notebook)) => notebook.children.len(),
            _ => return,
        };

        for page in 0..page_count {
            let resolved = pages.get(&page).copied().or_else(|| {
                match self.window(window_id).and_then(|window| window.root.as_ref()) {
                    Some(Node::Container(notebook)) => notebook.first_pane_on_page(page),
                    _ => None,
                }
            });
            let Some(pane) = resolved else {
                error!("Window {window_id}: no pane to focus on page {page}");
                report.skipped_pages.push((window_id, page));
                continue;
            };

            if let Some(Node::Container(notebook)) =
                self.window_mut(window_id).and_then(|window| window.root.as_mut())
            {
                notebook.last_active.insert(page, pane);
            }
            if self.focus_pane(pane) {
                report.focused.push(pane);
            }
        }
    }

    /// Make `pane` visible and focused, if it is registered.
    fn focus_pane(&mut self, pane: PaneId) -> bool {
        match self.pane_mut(pane) {
            Some(target) => {
                target.surface.make_visible_and_focused();
                true
            },
            None => {
                debug!("Last active pane {pane} is not registered");
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::headless::{HeadlessToolkit, SurfaceEvent};
    use crate::tree::Container;
    use crate::window::Window;

    fn registry() -> Registry<HeadlessToolkit> {
        Registry::new(HeadlessToolkit::new(), SessionConfig::default())
    }

    #[test]
    fn spawns_every_unspawned_pane() {
        let mut reg = registry();
        reg.doing_layout = true;
        reg.new_window(None, None);
        reg.new_window(None, None);
        assert_eq!(reg.toolkit().spawn_count(), 0);

        let report = reg.layout_done();
        assert_eq!(report.spawned.len(), 2);
        assert!(reg.panes().iter().all(|pane| pane.has_process()));
        assert!(reg.is_doing_layout());

        let again = reg.layout_done();
        assert!(again.spawned.is_empty());
    }

    #[test]
    fn single_root_focuses_last_active() {
        let mut reg = registry();
        let (_, pane) = reg.new_window(None, None);
        let report = reg.layout_done();
        assert_eq!(report.focused, vec![pane]);
        assert_eq!(reg.toolkit().focused(), Some(pane));
    }

    #[test]
    fn notebook_pages_use_snapshot_then_first_pane() {
        let mut reg = registry();
        let window_id = WindowId::generate();
        let surface = reg.toolkit.create_window(window_id);
        reg.register_window(Window::new(window_id, surface));

        let a = reg.create_pane(window_id);
        let b = reg.create_pane(window_id);
        let c = reg.create_pane(window_id);
        let mut split = Container::new(ContainerKind::HPaned);
        split.children = vec![Node::Pane(b), Node::Pane(c)];
        let mut notebook = Container::new(ContainerKind::Notebook);
        notebook.children = vec![
            Node::Pane(a),
            Node::Container(split),
            Node::Container(Container::new(ContainerKind::VPaned)),
        ];
        notebook.last_active.insert(1, c);
        reg.window_mut(window_id).unwrap().root = Some(Node::Container(notebook));

        let report = reg.layout_done();
        assert_eq!(report.focused, vec![a, c]);
        assert_eq!(report.skipped_pages, vec![(window_id, 2)]);

        let Some(Node::Container(notebook)) = &reg.window(window_id).unwrap().root else {
            panic!("notebook root expected");
        };
        assert_eq!(notebook.last_active.get(&0), Some(&a));
        assert_eq!(notebook.last_active.get(&1), Some(&c));
    }

    #[test]
    fn presents_last_active_window_only() {
        let mut reg = registry();
        reg.new_window(None, None);
        let (b, _) = reg.new_window(None, None);
        reg.set_last_active_window(Some(b));

        let report = reg.layout_done();
        assert_eq!(report.presented, vec![b]);
        let presented: Vec<WindowId> = reg
            .toolkit()
            .events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::WindowPresented { window } => Some(window),
                _ => None,
            })
            .collect();
        assert_eq!(presented, vec![b]);
    }

    #[test]
    fn unknown_last_active_pane_is_ignored() {
        let mut reg = registry();
        let (window, _) = reg.new_window(None, None);
        reg.window_mut(window).unwrap().last_active_pane = Some(PaneId::generate());
        let report = reg.layout_done();
        assert!(report.focused.is_empty());
    }
}
