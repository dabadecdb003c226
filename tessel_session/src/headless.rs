//! Headless collaborator backend.
//!
//! Surfaces created here draw nothing; every call is appended to a shared
//! event log instead. The CLI uses it to dry-run layouts and the tests use
//! it to observe side-effect ordering.

use std::cell::{Cell, RefCell};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;

use crate::pane::PaneId;
use crate::surface::{EventKind, KeyEvent, PaneSurface, Toolkit, WindowSurface};
use crate::window::WindowId;

/// First pid handed out by headless spawns.
const FIRST_PID: u32 = 1000;

/// A recorded surface call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    WindowCreated { window: WindowId },
    WindowShown { window: WindowId },
    WindowMoved { window: WindowId, x: i32, y: i32 },
    WindowResized { window: WindowId, width: i32, height: i32 },
    WindowTitled { window: WindowId, title: String },
    WindowMaximized { window: WindowId, maximized: bool },
    WindowFullscreen { window: WindowId, fullscreen: bool },
    WindowPresented { window: WindowId },
    WindowDestroyed { window: WindowId },
    PaneCreated { pane: PaneId },
    PaneSpawned { pane: PaneId, pid: u32, cwd: Option<PathBuf>, command: Option<String> },
    PaneInput { pane: PaneId, kind: EventKind, keyval: u32, synthesized: bool },
    PaneFed { pane: PaneId, text: String },
    PaneFocused { pane: PaneId },
    PaneReconfigured { pane: PaneId },
    PaneDestroyed { pane: PaneId },
    Quit,
}

/// Shared, append-only log of surface calls.
pub type EventLog = Rc<RefCell<Vec<SurfaceEvent>>>;

/// Toolkit whose surfaces only record what they are asked to do.
#[derive(Debug, Clone)]
pub struct HeadlessToolkit {
    log: EventLog,
    focus: Rc<Cell<Option<PaneId>>>,
    next_pid: Rc<Cell<u32>>,
}

impl Default for HeadlessToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessToolkit {
    /// Create a toolkit with an empty log.
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            focus: Rc::new(Cell::new(None)),
            next_pid: Rc::new(Cell::new(FIRST_PID)),
        }
    }

    /// Snapshot of every event recorded so far.
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.log.borrow().clone()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&SurfaceEvent) -> bool) -> usize {
        self.log.borrow().iter().filter(|event| pred(event)).count()
    }

    /// Number of times the application was asked to quit.
    pub fn quit_count(&self) -> usize {
        self.count(|event| matches!(event, SurfaceEvent::Quit))
    }

    /// Number of processes spawned.
    pub fn spawn_count(&self) -> usize {
        self.count(|event| matches!(event, SurfaceEvent::PaneSpawned { .. }))
    }

    /// Pane currently holding focus.
    pub fn focused(&self) -> Option<PaneId> {
        self.focus.get()
    }

    /// Forget every recorded event.
    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn record(&self, event: SurfaceEvent) {
        self.log.borrow_mut().push(event);
    }
}

impl Toolkit for HeadlessToolkit {
    type Pane = HeadlessPane;
    type Window = HeadlessWindow;

    fn create_window(&mut self, id: WindowId) -> HeadlessWindow {
        self.record(SurfaceEvent::WindowCreated { window: id });
        HeadlessWindow { id, log: self.log.clone() }
    }

    fn create_pane(&mut self, id: PaneId) -> HeadlessPane {
        self.record(SurfaceEvent::PaneCreated { pane: id });
        HeadlessPane {
            id,
            log: self.log.clone(),
            focus: self.focus.clone(),
            next_pid: self.next_pid.clone(),
        }
    }

    fn quit(&mut self) {
        self.record(SurfaceEvent::Quit);
    }
}

/// Window surface recording into the shared log.
#[derive(Debug)]
pub struct HeadlessWindow {
    id: WindowId,
    log: EventLog,
}

impl HeadlessWindow {
    fn record(&self, event: SurfaceEvent) {
        self.log.borrow_mut().push(event);
    }
}

impl WindowSurface for HeadlessWindow {
    fn show(&mut self) {
        self.record(SurfaceEvent::WindowShown { window: self.id });
    }

    fn move_to(&mut self, x: i32, y: i32) {
        self.record(SurfaceEvent::WindowMoved { window: self.id, x, y });
    }

    fn resize(&mut self, width: i32, height: i32) {
        self.record(SurfaceEvent::WindowResized { window: self.id, width, height });
    }

    fn set_title(&mut self, title: &str) {
        self.record(SurfaceEvent::WindowTitled { window: self.id, title: title.into() });
    }

    fn set_maximized(&mut self, maximized: bool) {
        self.record(SurfaceEvent::WindowMaximized { window: self.id, maximized });
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.record(SurfaceEvent::WindowFullscreen { window: self.id, fullscreen });
    }

    fn present(&mut self) {
        self.record(SurfaceEvent::WindowPresented { window: self.id });
    }

    fn destroy(&mut self) {
        self.record(SurfaceEvent::WindowDestroyed { window: self.id });
    }
}

/// Pane surface recording into the shared log.
#[derive(Debug)]
pub struct HeadlessPane {
    id: PaneId,
    log: EventLog,
    focus: Rc<Cell<Option<PaneId>>>,
    next_pid: Rc<Cell<u32>>,
}

impl HeadlessPane {
    fn record(&self, event: SurfaceEvent) {
        self.log.borrow_mut().push(event);
    }
}

impl PaneSurface for HeadlessPane {
    fn spawn_process(&mut self, cwd: Option<&Path>, command: Option<&str>) -> io::Result<u32> {
        let pid = self.next_pid.get();
        self.next_pid.set(pid + 1);
        self.record(SurfaceEvent::PaneSpawned {
            pane: self.id,
            pid,
            cwd: cwd.map(Path::to_path_buf),
            command: command.map(str::to_owned),
        });
        Ok(pid)
    }

    fn send_input(&mut self, kind: EventKind, event: &KeyEvent) {
        self.record(SurfaceEvent::PaneInput {
            pane: self.id,
            kind,
            keyval: event.keyval,
            synthesized: event.send_event,
        });
    }

    fn feed(&mut self, text: &str) {
        self.record(SurfaceEvent::PaneFed { pane: self.id, text: text.into() });
    }

    fn make_visible_and_focused(&mut self) {
        self.focus.set(Some(self.id));
        self.record(SurfaceEvent::PaneFocused { pane: self.id });
    }

    fn has_focus(&self) -> bool {
        self.focus.get() == Some(self.id)
    }

    fn reconfigure(&mut self) {
        self.record(SurfaceEvent::PaneReconfigured { pane: self.id });
    }

    fn destroy(&mut self) {
        if self.has_focus() {
            self.focus.set(None);
        }
        self.record(SurfaceEvent::PaneDestroyed { pane: self.id });
    }
}
