//! Collaborator interfaces consumed by the session core.
//!
//! Windows and panes are drawn, focused and backed by processes somewhere
//! else. The registry only talks to them through these traits, which keeps
//! every side effect observable in tests (see [`crate::headless`]).

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pane::PaneId;
use crate::window::WindowId;

/// Kind of input event delivered to a pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A key was pressed.
    KeyPress,
    /// A key was released.
    KeyRelease,
}

/// A keyboard event as seen by the pane that received it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key symbol value.
    pub keyval: u32,
    /// Modifier state bitmask.
    pub state: u32,
    /// Raw hardware keycode.
    pub hardware_keycode: u16,
    /// Keyboard group (layout index).
    pub group: u8,
    /// Whether the key is a modifier.
    pub is_modifier: bool,
    /// Text produced by the key, if any.
    pub string: String,
    /// Event timestamp in milliseconds.
    pub time: u32,
    /// Whether this event was synthesized rather than coming from the user.
    pub send_event: bool,
}

impl KeyEvent {
    /// Copy of this event marked as synthesized, for delivery to other panes.
    pub fn synthesize(&self) -> Self {
        Self { send_event: true, ..self.clone() }
    }
}

/// Top-level window surface.
pub trait WindowSurface {
    /// Map the window on screen.
    fn show(&mut self);

    /// Move the window to the given screen position.
    fn move_to(&mut self, x: i32, y: i32);

    /// Resize the window.
    fn resize(&mut self, width: i32, height: i32);

    /// Force the window title.
    fn set_title(&mut self, title: &str);

    /// Maximize or restore the window.
    fn set_maximized(&mut self, maximized: bool);

    /// Enter or leave fullscreen.
    fn set_fullscreen(&mut self, fullscreen: bool);

    /// Raise the window and give it focus.
    fn present(&mut self);

    /// Tear the window down.
    fn destroy(&mut self);
}

/// Terminal surface and process control for a pane.
pub trait PaneSurface {
    /// Spawn the pane's child process, returning its pid.
    fn spawn_process(&mut self, cwd: Option<&Path>, command: Option<&str>) -> io::Result<u32>;

    /// Deliver an input event to the terminal.
    fn send_input(&mut self, kind: EventKind, event: &KeyEvent);

    /// Feed text to the child process as if typed.
    fn feed(&mut self, text: &str);

    /// Make sure the pane is on screen and holds keyboard focus.
    fn make_visible_and_focused(&mut self);

    /// Whether the pane currently holds keyboard focus.
    fn has_focus(&self) -> bool;

    /// Re-read configuration.
    fn reconfigure(&mut self) {}

    /// Tear the surface down.
    fn destroy(&mut self) {}
}

/// Factory for surfaces plus the application-level quit hook.
pub trait Toolkit {
    /// Window surface type.
    type Window: WindowSurface;
    /// Pane surface type.
    type Pane: PaneSurface;

    /// Create the surface for a new window.
    fn create_window(&mut self, id: WindowId) -> Self::Window;

    /// Create the surface for a new pane.
    fn create_pane(&mut self, id: PaneId) -> Self::Pane;

    /// Leave the main loop. Called once, when the last window goes away.
    fn quit(&mut self);
}

/// Bridge to an attached terminal multiplexer session.
pub trait MuxBridge {
    /// A pane was registered.
    fn pane_created(&mut self, pane: PaneId);

    /// A pane was deregistered.
    fn pane_destroyed(&mut self, pane: PaneId, mux_pane_id: Option<&str>);

    /// Attach to an existing remote session.
    fn attach_session(&mut self);
}
