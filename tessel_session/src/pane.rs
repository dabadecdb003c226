//! Pane metadata and process state.
//!
//! The terminal surface itself is an external collaborator; this module
//! tracks identity, grouping, ownership and whether a backing process has
//! been spawned.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::surface::PaneSurface;
use crate::window::WindowId;

/// Unique identifier for a pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaneId(pub Uuid);

impl PaneId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier in any UUID text form, including `urn:uuid:...`.
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Self)
    }

    /// The identifier rendered as a URN, as stored in layouts.
    pub fn urn(&self) -> String {
        self.0.urn().to_string()
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.urn())
    }
}

/// A registered terminal pane.
#[derive(Debug)]
pub struct Pane<P> {
    /// Unique pane identifier.
    pub id: PaneId,
    /// Identifier of the matching pane in an attached multiplexer session.
    pub mux_pane_id: Option<String>,
    /// Broadcast group this pane belongs to, if any.
    pub group: Option<String>,
    /// Process id of the spawned child, once spawned.
    pub pid: Option<u32>,
    /// Window owning this pane.
    pub owner: WindowId,
    /// Working directory for the child process.
    pub cwd: Option<PathBuf>,
    /// Profile name requested for this pane.
    pub profile: Option<String>,
    /// Command override for the child process.
    pub command: Option<String>,
    /// Title override.
    pub title: Option<String>,
    /// Terminal surface backing this pane.
    pub surface: P,
}

impl<P: PaneSurface> Pane<P> {
    /// Create an unspawned pane owned by `owner`.
    pub fn new(id: PaneId, owner: WindowId, surface: P) -> Self {
        Self {
            id,
            mux_pane_id: None,
            group: None,
            pid: None,
            owner,
            cwd: None,
            profile: None,
            command: None,
            title: None,
            surface,
        }
    }

    /// Whether a backing process has been spawned.
    pub fn has_process(&self) -> bool {
        self.pid.is_some()
    }

    /// Whether this pane is a member of `group`.
    pub fn in_group(&self, group: &str) -> bool {
        self.group.as_deref() == Some(group)
    }

    /// Spawn the backing process if it isn't running yet.
    pub fn spawn(&mut self) -> io::Result<()> {
        if self.has_process() {
            return Ok(());
        }
        let pid = self.surface.spawn_process(self.cwd.as_deref(), self.command.as_deref())?;
        self.pid = Some(pid);
        Ok(())
    }
}
