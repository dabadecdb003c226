//! Session core for tessel.
//!
//! This crate owns the process-wide registry of windows, panes and groups,
//! routes broadcast input between grouped panes, and rebuilds window/pane
//! hierarchies from flat layout descriptions. Rendering, terminal emulation
//! and process plumbing live behind the collaborator traits in [`surface`]
//! so the core can be driven and tested headlessly.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod headless;
pub mod layout;
pub mod pane;
pub mod persistence;
pub mod reconstruct;
pub mod registry;
pub mod resolver;
pub mod restore;
pub mod surface;
pub mod tree;
pub mod window;

pub use error::{SessionError, SessionResult};
pub use registry::Registry;
