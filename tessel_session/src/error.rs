//! Error types for the session core.

use std::io;

use crate::pane::PaneId;
use crate::window::WindowId;

/// Errors that can occur while building or persisting a session.
///
/// Malformed layout input and lookup misses are not errors; the resolver
/// reports the former as [`crate::resolver::Diagnostic`] values and lookups
/// return `Option`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A layout violated a structural invariant (e.g. a non-window root).
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// No layout definition exists under the requested name.
    #[error("layout not defined: {0}")]
    LayoutNotFound(String),

    /// The requested window is not registered.
    #[error("window not found: {0}")]
    WindowNotFound(WindowId),

    /// The requested pane is not registered.
    #[error("pane not found: {0}")]
    PaneNotFound(PaneId),

    /// The configuration could not be parsed or serialized.
    #[error("config error: {0}")]
    Config(String),

    /// The layout store could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience type alias for session results.
pub type SessionResult<T> = Result<T, SessionError>;
