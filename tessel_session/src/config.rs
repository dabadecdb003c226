//! Session configuration.
//!
//! Read from a TOML file; layouts live under `[layouts.<name>.<object>]`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::broadcast::BroadcastMode;
use crate::error::{SessionError, SessionResult};
use crate::layout::FlatLayout;
use crate::persistence::LayoutStore;

/// Option name: remove groups without members when groups change.
pub const AUTOCLEAN_GROUPS: &str = "autoclean_groups";

/// Option name: apply the requested profile to new windows' panes.
pub const ALWAYS_SPLIT_WITH_PROFILE: &str = "always_split_with_profile";

/// Where the session core reads its settings and layout definitions.
pub trait ConfigSource {
    /// Layout definition stored under `name`.
    fn layout_definition(&self, name: &str) -> Option<FlatLayout>;

    /// Value of a boolean option; unknown options read as `false`.
    fn bool_option(&self, name: &str) -> bool;

    /// Broadcast mode a new registry starts in.
    fn broadcast_default(&self) -> BroadcastMode;
}

/// Top-level session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial broadcast mode.
    pub broadcast_default: BroadcastMode,
    /// Whether unused groups are removed automatically.
    pub autoclean_groups: bool,
    /// Whether new windows inherit the requested profile.
    pub always_split_with_profile: bool,
    /// Layout definitions by name.
    pub layouts: BTreeMap<String, FlatLayout>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            broadcast_default: BroadcastMode::Group,
            autoclean_groups: true,
            always_split_with_profile: false,
            layouts: BTreeMap::new(),
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> SessionResult<Self> {
        toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Serialize the configuration to TOML text.
    pub fn to_toml(&self) -> SessionResult<String> {
        toml::to_string(self).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> SessionResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }
}

impl ConfigSource for SessionConfig {
    fn layout_definition(&self, name: &str) -> Option<FlatLayout> {
        self.layouts.get(name).cloned()
    }

    fn bool_option(&self, name: &str) -> bool {
        match name {
            AUTOCLEAN_GROUPS => self.autoclean_groups,
            ALWAYS_SPLIT_WITH_PROFILE => self.always_split_with_profile,
            _ => {
                debug!("Unknown boolean option {name:?}");
                false
            },
        }
    }

    fn broadcast_default(&self) -> BroadcastMode {
        self.broadcast_default
    }
}

/// Configuration file first, then the on-disk layout store.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Settings and built-in layouts.
    pub config: SessionConfig,
    /// Saved layouts.
    pub store: LayoutStore,
}

impl LayeredConfig {
    /// Layer `store` beneath `config`.
    pub fn new(config: SessionConfig, store: LayoutStore) -> Self {
        Self { config, store }
    }
}

impl ConfigSource for LayeredConfig {
    fn layout_definition(&self, name: &str) -> Option<FlatLayout> {
        self.config.layout_definition(name).or_else(|| match self.store.load(name) {
            Ok(layout) => Some(layout),
            Err(err) => {
                debug!("No stored layout {name:?}: {err}");
                None
            },
        })
    }

    fn bool_option(&self, name: &str) -> bool {
        self.config.bool_option(name)
    }

    fn broadcast_default(&self) -> BroadcastMode {
        self.config.broadcast_default()
    }
}
