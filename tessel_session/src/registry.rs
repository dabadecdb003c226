//! Process-wide registry of windows, panes and groups.
//!
//! One [`Registry`] is created at startup and handed by reference to every
//! component that needs it. All mutation goes through it on the control
//! thread, so it needs no locking. Teardown cascades are explicit: removing
//! the last pane destroys every window, and removing the last window (with
//! no launcher open) quits the toolkit.

use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::broadcast::BroadcastMode;
use crate::config::{ALWAYS_SPLIT_WITH_PROFILE, AUTOCLEAN_GROUPS, ConfigSource};
use crate::error::{SessionError, SessionResult};
use crate::layout::{FlatLayout, LayoutAttributes};
use crate::pane::{Pane, PaneId};
use crate::surface::{MuxBridge, PaneSurface, Toolkit, WindowSurface};
use crate::tree::Node;
use crate::window::{Window, WindowId};

/// The live windows, panes and groups of the application.
pub struct Registry<T: Toolkit> {
    pub(crate) toolkit: T,
    pub(crate) config: Box<dyn ConfigSource>,
    pub(crate) mux: Option<Box<dyn MuxBridge>>,
    pub(crate) windows: Vec<Window<T::Window>>,
    pub(crate) launcher_windows: Vec<WindowId>,
    pub(crate) panes: Vec<Pane<T::Pane>>,
    pub(crate) groups: Vec<String>,
    pub(crate) broadcast: BroadcastMode,
    pub(crate) doing_layout: bool,
    pub(crate) layout_name: Option<String>,
    pub(crate) initial_layout: Option<FlatLayout>,
    pub(crate) last_active_window: Option<WindowId>,
    pub(crate) last_focused_pane: Option<PaneId>,
    origcwd: Option<PathBuf>,
    shutdown: bool,
}

impl<T: Toolkit> Registry<T> {
    /// Create an empty registry.
    pub fn new(toolkit: T, config: impl ConfigSource + 'static) -> Self {
        let broadcast = config.broadcast_default();
        Self {
            toolkit,
            config: Box::new(config),
            mux: None,
            windows: Vec::new(),
            launcher_windows: Vec::new(),
            panes: Vec::new(),
            groups: Vec::new(),
            broadcast,
            doing_layout: false,
            layout_name: None,
            initial_layout: None,
            last_active_window: None,
            last_focused_pane: None,
            origcwd: None,
            shutdown: false,
        }
    }

    /// Attach a multiplexer bridge notified of pane lifecycle.
    pub fn with_mux_bridge(mut self, bridge: impl MuxBridge + 'static) -> Self {
        self.mux = Some(Box::new(bridge));
        self
    }

    /// The toolkit creating surfaces for this registry.
    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    /// Current configuration source.
    pub fn config(&self) -> &dyn ConfigSource {
        self.config.as_ref()
    }

    /// Live windows, in registration order.
    pub fn windows(&self) -> &[Window<T::Window>] {
        &self.windows
    }

    /// Live panes, in registration order.
    pub fn panes(&self) -> &[Pane<T::Pane>] {
        &self.panes
    }

    /// Known group names.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Look up a window.
    pub fn window(&self, id: WindowId) -> Option<&Window<T::Window>> {
        self.windows.iter().find(|window| window.id == id)
    }

    /// Look up a window mutably.
    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window<T::Window>> {
        self.windows.iter_mut().find(|window| window.id == id)
    }

    /// Look up a pane.
    pub fn pane(&self, id: PaneId) -> Option<&Pane<T::Pane>> {
        self.panes.iter().find(|pane| pane.id == id)
    }

    /// Look up a pane mutably.
    pub fn pane_mut(&mut self, id: PaneId) -> Option<&mut Pane<T::Pane>> {
        self.panes.iter_mut().find(|pane| pane.id == id)
    }

    /// Current broadcast mode.
    pub fn broadcast_mode(&self) -> BroadcastMode {
        self.broadcast
    }

    /// Change the broadcast mode.
    pub fn set_broadcast_mode(&mut self, mode: BroadcastMode) {
        debug!("Broadcast mode {:?} -> {mode:?}", self.broadcast);
        self.broadcast = mode;
    }

    /// Whether a layout reconstruction is in progress.
    pub fn is_doing_layout(&self) -> bool {
        self.doing_layout
    }

    /// Mark layout reconstruction as finished.
    pub fn finish_layout(&mut self) {
        self.doing_layout = false;
    }

    /// Name of the last layout built.
    pub fn layout_name(&self) -> Option<&str> {
        self.layout_name.as_deref()
    }

    /// Layout used by the next reconstruction instead of the configured one.
    pub fn set_initial_layout(&mut self, layout: Option<FlatLayout>) {
        self.initial_layout = layout;
    }

    /// Window revealed when a session is restored.
    pub fn last_active_window(&self) -> Option<WindowId> {
        self.last_active_window
    }

    /// Record the window to reveal when a session is restored.
    pub fn set_last_active_window(&mut self, id: Option<WindowId>) {
        self.last_active_window = id;
    }

    /// Whether the application was asked to quit.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown
    }

    /// Working directory inherited at startup.
    pub fn origcwd(&self) -> Option<&Path> {
        self.origcwd.as_deref()
    }

    /// Store the inherited working directory, mapping `/` to home.
    pub fn set_origcwd(&mut self, cwd: impl Into<PathBuf>) {
        let mut cwd = cwd.into();
        if cwd == Path::new("/") {
            if let Some(home) = home::home_dir() {
                cwd = home;
            }
        }
        self.origcwd = Some(cwd);
    }

    /// Replace the configuration and let every pane re-read it.
    pub fn reconfigure(&mut self, config: impl ConfigSource + 'static) {
        self.config = Box::new(config);
        for pane in &mut self.panes {
            pane.surface.reconfigure();
        }
    }

    /// Add a window. Registering a known window is a no-op.
    pub fn register_window(&mut self, window: Window<T::Window>) -> WindowId {
        let id = window.id;
        if self.window(id).is_none() {
            debug!("Registering window {id}");
            self.windows.push(window);
        }
        id
    }

    /// Remove a window, quitting if no windows or launchers remain.
    pub fn deregister_window(&mut self, id: WindowId) -> Option<Window<T::Window>> {
        debug!("Deregistering window {id}");
        let removed = match self.windows.iter().position(|window| window.id == id) {
            Some(idx) => Some(self.windows.remove(idx)),
            None => {
                error!("Window {id} is not registered");
                None
            },
        };
        self.quit_if_idle();
        removed
    }

    /// Add a launcher window. Registering a known launcher is a no-op.
    pub fn register_launcher_window(&mut self, id: WindowId) {
        if !self.launcher_windows.contains(&id) {
            debug!("Registering launcher window {id}");
            self.launcher_windows.push(id);
        }
    }

    /// Remove a launcher window, quitting if no windows or launchers remain.
    pub fn deregister_launcher_window(&mut self, id: WindowId) {
        debug!("Deregistering launcher window {id}");
        match self.launcher_windows.iter().position(|launcher| *launcher == id) {
            Some(idx) => {
                self.launcher_windows.remove(idx);
            },
            None => error!("Launcher window {id} is not registered"),
        }
        self.quit_if_idle();
    }

    /// Launcher windows currently open.
    pub fn launcher_windows(&self) -> &[WindowId] {
        &self.launcher_windows
    }

    fn quit_if_idle(&mut self) {
        if self.shutdown || !self.windows.is_empty() || !self.launcher_windows.is_empty() {
            return;
        }
        info!("No windows remain, quitting");
        self.shutdown = true;
        self.toolkit.quit();
    }

    /// Add a pane. Registering a known pane is a no-op.
    pub fn register_pane(&mut self, pane: Pane<T::Pane>) -> PaneId {
        let id = pane.id;
        if self.pane(id).is_some() {
            return id;
        }

        debug!("Registering pane {id}");
        if let Some(group) = &pane.group {
            self.create_group(group);
        }
        self.panes.push(pane);
        if let Some(mux) = &mut self.mux {
            mux.pane_created(id);
        }
        id
    }

    /// Remove a pane, typically after its process exited.
    ///
    /// The pane is dropped from its window's tree; a window left without
    /// panes is destroyed. Removing the last pane destroys every window.
    pub fn deregister_pane(&mut self, id: PaneId) -> Option<Pane<T::Pane>> {
        debug!("Deregistering pane {id}");
        let Some(mut pane) = self.take_pane(id) else {
            error!("Pane {id} is not registered");
            return None;
        };
        pane.surface.destroy();

        if self.last_focused_pane == Some(id) {
            self.last_focused_pane = None;
        }

        let owner_empty = self.window_mut(pane.owner).is_some_and(|window| window.remove_pane(id));

        if self.panes.is_empty() {
            info!("No panes remain, destroying all windows");
            self.destroy_all_windows();
        } else {
            debug!("{} panes remain", self.panes.len());
            if owner_empty {
                self.destroy_window(pane.owner);
            }
        }

        Some(pane)
    }

    fn take_pane(&mut self, id: PaneId) -> Option<Pane<T::Pane>> {
        let idx = self.panes.iter().position(|pane| pane.id == id)?;
        let pane = self.panes.remove(idx);
        if let Some(mux) = &mut self.mux {
            mux.pane_destroyed(id, pane.mux_pane_id.as_deref());
        }
        Some(pane)
    }

    /// Destroy a window together with every pane it owns.
    pub fn destroy_window(&mut self, id: WindowId) {
        if self.window(id).is_none() {
            error!("Cannot destroy unregistered window {id}");
            return;
        }

        let owned: Vec<PaneId> =
            self.panes.iter().filter(|pane| pane.owner == id).map(|pane| pane.id).collect();
        for pane_id in owned {
            if let Some(mut pane) = self.take_pane(pane_id) {
                pane.surface.destroy();
            }
        }

        if let Some(mut window) = self.deregister_window(id) {
            window.surface.destroy();
        }
    }

    /// Destroy every live window, each exactly once.
    pub fn destroy_all_windows(&mut self) {
        let ids: Vec<WindowId> = self.windows.iter().map(|window| window.id).collect();
        for id in ids {
            self.destroy_window(id);
        }
    }

    /// Find a pane by UUID, accepting any UUID text form.
    pub fn find_pane_by_uuid(&self, uuid: &str) -> Option<&Pane<T::Pane>> {
        debug!("Searching panes for {uuid}");
        let id = PaneId::parse(uuid)?;
        self.panes.iter().find(|pane| pane.id == id)
    }

    /// Find a pane by its multiplexer pane id.
    pub fn find_pane_by_mux_pane_id(&self, mux_pane_id: &str) -> Option<&Pane<T::Pane>> {
        debug!("Searching panes for multiplexer pane {mux_pane_id}");
        self.panes.iter().find(|pane| pane.mux_pane_id.as_deref() == Some(mux_pane_id))
    }

    /// Record which multiplexer pane backs `pane`.
    pub fn assign_mux_pane_id(
        &mut self,
        pane: PaneId,
        mux_pane_id: impl Into<String>,
    ) -> SessionResult<()> {
        let target = self.pane_mut(pane).ok_or(SessionError::PaneNotFound(pane))?;
        target.mux_pane_id = Some(mux_pane_id.into());
        Ok(())
    }

    /// Ask the multiplexer bridge to attach an existing session.
    pub fn attach_mux_session(&mut self) {
        match &mut self.mux {
            Some(mux) => mux.attach_session(),
            None => debug!("No multiplexer bridge to attach"),
        }
    }

    /// Add a group name. Creating a known group is a no-op.
    pub fn create_group(&mut self, name: &str) {
        if !self.groups.iter().any(|group| group == name) {
            debug!("Registering group {name}");
            self.groups.push(name.to_owned());
        }
    }

    /// Remove every group without members, if autoclean is enabled.
    pub fn hoover_groups(&mut self) {
        if !self.config.bool_option(AUTOCLEAN_GROUPS) {
            return;
        }

        let before = self.groups.len();
        let panes = &self.panes;
        self.groups.retain(|group| panes.iter().any(|pane| pane.in_group(group)));
        debug!("Hoovered {} of {before} groups", before - self.groups.len());
    }

    /// Move `pane` into `group` (or out of any group), then hoover.
    pub fn set_pane_group(&mut self, pane: PaneId, group: Option<&str>) -> SessionResult<()> {
        let target = self.pane_mut(pane).ok_or(SessionError::PaneNotFound(pane))?;
        target.group = group.map(str::to_owned);
        if let Some(group) = group {
            self.create_group(group);
        }
        self.hoover_groups();
        Ok(())
    }

    /// Close every pane in `group`. Returns the number of panes closed.
    pub fn close_grouped_panes(&mut self, group: &str) -> usize {
        let members: Vec<PaneId> =
            self.panes.iter().filter(|pane| pane.in_group(group)).map(|pane| pane.id).collect();
        for id in &members {
            self.deregister_pane(*id);
        }
        members.len()
    }

    /// Create a pane owned by `owner` and register it.
    pub fn create_pane(&mut self, owner: WindowId) -> PaneId {
        let id = PaneId::generate();
        let surface = self.toolkit.create_pane(id);
        self.register_pane(Pane::new(id, owner, surface))
    }

    /// Create a pane from layout attributes and register it.
    pub(crate) fn create_pane_from_layout(
        &mut self,
        owner: WindowId,
        attributes: &LayoutAttributes,
    ) -> PaneId {
        let requested = attributes.uuid.as_deref().and_then(PaneId::parse);
        let id = match requested {
            Some(id) if self.pane(id).is_none() => id,
            Some(id) => {
                error!("Pane {id} already registered; assigning a fresh id");
                PaneId::generate()
            },
            None => PaneId::generate(),
        };

        let mut pane = Pane::new(id, owner, self.toolkit.create_pane(id));
        pane.group = attributes.group.clone();
        pane.profile = attributes.profile.clone();
        pane.command = attributes.command.clone();
        pane.title = attributes.title.clone();
        pane.cwd = attributes.directory.as_ref().map(PathBuf::from);
        self.register_pane(pane)
    }

    /// Open a window holding a single pane.
    ///
    /// The pane's process is spawned right away unless a layout is being
    /// built, in which case [`Registry::layout_done`] spawns it.
    pub fn new_window(&mut self, cwd: Option<&Path>, profile: Option<&str>) -> (WindowId, PaneId) {
        let window_id = WindowId::generate();
        let mut window = Window::new(window_id, self.toolkit.create_window(window_id));

        let pane_id = PaneId::generate();
        let mut pane = Pane::new(pane_id, window_id, self.toolkit.create_pane(pane_id));
        pane.cwd = cwd.map(Path::to_path_buf).or_else(|| self.origcwd.clone());
        if self.config.bool_option(ALWAYS_SPLIT_WITH_PROFILE) {
            pane.profile = profile.map(str::to_owned);
        }

        window.root = Some(Node::Pane(pane_id));
        window.last_active_pane = Some(pane_id);
        window.surface.show();
        self.register_window(window);
        self.register_pane(pane);

        if !self.doing_layout {
            self.spawn_pane(pane_id);
        }
        (window_id, pane_id)
    }

    /// Spawn the process backing `id` if it isn't running yet.
    pub fn spawn_pane(&mut self, id: PaneId) -> bool {
        let Some(pane) = self.pane_mut(id) else {
            error!("Cannot spawn unregistered pane {id}");
            return false;
        };
        match pane.spawn() {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to spawn process for pane {id}: {err}");
                false
            },
        }
    }

    /// First pane whose surface reports focus.
    pub fn focused_pane(&self) -> Option<PaneId> {
        self.panes.iter().find(|pane| pane.surface.has_focus()).map(|pane| pane.id)
    }

    /// Focus moved to `pane`.
    pub fn focus_changed(&mut self, pane: PaneId) {
        let Some(owner) = self.pane(pane).map(|pane| pane.owner) else {
            return;
        };
        if let Some(window) = self.window_mut(owner) {
            if !window.is_child_notebook() {
                window.last_active_pane = Some(pane);
            }
        }
        self.last_focused_pane = Some(pane);
    }

    /// Focus left `pane`.
    pub fn focus_left(&mut self, pane: PaneId) {
        self.last_focused_pane = Some(pane);
    }

    /// Pane that most recently held or lost focus.
    pub fn last_focused_pane(&self) -> Option<PaneId> {
        self.last_focused_pane
    }

    /// Layout attributes describing `id`.
    fn pane_layout_attributes(&self, id: PaneId) -> LayoutAttributes {
        let mut attributes = LayoutAttributes { uuid: Some(id.urn()), ..Default::default() };
        if let Some(pane) = self.pane(id) {
            attributes.group = pane.group.clone();
            attributes.profile = pane.profile.clone();
            attributes.command = pane.command.clone();
            attributes.title = pane.title.clone();
            attributes.directory = pane.cwd.as_ref().map(|cwd| cwd.display().to_string());
        }
        attributes
    }

    /// Describe every live window as one flat layout.
    pub fn describe_layout(&self) -> FlatLayout {
        let mut layout = FlatLayout::new();
        let pane_attributes = |id: PaneId| self.pane_layout_attributes(id);
        let mut counter = 0;
        for window in &self.windows {
            let last_active = self.last_active_window == Some(window.id);
            counter =
                window.describe_layout(counter, None, &mut layout, 0, last_active, &pane_attributes);
        }
        layout
    }
}
