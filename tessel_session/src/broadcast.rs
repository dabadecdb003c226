//! Group broadcast routing.
//!
//! Decides which panes receive a copy of an input event and delivers it.
//! Every call borrows the registry for its whole duration, so the pane list
//! can't change mid-iteration. Targets are visited in registration order.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::pane::PaneId;
use crate::registry::Registry;
use crate::surface::{EventKind, KeyEvent, PaneSurface, Toolkit};

/// Which panes receive input typed into one pane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Every pane.
    All,
    /// Every pane in the source pane's group.
    #[default]
    Group,
    /// Only the source pane.
    Off,
}

/// Whether the source pane belongs to its own group's target set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePolicy {
    /// Keep the source pane in the target set.
    Include,
    /// Leave the source pane out.
    Exclude,
}

impl<T: Toolkit> Registry<T> {
    /// Panes sharing `pane`'s group, in registration order.
    ///
    /// An ungrouped or unknown pane has no siblings.
    pub fn sibling_panes(&self, pane: PaneId, policy: SourcePolicy) -> Vec<PaneId> {
        let Some(group) = self.pane(pane).and_then(|source| source.group.as_deref()) else {
            return Vec::new();
        };
        self.panes
            .iter()
            .filter(|candidate| candidate.in_group(group))
            .filter(|candidate| policy == SourcePolicy::Include || candidate.id != pane)
            .map(|candidate| candidate.id)
            .collect()
    }

    /// Panes that should receive input typed into `source` under `mode`.
    ///
    /// `policy` only matters in [`BroadcastMode::Group`]: `All` always
    /// includes the source and `Off` is always exactly the source.
    pub fn target_panes(
        &self,
        source: PaneId,
        mode: BroadcastMode,
        policy: SourcePolicy,
    ) -> Vec<PaneId> {
        match mode {
            BroadcastMode::All => self.panes.iter().map(|pane| pane.id).collect(),
            BroadcastMode::Group if self.pane(source).is_some_and(|p| p.group.is_some()) => {
                self.sibling_panes(source, policy)
            },
            BroadcastMode::Group | BroadcastMode::Off => vec![source],
        }
    }

    /// Deliver `event` to every other pane in `group`.
    ///
    /// Returns the number of panes the event was delivered to.
    pub fn broadcast_to_group(
        &mut self,
        source: PaneId,
        group: &str,
        kind: EventKind,
        event: &KeyEvent,
    ) -> usize {
        debug!("Broadcasting {kind:?} to group {group}");
        self.deliver(source, kind, event, |pane| pane.in_group(group))
    }

    /// Deliver `event` to every other pane.
    pub fn broadcast_to_all(&mut self, source: PaneId, kind: EventKind, event: &KeyEvent) -> usize {
        debug!("Broadcasting {kind:?} to all panes");
        self.deliver(source, kind, event, |_| true)
    }

    /// Deliver `event` to the other panes selected by the current mode.
    pub fn broadcast(&mut self, source: PaneId, kind: EventKind, event: &KeyEvent) -> usize {
        match self.broadcast {
            BroadcastMode::All => self.broadcast_to_all(source, kind, event),
            BroadcastMode::Group => {
                match self.pane(source).and_then(|pane| pane.group.clone()) {
                    Some(group) => self.broadcast_to_group(source, &group, kind, event),
                    None => 0,
                }
            },
            BroadcastMode::Off => 0,
        }
    }

    fn deliver(
        &mut self,
        source: PaneId,
        kind: EventKind,
        event: &KeyEvent,
        qualifies: impl Fn(&crate::pane::Pane<T::Pane>) -> bool,
    ) -> usize {
        let synthesized = event.synthesize();
        let mut delivered = 0;
        for pane in self.panes.iter_mut().filter(|pane| pane.id != source) {
            if qualifies(pane) {
                pane.surface.send_input(kind, &synthesized);
                delivered += 1;
            }
        }
        delivered
    }

    /// Type each target pane's 1-based position into it.
    ///
    /// Positions follow window order, then depth-first tree order. With
    /// `pad`, numbers are zero-padded to the width of the pane count.
    pub fn enumerate_targets(&mut self, source: PaneId, pad: bool) {
        let ordered: Vec<PaneId> = self.windows.iter().flat_map(|window| window.pane_ids()).collect();
        let width = if pad { self.panes.len().to_string().len() } else { 0 };

        for target in self.target_panes(source, self.broadcast, SourcePolicy::Include) {
            let Some(idx) = ordered.iter().position(|id| *id == target) else {
                continue;
            };
            let number = format!("{:0width$}", idx + 1);
            if let Some(pane) = self.pane_mut(target) {
                pane.surface.feed(&number);
            }
        }
    }
}
