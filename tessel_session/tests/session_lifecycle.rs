//! Integration tests for the session lifecycle: layout, restore, describe,
//! broadcast and teardown, driven through the headless toolkit.

use tessel_session::Registry;
use tessel_session::broadcast::{BroadcastMode, SourcePolicy};
use tessel_session::config::{LayeredConfig, SessionConfig};
use tessel_session::headless::{HeadlessToolkit, SurfaceEvent};
use tessel_session::layout::{FlatLayout, LayoutObject, ObjectKind};
use tessel_session::pane::PaneId;
use tessel_session::persistence::LayoutStore;
use tessel_session::resolver::{Diagnostic, MAX_DEPTH};
use tessel_session::surface::{EventKind, KeyEvent};
use tessel_session::tree::{ContainerKind, Node};
use tessel_session::window::WindowId;

const SESSION: &str = r#"
broadcast_default = "group"

[layouts.work.main]
type = "Window"
position = "10:20"
size = [800, 600]
title = "work"
last_active_window = "True"

[layouts.work.tabs]
type = "Notebook"
parent = "main"
labels = ["editor", "shells"]

[layouts.work.editor]
type = "Terminal"
parent = "tabs"
order = 0
group = "dev"
command = "vim"

[layouts.work.split]
type = "VPaned"
parent = "tabs"
order = 1
ratio = 0.5

[layouts.work.top]
type = "Terminal"
parent = "split"
order = 0
group = "dev"

[layouts.work.bottom]
type = "Terminal"
parent = "split"
order = 1

[layouts.work.side]
type = "Window"

[layouts.work.logs]
type = "Terminal"
parent = "side"
directory = "/var/log"

[layouts.work.orphan]
type = "Terminal"
parent = "nowhere"
"#;

fn registry(config: SessionConfig) -> (HeadlessToolkit, Registry<HeadlessToolkit>) {
    let toolkit = HeadlessToolkit::new();
    let registry = Registry::new(toolkit.clone(), config);
    (toolkit, registry)
}

fn work_session() -> (HeadlessToolkit, Registry<HeadlessToolkit>) {
    let (toolkit, mut reg) = registry(SessionConfig::from_toml(SESSION).unwrap());
    reg.create_layout("work").unwrap();
    reg.layout_done();
    reg.finish_layout();
    (toolkit, reg)
}

fn notebook(reg: &Registry<HeadlessToolkit>, id: WindowId) -> &tessel_session::tree::Container {
    match &reg.window(id).unwrap().root {
        Some(Node::Container(container)) if container.kind == ContainerKind::Notebook => container,
        other => panic!("expected notebook root, got {other:?}"),
    }
}

/// Build a layout from TOML, restore it and check every observable effect.
#[test]
fn layout_from_config_restores_session() {
    let (toolkit, mut reg) = registry(SessionConfig::from_toml(SESSION).unwrap());
    let report = reg.create_layout("work").unwrap();

    assert_eq!(report.windows.len(), 2);
    assert!(!report.missing_layout);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].name(), "orphan");
    assert_eq!(reg.panes().len(), 4);

    // Nothing runs until the layout is done.
    assert_eq!(toolkit.spawn_count(), 0);
    let restore = reg.layout_done();
    assert_eq!(restore.spawned.len(), 4);
    assert_eq!(toolkit.spawn_count(), 4);
    assert!(reg.is_doing_layout());
    reg.finish_layout();

    let main = report.windows[0];
    let window = reg.window(main).unwrap();
    assert_eq!(window.position, Some((10, 20)));
    assert_eq!(window.size, Some((800, 600)));
    assert_eq!(window.title.as_deref(), Some("work"));
    assert_eq!(reg.last_active_window(), Some(main));
    assert_eq!(restore.presented, vec![main]);

    // Both notebook pages got a focus target.
    let tabs = notebook(&reg, main);
    assert_eq!(tabs.children.len(), 2);
    assert_eq!(tabs.labels.get(&0).map(String::as_str), Some("editor"));
    assert_eq!(tabs.last_active.len(), 2);
    assert!(restore.skipped_pages.is_empty());

    let editor = reg.panes().iter().find(|pane| pane.command.as_deref() == Some("vim")).unwrap();
    assert_eq!(editor.group.as_deref(), Some("dev"));
    assert_eq!(tabs.last_active.get(&0), Some(&editor.id));

    let logs = reg.panes().iter().find(|pane| pane.owner == report.windows[1]).unwrap();
    assert_eq!(logs.cwd.as_deref(), Some(std::path::Path::new("/var/log")));
    assert_eq!(reg.layout_name(), Some("work"));
}

/// Describing a restored session and rebuilding it yields the same trees.
#[test]
fn describe_then_rebuild_is_isomorphic() {
    let (_, original) = work_session();
    let described = original.describe_layout();

    let (_, mut rebuilt) = registry(SessionConfig::default());
    rebuilt.set_initial_layout(Some(described.clone()));
    let report = rebuilt.create_layout("anything").unwrap();
    assert!(report.diagnostics.is_empty());
    rebuilt.layout_done();

    assert_eq!(rebuilt.windows().len(), original.windows().len());
    for window in original.windows() {
        let first = window.pane_ids()[0];
        let twin = rebuilt.windows().iter().find(|w| w.contains_pane(first)).unwrap();
        assert_eq!(twin.root, window.root);
        assert_eq!(twin.position, window.position);
        assert_eq!(twin.size, window.size);
        assert_eq!(twin.title, window.title);
    }
    for pane in original.panes() {
        let twin = rebuilt.pane(pane.id).unwrap();
        assert_eq!(twin.group, pane.group);
        assert_eq!(twin.command, pane.command);
        assert_eq!(twin.cwd, pane.cwd);
    }

    // And describing the rebuilt session is stable.
    assert_eq!(rebuilt.describe_layout().len(), described.len());
}

/// Saved sessions come back through the layout store.
#[test]
fn saved_layout_restores_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = LayoutStore::new(dir.path());

    let (_, original) = work_session();
    store.save("snapshot", &original.describe_layout()).unwrap();
    assert_eq!(store.list().unwrap(), vec!["snapshot".to_string()]);

    let config = LayeredConfig::new(SessionConfig::default(), store);
    let mut reg = Registry::new(HeadlessToolkit::new(), config);
    let report = reg.create_layout("snapshot").unwrap();
    assert!(!report.missing_layout);
    assert_eq!(reg.panes().len(), original.panes().len());
    for pane in original.panes() {
        assert!(reg.pane(pane.id).is_some());
    }
}

/// Group broadcast reaches siblings only, with synthesized events.
#[test]
fn group_broadcast_between_layout_panes() {
    let (toolkit, mut reg) = work_session();
    toolkit.clear();

    let dev: Vec<PaneId> = reg
        .panes()
        .iter()
        .filter(|pane| pane.group.as_deref() == Some("dev"))
        .map(|pane| pane.id)
        .collect();
    assert_eq!(dev.len(), 2);

    assert_eq!(reg.broadcast_mode(), BroadcastMode::Group);
    let key = KeyEvent { keyval: 0x61, string: "a".into(), ..Default::default() };
    assert_eq!(reg.broadcast(dev[0], EventKind::KeyPress, &key), 1);

    let inputs: Vec<(PaneId, bool)> = toolkit
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SurfaceEvent::PaneInput { pane, synthesized, .. } => Some((pane, synthesized)),
            _ => None,
        })
        .collect();
    assert_eq!(inputs, vec![(dev[1], true)]);

    let targets = reg.target_panes(dev[0], BroadcastMode::Group, SourcePolicy::Include);
    assert_eq!(targets, dev);
    let all = reg.target_panes(dev[0], BroadcastMode::All, SourcePolicy::Exclude);
    assert_eq!(all.len(), 4);
}

/// Closing panes one by one ends with a single quit.
#[test]
fn closing_every_pane_quits_once() {
    let (toolkit, mut reg) = work_session();
    let ids: Vec<PaneId> = reg.panes().iter().map(|pane| pane.id).collect();

    for id in ids {
        reg.deregister_pane(id);
    }
    assert!(reg.panes().is_empty());
    assert!(reg.windows().is_empty());
    assert!(reg.is_shut_down());
    assert_eq!(toolkit.quit_count(), 1);
}

/// Closing a whole window leaves the others running.
#[test]
fn closing_one_window_keeps_the_other() {
    let (toolkit, mut reg) = work_session();
    let side = reg.windows()[1].id;
    let remaining = reg.panes().len() - reg.window(side).unwrap().pane_ids().len();

    reg.destroy_window(side);
    assert_eq!(reg.windows().len(), 1);
    assert_eq!(reg.panes().len(), remaining);
    assert_eq!(toolkit.quit_count(), 0);
}

/// A missing layout falls back to one default window.
#[test]
fn missing_layout_falls_back_to_default_window() {
    let (toolkit, mut reg) = registry(SessionConfig::default());
    let report = reg.create_layout("absent").unwrap();
    assert!(report.missing_layout);
    assert_eq!(reg.windows().len(), 1);
    assert_eq!(toolkit.spawn_count(), 0);

    reg.layout_done();
    assert_eq!(toolkit.spawn_count(), 1);
}

/// A self-parented object never blocks the rest of the layout.
#[test]
fn self_parent_is_dropped() {
    let layout: FlatLayout = [
        ("w".to_string(), LayoutObject::new(ObjectKind::Window, None)),
        ("t".to_string(), LayoutObject::new(ObjectKind::Terminal, Some("w"))),
        ("loop".to_string(), LayoutObject::new(ObjectKind::Terminal, Some("loop"))),
    ]
    .into_iter()
    .collect();

    let (_, mut reg) = registry(SessionConfig::default());
    reg.set_initial_layout(Some(layout));
    let report = reg.create_layout("default").unwrap();
    assert_eq!(report.windows.len(), 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(reg.panes().len(), 1);
}

/// A layout nested far too deep is cut short instead of overflowing.
#[test]
fn very_deep_layout_is_cut_short() {
    let levels = 4000;
    let mut layout: FlatLayout = (1..=levels)
        .map(|level| {
            let parent = format!("s{:04}", level - 1);
            (format!("s{level:04}"), LayoutObject::new(ObjectKind::VPaned, Some(&parent)))
        })
        .collect();
    layout.insert("s0000".into(), LayoutObject::new(ObjectKind::Window, None));

    let (_, mut reg) = registry(SessionConfig::default());
    reg.set_initial_layout(Some(layout));
    let report = reg.create_layout("deep").unwrap();
    reg.layout_done();

    assert_eq!(report.windows.len(), 1);
    let too_deep =
        report.diagnostics.iter().filter(|d| matches!(d, Diagnostic::TooDeep { .. })).count();
    assert_eq!(too_deep, levels - MAX_DEPTH);
    // Every split is empty, so the window falls back to one default pane.
    assert_eq!(reg.panes().len(), 1);
    assert!(!reg.describe_layout().is_empty());
}
