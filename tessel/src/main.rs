//! Headless front end for tessel layouts and sessions.

use std::error::Error;
use std::io::{self, Write};

use clap::Parser;
use log::{debug, info};
use serde::Serialize;

use tessel_session::config::{ConfigSource, LayeredConfig, SessionConfig};
use tessel_session::headless::{HeadlessToolkit, SurfaceEvent};
use tessel_session::layout::FlatLayout;
use tessel_session::persistence::LayoutStore;
use tessel_session::reconstruct::LayoutReport;
use tessel_session::resolver;
use tessel_session::restore::RestoreReport;
use tessel_session::{Registry, SessionError};

mod cli;

use crate::cli::{Command, LayoutArgs, Options};

fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::parse();

    // RUST_LOG, when set, overrides the verbosity flag.
    env_logger::Builder::new()
        .filter_level(options.log_level())
        .parse_default_env()
        .init();

    match options.command {
        Command::Resolve(args) => resolve(&args),
        Command::Restore { layout, save } => restore(&layout, save.as_deref()),
        Command::Layouts => layouts(),
    }
}

/// Configuration file layered over the default layout store.
fn load_config(args: &LayoutArgs) -> Result<LayeredConfig, Box<dyn Error>> {
    let config = SessionConfig::load(&args.config)?;
    let store = LayoutStore::default_location();
    debug!("Layout store at {}", store.dir().display());
    Ok(LayeredConfig::new(config, store))
}

fn resolve(args: &LayoutArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(args)?;
    let layout = config
        .layout_definition(&args.layout)
        .ok_or_else(|| SessionError::LayoutNotFound(args.layout.clone()))?;

    let resolution = resolver::resolve(layout);
    info!(
        "Resolved {} objects into {} windows ({} dropped)",
        resolution.node_count(),
        resolution.windows.len(),
        resolution.diagnostics.len()
    );
    print_json(&resolution)
}

fn restore(args: &LayoutArgs, save: Option<&str>) -> Result<(), Box<dyn Error>> {
    let config = load_config(args)?;
    let store = config.store.clone();

    let toolkit = HeadlessToolkit::new();
    let mut registry = Registry::new(toolkit.clone(), config);
    if let Ok(cwd) = std::env::current_dir() {
        registry.set_origcwd(cwd);
    }

    let layout = registry.create_layout(&args.layout)?;
    let restore = registry.layout_done();
    registry.finish_layout();

    let described = registry.describe_layout();
    if let Some(name) = save {
        store.save(name, &described)?;
        info!("Saved session as {name:?}");
    }

    #[derive(Serialize)]
    struct Output<'a> {
        layout: &'a LayoutReport,
        restore: &'a RestoreReport,
        events: Vec<SurfaceEvent>,
        session: &'a FlatLayout,
    }

    print_json(&Output {
        layout: &layout,
        restore: &restore,
        events: toolkit.events(),
        session: &described,
    })
}

fn layouts() -> Result<(), Box<dyn Error>> {
    let store = LayoutStore::default_location();
    let mut stdout = io::stdout().lock();
    for name in store.list()? {
        writeln!(stdout, "{name}")?;
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
