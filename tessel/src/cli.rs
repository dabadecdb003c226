//! Command-line interface for tessel.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// tessel - drive layouts and sessions without a display
#[derive(Parser, Debug)]
#[command(name = "tessel", author, version, about, long_about = None)]
pub struct Options {
    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Options {
    /// Log filter selected by the `-v` count.
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a layout and print its window trees and diagnostics
    Resolve(LayoutArgs),

    /// Build and restore a layout headlessly, printing what happened
    Restore {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Save the rebuilt session to the layout store under this name
        #[arg(long, value_name = "NAME")]
        save: Option<String>,
    },

    /// List layouts in the layout store
    Layouts,
}

/// Where to find the layout.
#[derive(Args, Debug)]
pub struct LayoutArgs {
    /// Configuration file (TOML)
    #[arg(value_name = "CONFIG", env = "TESSEL_CONFIG")]
    pub config: PathBuf,

    /// Layout name
    #[arg(short, long, value_name = "NAME", default_value = "default")]
    pub layout: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_count_maps_to_filter() {
        let options = Options::parse_from(["tessel", "-vv", "layouts"]);
        assert_eq!(options.log_level(), log::LevelFilter::Trace);

        let options = Options::parse_from(["tessel", "layouts"]);
        assert_eq!(options.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn restore_arguments() {
        let options = Options::parse_from([
            "tessel", "restore", "session.toml", "--layout", "work", "--save", "snapshot",
        ]);
        let Command::Restore { layout, save } = options.command else {
            panic!("restore command expected");
        };
        assert_eq!(layout.config, PathBuf::from("session.toml"));
        assert_eq!(layout.layout, "work");
        assert_eq!(save.as_deref(), Some("snapshot"));
    }

    #[test]
    fn layout_defaults_to_default() {
        let options = Options::parse_from(["tessel", "resolve", "session.toml"]);
        let Command::Resolve(args) = options.command else {
            panic!("resolve command expected");
        };
        assert_eq!(args.layout, "default");
    }

    #[test]
    fn command_definition_is_valid() {
        use clap::CommandFactory;
        Options::command().debug_assert();
    }
}
