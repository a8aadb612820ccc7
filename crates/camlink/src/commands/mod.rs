//! Command dispatch: bridges CLI args -> registry operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod discover;
pub mod imaging;
pub mod ptz;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Everything a handler needs besides its own arguments.
pub struct Ctx<'a> {
    pub global: &'a GlobalOpts,
    pub cfg: &'a Config,
    pub format: OutputFormat,
    pub color: bool,
}

impl<'a> Ctx<'a> {
    pub fn new(global: &'a GlobalOpts, cfg: &'a Config) -> Self {
        Self {
            global,
            cfg,
            format: config::output_format(global, cfg),
            color: output::should_color(config::color_mode(global, cfg)),
        }
    }

    pub fn print(&self, rendered: &str) {
        output::print_output(rendered, self.global.quiet);
    }

    /// Status line on stderr, suppressed by `--quiet`.
    pub fn note(&self, message: &str) {
        if !self.global.quiet {
            eprintln!("{message}");
        }
    }
}

/// Dispatch a camera-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Ctx<'_>) -> Result<(), CliError> {
    match cmd {
        Command::Discover(args) => discover::handle(args, ctx).await,
        Command::Devices(args) => devices::handle(args, ctx).await,
        Command::Ptz(args) => ptz::handle(args, ctx).await,
        Command::Imaging(args) => imaging::handle(args, ctx).await,
        Command::Watch(args) => watch::handle(args, ctx).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not go through camera dispatch".into(),
        )),
    }
}
