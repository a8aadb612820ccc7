//! Clap derive structures for the `camlink` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// camlink -- discover and control ONVIF cameras
#[derive(Debug, Parser)]
#[command(
    name = "camlink",
    version,
    about = "Discover and control ONVIF IP cameras from the command line",
    long_about = "Finds cameras on the local network with WS-Discovery, connects to them\n\
        over authenticated ONVIF SOAP, and exposes stream URIs, PTZ control,\n\
        imaging settings, reboot, and periodic health checks.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Named camera from the config file
    #[arg(long, short = 'C', env = "CAMLINK_CAMERA", global = true)]
    pub camera: Option<String>,

    /// Camera address, `ip` or `ip:port` (overrides the named camera)
    #[arg(long, short = 'a', env = "CAMLINK_ADDRESS", global = true)]
    pub address: Option<String>,

    /// ONVIF username
    #[arg(long, short = 'u', env = "CAMLINK_USERNAME", global = true)]
    pub username: Option<String>,

    /// ONVIF password
    #[arg(long, env = "CAMLINK_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "CAMLINK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CAMLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// SOAP request timeout in seconds
    #[arg(long, env = "CAMLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe the local network for ONVIF cameras
    #[command(alias = "disc")]
    Discover(DiscoverArgs),

    /// Connect to a camera and query it
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Pan / tilt / zoom control
    Ptz(PtzArgs),

    /// Read and change imaging settings
    #[command(alias = "img")]
    Imaging(ImagingArgs),

    /// Discover, connect configured cameras, and report health until Ctrl-C
    Watch(WatchArgs),

    /// Manage the configuration file and stored passwords
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Discover ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// How long to collect replies, in milliseconds
    #[arg(long, short = 't')]
    pub timeout_ms: Option<u64>,

    /// Local UDP port to listen on (0 for an ephemeral port)
    #[arg(long)]
    pub bind_port: Option<u16>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// Connect and show identity, capabilities, and media profiles
    Probe,

    /// Print the RTSP stream URI for a media profile
    StreamUri(ProfileArg),

    /// Print the JPEG snapshot URI for a media profile
    SnapshotUri(ProfileArg),

    /// Reboot the camera
    Reboot,
}

#[derive(Debug, Args)]
pub struct ProfileArg {
    /// Media profile token (defaults to the camera's first profile)
    #[arg(long, short = 'P')]
    pub profile: Option<String>,
}

// ── PTZ ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PtzArgs {
    #[command(subcommand)]
    pub command: PtzCommand,
}

#[derive(Debug, Subcommand)]
pub enum PtzCommand {
    /// Start a continuous move; velocities are in [-1, 1]
    Move {
        #[command(flatten)]
        profile: ProfileArg,

        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        pan: f32,

        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        tilt: f32,

        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        zoom: f32,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Stop movement
    Stop {
        #[command(flatten)]
        profile: ProfileArg,

        /// Stop pan/tilt only
        #[arg(long, conflicts_with = "zoom_only")]
        pan_tilt_only: bool,

        /// Stop zoom only
        #[arg(long)]
        zoom_only: bool,
    },

    /// Show position and move state
    Status(ProfileArg),
}

// ── Imaging ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ImagingArgs {
    #[command(subcommand)]
    pub command: ImagingCommand,
}

#[derive(Debug, Subcommand)]
pub enum ImagingCommand {
    /// Show the current imaging settings
    Get(ProfileArg),

    /// Change imaging settings; unset values are left untouched
    Set {
        #[command(flatten)]
        profile: ProfileArg,

        #[arg(long)]
        brightness: Option<f32>,

        #[arg(long)]
        contrast: Option<f32>,

        #[arg(long)]
        saturation: Option<f32>,

        #[arg(long)]
        sharpness: Option<f32>,

        /// IR cut filter mode
        #[arg(long, value_enum)]
        ir_cut: Option<IrCutMode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IrCutMode {
    On,
    Off,
    Auto,
}

impl IrCutMode {
    pub fn as_onvif(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Auto => "AUTO",
        }
    }
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between health checks
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Skip the initial discovery probe
    #[arg(long)]
    pub no_discovery: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (passwords masked)
    Show,

    /// Print the config file path
    Path,

    /// Store a camera password in the system keyring
    SetPassword {
        /// Camera name as used in the config file
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
