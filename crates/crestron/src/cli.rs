//! Clap derive structures for the `crestron` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// crestron -- inspect and drive a Crestron Home hub from the shell
#[derive(Debug, Parser)]
#[command(
    name = "crestron",
    version,
    about = "Inspect and control Crestron Home hubs from the command line",
    long_about = "Talks to the Crestron Home REST API (/cws/api) on the local hub.\n\n\
        Every command logs in, runs one reconciliation cycle so device state is\n\
        fresh, does its work, and logs out. `crestron watch` keeps polling.",
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
    /// Hub profile to use
    #[arg(long, short = 'p', env = "CRESTRON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Hub host or URL (overrides profile)
    #[arg(long, short = 'H', env = "CRESTRON_HOST", global = true)]
    pub host: Option<String>,

    /// Hub API token
    #[arg(long, env = "CRESTRON_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CRESTRON_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept the hub's self-signed TLS certificate
    #[arg(long, short = 'k', env = "CRESTRON_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "CRESTRON_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Device category, as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Light,
    Shade,
    Scene,
    Sensor,
    Lock,
    Thermostat,
    Security,
    Media,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect every polled device
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// List rooms
    Rooms,

    /// List and control lights
    #[command(alias = "l")]
    Lights(LightsArgs),

    /// List and control shades
    Shades(ShadesArgs),

    /// List and recall scenes
    Scenes(ScenesArgs),

    /// List sensors
    Sensors,

    /// List and operate door locks
    Locks(LocksArgs),

    /// List and adjust thermostats
    #[command(alias = "hvac")]
    Thermostats(ThermostatsArgs),

    /// List and arm/disarm security devices
    Security(SecurityArgs),

    /// List and control media rooms
    Media(MediaArgs),

    /// List and run quick actions
    #[command(alias = "qa")]
    QuickActions(QuickActionsArgs),

    /// Dump the raw JSON of any API path (e.g. `lights`, `thermostats/12`)
    Raw {
        /// Path under /cws/api
        path: String,
    },

    /// Keep polling and print every change until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Show one device
    Get {
        /// Device category
        kind: KindArg,
        /// Device id
        id: u32,
    },
}

/// Filters shared by every device listing.
#[derive(Debug, Clone, Args)]
pub struct DeviceListArgs {
    /// Only devices in this room (case-insensitive substring)
    #[arg(long, short = 'r')]
    pub room: Option<String>,

    /// Only devices of this category
    #[arg(long)]
    pub kind: Option<KindArg>,

    /// Sort order
    #[arg(long, short = 's', default_value = "room")]
    pub sort: SortKey,

    /// Include hidden (ignored or disabled) devices
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Name,
    Room,
    Status,
    Level,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LIGHTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LightsArgs {
    #[command(subcommand)]
    pub command: LightsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LightsCommand {
    /// List lights
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Turn lights on (full level)
    On {
        /// Light ids
        #[arg(required = true)]
        ids: Vec<u32>,
        /// Fade time in seconds
        #[arg(long, short = 't')]
        transition: Option<u32>,
    },

    /// Turn lights off
    Off {
        /// Light ids
        #[arg(required = true)]
        ids: Vec<u32>,
        /// Fade time in seconds
        #[arg(long, short = 't')]
        transition: Option<u32>,
    },

    /// Set brightness
    Set {
        /// Light ids
        #[arg(required = true)]
        ids: Vec<u32>,
        /// Brightness percentage (0-100)
        #[arg(long, short = 'b', value_parser = clap::value_parser!(u32).range(0..=100), conflicts_with = "raw")]
        brightness: Option<u32>,
        /// Raw level (0-65535)
        #[arg(long)]
        raw: Option<u32>,
        /// Fade time in seconds
        #[arg(long, short = 't')]
        transition: Option<u32>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SHADES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ShadesArgs {
    #[command(subcommand)]
    pub command: ShadesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShadesCommand {
    /// List shades
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Open shades fully
    Open {
        #[arg(required = true)]
        ids: Vec<u32>,
    },

    /// Close shades fully
    Close {
        #[arg(required = true)]
        ids: Vec<u32>,
    },

    /// Stop shades at their last reported position
    Stop {
        #[arg(required = true)]
        ids: Vec<u32>,
    },

    /// Move shades to a position
    Set {
        #[arg(required = true)]
        ids: Vec<u32>,
        /// Open percentage (0-100)
        #[arg(long, short = 'P', value_parser = clap::value_parser!(u32).range(0..=100))]
        position: u32,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SCENES & QUICK ACTIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ScenesArgs {
    #[command(subcommand)]
    pub command: ScenesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScenesCommand {
    /// List scenes
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Recall a scene
    Recall {
        /// Scene ids
        #[arg(required = true)]
        ids: Vec<u32>,
    },
}

#[derive(Debug, Args)]
pub struct QuickActionsArgs {
    #[command(subcommand)]
    pub command: QuickActionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum QuickActionsCommand {
    /// List quick actions
    #[command(alias = "ls")]
    List,

    /// Run a quick action
    Run {
        /// Quick action id
        id: u32,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOCKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LocksArgs {
    #[command(subcommand)]
    pub command: LocksCommand,
}

#[derive(Debug, Subcommand)]
pub enum LocksCommand {
    /// List door locks
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Lock doors
    Lock {
        #[arg(required = true)]
        ids: Vec<u32>,
    },

    /// Unlock doors
    Unlock {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  THERMOSTATS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ThermostatsArgs {
    #[command(subcommand)]
    pub command: ThermostatsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ThermostatsCommand {
    /// List thermostats
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Show a thermostat's setpoints, bounds and modes
    Get { id: u32 },

    /// Write setpoints, in tenths of a degree (e.g. --set Heat=680)
    Setpoint {
        id: u32,
        /// KIND=TENTHS pairs
        #[arg(long = "set", required = true, value_name = "KIND=TENTHS")]
        setpoints: Vec<String>,
    },

    /// Change the system mode
    Mode { id: u32, mode: String },

    /// Change the fan mode
    Fan { id: u32, mode: String },

    /// Change the scheduler state
    Schedule { id: u32, state: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SECURITY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SecurityArgs {
    #[command(subcommand)]
    pub command: SecurityCommand,
}

#[derive(Debug, Subcommand)]
pub enum SecurityCommand {
    /// List security devices and their available states
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Request a state change (e.g. ArmAway, Disarm)
    Set { id: u32, state: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MEDIA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MediaArgs {
    #[command(subcommand)]
    pub command: MediaCommand,
}

#[derive(Debug, Subcommand)]
pub enum MediaCommand {
    /// List media rooms
    #[command(alias = "ls")]
    List(DeviceListArgs),

    /// Power a media room on or off
    Power {
        id: u32,
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },

    /// Set the volume
    Volume {
        id: u32,
        /// Volume percentage (0-100)
        #[arg(value_parser = clap::value_parser!(u32).range(0..=100))]
        percent: u32,
    },

    /// Mute a media room
    Mute { id: u32 },

    /// Unmute a media room
    Unmute { id: u32 },

    /// Select a source (provider id)
    Source { id: u32, source: u32 },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Override the profile's poll interval (seconds, minimum 10)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (host, scheme, token_env, poll_interval, ...)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a hub token in the system keyring
    SetToken {
        /// Profile name (defaults to active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
