//! Shared helpers for command handlers.

use std::sync::Arc;

use tabled::Tabled;

use crestron_core::{Bridge, Command, CommandOutcome, DeviceKind, DeviceSnapshot};

use crate::cli::{DeviceListArgs, GlobalOpts, KindArg, SortKey};
use crate::error::CliError;
use crate::output;

/// Map the CLI category to the core one.
pub fn kind_of(arg: KindArg) -> DeviceKind {
    match arg {
        KindArg::Light => DeviceKind::Light,
        KindArg::Shade => DeviceKind::Shade,
        KindArg::Scene => DeviceKind::Scene,
        KindArg::Sensor => DeviceKind::Sensor,
        KindArg::Lock => DeviceKind::Lock,
        KindArg::Thermostat => DeviceKind::Thermostat,
        KindArg::Security => DeviceKind::SecurityDevice,
        KindArg::Media => DeviceKind::MediaRoom,
    }
}

/// Subcommand that lists a category, for "not found" help text.
pub fn list_command(kind: DeviceKind) -> &'static str {
    match kind {
        DeviceKind::Light => "lights list",
        DeviceKind::Shade => "shades list",
        DeviceKind::Scene => "scenes list",
        DeviceKind::Sensor => "sensors",
        DeviceKind::Lock => "locks list",
        DeviceKind::Thermostat => "thermostats list",
        DeviceKind::SecurityDevice => "security list",
        DeviceKind::MediaRoom => "media list",
    }
}

// ── Listing ─────────────────────────────────────────────────────────

/// Devices from the bridge's snapshot, filtered and sorted per `args`.
///
/// `kind` pins the category for per-category subcommands; otherwise
/// `args.kind` applies.
pub fn select_devices(
    bridge: &Bridge,
    kind: Option<DeviceKind>,
    args: &DeviceListArgs,
) -> Vec<Arc<DeviceSnapshot>> {
    let kind = kind.or(args.kind.map(kind_of));
    let room = args.room.as_deref().map(str::to_lowercase);

    let mut devices: Vec<Arc<DeviceSnapshot>> = bridge
        .devices_snapshot()
        .iter()
        .filter(|d| args.all || d.visible)
        .filter(|d| kind.is_none_or(|k| d.kind == k))
        .filter(|d| match room {
            Some(ref needle) => d
                .room_name
                .as_deref()
                .is_some_and(|r| r.to_lowercase().contains(needle.as_str())),
            None => true,
        })
        .cloned()
        .collect();

    sort_devices(&mut devices, args.sort);
    devices
}

fn sort_devices(devices: &mut [Arc<DeviceSnapshot>], key: SortKey) {
    match key {
        SortKey::Name => devices.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
        SortKey::Room => devices.sort_by(|a, b| {
            a.room_name
                .cmp(&b.room_name)
                .then_with(|| a.name.cmp(&b.name))
                .then(a.id.cmp(&b.id))
        }),
        SortKey::Status => devices.sort_by(|a, b| {
            a.payload
                .summary()
                .cmp(&b.payload.summary())
                .then_with(|| a.name.cmp(&b.name))
        }),
        // Highest level first; categories without one sink to the bottom.
        SortKey::Level => devices.sort_by(|a, b| {
            b.payload
                .level_pct()
                .cmp(&a.payload.level_pct())
                .then_with(|| a.name.cmp(&b.name))
        }),
    }
}

// ── Generic device table ────────────────────────────────────────────

#[derive(Tabled)]
pub struct DeviceRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Type")]
    subtype: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Link")]
    link: String,
}

impl DeviceRow {
    pub fn new(d: &DeviceSnapshot, color: bool) -> Self {
        let mut name = d.name.clone();
        if !d.visible {
            name.push_str(" (hidden)");
        }
        Self {
            id: d.id,
            kind: d.kind.to_string(),
            name,
            room: d.room_name.clone().unwrap_or_else(|| "-".into()),
            subtype: d.subtype.clone().unwrap_or_else(|| "-".into()),
            state: output::paint_state(&d.payload.summary(), color),
            level: d
                .payload
                .level_pct()
                .map_or_else(|| "-".into(), |pct| format!("{pct}%")),
            link: output::paint_state(&d.connection.to_string(), color),
        }
    }
}

/// Print a device list with the generic row layout.
pub fn print_devices(devices: &[Arc<DeviceSnapshot>], global: &GlobalOpts) {
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        devices,
        |d| DeviceRow::new(d, color),
        |d| d.id.to_string(),
    );
    output::print_output(&out, global.quiet);
}

/// Look up one device or fail with a pointer to the listing command.
pub fn find_device(
    bridge: &Bridge,
    kind: DeviceKind,
    id: u32,
) -> Result<Arc<DeviceSnapshot>, CliError> {
    bridge.device(kind, id).ok_or_else(|| CliError::NotFound {
        resource_type: kind.to_string(),
        identifier: id.to_string(),
        list_command: list_command(kind).into(),
    })
}

// ── Commands ────────────────────────────────────────────────────────

/// Run a command through the bridge, print the outcome, and surface
/// anything short of full success as an error.
pub async fn run_command(
    bridge: &Bridge,
    cmd: Command,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let verb = cmd.action.name();
    tracing::debug!(kind = %cmd.kind, ids = ?cmd.ids, action = verb, "sending command");

    let outcome = bridge.execute(cmd).await?;
    print_outcome(verb, &outcome, global);
    outcome.into_result()?;
    Ok(())
}

/// Report a command outcome: a short line on stderr for tables, the
/// serialized outcome otherwise.
pub fn print_outcome(verb: &str, outcome: &CommandOutcome, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    match global.output {
        crate::cli::OutputFormat::Table | crate::cli::OutputFormat::Plain => {
            if outcome.is_success() {
                eprintln!("✓ {verb} accepted for {}", join_ids(&outcome.accepted));
            } else if !outcome.accepted.is_empty() {
                eprintln!("  {verb} accepted for {}", join_ids(&outcome.accepted));
            }
        }
        _ => {
            let out = output::render_single(
                &global.output,
                outcome,
                |_| String::new(),
                |o| o.status.to_string(),
            );
            output::print_output(&out, false);
        }
    }
}

fn join_ids(ids: &[u32]) -> String {
    if ids.is_empty() {
        return "no devices".into();
    }
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
