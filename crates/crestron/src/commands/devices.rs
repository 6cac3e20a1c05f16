//! Device, room, and sensor listing handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use crestron_core::{Bridge, DeviceKind, DeviceSnapshot, Payload, SensorReading};

use crate::cli::{DeviceListArgs, DevicesArgs, DevicesCommand, GlobalOpts, SortKey};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Detail view ─────────────────────────────────────────────────────

pub(super) fn detail(d: &Arc<DeviceSnapshot>) -> String {
    let mut lines = vec![
        format!("ID:       {}", d.id),
        format!("Kind:     {}", d.kind),
        format!("Name:     {}", d.name),
        format!("Room:     {}", d.room_name.as_deref().unwrap_or("-")),
        format!("Type:     {}", d.subtype.as_deref().unwrap_or("-")),
        format!("State:    {}", d.payload.summary()),
        format!("Link:     {}", d.connection),
    ];
    if let Some(pct) = d.payload.level_pct() {
        lines.push(format!("Level:    {pct}%"));
    }
    if !d.visible {
        lines.push("Hidden:   yes (matches an ignore pattern)".into());
    }
    if !d.enabled {
        lines.push("Enabled:  no (category disabled)".into());
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(bridge: &Bridge, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List(list) => {
            let devices = util::select_devices(bridge, None, &list);
            util::print_devices(&devices, global);
            Ok(())
        }

        DevicesCommand::Get { kind, id } => {
            let device = util::find_device(bridge, util::kind_of(kind), id)?;
            let out = output::render_single(&global.output, &device, detail, |d| d.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

// ── Rooms ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RoomEntry {
    id: u32,
    name: String,
    devices: usize,
}

#[derive(Tabled)]
struct RoomRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Devices")]
    devices: usize,
}

pub fn rooms(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let index = bridge.rooms();
    let devices = bridge.devices_snapshot();

    let entries: Vec<RoomEntry> = index
        .sorted()
        .into_iter()
        .map(|(id, name)| RoomEntry {
            id,
            name: name.to_owned(),
            devices: devices
                .iter()
                .filter(|d| d.visible && d.room_id == Some(id))
                .count(),
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &entries,
        |r| RoomRow {
            id: r.id,
            name: r.name.clone(),
            devices: r.devices,
        },
        |r| r.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Sensors ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Type")]
    subtype: String,
    #[tabled(rename = "Reading")]
    reading: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Link")]
    link: String,
}

fn sensor_row(d: &Arc<DeviceSnapshot>, color: bool) -> SensorRow {
    let battery = match d.payload {
        Payload::Sensor(SensorReading::Door {
            battery: Some(ref b),
            ..
        }) => b.clone(),
        _ => "-".into(),
    };
    SensorRow {
        id: d.id,
        name: d.name.clone(),
        room: d.room_name.clone().unwrap_or_else(|| "-".into()),
        subtype: d.subtype.clone().unwrap_or_else(|| "-".into()),
        reading: output::paint_state(&d.payload.summary(), color),
        battery,
        link: output::paint_state(&d.connection.to_string(), color),
    }
}

pub fn sensors(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let list = DeviceListArgs {
        room: None,
        kind: None,
        sort: SortKey::Room,
        all: false,
    };
    let devices = util::select_devices(bridge, Some(DeviceKind::Sensor), &list);
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &devices,
        |d| sensor_row(d, color),
        |d| d.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
