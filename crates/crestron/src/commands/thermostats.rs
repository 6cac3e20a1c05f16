//! Thermostat command handlers.
//!
//! Temperatures stay in the hub's native tenths of a degree on both input
//! and output; the `Units` column says which scale.

use std::sync::Arc;

use tabled::Tabled;

use crestron_core::{Action, Bridge, Command, DeviceKind, DeviceSnapshot, Payload, Setpoint, ThermostatState};

use crate::cli::{GlobalOpts, ThermostatsArgs, ThermostatsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ThermostatRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Fan")]
    fan: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Setpoints")]
    setpoints: String,
    #[tabled(rename = "Units")]
    units: String,
}

fn state_of(d: &DeviceSnapshot) -> Option<&ThermostatState> {
    match d.payload {
        Payload::Thermostat(ref t) => Some(t),
        _ => None,
    }
}

fn tenths(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{sign}{}.{}", abs / 10, abs % 10)
}

fn setpoint_list(t: &ThermostatState) -> String {
    if t.setpoints.is_empty() {
        return "-".into();
    }
    t.setpoints
        .iter()
        .map(|s| format!("{} {}", s.kind, tenths(s.temperature)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn row(d: &Arc<DeviceSnapshot>) -> ThermostatRow {
    let dash = || "-".to_string();
    let t = state_of(d);
    ThermostatRow {
        id: d.id,
        name: d.name.clone(),
        room: d.room_name.clone().unwrap_or_else(dash),
        mode: t.and_then(|t| t.mode.clone()).unwrap_or_else(dash),
        fan: t.and_then(|t| t.fan_mode.clone()).unwrap_or_else(dash),
        current: t
            .and_then(|t| t.current_temperature)
            .map_or_else(dash, tenths),
        setpoints: t.map_or_else(dash, setpoint_list),
        units: t.and_then(|t| t.units.clone()).unwrap_or_else(dash),
    }
}

fn detail(d: &Arc<DeviceSnapshot>) -> String {
    let mut lines = vec![
        format!("ID:         {}", d.id),
        format!("Name:       {}", d.name),
        format!("Room:       {}", d.room_name.as_deref().unwrap_or("-")),
        format!("Link:       {}", d.connection),
    ];
    if let Some(t) = state_of(d) {
        lines.push(format!("Mode:       {}", t.mode.as_deref().unwrap_or("-")));
        lines.push(format!("Fan:        {}", t.fan_mode.as_deref().unwrap_or("-")));
        lines.push(format!(
            "Schedule:   {}",
            t.scheduler_state.as_deref().unwrap_or("-")
        ));
        lines.push(format!(
            "Current:    {} {}",
            t.current_temperature.map_or_else(|| "-".into(), tenths),
            t.units.as_deref().unwrap_or("")
        ));
        lines.push(format!("Setpoints:  {}", setpoint_list(t)));
        for b in &t.bounds {
            lines.push(format!(
                "  {:<9} {} .. {}",
                b.kind,
                tenths(b.min),
                tenths(b.max)
            ));
        }
        if !t.available_modes.is_empty() {
            lines.push(format!("Modes:      {}", t.available_modes.join(", ")));
        }
        if !t.available_fan_modes.is_empty() {
            lines.push(format!("Fan modes:  {}", t.available_fan_modes.join(", ")));
        }
    }
    lines.join("\n")
}

/// Parse `KIND=TENTHS` pairs.
fn parse_setpoints(raw: &[String]) -> Result<Vec<Setpoint>, CliError> {
    raw.iter()
        .map(|pair| {
            let (kind, value) = pair.split_once('=').ok_or_else(|| CliError::Validation {
                field: "set".into(),
                reason: format!("expected KIND=TENTHS, got '{pair}'"),
            })?;
            let temperature = value.trim().parse::<i64>().map_err(|_| CliError::Validation {
                field: "set".into(),
                reason: format!("'{value}' is not a whole number of tenths"),
            })?;
            Ok(Setpoint {
                kind: kind.trim().to_owned(),
                temperature,
            })
        })
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    bridge: &Bridge,
    args: ThermostatsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (id, action) = match args.command {
        ThermostatsCommand::List(list) => {
            let devices = util::select_devices(bridge, Some(DeviceKind::Thermostat), &list);
            let out = output::render_list(&global.output, &devices, row, |d| d.id.to_string());
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        ThermostatsCommand::Get { id } => {
            let device = util::find_device(bridge, DeviceKind::Thermostat, id)?;
            let out = output::render_single(&global.output, &device, detail, |d| d.id.to_string());
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        ThermostatsCommand::Setpoint { id, setpoints } => (
            id,
            Action::SetSetpoints {
                setpoints: parse_setpoints(&setpoints)?,
            },
        ),
        ThermostatsCommand::Mode { id, mode } => (id, Action::SetMode { mode }),
        ThermostatsCommand::Fan { id, mode } => (id, Action::SetFanMode { mode }),
        ThermostatsCommand::Schedule { id, state } => (id, Action::SetScheduler { state }),
    };

    util::run_command(bridge, Command::single(DeviceKind::Thermostat, id, action), global).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tenths_format_with_one_decimal() {
        assert_eq!(tenths(685), "68.5");
        assert_eq!(tenths(-15), "-1.5");
        assert_eq!(tenths(0), "0.0");
    }

    #[test]
    fn setpoint_pairs_parse() {
        let parsed = parse_setpoints(&["Heat=680".into(), " Cool = 740".into()]).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].kind, "Cool");
        assert_eq!(parsed[1].temperature, 740);
    }

    #[test]
    fn malformed_setpoint_is_rejected() {
        assert!(parse_setpoints(&["Heat:680".into()]).is_err());
        assert!(parse_setpoints(&["Heat=warm".into()]).is_err());
    }
}
