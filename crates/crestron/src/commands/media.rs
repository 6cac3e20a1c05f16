//! Media room handlers.

use std::sync::Arc;

use tabled::Tabled;

use crestron_core::convert::percent_to_level;
use crestron_core::{Action, Bridge, Command, DeviceKind, DeviceSnapshot, MediaState, Payload};

use crate::cli::{GlobalOpts, MediaArgs, MediaCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct MediaRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Volume")]
    volume: String,
    #[tabled(rename = "Muted")]
    muted: String,
    #[tabled(rename = "Source")]
    source: String,
}

fn flag(value: Option<bool>, yes: &str, no: &str) -> String {
    match value {
        Some(true) => yes.into(),
        Some(false) => no.into(),
        None => "-".into(),
    }
}

fn source_name(m: &MediaState) -> String {
    match m.source_id {
        Some(id) => m
            .sources
            .iter()
            .find(|s| s.id == id)
            .map_or_else(|| id.to_string(), |s| s.name.clone()),
        None => "-".into(),
    }
}

fn row(d: &Arc<DeviceSnapshot>, color: bool) -> MediaRow {
    let Payload::Media(ref m) = d.payload else {
        return MediaRow {
            id: d.id,
            name: d.name.clone(),
            power: "-".into(),
            volume: "-".into(),
            muted: "-".into(),
            source: "-".into(),
        };
    };
    MediaRow {
        id: d.id,
        name: d.name.clone(),
        power: output::paint_state(&flag(m.power, "on", "off"), color),
        volume: if m.volume_control {
            m.volume_pct.map_or_else(|| "-".into(), |v| format!("{v}%"))
        } else {
            "n/a".into()
        },
        muted: if m.mute_control {
            flag(m.muted, "yes", "no")
        } else {
            "n/a".into()
        },
        source: source_name(m),
    }
}

pub async fn handle(bridge: &Bridge, args: MediaArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (id, action) = match args.command {
        MediaCommand::List(list) => {
            let devices = util::select_devices(bridge, Some(DeviceKind::MediaRoom), &list);
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &devices,
                |d| row(d, color),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        MediaCommand::Power { id, state } => (id, Action::SetPower { on: state == "on" }),
        MediaCommand::Volume { id, percent } => (
            id,
            Action::SetVolume {
                level: percent_to_level(percent),
            },
        ),
        MediaCommand::Mute { id } => (id, Action::SetMute { muted: true }),
        MediaCommand::Unmute { id } => (id, Action::SetMute { muted: false }),
        MediaCommand::Source { id, source } => (id, Action::SelectSource { source_id: source }),
    };

    util::run_command(bridge, Command::single(DeviceKind::MediaRoom, id, action), global).await
}
