//! Security device handlers.

use std::sync::Arc;

use tabled::Tabled;

use crestron_core::{Action, Bridge, Command, DeviceKind, DeviceSnapshot, Payload};

use crate::cli::{GlobalOpts, SecurityArgs, SecurityCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct SecurityRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Link")]
    link: String,
}

fn row(d: &Arc<DeviceSnapshot>, color: bool) -> SecurityRow {
    let available = match d.payload {
        Payload::Security { ref available, .. } if !available.is_empty() => available.join(", "),
        _ => "-".into(),
    };
    SecurityRow {
        id: d.id,
        name: d.name.clone(),
        state: d.payload.summary(),
        available,
        link: output::paint_state(&d.connection.to_string(), color),
    }
}

pub async fn handle(bridge: &Bridge, args: SecurityArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SecurityCommand::List(list) => {
            let devices = util::select_devices(bridge, Some(DeviceKind::SecurityDevice), &list);
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &devices,
                |d| row(d, color),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SecurityCommand::Set { id, state } => {
            let cmd = Command::single(
                DeviceKind::SecurityDevice,
                id,
                Action::SetSecurityState { state },
            );
            util::run_command(bridge, cmd, global).await
        }
    }
}
