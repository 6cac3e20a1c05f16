//! Light command handlers.

use crestron_core::convert::{MAX_LEVEL, percent_to_level};
use crestron_core::{Action, Bridge, Command, DeviceKind};

use crate::cli::{GlobalOpts, LightsArgs, LightsCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(bridge: &Bridge, args: LightsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (ids, action) = match args.command {
        LightsCommand::List(list) => {
            let devices = util::select_devices(bridge, Some(DeviceKind::Light), &list);
            util::print_devices(&devices, global);
            return Ok(());
        }
        LightsCommand::On { ids, transition } => (ids, Action::TurnOn { transition }),
        LightsCommand::Off { ids, transition } => (ids, Action::TurnOff { transition }),
        LightsCommand::Set {
            ids,
            brightness,
            raw,
            transition,
        } => {
            let level = match (brightness, raw) {
                (Some(pct), _) => percent_to_level(pct),
                (None, Some(raw)) => raw,
                (None, None) => {
                    return Err(CliError::Validation {
                        field: "brightness".into(),
                        reason: "pass --brightness <0-100> or --raw <0-65535>".into(),
                    });
                }
            };
            if level > MAX_LEVEL {
                return Err(CliError::Validation {
                    field: "raw".into(),
                    reason: format!("level must be 0-{MAX_LEVEL}, got {level}"),
                });
            }
            (ids, Action::SetLevel { level, transition })
        }
    };

    util::run_command(bridge, Command::new(DeviceKind::Light, ids, action), global).await
}
