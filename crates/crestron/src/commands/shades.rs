//! Shade command handlers.

use crestron_core::convert::percent_to_level;
use crestron_core::{Action, Bridge, Command, DeviceKind};

use crate::cli::{GlobalOpts, ShadesArgs, ShadesCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(bridge: &Bridge, args: ShadesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (ids, action) = match args.command {
        ShadesCommand::List(list) => {
            let devices = util::select_devices(bridge, Some(DeviceKind::Shade), &list);
            util::print_devices(&devices, global);
            return Ok(());
        }
        ShadesCommand::Open { ids } => (ids, Action::Open),
        ShadesCommand::Close { ids } => (ids, Action::Close),
        ShadesCommand::Stop { ids } => (ids, Action::Stop),
        ShadesCommand::Set { ids, position } => (
            ids,
            Action::SetPosition {
                position: percent_to_level(position),
            },
        ),
    };

    util::run_command(bridge, Command::new(DeviceKind::Shade, ids, action), global).await
}
