//! Door lock command handlers.

use crestron_core::{Action, Bridge, Command, DeviceKind};

use crate::cli::{GlobalOpts, LocksArgs, LocksCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(bridge: &Bridge, args: LocksArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (ids, action) = match args.command {
        LocksCommand::List(list) => {
            let devices = util::select_devices(bridge, Some(DeviceKind::Lock), &list);
            util::print_devices(&devices, global);
            return Ok(());
        }
        LocksCommand::Lock { ids } => (ids, Action::Lock),
        LocksCommand::Unlock { ids } => (ids, Action::Unlock),
    };

    util::run_command(bridge, Command::new(DeviceKind::Lock, ids, action), global).await
}
