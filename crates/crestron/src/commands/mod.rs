//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod lights;
pub mod locks;
pub mod media;
pub mod raw;
pub mod scenes;
pub mod security;
pub mod shades;
pub mod thermostats;
pub mod util;
pub mod watch;

use crestron_core::Bridge;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a hub-bound command to the appropriate handler.
///
/// The bridge has already completed its first reconciliation cycle, so
/// listings read the store and commands validate against fresh state.
pub async fn dispatch(cmd: Command, bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(bridge, args, global),
        Command::Rooms => devices::rooms(bridge, global),
        Command::Sensors => devices::sensors(bridge, global),
        Command::Lights(args) => lights::handle(bridge, args, global).await,
        Command::Shades(args) => shades::handle(bridge, args, global).await,
        Command::Scenes(args) => scenes::handle(bridge, args, global).await,
        Command::QuickActions(args) => scenes::quick_actions(bridge, args, global).await,
        Command::Locks(args) => locks::handle(bridge, args, global).await,
        Command::Thermostats(args) => thermostats::handle(bridge, args, global).await,
        Command::Security(args) => security::handle(bridge, args, global).await,
        Command::Media(args) => media::handle(bridge, args, global).await,
        Command::Raw { path } => raw::handle(bridge, &path, global).await,
        // Handled before a bridge exists.
        Command::Watch(_) | Command::Config(_) | Command::Completions(_) => Err(
            CliError::Internal("command does not run through the one-shot bridge".into()),
        ),
    }
}
