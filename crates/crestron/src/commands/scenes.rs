//! Scene and quick action handlers.

use std::sync::Arc;

use tabled::Tabled;

use crestron_core::{Action, Bridge, Command, DeviceKind, DeviceSnapshot, Payload, QuickActionRecord};

use crate::cli::{GlobalOpts, QuickActionsArgs, QuickActionsCommand, ScenesArgs, ScenesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Scenes ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SceneRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Type")]
    scene_type: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn scene_row(d: &Arc<DeviceSnapshot>, color: bool) -> SceneRow {
    let scene_type = match d.payload {
        Payload::Scene {
            scene_type: Some(ref t),
            ..
        } => t.clone(),
        _ => "-".into(),
    };
    SceneRow {
        id: d.id,
        name: d.name.clone(),
        room: d.room_name.clone().unwrap_or_else(|| "-".into()),
        scene_type,
        status: output::paint_state(&d.payload.summary(), color),
    }
}

pub async fn handle(bridge: &Bridge, args: ScenesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ScenesCommand::List(list) => {
            let devices = util::select_devices(bridge, Some(DeviceKind::Scene), &list);
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &devices,
                |d| scene_row(d, color),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ScenesCommand::Recall { ids } => {
            util::run_command(
                bridge,
                Command::new(DeviceKind::Scene, ids, Action::Recall),
                global,
            )
            .await
        }
    }
}

// ── Quick actions ───────────────────────────────────────────────────

#[derive(Tabled)]
struct QuickActionRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
}

pub async fn quick_actions(
    bridge: &Bridge,
    args: QuickActionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        QuickActionsCommand::List => {
            let actions = bridge.quick_actions().await?;
            let out = output::render_list(
                &global.output,
                &actions,
                |a: &QuickActionRecord| QuickActionRow {
                    id: a.id,
                    name: a.name.clone(),
                },
                |a| a.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        QuickActionsCommand::Run { id } => {
            let outcome = bridge.recall_quick_action(id).await?;
            util::print_outcome("quick action", &outcome, global);
            outcome.into_result()?;
            Ok(())
        }
    }
}
