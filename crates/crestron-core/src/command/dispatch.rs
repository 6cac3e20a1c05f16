// ── Command dispatch ──
//
// Validates a `Command` against the store's last known snapshots and maps
// it onto crestron-api action calls. Nothing reaches the network until
// every target and argument has been checked.

use std::sync::Arc;

use crestron_api::{CrestronClient, LightState, SetPointValue, ShadeState};
use futures_util::future::join_all;
use tracing::debug;

use super::{Action, Command, CommandOutcome};
use crate::convert::MAX_LEVEL;
use crate::error::CoreError;
use crate::model::{DeviceKind, DeviceSnapshot, Payload};
use crate::store::DataStore;

pub(crate) struct Dispatcher<'a> {
    client: &'a CrestronClient,
    store: &'a DataStore,
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn new(client: &'a CrestronClient, store: &'a DataStore) -> Self {
        Self { client, store }
    }

    pub(crate) async fn dispatch(&self, cmd: Command) -> Result<CommandOutcome, CoreError> {
        let targets = self.validate(&cmd)?;
        debug!(
            action = cmd.action.name(),
            kind = %cmd.kind,
            ids = ?cmd.ids,
            "dispatching command"
        );

        match &cmd.action {
            Action::TurnOn { transition } => {
                self.send_lights(&targets, MAX_LEVEL, *transition).await
            }
            Action::TurnOff { transition } => self.send_lights(&targets, 0, *transition).await,
            Action::SetLevel { level, transition } => {
                self.send_lights(&targets, *level, *transition).await
            }
            Action::Open => self.send_shades(&targets, Some(MAX_LEVEL)).await,
            Action::Close => self.send_shades(&targets, Some(0)).await,
            Action::Stop => self.send_shades(&targets, None).await,
            Action::SetPosition { position } => self.send_shades(&targets, Some(*position)).await,
            action => self.send_each(&cmd.ids, action).await,
        }
    }

    // ── Validation ───────────────────────────────────────────────────

    fn validate(&self, cmd: &Command) -> Result<Vec<Arc<DeviceSnapshot>>, CoreError> {
        if cmd.ids.is_empty() {
            return Err(CoreError::validation("command names no target devices"));
        }
        if cmd.action.kind() != cmd.kind {
            return Err(CoreError::Unsupported {
                operation: cmd.action.name().to_owned(),
                kind: cmd.kind.to_string(),
            });
        }

        let targets = cmd
            .ids
            .iter()
            .map(|&id| {
                self.store
                    .device(cmd.kind, id)
                    .ok_or_else(|| CoreError::DeviceNotFound {
                        kind: cmd.kind.to_string(),
                        id,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for target in &targets {
            check_action(&cmd.action, target)?;
        }
        Ok(targets)
    }

    // ── Batch categories ─────────────────────────────────────────────

    async fn send_lights(
        &self,
        targets: &[Arc<DeviceSnapshot>],
        level: u32,
        transition: Option<u32>,
    ) -> Result<CommandOutcome, CoreError> {
        let states: Vec<LightState> = targets
            .iter()
            .map(|t| {
                let dimmable = matches!(t.payload, Payload::Light { dimmable: true, .. });
                LightState {
                    id: t.id,
                    level: if !dimmable && level > 0 { MAX_LEVEL } else { level },
                    time: transition.unwrap_or(0),
                }
            })
            .collect();
        let ids: Vec<u32> = states.iter().map(|s| s.id).collect();
        let resp = self.client.set_light_levels(&states).await?;
        Ok(CommandOutcome::from_response(&ids, &resp))
    }

    /// `None` re-sends each shade's last known position.
    async fn send_shades(
        &self,
        targets: &[Arc<DeviceSnapshot>],
        position: Option<u32>,
    ) -> Result<CommandOutcome, CoreError> {
        let states = targets
            .iter()
            .map(|t| {
                let last = match t.payload {
                    Payload::Shade { position, .. } => position,
                    _ => None,
                };
                let position = position.or(last).ok_or_else(|| {
                    CoreError::Internal(format!("no position to send for shade {}", t.id))
                })?;
                Ok(ShadeState { id: t.id, position })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;
        let ids: Vec<u32> = states.iter().map(|s| s.id).collect();
        let resp = self.client.set_shade_positions(&states).await?;
        Ok(CommandOutcome::from_response(&ids, &resp))
    }

    // ── Per-device categories ────────────────────────────────────────

    async fn send_each(&self, ids: &[u32], action: &Action) -> Result<CommandOutcome, CoreError> {
        let results = join_all(ids.iter().map(|&id| async move {
            let resp = self.send_one(id, action).await?;
            Ok::<_, CoreError>(CommandOutcome::from_response(&[id], &resp))
        }))
        .await;

        let mut outcomes = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    debug!(id, error = %e, "device command failed");
                    outcomes.push(CommandOutcome {
                        status: super::OutcomeStatus::Failure,
                        accepted: Vec::new(),
                        failed: vec![*id],
                        message: Some(e.to_string()),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        // Nothing got through: surface the underlying error instead of a
        // failure outcome.
        if let Some(err) = first_error {
            if outcomes.iter().all(|o| o.accepted.is_empty()) {
                return Err(err);
            }
        }
        Ok(CommandOutcome::merge(outcomes))
    }

    async fn send_one(
        &self,
        id: u32,
        action: &Action,
    ) -> Result<crestron_api::ActionResponse, CoreError> {
        let c = self.client;
        let resp = match action {
            Action::Recall => c.recall_scene(id).await,
            Action::Lock => c.lock_door(id).await,
            Action::Unlock => c.unlock_door(id).await,
            Action::SetSetpoints { setpoints } => {
                let values: Vec<SetPointValue> = setpoints
                    .iter()
                    .map(|s| SetPointValue {
                        kind: s.kind.clone(),
                        temperature: s.temperature,
                    })
                    .collect();
                c.set_thermostat_setpoints(id, &values).await
            }
            Action::SetMode { mode } => c.set_thermostat_mode(id, mode).await,
            Action::SetFanMode { mode } => c.set_thermostat_fan_mode(id, mode).await,
            Action::SetScheduler { state } => c.set_thermostat_scheduler(id, state).await,
            Action::SetSecurityState { state } => c.set_security_state(id, state).await,
            Action::SetVolume { level } => c.set_media_volume(id, *level).await,
            Action::SetMute { muted } => c.set_media_mute(id, *muted).await,
            Action::SetPower { on } => c.set_media_power(id, *on).await,
            Action::SelectSource { source_id } => c.select_media_source(id, *source_id).await,
            Action::TurnOn { .. }
            | Action::TurnOff { .. }
            | Action::SetLevel { .. }
            | Action::Open
            | Action::Close
            | Action::Stop
            | Action::SetPosition { .. } => {
                return Err(CoreError::Internal(format!(
                    "{} is a batch action",
                    action.name()
                )));
            }
        };
        Ok(resp?)
    }
}

// ── Argument checks ──────────────────────────────────────────────────

fn unsupported(action: &Action, target: &DeviceSnapshot) -> CoreError {
    CoreError::Unsupported {
        operation: action.name().to_owned(),
        kind: format!("{} {}", target.kind, target.display_name()),
    }
}

fn check_in(list: &[String], value: &str, what: &str, target: &DeviceSnapshot) -> Result<(), CoreError> {
    if list.is_empty() || list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "{what} '{value}' not offered by {} (expected one of: {})",
            target.display_name(),
            list.join(", ")
        )))
    }
}

fn check_level(value: u32, what: &str) -> Result<(), CoreError> {
    if value > MAX_LEVEL {
        return Err(CoreError::validation(format!(
            "{what} {value} out of range 0..={MAX_LEVEL}"
        )));
    }
    Ok(())
}

fn check_action(action: &Action, target: &DeviceSnapshot) -> Result<(), CoreError> {
    match (action, &target.payload) {
        (Action::SetLevel { level, .. }, _) => check_level(*level, "level"),
        (Action::SetPosition { position }, _) => check_level(*position, "position"),
        (Action::Stop, Payload::Shade { position: None, .. }) => Err(CoreError::validation(
            format!("{} has no known position to hold", target.display_name()),
        )),
        (Action::SetVolume { level }, Payload::Media(media)) => {
            if !media.volume_control {
                return Err(unsupported(action, target));
            }
            check_level(*level, "volume")
        }
        (Action::SetMute { .. }, Payload::Media(media)) if !media.mute_control => {
            Err(unsupported(action, target))
        }
        (Action::SelectSource { source_id }, Payload::Media(media)) => {
            if media.sources.is_empty() || media.sources.iter().any(|s| s.id == *source_id) {
                Ok(())
            } else {
                Err(CoreError::validation(format!(
                    "source {source_id} is not available in {}",
                    target.display_name()
                )))
            }
        }
        (Action::SetSetpoints { setpoints }, Payload::Thermostat(state)) => {
            if setpoints.is_empty() {
                return Err(CoreError::validation("no setpoints given"));
            }
            for sp in setpoints {
                match state.bounds_for(&sp.kind) {
                    Some(bounds) if !bounds.contains(sp.temperature) => {
                        return Err(CoreError::validation(format!(
                            "{} setpoint {} outside {}..={}",
                            sp.kind, sp.temperature, bounds.min, bounds.max
                        )));
                    }
                    None if !state.bounds.is_empty() => {
                        return Err(CoreError::validation(format!(
                            "{} does not accept a {} setpoint",
                            target.display_name(),
                            sp.kind
                        )));
                    }
                    _ => {}
                }
            }
            Ok(())
        }
        (Action::SetMode { mode }, Payload::Thermostat(state)) => {
            check_in(&state.available_modes, mode, "mode", target)
        }
        (Action::SetFanMode { mode }, Payload::Thermostat(state)) => {
            check_in(&state.available_fan_modes, mode, "fan mode", target)
        }
        (Action::SetSecurityState { .. }, Payload::Security { available, .. })
            if available.is_empty() =>
        {
            Err(CoreError::validation(format!(
                "{} reports no settable security states",
                target.display_name()
            )))
        }
        (Action::SetSecurityState { state }, Payload::Security { available, .. }) => {
            check_in(available, state, "security state", target)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{
        ConnectionStatus, MediaSource, MediaState, Setpoint, SetpointBounds, ThermostatState,
    };

    fn snapshot(kind: DeviceKind, payload: Payload) -> DeviceSnapshot {
        DeviceSnapshot {
            id: 7,
            kind,
            subtype: None,
            name: "Den".into(),
            room_id: None,
            room_name: None,
            enabled: true,
            visible: true,
            connection: ConnectionStatus::Online,
            payload,
        }
    }

    fn thermostat() -> DeviceSnapshot {
        snapshot(
            DeviceKind::Thermostat,
            Payload::Thermostat(ThermostatState {
                bounds: vec![SetpointBounds {
                    kind: "Heat".into(),
                    min: 500,
                    max: 900,
                }],
                available_modes: vec!["Heat".into(), "Off".into()],
                ..ThermostatState::default()
            }),
        )
    }

    #[test]
    fn level_above_max_is_rejected() {
        let light = snapshot(
            DeviceKind::Light,
            Payload::Light {
                level: Some(0),
                brightness_pct: Some(0),
                dimmable: true,
            },
        );
        let action = Action::SetLevel {
            level: 70_000,
            transition: None,
        };
        assert!(matches!(
            check_action(&action, &light),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn setpoint_checks_bounds_and_kind() {
        let t = thermostat();
        let within = Action::SetSetpoints {
            setpoints: vec![Setpoint {
                kind: "heat".into(),
                temperature: 700,
            }],
        };
        assert!(check_action(&within, &t).is_ok());

        let above = Action::SetSetpoints {
            setpoints: vec![Setpoint {
                kind: "Heat".into(),
                temperature: 950,
            }],
        };
        assert!(check_action(&above, &t).is_err());

        let unknown = Action::SetSetpoints {
            setpoints: vec![Setpoint {
                kind: "Cool".into(),
                temperature: 700,
            }],
        };
        assert!(check_action(&unknown, &t).is_err());
    }

    #[test]
    fn mode_must_be_offered() {
        let t = thermostat();
        assert!(check_action(&Action::SetMode { mode: "off".into() }, &t).is_ok());
        assert!(check_action(&Action::SetMode { mode: "Cool".into() }, &t).is_err());
    }

    #[test]
    fn security_state_must_be_listed() {
        let panel = |available: Vec<String>| {
            snapshot(
                DeviceKind::SecurityDevice,
                Payload::Security {
                    current: Some("Disarmed".into()),
                    available,
                },
            )
        };
        let arm = |state: &str| Action::SetSecurityState {
            state: state.into(),
        };

        let listed = panel(vec!["Disarmed".into(), "Armed Away".into()]);
        assert!(check_action(&arm("armed away"), &listed).is_ok());
        assert!(check_action(&arm("Armed Stay"), &listed).is_err());

        let silent = panel(Vec::new());
        assert!(matches!(
            check_action(&arm("Disarmed"), &silent),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn stop_needs_a_known_position() {
        let shade = |position: Option<u32>| {
            snapshot(
                DeviceKind::Shade,
                Payload::Shade {
                    position,
                    open_pct: None,
                },
            )
        };
        assert!(check_action(&Action::Stop, &shade(Some(1000))).is_ok());
        assert!(matches!(
            check_action(&Action::Stop, &shade(None)),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn media_controls_gate_volume_and_mute() {
        let media = snapshot(
            DeviceKind::MediaRoom,
            Payload::Media(MediaState {
                volume_control: false,
                mute_control: true,
                sources: vec![MediaSource {
                    id: 3,
                    name: "Apple TV".into(),
                }],
                ..MediaState::default()
            }),
        );
        assert!(matches!(
            check_action(&Action::SetVolume { level: 100 }, &media),
            Err(CoreError::Unsupported { .. })
        ));
        assert!(check_action(&Action::SetMute { muted: true }, &media).is_ok());
        assert!(check_action(&Action::SelectSource { source_id: 3 }, &media).is_ok());
        assert!(check_action(&Action::SelectSource { source_id: 4 }, &media).is_err());
    }
}
