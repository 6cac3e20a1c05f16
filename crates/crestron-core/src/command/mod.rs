// ── Command API ──
//
// Every write flows through `Command`: a category, the target ids, and one
// capability-level `Action`. The dispatcher validates the action against the
// targets' last known snapshots, then maps it onto the hub's action
// endpoints. State is never updated optimistically; the next poll confirms.

mod dispatch;

use serde::Serialize;

use crestron_api::{ActionResponse, ActionStatus, VendorErrorKind};

use crate::error::CoreError;
use crate::model::{DeviceKind, Setpoint};

pub(crate) use dispatch::Dispatcher;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandOutcome, CoreError>>,
}

/// A capability-level action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    // ── Lights ───────────────────────────────────────────────────────
    TurnOn { transition: Option<u32> },
    TurnOff { transition: Option<u32> },
    /// Raw level, 0..=65535.
    SetLevel { level: u32, transition: Option<u32> },

    // ── Shades ───────────────────────────────────────────────────────
    Open,
    Close,
    /// Re-send the last known position.
    Stop,
    SetPosition { position: u32 },

    // ── Scenes ───────────────────────────────────────────────────────
    Recall,

    // ── Locks ────────────────────────────────────────────────────────
    Lock,
    Unlock,

    // ── Thermostats ──────────────────────────────────────────────────
    SetSetpoints { setpoints: Vec<Setpoint> },
    SetMode { mode: String },
    SetFanMode { mode: String },
    SetScheduler { state: String },

    // ── Security ─────────────────────────────────────────────────────
    SetSecurityState { state: String },

    // ── Media rooms ──────────────────────────────────────────────────
    SetVolume { level: u32 },
    SetMute { muted: bool },
    SetPower { on: bool },
    SelectSource { source_id: u32 },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnOn { .. } => "turn_on",
            Self::TurnOff { .. } => "turn_off",
            Self::SetLevel { .. } => "set_level",
            Self::Open => "open",
            Self::Close => "close",
            Self::Stop => "stop",
            Self::SetPosition { .. } => "set_position",
            Self::Recall => "recall",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::SetSetpoints { .. } => "set_setpoints",
            Self::SetMode { .. } => "set_mode",
            Self::SetFanMode { .. } => "set_fan_mode",
            Self::SetScheduler { .. } => "set_scheduler",
            Self::SetSecurityState { .. } => "set_security_state",
            Self::SetVolume { .. } => "set_volume",
            Self::SetMute { .. } => "set_mute",
            Self::SetPower { .. } => "set_power",
            Self::SelectSource { .. } => "select_source",
        }
    }

    /// The one category this action targets.
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::TurnOn { .. } | Self::TurnOff { .. } | Self::SetLevel { .. } => DeviceKind::Light,
            Self::Open | Self::Close | Self::Stop | Self::SetPosition { .. } => DeviceKind::Shade,
            Self::Recall => DeviceKind::Scene,
            Self::Lock | Self::Unlock => DeviceKind::Lock,
            Self::SetSetpoints { .. }
            | Self::SetMode { .. }
            | Self::SetFanMode { .. }
            | Self::SetScheduler { .. } => DeviceKind::Thermostat,
            Self::SetSecurityState { .. } => DeviceKind::SecurityDevice,
            Self::SetVolume { .. }
            | Self::SetMute { .. }
            | Self::SetPower { .. }
            | Self::SelectSource { .. } => DeviceKind::MediaRoom,
        }
    }
}

/// A write against one or more devices of a single category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub kind: DeviceKind,
    pub ids: Vec<u32>,
    pub action: Action,
}

impl Command {
    pub fn new(kind: DeviceKind, ids: Vec<u32>, action: Action) -> Self {
        Self { kind, ids, action }
    }

    pub fn single(kind: DeviceKind, id: u32, action: Action) -> Self {
        Self::new(kind, vec![id], action)
    }
}

// ── Outcomes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Partial,
    Failure,
}

/// What the hub accepted. Accepted ids are pending confirmation by the
/// next poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub status: OutcomeStatus,
    pub accepted: Vec<u32>,
    pub failed: Vec<u32>,
    pub message: Option<String>,
}

impl CommandOutcome {
    /// Interpret a hub response to a call that targeted `ids`.
    pub(crate) fn from_response(ids: &[u32], resp: &ActionResponse) -> Self {
        let message = resp.error_message.clone().filter(|m| !m.is_empty());
        match &resp.status {
            ActionStatus::Success => Self {
                status: OutcomeStatus::Success,
                accepted: ids.to_vec(),
                failed: Vec::new(),
                message,
            },
            ActionStatus::Partial => {
                let (failed, accepted): (Vec<u32>, Vec<u32>) =
                    ids.iter().partition(|id| resp.error_devices.contains(id));
                Self {
                    status: OutcomeStatus::Partial,
                    accepted,
                    failed,
                    message: message.or_else(|| {
                        resp.error_devices
                            .is_empty()
                            .then(|| "hub did not name the failed devices".to_owned())
                    }),
                }
            }
            ActionStatus::Failure | ActionStatus::Other(_) => Self {
                status: OutcomeStatus::Failure,
                accepted: Vec::new(),
                failed: ids.to_vec(),
                message,
            },
        }
    }

    /// Fold per-device outcomes into one.
    pub(crate) fn merge(parts: Vec<Self>) -> Self {
        let mut accepted = Vec::new();
        let mut failed = Vec::new();
        let mut messages = Vec::new();
        for part in parts {
            accepted.extend(part.accepted);
            failed.extend(part.failed);
            messages.extend(part.message);
        }
        let status = match (accepted.is_empty(), failed.is_empty()) {
            (_, true) => OutcomeStatus::Success,
            (true, false) => OutcomeStatus::Failure,
            (false, false) => OutcomeStatus::Partial,
        };
        Self {
            status,
            accepted,
            failed,
            message: (!messages.is_empty()).then(|| messages.join("; ")),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// Treat anything short of full success as an error.
    pub fn into_result(self) -> Result<Self, CoreError> {
        match self.status {
            OutcomeStatus::Success => Ok(self),
            OutcomeStatus::Partial => Err(CoreError::PartialCommandFailure {
                failed: self.failed,
                message: self.message.unwrap_or_else(|| "partial failure".into()),
            }),
            OutcomeStatus::Failure => Err(CoreError::Vendor {
                kind: VendorErrorKind::Device,
                status: 200,
                message: self
                    .message
                    .unwrap_or_else(|| "hub reported failure".into()),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn response(value: serde_json::Value) -> ActionResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn partial_response_splits_ids() {
        let outcome = CommandOutcome::from_response(
            &[1, 2, 3],
            &response(json!({"status": "partial", "errorDevices": [2]})),
        );
        assert_eq!(outcome.status, OutcomeStatus::Partial);
        assert_eq!(outcome.accepted, vec![1, 3]);
        assert_eq!(outcome.failed, vec![2]);
    }

    #[test]
    fn failure_marks_every_id() {
        let outcome = CommandOutcome::from_response(
            &[4, 5],
            &response(json!({"status": "failure", "errorMessage": "busy"})),
        );
        assert_eq!(outcome.failed, vec![4, 5]);
        assert!(matches!(
            outcome.into_result(),
            Err(CoreError::Vendor { .. })
        ));
    }

    #[test]
    fn merge_derives_status() {
        let ok = CommandOutcome::from_response(&[1], &response(json!({"status": "success"})));
        let bad = CommandOutcome::from_response(&[2], &response(json!({"status": "failure"})));
        let merged = CommandOutcome::merge(vec![ok.clone(), bad]);
        assert_eq!(merged.status, OutcomeStatus::Partial);

        let merged = CommandOutcome::merge(vec![ok]);
        assert!(merged.is_success());
    }

    #[test]
    fn partial_into_result_reports_failed_ids() {
        let outcome = CommandOutcome::from_response(
            &[1, 2, 3],
            &response(json!({"status": "partial", "errorDevices": [2]})),
        );
        match outcome.into_result() {
            Err(CoreError::PartialCommandFailure { failed, .. }) => assert_eq!(failed, vec![2]),
            other => panic!("expected partial failure, got {other:?}"),
        }
    }
}
