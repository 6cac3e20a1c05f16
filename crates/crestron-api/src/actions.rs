// Device actions
//
// Each endpoint answers with `{status, errorMessage?, errorDevices?}`. Some
// firmware answers 2xx with an empty body on lock and recall calls; that is
// treated as full success.

use serde::Serialize;
use serde_json::json;

use crate::client::{CrestronClient, parse_body};
use crate::error::Error;
use crate::models::{ActionResponse, LightState, SetPointValue, ShadeState};

impl CrestronClient {
    async fn action<B>(&self, path: &str, body: Option<&B>) -> Result<ActionResponse, Error>
    where
        B: Serialize + ?Sized + Sync,
    {
        let text = self.post_raw(path, body).await?;
        if text.trim().is_empty() {
            return Ok(ActionResponse::accepted());
        }
        parse_body(&text)
    }

    // ── Lights & shades ──────────────────────────────────────────────

    /// Set any number of lights in one request.
    pub async fn set_light_levels(&self, lights: &[LightState]) -> Result<ActionResponse, Error> {
        self.action("lights/setstate", Some(&json!({ "lights": lights })))
            .await
    }

    /// Move any number of shades in one request.
    pub async fn set_shade_positions(&self, shades: &[ShadeState]) -> Result<ActionResponse, Error> {
        self.action("shades/setstate", Some(&json!({ "shades": shades })))
            .await
    }

    // ── Scenes & quick actions ───────────────────────────────────────

    pub async fn recall_scene(&self, id: u32) -> Result<ActionResponse, Error> {
        self.action::<()>(&format!("scenes/recall/{id}"), None).await
    }

    pub async fn recall_quick_action(&self, id: u32) -> Result<ActionResponse, Error> {
        self.action::<()>(&format!("quickactions/{id}/recall"), None)
            .await
    }

    // ── Locks ────────────────────────────────────────────────────────

    pub async fn lock_door(&self, id: u32) -> Result<ActionResponse, Error> {
        self.action::<()>(&format!("doorlocks/lock/{id}"), None).await
    }

    pub async fn unlock_door(&self, id: u32) -> Result<ActionResponse, Error> {
        self.action::<()>(&format!("doorlocks/unlock/{id}"), None).await
    }

    // ── Thermostats ──────────────────────────────────────────────────

    /// Write one or more setpoints (tenths of a degree) on a thermostat.
    pub async fn set_thermostat_setpoints(
        &self,
        id: u32,
        setpoints: &[SetPointValue],
    ) -> Result<ActionResponse, Error> {
        let body = json!({ "id": id, "setpoints": setpoints });
        self.action("thermostats/SetPoint", Some(&body)).await
    }

    pub async fn set_thermostat_mode(&self, id: u32, mode: &str) -> Result<ActionResponse, Error> {
        let body = json!({ "thermostats": [{ "id": id, "mode": mode }] });
        self.action("thermostats/mode", Some(&body)).await
    }

    pub async fn set_thermostat_fan_mode(
        &self,
        id: u32,
        mode: &str,
    ) -> Result<ActionResponse, Error> {
        let body = json!({ "thermostats": [{ "id": id, "mode": mode }] });
        self.action("thermostats/fanmode", Some(&body)).await
    }

    pub async fn set_thermostat_scheduler(
        &self,
        id: u32,
        state: &str,
    ) -> Result<ActionResponse, Error> {
        let body = json!({ "thermostats": [{ "id": id, "schedulerState": state }] });
        self.action("thermostats/schedule", Some(&body)).await
    }

    // ── Security ─────────────────────────────────────────────────────

    pub async fn set_security_state(&self, id: u32, state: &str) -> Result<ActionResponse, Error> {
        let body = json!({ "state": state });
        self.action(&format!("securitydevices/{id}/setstate"), Some(&body))
            .await
    }

    // ── Media rooms ──────────────────────────────────────────────────

    pub async fn set_media_volume(&self, id: u32, level: u32) -> Result<ActionResponse, Error> {
        self.action::<()>(&format!("mediarooms/{id}/selectvolume/{level}"), None)
            .await
    }

    pub async fn set_media_mute(&self, id: u32, muted: bool) -> Result<ActionResponse, Error> {
        let verb = if muted { "mute" } else { "unmute" };
        self.action::<()>(&format!("mediarooms/{id}/{verb}"), None)
            .await
    }

    pub async fn set_media_power(&self, id: u32, on: bool) -> Result<ActionResponse, Error> {
        let state = if on { "on" } else { "off" };
        self.action::<()>(&format!("mediarooms/{id}/power/{state}"), None)
            .await
    }

    pub async fn select_media_source(
        &self,
        id: u32,
        source_id: u32,
    ) -> Result<ActionResponse, Error> {
        self.action::<()>(&format!("mediarooms/{id}/selectsource/{source_id}"), None)
            .await
    }
}
