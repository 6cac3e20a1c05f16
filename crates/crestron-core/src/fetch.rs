// ── Catalog fetch ──
//
// One list call per enabled category plus an optional room list, all
// issued concurrently. Each category's outcome is kept separately so a
// failure in one never hides the others from the reconciler.

use crestron_api::{CrestronClient, Error, RoomRecord};
use futures_util::future::join_all;
use tracing::debug;

use crate::convert::RawDevice;
use crate::model::{CategorySet, DeviceKind};

/// Result of one fetch pass, before any diffing.
#[derive(Debug)]
pub struct CatalogFetch {
    /// `None` when rooms were not due this cycle.
    pub rooms: Option<Result<Vec<RoomRecord>, Error>>,
    pub categories: Vec<(DeviceKind, Result<Vec<RawDevice>, Error>)>,
}

impl CatalogFetch {
    /// Some call failed authentication even after the single re-login.
    pub fn auth_failed(&self) -> bool {
        let is_auth = |e: &Error| matches!(e, Error::Authentication { .. } | Error::SessionExpired { .. });
        self.rooms
            .as_ref()
            .is_some_and(|r| r.as_ref().is_err_and(is_auth))
            || self
                .categories
                .iter()
                .any(|(_, r)| r.as_ref().is_err_and(is_auth))
    }

    /// Every category failed, with nothing learned this pass.
    pub fn all_failed(&self) -> bool {
        !self.categories.is_empty() && self.categories.iter().all(|(_, r)| r.is_err())
    }

    /// The first category error, for surfacing when nothing succeeded.
    pub fn into_first_error(self) -> Option<Error> {
        self.categories.into_iter().find_map(|(_, r)| r.err())
    }
}

/// Fetch every category in `categories`, and the room list if `include_rooms`.
pub async fn fetch_catalog(
    client: &CrestronClient,
    categories: &CategorySet,
    include_rooms: bool,
) -> CatalogFetch {
    let rooms = async {
        if include_rooms {
            Some(client.list_rooms().await)
        } else {
            None
        }
    };
    let lists = join_all(
        categories
            .iter()
            .map(|kind| async move { (kind, fetch_category(client, kind).await) }),
    );

    let (rooms, categories) = tokio::join!(rooms, lists);
    debug!(
        categories = categories.len(),
        rooms = include_rooms,
        "catalog fetch finished"
    );
    CatalogFetch { rooms, categories }
}

/// List one category and tag its records.
pub async fn fetch_category(
    client: &CrestronClient,
    kind: DeviceKind,
) -> Result<Vec<RawDevice>, Error> {
    fn tag<T>(records: Vec<T>, f: fn(T) -> RawDevice) -> Vec<RawDevice> {
        records.into_iter().map(f).collect()
    }

    Ok(match kind {
        DeviceKind::Light => tag(client.list_lights().await?, RawDevice::Light),
        DeviceKind::Shade => tag(client.list_shades().await?, RawDevice::Shade),
        DeviceKind::Scene => tag(client.list_scenes().await?, RawDevice::Scene),
        DeviceKind::Sensor => tag(client.list_sensors().await?, RawDevice::Sensor),
        DeviceKind::Lock => tag(client.list_door_locks().await?, RawDevice::Lock),
        DeviceKind::Thermostat => tag(client.list_thermostats().await?, RawDevice::Thermostat),
        DeviceKind::SecurityDevice => tag(
            client.list_security_devices().await?,
            RawDevice::SecurityDevice,
        ),
        DeviceKind::MediaRoom => tag(client.list_media_rooms().await?, RawDevice::MediaRoom),
    })
}
