//! Long-running `watch`: keeps the bridge polling and prints every entity
//! lifecycle signal until Ctrl-C.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use futures_util::StreamExt;
use owo_colors::OwoColorize;
use serde::Serialize;

use crestron_core::{Bridge, BridgeConfig, CycleReport, DeviceSnapshot, EntityHandle, EntitySink};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

// ── Printing sink ───────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    Register { handle: u64, device: &'a DeviceSnapshot },
    Update { handle: u64, device: &'a DeviceSnapshot },
    Remove { handle: u64, name: &'a str },
    Cycle(&'a CycleReport),
}

/// Entity sink that writes one line per signal to stdout.
struct PrintSink {
    next: AtomicU64,
    /// Display names by handle, so removals can say what went away.
    names: Mutex<HashMap<EntityHandle, String>>,
    json: bool,
    color: bool,
}

impl PrintSink {
    fn new(global: &GlobalOpts) -> Self {
        Self {
            next: AtomicU64::new(1),
            names: Mutex::new(HashMap::new()),
            json: !matches!(global.output, OutputFormat::Table | OutputFormat::Plain),
            color: output::should_color(&global.color),
        }
    }

    fn emit_json(event: &WatchEvent<'_>) {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
    }

    fn emit_line(&self, tag: &str, d: &DeviceSnapshot) {
        let stamp = Local::now().format("%H:%M:%S");
        let tag = if self.color {
            match tag {
                "+" => tag.green().to_string(),
                _ => tag.cyan().to_string(),
            }
        } else {
            tag.to_owned()
        };
        let mut line = format!(
            "{stamp} {tag} {:<10} {:>5}  {:<32} {}",
            d.kind.to_string(),
            d.id,
            d.display_name(),
            output::paint_state(&d.payload.summary(), self.color)
        );
        if !d.is_available() {
            line.push_str(" [offline]");
        }
        if !d.visible {
            line.push_str(" [hidden]");
        }
        println!("{line}");
    }

    fn remember(&self, handle: EntityHandle, d: &DeviceSnapshot) {
        if let Ok(mut names) = self.names.lock() {
            names.insert(handle, d.display_name());
        }
    }
}

impl EntitySink for PrintSink {
    fn register(&self, snapshot: &DeviceSnapshot) -> EntityHandle {
        let handle = EntityHandle::new(self.next.fetch_add(1, Ordering::Relaxed));
        self.remember(handle, snapshot);
        if self.json {
            Self::emit_json(&WatchEvent::Register {
                handle: handle.get(),
                device: snapshot,
            });
        } else {
            self.emit_line("+", snapshot);
        }
        handle
    }

    fn update(&self, handle: EntityHandle, snapshot: &DeviceSnapshot) {
        self.remember(handle, snapshot);
        if self.json {
            Self::emit_json(&WatchEvent::Update {
                handle: handle.get(),
                device: snapshot,
            });
        } else {
            self.emit_line("~", snapshot);
        }
    }

    fn remove(&self, handle: EntityHandle) {
        let name = self
            .names
            .lock()
            .ok()
            .and_then(|mut names| names.remove(&handle))
            .unwrap_or_else(|| handle.to_string());
        if self.json {
            Self::emit_json(&WatchEvent::Remove {
                handle: handle.get(),
                name: &name,
            });
        } else {
            let stamp = Local::now().format("%H:%M:%S");
            let tag = if self.color {
                "-".red().to_string()
            } else {
                "-".into()
            };
            println!("{stamp} {tag} {name}");
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    mut config: BridgeConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        config.poll_interval = Duration::from_secs(secs);
    }

    let sink = Arc::new(PrintSink::new(global));
    let json = sink.json;
    let bridge = Bridge::new(config, sink);
    bridge.connect().await?;

    if !global.quiet && !json {
        eprintln!(
            "Watching {} devices every {}s (Ctrl-C to stop)",
            bridge.store().device_count(),
            bridge.config().poll_interval.as_secs()
        );
    }

    let devices = bridge.subscribe_devices();
    let mut offline = offline_count(devices.current());
    let mut devices = devices.into_stream();
    let mut cycles = bridge.store().subscribe_cycles();
    let mut state = bridge.connection_state();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            changed = cycles.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = cycles.borrow_and_update().clone();
                if let Some(report) = report {
                    report_cycle(&report, json, global);
                }
            }

            Some(snapshot) = devices.next() => {
                let now = offline_count(&snapshot);
                if now != offline {
                    tracing::info!(offline = now, "offline device count changed");
                    if !global.quiet && !json {
                        eprintln!("offline devices: {offline} -> {now}");
                    }
                    offline = now;
                }
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let now = *state.borrow_and_update();
                tracing::info!(state = %now, "connection state changed");
                if !global.quiet && !json {
                    eprintln!("connection: {now}");
                }
            }
        }
    }

    bridge.disconnect().await;
    Ok(())
}

fn offline_count(devices: &[Arc<DeviceSnapshot>]) -> usize {
    devices
        .iter()
        .filter(|d| d.visible && !d.is_available())
        .count()
}

fn report_cycle(report: &CycleReport, json: bool, global: &GlobalOpts) {
    if json {
        PrintSink::emit_json(&WatchEvent::Cycle(report));
        return;
    }
    if global.quiet || (report.is_clean() && report.changes() == 0) {
        return;
    }
    let mut line = format!(
        "cycle {}: +{} ~{} -{}",
        report.cycle, report.added, report.updated, report.removed
    );
    if !report.failed_categories.is_empty() {
        let failed: Vec<String> = report
            .failed_categories
            .iter()
            .map(ToString::to_string)
            .collect();
        line.push_str(&format!(" (failed: {})", failed.join(", ")));
    }
    eprintln!("{line}");
}
