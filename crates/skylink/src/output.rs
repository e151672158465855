//! Output formatting: tables or JSON.
//!
//! Table output prints one block per step frame: a header line, the
//! auto-connection selection, the transport requests of the step, then a
//! `tabled` table of every device. JSON output is the serde form of the
//! whole frame list.

use std::fmt::Write as _;
use std::io::{self, Write};

use skylink_core::SelectedDevice;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::simulate::{DeviceSnapshot, Frame};

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "")]
    selected: &'static str,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Connectors")]
    connectors: String,
}

impl DeviceRow {
    fn of(device: &DeviceSnapshot, selected: bool) -> Self {
        Self {
            selected: if selected { "*" } else { "" },
            kind: device.kind.to_string(),
            uid: device.uid.to_string(),
            name: device.name.clone(),
            state: device.state.to_string(),
            active: device.active.clone().unwrap_or_else(|| "-".into()),
            connectors: device.connectors.join(", "),
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

pub fn render_frames(format: OutputFormat, frames: &[Frame]) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(frames
            .iter()
            .map(render_frame_table)
            .collect::<Vec<_>>()
            .join("\n\n")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(frames)?),
    }
}

/// Print the rendered output to stdout.
pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Table rendering ──────────────────────────────────────────────────

fn render_frame_table(frame: &Frame) -> String {
    let selection = &frame.auto_connection;
    let mut out = String::new();
    let _ = writeln!(out, "step {}: {}", frame.step, frame.action);
    let _ = writeln!(
        out,
        "auto-connection {} | drone: {} | remote control: {}",
        selection.status,
        describe(selection.drone.as_ref()),
        describe(selection.remote_control.as_ref()),
    );
    if !frame.requests.is_empty() {
        let requests: Vec<String> = frame
            .requests
            .iter()
            .map(|r| format!("{} {}", r.request, r.device))
            .collect();
        let _ = writeln!(out, "requests: {}", requests.join("; "));
    }

    let is_selected = |device: &DeviceSnapshot| {
        [&selection.drone, &selection.remote_control]
            .into_iter()
            .flatten()
            .any(|s| s.uid == device.uid)
    };
    let rows: Vec<DeviceRow> = frame
        .devices
        .iter()
        .map(|device| DeviceRow::of(device, is_selected(device)))
        .collect();
    out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    out
}

fn describe(device: Option<&SelectedDevice>) -> String {
    device.map_or_else(
        || "-".into(),
        |d| format!("{} ({})", d.uid, d.connection_state),
    )
}
