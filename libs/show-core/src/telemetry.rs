//! Debug telemetry view: a text snapshot emitted once per second when
//! `--debug-mode` is enabled.

use std::collections::BTreeMap;

use crate::conductor::ShowState;
use crate::serial::Level;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Everything the debug view needs in one read-only snapshot. Gathered by
/// the caller from each component's public getters; this type does not
/// itself touch any actor's internals, staying an immutable snapshot for
/// read-only telemetry.
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub state: ShowState,
    pub fps: f32,
    pub episode_duration_s: Option<f32>,
    pub serial_connection: ConnectionState,
    pub ssr_connection: ConnectionState,
    pub pin_levels: BTreeMap<u8, Level>,
    pub tool_ids: Vec<String>,
    pub canvas_w: u32,
    pub canvas_h: u32,
}

impl TelemetrySnapshot {
    /// Render every snapshot field, one line each.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("state: {:?}", self.state));
        lines.push(format!("fps: {:.1}", self.fps));
        lines.push(match self.episode_duration_s {
            Some(s) => format!("episode_duration: {s:.2}s"),
            None => "episode_duration: none".to_string(),
        });
        lines.push(format!("serial: {}", self.serial_connection));
        lines.push(format!("ssr: {}", self.ssr_connection));
        let pins = self
            .pin_levels
            .iter()
            .map(|(pin, level)| format!("{pin}={}", match level { Level::High => "H", Level::Low => "L" }))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("pins: [{pins}]"));
        lines.push(format!("tool_ids: [{}]", self.tool_ids.join(", ")));
        lines.push(format!("canvas: {}x{}", self.canvas_w, self.canvas_h));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_every_named_field() {
        let mut pin_levels = BTreeMap::new();
        pin_levels.insert(4u8, Level::High);
        pin_levels.insert(6u8, Level::Low);
        let snapshot = TelemetrySnapshot {
            state: ShowState::Caption,
            fps: 59.98,
            episode_duration_s: Some(3.2),
            serial_connection: ConnectionState::Connected,
            ssr_connection: ConnectionState::Disconnected,
            pin_levels,
            tool_ids: vec!["01".to_string(), "02".to_string()],
            canvas_w: 1920,
            canvas_h: 1080,
        };
        let rendered = snapshot.render();
        assert!(rendered.contains("state: Caption"));
        assert!(rendered.contains("fps: 60.0"));
        assert!(rendered.contains("4=H"));
        assert!(rendered.contains("6=L"));
        assert!(rendered.contains("tool_ids: [01, 02]"));
        assert!(rendered.contains("canvas: 1920x1080"));
    }

    #[test]
    fn no_active_episode_reads_none() {
        let snapshot = TelemetrySnapshot {
            state: ShowState::Detecting,
            fps: 60.0,
            episode_duration_s: None,
            serial_connection: ConnectionState::Connected,
            ssr_connection: ConnectionState::Connected,
            pin_levels: BTreeMap::new(),
            tool_ids: Vec::new(),
            canvas_w: 0,
            canvas_h: 0,
        };
        assert!(snapshot.render().contains("episode_duration: none"));
    }
}
