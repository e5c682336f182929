use crate::colors::Palette;
use crate::history::{sparkline, History, ThroughputHistory};
use bitmeter_core::{format_gib, format_speed, DisplayConfig, SpeedUnit, TelemetrySnapshot};
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
    QueueableCommand,
};
use std::io::{self, Write};

const BAR_WIDTH: usize = 20;

const HELP_LINES: &[&str] = &[
    "BITMETER HELP",
    "",
    "  i            Cycle interface (all, then each one)",
    "  u            Cycle speed unit",
    "  s            Show or hide CPU/RAM panel",
    "  ?            Toggle this help",
    "  q, Esc, ^C   Quit",
];

/// Toggles owned by the app, read by the drawer
#[derive(Debug, Clone, PartialEq)]
pub struct DrawState {
    pub show_help: bool,
    pub show_system_stats: bool,
    pub speed_unit: SpeedUnit,
}

impl Default for DrawState {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for DrawState {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            show_help: false,
            show_system_stats: display.show_system_stats,
            speed_unit: display.speed_unit,
        }
    }
}

/// One screen row
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub color: Color,
    pub text: String,
}

impl Line {
    fn new(color: Color, text: impl Into<String>) -> Self {
        Self {
            color,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(Color::Reset, "")
    }
}

/// Main drawing coordinator
pub struct Drawer {
    palette: Palette,
}

impl Drawer {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// Draw the complete screen
    pub fn draw<W: Write>(
        &self,
        writer: &mut W,
        snapshot: &TelemetrySnapshot,
        history: &ThroughputHistory,
        state: &DrawState,
    ) -> io::Result<()> {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        let lines = self.compose(snapshot, history, state, width as usize);

        for (row, line) in lines.iter().take(height as usize).enumerate() {
            let text: String = line.text.chars().take(width as usize).collect();
            writer.queue(cursor::MoveTo(0, row as u16))?;
            writer.queue(SetForegroundColor(line.color))?;
            writer.queue(Print(text))?;
            writer.queue(Clear(ClearType::UntilNewLine))?;
        }

        writer.queue(ResetColor)?;
        writer.queue(Clear(ClearType::FromCursorDown))?;
        writer.flush()
    }

    /// Lay the snapshot out as rows of text
    pub fn compose(
        &self,
        snapshot: &TelemetrySnapshot,
        history: &ThroughputHistory,
        state: &DrawState,
        width: usize,
    ) -> Vec<Line> {
        let mut lines = vec![
            Line::new(self.palette.accent, format!(" bitmeter  {}", snapshot.scope)),
            Line::blank(),
        ];

        if state.show_help {
            lines.extend(
                HELP_LINES
                    .iter()
                    .map(|l| Line::new(self.palette.foreground, format!(" {}", l))),
            );
            lines.push(Line::blank());
            lines.push(self.footer());
            return lines;
        }

        let graph_width = width.saturating_sub(2).max(1);
        self.throughput_rows(
            &mut lines,
            "D(↓)",
            snapshot.throughput.download_bps,
            &history.download,
            history.download_scale.current(),
            state.speed_unit,
            self.palette.download,
            graph_width,
        );
        self.throughput_rows(
            &mut lines,
            "U(↑)",
            snapshot.throughput.upload_bps,
            &history.upload,
            history.upload_scale.current(),
            state.speed_unit,
            self.palette.upload,
            graph_width,
        );

        if state.show_system_stats {
            self.system_rows(&mut lines, snapshot);
        }

        lines.push(Line::new(
            self.palette.muted,
            format!(
                " cpu: {}  unit: {}",
                snapshot.system.monitoring_method,
                state.speed_unit.as_str()
            ),
        ));
        lines.push(self.footer());
        lines
    }

    #[allow(clippy::too_many_arguments)]
    fn throughput_rows(
        &self,
        lines: &mut Vec<Line>,
        label: &str,
        bps: f64,
        history: &History,
        scale: f64,
        unit: SpeedUnit,
        color: Color,
        graph_width: usize,
    ) {
        let (value, suffix) = format_speed(bps, unit);
        let (peak, peak_suffix) = format_speed(scale, unit);
        lines.push(Line::new(
            color,
            format!(" {} {:>8} {:<5}  scale {} {}", label, value, suffix, peak, peak_suffix),
        ));

        let skip = history.len().saturating_sub(graph_width);
        lines.push(Line::new(color, format!(" {}", sparkline(history.values().skip(skip), scale))));
        lines.push(Line::blank());
    }

    fn system_rows(&self, lines: &mut Vec<Line>, snapshot: &TelemetrySnapshot) {
        let system = &snapshot.system;

        lines.push(Line::new(
            self.palette.cpu,
            format!(" CPU {:>5.1}% [{}]", system.cpu_percent, bar(system.cpu_percent)),
        ));
        lines.push(Line::new(
            self.palette.ram,
            format!(
                " RAM {:>5.1}% [{}] {} / {}",
                system.ram_percent,
                bar(system.ram_percent),
                format_gib(system.ram_used_bytes),
                format_gib(system.ram_total_bytes)
            ),
        ));

        let cores: Vec<String> = system.cpu_per_core.iter().map(|c| format!("{:.0}", c)).collect();
        lines.push(Line::new(self.palette.muted, format!(" Cores {}", cores.join(" "))));
        lines.push(Line::blank());

        lines.push(Line::new(self.palette.foreground, " Top CPU processes"));
        if system.top_processes.is_empty() {
            lines.push(Line::new(self.palette.muted, "   none above threshold"));
        }
        for process in &system.top_processes {
            lines.push(Line::new(
                self.palette.foreground,
                format!("   {:>5.1}%  {}", process.cpu_percent, process.name),
            ));
        }
        lines.push(Line::blank());
    }

    fn footer(&self) -> Line {
        Line::new(
            self.palette.muted,
            " q quit  i interface  u unit  s stats  ? help",
        )
    }
}

/// Fixed-width fill bar for a 0..=100 figure
pub fn bar(percent: f32) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f32).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitmeter_core::{MonitoringMethod, NetworkScope, SystemStats, ThroughputSample, TopProcess};

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            throughput: ThroughputSample {
                download_bps: 16_000.0,
                upload_bps: 8_000.0,
            },
            scope: NetworkScope::Interface("eth0".to_string()),
            system: SystemStats {
                cpu_percent: 50.0,
                cpu_per_core: vec![40.0, 60.0],
                ram_percent: 25.0,
                ram_used_bytes: 2 * 1024 * 1024 * 1024,
                ram_total_bytes: 8 * 1024 * 1024 * 1024,
                top_processes: vec![TopProcess {
                    cpu_percent: 90.0,
                    name: "rustc".to_string(),
                }],
                monitoring_method: MonitoringMethod::PortableSamplingFallback,
            },
        }
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.text.clone()).collect()
    }

    #[test]
    fn test_bar_fill() {
        assert_eq!(bar(0.0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(bar(50.0).chars().filter(|c| *c == '█').count(), BAR_WIDTH / 2);
        assert_eq!(bar(150.0).chars().filter(|c| *c == '█').count(), BAR_WIDTH);
        assert_eq!(bar(50.0).chars().count(), BAR_WIDTH);
    }

    #[test]
    fn test_compose_shows_throughput_and_stats() {
        let drawer = Drawer::new(Palette::new(true));
        let history = ThroughputHistory::new(10);
        let lines = texts(&drawer.compose(&snapshot(), &history, &DrawState::default(), 80));

        assert!(lines[0].contains("Monitoring eth0"));
        assert!(lines
            .iter()
            .any(|l| l.contains("D(↓)") && l.contains("2.0") && l.contains("KB/s")));
        assert!(lines
            .iter()
            .any(|l| l.contains("U(↑)") && l.contains("1.0") && l.contains("KB/s")));
        assert!(lines.iter().any(|l| l.starts_with(" CPU") && l.contains("50.0%")));
        assert!(lines.iter().any(|l| l.contains("2.0 GB / 8.0 GB")));
        assert!(lines.iter().any(|l| l.contains("Cores 40 60")));
        assert!(lines.iter().any(|l| l.contains("rustc")));
        assert!(lines.iter().any(|l| l.contains("portable-sampling-fallback")));
    }

    #[test]
    fn test_compose_hides_system_stats() {
        let drawer = Drawer::new(Palette::new(true));
        let state = DrawState {
            show_system_stats: false,
            ..DrawState::default()
        };
        let lines = texts(&drawer.compose(&snapshot(), &ThroughputHistory::new(10), &state, 80));

        assert!(!lines.iter().any(|l| l.starts_with(" CPU")));
        assert!(!lines.iter().any(|l| l.contains("rustc")));
    }

    #[test]
    fn test_compose_help_replaces_body() {
        let drawer = Drawer::new(Palette::new(true));
        let state = DrawState {
            show_help: true,
            ..DrawState::default()
        };
        let lines = texts(&drawer.compose(&snapshot(), &ThroughputHistory::new(10), &state, 80));

        assert!(lines.iter().any(|l| l.contains("BITMETER HELP")));
        assert!(!lines.iter().any(|l| l.contains("D(↓)")));
    }

    #[test]
    fn test_sparkline_fits_width() {
        let drawer = Drawer::new(Palette::new(true));
        let history = ThroughputHistory::new(60);
        let lines = drawer.compose(&snapshot(), &history, &DrawState::default(), 22);

        let graph = &lines[3].text;
        assert_eq!(graph.chars().count(), 21);
    }
}
