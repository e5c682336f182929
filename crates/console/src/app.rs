use crate::{
    colors::Palette,
    draw::{DrawState, Drawer},
    history::ThroughputHistory,
    input::{InputEvent, InputHandler},
};
use bitmeter_core::{Config, DisplayConfig, Monitor, TelemetrySnapshot};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Main application state
pub struct App {
    display: DisplayConfig,
    monitor: Monitor,
    input_handler: InputHandler,
    drawer: Drawer,
    history: ThroughputHistory,
    state: DrawState,
    current_snapshot: Option<TelemetrySnapshot>,
    quit_requested: bool,
    last_update: Instant,
    settings_path: Option<PathBuf>,
}

impl App {
    /// Wrap a monitor that has already been started
    pub fn new(display: DisplayConfig, monitor: Monitor) -> Self {
        let history = ThroughputHistory::new(display.history_len);
        let state = DrawState::from(&display);

        Self {
            display,
            monitor,
            input_handler: InputHandler::new(),
            drawer: Drawer::new(Palette::from_env()),
            history,
            state,
            current_snapshot: None,
            quit_requested: false,
            last_update: Instant::now(),
            settings_path: None,
        }
    }

    /// Save unit and stats-panel changes to this config file as they happen
    pub fn with_settings_path(mut self, path: Option<PathBuf>) -> Self {
        self.settings_path = path;
        self
    }

    /// Run the main application loop
    pub fn run<W: Write>(&mut self, writer: &mut W) -> anyhow::Result<()> {
        let _guard = TerminalGuard::enter()?;

        self.update_data();
        self.render(writer)?;

        while !self.quit_requested {
            let refresh = self.display.refresh_interval();
            let timeout = refresh.saturating_sub(self.last_update.elapsed());

            if let Some(event) = self.input_handler.poll_event(timeout)? {
                let redraw = self.handle_event(event);
                if redraw {
                    self.render(writer)?;
                }
            }

            if self.last_update.elapsed() >= refresh {
                self.update_data();
                self.render(writer)?;
            }
        }

        self.monitor.stop();
        Ok(())
    }

    /// Apply an input event; returns whether the screen needs redrawing now
    fn handle_event(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Quit => {
                self.quit_requested = true;
                false
            }
            InputEvent::NextInterface => {
                self.cycle_interface();
                true
            }
            InputEvent::CycleUnit => {
                let unit = self.state.speed_unit.next();
                self.state.speed_unit = unit;
                debug!(unit = unit.as_str(), "speed unit changed");
                self.save_setting(|config| config.display.speed_unit = unit);
                true
            }
            InputEvent::ToggleSystemStats => {
                let show = !self.state.show_system_stats;
                self.state.show_system_stats = show;
                self.save_setting(|config| config.display.show_system_stats = show);
                true
            }
            InputEvent::ShowHelp => {
                self.state.show_help = !self.state.show_help;
                true
            }
            InputEvent::Resize => true,
            InputEvent::Tick | InputEvent::Unknown => false,
        }
    }

    fn save_setting(&self, update: impl FnOnce(&mut Config)) {
        let Some(path) = &self.settings_path else {
            return;
        };
        if let Err(e) = Config::update_file(path, update) {
            warn!(path = %path.display(), error = %e, "failed to save display setting");
        }
    }

    fn cycle_interface(&mut self) {
        let available = self.monitor.list_interfaces();
        let current = self.monitor.selected_interface();
        let next = next_interface(current.as_deref(), &available);

        info!(from = ?current, to = ?next, "cycling interface");
        self.monitor.set_interface(next);
        self.history.clear();
    }

    fn update_data(&mut self) {
        let snapshot = self.monitor.snapshot();
        self.history.push(snapshot.throughput);
        self.current_snapshot = Some(snapshot);
        self.last_update = Instant::now();
    }

    fn render<W: Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        if let Some(snapshot) = &self.current_snapshot {
            self.drawer.draw(writer, snapshot, &self.history, &self.state)?;
        }
        Ok(())
    }
}

/// Interface after `current` in `available`: all interfaces, then each name, then all again.
///
/// A current name that is no longer listed restarts the cycle at the first one.
pub fn next_interface(current: Option<&str>, available: &[String]) -> Option<String> {
    match current {
        None => available.first().cloned(),
        Some(name) => match available.iter().position(|n| n == name) {
            Some(index) => available.get(index + 1).cloned(),
            None => available.first().cloned(),
        },
    }
}

/// RAII guard to restore terminal state on drop
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> anyhow::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        let guard = Self;
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::EnterAlternateScreen,
            crossterm::cursor::Hide
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::cursor::Show,
            crossterm::terminal::LeaveAlternateScreen
        );
        let _ = crossterm::terminal::disable_raw_mode();
    }
}
