pub mod app;
pub mod colors;
pub mod draw;
pub mod history;
pub mod input;

pub use app::App;
pub use colors::Palette;
pub use draw::{DrawState, Drawer};
pub use history::{History, ScaleTracker, ThroughputHistory};
pub use input::{InputEvent, InputHandler};

#[cfg(test)]
mod tests {
    use super::*;
    use bitmeter_core::{DisplayConfig, SpeedUnit};

    #[test]
    fn test_draw_state_follows_display_config() {
        let display = DisplayConfig {
            speed_unit: SpeedUnit::Mbps,
            show_system_stats: false,
            ..DisplayConfig::default()
        };
        let state = DrawState::from(&display);
        assert_eq!(state.speed_unit, SpeedUnit::Mbps);
        assert!(!state.show_system_stats);
        assert!(!state.show_help);
    }

    #[test]
    fn test_history_starts_flat() {
        let history = ThroughputHistory::new(DisplayConfig::default().history_len);
        assert_eq!(history.download.len(), 60);
        assert_eq!(history.upload.max(), 0.0);
        assert_eq!(history.download_scale.current(), 1.0);
    }
}
