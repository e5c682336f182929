use crossterm::style::Color;

/// Colors for each panel of the meter
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub foreground: Color,
    pub download: Color,
    pub upload: Color,
    pub cpu: Color,
    pub ram: Color,
    pub accent: Color,
    pub muted: Color,
}

impl Palette {
    pub fn new(no_color: bool) -> Self {
        if no_color {
            Self::no_color()
        } else {
            Self::meter()
        }
    }

    /// Honors the `NO_COLOR` convention
    pub fn from_env() -> Self {
        Self::new(std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()))
    }

    fn meter() -> Self {
        Self {
            foreground: Color::White,
            download: Color::Green,
            upload: Color::Yellow,
            cpu: Color::DarkYellow,
            ram: Color::Blue,
            accent: Color::Cyan,
            muted: Color::DarkGrey,
        }
    }

    fn no_color() -> Self {
        Self {
            foreground: Color::Reset,
            download: Color::Reset,
            upload: Color::Reset,
            cpu: Color::Reset,
            ram: Color::Reset,
            accent: Color::Reset,
            muted: Color::Reset,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::meter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_palette_resets_everything() {
        let palette = Palette::new(true);
        assert_eq!(palette.download, Color::Reset);
        assert_eq!(palette.muted, Color::Reset);
        assert_ne!(Palette::new(false).download, Color::Reset);
    }
}
