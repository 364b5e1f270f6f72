use clap::ValueEnum;

use crate::error::Result;
use crate::theme::{Theme, find_theme};

pub const DEFAULT_FPS: u32 = 12;
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 60;
pub const DEFAULT_WIDTH: usize = 80;
pub const MIN_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputMode {
    /// Play the reveal in the terminal.
    #[default]
    Animate,
    /// Print only the finished diagram.
    Static,
    /// Print every frame as one JSON record.
    Frames,
}

/// Everything a render needs besides the diagram source.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub mode: OutputMode,
    pub theme: &'static Theme,
    pub fps: u32,
    pub width: usize,
    pub color: bool,
}

impl RenderConfig {
    pub fn new(mode: OutputMode, theme: &str, fps: u32, width: usize, color: bool) -> Result<Self> {
        Ok(Self {
            mode,
            theme: find_theme(theme)?,
            fps: fps.clamp(MIN_FPS, MAX_FPS),
            width: width.max(MIN_WIDTH),
            color,
        })
    }

    /// Milliseconds between frames.
    pub fn frame_delay_ms(&self) -> u64 {
        1000 / u64::from(self.fps)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            theme: &crate::theme::THEMES[0],
            fps: DEFAULT_FPS,
            width: DEFAULT_WIDTH,
            color: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fps_is_clamped() {
        let low = RenderConfig::new(OutputMode::Static, "default", 0, 80, false).unwrap();
        let high = RenderConfig::new(OutputMode::Static, "default", 500, 80, false).unwrap();
        assert_eq!((low.fps, high.fps), (MIN_FPS, MAX_FPS));
        assert_eq!(high.frame_delay_ms(), 16);
    }

    #[test]
    fn width_has_a_floor() {
        let config = RenderConfig::new(OutputMode::Animate, "nord", 12, 2, true).unwrap();
        assert_eq!(config.width, MIN_WIDTH);
        assert_eq!(config.theme.name, "nord");
    }

    #[test]
    fn unknown_theme_is_rejected() {
        assert!(RenderConfig::new(OutputMode::Animate, "nope", 12, 80, true).is_err());
    }

    #[test]
    fn defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.mode, OutputMode::Animate);
        assert_eq!(config.fps, DEFAULT_FPS);
        assert_eq!(config.frame_delay_ms(), 83);
    }
}
