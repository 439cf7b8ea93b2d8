use anyhow::{Context, Result};
use directories::ProjectDirs;
use ratatui::style::Color;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tomato_ipc::{SessionKind, SOCKET_PATH};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub appearance: Appearance,
    #[serde(deserialize_with = "dark_palette")]
    pub dark: Theme,
    #[serde(deserialize_with = "light_palette")]
    pub light: Theme,
    pub icons: Icons,
    /// Ring the terminal bell on start, countdown and completion.
    pub sound: bool,
    /// How often the UI loop redraws and ticks the clock.
    pub tick_rate_ms: u64,
    pub socket_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    #[default]
    Dark,
    Light,
}

impl Appearance {
    pub fn toggled(self) -> Self {
        match self {
            Appearance::Dark => Appearance::Light,
            Appearance::Light => Appearance::Dark,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub foreground: Color,
    pub surface: Color,
    pub muted: Color,
    pub accent: Color,
    pub focus: Color,
    pub short_break: Color,
    pub long_break: Color,
    pub warning: Color,
    pub error: Color,
}

/// A palette table as written in the config file. Keys left out are taken
/// from the built-in palette of the same appearance.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ThemeOverrides {
    #[serde(deserialize_with = "some_hex_color")]
    background: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    foreground: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    surface: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    muted: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    accent: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    focus: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    short_break: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    long_break: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    warning: Option<Color>,
    #[serde(deserialize_with = "some_hex_color")]
    error: Option<Color>,
}

impl ThemeOverrides {
    fn over(self, base: Theme) -> Theme {
        Theme {
            background: self.background.unwrap_or(base.background),
            foreground: self.foreground.unwrap_or(base.foreground),
            surface: self.surface.unwrap_or(base.surface),
            muted: self.muted.unwrap_or(base.muted),
            accent: self.accent.unwrap_or(base.accent),
            focus: self.focus.unwrap_or(base.focus),
            short_break: self.short_break.unwrap_or(base.short_break),
            long_break: self.long_break.unwrap_or(base.long_break),
            warning: self.warning.unwrap_or(base.warning),
            error: self.error.unwrap_or(base.error),
        }
    }
}

fn dark_palette<'de, D>(deserializer: D) -> Result<Theme, D::Error>
where
    D: serde::Deserializer<'de>,
{
    ThemeOverrides::deserialize(deserializer).map(|o| o.over(Theme::dark()))
}

fn light_palette<'de, D>(deserializer: D) -> Result<Theme, D::Error>
where
    D: serde::Deserializer<'de>,
{
    ThemeOverrides::deserialize(deserializer).map(|o| o.over(Theme::light()))
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Icons {
    pub play: String,
    pub pause: String,
    pub focus: String,
    pub short_break: String,
    pub long_break: String,
    pub streak: String,
    pub select: String,
    pub input_cursor: String,
    pub separator: String,
    pub header_left: String,
    pub header_right: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            appearance: Appearance::default(),
            dark: Theme::dark(),
            light: Theme::light(),
            icons: Icons::default(),
            sound: true,
            tick_rate_ms: 250,
            socket_path: PathBuf::from(SOCKET_PATH),
        }
    }
}

impl Config {
    pub fn theme(&self) -> &Theme {
        match self.appearance {
            Appearance::Dark => &self.dark,
            Appearance::Light => &self.light,
        }
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: Color::Rgb(9, 14, 19),
            foreground: Color::Rgb(197, 201, 199),
            surface: Color::Rgb(13, 12, 12),
            muted: Color::Rgb(164, 167, 164),
            accent: Color::Rgb(127, 180, 202),
            focus: Color::Rgb(239, 68, 68),
            short_break: Color::Rgb(16, 185, 129),
            long_break: Color::Rgb(249, 115, 22),
            warning: Color::Rgb(196, 178, 138),
            error: Color::Rgb(228, 104, 118),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color::Rgb(249, 250, 251),
            foreground: Color::Rgb(55, 65, 81),
            surface: Color::Rgb(229, 231, 235),
            muted: Color::Rgb(107, 114, 128),
            accent: Color::Rgb(37, 99, 235),
            focus: Color::Rgb(239, 68, 68),
            short_break: Color::Rgb(16, 185, 129),
            long_break: Color::Rgb(249, 115, 22),
            warning: Color::Rgb(217, 119, 6),
            error: Color::Rgb(220, 38, 38),
        }
    }

    pub fn session_color(&self, kind: SessionKind) -> Color {
        match kind {
            SessionKind::Focus => self.focus,
            SessionKind::ShortBreak => self.short_break,
            SessionKind::LongBreak => self.long_break,
        }
    }
}

impl Icons {
    pub fn session(&self, kind: SessionKind) -> &str {
        match kind {
            SessionKind::Focus => &self.focus,
            SessionKind::ShortBreak => &self.short_break,
            SessionKind::LongBreak => &self.long_break,
        }
    }
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            play: "▶".to_string(),
            pause: "⏸".to_string(),
            focus: "🍅".to_string(),
            short_break: "☕".to_string(),
            long_break: "🌴".to_string(),
            streak: "🔥".to_string(),
            select: "▸".to_string(),
            input_cursor: "▊".to_string(),
            separator: "│".to_string(),
            header_left: "⟪ ".to_string(),
            header_right: " ⟫".to_string(),
        }
    }
}

fn hex_to_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    let hex = s
        .strip_prefix('#')
        .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| <D::Error as serde::de::Error>::custom(format!("invalid hex color {:?}", s)))?;
    let channel = |i: usize| -> Result<u8, D::Error> {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(serde::de::Error::custom)
    };
    Ok(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn some_hex_color<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    hex_to_color(deserializer).map(Some)
}

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "pabloagn", "Tomato")
        .map(|proj_dirs| proj_dirs.config_dir().join("tomato.toml"))
}

pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(Config::default()),
    }
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {:?}", path))?;
    toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file at {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("tomato.toml")).unwrap();
        assert_eq!(cfg.appearance, Appearance::Dark);
        assert!(cfg.sound);
        assert_eq!(cfg.socket_path, PathBuf::from(SOCKET_PATH));
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tomato.toml");
        fs::write(
            &path,
            r##"
appearance = "light"
sound = false
tick_rate_ms = 100

[light]
focus = "#112233"
"##,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.appearance, Appearance::Light);
        assert!(!cfg.sound);
        assert_eq!(cfg.tick_rate(), Duration::from_millis(100));
        assert_eq!(cfg.theme().focus, Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(cfg.theme().background, Theme::light().background);
        assert_eq!(cfg.theme().foreground, Theme::light().foreground);
        assert_eq!(cfg.dark.focus, Theme::dark().focus);
    }

    #[test]
    fn partial_dark_table_keeps_dark_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tomato.toml");
        fs::write(&path, "[dark]\naccent = \"#abcdef\"\n").unwrap();
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.dark.accent, Color::Rgb(0xab, 0xcd, 0xef));
        assert_eq!(cfg.dark.background, Theme::dark().background);
        assert_eq!(cfg.light.background, Theme::light().background);
    }

    #[test]
    fn bad_hex_color_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tomato.toml");
        fs::write(&path, "[dark]\nfocus = \"red\"\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn non_ascii_color_is_an_error_not_a_panic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tomato.toml");
        for bad in ["#1\u{e9}234", "#12345\u{e9}", "#gg0000", "#+10000"] {
            fs::write(&path, format!("[dark]\nfocus = \"{}\"\n", bad)).unwrap();
            assert!(load_config_from(&path).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn appearance_toggles_between_palettes() {
        let mut cfg = Config::default();
        cfg.appearance = cfg.appearance.toggled();
        assert_eq!(cfg.theme().background, Theme::light().background);
        cfg.appearance = cfg.appearance.toggled();
        assert_eq!(cfg.theme().background, Theme::dark().background);
    }
}
