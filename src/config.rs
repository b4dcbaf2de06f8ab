use console::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LbqError, Result};

const CONFIG_DIR: &str = "lbq";
const CONFIG_FILE: &str = "config.toml";
const LOCAL_CONFIG_FILE: &str = ".lbq.toml";

/// Settings read from config.toml.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LbqConfig {
    pub render: RenderConfig,
    pub fetch: FetchConfig,
}

/// When to emit terminal colour escapes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Applies the mode to console's global colour switches.
    pub fn apply(self) {
        match self {
            ColorMode::Auto => {}
            ColorMode::Always => {
                console::set_colors_enabled(true);
                console::set_colors_enabled_stderr(true);
            }
            ColorMode::Never => {
                console::set_colors_enabled(false);
                console::set_colors_enabled_stderr(false);
            }
        }
    }
}

/// Appearance of rendered Markdown.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderConfig {
    pub color: ColorMode,
    pub rule_width: usize,
    pub code_indent: usize,
    pub show_code_language: bool,
    pub heading_color: String,
    pub code_color: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            rule_width: 40,
            code_indent: 4,
            show_code_language: true,
            heading_color: "cyan".to_string(),
            code_color: "yellow".to_string(),
        }
    }
}

impl RenderConfig {
    /// Colour names in this config that `color_named` does not know.
    pub fn unknown_colors(&self) -> Vec<&str> {
        [self.heading_color.as_str(), self.code_color.as_str()]
            .into_iter()
            .filter(|name| color_named(name).is_none())
            .collect()
    }
}

/// HTTP source settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub chunk_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("lbq/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: Some(60),
            chunk_size: 8192,
        }
    }
}

/// Maps a colour name from config to a console colour.
pub fn color_named(name: &str) -> Option<Color> {
    match name.trim().to_ascii_lowercase().as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "white" => Some(Color::White),
        _ => None,
    }
}

/// Resolved config location and whether it is global.
pub struct ConfigLocation {
    pub path: PathBuf,
    pub is_global: bool,
}

/// Returns the config location for the working directory or the user.
pub fn config_location(global: bool) -> Result<ConfigLocation> {
    if global {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"));
        return Ok(ConfigLocation {
            path: config_home.join(CONFIG_DIR).join(CONFIG_FILE),
            is_global: true,
        });
    }

    let cwd = std::env::current_dir()?;
    Ok(ConfigLocation {
        path: cwd.join(LOCAL_CONFIG_FILE),
        is_global: false,
    })
}

/// Uses the local config if present, otherwise falls back to global.
pub fn config_location_auto() -> Result<ConfigLocation> {
    let local = config_location(false)?;
    if local.path.exists() {
        return Ok(local);
    }
    config_location(true)
}

/// Reads config from disk, returning defaults if missing.
pub fn read_config(path: &Path) -> Result<LbqConfig> {
    if !path.exists() {
        return Ok(LbqConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
        .map_err(|err| LbqError::Message(format!("{}: {}", path.display(), err)))
}

/// Parses config.toml content; absent keys keep their defaults.
pub fn parse_config(content: &str) -> Result<LbqConfig> {
    toml::from_str(content).map_err(|err| LbqError::Message(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = read_config(&dir.path().join("config.toml")).expect("read");
        assert_eq!(config, LbqConfig::default());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = parse_config("[render]\nrule-width = 12\ncolor = \"never\"\n").expect("parse");
        assert_eq!(config.render.rule_width, 12);
        assert_eq!(config.render.color, ColorMode::Never);
        assert_eq!(config.render.code_indent, 4);
        assert_eq!(config.fetch, FetchConfig::default());
    }

    #[test]
    fn reads_fetch_section() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[fetch]\nuser-agent = \"test-agent\"\ntimeout-secs = 5\nchunk-size = 16\n",
        )
        .expect("write");
        let config = read_config(&path).expect("read");
        assert_eq!(config.fetch.user_agent, "test-agent");
        assert_eq!(config.fetch.timeout_secs, Some(5));
        assert_eq!(config.fetch.chunk_size, 16);
    }

    #[test]
    fn invalid_toml_mentions_the_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[render\n").expect("write");
        let err = read_config(&path).expect_err("invalid toml should fail");
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn reports_unknown_color_names() {
        let render = RenderConfig {
            heading_color: "Magenta".to_string(),
            code_color: "chartreuse".to_string(),
            ..RenderConfig::default()
        };
        assert_eq!(render.unknown_colors(), vec!["chartreuse"]);
        assert_eq!(color_named("Magenta"), Some(Color::Magenta));
    }
}
