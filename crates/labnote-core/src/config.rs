//! `labnote.toml` configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::ExperimentTitle;

/// Environment variable that overrides `output_dir`.
pub const OUTPUT_DIR_ENV: &str = "LABNOTE_OUTPUT_DIR";

/// Top-level labnote configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabnoteConfig {
    /// Title new sessions start on. Accepts the full title or an alias.
    #[serde(default, deserialize_with = "deserialize_title")]
    pub default_title: ExperimentTitle,
    /// Where exported snapshots and rendered documents are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub report: ReportSettings,
}

/// Output format of the rendered report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Html,
    Pdf,
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Html => write!(f, "html"),
            DocumentFormat::Pdf => write!(f, "pdf"),
        }
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(DocumentFormat::Html),
            "pdf" => Ok(DocumentFormat::Pdf),
            other => Err(format!("unknown document format: {other} (expected html or pdf)")),
        }
    }
}

/// Rendering and feedback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default)]
    pub format: DocumentFormat,
    /// TrueType font with Japanese glyphs, embedded in PDF output.
    #[serde(default)]
    pub pdf_font: Option<PathBuf>,
    #[serde(default = "default_chart_width")]
    pub chart_width_px: u32,
    #[serde(default = "default_chart_height")]
    pub chart_height_px: u32,
    /// Totals below this are "insufficient".
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u32,
    /// Totals at or above this are "excellent".
    #[serde(default = "default_excellent_threshold")]
    pub excellent_threshold: u32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./labnote-output")
}
fn default_chart_width() -> u32 {
    600
}
fn default_chart_height() -> u32 {
    400
}
fn default_pass_threshold() -> u32 {
    60
}
fn default_excellent_threshold() -> u32 {
    80
}

fn deserialize_title<'de, D>(deserializer: D) -> Result<ExperimentTitle, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

impl Default for LabnoteConfig {
    fn default() -> Self {
        Self {
            default_title: ExperimentTitle::default(),
            output_dir: default_output_dir(),
            report: ReportSettings::default(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            format: DocumentFormat::default(),
            pdf_font: None,
            chart_width_px: default_chart_width(),
            chart_height_px: default_chart_height(),
            pass_threshold: default_pass_threshold(),
            excellent_threshold: default_excellent_threshold(),
        }
    }
}

/// Resolve `${VAR_NAME}` references from the environment. Unset variables
/// resolve to empty text; an unterminated reference is left as is.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(len) = result[start..].find('}') else {
            break;
        };
        let name = &result[start + 2..start + len];
        let value = std::env::var(name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + len + 1..]);
    }
    result
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `path`, which must exist when given
/// 2. `labnote.toml` in the current directory
/// 3. `~/.config/labnote/config.toml`
///
/// `LABNOTE_OUTPUT_DIR` overrides `output_dir`.
pub fn load_config_from(path: Option<&Path>) -> Result<LabnoteConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => [Some(PathBuf::from("labnote.toml")), home_config()]
            .into_iter()
            .flatten()
            .find(|p| p.exists()),
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            toml::from_str::<LabnoteConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LabnoteConfig::default(),
    };

    if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
        config.output_dir = PathBuf::from(dir);
    }
    config.output_dir = PathBuf::from(resolve_env_vars(&config.output_dir.to_string_lossy()));
    if let Some(font) = &config.report.pdf_font {
        config.report.pdf_font = Some(PathBuf::from(resolve_env_vars(&font.to_string_lossy())));
    }

    Ok(config)
}

fn home_config() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|h| {
        PathBuf::from(h)
            .join(".config")
            .join("labnote")
            .join("config.toml")
    })
}

/// Starter config written by `labnote init`.
pub const SAMPLE_CONFIG: &str = r#"# labnote configuration

# Title for new sessions: heat, fuel-cell, water, or the full title
default_title = "heat"

# Exported snapshots and rendered documents go here
output_dir = "./labnote-output"

[report]
# Report format: html or pdf
format = "html"
# PDF output embeds this font; it must have Japanese glyphs
# pdf_font = "/usr/share/fonts/opentype/ipaexfont-gothic/ipaexg.ttf"
chart_width_px = 600
chart_height_px = 400
pass_threshold = 60
excellent_threshold = 80
"#;
