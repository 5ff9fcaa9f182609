use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::layout::LayoutOptions;
use crate::pdf::font::FontSource;
use crate::pdf::{PageGeometry, Rgb};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub line_height: Option<f32>,
    pub text_color: String,
    pub background_color: String,
    pub regular_font_path: Option<String>,
    pub bold_font_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 50.0,
            font_size: 12.0,
            line_height: None,
            text_color: "#000000".to_string(),
            background_color: "#ffffff".to_string(),
            regular_font_path: None,
            bold_font_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    page: Option<PageSettings>,
    text: Option<TextSettings>,
    font: Option<FontSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct PageSettings {
    width: Option<f32>,
    height: Option<f32>,
    margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct TextSettings {
    font_size: Option<f32>,
    line_height: Option<f32>,
    color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    regular_path: Option<String>,
    bold_path: Option<String>,
}

/// Built-in defaults, then `settings.toml` / `settings.local.toml` in the
/// working directory, then `~/.pdf-overlay/settings.toml`, then `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }
    load_settings_from(&ordered_paths)
}

/// Merges the built-in defaults with every existing file in `paths`, in order.
pub fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(page) = incoming.page {
            if let Some(width) = page.width.filter(|v| *v > 0.0) {
                self.page_width = width;
            }
            if let Some(height) = page.height.filter(|v| *v > 0.0) {
                self.page_height = height;
            }
            if let Some(margin) = page.margin.filter(|v| *v >= 0.0) {
                self.margin = margin;
            }
        }
        if let Some(text) = incoming.text {
            if let Some(size) = text.font_size.filter(|v| *v > 0.0) {
                self.font_size = size;
            }
            if let Some(height) = text.line_height.filter(|v| *v > 0.0) {
                self.line_height = Some(height);
            }
            if let Some(color) = text.color {
                merge_color(&mut self.text_color, color, "text.color");
            }
            if let Some(color) = text.background {
                merge_color(&mut self.background_color, color, "text.background");
            }
        }
        if let Some(font) = incoming.font {
            if let Some(path) = font.regular_path {
                if !path.trim().is_empty() {
                    self.regular_font_path = Some(path);
                }
            }
            if let Some(path) = font.bold_path {
                if !path.trim().is_empty() {
                    self.bold_font_path = Some(path);
                }
            }
        }
    }

    /// Line height to use; a third more than the font size unless set.
    pub fn effective_line_height(&self) -> f32 {
        self.line_height.unwrap_or(self.font_size * 4.0 / 3.0)
    }

    /// Resolves colours and reads the configured font files.
    pub fn layout_options(&self) -> Result<LayoutOptions> {
        let text_color = Rgb::from_hex(&self.text_color)
            .ok_or_else(|| anyhow!("invalid text colour '{}'", self.text_color))?;
        let background = Rgb::from_hex(&self.background_color)
            .ok_or_else(|| anyhow!("invalid background colour '{}'", self.background_color))?;
        Ok(LayoutOptions {
            font_size: self.font_size,
            line_height: self.effective_line_height(),
            margin: self.margin,
            default_page: PageGeometry {
                width: self.page_width,
                height: self.page_height,
            },
            text_color,
            background,
            regular_font: read_font(self.regular_font_path.as_deref())?,
            emphasized_font: read_font(self.bold_font_path.as_deref())?,
        })
    }
}

fn merge_color(target: &mut String, value: String, key: &str) {
    if value.trim().is_empty() {
        return;
    }
    if Rgb::from_hex(&value).is_none() {
        warn!("ignoring {} = '{}': expected #rgb or #rrggbb", key, value);
        return;
    }
    *target = value;
}

fn read_font(path: Option<&str>) -> Result<FontSource> {
    let Some(path) = path else {
        return Ok(FontSource::Standard);
    };
    let data = fs::read(path).with_context(|| format!("failed to read font: {}", path))?;
    Ok(FontSource::TrueType(Arc::new(data)))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".pdf-overlay"))
        }
    })
}
