use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::document::{AttributeValue, Attributes};
use crate::editor::validate_attribute;

pub const DEFAULT_LOG_FILE: &str = "dictapad.log";

pub const FONT_SIZES: [f64; 14] = [
    8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 24.0, 28.0, 32.0, 36.0, 48.0, 74.0, 96.0,
];

const FONT_FAMILIES: [&str; 8] = [
    "Arial",
    "Calibri",
    "Cambria",
    "Consolas",
    "Courier New",
    "Georgia",
    "Segoe UI",
    "Times New Roman",
];

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Attributes of text in a fresh document.
    pub default_attributes: Attributes,
    /// Preset sizes offered by the toolbar.
    pub font_sizes: Vec<f64>,
    /// Sorted family names offered by the toolbar.
    pub font_families: Vec<String>,
    pub recognizer_command: Option<String>,
    pub recognizer_locales: Vec<String>,
    pub log_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_attributes: Attributes::default(),
            font_sizes: FONT_SIZES.to_vec(),
            font_families: FONT_FAMILIES.iter().map(|f| f.to_string()).collect(),
            recognizer_command: None,
            recognizer_locales: Vec::new(),
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Config {
    /// Defaults overlaid with `DICTAPAD_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`Config::from_env`] with a custom variable source. Invalid
    /// values are skipped with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(family) = lookup("DICTAPAD_FONT_FAMILY") {
            let value = AttributeValue::FontFamily(family.trim().to_string());
            match validate_attribute(&value) {
                Ok(()) => config.set_default_family(family.trim()),
                Err(err) => warn!(%err, "ignoring DICTAPAD_FONT_FAMILY"),
            }
        }

        if let Some(size) = lookup("DICTAPAD_FONT_SIZE") {
            match size.trim().parse::<f64>() {
                Ok(parsed) => match validate_attribute(&AttributeValue::FontSize(parsed)) {
                    Ok(()) => config.default_attributes.font_size = parsed,
                    Err(err) => warn!(%err, "ignoring DICTAPAD_FONT_SIZE"),
                },
                Err(_) => warn!(value = size.as_str(), "ignoring unparsable DICTAPAD_FONT_SIZE"),
            }
        }

        if let Some(command) = lookup("DICTAPAD_RECOGNIZER") {
            config.recognizer_command = Some(command).filter(|c| !c.trim().is_empty());
        }

        if let Some(locales) = lookup("DICTAPAD_RECOGNIZER_LOCALES") {
            config.recognizer_locales = locales
                .split(',')
                .map(str::trim)
                .filter(|locale| !locale.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(path) = lookup("DICTAPAD_LOG_FILE").filter(|p| !p.trim().is_empty()) {
            config.log_path = PathBuf::from(path);
        }

        config
    }

    fn set_default_family(&mut self, family: &str) {
        self.default_attributes.font_family = family.to_string();
        if !self.font_families.iter().any(|f| f == family) {
            self.font_families.push(family.to_string());
            self.font_families.sort();
        }
    }

    /// The family after `current` in the toolbar list, wrapping around.
    pub fn next_font_family(&self, current: Option<&str>) -> Option<&str> {
        if self.font_families.is_empty() {
            return None;
        }
        let position = current.and_then(|c| self.font_families.iter().position(|f| f == c));
        let next = match position {
            Some(index) => (index + 1) % self.font_families.len(),
            None => 0,
        };
        self.font_families.get(next).map(String::as_str)
    }

    /// The smallest preset size above `current`, wrapping to the smallest
    /// preset. A mixed or unknown size starts from the smallest.
    pub fn next_font_size(&self, current: Option<f64>) -> Option<f64> {
        let smallest = self.font_sizes.iter().copied().reduce(f64::min)?;
        let Some(current) = current else {
            return Some(smallest);
        };
        let larger = self
            .font_sizes
            .iter()
            .copied()
            .filter(|size| *size > current)
            .reduce(f64::min);
        Some(larger.unwrap_or(smallest))
    }
}
