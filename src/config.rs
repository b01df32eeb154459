//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mindtree/mindtree.toml`
//! 3. Local config: an explicit file handed to [`Settings::load`]
//! 4. Environment variables: `MINDTREE_*` prefix (e.g. `MINDTREE_ID_PREFIX`)

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{MapError, MapResult};

/// Side new root children are placed on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NewChildSide {
    /// Balance by majority of existing children.
    #[default]
    Auto,
    Left,
    Right,
}

impl NewChildSide {
    pub const CHOICES: [&'static str; 3] = ["auto", "left", "right"];

    fn from_choice(value: &str) -> Self {
        match value {
            "left" => NewChildSide::Left,
            "right" => NewChildSide::Right,
            _ => NewChildSide::Auto,
        }
    }
}

impl fmt::Display for NewChildSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NewChildSide::Auto => "auto",
            NewChildSide::Left => "left",
            NewChildSide::Right => "right",
        };
        f.write_str(s)
    }
}

/// A fixed list of possible values with display translations.
///
/// Mismatched lists and unknown values are not errors: they are logged and
/// clamped to the first possible value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceProperty {
    name: String,
    possibles: Vec<String>,
    translations: Vec<String>,
    translations_to_possibles: BTreeMap<String, String>,
    selected: Option<usize>,
}

impl ChoiceProperty {
    pub fn new<P, T>(name: &str, possibles: P, translations: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let possibles: Vec<String> = possibles.into_iter().map(Into::into).collect();
        let translations: Vec<String> = translations.into_iter().map(Into::into).collect();
        if possibles.len() != translations.len() {
            warn!(
                property = name,
                possibles = possibles.len(),
                translations = translations.len(),
                "number of possible values does not match number of translations"
            );
        }
        let translations_to_possibles = translations
            .iter()
            .cloned()
            .zip(possibles.iter().cloned())
            .collect();
        let selected = (!possibles.is_empty()).then_some(0);
        Self {
            name: name.to_string(),
            possibles,
            translations,
            translations_to_possibles,
            selected,
        }
    }

    /// Possible values used as their own translations.
    pub fn untranslated<P>(name: &str, possibles: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let possibles: Vec<String> = possibles.into_iter().map(Into::into).collect();
        Self::new(name, possibles.clone(), possibles)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn possibles(&self) -> &[String] {
        &self.possibles
    }

    pub fn translations(&self) -> &[String] {
        &self.translations
    }

    pub fn value(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.possibles.get(i))
            .map(String::as_str)
    }

    /// Selects `value`; an unknown value falls back to the first possible.
    pub fn set_value(&mut self, value: &str) {
        if let Some(i) = self.possibles.iter().position(|p| p == value) {
            self.selected = Some(i);
            return;
        }
        warn!(
            property = %self.name,
            value,
            possibles = ?self.possibles,
            "unknown value, falling back to the first possible value"
        );
        self.selected = (!self.possibles.is_empty()).then_some(0);
    }

    /// Maps a displayed translation back to its value; unknown text is returned as is.
    pub fn value_for_translation<'a>(&'a self, translated: &'a str) -> &'a str {
        self.translations_to_possibles
            .get(translated)
            .map(String::as_str)
            .unwrap_or(translated)
    }
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub id_prefix: Option<String>,
    pub new_child_side: Option<String>,
}

/// Document settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Prefix of generated node ids (default: "ID_")
    pub id_prefix: String,
    /// Side of new root children (default: auto)
    pub new_child_side: NewChildSide,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id_prefix: "ID_".into(),
            new_child_side: NewChildSide::Auto,
        }
    }
}

/// Get the XDG config directory for mindtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mindtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mindtree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> MapResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| MapError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| MapError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> MapError {
    MapError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Resolves a configured side through its choice list.
    pub fn resolve_new_child_side(value: &str) -> NewChildSide {
        let mut choice = ChoiceProperty::untranslated("new_child_side", NewChildSide::CHOICES);
        choice.set_value(&value.trim().to_ascii_lowercase());
        NewChildSide::from_choice(choice.value().unwrap_or_default())
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            id_prefix: overlay
                .id_prefix
                .clone()
                .unwrap_or_else(|| self.id_prefix.clone()),
            new_child_side: overlay
                .new_child_side
                .as_deref()
                .map(Self::resolve_new_child_side)
                .unwrap_or(self.new_child_side),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional explicit config file (e.g. next to a document)
    pub fn load(local: Option<&Path>) -> MapResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
                debug!(path = %global_path.display(), "applied global config");
            }
        }

        if let Some(path) = local {
            if !path.exists() {
                return Err(MapError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
            debug!(path = %path.display(), "applied local config");
        }

        current = Self::apply_env_overrides(current)?;
        Ok(current)
    }

    /// Apply MINDTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> MapResult<Self> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MINDTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("id_prefix") {
            settings.id_prefix = val;
        }
        if let Ok(val) = config.get_string("new_child_side") {
            settings.new_child_side = Self::resolve_new_child_side(&val);
        }
        Ok(settings)
    }

    pub fn to_toml(&self) -> MapResult<String> {
        toml::to_string_pretty(self).map_err(|e| MapError::Config {
            message: e.to_string(),
        })
    }
}
