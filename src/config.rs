//! Browser configuration, persisted as TOML.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```toml
//! sources = ["https://contoso.example/sites/hr||6f1c...", "https://contoso.example/sites/ops||91ab..."]
//! tag_retention = "keep"
//!
//! [[presets]]
//! label = "Contracts"
//! query = "contract"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::fetch::{DEFAULT_TARGET_FIELDS, FetchConfig};
use crate::paginate::Density;
use crate::presets::Preset;
use crate::source::DEFAULT_ROW_LIMIT;

/// What happens to selected tags when the source selection changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagRetention {
    /// Keep the selection, even if no loaded document carries the tag.
    Keep,
    /// Drop the selection.
    #[default]
    Clear,
}

/// Settings for a [`Browser`](crate::browser::Browser).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Selected libraries as composite keys. Undecodable entries are kept
    /// here and dropped at aggregation time.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Quick-filter buttons.
    #[serde(default)]
    pub presets: Vec<Preset>,
    /// Extra metadata columns requested in the enhanced query tier.
    #[serde(default = "default_target_fields")]
    pub target_fields: Vec<String>,
    /// Maximum rows fetched per library.
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,
    /// Quiet period before search input is applied.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_page_size_cards")]
    pub page_size_cards: usize,
    #[serde(default = "default_page_size_list")]
    pub page_size_list: usize,
    #[serde(default)]
    pub tag_retention: TagRetention,
}

fn default_target_fields() -> Vec<String> {
    DEFAULT_TARGET_FIELDS.iter().map(|f| f.to_string()).collect()
}
fn default_row_limit() -> usize {
    DEFAULT_ROW_LIMIT
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_page_size_cards() -> usize {
    12
}
fn default_page_size_list() -> usize {
    30
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            presets: Vec::new(),
            target_fields: default_target_fields(),
            row_limit: default_row_limit(),
            debounce_ms: default_debounce_ms(),
            page_size_cards: default_page_size_cards(),
            page_size_list: default_page_size_list(),
            tag_retention: TagRetention::default(),
        }
    }
}

impl BrowserConfig {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            target_fields: self.target_fields.clone(),
            row_limit: self.row_limit,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn page_size(&self, density: Density) -> usize {
        match density {
            Density::Cards => self.page_size_cards,
            Density::List => self.page_size_list,
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: BrowserConfig = toml::from_str("").unwrap();
        assert_eq!(config, BrowserConfig::default());
        assert_eq!(config.target_fields, vec!["Department", "Project", "DocType"]);
        assert_eq!(config.row_limit, 5000);
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.page_size(Density::Cards), 12);
        assert_eq!(config.page_size(Density::List), 30);
        assert_eq!(config.tag_retention, TagRetention::Clear);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config: BrowserConfig = toml::from_str(
            r#"
            sources = ["https://contoso.example/sites/hr||lib-1", "not-a-key"]
            tag_retention = "keep"
            page_size_list = 50

            [[presets]]
            label = "Contracts"
            query = "contract"
            "#,
        )
        .unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.tag_retention, TagRetention::Keep);
        assert_eq!(config.page_size(Density::List), 50);
        assert_eq!(config.page_size(Density::Cards), 12);
        assert_eq!(config.presets, vec![Preset::new("Contracts", "contract")]);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("browser.toml");
        let config = BrowserConfig {
            sources: vec!["https://contoso.example/sites/hr||lib-1".into()],
            presets: vec![Preset::new("Invoices", "invoice")],
            debounce_ms: 150,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(BrowserConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            BrowserConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "row_limit = \"many\"").unwrap();
        assert!(matches!(
            BrowserConfig::load(&bad),
            Err(ConfigError::Parse { .. })
        ));
    }
}
