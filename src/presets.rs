//! Quick-filter presets: one-click search text.

use serde::{Deserialize, Serialize};

/// A labelled search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub label: String,
    pub query: String,
}

impl Preset {
    pub fn new(label: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            query: query.into(),
        }
    }
}

/// The preset buttons and which one is active.
///
/// Selecting a preset yields the search text to apply; selecting the active
/// preset again toggles it off and yields `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetBar {
    presets: Vec<Preset>,
    active: Option<usize>,
}

impl PresetBar {
    pub fn new(presets: Vec<Preset>) -> Self {
        Self {
            presets,
            active: None,
        }
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn active(&self) -> Option<&Preset> {
        self.active.and_then(|i| self.presets.get(i))
    }

    /// Select by label. Unknown labels change nothing and yield `None`.
    pub fn select(&mut self, label: &str) -> Option<String> {
        let idx = self.presets.iter().position(|p| p.label == label)?;
        if self.active == Some(idx) {
            self.active = None;
            Some(String::new())
        } else {
            self.active = Some(idx);
            Some(self.presets[idx].query.clone())
        }
    }

    /// Deactivate any preset; the caller clears the search text.
    pub fn clear(&mut self) -> String {
        self.active = None;
        String::new()
    }

    /// Forget the active preset without touching the search text, e.g. when
    /// the user types over it.
    pub fn deactivate(&mut self) {
        self.active = None;
    }
}
