//! # Theme Provider
//!
//! Light / dark preference, persisted like the language.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use estoque_core::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{PreferenceStore, THEME_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ValidationError::NotAllowed {
                field: "theme".to_string(),
                allowed: vec!["light".to_string(), "dark".to_string()],
            }),
        }
    }
}

pub struct ThemeProvider {
    store: Arc<dyn PreferenceStore>,
    theme: RwLock<Option<Theme>>,
}

impl ThemeProvider {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        ThemeProvider {
            store,
            theme: RwLock::new(None),
        }
    }

    /// Current theme, read from storage on first access.
    pub fn theme(&self) -> Theme {
        if let Some(theme) = *self.theme.read().unwrap_or_else(PoisonError::into_inner) {
            return theme;
        }

        let mut slot = self.theme.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(theme) = *slot {
            return theme;
        }
        let theme = match self.store.get(THEME_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read theme preference");
                Theme::default()
            }
        };
        *slot = Some(theme);
        theme
    }

    pub fn set_theme(&self, theme: Theme) {
        *self.theme.write().unwrap_or_else(PoisonError::into_inner) = Some(theme);
        if let Err(e) = self.store.set(THEME_KEY, theme.as_str()) {
            warn!(error = %e, "Failed to persist theme preference");
        }
        debug!(theme = %theme, "Theme changed");
    }

    pub fn toggle(&self) -> Theme {
        let next = self.theme().toggled();
        self.set_theme(next);
        next
    }
}
