//! # Locale Provider
//!
//! Holds the active UI language.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌───────────────┐   activate()    ┌──────────────────┐                │
//! │  │ Uninitialized │ ──────────────► │ Ready(language)  │◄──┐            │
//! │  └───────────────┘  read stored    └────────┬─────────┘   │            │
//! │                     code, fall back         │             │            │
//! │                     to pt-BR                │ set_language(code)       │
//! │                                             │  supported → update +    │
//! │                                             │              persist     │
//! │                                             │  otherwise → no-op       │
//! │                                             └─────────────┘            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The provider never fails: storage errors are logged and the in-memory
//! language stays authoritative.

use std::sync::{Arc, PoisonError, RwLock};

use estoque_core::i18n::{language_catalog, LanguageOption};
use estoque_core::{Language, Translations};
use tracing::{debug, info, warn};

use crate::storage::{PreferenceStore, LANGUAGE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocaleState {
    Uninitialized,
    Ready(Language),
}

/// Process-wide language state, persisted through a [`PreferenceStore`].
pub struct LocaleProvider {
    store: Arc<dyn PreferenceStore>,
    state: RwLock<LocaleState>,
}

impl LocaleProvider {
    /// Creates an uninitialized provider; nothing is read until first use.
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        LocaleProvider {
            store,
            state: RwLock::new(LocaleState::Uninitialized),
        }
    }

    /// Reads the persisted preference once. Later calls are no-ops.
    pub fn activate(&self) -> Language {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let LocaleState::Ready(language) = *state {
            return language;
        }

        let language = match self.store.get(LANGUAGE_KEY) {
            Ok(Some(code)) => Language::from_code(&code).unwrap_or_else(|| {
                warn!(code = %code, "Unsupported stored language, using baseline");
                Language::default()
            }),
            Ok(None) => Language::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read language preference");
                Language::default()
            }
        };

        debug!(language = %language, "Locale provider ready");
        *state = LocaleState::Ready(language);
        language
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            *self.state.read().unwrap_or_else(PoisonError::into_inner),
            LocaleState::Ready(_)
        )
    }

    /// Active language, activating the provider on first access.
    pub fn language(&self) -> Language {
        let state = *self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state {
            LocaleState::Ready(language) => language,
            LocaleState::Uninitialized => self.activate(),
        }
    }

    /// Switches language. Returns `false` (and changes nothing) when `code`
    /// is not in the supported catalog.
    pub fn set_language(&self, code: &str) -> bool {
        let Some(language) = Language::from_code(code) else {
            debug!(code = %code, "Ignoring unsupported language");
            return false;
        };

        self.activate();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = LocaleState::Ready(language);

        if let Err(e) = self.store.set(LANGUAGE_KEY, language.code()) {
            warn!(error = %e, "Failed to persist language preference");
        }
        info!(language = %language, "Language changed");
        true
    }

    /// Translation table of the active language.
    pub fn translations(&self) -> Translations {
        self.language().translations()
    }

    /// Supported languages for the picker.
    pub fn supported_languages(&self) -> Vec<LanguageOption> {
        language_catalog()
    }
}
