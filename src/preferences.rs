//! UI preferences (theme and sidebar), persisted as one JSON record.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

use crate::storage::{KeyValueStore, StorageError, THEME_KEY};

/// Colour scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

/// Persisted UI preferences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiPreferences {
    /// Colour scheme.
    pub theme: Theme,
    /// Whether the conversation list is shown.
    pub sidebar_open: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            sidebar_open: true,
        }
    }
}

/// Observable preferences written through to the durable store.
///
/// Persistence is best effort: a failed write is logged and the in-memory
/// value still changes.
#[derive(Clone)]
pub struct PreferencesStore {
    state: Arc<watch::Sender<UiPreferences>>,
    storage: Arc<dyn KeyValueStore>,
}

impl PreferencesStore {
    /// Load preferences from `storage`, falling back to defaults.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let prefs = storage
            .get(THEME_KEY)
            .and_then(|raw| {
                serde_json::from_str::<UiPreferences>(&raw)
                    .map_err(|err| warn!(%err, "Ignoring unreadable UI preferences"))
                    .ok()
            })
            .unwrap_or_default();
        let (state, _) = watch::channel(prefs);
        Self {
            state: Arc::new(state),
            storage,
        }
    }

    /// Current preferences.
    #[must_use]
    pub fn snapshot(&self) -> UiPreferences {
        *self.state.borrow()
    }

    /// Receive every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UiPreferences> {
        self.state.subscribe()
    }

    /// Flip between light and dark; returns the new theme.
    pub fn toggle_theme(&self) -> Theme {
        self.update(|p| p.theme = p.theme.toggled()).theme
    }

    /// Set the theme.
    pub fn set_theme(&self, theme: Theme) {
        self.update(|p| p.theme = theme);
    }

    /// Show or hide the sidebar; returns the new visibility.
    pub fn toggle_sidebar(&self) -> bool {
        self.update(|p| p.sidebar_open = !p.sidebar_open).sidebar_open
    }

    /// Set sidebar visibility.
    pub fn set_sidebar_open(&self, open: bool) {
        self.update(|p| p.sidebar_open = open);
    }

    fn update(&self, f: impl FnOnce(&mut UiPreferences)) -> UiPreferences {
        self.state.send_modify(f);
        let prefs = self.snapshot();
        let written = serde_json::to_string(&prefs)
            .map_err(StorageError::from)
            .and_then(|raw| self.storage.set(THEME_KEY, &raw));
        if let Err(err) = written {
            warn!(%err, "Failed to persist UI preferences");
        }
        prefs
    }
}
