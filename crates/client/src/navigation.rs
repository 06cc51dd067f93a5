//! Navigation side effects triggered by session transitions.

use std::sync::Mutex;

/// Where the user is, where they were headed, and how to move them.
///
/// Implemented by whatever hosts the dashboard surfaces (router, shell, CLI).
pub trait Navigator: Send + Sync {
    /// Surface currently shown, if known.
    fn current_path(&self) -> Option<String>;

    /// Surface the user tried to reach before being sent to log in.
    fn intended_path(&self) -> Option<String>;

    fn navigate(&self, path: &str);
}

#[derive(Debug, Default)]
struct HistoryState {
    current: Option<String>,
    intended: Option<String>,
    history: Vec<String>,
}

/// In-process navigator that records every redirect.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    state: Mutex<HistoryState>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigator already showing `path`.
    pub fn at(path: impl Into<String>) -> Self {
        let nav = Self::new();
        nav.set_current(path);
        nav
    }

    pub fn set_current(&self, path: impl Into<String>) {
        self.lock().current = Some(path.into());
    }

    pub fn set_intended(&self, path: impl Into<String>) {
        self.lock().intended = Some(path.into());
    }

    /// Every path navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    pub fn last(&self) -> Option<String> {
        self.lock().history.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryState> {
        // Navigation state stays usable even if a holder panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> Option<String> {
        self.lock().current.clone()
    }

    fn intended_path(&self) -> Option<String> {
        self.lock().intended.clone()
    }

    fn navigate(&self, path: &str) {
        tracing::info!(path, "navigating");
        let mut state = self.lock();
        state.current = Some(path.to_string());
        state.intended = None;
        state.history.push(path.to_string());
    }
}
