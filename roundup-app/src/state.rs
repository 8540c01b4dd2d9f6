//! Tauri application state.
//!
//! `AppState` is managed via `app.manage(...)` and injected into command handlers
//! by Tauri's `State<'_, AppState>` extractor.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use roundup_core::CardBoard;
use serde::Serialize;

use crate::settings::AppSettings;

/// Shared application state — available in every `#[tauri::command]`.
pub struct AppState {
    /// The core board. Wrapped in `Arc` so it can be cloned into
    /// event-forwarding tasks started after setup.
    pub board: Arc<CardBoard>,
    /// Persisted app settings cache.
    pub settings: Arc<Mutex<AppSettings>>,
    /// Absolute path to `settings.json`.
    pub settings_path: PathBuf,
    /// Count of cards created since launch.
    pub cards_created: Arc<AtomicUsize>,
    /// Count of summaries that reached the card.
    pub summaries_completed: Arc<AtomicUsize>,
    /// Count of submissions that ended in a card error.
    pub summaries_failed: Arc<AtomicUsize>,
    /// Count of summaries copied to the clipboard.
    pub copies: Arc<AtomicUsize>,
}

impl AppState {
    pub fn diagnostics_snapshot(&self) -> AppDiagnostics {
        AppDiagnostics {
            cards_created: self.cards_created.load(Ordering::Relaxed),
            summaries_completed: self.summaries_completed.load(Ordering::Relaxed),
            summaries_failed: self.summaries_failed.load(Ordering::Relaxed),
            copies: self.copies.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDiagnostics {
    pub cards_created: usize,
    pub summaries_completed: usize,
    pub summaries_failed: usize,
    pub copies: usize,
}
