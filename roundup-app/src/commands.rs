//! Tauri command handlers.
//!
//! Each function is registered with `tauri::Builder::invoke_handler` and
//! callable from the frontend via `invoke(...)`.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use roundup_core::capture::device::DeviceInfo;
use roundup_core::{normalize_language, CardId, CardPatch, ReportCard};
use tauri::State;
use tracing::{info, warn};

use crate::settings::{normalize_model, save_settings, RuntimeSettings};
use crate::state::{AppDiagnostics, AppState};

/// Return the ordered card list.
#[tauri::command]
pub async fn list_cards(state: State<'_, AppState>) -> Result<Vec<ReportCard>, String> {
    Ok(state.board.cards())
}

/// Append a new idle card and return it.
#[tauri::command]
pub async fn create_card(state: State<'_, AppState>) -> Result<ReportCard, String> {
    state.cards_created.fetch_add(1, Ordering::Relaxed);
    Ok(state.board.create_card())
}

/// Merge a partial field update into a card.
#[tauri::command]
pub async fn update_card(
    state: State<'_, AppState>,
    card_id: CardId,
    patch: CardPatch,
) -> Result<ReportCard, String> {
    state
        .board
        .update_card(card_id, patch)
        .map_err(|e| e.to_string())
}

/// Remove a card and return the refreshed list.
#[tauri::command]
pub async fn delete_card(
    state: State<'_, AppState>,
    card_id: CardId,
) -> Result<Vec<ReportCard>, String> {
    state.board.delete_card(card_id).map_err(|e| e.to_string())?;
    Ok(state.board.cards())
}

/// Start recording on a card, using the persisted preferred input device.
#[tauri::command]
pub async fn start_recording(state: State<'_, AppState>, card_id: CardId) -> Result<(), String> {
    let preferred = state.settings.lock().preferred_input_device.clone();
    state
        .board
        .start_recording_with_device(card_id, preferred)
        .map_err(|e| e.to_string())
}

/// Stop recording and hand the clip to the summarization pipeline. The card
/// snapshot returned here is still `Processing`; completion arrives as an
/// event.
#[tauri::command]
pub async fn stop_recording(
    state: State<'_, AppState>,
    card_id: CardId,
) -> Result<ReportCard, String> {
    state
        .board
        .stop_recording(card_id)
        .map_err(|e| e.to_string())?;
    state.board.card(card_id).map_err(|e| e.to_string())
}

/// Recover an errored card back to idle.
#[tauri::command]
pub async fn reset_card(state: State<'_, AppState>, card_id: CardId) -> Result<ReportCard, String> {
    state.board.reset_card(card_id).map_err(|e| e.to_string())
}

/// Read a user-selected file and attach it as card context.
///
/// A read failure leaves the card (and any prior attachment) untouched.
#[tauri::command]
pub async fn attach_context_file(
    state: State<'_, AppState>,
    card_id: CardId,
    path: String,
) -> Result<ReportCard, String> {
    let file = match roundup_core::read_context_file(&PathBuf::from(&path)) {
        Ok(file) => file,
        Err(e) => {
            warn!(card_id = %card_id, path, "context file read failed: {e}");
            return Err(e.to_string());
        }
    };
    state
        .board
        .attach_context_file(card_id, file)
        .map_err(|e| e.to_string())
}

/// Clear a card's context attachment.
#[tauri::command]
pub async fn remove_context_file(
    state: State<'_, AppState>,
    card_id: CardId,
) -> Result<ReportCard, String> {
    state
        .board
        .remove_context_file(card_id)
        .map_err(|e| e.to_string())
}

/// Set the output language for subsequent submissions and persist it.
/// Returns the normalized language code.
#[tauri::command]
pub async fn set_language(state: State<'_, AppState>, language: String) -> Result<String, String> {
    let language = normalize_language(&language);
    state.board.set_language(language);

    let mut settings = state.settings.lock();
    settings.language = language.code().to_string();
    save_settings(&state.settings_path, &settings).map_err(|e| e.to_string())?;
    Ok(language.code().to_string())
}

/// Return the current output language code.
#[tauri::command]
pub async fn get_language(state: State<'_, AppState>) -> Result<String, String> {
    Ok(state.board.language().code().to_string())
}

/// Copy a card's summary text to the system clipboard.
#[tauri::command]
pub async fn copy_summary(state: State<'_, AppState>, card_id: CardId) -> Result<(), String> {
    let card = state.board.card(card_id).map_err(|e| e.to_string())?;
    let mut clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    clipboard.set_text(card.text).map_err(|e| e.to_string())?;
    state.copies.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

/// Return a list of available audio input devices.
#[tauri::command]
pub async fn list_audio_devices(_state: State<'_, AppState>) -> Result<Vec<DeviceInfo>, String> {
    Ok(roundup_core::capture::device::list_input_devices())
}

/// Return persisted runtime settings.
#[tauri::command]
pub async fn get_runtime_settings(state: State<'_, AppState>) -> Result<RuntimeSettings, String> {
    Ok(state.settings.lock().runtime_settings())
}

/// Persist runtime settings.
///
/// The language applies immediately; the API key, model, and timeout are read
/// by the summarizer at startup and apply on next launch.
#[tauri::command]
pub async fn set_runtime_settings(
    state: State<'_, AppState>,
    api_key: Option<String>,
    model: Option<String>,
    language: Option<String>,
    preferred_input_device: Option<String>,
    request_timeout_secs: Option<u64>,
) -> Result<RuntimeSettings, String> {
    let mut settings = state.settings.lock();
    if let Some(v) = api_key {
        settings.api_key = Some(v);
    }
    if let Some(v) = model {
        settings.model = normalize_model(&v);
    }
    if let Some(v) = language {
        let language = normalize_language(&v);
        settings.language = language.code().to_string();
        state.board.set_language(language);
    }
    if let Some(v) = preferred_input_device {
        settings.preferred_input_device = Some(v);
    }
    if let Some(v) = request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    settings.normalize();
    save_settings(&state.settings_path, &settings).map_err(|e| e.to_string())?;
    Ok(settings.runtime_settings())
}

/// Return app-level counters for the diagnostics panel.
#[tauri::command]
pub async fn get_diagnostics(state: State<'_, AppState>) -> Result<AppDiagnostics, String> {
    let diag = state.diagnostics_snapshot();
    info!(
        cards_created = diag.cards_created,
        summaries_completed = diag.summaries_completed,
        summaries_failed = diag.summaries_failed,
        "app diagnostics snapshot"
    );
    Ok(diag)
}
