//! Roundup desktop application entry point.
//!
//! ## Runtime note
//!
//! Tauri v2 manages its own Tokio runtime internally.
//! We use `tauri::async_runtime::spawn` (not `tokio::spawn`) so our tasks
//! share Tauri's runtime and can safely call Tauri APIs.

#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

mod commands;
mod settings;
mod state;

use std::sync::{atomic::AtomicUsize, Arc};

use parking_lot::Mutex;
use roundup_core::{
    normalize_language, BoardConfig, CardBoard, CloudConfig, CloudSummarizer, CpalBackend,
    StubSummarizer, Summarizer,
};
use settings::{apply_runtime_env_from_settings, default_settings_path, load_settings};
use state::AppState;
use tauri::Emitter;
use tracing::info;

/// Pick the summarization backend from the environment: a cloud client when
/// an API key is present, otherwise the offline stub.
fn build_summarizer(model: &str, timeout_secs: u64) -> Arc<dyn Summarizer> {
    match std::env::var("ROUNDUP_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let mut config = CloudConfig::new(key.trim());
            config.timeout_secs = timeout_secs;
            match CloudSummarizer::new(config) {
                Ok(cloud) => {
                    info!(model, "using CloudSummarizer");
                    Arc::new(cloud)
                }
                Err(e) => {
                    tracing::error!("cloud summarizer init failed: {e} — using StubSummarizer");
                    Arc::new(StubSummarizer)
                }
            }
        }
        _ => {
            tracing::warn!("no API key configured — using StubSummarizer");
            Arc::new(StubSummarizer)
        }
    }
}

fn main() {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roundup=info".parse().unwrap()),
        )
        .init();

    info!("Roundup starting");

    let settings_path = default_settings_path();
    let app_settings = load_settings(&settings_path);
    apply_runtime_env_from_settings(&app_settings);
    info!(
        settings_path = ?settings_path,
        model = %app_settings.model,
        language = %app_settings.language,
        "runtime settings loaded"
    );

    // Environment wins over the settings file for model and language.
    let model = std::env::var("ROUNDUP_MODEL").unwrap_or_else(|_| app_settings.model.clone());
    let language = normalize_language(
        &std::env::var("ROUNDUP_LANGUAGE").unwrap_or_else(|_| app_settings.language.clone()),
    );

    // ── Board setup ───────────────────────────────────────────────────────
    let summarizer = build_summarizer(&model, app_settings.request_timeout_secs);
    let board = Arc::new(CardBoard::new(
        BoardConfig {
            model,
            language,
        },
        Arc::new(CpalBackend),
        summarizer,
    ));

    // A fresh board greets the user with one empty card.
    let first = board.create_card();
    info!(card_id = %first.id, "initial card ready");

    let settings_state = Arc::new(Mutex::new(app_settings.clone()));
    let cards_created = Arc::new(AtomicUsize::new(1));
    let summaries_completed = Arc::new(AtomicUsize::new(0));
    let summaries_failed = Arc::new(AtomicUsize::new(0));
    let copies = Arc::new(AtomicUsize::new(0));

    // ── Tauri app ─────────────────────────────────────────────────────────
    let board_for_setup = Arc::clone(&board);
    let summaries_completed_for_setup = Arc::clone(&summaries_completed);
    let summaries_failed_for_setup = Arc::clone(&summaries_failed);

    tauri::Builder::default()
        .setup(move |app| {
            let app_handle = app.handle().clone();

            // ── Forward board events → Tauri event bus ────────────────────
            // Use tauri::async_runtime::spawn to share Tauri's Tokio runtime.

            let mut card_rx = board_for_setup.subscribe_events();
            let handle1 = app_handle.clone();
            let completed = Arc::clone(&summaries_completed_for_setup);
            let failed = Arc::clone(&summaries_failed_for_setup);
            tauri::async_runtime::spawn(async move {
                loop {
                    match card_rx.recv().await {
                        Ok(event) => {
                            match event.status {
                                roundup_core::CardStatus::Completed => {
                                    completed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                                }
                                roundup_core::CardStatus::Error => {
                                    failed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                                }
                                _ => {}
                            }
                            if let Err(e) = handle1.emit("roundup://cards", &event) {
                                tracing::warn!("emit card event: {e}");
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("card event receiver lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            let mut tick_rx = board_for_setup.subscribe_ticks();
            let handle2 = app_handle.clone();
            tauri::async_runtime::spawn(async move {
                loop {
                    match tick_rx.recv().await {
                        Ok(event) => {
                            if let Err(e) = handle2.emit("roundup://ticks", &event) {
                                tracing::warn!("emit tick event: {e}");
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("tick receiver lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            Ok(())
        })
        .manage(AppState {
            board: Arc::clone(&board),
            settings: settings_state,
            settings_path,
            cards_created,
            summaries_completed,
            summaries_failed,
            copies,
        })
        .invoke_handler(tauri::generate_handler![
            commands::list_cards,
            commands::create_card,
            commands::update_card,
            commands::delete_card,
            commands::start_recording,
            commands::stop_recording,
            commands::reset_card,
            commands::attach_context_file,
            commands::remove_context_file,
            commands::set_language,
            commands::get_language,
            commands::copy_summary,
            commands::list_audio_devices,
            commands::get_runtime_settings,
            commands::set_runtime_settings,
            commands::get_diagnostics,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Tauri application");
}
