//! `CardBoard` — ordered collection of speaker cards and their runtimes.
//!
//! ## Ownership
//!
//! ```text
//! CardBoard
//!   └─► BoardInner (parking_lot::Mutex)
//!         ├─► Vec<ReportCard>          ordered, single source of truth
//!         └─► HashMap<CardId, CardRuntime>
//!               ├─► Box<dyn CaptureSession>   at most one per card
//!               ├─► ticker JoinHandle          1 Hz elapsed-time events
//!               └─► inflight JoinHandle        at most one submission
//! ```
//!
//! Cards never block each other: each submission runs in its own
//! `spawn_blocking` task keyed by card id, and cancellation is tied only to
//! that card's deletion. The output language is the one cross-card value; it
//! is copied out of the lock at stop time and moved into the submission task,
//! so a language change cannot race an in-flight call.
//!
//! ## Threading
//!
//! `start_recording` and `stop_recording` must be called from within a Tokio
//! runtime (they spawn the tick and submission tasks). The capture device is
//! opened before the card transitions, so an acquisition failure lands the
//! card in `Error` without it ever having "recorded".

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    capture::{CaptureBackend, CaptureSession},
    card::{pipeline, CardId, CardPatch, CardStatus, ContextFile, ReportCard},
    error::{Result, RoundupError},
    ipc::events::{CardEvent, RecordingTickEvent},
    lang::Language,
    summarize::Summarizer,
};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Configuration for `CardBoard`.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Model identifier forwarded with every summarization request.
    pub model: String,
    /// Output language at startup; changeable via `set_language`.
    pub language: Language,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".into(),
            language: Language::English,
        }
    }
}

struct CardRuntime {
    session: Option<Box<dyn CaptureSession>>,
    ticker: Option<tokio::task::JoinHandle<()>>,
    inflight: Option<tokio::task::JoinHandle<()>>,
}

impl CardRuntime {
    fn new() -> Self {
        Self {
            session: None,
            ticker: None,
            inflight: None,
        }
    }
}

struct BoardInner {
    cards: Vec<ReportCard>,
    runtimes: HashMap<CardId, CardRuntime>,
    language: Language,
    next_id: u64,
}

impl BoardInner {
    fn card(&self, id: CardId) -> Result<&ReportCard> {
        self.cards
            .iter()
            .find(|c| c.id == id)
            .ok_or(RoundupError::CardNotFound(id))
    }

    fn card_mut(&mut self, id: CardId) -> Result<&mut ReportCard> {
        self.cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RoundupError::CardNotFound(id))
    }
}

/// The collection manager.
///
/// `CardBoard` is `Send + Sync` — all fields use interior mutability. Wrap in
/// `Arc<CardBoard>` to share between Tauri command handlers and
/// event-forwarding tasks.
pub struct CardBoard {
    inner: Arc<Mutex<BoardInner>>,
    capture: Arc<dyn CaptureBackend>,
    summarizer: Arc<dyn Summarizer>,
    model: String,
    events_tx: broadcast::Sender<CardEvent>,
    ticks_tx: broadcast::Sender<RecordingTickEvent>,
    seq: Arc<AtomicU64>,
}

impl CardBoard {
    pub fn new(
        config: BoardConfig,
        capture: Arc<dyn CaptureBackend>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (ticks_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            inner: Arc::new(Mutex::new(BoardInner {
                cards: Vec::new(),
                runtimes: HashMap::new(),
                language: config.language,
                next_id: 1,
            })),
            capture,
            summarizer,
            model: config.model,
            events_tx,
            ticks_tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    // ── Collection operations ────────────────────────────────────────────

    /// Append a new idle card named "Speaker N" (N = 1-based position at
    /// creation time). Returns a snapshot of the new card.
    pub fn create_card(&self) -> ReportCard {
        let mut inner = self.inner.lock();
        let id = CardId(inner.next_id);
        inner.next_id += 1;
        let name = format!("Speaker {}", inner.cards.len() + 1);
        let card = ReportCard::new(id, name);
        inner.cards.push(card.clone());
        inner.runtimes.insert(id, CardRuntime::new());
        info!(card_id = %id, "card created");
        card
    }

    /// Ordered snapshot of all cards.
    pub fn cards(&self) -> Vec<ReportCard> {
        self.inner.lock().cards.clone()
    }

    /// Snapshot of one card.
    pub fn card(&self, id: CardId) -> Result<ReportCard> {
        Ok(self.inner.lock().card(id)?.clone())
    }

    /// Merge a partial field update into the identified card. Never touches
    /// `status`.
    pub fn update_card(&self, id: CardId, patch: CardPatch) -> Result<ReportCard> {
        let mut inner = self.inner.lock();
        let card = inner.card_mut(id)?;
        card.apply_patch(patch);
        Ok(card.clone())
    }

    /// Attach a context file, replacing any prior attachment. Legal in every
    /// card state.
    pub fn attach_context_file(&self, id: CardId, file: ContextFile) -> Result<ReportCard> {
        let mut inner = self.inner.lock();
        let card = inner.card_mut(id)?;
        card.attach_context_file(file);
        Ok(card.clone())
    }

    /// Clear the attachment. Safe no-op when nothing is attached.
    pub fn remove_context_file(&self, id: CardId) -> Result<ReportCard> {
        let mut inner = self.inner.lock();
        let card = inner.card_mut(id)?;
        card.remove_context_file();
        Ok(card.clone())
    }

    /// Remove the card entirely. If it is recording, the capture device is
    /// released first; its tick and in-flight tasks are cancelled.
    pub fn delete_card(&self, id: CardId) -> Result<()> {
        let runtime = {
            let mut inner = self.inner.lock();
            let pos = inner
                .cards
                .iter()
                .position(|c| c.id == id)
                .ok_or(RoundupError::CardNotFound(id))?;
            inner.cards.remove(pos);
            inner.runtimes.remove(&id)
        };

        if let Some(runtime) = runtime {
            if let Some(ticker) = runtime.ticker {
                ticker.abort();
            }
            if let Some(inflight) = runtime.inflight {
                // A submission that already entered its closure finishes and
                // finds the card gone; one still queued never runs.
                inflight.abort();
            }
            if let Some(session) = runtime.session {
                // Release-exactly-once: `finish` consumes the session. The
                // clip is discarded.
                if let Err(e) = session.finish() {
                    warn!(card_id = %id, "capture finalize on delete failed: {e}");
                }
            }
        }

        info!(card_id = %id, "card deleted");
        Ok(())
    }

    /// Set the output language for subsequent submissions. In-flight and
    /// completed cards are unaffected.
    pub fn set_language(&self, language: Language) {
        self.inner.lock().language = language;
        info!(language = language.code(), "output language changed");
    }

    pub fn language(&self) -> Language {
        self.inner.lock().language
    }

    /// Subscribe to card status change events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CardEvent> {
        self.events_tx.subscribe()
    }

    /// Subscribe to per-second recording ticks.
    pub fn subscribe_ticks(&self) -> broadcast::Receiver<RecordingTickEvent> {
        self.ticks_tx.subscribe()
    }

    // ── Card recording lifecycle ─────────────────────────────────────────

    /// Start recording on the identified card with the default input device.
    pub fn start_recording(&self, id: CardId) -> Result<()> {
        self.start_recording_with_device(id, None)
    }

    /// Start recording using a preferred input device name.
    ///
    /// The device is opened before the card transitions; on acquisition
    /// failure the card moves straight to `Error` with the cause and the
    /// original error is returned.
    pub fn start_recording_with_device(
        &self,
        id: CardId,
        preferred_device: Option<String>,
    ) -> Result<()> {
        // Validate the edge before touching the device.
        {
            let inner = self.inner.lock();
            let card = inner.card(id)?;
            match card.status {
                CardStatus::Idle | CardStatus::Completed => {}
                CardStatus::Recording => return Err(RoundupError::AlreadyRecording(id)),
                from => {
                    return Err(RoundupError::InvalidTransition {
                        id,
                        from,
                        action: "start recording",
                    })
                }
            }
        }

        // Device open happens outside the lock — it can block.
        let session = match self.capture.acquire(preferred_device.as_deref()) {
            Ok(session) => session,
            Err(e) => {
                let message = e.to_string();
                let mut inner = self.inner.lock();
                if let Ok(card) = inner.card_mut(id) {
                    // The pre-check above may be stale (concurrent edit);
                    // only fail cards still in a startable state.
                    if card.fail_acquisition(message.clone()).is_ok() {
                        self.emit(id, CardStatus::Error, Some(message));
                    }
                }
                return Err(e);
            }
        };

        let mut inner = self.inner.lock();
        let card = match inner.card_mut(id) {
            Ok(card) => card,
            Err(e) => {
                // Card deleted while the device was opening: release and bail.
                drop(inner);
                if let Err(finish_err) = session.finish() {
                    warn!(card_id = %id, "orphan session finalize failed: {finish_err}");
                }
                return Err(e);
            }
        };
        card.begin_recording()?;

        let runtime = inner.runtimes.entry(id).or_insert_with(CardRuntime::new);
        runtime.session = Some(session);
        runtime.ticker = Some(self.spawn_ticker(id));
        drop(inner);

        self.emit(id, CardStatus::Recording, None);
        Ok(())
    }

    /// Stop recording: finalize the clip (device released synchronously),
    /// move to `Processing`, and spawn exactly one submission task.
    pub fn stop_recording(&self, id: CardId) -> Result<()> {
        let (session, ticker, language, context_file, context_text) = {
            let mut inner = self.inner.lock();
            let card = inner.card(id)?;
            if card.status != CardStatus::Recording {
                return Err(RoundupError::NotRecording(id));
            }
            let context_file = card.context_file.clone();
            let context_text = card.context_text.clone();
            let language = inner.language;

            let runtime = inner
                .runtimes
                .get_mut(&id)
                .ok_or(RoundupError::NotRecording(id))?;
            let session = runtime.session.take().ok_or(RoundupError::NotRecording(id))?;
            let ticker = runtime.ticker.take();
            (session, ticker, language, context_file, context_text)
        };

        if let Some(ticker) = ticker {
            ticker.abort();
        }

        // Synchronous finalize: the hardware is free before Processing is
        // announced. A finalize failure still walks the legal edges
        // (Recording → Processing → Error).
        let clip_result = session.finish();

        let mut inner = self.inner.lock();
        let card = inner.card_mut(id)?;
        match clip_result {
            Ok(clip) => {
                card.begin_processing(clip.duration_seconds)?;
                drop(inner);
                self.emit(id, CardStatus::Processing, None);
                self.spawn_submission(id, clip, language, context_file, context_text);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                card.begin_processing(0)?;
                let _ = card.fail(message.clone());
                drop(inner);
                self.emit(id, CardStatus::Error, Some(message));
                Err(e)
            }
        }
    }

    /// Explicit user reset: `Error` → `Idle`.
    pub fn reset_card(&self, id: CardId) -> Result<ReportCard> {
        let mut inner = self.inner.lock();
        let card = inner.card_mut(id)?;
        card.reset()?;
        let snapshot = card.clone();
        drop(inner);
        self.emit(id, CardStatus::Idle, None);
        Ok(snapshot)
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn emit(&self, card_id: CardId, status: CardStatus, detail: Option<String>) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let _ = self.events_tx.send(CardEvent {
            seq,
            card_id,
            status,
            detail,
        });
    }

    /// 1 Hz elapsed-seconds events while the card stays in `Recording`.
    fn spawn_ticker(&self, id: CardId) -> tokio::task::JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let ticks_tx = self.ticks_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // First tick of `interval` fires immediately; skip it so the
            // first event reads "1 second elapsed".
            interval.tick().await;
            let mut elapsed = 0u64;
            loop {
                interval.tick().await;
                elapsed += 1;
                let still_recording = {
                    let guard = inner.lock();
                    guard
                        .cards
                        .iter()
                        .find(|c| c.id == id)
                        .map(|c| c.status == CardStatus::Recording)
                        .unwrap_or(false)
                };
                if !still_recording {
                    break;
                }
                let _ = ticks_tx.send(RecordingTickEvent {
                    card_id: id,
                    elapsed_seconds: elapsed,
                });
            }
        })
    }

    /// Exactly one submission per stop. Runs the blocking summarizer call off
    /// the async executor and maps the result back onto the card — unless the
    /// card was deleted in the meantime, in which case the result is dropped.
    fn spawn_submission(
        &self,
        id: CardId,
        clip: crate::capture::AudioClip,
        language: Language,
        context_file: Option<ContextFile>,
        context_text: Option<String>,
    ) {
        let request = pipeline::assemble_request(
            context_file.as_ref(),
            context_text.as_deref(),
            &clip,
            language,
            &self.model,
        );

        let summarizer = Arc::clone(&self.summarizer);
        let inner = Arc::clone(&self.inner);
        let events_tx = self.events_tx.clone();
        let seq = Arc::clone(&self.seq);

        let handle = tokio::task::spawn_blocking(move || {
            let result = summarizer.summarize(&request);

            let mut guard = inner.lock();
            let outcome = {
                let Some(card) = guard.cards.iter_mut().find(|c| c.id == id) else {
                    info!(card_id = %id, "summary arrived for deleted card — dropped");
                    return;
                };
                match result {
                    Ok(raw) => {
                        let text = pipeline::resolve_summary(&raw, language);
                        card.complete(text).map(|_| (CardStatus::Completed, None))
                    }
                    Err(e) => {
                        let message = e.to_string();
                        card.fail(message.clone())
                            .map(|_| (CardStatus::Error, Some(message)))
                    }
                }
            };
            if let Some(runtime) = guard.runtimes.get_mut(&id) {
                runtime.inflight = None;
            }
            drop(guard);

            match outcome {
                Ok((status, detail)) => {
                    let _ = events_tx.send(CardEvent {
                        seq: seq.fetch_add(1, Ordering::Relaxed),
                        card_id: id,
                        status,
                        detail,
                    });
                }
                Err(e) => warn!(card_id = %id, "submission result ignored: {e}"),
            }
        });

        let mut inner = self.inner.lock();
        if let Some(runtime) = inner.runtimes.get_mut(&id) {
            runtime.inflight = Some(handle);
        }
    }
}

impl Drop for CardBoard {
    fn drop(&mut self) {
        // Cleanup-on-exit obligation: release every live capture device.
        let mut inner = self.inner.lock();
        for (id, runtime) in inner.runtimes.drain() {
            if let Some(ticker) = runtime.ticker {
                ticker.abort();
            }
            if let Some(inflight) = runtime.inflight {
                inflight.abort();
            }
            if runtime.session.is_some() {
                // Dropping the session stops its thread and releases the
                // device; the unfinished clip is discarded.
                info!(card_id = %id, "releasing live capture session on shutdown");
            }
        }
    }
}
