//! End-to-end board flows against scripted capture and summarizer fakes.
//!
//! No real microphone or network is touched: `FakeCapture` hands out sessions
//! that finalize to a fixed 5-second clip, and `FakeSummarizer` replays a
//! scripted result while recording every request it receives.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::timeout;

use roundup_core::capture::clip::WAV_MIME;
use roundup_core::{
    AudioClip, BoardConfig, CaptureBackend, CaptureSession, CardBoard, CardEvent, CardId,
    CardPatch, CardStatus, ContextFile, Language, RequestPart, Result, RoundupError, Summarizer,
    SummaryRequest,
};

// ── Fakes ────────────────────────────────────────────────────────────────

struct FakeCapture {
    deny: bool,
    /// Counts device releases: one per session, whether finished or dropped.
    releases: Arc<AtomicUsize>,
}

impl FakeCapture {
    fn new() -> Self {
        Self {
            deny: false,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn denying() -> Self {
        Self {
            deny: true,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl CaptureBackend for FakeCapture {
    fn acquire(&self, _preferred_device: Option<&str>) -> Result<Box<dyn CaptureSession>> {
        if self.deny {
            return Err(RoundupError::MicAccessDenied);
        }
        Ok(Box::new(FakeSession {
            releases: Arc::clone(&self.releases),
            released: false,
        }))
    }
}

struct FakeSession {
    releases: Arc<AtomicUsize>,
    released: bool,
}

impl CaptureSession for FakeSession {
    fn finish(mut self: Box<Self>) -> Result<AudioClip> {
        self.released = true;
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(AudioClip {
            mime_type: WAV_MIME,
            bytes: vec![0u8; 64],
            duration_seconds: 5,
            sample_rate: 16_000,
        })
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if !self.released {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct FakeSummarizer {
    script: std::result::Result<String, String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<SummaryRequest>>,
}

/// Summarizer that blocks inside `summarize` until released, so a test can
/// interleave board operations with an in-flight submission.
struct GatedSummarizer {
    script: String,
    gate: Mutex<std::sync::mpsc::Receiver<()>>,
}

impl GatedSummarizer {
    fn returning(text: &str) -> (Self, std::sync::mpsc::Sender<()>) {
        let (release_tx, gate_rx) = std::sync::mpsc::channel();
        (
            Self {
                script: text.to_string(),
                gate: Mutex::new(gate_rx),
            },
            release_tx,
        )
    }
}

impl Summarizer for GatedSummarizer {
    fn summarize(&self, _request: &SummaryRequest) -> Result<String> {
        // Runs on the blocking pool, so a blocking recv is fine here.
        self.gate
            .lock()
            .recv()
            .map_err(|_| RoundupError::Summarize("gate closed".into()))?;
        Ok(self.script.clone())
    }
}

impl FakeSummarizer {
    fn returning(text: &str) -> Self {
        Self {
            script: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            script: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl Summarizer for FakeSummarizer {
    fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        match &self.script {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(RoundupError::Summarize(message.clone())),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn board_with(
    capture: FakeCapture,
    summarizer: Arc<FakeSummarizer>,
) -> (CardBoard, Arc<AtomicUsize>) {
    let releases = Arc::clone(&capture.releases);
    let board = CardBoard::new(BoardConfig::default(), Arc::new(capture), summarizer);
    (board, releases)
}

async fn wait_for_status(
    rx: &mut broadcast::Receiver<CardEvent>,
    id: CardId,
    status: CardStatus,
) -> CardEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if event.card_id == id && event.status == status {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {status:?} on card {id}"))
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn happy_path_records_submits_and_completes() {
    let summarizer = Arc::new(FakeSummarizer::returning("- Task A done"));
    let (board, releases) = board_with(FakeCapture::new(), Arc::clone(&summarizer));
    let mut events = board.subscribe_events();

    let card = board.create_card();
    assert_eq!(card.speaker_name, "Speaker 1");
    assert_eq!(card.status, CardStatus::Idle);

    board.start_recording(card.id).unwrap();
    wait_for_status(&mut events, card.id, CardStatus::Recording).await;

    board.stop_recording(card.id).unwrap();
    wait_for_status(&mut events, card.id, CardStatus::Processing).await;
    wait_for_status(&mut events, card.id, CardStatus::Completed).await;

    let card = board.card(card.id).unwrap();
    assert_eq!(card.status, CardStatus::Completed);
    assert_eq!(card.text, "- Task A done");
    assert_eq!(card.duration_seconds, Some(5));
    assert_eq!(card.error, None);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn denied_mic_fails_the_card_without_recording() {
    let summarizer = Arc::new(FakeSummarizer::returning("unused"));
    let (board, _) = board_with(FakeCapture::denying(), Arc::clone(&summarizer));
    let mut events = board.subscribe_events();

    let card = board.create_card();
    let err = board.start_recording(card.id).unwrap_err();
    assert!(matches!(err, RoundupError::MicAccessDenied));

    let event = wait_for_status(&mut events, card.id, CardStatus::Error).await;
    assert_eq!(event.detail.as_deref(), Some("Mic access denied"));

    let card = board.card(card.id).unwrap();
    assert_eq!(card.status, CardStatus::Error);
    assert_eq!(card.error.as_deref(), Some("Mic access denied"));
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_response_falls_back_to_the_german_literal() {
    let summarizer = Arc::new(FakeSummarizer::returning("   \n"));
    let (board, _) = board_with(FakeCapture::new(), Arc::clone(&summarizer));
    let mut events = board.subscribe_events();

    board.set_language(Language::German);
    let card = board.create_card();
    board.start_recording(card.id).unwrap();
    board.stop_recording(card.id).unwrap();
    wait_for_status(&mut events, card.id, CardStatus::Completed).await;

    let card = board.card(card.id).unwrap();
    assert_eq!(card.text, "Keine neuen Updates erkannt.");
}

#[tokio::test]
async fn language_change_cannot_affect_an_in_flight_submission() {
    let (summarizer, release) = GatedSummarizer::returning("");
    let capture = FakeCapture::new();
    let board = CardBoard::new(
        BoardConfig::default(),
        Arc::new(capture),
        Arc::new(summarizer),
    );
    let mut events = board.subscribe_events();

    let card = board.create_card();
    board.start_recording(card.id).unwrap();
    board.stop_recording(card.id).unwrap();
    wait_for_status(&mut events, card.id, CardStatus::Processing).await;

    // The submission is now parked inside the summarizer. Flip the language
    // and only then let it finish with an empty response.
    board.set_language(Language::German);
    release.send(()).unwrap();
    wait_for_status(&mut events, card.id, CardStatus::Completed).await;

    // The fallback matches the language at stop time, not the new one.
    let card = board.card(card.id).unwrap();
    assert_eq!(card.text, "No new updates detected.");
    assert_eq!(board.language(), Language::German);
}

#[tokio::test]
async fn context_text_and_file_travel_with_the_request() {
    let summarizer = Arc::new(FakeSummarizer::returning("- nothing new"));
    let (board, _) = board_with(FakeCapture::new(), Arc::clone(&summarizer));
    let mut events = board.subscribe_events();

    let card = board.create_card();
    board
        .update_card(
            card.id,
            CardPatch {
                speaker_name: None,
                text: None,
                context_text: Some("Already deployed v1".into()),
            },
        )
        .unwrap();
    board
        .attach_context_file(
            card.id,
            ContextFile {
                name: "status.pdf".into(),
                mime_type: "application/pdf".into(),
                data: "UERG".into(),
            },
        )
        .unwrap();

    board.start_recording(card.id).unwrap();
    board.stop_recording(card.id).unwrap();
    wait_for_status(&mut events, card.id, CardStatus::Completed).await;

    let requests = summarizer.requests.lock();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.parts.len(), 4);
    assert!(matches!(
        &request.parts[0],
        RequestPart::Blob { mime_type, data } if mime_type == "application/pdf" && data == "UERG"
    ));
    assert!(matches!(
        &request.parts[1],
        RequestPart::Text(text) if text.contains("Already deployed v1")
    ));
    assert!(matches!(
        &request.parts[2],
        RequestPart::Blob { mime_type, .. } if mime_type == "audio/wav"
    ));
    assert_eq!(request.model, "gemini-2.5-flash");
}

#[tokio::test]
async fn summarizer_failure_lands_in_error_and_reset_recovers() {
    let summarizer = Arc::new(FakeSummarizer::failing("HTTP 503: overloaded"));
    let (board, _) = board_with(FakeCapture::new(), Arc::clone(&summarizer));
    let mut events = board.subscribe_events();

    let card = board.create_card();
    board.start_recording(card.id).unwrap();
    board.stop_recording(card.id).unwrap();
    let event = wait_for_status(&mut events, card.id, CardStatus::Error).await;
    assert!(event.detail.unwrap().contains("HTTP 503"));

    let card = board.reset_card(card.id).unwrap();
    assert_eq!(card.status, CardStatus::Idle);
    assert_eq!(card.error, None);
}

#[tokio::test]
async fn each_stop_submits_exactly_once() {
    let summarizer = Arc::new(FakeSummarizer::returning("- done"));
    let (board, _) = board_with(FakeCapture::new(), Arc::clone(&summarizer));
    let mut events = board.subscribe_events();

    let card = board.create_card();
    board.start_recording(card.id).unwrap();
    board.stop_recording(card.id).unwrap();

    // A second stop on a card no longer recording is rejected, not re-queued.
    let err = board.stop_recording(card.id).unwrap_err();
    assert!(matches!(err, RoundupError::NotRecording(_)));

    wait_for_status(&mut events, card.id, CardStatus::Completed).await;
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delete_while_recording_releases_the_device_exactly_once() {
    let summarizer = Arc::new(FakeSummarizer::returning("unused"));
    let (board, releases) = board_with(FakeCapture::new(), Arc::clone(&summarizer));

    let card = board.create_card();
    board.start_recording(card.id).unwrap();
    board.delete_card(card.id).unwrap();

    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert!(board.cards().is_empty());
    assert!(matches!(
        board.card(card.id).unwrap_err(),
        RoundupError::CardNotFound(_)
    ));

    drop(board);
    assert_eq!(releases.load(Ordering::SeqCst), 1, "no double release");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cards_stay_independent_while_one_records() {
    let summarizer = Arc::new(FakeSummarizer::returning("- A spoke"));
    let (board, _) = board_with(FakeCapture::new(), Arc::clone(&summarizer));
    let mut events = board.subscribe_events();

    let a = board.create_card();
    let b = board.create_card();
    assert_eq!(b.speaker_name, "Speaker 2");

    board.start_recording(a.id).unwrap();

    // B is fully editable and deletable while A records.
    let b = board
        .update_card(
            b.id,
            CardPatch {
                speaker_name: Some("Dana".into()),
                text: None,
                context_text: None,
            },
        )
        .unwrap();
    assert_eq!(b.speaker_name, "Dana");
    assert_eq!(b.status, CardStatus::Idle);
    board.delete_card(b.id).unwrap();

    board.stop_recording(a.id).unwrap();
    wait_for_status(&mut events, a.id, CardStatus::Completed).await;
    assert_eq!(board.card(a.id).unwrap().text, "- A spoke");
}

#[tokio::test]
async fn completed_card_can_record_again() {
    let summarizer = Arc::new(FakeSummarizer::returning("- round two"));
    let (board, releases) = board_with(FakeCapture::new(), Arc::clone(&summarizer));
    let mut events = board.subscribe_events();

    let card = board.create_card();
    board.start_recording(card.id).unwrap();
    board.stop_recording(card.id).unwrap();
    wait_for_status(&mut events, card.id, CardStatus::Completed).await;

    board.start_recording(card.id).unwrap();
    let err = board.start_recording(card.id).unwrap_err();
    assert!(matches!(err, RoundupError::AlreadyRecording(_)));
    board.stop_recording(card.id).unwrap();
    wait_for_status(&mut events, card.id, CardStatus::Completed).await;

    assert_eq!(releases.load(Ordering::SeqCst), 2);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
}
