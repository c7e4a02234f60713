// Scripted collaborators for orchestrator tests
//
// Each fake records what the orchestrator asked of it so tests can check
// call order and counts without real audio or speech engines.

#![allow(dead_code)]

use loqa_dialogue::{
    AudioFrame, AudioHandle, CaptureBackend, CaptureError, ConversationState, OrchestratorConfig,
    Recognition, RecognitionError, Recognizer, ResponseGenerator, Scenario, ScenarioScript,
    ScriptedResponder, SessionStore, SessionSummary, StreamHandle, StreamRequest, SynthesisError,
    Synthesizer, Transcript, TurnOrchestrator, TurnRecord, VadConfig,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

pub const SAMPLE_RATE: u32 = 16000;

/// What the fake microphone produces once started
#[derive(Debug, Clone, Copy)]
pub enum FramePlan {
    /// Keep the stream open without delivering buffers
    Quiet,
    /// Loud buffers for `speech`, then silent buffers until stopped
    Utterance { speech: Duration },
}

pub struct FakeCapture {
    pub permission: AtomicBool,
    pub fail_start: AtomicBool,
    pub plan: Mutex<FramePlan>,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub aborted: AtomicUsize,
    /// When set, `stop` signals `stop_entered` and waits for `stop_release`
    pub hold_stop: AtomicBool,
    pub stop_entered: Notify,
    pub stop_release: Notify,
    feeder: Mutex<Option<JoinHandle<()>>>,
    sink: Mutex<Option<mpsc::Sender<AudioFrame>>>,
}

impl FakeCapture {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permission: AtomicBool::new(true),
            fail_start: AtomicBool::new(false),
            plan: Mutex::new(FramePlan::Quiet),
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
            aborted: AtomicUsize::new(0),
            hold_stop: AtomicBool::new(false),
            stop_entered: Notify::new(),
            stop_release: Notify::new(),
            feeder: Mutex::new(None),
            sink: Mutex::new(None),
        })
    }

    pub fn set_plan(&self, plan: FramePlan) {
        *self.plan.lock().unwrap() = plan;
    }

    /// Close the buffer sink as if the device went away
    pub fn end_stream(&self) {
        self.sink.lock().unwrap().take();
        if let Some(feeder) = self.feeder.lock().unwrap().take() {
            feeder.abort();
        }
    }

    fn halt(&self) {
        self.end_stream();
    }
}

fn tone(amplitude: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
        .collect()
}

#[async_trait::async_trait]
impl CaptureBackend for FakeCapture {
    async fn request_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn start(
        &self,
        _request: StreamRequest,
        sink: mpsc::Sender<AudioFrame>,
    ) -> Result<StreamHandle, CaptureError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable("no input device".to_string()));
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        let plan = *self.plan.lock().unwrap();

        match plan {
            FramePlan::Quiet => {
                *self.sink.lock().unwrap() = Some(sink);
            }
            FramePlan::Utterance { speech } => {
                let feeder = tokio::spawn(async move {
                    let step = Duration::from_millis(10);
                    let samples = (SAMPLE_RATE / 100) as usize;
                    let mut elapsed = Duration::ZERO;
                    let mut timestamp_ms = 0;
                    loop {
                        let amplitude = if elapsed < speech { 0.5 } else { 0.0 };
                        let frame = AudioFrame {
                            samples: tone(amplitude, samples),
                            sample_rate: SAMPLE_RATE,
                            timestamp_ms,
                        };
                        if sink.send(frame).await.is_err() {
                            break;
                        }
                        tokio::time::sleep(step).await;
                        elapsed += step;
                        timestamp_ms += 10;
                    }
                });
                *self.feeder.lock().unwrap() = Some(feeder);
            }
        }

        Ok(StreamHandle::new())
    }

    async fn stop(&self, _stream: StreamHandle) -> Result<AudioHandle, CaptureError> {
        if self.hold_stop.load(Ordering::SeqCst) {
            self.stop_entered.notify_one();
            self.stop_release.notified().await;
        }

        self.halt();
        self.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(AudioHandle::new(SAMPLE_RATE, vec![0.25; SAMPLE_RATE as usize]))
    }

    fn abort(&self, _stream: StreamHandle) {
        self.halt();
        self.aborted.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "fake-capture"
    }
}

pub struct FakeRecognizer {
    pub permission: AtomicBool,
    pub results: Mutex<VecDeque<Result<Recognition, RecognitionError>>>,
    pub calls: AtomicUsize,
    /// When set, `transcribe` signals `entered` and waits for `release`
    pub hold: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl FakeRecognizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permission: AtomicBool::new(true),
            results: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    pub fn push(&self, result: Result<Recognition, RecognitionError>) {
        self.results.lock().unwrap().push_back(result);
    }
}

#[async_trait::async_trait]
impl Recognizer for FakeRecognizer {
    async fn request_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn transcribe(&self, _audio: AudioHandle) -> Result<Recognition, RecognitionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let queued = self.results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(Recognition::new(format!("user line {}", call), 0.9)))
    }
}

pub struct FakeSynthesizer {
    pub spoken: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    /// When set, `speak` signals `entered` and waits for `release`
    pub hold: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl FakeSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn speak(&self, text: &str) -> Result<(), SynthesisError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SynthesisError::Unavailable("no voice installed".to_string()));
        }
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Scripted responder that counts how often it was asked for a reply
pub struct CountingResponder {
    pub inner: ScriptedResponder,
    pub calls: AtomicUsize,
}

impl CountingResponder {
    pub fn new(scripts: Vec<ScenarioScript>) -> Arc<Self> {
        Arc::new(Self {
            inner: ScriptedResponder::new(scripts),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl ResponseGenerator for CountingResponder {
    fn initial_prompt(&self, scenario: &Scenario) -> String {
        self.inner.initial_prompt(scenario)
    }

    async fn respond(
        &self,
        scenario: &Scenario,
        user_text: &str,
        turn_number: u32,
        history: &[TurnRecord],
    ) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .respond(scenario, user_text, turn_number, history)
            .await
    }

    fn is_session_over(&self, scenario: &Scenario, turn_number: u32) -> bool {
        self.inner.is_session_over(scenario, turn_number)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub saved: Mutex<Vec<(Transcript, SessionSummary)>>,
}

impl SessionStore for MemoryStore {
    fn save(&self, transcript: &Transcript, summary: &SessionSummary) {
        self.saved
            .lock()
            .unwrap()
            .push((transcript.clone(), summary.clone()));
    }
}

pub fn cafe_script(max_turns: u32) -> ScenarioScript {
    ScenarioScript {
        id: "cafe".to_string(),
        title: "Ordering at a cafe".to_string(),
        max_turns,
        opening: "What can I get for you?".to_string(),
        replies: vec![
            "For here or to go?".to_string(),
            "Anything else?".to_string(),
        ],
        closing: Some("Enjoy!".to_string()),
        wrap_up_after: None,
    }
}

pub struct Harness {
    pub orchestrator: TurnOrchestrator,
    pub capture: Arc<FakeCapture>,
    pub recognizer: Arc<FakeRecognizer>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub responder: Arc<CountingResponder>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(scripts: Vec<ScenarioScript>) -> Self {
        Self::with_config(scripts, test_config())
    }

    pub fn with_config(scripts: Vec<ScenarioScript>, config: OrchestratorConfig) -> Self {
        let capture = FakeCapture::new();
        let recognizer = FakeRecognizer::new();
        let synthesizer = FakeSynthesizer::new();
        let responder = CountingResponder::new(scripts);
        let store = Arc::new(MemoryStore::default());

        let orchestrator = TurnOrchestrator::builder(
            capture.clone(),
            recognizer.clone(),
            synthesizer.clone(),
            responder.clone(),
        )
        .store(store.clone())
        .config(config)
        .vad_config(VadConfig {
            energy_threshold_db: -35.0,
            silence_duration_secs: 0.2,
            minimum_speech_duration_secs: 0.1,
            analysis_window_samples: 160,
        })
        .build();

        Self {
            orchestrator,
            capture,
            recognizer,
            synthesizer,
            responder,
            store,
        }
    }

    /// Record and stop one user turn manually
    pub async fn manual_turn(&self) -> Result<(), loqa_dialogue::OrchestratorError> {
        self.orchestrator.begin_user_turn().await?;
        self.orchestrator.stop_user_turn().await
    }
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        poll_interval_ms: 10,
        ..OrchestratorConfig::default()
    }
}

/// Poll until the orchestrator reaches a state matching `pred`
pub async fn wait_for_state(
    orchestrator: &TurnOrchestrator,
    pred: impl Fn(&ConversationState) -> bool,
) -> ConversationState {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let state = orchestrator.state().await;
        if pred(&state) {
            return state;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for state, last seen {}",
            state
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
