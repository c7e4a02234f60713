use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::OrchestratorConfig;
use super::error::OrchestratorError;
use super::stats::SessionSummary;
use super::store::SessionStore;
use super::transcript::Transcript;
use crate::audio::{ActiveCapture, AudioFrame, CaptureBackend, StreamRequest};
use crate::clock::{Clock, SystemClock};
use crate::dialogue::{
    transition, ConversationState, ErrorKind, Event, IllegalTransition, PermissionScope,
    ResponseGenerator, Scenario, SessionContext,
};
use crate::speech::{Recognizer, Synthesizer};
use crate::vad::{VadConfig, VoiceActivityDetector};

const STATE_CHANNEL_CAPACITY: usize = 64;

/// A state change notification
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub from: ConversationState,
    pub to: ConversationState,
}

/// Identifies the session generation an in-flight operation belongs to
///
/// `reset()` bumps the generation and cancels the token, so results that
/// arrive afterwards are discarded instead of applied.
#[derive(Clone)]
struct Ticket {
    generation: u64,
    cancel: CancellationToken,
}

/// The capture stream and poll loop of the current user turn
struct Recording {
    capture: ActiveCapture,
    poller: JoinHandle<()>,
    epoch: u64,
}

struct Core {
    state: ConversationState,
    context: Option<SessionContext>,
    transcript: Option<Transcript>,
    summary: Option<SessionSummary>,
    vad: VoiceActivityDetector,
    recording: Option<Recording>,
    generation: u64,
    cancel: CancellationToken,
    turn_epoch: u64,
    /// A turn of this session has already been stopped
    turn_stopped: bool,
}

impl Core {
    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
            cancel: self.cancel.clone(),
        }
    }

    fn is_recording_epoch(&self, epoch: u64) -> bool {
        self.state == ConversationState::Recording
            && self.recording.as_ref().map(|r| r.epoch) == Some(epoch)
    }

    /// Drop the capture stream (aborting it) and stop the poll loop
    fn release_recording(&mut self) {
        if let Some(recording) = self.recording.take() {
            recording.poller.abort();
            drop(recording.capture);
        }
    }
}

struct Inner {
    config: OrchestratorConfig,
    capture: Arc<dyn CaptureBackend>,
    recognizer: Arc<dyn Recognizer>,
    synthesizer: Arc<dyn Synthesizer>,
    responder: Arc<dyn ResponseGenerator>,
    store: Option<Arc<dyn SessionStore>>,
    /// Held for the duration of every public operation; `reset()` bypasses it
    sequencer: Mutex<()>,
    core: Mutex<Core>,
    changes: broadcast::Sender<StateChange>,
}

impl Inner {
    fn apply(&self, core: &mut Core, event: Event) -> Result<(), IllegalTransition> {
        let next = transition(&core.state, event).map_err(|e| {
            error!("Rejected state change: {}", e);
            e
        })?;

        debug!("State {} -> {}", core.state, next);
        let from = std::mem::replace(&mut core.state, next.clone());
        let _ = self.changes.send(StateChange { from, to: next });

        Ok(())
    }

    /// Lock the core, refusing if a reset happened since `ticket` was issued
    async fn lock_current(&self, ticket: &Ticket) -> Result<MutexGuard<'_, Core>, OrchestratorError> {
        let core = self.core.lock().await;
        if core.generation != ticket.generation {
            debug!("Discarding result from superseded session generation {}", ticket.generation);
            return Err(OrchestratorError::Cancelled);
        }
        Ok(core)
    }

    /// Move the session into the error state
    async fn fail(&self, ticket: &Ticket, kind: ErrorKind) -> OrchestratorError {
        let mut core = match self.lock_current(ticket).await {
            Ok(core) => core,
            Err(e) => return e,
        };

        error!("Session failed: {}", kind);
        core.release_recording();

        match self.apply(&mut core, Event::Failed(kind.clone())) {
            Ok(()) => OrchestratorError::Session(kind),
            Err(e) => e.into(),
        }
    }

    fn reset_core(&self, core: &mut Core) {
        core.generation += 1;
        core.cancel.cancel();
        core.cancel = CancellationToken::new();
        core.release_recording();
        core.vad.reset();
        core.context = None;
        core.transcript = None;
        core.summary = None;
        core.turn_stopped = false;

        let from = std::mem::replace(&mut core.state, ConversationState::Idle);
        if from != ConversationState::Idle {
            info!("Session reset from {}", from);
            let _ = self.changes.send(StateChange {
                from,
                to: ConversationState::Idle,
            });
        }
    }
}

/// Await `fut` unless the ticket's session is reset first
async fn guarded<F: Future>(ticket: &Ticket, fut: F) -> Result<F::Output, OrchestratorError> {
    tokio::select! {
        biased;
        _ = ticket.cancel.cancelled() => Err(OrchestratorError::Cancelled),
        output = fut => Ok(output),
    }
}

/// Drives one practice session: capture, recognition, response and playback
///
/// Cheap to clone; all clones share the same session. Public operations are
/// serialized; `reset()` may be called at any time and cancels whatever is in
/// flight.
#[derive(Clone)]
pub struct TurnOrchestrator {
    inner: Arc<Inner>,
}

impl TurnOrchestrator {
    pub fn builder(
        capture: Arc<dyn CaptureBackend>,
        recognizer: Arc<dyn Recognizer>,
        synthesizer: Arc<dyn Synthesizer>,
        responder: Arc<dyn ResponseGenerator>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            capture,
            recognizer,
            synthesizer,
            responder,
            store: None,
            config: OrchestratorConfig::default(),
            vad: VadConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Check permissions, open a transcript and speak the opening line
    ///
    /// Returns once the session is waiting for the user's first turn.
    pub async fn start_session(&self, scenario: Scenario) -> Result<(), OrchestratorError> {
        let inner = &self.inner;
        let _turn = inner.sequencer.lock().await;

        let ticket = {
            let mut core = inner.core.lock().await;
            // A finished session is cleared before the next one starts
            if core.state == ConversationState::Completed {
                inner.reset_core(&mut core);
            }
            if core.state != ConversationState::Idle {
                return Err(IllegalTransition {
                    from: core.state.name(),
                    event: "startSession",
                }
                .into());
            }
            core.ticket()
        };

        info!("Starting session for scenario '{}'", scenario.id);

        if !guarded(&ticket, inner.capture.request_permission()).await? {
            warn!("Microphone permission denied");
            return Err(inner
                .fail(&ticket, ErrorKind::PermissionDenied(PermissionScope::Capture))
                .await);
        }

        if !guarded(&ticket, inner.recognizer.request_permission()).await? {
            warn!("Speech recognition permission denied");
            return Err(inner
                .fail(&ticket, ErrorKind::PermissionDenied(PermissionScope::Recognition))
                .await);
        }

        let prompt = inner.responder.initial_prompt(&scenario);

        {
            let mut core = inner.lock_current(&ticket).await?;
            inner.apply(&mut core, Event::StartSession(scenario.clone()))?;

            let context = SessionContext::new(scenario);
            let mut transcript = Transcript::new(context.session_id);

            inner.apply(&mut core, Event::InitialPromptStarted(prompt.clone()))?;
            transcript.append_system(prompt.clone());

            info!(
                "Session {} started ({} turns)",
                context.session_id,
                context.max_turns()
            );
            core.context = Some(context);
            core.transcript = Some(transcript);
            core.summary = None;
        }

        self.play(&ticket, &prompt, false).await
    }

    /// Open the microphone and start listening for the user's turn
    ///
    /// Returns as soon as capture is running. The turn ends on auto-stop
    /// (trailing silence after enough speech), on `stop_user_turn()`, or when
    /// the capture stream ends.
    pub async fn begin_user_turn(&self) -> Result<(), OrchestratorError> {
        let inner = &self.inner;
        let _turn = inner.sequencer.lock().await;

        let (ticket, epoch, request) = {
            let mut core = inner.core.lock().await;
            inner.apply(&mut core, Event::UserBeginsTurn)?;
            core.vad.reset();
            core.turn_epoch += 1;

            let request = StreamRequest {
                sample_rate: inner.config.sample_rate,
                buffer_samples: core.vad.config().analysis_window_samples,
            };
            (core.ticket(), core.turn_epoch, request)
        };

        let (sink, buffers) = mpsc::channel::<AudioFrame>(inner.config.buffer_capacity.max(1));

        let capture = match guarded(
            &ticket,
            ActiveCapture::start(Arc::clone(&inner.capture), request, sink),
        )
        .await?
        {
            Ok(capture) => capture,
            Err(e) => {
                error!("Failed to start capture on {}: {}", inner.capture.name(), e);
                return Err(inner.fail(&ticket, ErrorKind::CaptureFailed(e.to_string())).await);
            }
        };

        let mut core = inner.lock_current(&ticket).await?;
        let poller = tokio::spawn(self.clone().poll_capture(ticket.clone(), epoch, buffers));
        core.recording = Some(Recording {
            capture,
            poller,
            epoch,
        });

        let turn = core.context.as_ref().map(|c| c.turn_number + 1).unwrap_or(1);
        info!("Recording user turn {}", turn);

        Ok(())
    }

    /// Stop capture and run the rest of the turn
    ///
    /// Manual stop and VAD auto-stop take the same path. Calling this again
    /// once the turn is no longer recording (for example right after an
    /// auto-stop) is a no-op; calling it before any turn of the session was
    /// recorded is an illegal transition. Returns once the session is waiting for the next turn, has
    /// completed, or has failed.
    pub async fn stop_user_turn(&self) -> Result<(), OrchestratorError> {
        self.stop_turn(None).await
    }

    /// Leave `ShowingSummary` when automatic acknowledgement is off
    pub async fn acknowledge_summary(&self) -> Result<(), OrchestratorError> {
        let _turn = self.inner.sequencer.lock().await;
        let mut core = self.inner.core.lock().await;
        self.inner.apply(&mut core, Event::SummaryAcknowledged)?;
        info!("Summary acknowledged, session completed");
        Ok(())
    }

    /// Cancel in-flight work, drop the session and return to `Idle`
    ///
    /// Safe from any state. Results of operations that were in flight are
    /// discarded when they arrive.
    pub async fn reset(&self) {
        let mut core = self.inner.core.lock().await;
        self.inner.reset_core(&mut core);
    }

    pub async fn state(&self) -> ConversationState {
        self.inner.core.lock().await.state.clone()
    }

    pub async fn context(&self) -> Option<SessionContext> {
        self.inner.core.lock().await.context.clone()
    }

    /// Copy of the live transcript
    pub async fn transcript(&self) -> Option<Transcript> {
        self.inner.core.lock().await.transcript.clone()
    }

    /// Summary of the last completed session
    pub async fn summary(&self) -> Option<SessionSummary> {
        self.inner.core.lock().await.summary.clone()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.changes.subscribe()
    }

    async fn stop_turn(&self, epoch: Option<u64>) -> Result<(), OrchestratorError> {
        let inner = &self.inner;
        let _turn = inner.sequencer.lock().await;

        let (ticket, capture) = {
            let mut core = inner.core.lock().await;

            let current = match (epoch, &core.recording) {
                (Some(epoch), _) => core.is_recording_epoch(epoch),
                (None, Some(_)) => core.state == ConversationState::Recording,
                (None, None) => false,
            };
            if !current {
                // A manual stop is only tolerated as a repeat of one already handled
                if epoch.is_none() && !core.turn_stopped {
                    error!("Stop requested in state {} with no turn to stop", core.state);
                    return Err(IllegalTransition {
                        from: core.state.name(),
                        event: Event::CaptureStopped.name(),
                    }
                    .into());
                }
                debug!("Ignoring stop request in state {}", core.state);
                return Ok(());
            }

            let Some(recording) = core.recording.take() else {
                return Ok(());
            };

            // The poll loop calls in here itself; only abort it on a manual stop
            if epoch.is_none() {
                recording.poller.abort();
            }

            inner.apply(&mut core, Event::CaptureStopped)?;
            core.turn_stopped = true;
            (core.ticket(), recording.capture)
        };

        info!(
            "User turn stopped ({})",
            if epoch.is_some() { "automatic" } else { "manual" }
        );

        let audio = match guarded(&ticket, capture.finish()).await? {
            Ok(audio) => audio,
            Err(e) => {
                return Err(inner.fail(&ticket, ErrorKind::CaptureFailed(e.to_string())).await)
            }
        };

        debug!(
            "Transcribing {:.1}s of audio ({})",
            audio.duration().as_secs_f32(),
            audio.id
        );

        let recognition = match guarded(&ticket, inner.recognizer.transcribe(audio.clone())).await? {
            Ok(recognition) => recognition,
            Err(e) => {
                return Err(inner.fail(&ticket, ErrorKind::RecognitionFailed(e.to_string())).await)
            }
        };

        let (scenario, turn_number, history, limit_reached) = {
            let mut core = inner.lock_current(&ticket).await?;
            inner.apply(
                &mut core,
                Event::RecognitionSucceeded {
                    text: recognition.text.clone(),
                    confidence: recognition.confidence,
                },
            )?;

            let Core {
                context,
                transcript,
                ..
            } = &mut *core;
            let (Some(context), Some(transcript)) = (context.as_mut(), transcript.as_mut()) else {
                return Err(OrchestratorError::Cancelled);
            };

            transcript.append_user(recognition.text.clone(), recognition.confidence, Some(audio.id));
            let turn_number = context.advance_turn();

            info!(
                "User turn {}/{} transcribed (confidence {:.2}): {}",
                turn_number,
                context.max_turns(),
                recognition.confidence,
                recognition.text
            );

            (
                context.scenario.clone(),
                turn_number,
                transcript.entries().to_vec(),
                context.turn_limit_reached(),
            )
        };

        if limit_reached {
            return self.complete_session(&ticket, Event::TurnLimitReached).await;
        }

        {
            let mut core = inner.lock_current(&ticket).await?;
            inner.apply(&mut core, Event::TurnLimitNotReached)?;
        }

        let reply = guarded(
            &ticket,
            inner
                .responder
                .respond(&scenario, &recognition.text, turn_number, &history),
        )
        .await?;

        {
            let mut core = inner.lock_current(&ticket).await?;
            inner.apply(&mut core, Event::ResponseReady(reply.clone()))?;
            if let Some(transcript) = core.transcript.as_mut() {
                transcript.append_system(reply.clone());
            }
        }

        self.play(&ticket, &reply, true).await
    }

    /// Speak `text` (state is already `Speaking`) and move on when it finishes
    async fn play(
        &self,
        ticket: &Ticket,
        text: &str,
        may_end_session: bool,
    ) -> Result<(), OrchestratorError> {
        let inner = &self.inner;

        if let Err(e) = guarded(ticket, inner.synthesizer.speak(text)).await? {
            return Err(inner
                .fail(ticket, ErrorKind::SynthesisUnavailable(e.to_string()))
                .await);
        }

        let mut core = inner.lock_current(ticket).await?;

        let session_over = may_end_session
            && core
                .context
                .as_ref()
                .map(|c| inner.responder.is_session_over(&c.scenario, c.turn_number))
                .unwrap_or(false);

        if session_over {
            drop(core);
            return self
                .complete_session(ticket, |summary| Event::PlaybackFinished {
                    summary: Some(summary),
                })
                .await;
        }

        inner.apply(&mut core, Event::PlaybackFinished { summary: None })?;
        Ok(())
    }

    /// Close the transcript, show (and optionally speak) the summary, save it
    async fn complete_session(
        &self,
        ticket: &Ticket,
        enter: impl FnOnce(SessionSummary) -> Event,
    ) -> Result<(), OrchestratorError> {
        let inner = &self.inner;

        let (transcript, summary) = {
            let mut core = inner.lock_current(ticket).await?;

            let Core {
                context,
                transcript,
                ..
            } = &mut *core;
            let (Some(context), Some(transcript)) = (context.as_ref(), transcript.as_mut()) else {
                return Err(OrchestratorError::Cancelled);
            };

            transcript.finish();
            let summary = SessionSummary::from_transcript(context, transcript);
            let snapshot = transcript.clone();

            inner.apply(&mut core, enter(summary.clone()))?;
            core.summary = Some(summary.clone());
            (snapshot, summary)
        };

        info!(
            "Session {} complete: {} turns, {} words",
            transcript.session_id(),
            summary.turns,
            summary.user_word_count
        );

        if let Some(store) = &inner.store {
            store.save(&transcript, &summary);
        }

        if inner.config.speak_summary {
            if let Err(e) = guarded(ticket, inner.synthesizer.speak(&summary.summary_text())).await? {
                return Err(inner
                    .fail(ticket, ErrorKind::SynthesisUnavailable(e.to_string()))
                    .await);
            }
        }

        if inner.config.auto_acknowledge_summary {
            let mut core = inner.lock_current(ticket).await?;
            inner.apply(&mut core, Event::SummaryAcknowledged)?;
        }

        Ok(())
    }

    /// Feed captured buffers to the VAD at a fixed interval until the turn stops
    async fn poll_capture(
        self,
        ticket: Ticket,
        epoch: u64,
        mut buffers: mpsc::Receiver<AudioFrame>,
    ) {
        let mut ticker = tokio::time::interval(self.inner.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticket.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let mut pending = Vec::new();
            let mut stream_ended = false;
            loop {
                match buffers.try_recv() {
                    Ok(frame) => pending.push(frame),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        stream_ended = true;
                        break;
                    }
                }
            }

            let auto_stop = {
                let mut core = self.inner.core.lock().await;
                if core.generation != ticket.generation || !core.is_recording_epoch(epoch) {
                    return;
                }

                for frame in &pending {
                    core.vad.process_buffer(&frame.samples);
                }

                core.vad.should_stop_recording() && core.vad.has_minimum_speech()
            };

            if auto_stop || stream_ended {
                if auto_stop {
                    debug!("Trailing silence detected");
                } else {
                    warn!("Capture stream ended while recording");
                }

                if let Err(e) = self.stop_turn(Some(epoch)).await {
                    debug!("Turn ended with: {}", e);
                }
                return;
            }
        }
    }
}

/// Builder for `TurnOrchestrator`; collaborators are required up front
pub struct OrchestratorBuilder {
    capture: Arc<dyn CaptureBackend>,
    recognizer: Arc<dyn Recognizer>,
    synthesizer: Arc<dyn Synthesizer>,
    responder: Arc<dyn ResponseGenerator>,
    store: Option<Arc<dyn SessionStore>>,
    config: OrchestratorConfig,
    vad: VadConfig,
    clock: Arc<dyn Clock>,
}

impl OrchestratorBuilder {
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn vad_config(mut self, vad: VadConfig) -> Self {
        self.vad = vad;
        self
    }

    /// Time source for the VAD's silence and minimum-speech timers
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> TurnOrchestrator {
        let (changes, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);

        let core = Core {
            state: ConversationState::Idle,
            context: None,
            transcript: None,
            summary: None,
            vad: VoiceActivityDetector::with_clock(self.vad, self.clock),
            recording: None,
            generation: 0,
            cancel: CancellationToken::new(),
            turn_epoch: 0,
            turn_stopped: false,
        };

        TurnOrchestrator {
            inner: Arc::new(Inner {
                config: self.config,
                capture: self.capture,
                recognizer: self.recognizer,
                synthesizer: self.synthesizer,
                responder: self.responder,
                store: self.store,
                sequencer: Mutex::new(()),
                core: Mutex::new(core),
                changes,
            }),
        }
    }
}
