use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::camera::{self, CameraProvider, CameraRequest, Origin};
use crate::challenge::{random_challenge, ChallengePrompt};
use crate::config::{CadencePolicy, GameConfig};
use crate::error::{ArchiveError, GameError};
use crate::game::state::{GamePhase, SessionState};
use crate::game::worker::{capture_loop, CaptureContext, SharedCamera};
use crate::game::GameEvent;
use crate::pipeline::archive::package_frames;
use crate::pipeline::dispatch::FrameSink;
use crate::pipeline::encode::EncodedFrame;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub session_id: Option<String>,
    pub frame_count: u32,
    pub gallery_len: usize,
    pub current_prompt: Option<ChallengePrompt>,
    pub started_at: Option<DateTime<Utc>>,
}

struct CaptureWorker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Owns the session: phase state, the camera handle, the capture worker and
/// the event channel. Camera and worker are exclusively owned here; the one
/// mandatory cleanup path is [`GameController::shutdown`], reachable from
/// every phase.
#[derive(Clone)]
pub struct GameController {
    state: Arc<Mutex<SessionState>>,
    camera: SharedCamera,
    provider: Arc<dyn CameraProvider>,
    sink: Arc<dyn FrameSink>,
    config: GameConfig,
    origin: Origin,
    worker: Arc<Mutex<Option<CaptureWorker>>>,
    events: broadcast::Sender<GameEvent>,
    prompts: Arc<Mutex<StdRng>>,
}

impl GameController {
    pub fn new(
        config: GameConfig,
        origin: Origin,
        provider: Arc<dyn CameraProvider>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        let rng = match config.prompt_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            camera: Arc::new(Mutex::new(None)),
            provider,
            sink,
            config,
            origin,
            worker: Arc::new(Mutex::new(None)),
            events,
            prompts: Arc::new(Mutex::new(rng)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> GameSnapshot {
        let state = self.state.lock().await;
        GameSnapshot {
            phase: state.phase,
            session_id: state.session_id.clone(),
            frame_count: state.frame_count,
            gallery_len: state.captured_frames.len(),
            current_prompt: state.current_prompt,
            started_at: state.started_at,
        }
    }

    /// The counted gallery in capture order.
    pub async fn gallery(&self) -> Vec<EncodedFrame> {
        self.state.lock().await.captured_frames.clone()
    }

    /// Start a game. Valid from idle or from either background phase
    /// (re-arm); resets counters and discards the previous gallery. The
    /// camera is acquired on first start and reused afterwards. On any
    /// acquisition failure the session returns to idle and no cadence is
    /// spawned.
    pub async fn start(&self) -> Result<GameSnapshot, GameError> {
        {
            let mut state = self.state.lock().await;
            if !state.phase.can_start() {
                return Err(GameError::AlreadyRunning);
            }
            state.begin_priming();
        }
        self.emit_phase().await;

        // A leftover background cadence from the previous game must not keep
        // ticking into the new one.
        self.stop_worker().await;

        let request = CameraRequest {
            mirror: self.config.mirror,
        };
        {
            let mut camera = self.camera.lock().await;
            if camera.is_none() {
                match camera::acquire(self.provider.as_ref(), &self.origin, &request).await {
                    Ok(source) => *camera = Some(source),
                    Err(err) => {
                        drop(camera);
                        self.state.lock().await.abort_priming();
                        self.emit_phase().await;
                        warn!("camera acquisition failed: {err} ({})", err.user_message());
                        return Err(GameError::Camera(err));
                    }
                }
            }
        }

        let session_id = Uuid::new_v4().to_string();
        let prompt = {
            let mut rng = self.prompts.lock().await;
            random_challenge(&mut *rng)
        };
        {
            let mut state = self.state.lock().await;
            state.begin_game(session_id.clone(), prompt, Utc::now());
        }
        let _ = self.events.send(GameEvent::PromptChanged { prompt });
        self.emit_phase().await;

        self.spawn_worker().await;

        info!(
            "game {session_id} started: one photo every {:?}, quota {}",
            self.config.tick_interval, self.config.quota
        );
        Ok(self.snapshot().await)
    }

    /// Stop the running game early. The gallery is finalized with whatever
    /// has been captured so far; under `HaltWhenDone` the cadence is
    /// cancelled outright.
    pub async fn stop(&self) -> Result<GameSnapshot, GameError> {
        {
            let mut state = self.state.lock().await;
            if state.phase != GamePhase::Active {
                return Err(GameError::NotActive);
            }
            state.stop();
            let _ = self.events.send(GameEvent::PhaseChanged { phase: state.phase });
            let _ = self.events.send(GameEvent::GalleryFinalized {
                frames: state.captured_frames.len(),
            });
        }

        if self.config.cadence == CadencePolicy::HaltWhenDone {
            self.stop_worker().await;
        }

        Ok(self.snapshot().await)
    }

    /// Page-teardown path: cancel the cadence and release the camera,
    /// whatever the current phase. Idempotent; the worker and the camera are
    /// released together, never one without the other.
    pub async fn shutdown(&self) {
        self.stop_worker().await;

        if let Some(mut source) = self.camera.lock().await.take() {
            source.release();
        }

        let mut state = self.state.lock().await;
        state.teardown();
        let _ = self.events.send(GameEvent::PhaseChanged { phase: state.phase });
    }

    /// Package the counted gallery as a zip blob. An empty gallery returns
    /// [`ArchiveError::Empty`], which callers surface as "nothing to
    /// download" rather than a failure.
    pub async fn export_archive(&self) -> Result<Vec<u8>, ArchiveError> {
        let state = self.state.lock().await;
        package_frames(&state.captured_frames)
    }

    async fn spawn_worker(&self) {
        let mut worker_guard = self.worker.lock().await;
        if let Some(worker) = worker_guard.take() {
            worker.cancel.cancel();
            worker.handle.abort();
        }

        let ctx = CaptureContext {
            state: Arc::clone(&self.state),
            camera: Arc::clone(&self.camera),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
            events: self.events.clone(),
            prompts: Arc::clone(&self.prompts),
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(ctx, cancel.clone()));

        *worker_guard = Some(CaptureWorker { handle, cancel });
    }

    async fn stop_worker(&self) {
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            worker.cancel.cancel();
            if let Err(err) = worker.handle.await {
                if !err.is_cancelled() {
                    warn!("capture loop task failed to join: {err}");
                }
            }
        }
    }

    async fn emit_phase(&self) {
        let phase = self.state.lock().await.phase;
        let _ = self.events.send(GameEvent::PhaseChanged { phase });
    }
}
