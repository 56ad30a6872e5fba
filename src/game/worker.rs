use anyhow::{Context, Result};
use log::{error, info, warn};
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::camera::VideoSource;
use crate::challenge::random_challenge;
use crate::config::{CadencePolicy, GameConfig};
use crate::game::state::{GamePhase, SessionState};
use crate::game::GameEvent;
use crate::pipeline::dispatch::FrameSink;
use crate::pipeline::encode::encode_frame;

pub(crate) type SharedCamera = Arc<Mutex<Option<Box<dyn VideoSource>>>>;

/// Everything one capture tick needs. Cloned into the worker task.
#[derive(Clone)]
pub(crate) struct CaptureContext {
    pub state: Arc<Mutex<SessionState>>,
    pub camera: SharedCamera,
    pub sink: Arc<dyn FrameSink>,
    pub config: GameConfig,
    pub events: broadcast::Sender<GameEvent>,
    pub prompts: Arc<Mutex<StdRng>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Video not ready, no camera, or a phase that does not capture.
    Skipped,
    Counted,
    Background,
    QuotaReached,
}

/// Fixed-period capture cadence. Runs until cancelled, or until the quota is
/// reached under `HaltWhenDone`.
pub(crate) async fn capture_loop(ctx: CaptureContext, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(ctx.config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The interval fires once immediately; consume it so the first capture
    // lands one full period after start.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match capture_tick(&ctx).await {
                    Ok(TickOutcome::QuotaReached)
                        if ctx.config.cadence == CadencePolicy::HaltWhenDone =>
                    {
                        info!("photo quota reached, capture cadence halted");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => error!("capture tick failed: {err:?}"),
                }
            }
            _ = cancel.cancelled() => {
                info!("capture loop shutting down");
                break;
            }
        }
    }
}

/// One capture-and-send: rasterize the current video frame, append it to the
/// gallery when it counts, and fire a detached dispatch at the relay.
///
/// The gallery append is the only shared-state mutation here. Dispatch
/// failures never reach the caller and never unwind the append.
pub(crate) async fn capture_tick(ctx: &CaptureContext) -> Result<TickOutcome> {
    let (counted, label) = {
        let state = ctx.state.lock().await;
        match state.phase {
            GamePhase::Active => {
                let label = state
                    .current_prompt
                    .map(|p| p.to_string())
                    .unwrap_or_default();
                (true, label)
            }
            GamePhase::FinishedBackground | GamePhase::StoppedBackground
                if ctx.config.cadence == CadencePolicy::ContinueInBackground =>
            {
                (false, ctx.config.background_label.clone())
            }
            _ => return Ok(TickOutcome::Skipped),
        }
    };

    // Read the raw frame without holding the session lock.
    let raw = {
        let camera = ctx.camera.lock().await;
        let Some(source) = camera.as_ref() else {
            return Ok(TickOutcome::Skipped);
        };
        let (width, height) = source.natural_size();
        if width == 0 || height == 0 {
            warn!("video not ready yet, skipping tick");
            return Ok(TickOutcome::Skipped);
        }
        match source.latest_frame() {
            Some(raw) => raw,
            None => return Ok(TickOutcome::Skipped),
        }
    };

    let format = ctx.config.still_format;
    let quality = ctx.config.jpeg_quality;
    let mirror = ctx.config.mirror;
    let encode_label = label.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        encode_frame(&raw, format, quality, mirror, &encode_label)
    })
    .await
    .context("encode worker join failed")??;

    let mut outcome = if counted {
        TickOutcome::Counted
    } else {
        TickOutcome::Background
    };

    if counted {
        let mut state = ctx.state.lock().await;
        // Phase may have moved off Active since the tick began (stop() racing
        // the encode); a frozen gallery must not grow.
        if state.phase.counts_toward_game() {
            let count = state.record_counted_frame(encoded.clone());
            let _ = ctx.events.send(GameEvent::FrameCaptured {
                frame_count: count,
                counted: true,
            });

            if count >= ctx.config.quota {
                state.finish();
                let _ = ctx.events.send(GameEvent::PhaseChanged { phase: state.phase });
                let _ = ctx.events.send(GameEvent::GalleryFinalized {
                    frames: state.captured_frames.len(),
                });
                outcome = TickOutcome::QuotaReached;
            } else {
                let prompt = {
                    let mut rng = ctx.prompts.lock().await;
                    random_challenge(&mut *rng)
                };
                state.current_prompt = Some(prompt);
                let _ = ctx.events.send(GameEvent::PromptChanged { prompt });
            }
        } else {
            outcome = TickOutcome::Skipped;
        }
    } else {
        let frame_count = ctx.state.lock().await.frame_count;
        let _ = ctx.events.send(GameEvent::FrameCaptured {
            frame_count,
            counted: false,
        });
    }

    // Fire-and-forget: the cadence never waits on the relay.
    let sink = Arc::clone(&ctx.sink);
    let events = ctx.events.clone();
    tokio::spawn(async move {
        if let Err(err) = sink.deliver(&encoded).await {
            error!("frame dispatch failed ({}): {err}", encoded.label());
            let _ = events.send(GameEvent::DispatchFailed {
                label: encoded.label().to_string(),
                error: err.to_string(),
            });
        }
    });

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::RawFrame;
    use crate::challenge::CHALLENGES;
    use crate::error::DispatchError;
    use crate::pipeline::encode::EncodedFrame;
    use async_trait::async_trait;
    use chrono::Utc;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeCamera {
        ready: bool,
    }

    impl VideoSource for FakeCamera {
        fn natural_size(&self) -> (u32, u32) {
            if self.ready {
                (2, 2)
            } else {
                (0, 0)
            }
        }

        fn latest_frame(&self) -> Option<RawFrame> {
            self.ready
                .then(|| RawFrame::new(2, 2, vec![200; 2 * 2 * 4]))
        }

        fn release(&mut self) {}
    }

    struct CountingSink {
        delivered: AtomicUsize,
        fail: AtomicBool,
    }

    impl CountingSink {
        fn new() -> Self {
            Self {
                delivered: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl FrameSink for CountingSink {
        async fn deliver(&self, _frame: &EncodedFrame) -> Result<(), DispatchError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DispatchError::Status { status: 500 });
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn active_context(quota: u32, camera_ready: bool, sink: Arc<CountingSink>) -> CaptureContext {
        let mut state = SessionState::new();
        state.begin_priming();
        state.begin_game("test-session".into(), CHALLENGES[0], Utc::now());

        let config = GameConfig {
            quota,
            ..GameConfig::default()
        };
        let (events, _) = broadcast::channel(64);

        CaptureContext {
            state: Arc::new(Mutex::new(state)),
            camera: Arc::new(Mutex::new(Some(
                Box::new(FakeCamera { ready: camera_ready }) as Box<dyn VideoSource>,
            ))),
            sink,
            config,
            events,
            prompts: Arc::new(Mutex::new(StdRng::seed_from_u64(1))),
        }
    }

    #[tokio::test]
    async fn n_ticks_count_up_to_the_quota_and_no_further() {
        let sink = Arc::new(CountingSink::new());
        let ctx = active_context(5, true, sink.clone());

        for _ in 0..8 {
            capture_tick(&ctx).await.unwrap();
        }

        let state = ctx.state.lock().await;
        assert_eq!(state.frame_count, 5);
        assert_eq!(state.captured_frames.len(), 5);
        assert_eq!(state.phase, GamePhase::FinishedBackground);
    }

    #[tokio::test]
    async fn tick_is_a_noop_before_the_first_decoded_frame() {
        let sink = Arc::new(CountingSink::new());
        let ctx = active_context(5, false, sink.clone());

        let outcome = capture_tick(&ctx).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped);

        let state = ctx.state.lock().await;
        assert_eq!(state.frame_count, 0);
        assert!(state.captured_frames.is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_never_blocks_the_next_frame() {
        let sink = Arc::new(CountingSink::new());
        let ctx = active_context(5, true, sink.clone());
        let mut events = ctx.events.subscribe();

        sink.fail.store(true, Ordering::SeqCst);
        capture_tick(&ctx).await.unwrap();
        tokio::task::yield_now().await;

        sink.fail.store(false, Ordering::SeqCst);
        capture_tick(&ctx).await.unwrap();

        let state = ctx.state.lock().await;
        assert_eq!(state.frame_count, 2);
        drop(state);

        // Wait for the detached dispatch tasks to settle, then check that the
        // failure only showed up as a diagnostic event.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let mut saw_dispatch_failure = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, GameEvent::DispatchFailed { .. }) {
                saw_dispatch_failure = true;
            }
        }
        assert!(saw_dispatch_failure);
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn background_ticks_dispatch_without_touching_the_gallery() {
        let sink = Arc::new(CountingSink::new());
        let mut ctx = active_context(5, true, sink.clone());
        ctx.config.cadence = CadencePolicy::ContinueInBackground;

        {
            let mut state = ctx.state.lock().await;
            state.record_counted_frame(EncodedFrame::new(
                vec![1],
                ctx.config.still_format,
                "x",
            ));
            state.stop();
        }

        let outcome = capture_tick(&ctx).await.unwrap();
        assert_eq!(outcome, TickOutcome::Background);

        let state = ctx.state.lock().await;
        assert_eq!(state.frame_count, 1);
        assert_eq!(state.captured_frames.len(), 1);
        drop(state);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn halt_policy_skips_background_ticks_entirely() {
        let sink = Arc::new(CountingSink::new());
        let ctx = active_context(5, true, sink.clone());

        {
            let mut state = ctx.state.lock().await;
            state.stop();
        }

        let outcome = capture_tick(&ctx).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 0);
    }
}
