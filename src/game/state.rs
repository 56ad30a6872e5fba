use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::challenge::ChallengePrompt;
use crate::pipeline::encode::EncodedFrame;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Idle,
    Priming,
    Active,
    /// Quota reached; the counted gallery is frozen. Whether the cadence
    /// keeps firing here is decided by `CadencePolicy`.
    FinishedBackground,
    /// Stopped by the user before the quota; counted gallery frozen.
    StoppedBackground,
}

impl Default for GamePhase {
    fn default() -> Self {
        GamePhase::Idle
    }
}

impl GamePhase {
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            GamePhase::Idle | GamePhase::FinishedBackground | GamePhase::StoppedBackground
        )
    }

    /// Frames captured in this phase count toward the game and the gallery.
    pub fn counts_toward_game(&self) -> bool {
        matches!(self, GamePhase::Active)
    }

    pub fn is_background(&self) -> bool {
        matches!(
            self,
            GamePhase::FinishedBackground | GamePhase::StoppedBackground
        )
    }
}

/// Mutable session data behind the controller's lock. Camera and worker
/// handles live on the controller itself, not here.
#[derive(Debug, Default)]
pub struct SessionState {
    pub phase: GamePhase,
    pub session_id: Option<String>,
    pub frame_count: u32,
    pub captured_frames: Vec<EncodedFrame>,
    pub current_prompt: Option<ChallengePrompt>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entering `Priming` discards the previous game entirely: a restart
    /// never leaks frames or counters across games.
    pub fn begin_priming(&mut self) {
        self.phase = GamePhase::Priming;
        self.session_id = None;
        self.frame_count = 0;
        self.captured_frames.clear();
        self.current_prompt = None;
        self.started_at = None;
    }

    /// Camera acquisition failed; this `start()` is over, a later retry is fine.
    pub fn abort_priming(&mut self) {
        self.phase = GamePhase::Idle;
    }

    pub fn begin_game(
        &mut self,
        session_id: String,
        prompt: ChallengePrompt,
        started_at: DateTime<Utc>,
    ) {
        self.phase = GamePhase::Active;
        self.session_id = Some(session_id);
        self.current_prompt = Some(prompt);
        self.started_at = Some(started_at);
    }

    /// Append a counted frame. The only caller is the capture tick, and only
    /// while `Active`; returns the new count.
    pub fn record_counted_frame(&mut self, frame: EncodedFrame) -> u32 {
        debug_assert!(self.phase.counts_toward_game());
        self.captured_frames.push(frame);
        self.frame_count += 1;
        self.frame_count
    }

    pub fn finish(&mut self) {
        self.phase = GamePhase::FinishedBackground;
        self.current_prompt = None;
    }

    pub fn stop(&mut self) {
        self.phase = GamePhase::StoppedBackground;
        self.current_prompt = None;
    }

    pub fn teardown(&mut self) {
        self.phase = GamePhase::Idle;
        self.current_prompt = None;
    }
}
