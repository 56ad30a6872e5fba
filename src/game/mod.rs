pub mod controller;
pub mod state;
pub(crate) mod worker;

use serde::Serialize;

use crate::challenge::ChallengePrompt;
use state::GamePhase;

pub use controller::{GameController, GameSnapshot};
pub use state::SessionState;

/// Broadcast to observers (UI, diagnostics). Dispatch failures surface here
/// and nowhere else; the scheduling loop never joins on them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    PhaseChanged { phase: GamePhase },
    PromptChanged { prompt: ChallengePrompt },
    FrameCaptured { frame_count: u32, counted: bool },
    GalleryFinalized { frames: usize },
    DispatchFailed { label: String, error: String },
}
