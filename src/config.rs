use std::time::Duration;

use crate::pipeline::encode::StillFormat;

/// What the capture cadence does once the game leaves the active phase,
/// either by reaching the photo quota or by a manual stop.
///
/// `HaltWhenDone` cancels the ticker outright: nothing is captured after the
/// user-visible end of the game. `ContinueInBackground` keeps the cadence
/// firing and dispatching background-labelled frames to the relay, without
/// ever appending them to the local gallery. The second mode must be an
/// explicit opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadencePolicy {
    HaltWhenDone,
    ContinueInBackground,
}

/// Tunables for one game controller. Quota and tick interval are plain
/// fields rather than constants so tests can run with accelerated clocks.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Counted photos per game.
    pub quota: u32,

    /// Period of the capture cadence.
    pub tick_interval: Duration,

    /// Still-image format for captures.
    pub still_format: StillFormat,

    /// JPEG quality for still encodes (1-100). Ignored for PNG.
    pub jpeg_quality: u8,

    /// Mirror the self-facing preview. The same transform is applied to every
    /// still encode so captures match what the user sees.
    pub mirror: bool,

    pub cadence: CadencePolicy,

    /// Label attached to non-counted background captures.
    pub background_label: String,

    /// Fixed seed for the prompt RNG; `None` seeds from entropy.
    pub prompt_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            quota: 5,
            tick_interval: Duration::from_secs(5),
            still_format: StillFormat::Jpeg,
            jpeg_quality: 70,
            mirror: true,
            cadence: CadencePolicy::HaltWhenDone,
            background_label: "Background capture".into(),
            prompt_seed: None,
        }
    }
}
