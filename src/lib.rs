//! Capture scheduling and delivery core for a timed camera-challenge game.
//!
//! A [`GameController`] drives a fixed-period capture cadence through the
//! game phases, appends counted frames to an in-memory gallery, fires each
//! still at a chat-relay endpoint best-effort, and bundles the gallery into
//! a single zip download on demand.

pub mod camera;
pub mod challenge;
pub mod config;
pub mod error;
pub mod game;
pub mod pipeline;

pub use camera::{CameraProvider, CameraRequest, Origin, RawFrame, Scheme, VideoSource};
pub use challenge::{random_challenge, ChallengePrompt, CHALLENGES};
pub use config::{CadencePolicy, GameConfig};
pub use error::{ArchiveError, CameraError, DispatchError, GameError};
pub use game::state::GamePhase;
pub use game::{GameController, GameEvent, GameSnapshot, SessionState};
pub use pipeline::{EncodedFrame, FrameSink, HttpRelaySink, StillFormat};
