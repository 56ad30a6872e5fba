pub mod archive;
pub mod dispatch;
pub mod encode;

pub use dispatch::{FrameSink, HttpRelaySink};
pub use encode::{EncodedFrame, StillFormat};
