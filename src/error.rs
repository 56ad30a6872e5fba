use thiserror::Error;

/// Failures while acquiring the camera. Fatal only to the `start()` attempt
/// that triggered them; the session returns to idle and may retry.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera requires a secure context, current origin is {origin}")]
    InsecureContext { origin: String },

    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device found")]
    NotFound,

    #[error("camera device is busy")]
    Busy,

    #[error("camera failed: {0}")]
    Unknown(String),
}

impl CameraError {
    /// Distinct user-facing guidance per failure kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            CameraError::InsecureContext { .. } => {
                "HTTPS required: open the page over https:// (or localhost) to use the camera."
            }
            CameraError::PermissionDenied => {
                "Permission denied: you blocked camera access. Allow it in the browser/site settings and retry."
            }
            CameraError::NotFound => "No camera found: we could not find a camera on this device.",
            CameraError::Busy => {
                "Camera busy: another application is using your camera. Close it and retry."
            }
            CameraError::Unknown(_) => "Camera error: something went wrong starting the camera.",
        }
    }
}

/// Per-frame delivery failure. Never fatal: logged, surfaced as a diagnostic
/// event, and otherwise ignored.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay returned status {status}")]
    Status { status: u16 },

    #[error("relay rejected frame: {reason}")]
    Rejected { reason: String },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Nothing captured yet; callers treat this as a user-facing no-op.
    #[error("no captured frames to package")]
    Empty,

    #[error("zip write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive io failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid lifecycle transitions on the controller.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("game already running")]
    AlreadyRunning,

    #[error("no active game to stop")]
    NotActive,

    #[error(transparent)]
    Camera(#[from] CameraError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_distinct_per_kind() {
        let errors = [
            CameraError::InsecureContext {
                origin: "http://example.com".into(),
            },
            CameraError::PermissionDenied,
            CameraError::NotFound,
            CameraError::Busy,
            CameraError::Unknown("boom".into()),
        ];

        let messages: Vec<&str> = errors.iter().map(|e| e.user_message()).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
