use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CameraError;

/// One decoded video frame, tightly packed RGBA8.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len() as u64, u64::from(width) * u64::from(height) * 4);
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// A live video capability owned by the game controller for the lifetime of
/// the session. Released exactly once through [`VideoSource::release`].
pub trait VideoSource: Send + Sync {
    /// Natural dimensions of the decoded stream. `(0, 0)` until the first
    /// frame has been decoded; capture ticks skip while this holds.
    fn natural_size(&self) -> (u32, u32);

    /// Most recent decoded frame, if any.
    fn latest_frame(&self) -> Option<RawFrame>;

    /// Stop all tracks backing this capability.
    fn release(&mut self);
}

/// Preferences passed to camera acquisition.
#[derive(Debug, Clone, Default)]
pub struct CameraRequest {
    /// Mirror the self-facing preview; the same transform is applied to
    /// every still encode.
    pub mirror: bool,
}

#[async_trait]
pub trait CameraProvider: Send + Sync {
    async fn open(&self, request: &CameraRequest) -> Result<Box<dyn VideoSource>, CameraError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scheme {
    Http,
    Https,
}

/// The origin the page was served from, used to gate device access the same
/// way browsers do: camera only on encrypted transport or loopback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub scheme: Scheme,
    pub host: String,
}

impl Origin {
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
        }
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Https || self.host == "localhost" || self.host == "127.0.0.1"
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        write!(f, "{scheme}://{}", self.host)
    }
}

/// Acquire a camera for the session. The secure-context check runs before the
/// provider is touched: an insecure origin fails immediately without any
/// device access attempt.
pub async fn acquire(
    provider: &dyn CameraProvider,
    origin: &Origin,
    request: &CameraRequest,
) -> Result<Box<dyn VideoSource>, CameraError> {
    if !origin.is_secure() {
        return Err(CameraError::InsecureContext {
            origin: origin.to_string(),
        });
    }
    provider.open(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct TouchedProvider {
        touched: Arc<AtomicBool>,
    }

    #[async_trait]
    impl CameraProvider for TouchedProvider {
        async fn open(&self, _request: &CameraRequest) -> Result<Box<dyn VideoSource>, CameraError> {
            self.touched.store(true, Ordering::SeqCst);
            Err(CameraError::NotFound)
        }
    }

    #[test]
    fn loopback_and_https_are_secure() {
        assert!(Origin::new(Scheme::Http, "localhost").is_secure());
        assert!(Origin::new(Scheme::Http, "127.0.0.1").is_secure());
        assert!(Origin::new(Scheme::Https, "kartcage.com").is_secure());
        assert!(!Origin::new(Scheme::Http, "kartcage.com").is_secure());
    }

    #[tokio::test]
    async fn insecure_origin_never_touches_the_provider() {
        let touched = Arc::new(AtomicBool::new(false));
        let provider = TouchedProvider {
            touched: touched.clone(),
        };

        let err = acquire(
            &provider,
            &Origin::new(Scheme::Http, "kartcage.com"),
            &CameraRequest::default(),
        )
        .await
        .map(|_| ())
        .unwrap_err();

        assert!(matches!(err, CameraError::InsecureContext { .. }));
        assert!(!touched.load(Ordering::SeqCst));
    }
}
