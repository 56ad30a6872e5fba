use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DispatchError;
use crate::pipeline::encode::EncodedFrame;

/// Destination for captured stills. One-shot, best-effort: the relay is
/// responsible for forwarding the image to a chat channel and answering with
/// a simple acknowledgment. No retry or ordering lives on either side.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn deliver(&self, frame: &EncodedFrame) -> Result<(), DispatchError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest<'a> {
    image_base64: String,
    challenge: &'a str,
}

#[derive(Deserialize)]
struct UploadAck {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Encode a frame as the data URL the relay expects.
pub fn to_data_url(frame: &EncodedFrame) -> String {
    format!(
        "data:{};base64,{}",
        frame.format().mime(),
        BASE64.encode(frame.bytes())
    )
}

/// HTTP implementation of [`FrameSink`]: POSTs a JSON body with the base64
/// data URL and the challenge caption to the relay's upload endpoint.
pub struct HttpRelaySink {
    client: reqwest::Client,
    upload_url: String,
}

impl HttpRelaySink {
    pub fn new(upload_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            upload_url: upload_url.into(),
        }
    }

    pub fn with_client(upload_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
        }
    }
}

#[async_trait]
impl FrameSink for HttpRelaySink {
    async fn deliver(&self, frame: &EncodedFrame) -> Result<(), DispatchError> {
        let body = UploadRequest {
            image_base64: to_data_url(frame),
            challenge: frame.label(),
        };

        let response = self
            .client
            .post(&self.upload_url)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
            });
        }

        let ack: UploadAck = response.json().await?;
        if !ack.ok {
            return Err(DispatchError::Rejected {
                reason: ack.error.unwrap_or_else(|| "unspecified".into()),
            });
        }

        Ok(())
    }
}
