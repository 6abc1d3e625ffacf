//! HTTP client for the SchoolAI server.
//!
//! Only the solving stream is consumed incrementally; every other endpoint
//! is a plain JSON request/response call.

use crate::api::types::{OcrResponse, Progress, RegisterResponse, Registration, TaskRequest};
use crate::error::{Result, SchoolError};
use crate::stream::{Step, StepEventParser, StepSequence, StepSink, StreamingStepConsumer};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SOLVE_STREAM: &str = "/task/solve/stream";
const SOLVE: &str = "/task/solve";
const REGISTER: &str = "/register";
const OCR: &str = "/media/ocr";

/// Thin client over one server base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    /// `timeout` bounds connection setup and each non-streaming request.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SchoolError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Stream a solution, handing each step to `sink` as it arrives.
    ///
    /// Fails with [`SchoolError::StreamUnavailable`] when the request cannot
    /// be started or the connection breaks; steps already delivered to
    /// `sink` remain valid either way.
    pub async fn solve_streaming(
        &self,
        request: &TaskRequest,
        parser: StepEventParser,
        sink: &mut dyn StepSink,
    ) -> Result<StepSequence> {
        let response = self
            .http
            .post(self.url(SOLVE_STREAM))
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| SchoolError::StreamUnavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SchoolError::StreamUnavailable {
                message: format!("server returned status {status}"),
            });
        }

        debug!(subject = %request.subject, grade = request.grade, "solving stream opened");
        let steps = StreamingStepConsumer::with_parser(parser)
            .consume(response.bytes_stream(), sink)
            .await?;
        info!(steps = steps.len(), "solving stream finished");
        Ok(steps)
    }

    /// Non-streaming fallback returning every step at once.
    pub async fn solve(&self, request: &TaskRequest) -> Result<Vec<Step>> {
        let response = self.post_json(SOLVE, request).await?;
        decode(SOLVE, response).await
    }

    /// Register a learner; returns the new user id.
    pub async fn register(&self, registration: &Registration) -> Result<String> {
        registration.validate()?;
        let response = self.post_json(REGISTER, registration).await?;
        let body: RegisterResponse = decode(REGISTER, response).await?;
        info!(user_id = %body.user_id, "registered");
        Ok(body.user_id)
    }

    pub async fn progress(&self, user_id: &str) -> Result<Progress> {
        let endpoint = format!("/user/progress/{user_id}");
        let response = self
            .http
            .get(self.url(&endpoint))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| api_error(&endpoint, e))?;
        decode(&endpoint, checked(&endpoint, response).await?).await
    }

    /// Award one star for a solved task.
    pub async fn reward(&self, user_id: &str) -> Result<()> {
        let endpoint = format!("/user/reward/{user_id}");
        let response = self
            .http
            .post(self.url(&endpoint))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| api_error(&endpoint, e))?;
        checked(&endpoint, response).await?;
        debug!(user_id, "star awarded");
        Ok(())
    }

    /// Recognize the text of a task photo.
    pub async fn ocr(&self, image: &Path) -> Result<String> {
        let mime = image_mime(image)?;
        let data = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| api_error(OCR, e))?;

        let response = self
            .http
            .post(self.url(OCR))
            .timeout(self.timeout)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| api_error(OCR, e))?;

        let body: OcrResponse = decode(OCR, checked(OCR, response).await?).await?;
        Ok(body.text)
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(self.url(endpoint))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| api_error(endpoint, e))?;
        checked(endpoint, response).await
    }
}

fn api_error(endpoint: &str, error: impl Display) -> SchoolError {
    SchoolError::Api {
        endpoint: endpoint.to_string(),
        message: error.to_string(),
    }
}

/// Turn a non-success status into [`SchoolError::Api`], keeping the body text.
async fn checked(endpoint: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(
        endpoint,
        format!("status {status}: {}", body.trim()),
    ))
}

async fn decode<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T> {
    let text = response.text().await.map_err(|e| api_error(endpoint, e))?;
    serde_json::from_str(&text)
        .map_err(|e| api_error(endpoint, format!("unexpected response: {e}")))
}

/// Content type for an uploadable task photo, by file extension.
fn image_mime(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        _ => Err(SchoolError::InvalidRequest {
            field: "image".to_string(),
            message: format!("unsupported image type: {}", path.display()),
        }),
    }
}
