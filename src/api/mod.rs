//! SchoolAI server API.

#[cfg(feature = "http")]
pub mod client;
pub mod types;

#[cfg(feature = "http")]
pub use client::ApiClient;
pub use types::{
    InputType, OcrResponse, Progress, RegisterResponse, Registration, Subject, TaskRequest,
};
