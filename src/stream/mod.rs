//! Incremental consumer for the solving service's event stream.
//!
//! ```text
//! ┌────────────┐ bytes ┌──────────────┐ frames ┌────────────────┐ steps ┌──────────┐
//! │ byte source│──────▶│ FrameDecoder │───────▶│StepEventParser │──────▶│ StepSink │
//! └────────────┘       └──────────────┘        └────────────────┘       └──────────┘
//!                         carry-over              drops malformed
//!                         buffer                  frames silently
//! ```

pub mod consumer;
pub mod decoder;
pub mod event;

pub use consumer::{CollectorSink, StepSink, StreamingStepConsumer};
pub use decoder::FrameDecoder;
pub use event::{Step, StepEventParser, StepKind, StepSequence};
