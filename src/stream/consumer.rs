//! Chunk-by-chunk consumer composing [`FrameDecoder`] and [`StepEventParser`].

use crate::error::{Result, SchoolError};
use crate::stream::decoder::FrameDecoder;
use crate::stream::event::{Step, StepEventParser, StepSequence};
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use tracing::debug;

/// Receives each step as soon as it is parsed.
pub trait StepSink {
    /// Handle one newly parsed step.
    fn handle(&mut self, step: &Step);

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

impl<F: FnMut(&Step)> StepSink for F {
    fn handle(&mut self, step: &Step) {
        self(step)
    }

    fn name(&self) -> &'static str {
        "closure"
    }
}

/// Sink that keeps a copy of every published step.
#[derive(Debug, Default)]
pub struct CollectorSink {
    collected: Vec<Step>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.collected
    }
}

impl StepSink for CollectorSink {
    fn handle(&mut self, step: &Step) {
        self.collected.push(step.clone());
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Builds a [`StepSequence`] from a live byte source.
///
/// One consumer serves exactly one stream; its decoder buffer is never shared.
#[derive(Debug, Default)]
pub struct StreamingStepConsumer {
    decoder: FrameDecoder,
    parser: StepEventParser,
    steps: StepSequence,
}

impl StreamingStepConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(parser: StepEventParser) -> Self {
        Self {
            parser,
            ..Self::default()
        }
    }

    /// Feed one chunk; returns the steps it completed, in stream order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> &[Step] {
        let before = self.steps.len();
        for frame in self.decoder.ingest(chunk) {
            if let Some(step) = self.parser.parse(&frame) {
                debug!(step_type = %step.step_type, "parsed step");
                self.steps.push(step);
            }
        }
        &self.steps.as_slice()[before..]
    }

    /// Steps accumulated so far.
    pub fn steps(&self) -> &StepSequence {
        &self.steps
    }

    /// End of stream: drop any undelimited trailing frame.
    pub fn finish(mut self) -> StepSequence {
        let discarded = self.decoder.finish();
        if discarded > 0 {
            debug!(discarded, "dropping incomplete trailing frame");
        }
        self.steps
    }

    /// Drive the consumer over `source` until it ends or fails.
    ///
    /// Every step is handed to `sink` as soon as it is parsed, so a caller
    /// rendering incrementally keeps what it saw even when this returns
    /// [`SchoolError::StreamUnavailable`].
    pub async fn consume<S, B, E>(mut self, source: S, sink: &mut dyn StepSink) -> Result<StepSequence>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        futures_util::pin_mut!(source);

        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(|e| SchoolError::StreamUnavailable {
                message: format!(
                    "stream terminated after {} steps: {}",
                    self.steps.len(),
                    e
                ),
            })?;

            for step in self.push_chunk(chunk.as_ref()) {
                sink.handle(step);
            }
        }

        debug!(sink = sink.name(), "stream completed");
        Ok(self.finish())
    }
}
