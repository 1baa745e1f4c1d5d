use std::{io, time::Instant};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::{
    cache::ResultCache,
    config::Config,
    demux::FrameDemuxer,
    render::OverlayRenderer,
    schedule::{DetectionScheduler, FrameCounter},
    traits::{ByteSource, Detector, DisplaySink, FrameDecoder},
};

/// What a single loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No complete payload buffered yet.
    NeedMoreData,
    /// A payload failed to decode and was dropped.
    Discarded,
    /// A frame went to the display; `detected` tells whether it got a fresh
    /// detection pass.
    Rendered { detected: bool },
    StreamClosed,
    QuitRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    StreamClosed,
    QuitRequested,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub detection_passes: u64,
    pub discarded: u64,
    pub reason: StopReason,
}

/// Single-threaded control loop: stream bytes in, annotated frames out.
///
/// Only the stream read and the display's key poll may block. Detection
/// runs inline, so a pass directly lengthens the iteration it lands on.
pub struct VisionPipeline<Source, Decoder, Vessel, Floater, Display> {
    source: Source,
    decoder: Decoder,
    vessel_detector: Vessel,
    floater_detector: Floater,
    display: Display,
    demuxer: FrameDemuxer,
    scheduler: DetectionScheduler,
    cache: ResultCache,
    renderer: OverlayRenderer,
    counter: FrameCounter,
    chunk: Vec<u8>,
    discarded: u64,
    log_every: u64,
    started: Instant,
    torn_down: bool,
}

impl<Source, Decoder, Vessel, Floater, Display>
    VisionPipeline<Source, Decoder, Vessel, Floater, Display>
where
    Source: ByteSource,
    Decoder: FrameDecoder,
    Vessel: Detector,
    Floater: Detector,
    Display: DisplaySink,
{
    pub fn new(
        config: &Config,
        source: Source,
        decoder: Decoder,
        vessel_detector: Vessel,
        floater_detector: Floater,
        display: Display,
    ) -> Self {
        VisionPipeline {
            source,
            decoder,
            vessel_detector,
            floater_detector,
            display,
            demuxer: FrameDemuxer::new(),
            scheduler: DetectionScheduler::from_config(&config.schedule),
            cache: ResultCache::new(),
            renderer: OverlayRenderer::new(&config.render),
            counter: FrameCounter::new(),
            chunk: vec![0; config.capture.chunk_size.max(1)],
            discarded: 0,
            log_every: config.schedule.log_every,
            started: Instant::now(),
            torn_down: false,
        }
    }

    /// Reads one chunk and handles at most one frame. Further frames already
    /// buffered wait for later steps.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let read = match self.source.read_chunk(&mut self.chunk) {
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                return Ok(StepOutcome::NeedMoreData)
            }
            Err(error) => return Err(error).context("Failed to read from capture stream"),
        };

        if read == 0 {
            return Ok(StepOutcome::StreamClosed);
        }

        self.demuxer.push(&self.chunk[..read]);

        let payload = match self.demuxer.extract() {
            Some(payload) => payload,
            None => return Ok(StepOutcome::NeedMoreData),
        };

        let mut frame = match self.decoder.decode(&payload)? {
            Some(frame) => frame,
            None => {
                self.discarded += 1;
                debug!(len = payload.len(), "discarding undecodable frame");
                return Ok(StepOutcome::Discarded);
            }
        };

        let frame_count = self.counter.increment();

        let detected = self.scheduler.run(
            frame_count,
            &frame,
            &mut self.vessel_detector,
            &mut self.floater_detector,
            &mut self.cache,
        )?;

        let detections = self.cache.current();
        self.renderer
            .render(&mut frame, &detections)
            .context("Overlay rendering failed")?;

        self.display
            .show(&frame)
            .context("Failed to display frame")?;
        self.log_progress(frame_count);

        if self.display.poll_quit()? {
            return Ok(StepOutcome::QuitRequested);
        }

        Ok(StepOutcome::Rendered { detected })
    }

    /// Loops until the stream closes, the user quits, or a step fails, then
    /// tears down. Failures are logged here and go no further.
    pub fn run(&mut self) -> RunSummary {
        let reason = loop {
            match self.step() {
                Ok(StepOutcome::StreamClosed) => {
                    info!("capture stream closed");
                    break StopReason::StreamClosed;
                }
                Ok(StepOutcome::QuitRequested) => {
                    info!("quit requested");
                    break StopReason::QuitRequested;
                }
                Ok(_) => {}
                Err(error) => {
                    error!("pipeline failed: {:#}", error);
                    break StopReason::Failed;
                }
            }
        };

        self.shutdown();

        RunSummary {
            frames: self.counter.get(),
            detection_passes: self.scheduler.passes(),
            discarded: self.discarded,
            reason,
        }
    }

    /// Stops the producer and closes the display. Runs once; later calls do
    /// nothing.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Err(error) = self.source.terminate() {
            warn!("{:#}", error);
        }
        if let Err(error) = self.display.release() {
            warn!("{:#}", error);
        }
    }

    fn log_progress(&self, frame_count: u64) {
        if self.log_every == 0 || frame_count % self.log_every != 0 {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        info!(
            frames = frame_count,
            detection_passes = self.scheduler.passes(),
            discarded = self.discarded,
            fps = format!("{:.1}", frame_count as f64 / elapsed.max(f64::EPSILON)),
            "pipeline throughput"
        );
    }
}
