use crate::{AudioFrame, CoreResult, TunerError, audio::Resampler};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::debug;

/// Turns raw interleaved device buffers into mono frames at the target rate.
///
/// Channels are averaged, the result is resampled when the device rate differs
/// from the target, and complete frames are cut from the front of the stream.
/// Samples short of a full frame carry over to the next push.
pub struct FrameAssembler {
    channels: usize,
    frame_size: usize,
    output_rate: u32,
    resampler: Option<Resampler>,
    mono: Vec<f32>,
    pending: Vec<f32>,
}

impl FrameAssembler {
    /// Prepares to read `channels`-wide interleaved audio at `input_rate` and
    /// emit `frame_size`-sample frames at `output_rate`.
    ///
    /// # Errors
    ///
    /// [`TunerError::InvalidConfig`] if any argument is zero, or
    /// [`TunerError::ResamplingError`] if the resampler cannot be built.
    #[track_caller]
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        channels: usize,
        frame_size: usize,
    ) -> CoreResult<Self> {
        if channels == 0 || frame_size == 0 || input_rate == 0 || output_rate == 0 {
            return Err(TunerError::InvalidConfig {
                reason: format!(
                    "cannot assemble frames: channels={}, frame_size={}, input_rate={}, output_rate={}",
                    channels, frame_size, input_rate, output_rate
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let resampler = if input_rate != output_rate {
            Some(Resampler::new(input_rate, output_rate)?)
        } else {
            None
        };

        debug!(
            input_rate,
            output_rate,
            channels,
            frame_size,
            resampling = resampler.is_some(),
            "Frame assembler configured"
        );

        Ok(Self {
            channels,
            frame_size,
            output_rate,
            resampler,
            mono: Vec::with_capacity(frame_size),
            pending: Vec::with_capacity(frame_size * 2),
        })
    }

    /// Appends one device buffer and returns the frames it completed.
    #[track_caller]
    pub fn push(&mut self, interleaved: &[f32]) -> CoreResult<Vec<AudioFrame>> {
        self.mono.clear();
        if self.channels == 1 {
            self.mono.extend_from_slice(interleaved);
        } else {
            let scale = 1.0 / self.channels as f32;
            self.mono.extend(
                interleaved
                    .chunks_exact(self.channels)
                    .map(|frame| frame.iter().sum::<f32>() * scale),
            );
        }

        match self.resampler.as_mut() {
            Some(resampler) => resampler.process(&self.mono, &mut self.pending)?,
            None => self.pending.extend_from_slice(&self.mono),
        }

        let complete = self.pending.len() / self.frame_size;
        let mut frames = Vec::with_capacity(complete);
        for chunk in self.pending.chunks_exact(self.frame_size) {
            frames.push(AudioFrame::new(chunk.to_vec(), self.output_rate));
        }
        self.pending.drain(..complete * self.frame_size);

        Ok(frames)
    }

    /// Samples collected toward the next frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
