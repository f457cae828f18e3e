use crate::{CoreResult, TunerError};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument, trace};

/// Requested input frames per resampler pass. Rubato may round it up to suit
/// the rate ratio; the effective size is [`Resampler::chunk_size`].
const REQUESTED_CHUNK_SIZE: usize = 1024;

/// Streaming mono resampler.
///
/// Input that does not fill a whole chunk is held back until the next call,
/// so filter state stays continuous across capture callbacks.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    chunk_size: usize,
    pending: Vec<f32>,
    output_chunk: Vec<f32>,
}

impl Resampler {
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32) -> CoreResult<Self> {
        let sub_chunks = 2;

        let resampler = Fft::<f32>::new(
            input_rate as usize,  // sample_rate_input
            output_rate as usize, // sample_rate_output
            REQUESTED_CHUNK_SIZE, // chunk_size
            sub_chunks,           // sub_chunks
            1,                    // nbr_channels (mono)
            FixedSync::Input,     // fixed
        )
        .map_err(|e| TunerError::ResamplingError {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let chunk_size = resampler.input_frames_next();
        let output_chunk = vec![0.0f32; resampler.output_frames_max()];

        debug!(
            input_rate = input_rate,
            output_rate = output_rate,
            chunk_size = chunk_size,
            "Resampler initialized"
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            chunk_size,
            pending: Vec::with_capacity(chunk_size * 2),
            output_chunk,
        })
    }

    /// Feeds `samples` and appends every completed output sample to `output`.
    ///
    /// Chunks resampled before a failure stay consumed, so their output is
    /// never produced twice.
    #[track_caller]
    pub fn process(&mut self, samples: &[f32], output: &mut Vec<f32>) -> CoreResult<()> {
        let Self {
            resampler,
            chunk_size,
            pending,
            output_chunk,
            ..
        } = self;
        pending.extend_from_slice(samples);

        let chunk_size = *chunk_size;
        drain_chunks(pending, chunk_size, |chunk| {
            let input_adapter = InterleavedSlice::new(chunk, 1, chunk_size).map_err(|e| {
                TunerError::ResamplingError {
                    reason: format!("Failed to create input adapter: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

            let output_frames = output_chunk.len();
            let mut output_adapter =
                InterleavedSlice::new_mut(output_chunk.as_mut_slice(), 1, output_frames).map_err(
                    |e| TunerError::ResamplingError {
                        reason: format!("Failed to create output adapter: {}", e),
                        location: ErrorLocation::from(Location::caller()),
                    },
                )?;

            let (_input_frames, output_frames_written) = resampler
                .process_into_buffer(&input_adapter, &mut output_adapter, None)
                .map_err(|e| TunerError::ResamplingError {
                    reason: format!("Resampling failed: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            output.extend_from_slice(&output_chunk[..output_frames_written]);
            Ok(())
        })?;

        trace!(
            input_len = samples.len(),
            pending = self.pending.len(),
            input_rate = self.input_rate,
            output_rate = self.output_rate,
            "Resampled audio"
        );

        Ok(())
    }

    /// Input frames consumed per pass.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Samples waiting for a full chunk.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Runs `f` over each whole `chunk_size` run at the front of `pending`, then
/// removes the runs it accepted. A failing run and everything after it stay.
pub(crate) fn drain_chunks(
    pending: &mut Vec<f32>,
    chunk_size: usize,
    mut f: impl FnMut(&[f32]) -> CoreResult<()>,
) -> CoreResult<()> {
    let mut consumed = 0;
    let mut result = Ok(());
    while chunk_size > 0 && pending.len() - consumed >= chunk_size {
        if let Err(e) = f(&pending[consumed..consumed + chunk_size]) {
            result = Err(e);
            break;
        }
        consumed += chunk_size;
    }

    pending.drain(..consumed);
    result
}
