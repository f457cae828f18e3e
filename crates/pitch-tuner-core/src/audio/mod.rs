mod assembler;
pub(crate) mod capture;
mod frame;
pub(crate) mod resampler;
mod source;

pub(crate) use resampler::Resampler;

pub use {
    assembler::FrameAssembler,
    capture::CpalAudioSource,
    frame::AudioFrame,
    source::{AudioSource, FrameHandler},
};
