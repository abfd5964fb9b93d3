use std::fmt;
use std::sync::Arc;

use crate::time;

/// Decoded audio data held in memory by the output engine.
#[derive(Clone, Debug)]
pub struct AudioData {
    /// Interleaved samples normalized to [-1.0, 1.0].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl AudioData {
    /// Total number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Frame index for a millisecond offset, clamped to the end of the data.
    pub fn frame_at(&self, millis: u64) -> usize {
        let frame = millis as u128 * self.sample_rate as u128 / 1000;
        (frame as usize).min(self.num_frames())
    }

    /// Millisecond offset of a frame index.
    pub fn millis_at(&self, frame: usize) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (frame as u128 * 1000 / self.sample_rate as u128) as u64
    }
}

/// Sample encoding reported by a track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PcmEncoding {
    Pcm8,
    Pcm16,
    Pcm24,
    Pcm32,
    Float,
    Other(String),
}

impl fmt::Display for PcmEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PcmEncoding::Pcm8 => write!(f, "PCM 8-bit"),
            PcmEncoding::Pcm16 => write!(f, "PCM 16-bit"),
            PcmEncoding::Pcm24 => write!(f, "PCM 24-bit"),
            PcmEncoding::Pcm32 => write!(f, "PCM 32-bit"),
            PcmEncoding::Float => write!(f, "PCM float"),
            PcmEncoding::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Track metadata as reported by an extractor. Absent fields are unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackFormat {
    pub encoding: Option<PcmEncoding>,
    pub channel_count: Option<u16>,
    pub sample_rate: Option<u32>,
}

/// A loaded source: what the user picked plus its validated format.
#[derive(Clone, Debug)]
pub struct AudioSource {
    pub title: String,
    pub byte_length: Option<u64>,
    pub format: TrackFormat,
}

/// Decoded amplitudes, one per sample, in temporal order.
pub type AmplitudeSequence = Arc<[i16]>;

/// Lifecycle of the loaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Uninitialized,
    Prepared,
    Playing,
}

/// Current timestamp and total duration, both in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackPosition {
    pub timestamp_ms: u64,
    pub duration_ms: u64,
}

impl PlaybackPosition {
    /// Seek-bar progress on the `0..=MAX_PROGRESS` scale.
    pub fn progress(&self) -> u32 {
        time::millis_to_progress(self.timestamp_ms, self.duration_ms)
    }
}

/// Commands sent from the control thread to the audio callback.
#[derive(Debug, Clone)]
pub enum AudioCommand {
    Load(Arc<AudioData>),
    Play,
    Pause,
    Seek(usize),
    Unload,
}
