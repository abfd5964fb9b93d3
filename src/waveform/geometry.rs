//! Amplitudes to canvas coordinates

use crate::config::WaveformConfig;

/// Full range of a 16-bit sample.
pub const MAX_VALUE: f32 = 65_535.0;

/// Multiply by this to get an amplitude as a fraction of the half range.
const INV_MAX_VALUE: f32 = 2.0 / MAX_VALUE;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveformPoint {
    pub x: f32,
    pub y: f32,
}

impl WaveformPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Placement rules for turning amplitudes into points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    /// Raw samples per emitted point. Zero is treated as one.
    pub stride: usize,
    pub horizontal_inset: f32,
    pub vertical_inset: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::from(&WaveformConfig::default())
    }
}

impl From<&WaveformConfig> for Geometry {
    fn from(config: &WaveformConfig) -> Self {
        Self {
            stride: config.stride,
            horizontal_inset: config.horizontal_inset,
            vertical_inset: config.vertical_inset,
        }
    }
}

impl Geometry {
    /// Sample every `stride`-th amplitude into canvas space.
    ///
    /// Horizontal spacing is per raw sample, so the stride changes point
    /// density but not the horizontal scale. Positive amplitudes draw upward.
    pub fn points(&self, amplitudes: &[i16], width: f32, height: f32) -> Vec<WaveformPoint> {
        if amplitudes.is_empty() {
            return Vec::new();
        }

        let sample_distance = match amplitudes.len() - 1 {
            0 => 0.0,
            gaps => (width - self.horizontal_inset * 2.0) / gaps as f32,
        };
        let center_y = height / 2.0;
        let max_amplitude = center_y - self.vertical_inset;
        let scale = INV_MAX_VALUE * max_amplitude;

        amplitudes
            .iter()
            .enumerate()
            .step_by(self.stride.max(1))
            .map(|(i, &amplitude)| {
                // TODO: fold the skipped samples into y instead of dropping them
                WaveformPoint::new(
                    self.horizontal_inset + i as f32 * sample_distance,
                    center_y - amplitude as f32 * scale,
                )
            })
            .collect()
    }
}
