//! Amplitude geometry and the progressive curve built from it

pub mod geometry;
pub mod renderer;

pub use geometry::{Geometry, WaveformPoint};
pub use renderer::{PathSegment, WaveformRenderer};
