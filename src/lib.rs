//! Waveform viewer and player for short mono 16-bit PCM recordings
//!
//! Media is validated and decoded into an amplitude sequence, drawn as a
//! smoothed curve that reveals itself left to right, and played back with a
//! playhead that follows the engine's position.

pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod time;
pub mod ui;
pub mod waveform;

#[cfg(test)]
mod testing;
