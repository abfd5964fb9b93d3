//! Scripted collaborators for unit tests

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audio::assets::{AssetHandle, AssetSource};
use crate::audio::engine::PlaybackEngine;
use crate::audio::extractor::Extractor;
use crate::audio::types::{PcmEncoding, TrackFormat};
use crate::error::{PlayerError, PlayerResult};

/// Encode 16-bit samples as a WAV file.
pub fn wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Encode float samples as a 32-bit float WAV file.
pub fn wav_bytes_f32(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Extractor that serves fixed bytes in small chunks.
pub struct FakeExtractor {
    pub tracks: usize,
    pub format: TrackFormat,
    pub data: Vec<u8>,
    pub chunk_size: usize,
    pub released: bool,
    cursor: usize,
    selected: bool,
}

impl FakeExtractor {
    pub fn pcm16(data: Vec<u8>) -> Self {
        Self {
            tracks: 1,
            format: TrackFormat {
                encoding: Some(PcmEncoding::Pcm16),
                channel_count: Some(1),
                sample_rate: Some(44_100),
            },
            data,
            chunk_size: 4,
            released: false,
            cursor: 0,
            selected: false,
        }
    }
}

impl Extractor for FakeExtractor {
    fn set_source(&mut self, _handle: &AssetHandle) -> PlayerResult<()> {
        self.released = false;
        self.cursor = 0;
        Ok(())
    }

    fn track_count(&self) -> usize {
        self.tracks
    }

    fn track_format(&self, index: usize) -> Option<TrackFormat> {
        (index < self.tracks).then(|| self.format.clone())
    }

    fn select_track(&mut self, _index: usize) -> PlayerResult<()> {
        self.selected = true;
        Ok(())
    }

    fn read_sample_data(&mut self, buf: &mut [u8], offset: usize) -> PlayerResult<Option<usize>> {
        if !self.selected {
            return Err(PlayerError::SourceUnavailable("No track selected".into()));
        }
        if self.cursor >= self.data.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.chunk_size).min(self.data.len());
        let chunk = &self.data[self.cursor..end];
        buf[offset..offset + chunk.len()].copy_from_slice(chunk);
        Ok(Some(chunk.len()))
    }

    fn advance(&mut self) {
        self.cursor = (self.cursor + self.chunk_size).min(self.data.len());
    }

    fn release(&mut self) {
        self.released = true;
        self.selected = false;
    }
}

/// Assets held in memory, keyed by name.
#[derive(Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn with(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(name.to_string(), bytes);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn open(&self, name: &str) -> PlayerResult<AssetHandle> {
        self.files
            .get(name)
            .map(|bytes| AssetHandle::new(name, bytes.clone()))
            .ok_or_else(|| PlayerError::SourceUnavailable(format!("No asset named {name}")))
    }
}

#[derive(Debug, Default)]
pub struct FakeEngineState {
    pub source: Option<String>,
    pub prepared: bool,
    pub playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub fail_prepare: bool,
    pub fail_is_playing: bool,
    pub fail_seek: bool,
    pub resets: usize,
    pub released: bool,
}

/// Engine whose clock only moves when a test moves it.
///
/// Duration is derived from the source length as 16-bit mono at 44.1 kHz.
#[derive(Default, Clone)]
pub struct FakeEngine {
    state: Arc<Mutex<FakeEngineState>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeEngineState> {
        self.state.lock().unwrap()
    }

    /// Move the playhead as if audio had been playing.
    pub fn advance(&self, millis: u64) {
        let mut state = self.state();
        state.position_ms = (state.position_ms + millis).min(state.duration_ms);
    }

    /// Reach the end of the media, the way a real engine stops itself.
    pub fn finish(&self) {
        let mut state = self.state();
        state.position_ms = state.duration_ms;
        state.playing = false;
    }
}

impl PlaybackEngine for FakeEngine {
    fn set_source(&self, handle: &AssetHandle) -> PlayerResult<()> {
        let mut state = self.state();
        if state.source.is_some() {
            return Err(PlayerError::EngineFailure("Source already set".into()));
        }
        state.source = Some(handle.name.clone());
        state.duration_ms = handle.bytes.len().saturating_sub(44) as u64 / 2 * 1000 / 44_100;
        Ok(())
    }

    fn prepare(&self) -> PlayerResult<()> {
        let mut state = self.state();
        if state.fail_prepare {
            return Err(PlayerError::EngineFailure("prepare failed".into()));
        }
        if state.source.is_none() {
            return Err(PlayerError::EngineFailure("No source set".into()));
        }
        state.prepared = true;
        state.position_ms = 0;
        Ok(())
    }

    fn play(&self) -> PlayerResult<()> {
        let mut state = self.state();
        if !state.prepared {
            return Err(PlayerError::EngineNotReady);
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&self) -> PlayerResult<()> {
        self.state().playing = false;
        Ok(())
    }

    fn seek(&self, millis: u64) -> PlayerResult<()> {
        let mut state = self.state();
        if state.fail_seek {
            return Err(PlayerError::EngineFailure("seek failed".into()));
        }
        state.position_ms = millis.min(state.duration_ms);
        Ok(())
    }

    fn is_playing(&self) -> PlayerResult<bool> {
        let state = self.state();
        if state.fail_is_playing {
            return Err(PlayerError::EngineFailure("engine in error state".into()));
        }
        Ok(state.playing)
    }

    fn current_position_ms(&self) -> u64 {
        self.state().position_ms
    }

    fn duration_ms(&self) -> u64 {
        let state = self.state();
        if state.prepared {
            state.duration_ms
        } else {
            0
        }
    }

    fn reset(&self) {
        let mut state = self.state();
        state.source = None;
        state.prepared = false;
        state.playing = false;
        state.position_ms = 0;
        state.duration_ms = 0;
        state.resets += 1;
    }

    fn release(&self) {
        self.reset();
        self.state().released = true;
    }
}
