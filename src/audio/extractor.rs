//! Demuxing raw sample bytes out of a container
//!
//! The extractor strips the container (WAV header) and hands back raw,
//! headerless sample bytes chunk by chunk.

use std::io::Cursor;

use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32LE, CODEC_TYPE_PCM_S8, CODEC_TYPE_PCM_U8,
};
use symphonia::core::formats::{FormatOptions, FormatReader, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::assets::AssetHandle;
use super::types::{PcmEncoding, TrackFormat};
use crate::error::{PlayerError, PlayerResult};

/// Sequential access to the raw sample data of a media source.
pub trait Extractor: Send {
    fn set_source(&mut self, handle: &AssetHandle) -> PlayerResult<()>;

    fn track_count(&self) -> usize;

    fn track_format(&self, index: usize) -> Option<TrackFormat>;

    fn select_track(&mut self, index: usize) -> PlayerResult<()>;

    /// Copy the current chunk into `buf` starting at `offset`.
    ///
    /// Returns the number of bytes written, or `None` once the track is exhausted.
    fn read_sample_data(&mut self, buf: &mut [u8], offset: usize) -> PlayerResult<Option<usize>>;

    /// Move on to the next chunk.
    fn advance(&mut self);

    fn release(&mut self);
}

/// Map a symphonia codec to the encoding vocabulary used by validation.
pub fn encoding_of(codec: CodecType) -> PcmEncoding {
    match codec {
        CODEC_TYPE_PCM_S16LE => PcmEncoding::Pcm16,
        CODEC_TYPE_PCM_U8 | CODEC_TYPE_PCM_S8 => PcmEncoding::Pcm8,
        CODEC_TYPE_PCM_S24LE => PcmEncoding::Pcm24,
        CODEC_TYPE_PCM_S32LE => PcmEncoding::Pcm32,
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F64LE => PcmEncoding::Float,
        other => PcmEncoding::Other(format!("{other:?}")),
    }
}

fn format_of(track: &Track) -> TrackFormat {
    let params = &track.codec_params;
    TrackFormat {
        encoding: Some(encoding_of(params.codec)),
        channel_count: params.channels.map(|c| c.count() as u16),
        sample_rate: params.sample_rate,
    }
}

/// Extractor for WAV containers backed by symphonia's format readers.
#[derive(Default)]
pub struct WavExtractor {
    reader: Option<Box<dyn FormatReader>>,
    selected: Option<u32>,
    pending: Option<Vec<u8>>,
    exhausted: bool,
}

impl WavExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_chunk(&mut self) -> PlayerResult<Option<Vec<u8>>> {
        let Some(track_id) = self.selected else {
            return Err(PlayerError::SourceUnavailable("No track selected".into()));
        };
        let Some(reader) = self.reader.as_mut() else {
            return Err(PlayerError::SourceUnavailable("No source set".into()));
        };

        loop {
            let packet = match reader.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(e) => {
                    return Err(PlayerError::SourceUnavailable(format!(
                        "Error reading packet: {e}"
                    )))
                }
            };

            if packet.track_id() != track_id {
                continue;
            }
            return Ok(Some(packet.buf().to_vec()));
        }
    }
}

impl Extractor for WavExtractor {
    fn set_source(&mut self, handle: &AssetHandle) -> PlayerResult<()> {
        self.release();

        let cursor = Cursor::new(handle.bytes.clone());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = handle.extension() {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                PlayerError::UnsupportedFormat(format!("Failed to probe {}: {e}", handle.name))
            })?;

        self.reader = Some(probed.format);
        Ok(())
    }

    fn track_count(&self) -> usize {
        self.reader.as_ref().map_or(0, |r| r.tracks().len())
    }

    fn track_format(&self, index: usize) -> Option<TrackFormat> {
        self.reader
            .as_ref()
            .and_then(|r| r.tracks().get(index))
            .map(format_of)
    }

    fn select_track(&mut self, index: usize) -> PlayerResult<()> {
        let id = self
            .reader
            .as_ref()
            .and_then(|r| r.tracks().get(index))
            .map(|t| t.id)
            .ok_or_else(|| PlayerError::SourceUnavailable(format!("No track at index {index}")))?;
        self.selected = Some(id);
        self.pending = None;
        self.exhausted = false;
        Ok(())
    }

    fn read_sample_data(&mut self, buf: &mut [u8], offset: usize) -> PlayerResult<Option<usize>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.pending.is_none() {
            match self.next_chunk()? {
                Some(chunk) => self.pending = Some(chunk),
                None => {
                    self.exhausted = true;
                    return Ok(None);
                }
            }
        }

        let chunk = self.pending.as_deref().unwrap_or_default();
        let room = buf.len().saturating_sub(offset);
        let len = chunk.len().min(room);
        if len < chunk.len() {
            log::warn!(
                "Extraction buffer full, dropping {} bytes",
                chunk.len() - len
            );
        }
        if len > 0 {
            buf[offset..offset + len].copy_from_slice(&chunk[..len]);
        }
        Ok(Some(len))
    }

    fn advance(&mut self) {
        self.pending = None;
    }

    fn release(&mut self) {
        self.reader = None;
        self.selected = None;
        self.pending = None;
        self.exhausted = false;
    }
}
