use std::io::Cursor;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::assets::AssetHandle;
use super::extractor::Extractor;
use super::format;
use super::types::{AmplitudeSequence, AudioData, AudioSource};
use crate::error::{PlayerError, PlayerResult};

/// Extraction buffer size when the asset length is unknown.
/// 30 MiB holds roughly six minutes of 44.1 kHz 16-bit mono audio.
pub const UNKNOWN_LENGTH_CAPACITY: usize = 30 * 1024 * 1024;

/// A pre-allocated byte buffer and how much of it extraction actually wrote.
#[derive(Debug, Clone)]
pub struct RawBuffer {
    data: Vec<u8>,
    filled: usize,
}

impl RawBuffer {
    /// Allocate for an asset of the given length.
    pub fn for_length(byte_length: Option<u64>) -> Self {
        let capacity = match byte_length {
            None => UNKNOWN_LENGTH_CAPACITY,
            Some(len) => len.min(i32::MAX as u64) as usize,
        };
        Self {
            data: vec![0; capacity],
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The bytes written so far; trailing unused capacity is excluded.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.filled]
    }
}

/// Decode interleaved little-endian 16-bit mono samples.
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Pull every chunk of the selected track into `buffer`.
fn read_all(extractor: &mut dyn Extractor, buffer: &mut RawBuffer) -> PlayerResult<()> {
    while let Some(read) = extractor.read_sample_data(&mut buffer.data, buffer.filled)? {
        if read == 0 {
            break;
        }
        buffer.filled += read;
        extractor.advance();
    }
    Ok(())
}

/// Validate a source and decode its raw samples into amplitudes.
///
/// The extractor is released whether or not extraction succeeds.
pub fn extract_raw_data(
    extractor: &mut dyn Extractor,
    handle: &AssetHandle,
) -> PlayerResult<(AudioSource, AmplitudeSequence)> {
    let result = extract_with(extractor, handle);
    extractor.release();
    result
}

fn extract_with(
    extractor: &mut dyn Extractor,
    handle: &AssetHandle,
) -> PlayerResult<(AudioSource, AmplitudeSequence)> {
    extractor.set_source(handle)?;

    let track_count = extractor.track_count();
    let track_format = extractor.track_format(0);
    format::validate(track_count, track_format.as_ref())?;

    let mut buffer = RawBuffer::for_length(handle.byte_length);
    extractor.select_track(0)?;
    read_all(extractor, &mut buffer)?;

    let amplitudes: AmplitudeSequence = decode_pcm16(buffer.filled()).into();
    log::debug!(
        "Extracted {} samples ({} of {} buffer bytes) from {}",
        amplitudes.len(),
        buffer.filled().len(),
        buffer.capacity(),
        handle.name
    );

    let source = AudioSource {
        title: handle.name.clone(),
        byte_length: handle.byte_length,
        format: track_format.unwrap_or_default(),
    };
    Ok((source, amplitudes))
}

/// Decode an asset into an `AudioData` struct with all samples in memory.
pub fn decode_for_playback(handle: &AssetHandle) -> PlayerResult<AudioData> {
    let cursor = Cursor::new(Arc::clone(&handle.bytes));
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
        .map_err(|e| PlayerError::EngineFailure(format!("Failed to probe format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| PlayerError::EngineFailure("No default track found".into()))?
        .clone();

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PlayerError::EngineFailure("No sample rate in track".into()))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlayerError::EngineFailure(format!("Failed to create decoder: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(PlayerError::EngineFailure(format!(
                    "Error reading packet: {e}"
                )))
            }
        };

        if packet.track_id() != track.id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::warn!("Decode warning: {e}");
                continue;
            }
            Err(e) => return Err(PlayerError::EngineFailure(format!("Decode error: {e}"))),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    let num_frames = samples.len() / channels.max(1) as usize;
    let duration_ms = (num_frames as u128 * 1000 / sample_rate.max(1) as u128) as u64;

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        duration_ms,
    })
}
