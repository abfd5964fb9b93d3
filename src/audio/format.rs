//! Track format validation
//!
//! Only mono, 44.1 kHz, 16-bit PCM sources are accepted. A field the
//! extractor does not report is not checked.

use std::fmt;

use super::types::{PcmEncoding, TrackFormat};
use crate::error::PlayerError;

pub const EXPECTED_ENCODING: PcmEncoding = PcmEncoding::Pcm16;
pub const EXPECTED_CHANNELS: u16 = 1;
pub const EXPECTED_SAMPLE_RATE: u32 = 44_100;

/// A reported field that differs from the required value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatMismatch {
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for FormatMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

impl From<FormatMismatch> for PlayerError {
    fn from(mismatch: FormatMismatch) -> Self {
        PlayerError::UnsupportedFormat(mismatch.to_string())
    }
}

/// Check a single track's metadata against the required format.
pub fn check_track(format: &TrackFormat) -> Result<(), FormatMismatch> {
    if let Some(encoding) = &format.encoding {
        if *encoding != EXPECTED_ENCODING {
            return Err(FormatMismatch {
                field: "encoding",
                expected: EXPECTED_ENCODING.to_string(),
                actual: encoding.to_string(),
            });
        }
    }
    if let Some(channels) = format.channel_count {
        if channels != EXPECTED_CHANNELS {
            return Err(FormatMismatch {
                field: "channel count",
                expected: EXPECTED_CHANNELS.to_string(),
                actual: channels.to_string(),
            });
        }
    }
    if let Some(rate) = format.sample_rate {
        if rate != EXPECTED_SAMPLE_RATE {
            return Err(FormatMismatch {
                field: "sample rate",
                expected: format!("{EXPECTED_SAMPLE_RATE} Hz"),
                actual: format!("{rate} Hz"),
            });
        }
    }
    Ok(())
}

/// Validate a source given its track count and the format of its first track.
///
/// Zero tracks is a failure regardless of the reported format.
pub fn validate(track_count: usize, first_track: Option<&TrackFormat>) -> Result<(), PlayerError> {
    if track_count == 0 {
        return Err(PlayerError::UnsupportedFormat(
            "no media tracks found".to_string(),
        ));
    }
    match first_track {
        Some(format) => check_track(format).map_err(|mismatch| {
            log::error!("Rejecting source, {mismatch}");
            PlayerError::from(mismatch)
        }),
        None => Ok(()),
    }
}
