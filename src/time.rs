//! Conversions between milliseconds, seek-bar progress and display strings

/// Upper bound of the seek-bar progress scale.
pub const MAX_PROGRESS: u32 = 10_000;

/// Convert a seek-bar progress value to a millisecond offset.
pub fn progress_to_millis(duration_ms: u64, progress: u32) -> u64 {
    let progress = progress.min(MAX_PROGRESS) as u128;
    (duration_ms as u128 * progress / MAX_PROGRESS as u128) as u64
}

/// Convert a millisecond offset to a seek-bar progress value.
///
/// Returns 0 for an empty duration.
pub fn millis_to_progress(timestamp_ms: u64, duration_ms: u64) -> u32 {
    if duration_ms == 0 {
        return 0;
    }
    let progress = timestamp_ms as u128 * MAX_PROGRESS as u128 / duration_ms as u128;
    progress.min(MAX_PROGRESS as u128) as u32
}

/// Format milliseconds as MM:SS.
pub fn format_time(millis: u64) -> String {
    let total_secs = millis / 1000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins:02}:{secs:02}")
}
