//! Observable playback values
//!
//! Each field is a `watch` sender: the latest value plus change
//! notification for any number of subscribers. Only the controller and
//! its poller write here.

use tokio::sync::watch;

use crate::audio::engine::PlaybackEngine;
use crate::audio::types::{AmplitudeSequence, PlaybackPosition, PlaybackState};
use crate::error::PlayerError;

/// Index into an amplitude sequence nearest to a timestamp.
///
/// `floor(len * timestamp / duration) - 1`; `None` when that is negative
/// or the duration is zero.
pub fn waveform_index(len: usize, timestamp_ms: u64, duration_ms: u64) -> Option<usize> {
    if duration_ms == 0 {
        return None;
    }
    let scaled = len as u128 * timestamp_ms as u128 / duration_ms as u128;
    let index = scaled as i128 - 1;
    if index < 0 {
        return None;
    }
    Some((index as usize).min(len.saturating_sub(1)))
}

pub struct PlaybackModel {
    state: watch::Sender<PlaybackState>,
    position: watch::Sender<PlaybackPosition>,
    waveform: watch::Sender<AmplitudeSequence>,
    waveform_index: watch::Sender<usize>,
    title: watch::Sender<String>,
    error: watch::Sender<Option<PlayerError>>,
}

impl Default for PlaybackModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackModel {
    pub fn new() -> Self {
        Self {
            state: watch::channel(PlaybackState::Uninitialized).0,
            position: watch::channel(PlaybackPosition::default()).0,
            waveform: watch::channel(AmplitudeSequence::from(Vec::new())).0,
            waveform_index: watch::channel(0).0,
            title: watch::channel(String::new()).0,
            error: watch::channel(None).0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn position(&self) -> PlaybackPosition {
        *self.position.borrow()
    }

    pub fn waveform(&self) -> AmplitudeSequence {
        self.waveform.borrow().clone()
    }

    pub fn waveform_index(&self) -> usize {
        *self.waveform_index.borrow()
    }

    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }

    pub fn error(&self) -> Option<PlayerError> {
        self.error.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn subscribe_position(&self) -> watch::Receiver<PlaybackPosition> {
        self.position.subscribe()
    }

    pub fn subscribe_waveform(&self) -> watch::Receiver<AmplitudeSequence> {
        self.waveform.subscribe()
    }

    pub fn subscribe_waveform_index(&self) -> watch::Receiver<usize> {
        self.waveform_index.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<PlayerError>> {
        self.error.subscribe()
    }

    pub(crate) fn set_state(&self, state: PlaybackState) {
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    /// Apply the engine's playing flag unless the media has been unloaded.
    pub(crate) fn sync_state(&self, engine: &dyn PlaybackEngine) {
        match engine.is_playing() {
            Ok(playing) => {
                let next = if playing {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Prepared
                };
                self.state.send_if_modified(|current| {
                    if *current == PlaybackState::Uninitialized || *current == next {
                        return false;
                    }
                    *current = next;
                    true
                });
            }
            Err(e) => {
                log::error!("Media player error: {e}");
                self.set_state(PlaybackState::Uninitialized);
                self.set_error(e);
            }
        }
    }

    /// Re-read the engine position and recompute the waveform index.
    pub(crate) fn refresh_position(&self, engine: &dyn PlaybackEngine) {
        let timestamp_ms = engine.current_position_ms();
        let duration_ms = self.position.borrow().duration_ms;
        self.position.send_replace(PlaybackPosition {
            timestamp_ms,
            duration_ms,
        });

        let len = self.waveform.borrow().len();
        if let Some(index) = waveform_index(len, timestamp_ms, duration_ms) {
            self.waveform_index.send_replace(index);
        }
    }

    /// Publish everything derived from a freshly loaded source at once.
    pub(crate) fn publish_source(
        &self,
        title: String,
        waveform: AmplitudeSequence,
        position: PlaybackPosition,
    ) {
        self.waveform.send_replace(waveform);
        self.waveform_index.send_replace(0);
        self.title.send_replace(title);
        self.position.send_replace(position);
    }

    /// Back to the empty, unloaded state. Pending errors are kept.
    pub(crate) fn clear(&self) {
        self.waveform.send_replace(AmplitudeSequence::from(Vec::new()));
        self.waveform_index.send_replace(0);
        self.title.send_replace(String::new());
        self.position.send_replace(PlaybackPosition::default());
        self.set_state(PlaybackState::Uninitialized);
    }

    pub(crate) fn set_error(&self, error: PlayerError) {
        self.error.send_replace(Some(error));
    }

    pub(crate) fn take_error(&self) -> Option<PlayerError> {
        self.error.send_replace(None)
    }
}
