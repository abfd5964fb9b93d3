use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;

use super::model::PlaybackModel;
use super::poller::Poller;
use crate::audio::assets::{AssetHandle, AssetSource};
use crate::audio::decoder;
use crate::audio::engine::PlaybackEngine;
use crate::audio::extractor::Extractor;
use crate::audio::types::{PlaybackPosition, PlaybackState};
use crate::config::ViewerConfig;
use crate::error::{PlayerError, PlayerResult};

/// Owns the playback engine's lifecycle and the values derived from it.
///
/// Every operation returns its outcome and also publishes failures to the
/// model's error field, so observers can surface them without holding the
/// result. Loads are synchronous end to end.
pub struct PlaybackController {
    engine: Arc<dyn PlaybackEngine>,
    extractor: Mutex<Box<dyn Extractor>>,
    assets: Arc<dyn AssetSource>,
    model: Arc<PlaybackModel>,
    poller: Poller,
    default_assets: Vec<String>,
    next_default: AtomicUsize,
}

impl PlaybackController {
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        extractor: Box<dyn Extractor>,
        assets: Arc<dyn AssetSource>,
        runtime: Handle,
        config: &ViewerConfig,
    ) -> Self {
        Self {
            engine,
            extractor: Mutex::new(extractor),
            assets,
            model: Arc::new(PlaybackModel::new()),
            poller: Poller::new(runtime, config.playback.refresh_interval()),
            default_assets: config.assets.defaults.clone(),
            next_default: AtomicUsize::new(0),
        }
    }

    pub fn model(&self) -> &PlaybackModel {
        &self.model
    }

    pub fn state(&self) -> PlaybackState {
        self.model.state()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    /// Pending error, cleared by this call.
    pub fn take_error(&self) -> Option<PlayerError> {
        self.model.take_error()
    }

    /// Amplitude at the current waveform index, if any media is loaded.
    pub fn current_amplitude(&self) -> Option<i16> {
        self.model
            .waveform()
            .get(self.model.waveform_index())
            .copied()
    }

    /// Load a bundled asset by name.
    pub fn load_asset(&self, name: &str) -> PlayerResult<()> {
        log::debug!("Trying to load media: {name}");
        self.load(self.assets.open(name))
    }

    /// Load a file the user picked.
    pub fn load_path(&self, path: &Path) -> PlayerResult<()> {
        log::debug!("Trying to load external media: {}", path.display());
        self.load(self.assets.open_path(path))
    }

    /// Load the next bundled asset, cycling through the configured list.
    pub fn next_default_asset(&self) -> PlayerResult<()> {
        if self.default_assets.is_empty() {
            return self.fail(PlayerError::SourceUnavailable(
                "No default assets configured".into(),
            ));
        }
        let slot = self.next_default.fetch_add(1, Ordering::Relaxed) % self.default_assets.len();
        let name = self.default_assets[slot].clone();
        self.load_asset(&name)
    }

    /// Replace the current source. On failure the controller stays unloaded.
    pub fn load(&self, opened: PlayerResult<AssetHandle>) -> PlayerResult<()> {
        // Holding the extractor serializes concurrent loads
        let mut extractor = self
            .extractor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.reset();
        let result = opened.and_then(|handle| self.load_locked(extractor.as_mut(), &handle));
        match result {
            Ok(()) => {
                log::debug!("State after loading file: {:?}", self.model.state());
                self.succeed()
            }
            Err(e) => {
                log::error!("Failed to set media: {e}");
                self.reset();
                self.fail(e)
            }
        }
    }

    fn load_locked(&self, extractor: &mut dyn Extractor, handle: &AssetHandle) -> PlayerResult<()> {
        self.engine.set_source(handle)?;
        let (source, amplitudes) = decoder::extract_raw_data(extractor, handle)?;
        self.engine.prepare()?;

        let position = PlaybackPosition {
            timestamp_ms: self.engine.current_position_ms(),
            duration_ms: self.engine.duration_ms(),
        };
        log::info!(
            "Loaded {}: {} samples, {} ms",
            source.title,
            amplitudes.len(),
            position.duration_ms
        );
        self.model.publish_source(source.title, amplitudes, position);
        self.model.set_state(PlaybackState::Prepared);
        self.model.sync_state(&*self.engine);
        Ok(())
    }

    /// Drop the engine's source and every derived value.
    fn reset(&self) {
        self.engine.reset();
        self.model.clear();
    }

    pub fn play(&self) -> PlayerResult<()> {
        match self.model.state() {
            PlaybackState::Uninitialized => {
                log::error!("Media player is not ready");
                return self.fail(PlayerError::EngineNotReady);
            }
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Prepared => {}
        }

        log::debug!("play");
        if let Err(e) = self.engine.play() {
            return self.fail(e);
        }
        self.model.set_state(PlaybackState::Playing);
        self.poller
            .start(Arc::clone(&self.engine), Arc::clone(&self.model));
        self.succeed()
    }

    pub fn pause(&self) -> PlayerResult<()> {
        match self.model.state() {
            PlaybackState::Uninitialized => {
                log::error!("Media player is not ready");
                return self.fail(PlayerError::EngineNotReady);
            }
            PlaybackState::Prepared => return Ok(()),
            PlaybackState::Playing => {}
        }

        log::debug!("pause");
        if let Err(e) = self.engine.pause() {
            return self.fail(e);
        }
        self.model.set_state(PlaybackState::Prepared);
        self.succeed()
    }

    pub fn toggle_play_pause(&self) -> PlayerResult<()> {
        match self.model.state() {
            PlaybackState::Playing => self.pause(),
            _ => self.play(),
        }
    }

    /// Pause if playing and rewind to the start.
    pub fn stop(&self) -> PlayerResult<()> {
        let state = self.model.state();
        if state == PlaybackState::Uninitialized {
            log::error!("Media player is not initialized");
            return self.fail(PlayerError::EngineNotReady);
        }

        log::debug!("stop");
        if state == PlaybackState::Playing {
            if let Err(e) = self.engine.pause() {
                return self.fail(e);
            }
        }
        if let Err(e) = self.engine.seek(0) {
            return self.fail(e);
        }
        self.model.set_state(PlaybackState::Prepared);
        self.model.refresh_position(&*self.engine);
        self.succeed()
    }

    /// Jump to an offset without changing the playback state.
    pub fn seek(&self, millis: u64) -> PlayerResult<()> {
        if self.model.state() == PlaybackState::Uninitialized {
            log::error!("Media player is not ready");
            return self.fail(PlayerError::EngineNotReady);
        }

        log::debug!("Seek to {millis} ms");
        if let Err(e) = self.engine.seek(millis) {
            return self.fail(e);
        }
        self.model.refresh_position(&*self.engine);
        log::debug!("Position after seek: {} ms", self.model.position().timestamp_ms);
        self.succeed()
    }

    /// A completed operation retires any pending error.
    fn succeed(&self) -> PlayerResult<()> {
        self.model.take_error();
        Ok(())
    }

    fn fail(&self, error: PlayerError) -> PlayerResult<()> {
        self.model.set_error(error.clone());
        Err(error)
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.model.state())
            .field("title", &self.model.title())
            .field("polling", &self.poller.is_active())
            .finish_non_exhaustive()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.engine.release();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    use crate::audio::extractor::WavExtractor;
    use crate::testing::{wav_bytes, wav_bytes_f32, FakeEngine, FakeExtractor, MemoryAssets};

    const SMALL: &str = "whistle_mono_44100Hz_16bit.wav";
    const MEDIUM: &str = "gravitational_wave_mono_44100Hz_16bit.wav";

    fn tone(len: usize) -> Vec<i16> {
        (0..len).map(|i| ((i % 200) as i16 - 100) * 100).collect()
    }

    fn assets() -> MemoryAssets {
        MemoryAssets::default()
            .with(SMALL, wav_bytes(&tone(792), 1, 44_100))
            .with(MEDIUM, wav_bytes(&tone(44_100), 1, 44_100))
            .with("stereo.wav", wav_bytes(&tone(200), 2, 44_100))
            .with("float.wav", wav_bytes_f32(&[0.0, 0.5, -0.5, 0.25], 44_100))
            .with("48k.wav", wav_bytes(&tone(100), 1, 48_000))
    }

    fn controller_on(runtime: Handle) -> (PlaybackController, FakeEngine) {
        let engine = FakeEngine::new();
        let mut config = ViewerConfig::default();
        config.assets.defaults = vec![MEDIUM.to_string(), SMALL.to_string()];
        let controller = PlaybackController::new(
            Arc::new(engine.clone()),
            Box::new(WavExtractor::new()),
            Arc::new(assets()),
            runtime,
            &config,
        );
        (controller, engine)
    }

    fn loaded(runtime: Handle) -> (PlaybackController, FakeEngine) {
        let (controller, engine) = controller_on(runtime);
        controller.load_asset(MEDIUM).unwrap();
        (controller, engine)
    }

    #[tokio::test]
    async fn loads_small_asset_metadata() {
        let (controller, _) = controller_on(Handle::current());
        controller.load_asset(SMALL).unwrap();

        let model = controller.model();
        assert_eq!(model.waveform().len(), 792);
        assert_eq!(model.position().duration_ms, 792 * 1000 / 44_100);
        assert_eq!(model.position().timestamp_ms, 0);
        assert_eq!(model.title(), SMALL);
        assert_eq!(controller.state(), PlaybackState::Prepared);
        assert_eq!(model.error(), None);
    }

    #[tokio::test]
    async fn non_pcm16_is_rejected_without_waveform() {
        let (controller, engine) = controller_on(Handle::current());
        let err = controller.load_asset("float.wav").unwrap_err();

        assert!(matches!(err, PlayerError::UnsupportedFormat(_)));
        assert!(matches!(
            controller.model().error(),
            Some(PlayerError::UnsupportedFormat(_))
        ));
        assert!(controller.model().waveform().is_empty());
        assert_eq!(controller.state(), PlaybackState::Uninitialized);
        assert!(engine.state().source.is_none());
    }

    #[tokio::test]
    async fn stereo_and_other_rates_are_rejected() {
        let (controller, _) = controller_on(Handle::current());
        for name in ["stereo.wav", "48k.wav"] {
            let err = controller.load_asset(name).unwrap_err();
            assert!(matches!(err, PlayerError::UnsupportedFormat(_)), "{name}");
            assert_eq!(controller.state(), PlaybackState::Uninitialized);
        }
    }

    #[tokio::test]
    async fn missing_asset_is_source_unavailable() {
        let (controller, _) = controller_on(Handle::current());
        let err = controller.load_asset("random_file.wav").unwrap_err();
        assert!(matches!(err, PlayerError::SourceUnavailable(_)));
        assert_eq!(controller.state(), PlaybackState::Uninitialized);
    }

    #[tokio::test]
    async fn second_load_replaces_first() {
        let (controller, engine) = controller_on(Handle::current());
        controller.load_asset(MEDIUM).unwrap();
        controller.seek(500).unwrap();
        controller.load_asset(SMALL).unwrap();

        let model = controller.model();
        assert_eq!(model.title(), SMALL);
        assert_eq!(model.waveform().len(), 792);
        assert_eq!(model.position().duration_ms, 17);
        assert_eq!(model.position().timestamp_ms, 0);
        assert_eq!(model.waveform_index(), 0);
        assert_eq!(engine.state().resets, 2);
    }

    #[tokio::test]
    async fn failed_reload_clears_previous_source() {
        let (controller, _) = loaded(Handle::current());
        assert!(controller.load_asset("float.wav").is_err());

        let model = controller.model();
        assert_eq!(model.title(), "");
        assert!(model.waveform().is_empty());
        assert_eq!(model.position(), PlaybackPosition::default());
    }

    #[tokio::test]
    async fn prepare_failure_leaves_uninitialized() {
        let (controller, engine) = controller_on(Handle::current());
        engine.state().fail_prepare = true;

        let err = controller.load_asset(SMALL).unwrap_err();
        assert_eq!(err, PlayerError::EngineFailure("prepare failed".into()));
        assert_eq!(controller.state(), PlaybackState::Uninitialized);
        assert!(controller.model().waveform().is_empty());
    }

    #[tokio::test]
    async fn successful_load_clears_pending_error() {
        let (controller, _) = controller_on(Handle::current());
        let _ = controller.play();
        assert!(controller.model().error().is_some());

        controller.load_asset(SMALL).unwrap();
        assert_eq!(controller.model().error(), None);
    }

    #[tokio::test]
    async fn successful_seek_clears_pending_error() {
        let (controller, engine) = loaded(Handle::current());
        engine.state().fail_seek = true;
        assert!(controller.seek(100).is_err());
        assert!(controller.model().error().is_some());

        engine.state().fail_seek = false;
        controller.seek(200).unwrap();
        assert_eq!(controller.model().error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_transport_clears_pending_error() {
        let (controller, engine) = loaded(Handle::current());
        engine.state().fail_seek = true;
        assert!(controller.seek(100).is_err());

        controller.play().unwrap();
        assert_eq!(controller.model().error(), None);

        assert!(controller.seek(100).is_err());
        controller.pause().unwrap();
        assert_eq!(controller.model().error(), None);

        assert!(controller.seek(100).is_err());
        engine.state().fail_seek = false;
        controller.stop().unwrap();
        assert_eq!(controller.model().error(), None);
    }

    #[tokio::test]
    async fn play_while_uninitialized_reports_not_ready() {
        let (controller, engine) = controller_on(Handle::current());
        assert_eq!(controller.play(), Err(PlayerError::EngineNotReady));
        assert_eq!(controller.state(), PlaybackState::Uninitialized);
        assert_eq!(controller.take_error(), Some(PlayerError::EngineNotReady));
        assert_eq!(controller.take_error(), None);
        assert!(!engine.state().playing);
    }

    #[tokio::test]
    async fn transport_on_uninitialized_is_harmless() {
        let (controller, _) = controller_on(Handle::current());
        assert_eq!(controller.seek(1000), Err(PlayerError::EngineNotReady));
        assert_eq!(controller.stop(), Err(PlayerError::EngineNotReady));
        assert_eq!(controller.pause(), Err(PlayerError::EngineNotReady));
        assert_eq!(controller.toggle_play_pause(), Err(PlayerError::EngineNotReady));
        assert_eq!(controller.state(), PlaybackState::Uninitialized);
        assert_eq!(controller.model().error(), Some(PlayerError::EngineNotReady));
    }

    #[tokio::test(start_paused = true)]
    async fn play_pause_stop_ends_prepared_at_zero() {
        let (controller, engine) = loaded(Handle::current());

        controller.play().unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
        engine.advance(300);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.model().position().timestamp_ms, 300);

        controller.pause().unwrap();
        assert_eq!(controller.state(), PlaybackState::Prepared);
        assert!(!engine.state().playing);

        controller.stop().unwrap();
        assert_eq!(controller.state(), PlaybackState::Prepared);
        assert_eq!(controller.model().position().timestamp_ms, 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!controller.is_polling());
        assert_eq!(controller.model().position().timestamp_ms, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn play_twice_keeps_one_poller() {
        let (controller, _) = loaded(Handle::current());
        controller.play().unwrap();
        controller.play().unwrap();
        assert_eq!(controller.poller.loops_started(), 1);
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_dispatches_on_state() {
        let (controller, engine) = loaded(Handle::current());
        controller.toggle_play_pause().unwrap();
        assert!(engine.state().playing);
        controller.toggle_play_pause().unwrap();
        assert!(!engine.state().playing);
        assert_eq!(controller.state(), PlaybackState::Prepared);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_playing_pauses_engine() {
        let (controller, engine) = loaded(Handle::current());
        controller.play().unwrap();
        engine.advance(700);
        controller.stop().unwrap();

        assert!(!engine.state().playing);
        assert_eq!(controller.state(), PlaybackState::Prepared);
        assert_eq!(controller.model().position().timestamp_ms, 0);
    }

    #[tokio::test]
    async fn seek_updates_position_and_index_only() {
        let (controller, _) = loaded(Handle::current());
        controller.seek(500).unwrap();

        let model = controller.model();
        assert_eq!(model.position().timestamp_ms, 500);
        assert_eq!(model.position().progress(), 5_000);
        assert_eq!(model.waveform_index(), 44_100 / 2 - 1);
        assert_eq!(controller.state(), PlaybackState::Prepared);
        assert_eq!(controller.current_amplitude(), Some(tone(44_100)[22_049]));
    }

    #[tokio::test]
    async fn seek_is_clamped_by_engine() {
        let (controller, _) = loaded(Handle::current());
        controller.seek(60_000).unwrap();
        assert_eq!(controller.model().position().timestamp_ms, 1000);
    }

    #[tokio::test]
    async fn failed_seek_keeps_state() {
        let (controller, engine) = loaded(Handle::current());
        engine.state().fail_seek = true;

        assert!(controller.seek(100).is_err());
        assert_eq!(controller.state(), PlaybackState::Prepared);
        assert_eq!(
            controller.take_error(),
            Some(PlayerError::EngineFailure("seek failed".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn finished_playback_returns_to_prepared() {
        let (controller, engine) = loaded(Handle::current());
        controller.play().unwrap();
        engine.finish();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(controller.state(), PlaybackState::Prepared);
        assert_eq!(controller.model().position().timestamp_ms, 1000);
        assert!(!controller.is_polling());
    }

    #[tokio::test]
    async fn default_assets_cycle() {
        let (controller, _) = controller_on(Handle::current());
        controller.next_default_asset().unwrap();
        assert_eq!(controller.model().title(), MEDIUM);
        controller.next_default_asset().unwrap();
        assert_eq!(controller.model().title(), SMALL);
        controller.next_default_asset().unwrap();
        assert_eq!(controller.model().title(), MEDIUM);
    }

    #[tokio::test]
    async fn scripted_extractor_feeds_waveform() {
        let engine = FakeEngine::new();
        let bytes: Vec<u8> = [3i16, -3, 9].iter().flat_map(|s| s.to_le_bytes()).collect();
        let controller = PlaybackController::new(
            Arc::new(engine.clone()),
            Box::new(FakeExtractor::pcm16(bytes)),
            Arc::new(MemoryAssets::default().with("raw.pcm", vec![0u8; 50])),
            Handle::current(),
            &ViewerConfig::default(),
        );

        controller.load_asset("raw.pcm").unwrap();
        assert_eq!(&*controller.model().waveform(), &[3, -3, 9]);
    }

    #[tokio::test]
    async fn drop_releases_engine() {
        let (controller, engine) = controller_on(Handle::current());
        drop(controller);
        assert!(engine.state().released);
    }
}
