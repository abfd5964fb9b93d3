use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use super::assets::AssetHandle;
use super::decoder;
use super::types::{AudioCommand, AudioData};
use crate::error::{PlayerError, PlayerResult};

/// The playback side of a loaded source.
///
/// Methods take `&self` so an engine can be shared between the controller
/// and the position poller.
pub trait PlaybackEngine: Send + Sync {
    fn set_source(&self, handle: &AssetHandle) -> PlayerResult<()>;
    fn prepare(&self) -> PlayerResult<()>;
    fn play(&self) -> PlayerResult<()>;
    fn pause(&self) -> PlayerResult<()>;
    /// Jump to an offset; the engine clamps it to `[0, duration]`.
    fn seek(&self, millis: u64) -> PlayerResult<()>;
    fn is_playing(&self) -> PlayerResult<bool>;
    fn current_position_ms(&self) -> u64;
    fn duration_ms(&self) -> u64;
    /// Drop the current source and return to the idle state.
    fn reset(&self);
    /// Tear down the output stream. The engine is unusable afterwards.
    fn release(&self);
}

/// Values the audio callback publishes for lock-free queries.
#[derive(Default)]
struct SharedPosition {
    frame: AtomicU64,
    playing: AtomicBool,
}

struct EngineState {
    audio: Option<Arc<AudioData>>,
    position: f64, // current source frame, fractional when rates differ
    playing: bool,
    output_sample_rate: u32,
    shared: Arc<SharedPosition>,
}

impl EngineState {
    fn new(output_sample_rate: u32, shared: Arc<SharedPosition>) -> Self {
        Self {
            audio: None,
            position: 0.0,
            playing: false,
            output_sample_rate,
            shared,
        }
    }

    fn handle_command(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Load(data) => {
                self.audio = Some(data);
                self.position = 0.0;
                self.playing = false;
            }
            AudioCommand::Play => {
                if self.audio.is_some() {
                    self.playing = true;
                }
            }
            AudioCommand::Pause => {
                self.playing = false;
            }
            AudioCommand::Seek(frame) => {
                if let Some(audio) = &self.audio {
                    self.position = frame.min(audio.num_frames()) as f64;
                }
            }
            AudioCommand::Unload => {
                self.audio = None;
                self.position = 0.0;
                self.playing = false;
            }
        }
        // A callback already in flight may have published a stale flag
        self.publish();
    }

    /// Fill the output buffer, stepping through the source at its own rate.
    fn fill_buffer(&mut self, output: &mut [f32], channels: u16) {
        let audio = match (&self.audio, self.playing) {
            (Some(a), true) => a.clone(),
            _ => {
                output.fill(0.0);
                return;
            }
        };

        let audio_channels = audio.channels.max(1) as usize;
        let out_channels = channels.max(1) as usize;
        let total_frames = audio.num_frames();
        let step = audio.sample_rate as f64 / self.output_sample_rate.max(1) as f64;

        for frame in output.chunks_mut(out_channels) {
            let src = self.position as usize;
            if src >= total_frames {
                // Playback finished
                self.playing = false;
                self.position = total_frames as f64;
                frame.fill(0.0);
                continue;
            }
            for (c, out) in frame.iter_mut().enumerate() {
                *out = audio.samples[src * audio_channels + c % audio_channels];
            }
            self.position += step;
        }

        self.publish();
    }

    fn publish(&self) {
        self.shared
            .frame
            .store(self.position as u64, Ordering::Relaxed);
        self.shared.playing.store(self.playing, Ordering::Relaxed);
    }
}

/// Output engine playing through the default cpal device.
pub struct CpalEngine {
    cmd_tx: Sender<AudioCommand>,
    shutdown_tx: Sender<()>,
    shared: Arc<SharedPosition>,
    source: Mutex<Option<AssetHandle>>,
    audio: Mutex<Option<Arc<AudioData>>>,
}

impl CpalEngine {
    /// Open the default output device and start the (silent) output stream.
    pub fn spawn() -> PlayerResult<Self> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded::<AudioCommand>(64);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let shared = Arc::new(SharedPosition::default());

        spawn_stream(cmd_rx, shutdown_rx, Arc::clone(&shared))?;

        Ok(Self {
            cmd_tx,
            shutdown_tx,
            shared,
            source: Mutex::new(None),
            audio: Mutex::new(None),
        })
    }

    fn send(&self, cmd: AudioCommand) -> PlayerResult<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| PlayerError::EngineFailure("Audio stream is gone".into()))
    }

    fn loaded(&self) -> Option<Arc<AudioData>> {
        self.audio
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl PlaybackEngine for CpalEngine {
    fn set_source(&self, handle: &AssetHandle) -> PlayerResult<()> {
        let mut source = self.source.lock().unwrap_or_else(|p| p.into_inner());
        if source.is_some() {
            return Err(PlayerError::EngineFailure(
                "Source already set, reset the engine first".into(),
            ));
        }
        *source = Some(handle.clone());
        Ok(())
    }

    fn prepare(&self) -> PlayerResult<()> {
        let handle = self
            .source
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or_else(|| PlayerError::EngineFailure("No source set".into()))?;

        let audio = Arc::new(decoder::decode_for_playback(&handle)?);
        log::debug!(
            "Prepared {}: {} frames at {} Hz",
            handle.name,
            audio.num_frames(),
            audio.sample_rate
        );
        self.send(AudioCommand::Load(Arc::clone(&audio)))?;
        self.shared.frame.store(0, Ordering::Relaxed);
        self.shared.playing.store(false, Ordering::Relaxed);
        *self.audio.lock().unwrap_or_else(|p| p.into_inner()) = Some(audio);
        Ok(())
    }

    fn play(&self) -> PlayerResult<()> {
        let audio = self.loaded().ok_or(PlayerError::EngineNotReady)?;
        // Restart from the top when the previous run reached the end
        if self.shared.frame.load(Ordering::Relaxed) as usize >= audio.num_frames() {
            self.seek(0)?;
        }
        self.shared.playing.store(true, Ordering::Relaxed);
        self.send(AudioCommand::Play)
    }

    fn pause(&self) -> PlayerResult<()> {
        self.shared.playing.store(false, Ordering::Relaxed);
        self.send(AudioCommand::Pause)
    }

    fn seek(&self, millis: u64) -> PlayerResult<()> {
        let audio = self.loaded().ok_or(PlayerError::EngineNotReady)?;
        let frame = audio.frame_at(millis.min(audio.duration_ms));
        self.shared.frame.store(frame as u64, Ordering::Relaxed);
        self.send(AudioCommand::Seek(frame))
    }

    fn is_playing(&self) -> PlayerResult<bool> {
        Ok(self.shared.playing.load(Ordering::Relaxed))
    }

    fn current_position_ms(&self) -> u64 {
        match self.loaded() {
            Some(audio) => audio.millis_at(self.shared.frame.load(Ordering::Relaxed) as usize),
            None => 0,
        }
    }

    fn duration_ms(&self) -> u64 {
        self.loaded().map_or(0, |audio| audio.duration_ms)
    }

    fn reset(&self) {
        *self.source.lock().unwrap_or_else(|p| p.into_inner()) = None;
        *self.audio.lock().unwrap_or_else(|p| p.into_inner()) = None;
        self.shared.frame.store(0, Ordering::Relaxed);
        self.shared.playing.store(false, Ordering::Relaxed);
        if self.send(AudioCommand::Unload).is_err() {
            log::warn!("Reset after the audio stream was released");
        }
    }

    fn release(&self) {
        self.reset();
        let _ = self.shutdown_tx.try_send(());
    }
}

/// Build the output stream and keep it alive on its own thread until shutdown.
fn spawn_stream(
    cmd_rx: Receiver<AudioCommand>,
    shutdown_rx: Receiver<()>,
    shared: Arc<SharedPosition>,
) -> PlayerResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlayerError::EngineFailure("No audio output device found".into()))?;

    let config = device
        .default_output_config()
        .map_err(|e| PlayerError::EngineFailure(format!("Failed to get output config: {e}")))?;

    let sample_rate = config.sample_rate();
    let channels = config.channels();
    let sample_format = config.sample_format();
    log::info!(
        "Audio output: {} Hz, {} channels, {:?}",
        sample_rate,
        channels,
        sample_format
    );

    let mut state = EngineState::new(sample_rate, shared);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    while let Ok(cmd) = cmd_rx.try_recv() {
                        state.handle_command(cmd);
                    }
                    state.fill_buffer(data, channels);
                },
                |err| {
                    log::error!("Audio stream error: {err}");
                },
                None,
            )
            .map_err(|e| {
                PlayerError::EngineFailure(format!("Failed to build output stream: {e}"))
            })?,
        _ => {
            return Err(PlayerError::EngineFailure(format!(
                "Unsupported sample format: {sample_format:?}"
            )))
        }
    };

    stream
        .play()
        .map_err(|e| PlayerError::EngineFailure(format!("Failed to start stream: {e}")))?;

    std::thread::Builder::new()
        .name("audio-keepalive".into())
        .spawn(move || {
            let _stream = stream;
            let _ = shutdown_rx.recv();
            log::info!("Audio stream released");
        })
        .map_err(|e| PlayerError::EngineFailure(format!("Failed to spawn keepalive thread: {e}")))?;

    Ok(())
}
