use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use iced::keyboard;
use iced::widget::{canvas, center, column, container, text};
use iced::{Element, Length, Subscription, Task, Theme};
use tokio::sync::watch;

use crate::audio::assets::FsAssets;
use crate::audio::engine::CpalEngine;
use crate::audio::extractor::WavExtractor;
use crate::audio::types::{AmplitudeSequence, PlaybackPosition, PlaybackState};
use crate::config::ViewerConfig;
use crate::error::{PlayerError, PlayerResult};
use crate::playback::PlaybackController;
use crate::time::{progress_to_millis, MAX_PROGRESS};
use crate::ui::controls::{self, ControlMessage};
use crate::ui::waveform::{WaveformMessage, WaveformView};
use crate::waveform::Geometry;

/// Arrow keys jump this far.
const KEY_SEEK_MS: u64 = 5_000;

pub struct App {
    controller: Option<Arc<PlaybackController>>,
    waveform_rx: Option<watch::Receiver<AmplitudeSequence>>,

    // Snapshot of the model, refreshed every tick
    state: PlaybackState,
    position: PlaybackPosition,
    title: String,
    error: Option<String>,

    waveform_view: WaveformView,
}

#[derive(Debug, Clone)]
pub enum Message {
    ControllerReady(PlayerResult<Arc<PlaybackController>>),
    Loaded(PlayerResult<()>),
    Control(ControlMessage),
    Waveform(WaveformMessage),
    Tick,
    KeyEvent(keyboard::Event),
    FileDialogResult(Option<PathBuf>),
}

fn boot(config: ViewerConfig) -> (App, Task<Message>) {
    let app = App {
        controller: None,
        waveform_rx: None,
        state: PlaybackState::Uninitialized,
        position: PlaybackPosition::default(),
        title: String::new(),
        error: None,
        waveform_view: WaveformView::new(
            Geometry::from(&config.waveform),
            config.waveform.animation_duration(),
        ),
    };

    let task = Task::perform(
        async move {
            let runtime = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || start_controller(runtime, &config))
                .await
                .map_err(join_error)?
        },
        Message::ControllerReady,
    );

    (app, task)
}

/// Open the audio output and load the first bundled sample.
fn start_controller(
    runtime: tokio::runtime::Handle,
    config: &ViewerConfig,
) -> PlayerResult<Arc<PlaybackController>> {
    let engine = CpalEngine::spawn()?;
    let controller = PlaybackController::new(
        Arc::new(engine),
        Box::new(WavExtractor::new()),
        Arc::new(FsAssets::new(&config.assets.root)),
        runtime,
        config,
    );
    // A failed first load is published on the model and shown on the next tick
    let _ = controller.next_default_asset();
    Ok(Arc::new(controller))
}

fn join_error(e: tokio::task::JoinError) -> PlayerError {
    PlayerError::EngineFailure(format!("Background task failed: {e}"))
}

/// Run a load on the blocking pool; decoding a long file takes a while.
fn load_in_background(
    controller: &Arc<PlaybackController>,
    load: impl FnOnce(&PlaybackController) -> PlayerResult<()> + Send + 'static,
) -> Task<Message> {
    let controller = Arc::clone(controller);
    Task::perform(
        async move {
            tokio::task::spawn_blocking(move || load(&controller))
                .await
                .map_err(join_error)?
        },
        Message::Loaded,
    )
}

fn title(app: &App) -> String {
    if app.title.is_empty() {
        "Waveform Viewer".to_string()
    } else {
        format!("Waveform Viewer - {}", app.title)
    }
}

fn update(app: &mut App, message: Message) -> Task<Message> {
    match message {
        Message::ControllerReady(result) => {
            match result {
                Ok(controller) => {
                    let mut rx = controller.model().subscribe_waveform();
                    let current = rx.borrow_and_update().clone();
                    app.waveform_view.set_data(current, Instant::now());
                    app.waveform_rx = Some(rx);
                    app.controller = Some(controller);
                }
                Err(e) => {
                    log::error!("Audio engine unavailable: {e}");
                    app.error = Some(format!("Audio engine error: {e}"));
                }
            }
            Task::none()
        }
        Message::Loaded(result) => {
            settle(app, result);
            Task::none()
        }
        Message::Control(ctrl) => {
            let Some(controller) = app.controller.clone() else {
                return match ctrl {
                    ControlMessage::OpenFile => open_file_dialog(),
                    _ => Task::none(),
                };
            };
            match ctrl {
                ControlMessage::OpenFile => open_file_dialog(),
                ControlMessage::NextSample => {
                    load_in_background(&controller, PlaybackController::next_default_asset)
                }
                ControlMessage::PlayPause => {
                    settle(app, controller.toggle_play_pause());
                    Task::none()
                }
                ControlMessage::Stop => {
                    settle(app, controller.stop());
                    Task::none()
                }
                ControlMessage::SeekTo(progress) => {
                    let millis = progress_to_millis(app.position.duration_ms, progress);
                    settle(app, controller.seek(millis));
                    Task::none()
                }
            }
        }
        Message::FileDialogResult(path) => {
            let Some(path) = path else {
                return Task::none();
            };
            match app.controller.clone() {
                Some(controller) => load_in_background(&controller, move |c| c.load_path(&path)),
                None => {
                    app.error = Some(PlayerError::EngineNotReady.to_string());
                    Task::none()
                }
            }
        }
        Message::Waveform(wm) => match wm {
            WaveformMessage::Seek(millis) => {
                if let Some(controller) = app.controller.clone() {
                    settle(app, controller.seek(millis));
                }
                Task::none()
            }
            WaveformMessage::Resized(width, height) => {
                app.waveform_view.resize(width, height, Instant::now());
                Task::none()
            }
        },
        Message::Tick => {
            let now = Instant::now();
            if let Some(rx) = &mut app.waveform_rx {
                if rx.has_changed().unwrap_or(false) {
                    let amplitudes = rx.borrow_and_update().clone();
                    app.waveform_view.set_data(amplitudes, now);
                }
            }
            app.waveform_view.tick(now);

            if let Some(controller) = &app.controller {
                let model = controller.model();
                app.state = model.state();
                app.position = model.position();
                app.title = model.title();
                if let Some(e) = controller.take_error() {
                    app.error = Some(e.to_string());
                }
            }
            app.waveform_view.playback_position =
                app.position.progress() as f64 / MAX_PROGRESS as f64;
            app.waveform_view.duration_ms = app.position.duration_ms;
            Task::none()
        }
        Message::KeyEvent(key_event) => match key_event {
            keyboard::Event::KeyPressed { key, .. } => match key.as_ref() {
                keyboard::Key::Named(keyboard::key::Named::Space) => {
                    update(app, Message::Control(ControlMessage::PlayPause))
                }
                keyboard::Key::Named(keyboard::key::Named::ArrowLeft) => {
                    let millis = app.position.timestamp_ms.saturating_sub(KEY_SEEK_MS);
                    update(app, Message::Waveform(WaveformMessage::Seek(millis)))
                }
                keyboard::Key::Named(keyboard::key::Named::ArrowRight) => {
                    let millis = (app.position.timestamp_ms + KEY_SEEK_MS)
                        .min(app.position.duration_ms);
                    update(app, Message::Waveform(WaveformMessage::Seek(millis)))
                }
                _ => Task::none(),
            },
            _ => Task::none(),
        },
    }
}

/// A successful operation retires the error notice. Failures arrive through
/// the model on the next tick.
fn settle(app: &mut App, result: PlayerResult<()>) {
    if result.is_ok() {
        app.error = None;
    }
}

fn open_file_dialog() -> Task<Message> {
    Task::perform(
        async {
            let handle = rfd::AsyncFileDialog::new()
                .add_filter("Audio", &["wav"])
                .pick_file()
                .await;
            handle.map(|h| h.path().to_path_buf())
        },
        Message::FileDialogResult,
    )
}

fn view(app: &App) -> Element<'_, Message> {
    let controls = controls::view_controls(app.state, app.position).map(Message::Control);

    let waveform: Element<Message> = if app.controller.is_some() {
        let canvas_el: Element<WaveformMessage> = canvas::Canvas::new(&app.waveform_view)
            .width(Length::Fill)
            .height(Length::Fill)
            .into();
        canvas_el.map(Message::Waveform)
    } else {
        center(text(PlayerError::EngineNotReady.to_string()).size(18))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    };

    let mut content = column![controls, waveform].spacing(5);

    if let Some(err) = &app.error {
        content = content.push(
            container(text(format!("Error: {err}")).color(iced::Color::from_rgb(1.0, 0.3, 0.3)))
                .padding(10),
        );
    }

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn subscription(_app: &App) -> Subscription<Message> {
    let tick =
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick);

    let keys = keyboard::listen().map(Message::KeyEvent);

    Subscription::batch([tick, keys])
}

fn theme(_app: &App) -> Theme {
    Theme::Light
}

pub fn run(config: ViewerConfig) -> iced::Result {
    iced::application(move || boot(config.clone()), update, view)
        .title(title)
        .subscription(subscription)
        .theme(theme)
        .window_size((1000.0, 500.0))
        .run()
}
