use iced::widget::{button, container, row, slider, text, Column, Row};
use iced::{Alignment, Color, Element, Length};

use crate::audio::types::{PlaybackPosition, PlaybackState};
use crate::time::{format_time, millis_to_progress, MAX_PROGRESS};

#[derive(Debug, Clone)]
pub enum ControlMessage {
    PlayPause,
    Stop,
    OpenFile,
    NextSample,
    SeekTo(u32), // seek-bar progress, 0..=MAX_PROGRESS
}

const INDICATOR_ON: Color = Color::from_rgb(1.0, 0.0, 0.0);
const INDICATOR_OFF: Color = Color::from_rgb(0.43, 0.0, 0.0);

/// Build the transport controls view.
pub fn view_controls<'a>(
    state: PlaybackState,
    position: PlaybackPosition,
) -> Element<'a, ControlMessage> {
    let ready = state != PlaybackState::Uninitialized;
    let playing = state == PlaybackState::Playing;

    let play_label = if playing { "Pause" } else { "Play" };
    let play_btn =
        button(text(play_label)).on_press_maybe(ready.then_some(ControlMessage::PlayPause));
    let stop_btn = button(text("Stop")).on_press_maybe(ready.then_some(ControlMessage::Stop));
    let open_btn = button(text("Open File")).on_press(ControlMessage::OpenFile);
    let next_btn = button(text("Next Sample")).on_press(ControlMessage::NextSample);

    let indicator = text("●")
        .size(18)
        .color(if playing { INDICATOR_ON } else { INDICATOR_OFF });

    let time_display = text(format!(
        "{} / {}",
        format_time(position.timestamp_ms),
        format_time(position.duration_ms)
    ))
    .size(16);

    let progress = millis_to_progress(position.timestamp_ms, position.duration_ms);
    let seek_bar = slider(0..=MAX_PROGRESS, progress, ControlMessage::SeekTo).width(Length::Fill);

    let controls_row = Row::new()
        .spacing(10)
        .align_y(Alignment::Center)
        .push(open_btn)
        .push(next_btn)
        .push(play_btn)
        .push(stop_btn)
        .push(indicator)
        .push(time_display);

    let seek_row = row![seek_bar].padding([0, 10]).align_y(Alignment::Center);

    container(Column::new().spacing(8).push(controls_row).push(seek_row))
        .padding(10)
        .into()
}
