use std::time::Instant;

use iced::mouse;
use iced::widget::canvas::{self, path, Action, Cache, Event, Frame, Geometry, Path, Stroke};
use iced::{Color, Point, Rectangle, Renderer, Size, Theme};

use crate::audio::types::AmplitudeSequence;
use crate::waveform::geometry::{Geometry as Placement, WaveformPoint};
use crate::waveform::renderer::{PathSegment, WaveformRenderer};

/// State for the waveform canvas widget.
pub struct WaveformView {
    waveform_cache: Cache,
    renderer: WaveformRenderer,
    horizontal_inset: f32,
    pub playback_position: f64, // 0.0 to 1.0 fraction
    pub duration_ms: u64,
}

/// Interactions on the waveform.
#[derive(Debug, Clone)]
pub enum WaveformMessage {
    Seek(u64),         // time in milliseconds
    Resized(f32, f32), // canvas width, height
}

impl WaveformView {
    pub fn new(placement: Placement, animation: std::time::Duration) -> Self {
        Self {
            waveform_cache: Cache::new(),
            horizontal_inset: placement.horizontal_inset,
            renderer: WaveformRenderer::new(placement, animation),
            playback_position: 0.0,
            duration_ms: 0,
        }
    }

    pub fn set_data(&mut self, amplitudes: AmplitudeSequence, now: Instant) {
        self.renderer.set_data(amplitudes, now);
        self.waveform_cache.clear();
    }

    pub fn resize(&mut self, width: f32, height: f32, now: Instant) {
        self.renderer.resize(width, height, now);
        self.waveform_cache.clear();
    }

    /// Advance the reveal animation, redrawing only when the curve grew.
    pub fn tick(&mut self, now: Instant) {
        if self.renderer.tick(now) {
            self.waveform_cache.clear();
        }
    }

    /// Horizontal pixel of a playback fraction, honouring the insets.
    fn x_of(&self, fraction: f64, width: f32) -> f32 {
        let span = (width - self.horizontal_inset * 2.0).max(0.0);
        self.horizontal_inset + fraction.clamp(0.0, 1.0) as f32 * span
    }

    fn fraction_of(&self, x: f32, width: f32) -> f64 {
        let span = width - self.horizontal_inset * 2.0;
        if span <= 0.0 {
            return 0.0;
        }
        (((x - self.horizontal_inset) / span) as f64).clamp(0.0, 1.0)
    }
}

fn to_point(p: WaveformPoint) -> Point {
    Point::new(p.x, p.y)
}

fn build_path(segments: &[PathSegment]) -> Path {
    Path::new(|b: &mut path::Builder| {
        for segment in segments {
            match *segment {
                PathSegment::MoveTo(p) => b.move_to(to_point(p)),
                PathSegment::LineTo(p) => b.line_to(to_point(p)),
                PathSegment::QuadTo { control, to } => {
                    b.quadratic_curve_to(to_point(control), to_point(to))
                }
            }
        }
    })
}

impl canvas::Program<WaveformMessage> for WaveformView {
    type State = Option<Size>; // last size reported to the renderer

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let width = bounds.width;
        let height = bounds.height;

        // Layer 1: Cached waveform
        let waveform = self.waveform_cache.draw(renderer, bounds.size(), |frame| {
            frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb(0.95, 0.95, 0.95));

            let curve = build_path(self.renderer.segments());
            frame.stroke(
                &curve,
                Stroke::default()
                    .with_color(Color::BLACK)
                    .with_width(1.0)
                    .with_line_cap(canvas::LineCap::Round),
            );
        });

        // Layer 2: Playhead
        let overlay = {
            let mut frame = Frame::new(renderer, bounds.size());

            let playhead_x = self.x_of(self.playback_position, width);
            let playhead = Path::line(Point::new(playhead_x, 0.0), Point::new(playhead_x, height));
            frame.stroke(
                &playhead,
                Stroke::default()
                    .with_color(Color::from_rgb(0.9, 0.1, 0.1))
                    .with_width(2.0),
            );

            frame.into_geometry()
        };

        vec![waveform, overlay]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<WaveformMessage>> {
        if *state != Some(bounds.size()) {
            *state = Some(bounds.size());
            return Some(Action::publish(WaveformMessage::Resized(
                bounds.width,
                bounds.height,
            )));
        }

        let cursor_pos = cursor.position_in(bounds)?;

        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let fraction = self.fraction_of(cursor_pos.x, bounds.width);
                let millis = (fraction * self.duration_ms as f64) as u64;
                Some(Action::publish(WaveformMessage::Seek(millis)).and_capture())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn view() -> WaveformView {
        WaveformView::new(Placement::default(), Duration::from_millis(100))
    }

    #[test]
    fn fraction_and_x_are_inverse() {
        let view = view();
        let x = view.x_of(0.25, 490.0);
        assert_eq!(x, 45.0 + 100.0);
        assert!((view.fraction_of(x, 490.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn clicks_outside_insets_clamp() {
        let view = view();
        assert_eq!(view.fraction_of(0.0, 490.0), 0.0);
        assert_eq!(view.fraction_of(490.0, 490.0), 1.0);
        assert_eq!(view.fraction_of(10.0, 60.0), 0.0);
    }
}
