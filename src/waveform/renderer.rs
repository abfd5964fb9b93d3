//! Progressive waveform drawing
//!
//! The curve is revealed left to right over a short eased animation. Each
//! tick appends only the newly revealed points; nothing already committed
//! is recomputed.

use std::f32::consts::PI;
use std::time::{Duration, Instant};

use super::geometry::{Geometry, WaveformPoint};
use crate::audio::types::AmplitudeSequence;

/// One drawing instruction of the revealed curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
    MoveTo(WaveformPoint),
    LineTo(WaveformPoint),
    QuadTo {
        control: WaveformPoint,
        to: WaveformPoint,
    },
}

/// Smoothed path through `points[start..=end]`.
///
/// Each point after the first is reached by a quadratic curve whose control
/// point is the midpoint of the previous and current points. Boundary
/// requests (fewer than two gaps, out of range, no points) yield nothing.
pub fn path_chunk(points: &[WaveformPoint], start: i64, end: i64) -> Vec<PathSegment> {
    if end - start <= 1 || points.is_empty() || start < 0 || end >= points.len() as i64 {
        return Vec::new();
    }
    let (start, end) = (start as usize, end as usize);

    let mut prev = points[start];
    let mut chunk = Vec::with_capacity(end - start);
    chunk.push(PathSegment::MoveTo(prev));
    for &point in &points[start + 1..=end] {
        chunk.push(PathSegment::QuadTo {
            control: prev.midpoint(point),
            to: point,
        });
        prev = point;
    }
    chunk
}

/// Accelerate-decelerate timing curve on `[0, 1]`.
pub fn ease_in_out(t: f32) -> f32 {
    ((t.clamp(0.0, 1.0) + 1.0) * PI).cos() / 2.0 + 0.5
}

/// Drives the reveal phase from 0.0 to 1.0 over a fixed duration.
#[derive(Clone, Debug)]
pub struct RevealAnimation {
    duration: Duration,
    started: Option<Instant>,
}

impl RevealAnimation {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: None,
        }
    }

    /// Restart from phase 0, superseding any run in flight.
    pub fn start(&mut self, now: Instant) {
        self.started = Some(now);
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Eased phase at `now`. The final call delivers 1.0 and ends the run.
    pub fn phase(&mut self, now: Instant) -> Option<f32> {
        let started = self.started?;
        let elapsed = now.saturating_duration_since(started);
        if elapsed >= self.duration {
            self.started = None;
            return Some(1.0);
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        Some(ease_in_out(t))
    }
}

/// Holds the waveform data for one view and the curve revealed so far.
pub struct WaveformRenderer {
    geometry: Geometry,
    amplitudes: AmplitudeSequence,
    width: f32,
    height: f32,
    points: Vec<WaveformPoint>,
    segments: Vec<PathSegment>,
    revealed: usize,
    animation: RevealAnimation,
}

impl WaveformRenderer {
    pub fn new(geometry: Geometry, animation_duration: Duration) -> Self {
        Self {
            geometry,
            amplitudes: AmplitudeSequence::from(Vec::new()),
            width: 0.0,
            height: 0.0,
            points: Vec::new(),
            segments: Vec::new(),
            revealed: 0,
            animation: RevealAnimation::new(animation_duration),
        }
    }

    /// Replace the waveform. The reveal starts over from the first point.
    pub fn set_data(&mut self, amplitudes: AmplitudeSequence, now: Instant) {
        self.amplitudes = amplitudes;
        self.render(now);
    }

    /// Report the surface size; a change re-renders.
    pub fn resize(&mut self, width: f32, height: f32, now: Instant) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.render(now);
    }

    fn render(&mut self, now: Instant) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return;
        }

        let center_y = self.height / 2.0;
        self.segments = vec![
            PathSegment::MoveTo(WaveformPoint::new(0.0, center_y)),
            PathSegment::LineTo(WaveformPoint::new(self.width, center_y)),
        ];
        self.points = self
            .geometry
            .points(&self.amplitudes, self.width, self.height);
        self.revealed = 0;
        self.animation.start(now);
        log::debug!(
            "Rendering {} waveform points at {}x{}",
            self.points.len(),
            self.width,
            self.height
        );
    }

    /// Advance the animation. Returns whether the curve grew.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.animation.phase(now) {
            Some(phase) => self.reveal(phase),
            None => false,
        }
    }

    /// Commit every point up to `phase` of the sequence.
    pub fn reveal(&mut self, phase: f32) -> bool {
        let phase = phase.clamp(0.0, 1.0);
        let next = (self.points.len() as f32 * phase).floor() as i64 - 1;
        if next <= self.revealed as i64 {
            return false;
        }
        let chunk = path_chunk(&self.points, self.revealed as i64, next);
        let next = next as usize;
        if chunk.is_empty() {
            // A single-point step continues the curve already drawn
            let prev = self.points[self.revealed];
            if self.revealed == 0 {
                self.segments.push(PathSegment::MoveTo(prev));
            }
            let point = self.points[next];
            self.segments.push(PathSegment::QuadTo {
                control: prev.midpoint(point),
                to: point,
            });
        } else {
            self.segments.extend(chunk);
        }
        self.revealed = next;
        true
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_running()
    }

    pub fn revealed_index(&self) -> usize {
        self.revealed
    }

    pub fn points(&self) -> &[WaveformPoint] {
        &self.points
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}
