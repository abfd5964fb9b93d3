//! Playback lifecycle, observable values and position polling

pub mod controller;
pub mod model;
pub mod poller;

pub use controller::PlaybackController;
pub use model::PlaybackModel;
