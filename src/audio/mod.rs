pub mod assets;
pub mod decoder;
pub mod engine;
pub mod extractor;
pub mod format;
pub mod types;
