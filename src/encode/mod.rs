//! Frame sinks.
//!
//! Sinks consume encoded caption frames in output order.

/// `ffmpeg`-based compositor and probing.
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
