/// Session-oriented rendering entry point.
pub mod render_session;
