/// Convenience result type used across capsync.
pub type CapsyncResult<T> = Result<T, CapsyncError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum CapsyncError {
    /// Invalid user-provided options or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transcript bytes could not be decoded into an ordered word list.
    #[error("malformed transcript: {0}")]
    MalformedTranscript(String),

    /// Font bytes could not be read or registered.
    #[error("font load failure: {0}")]
    FontLoad(String),

    /// A single frame failed to render.
    #[error("render task failure at frame {frame}: {message}")]
    RenderTask {
        /// Global frame index of the failing task.
        frame: u64,
        /// Underlying failure message.
        message: String,
    },

    /// The render was canceled before all frames completed.
    #[error("render canceled")]
    RenderCanceled,

    /// The compositor reported a muxing failure.
    #[error("composition failed: {0}")]
    CompositionFailed(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CapsyncError {
    /// Build a [`CapsyncError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CapsyncError::MalformedTranscript`] value.
    pub fn transcript(msg: impl Into<String>) -> Self {
        Self::MalformedTranscript(msg.into())
    }

    /// Build a [`CapsyncError::FontLoad`] value.
    pub fn font(msg: impl Into<String>) -> Self {
        Self::FontLoad(msg.into())
    }

    /// Build a [`CapsyncError::RenderTask`] value for global frame `frame`.
    pub fn render_task(frame: u64, msg: impl Into<String>) -> Self {
        Self::RenderTask {
            frame,
            message: msg.into(),
        }
    }

    /// Build a [`CapsyncError::CompositionFailed`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::CompositionFailed(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
