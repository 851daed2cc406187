//! Error types for glessink

use thiserror::Error;

/// Result type alias for glessink operations
pub type Result<T> = std::result::Result<T, Error>;

/// glessink error type
///
/// All payloads are strings so the type stays `Clone`; the frame queue
/// records the last outcome and hands copies of it to blocked submitters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Display / context errors
    #[error("No EGL display connection available: {0}")]
    DisplayUnavailable(String),

    #[error("EGL version {major}.{minor} below required minimum v{required}")]
    VersionUnsupported {
        major: i32,
        minor: i32,
        required: i32,
    },

    #[error("No matching EGL framebuffer config: {0}")]
    NoMatchingConfig(String),

    #[error("Window surface creation failed: {0}")]
    SurfaceCreationFailed(String),

    // Shader errors
    #[error("Shader build failed: {0}")]
    ShaderBuildFailed(String),

    // Render errors
    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    // Queue / lifecycle errors
    #[error("Queue is flushing")]
    Flushing,

    #[error("No window handle available and internal creation is disabled")]
    NoWindowAvailable,

    #[error("Window creation failed: {0}")]
    WindowCreationFailed(String),

    #[error("Sink not started")]
    NotStarted,

    #[error("Sink already running")]
    AlreadyRunning,

    #[error("Display connection not opened")]
    NotOpened,

    // General errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors that abort the render thread, as opposed to per-frame failures
    /// the thread can survive when reconfiguration itself succeeded.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::RenderFailed(_) | Error::Flushing)
    }
}
