//! Typed errors shared by the lifecycle controller, the render loop and the
//! GPU resource layer.

use thiserror::Error;

/// Failures reported by a [`GraphicsBackend`](crate::graphics_backend::GraphicsBackend)
/// call. They are mapped into [`RenderError`] by the layer that issued the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("program link failed: {0}")]
    ProgramLink(String),

    #[error("out of GPU memory while allocating {0} bytes")]
    OutOfMemory(usize),

    #[error("unknown GPU handle {0}")]
    UnknownHandle(u32),

    #[error("graphics context is not current on this thread")]
    NotCurrent,

    #[error("graphics context lost")]
    ContextLost,

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the lifecycle controller and the render loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The backend could not create a context. May be retried once other
    /// contexts have been released.
    #[error("graphics context creation failed: {0}")]
    ContextCreationFailed(String),

    /// The surface handle could not be bound. Retrying with the same
    /// handle will not help.
    #[error("surface bind failed: {0}")]
    SurfaceBindFailed(String),

    #[error("GPU resource allocation failed: {0}")]
    ResourceAllocationFailed(String),

    #[error("graphics context lost: {0}")]
    ContextLost(String),

    #[error("invalid lifecycle sequence: `{operation}` while {state}")]
    InvalidSequence {
        operation: &'static str,
        state: &'static str,
    },

    #[error("frame draw failed: {0}")]
    FrameDrawFailed(String),

    #[error("render loop already running")]
    AlreadyRunning,

    #[error("render thread failure: {0}")]
    RenderThread(String),
}

impl RenderError {
    pub fn invalid_sequence(operation: &'static str, state: &'static str) -> Self {
        RenderError::InvalidSequence { operation, state }
    }

    /// Only a context creation failure is worth retrying on the same surface.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RenderError::ContextCreationFailed(_))
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
