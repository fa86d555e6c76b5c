pub mod r#trait;
pub use r#trait::GraphicsBackend;

pub mod types;
pub use self::types::{
    BufferHandle, BufferUsage, Dimensions, ParticlePass, PresentOutcome, ProgramHandle,
    TextureHandle, TextureImage, UniformBinding, VertexArrayHandle, VertexAttribute, VertexLayout,
};

pub mod gl_backend;
pub use self::gl_backend::{GlBackend, GlfwSurface};

pub mod tools;

#[cfg(any(test, feature = "test_helpers"))]
pub mod headless;
#[cfg(any(test, feature = "test_helpers"))]
pub use self::headless::{BackendCall, FaultPlan, HeadlessBackend, HeadlessProbe, HeadlessSurface};
