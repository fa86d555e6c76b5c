// Erreurs
pub mod error;
pub use error::{BackendError, RenderError, RenderResult};

// Backend graphique (OpenGL + backend headless pour les tests)
pub mod graphics_backend;
pub use graphics_backend::{Dimensions, GraphicsBackend};

// Ressources GPU d'une surface
pub mod gpu_resources;
pub use gpu_resources::GpuResourceSet;

pub mod render_context;
pub use render_context::RenderContext;

pub mod frame_renderer;

// Thread de rendu
pub mod render_loop;
pub use render_loop::{LoopSettings, LoopSettingsBuilder, RenderLoopScheduler};

// Cycle de vie des surfaces
pub mod surface_lifecycle;
pub use surface_lifecycle::{SurfaceCallbacks, SurfaceEvent, SurfaceLifecycleController};

pub mod config;
pub use config::SceneConfig;

// Utilities
pub mod utils;

pub mod window_engine;
