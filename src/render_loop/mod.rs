pub mod frame_state;
pub use self::frame_state::{FrameInputs, SharedFrameState};

pub mod scheduler;
pub use self::scheduler::{LoopEvent, RenderLoopScheduler, SchedulerState, StartResult};

pub mod settings;
pub use self::settings::{LoopSettings, LoopSettingsBuilder};

pub mod stats;
pub use self::stats::LoopStats;

use crate::gpu_resources::GpuResourceSet;
use crate::graphics_backend::GraphicsBackend;
use crate::render_context::RenderContext;

/// Contexte actif et ressources GPU d'une surface, possédés ensemble par le
/// thread qui dessine.
pub struct RenderSession<B: GraphicsBackend> {
    pub context: RenderContext<B>,
    pub resources: GpuResourceSet,
}
