//! Logique d'une frame, sans état propre : tout vit dans le
//! [`GpuResourceSet`] et dans les [`FrameInputs`] de la frame.

use log::trace;

use crate::error::{BackendError, RenderError, RenderResult};
use crate::gpu_resources::GpuResourceSet;
use crate::graphics_backend::GraphicsBackend;
use crate::render_loop::FrameInputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub uniforms_uploaded: usize,
    pub particle_count: usize,
    pub simulated: bool,
}

pub struct FrameRenderer;

impl FrameRenderer {
    /// Envoie les uniform blocks modifiés puis dessine : lecture du buffer
    /// actif, écriture de l'état suivant dans le buffer cible.
    ///
    /// Une perte de contexte est rapportée en `ContextLost`, toute autre
    /// erreur en `FrameDrawFailed`.
    pub fn draw<B: GraphicsBackend>(
        backend: &mut B,
        resources: &mut GpuResourceSet,
        inputs: &FrameInputs,
        delta_seconds: f32,
        clear_color: [f32; 4],
    ) -> RenderResult<FrameReport> {
        let uniforms_uploaded = resources
            .sync_uniforms(backend, &inputs.uniforms)
            .map_err(classify)?;

        let pass = resources.particle_pass(delta_seconds, clear_color);
        trace!(
            "draw: source {:?} -> target {:?} ({} particles, dt {:.4})",
            pass.source,
            pass.target,
            pass.particle_count,
            delta_seconds
        );
        backend.draw(&pass).map_err(classify)?;

        Ok(FrameReport {
            uniforms_uploaded,
            particle_count: pass.particle_count,
            simulated: pass.target.is_some(),
        })
    }
}

fn classify(err: BackendError) -> RenderError {
    match err {
        BackendError::ContextLost => RenderError::ContextLost("lost during draw".into()),
        other => RenderError::FrameDrawFailed(other.to_string()),
    }
}
