use log::{debug, info, warn};

use super::particle_buffers::{BufferSlot, ParticleBuffers};
use super::particles::Particle;
use super::program::ProgramSpec;
use super::uniforms::{UniformBlock, UniformBlockKind, UniformSnapshot};
use crate::error::{BackendError, RenderError, RenderResult};
use crate::graphics_backend::{
    BufferHandle, BufferUsage, GraphicsBackend, ParticlePass, ProgramHandle, TextureHandle,
    TextureImage, UniformBinding, VertexArrayHandle,
};
use crate::utils::HumanBytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Allocated,
    Released,
}

/// Entrées de [`GpuResourceSet::allocate`].
#[derive(Debug, Clone, Copy)]
pub struct ResourceSetDescriptor<'a> {
    pub program: &'a ProgramSpec,
    pub particles: &'a [Particle],
    /// Ignorée si la spec n'active pas la texture.
    pub texture: Option<&'a TextureImage>,
    pub uniforms: &'a UniformSnapshot,
}

/// Objets GPU d'une surface : programme, uniform blocks, vertex array,
/// texture optionnelle et paire de buffers de particules.
///
/// Propriété exclusive du thread de rendu tant que la boucle tourne.
#[derive(Debug)]
pub struct GpuResourceSet {
    program: ProgramHandle,
    uniforms: Vec<UniformBinding>,
    uploaded_revisions: [u64; 4],
    vertex_array: VertexArrayHandle,
    texture: Option<TextureHandle>,
    particles: ParticleBuffers,
    particle_count: usize,
    state: ResourceState,
}

/// Handles créés pendant une allocation en cours, détruits en ordre inverse
/// si une étape échoue.
#[derive(Default)]
struct PartialAllocation {
    program: Option<ProgramHandle>,
    buffers: Vec<BufferHandle>,
    vertex_array: Option<VertexArrayHandle>,
    texture: Option<TextureHandle>,
}

impl PartialAllocation {
    fn rollback<B: GraphicsBackend>(mut self, backend: &mut B) {
        if let Some(texture) = self.texture.take() {
            backend.delete_texture(texture);
        }
        while let Some(buffer) = self.buffers.pop() {
            backend.delete_buffer(buffer);
        }
        if let Some(vertex_array) = self.vertex_array.take() {
            backend.delete_vertex_array(vertex_array);
        }
        if let Some(program) = self.program.take() {
            backend.delete_program(program);
        }
    }
}

impl GpuResourceSet {
    /// Crée toutes les sous-ressources, ou aucune.
    ///
    /// `front` reçoit l'état initial ; `back` est alloué à la même taille
    /// sans être initialisé.
    pub fn allocate<B: GraphicsBackend>(
        backend: &mut B,
        descriptor: &ResourceSetDescriptor<'_>,
    ) -> RenderResult<Self> {
        let mut partial = PartialAllocation::default();
        match Self::try_allocate(backend, descriptor, &mut partial) {
            Ok(set) => {
                info!(
                    "🎮 GPU resources ready for '{}': {} particles, double buffering {}",
                    descriptor.program.label,
                    set.particle_count,
                    if set.particles.is_double_buffered() { "on" } else { "off" }
                );
                Ok(set)
            }
            Err((stage, err)) => {
                warn!("⚠️ GPU allocation failed at {stage}: {err}, rolling back");
                partial.rollback(backend);
                Err(RenderError::ResourceAllocationFailed(format!("{stage}: {err}")))
            }
        }
    }

    fn try_allocate<B: GraphicsBackend>(
        backend: &mut B,
        descriptor: &ResourceSetDescriptor<'_>,
        partial: &mut PartialAllocation,
    ) -> Result<Self, (&'static str, BackendError)> {
        let spec = descriptor.program;
        let features = spec.features;

        let program = backend
            .compile_program(spec)
            .map_err(|e| ("program", e))?;
        partial.program = Some(program);

        let mut uniforms = Vec::new();
        if features.uniform_blocks {
            for kind in UniformBlockKind::ALL {
                let block = descriptor.uniforms.values.get(kind);
                let buffer = backend
                    .allocate_buffer(BufferUsage::Uniform, kind.size_bytes(), Some(block.as_bytes()))
                    .map_err(|e| ("uniform buffer", e))?;
                partial.buffers.push(buffer);
                backend
                    .bind_uniform_block(program, kind.block_name(), kind.binding_point(), buffer)
                    .map_err(|e| ("uniform binding", e))?;
                uniforms.push(UniformBinding {
                    block_name: kind.block_name(),
                    binding_point: kind.binding_point(),
                    buffer,
                });
            }
        }

        let vertex_array = backend
            .create_vertex_array(&Particle::layout())
            .map_err(|e| ("vertex array", e))?;
        partial.vertex_array = Some(vertex_array);

        let texture = match (features.texture, descriptor.texture) {
            (true, Some(image)) => {
                let texture = backend
                    .upload_texture(image)
                    .map_err(|e| ("texture", e))?;
                partial.texture = Some(texture);
                Some(texture)
            }
            (true, None) => {
                return Err((
                    "texture",
                    BackendError::Other("texture enabled but no image supplied".into()),
                ))
            }
            (false, _) => None,
        };

        let bytes: &[u8] = bytemuck::cast_slice(descriptor.particles);
        debug!(
            "Allocating particle state: {} x 2 ({} particles)",
            bytes.len().human_bytes(),
            descriptor.particles.len()
        );
        let front = backend
            .allocate_buffer(BufferUsage::ParticleState, bytes.len(), Some(bytes))
            .map_err(|e| ("front particle buffer", e))?;
        partial.buffers.push(front);

        let back = if spec.uses_transform_feedback() {
            let back = backend
                .allocate_buffer(BufferUsage::ParticleState, bytes.len(), None)
                .map_err(|e| ("back particle buffer", e))?;
            partial.buffers.push(back);
            Some(back)
        } else {
            None
        };

        Ok(Self {
            program,
            uniforms,
            uploaded_revisions: descriptor.uniforms.revisions,
            vertex_array,
            texture,
            particles: ParticleBuffers::new(front, back),
            particle_count: descriptor.particles.len(),
            state: ResourceState::Allocated,
        })
    }

    /// Réécrit entièrement le buffer d'un bloc.
    pub fn update_uniform<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        block: &UniformBlock,
        revision: u64,
    ) -> Result<(), BackendError> {
        let kind = block.kind();
        let Some(binding) = self.uniforms.iter().find(|b| b.block_name == kind.block_name())
        else {
            return Ok(());
        };
        backend.write_buffer(binding.buffer, block.as_bytes())?;
        self.uploaded_revisions[kind.index()] = revision;
        Ok(())
    }

    /// Envoie les blocs dont la révision a changé depuis le dernier upload.
    pub fn sync_uniforms<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        snapshot: &UniformSnapshot,
    ) -> Result<usize, BackendError> {
        if self.uniforms.is_empty() {
            return Ok(0);
        }
        let mut uploaded = 0;
        for kind in UniformBlockKind::ALL {
            let revision = snapshot.revision(kind);
            if revision != self.uploaded_revisions[kind.index()] {
                self.update_uniform(backend, &snapshot.values.get(kind), revision)?;
                uploaded += 1;
            }
        }
        Ok(uploaded)
    }

    /// Passe de rendu lisant le buffer actif et écrivant la cible.
    pub fn particle_pass(&self, delta_seconds: f32, clear_color: [f32; 4]) -> ParticlePass<'_> {
        ParticlePass {
            program: self.program,
            vertex_array: self.vertex_array,
            source: self.particles.active(),
            target: self.particles.write_target(),
            particle_count: self.particle_count,
            uniforms: &self.uniforms,
            texture: self.texture,
            delta_seconds,
            clear_color,
        }
    }

    pub(crate) fn swap(&mut self) -> bool {
        self.particles.swap()
    }

    pub fn swap_count(&self) -> u64 {
        self.particles.swap_count()
    }

    pub fn active_slot(&self) -> BufferSlot {
        self.particles.active_slot()
    }

    pub fn active_buffer(&self) -> BufferHandle {
        self.particles.active()
    }

    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Détruit tous les objets GPU. Sans effet si déjà libéré.
    pub fn release<B: GraphicsBackend>(&mut self, backend: &mut B) {
        if self.state == ResourceState::Released {
            return;
        }
        if let Some(texture) = self.texture.take() {
            backend.delete_texture(texture);
        }
        for buffer in self.particles.handles() {
            backend.delete_buffer(buffer);
        }
        for binding in self.uniforms.drain(..) {
            backend.delete_buffer(binding.buffer);
        }
        backend.delete_vertex_array(self.vertex_array);
        backend.delete_program(self.program);
        self.state = ResourceState::Released;
        info!("🧹 GPU resources released ({} swaps)", self.swap_count());
    }
}

impl Drop for GpuResourceSet {
    fn drop(&mut self) {
        if self.state == ResourceState::Allocated {
            warn!("GpuResourceSet dropped while allocated: GPU handles leaked");
        }
    }
}
