use super::types::{
    BufferHandle, BufferUsage, Dimensions, ParticlePass, PresentOutcome, ProgramHandle,
    TextureHandle, TextureImage, VertexArrayHandle, VertexLayout,
};
use crate::error::{BackendError, RenderError};
use crate::gpu_resources::ProgramSpec;

/// Capacité de rendu utilisée par le cœur.
///
/// Le cœur ne dépend que de l'ordre et de l'affinité de thread des appels :
/// un backend ne reçoit des appels que du thread sur lequel son contexte est
/// courant (`make_current`). Le backend est déplacé dans le thread de rendu
/// pendant que la boucle tourne, d'où la contrainte `Send`.
pub trait GraphicsBackend: Send + 'static {
    /// Jeton de surface prêté par la couche fenêtrage.
    type Surface: Send + 'static;

    /// Crée le contexte et le lie à la surface. Le contexte est courant sur
    /// le thread appelant en cas de succès.
    ///
    /// Doit distinguer `ContextCreationFailed` de `SurfaceBindFailed`.
    fn create_context(
        &mut self,
        surface: &mut Self::Surface,
        size: Dimensions,
    ) -> Result<(), RenderError>;

    fn make_current(&mut self, surface: &mut Self::Surface) -> Result<(), BackendError>;

    fn release_current(&mut self, surface: &mut Self::Surface);

    fn set_viewport(&mut self, size: Dimensions);

    fn compile_program(&mut self, spec: &ProgramSpec) -> Result<ProgramHandle, BackendError>;

    fn delete_program(&mut self, program: ProgramHandle);

    /// Alloue `size_bytes` octets, initialisés avec `initial` s'il est fourni.
    fn allocate_buffer(
        &mut self,
        usage: BufferUsage,
        size_bytes: usize,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError>;

    /// Remplace le contenu du buffer à partir de l'offset 0.
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError>;

    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn bind_uniform_block(
        &mut self,
        program: ProgramHandle,
        block_name: &str,
        binding_point: u32,
        buffer: BufferHandle,
    ) -> Result<(), BackendError>;

    fn create_vertex_array(
        &mut self,
        layout: &VertexLayout,
    ) -> Result<VertexArrayHandle, BackendError>;

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, BackendError>;

    fn delete_texture(&mut self, texture: TextureHandle);

    /// Dessine une frame : simule `source` vers `target` et rend les points.
    fn draw(&mut self, pass: &ParticlePass<'_>) -> Result<(), BackendError>;

    fn present(&mut self, surface: &mut Self::Surface) -> PresentOutcome;

    /// Libère le contexte. Appelé une seule fois, aucune frame en vol.
    fn destroy_context(&mut self, surface: &mut Self::Surface);
}
