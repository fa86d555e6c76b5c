//! Backend sans GPU : émule le transform feedback sur CPU, journalise chaque
//! appel avec le thread qui l'a émis et permet d'injecter des pannes.
//!
//! L'affinité de thread est vérifiée comme le ferait un vrai driver : tout
//! appel émis depuis un thread où le contexte n'est pas courant est compté
//! comme violation.

use bytemuck::Pod;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use super::r#trait::GraphicsBackend;
use super::types::{
    BufferHandle, BufferUsage, Dimensions, ParticlePass, PresentOutcome, ProgramHandle,
    TextureHandle, TextureImage, VertexArrayHandle, VertexLayout,
};
use crate::error::{BackendError, RenderError};
use crate::gpu_resources::uniforms::{projection_aspect, TransformBlock, UniformBlockKind};
use crate::gpu_resources::{Particle, ProgramSpec};

/// Jeton de surface factice.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    id: u64,
    bindable: bool,
}

impl HeadlessSurface {
    pub fn new(id: u64) -> Self {
        Self { id, bindable: true }
    }

    /// Surface que le backend refuse de lier.
    pub fn unbindable(id: u64) -> Self {
        Self {
            id,
            bindable: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Pannes à injecter. Les numéros de frame commencent à 1.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    pub fail_context_creation: bool,
    pub fail_program_compile: bool,
    /// N-ième appel à `allocate_buffer` en échec.
    pub fail_buffer_allocation: Option<usize>,
    pub fail_texture_upload: bool,
    pub failing_draws: Vec<u64>,
    pub transient_presents: Vec<u64>,
    pub lose_context_on_draw: Option<u64>,
    pub lose_context_on_present: Option<u64>,
    /// Panique dans le N-ième draw, comme un driver qui crashe.
    pub panic_on_draw: Option<u64>,
    /// Durée artificielle de chaque draw.
    pub draw_delay: Option<Duration>,
}

/// Ce que le backend a vu au moment d'un draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub frame: u64,
    pub source: BufferHandle,
    pub target: Option<BufferHandle>,
    pub viewport: Dimensions,
    pub projection: [[f32; 4]; 4],
    pub particle_count: usize,
    pub delta_seconds: f32,
}

impl DrawRecord {
    pub fn projection_aspect(&self) -> f32 {
        projection_aspect(&self.projection)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateContext { surface: u64 },
    MakeCurrent,
    ReleaseCurrent,
    SetViewport(Dimensions),
    CompileProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    AllocateBuffer {
        buffer: BufferHandle,
        usage: BufferUsage,
        size: usize,
    },
    WriteBuffer(BufferHandle),
    DeleteBuffer(BufferHandle),
    BindUniformBlock { block: String, binding_point: u32 },
    CreateVertexArray(VertexArrayHandle),
    DeleteVertexArray(VertexArrayHandle),
    UploadTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    Draw(DrawRecord),
    Present(PresentOutcome),
    DestroyContext,
}

impl BackendCall {
    pub fn is_draw(&self) -> bool {
        matches!(self, BackendCall::Draw(_))
    }

    pub fn is_present(&self) -> bool {
        matches!(self, BackendCall::Present(_))
    }

    /// Appel de destruction (ressource ou contexte).
    pub fn is_teardown(&self) -> bool {
        matches!(
            self,
            BackendCall::DeleteProgram(_)
                | BackendCall::DeleteBuffer(_)
                | BackendCall::DeleteVertexArray(_)
                | BackendCall::DeleteTexture(_)
                | BackendCall::DestroyContext
        )
    }
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub thread: ThreadId,
    pub call: BackendCall,
}

/// Nombre d'objets GPU encore vivants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveHandles {
    pub programs: usize,
    pub buffers: usize,
    pub vertex_arrays: usize,
    pub textures: usize,
}

impl LiveHandles {
    pub fn total(&self) -> usize {
        self.programs + self.buffers + self.vertex_arrays + self.textures
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    journal: Vec<JournalEntry>,
    next_handle: u32,
    programs: HashSet<u32>,
    buffers: HashMap<u32, Vec<u8>>,
    vertex_arrays: HashSet<u32>,
    textures: HashSet<u32>,
    context_alive: bool,
    lost: bool,
    current: Option<ThreadId>,
    viewport: Dimensions,
    allocations: usize,
    draws: u64,
    presents: u64,
    violations: Vec<String>,
}

impl HeadlessState {
    fn record(&mut self, call: BackendCall) {
        self.journal.push(JournalEntry {
            thread: thread::current().id(),
            call,
        });
    }

    fn next_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_current(&mut self, op: &str) -> Result<(), BackendError> {
        if !self.context_alive {
            self.violations.push(format!("{op} without a live context"));
            return Err(BackendError::NotCurrent);
        }
        if self.current != Some(thread::current().id()) {
            self.violations
                .push(format!("{op} from a thread where the context is not current"));
            return Err(BackendError::NotCurrent);
        }
        Ok(())
    }
}

pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
    faults: FaultPlan,
}

/// Vue partagée sur l'état du backend, utilisable après que le backend a
/// été déplacé dans le contrôleur ou le thread de rendu.
#[derive(Clone)]
pub struct HeadlessProbe {
    state: Arc<Mutex<HeadlessState>>,
}

fn lock(state: &Mutex<HeadlessState>) -> MutexGuard<'_, HeadlessState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HeadlessBackend {
    pub fn new(faults: FaultPlan) -> (Self, HeadlessProbe) {
        let state = Arc::new(Mutex::new(HeadlessState::default()));
        (
            Self {
                state: Arc::clone(&state),
                faults,
            },
            HeadlessProbe { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        lock(&self.state)
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Surface = HeadlessSurface;

    fn create_context(
        &mut self,
        surface: &mut HeadlessSurface,
        size: Dimensions,
    ) -> Result<(), RenderError> {
        let mut state = self.state();
        state.record(BackendCall::CreateContext {
            surface: surface.id,
        });
        if self.faults.fail_context_creation {
            return Err(RenderError::ContextCreationFailed(
                "injected context creation failure".into(),
            ));
        }
        if !surface.bindable {
            return Err(RenderError::SurfaceBindFailed(format!(
                "surface {} cannot be bound",
                surface.id
            )));
        }
        if let Some(owner) = state.current {
            if owner != thread::current().id() {
                state
                    .violations
                    .push("create_context while another thread holds a context".into());
            }
        }
        state.context_alive = true;
        state.lost = false;
        state.current = Some(thread::current().id());
        state.viewport = size;
        debug!("[headless] context created on surface {}", surface.id);
        Ok(())
    }

    fn make_current(&mut self, _surface: &mut HeadlessSurface) -> Result<(), BackendError> {
        let mut state = self.state();
        state.record(BackendCall::MakeCurrent);
        if !state.context_alive {
            return Err(BackendError::ContextLost);
        }
        let me = thread::current().id();
        match state.current {
            Some(owner) if owner != me => {
                state
                    .violations
                    .push("make_current while current on another thread".into());
                Err(BackendError::NotCurrent)
            }
            _ => {
                state.current = Some(me);
                Ok(())
            }
        }
    }

    fn release_current(&mut self, _surface: &mut HeadlessSurface) {
        let mut state = self.state();
        state.record(BackendCall::ReleaseCurrent);
        if state.current == Some(thread::current().id()) {
            state.current = None;
        }
    }

    fn set_viewport(&mut self, size: Dimensions) {
        let mut state = self.state();
        state.record(BackendCall::SetViewport(size));
        if state.check_current("set_viewport").is_ok() {
            state.viewport = size;
        }
    }

    fn compile_program(&mut self, spec: &ProgramSpec) -> Result<ProgramHandle, BackendError> {
        let mut state = self.state();
        state.check_current("compile_program")?;
        if self.faults.fail_program_compile {
            return Err(BackendError::ShaderCompile(format!(
                "injected failure compiling '{}'",
                spec.label
            )));
        }
        let handle = state.next_handle();
        state.programs.insert(handle);
        state.record(BackendCall::CompileProgram(ProgramHandle(handle)));
        Ok(ProgramHandle(handle))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        let mut state = self.state();
        let _ = state.check_current("delete_program");
        state.programs.remove(&program.0);
        state.record(BackendCall::DeleteProgram(program));
    }

    fn allocate_buffer(
        &mut self,
        usage: BufferUsage,
        size_bytes: usize,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError> {
        let mut state = self.state();
        state.check_current("allocate_buffer")?;
        state.allocations += 1;
        if self.faults.fail_buffer_allocation == Some(state.allocations) {
            return Err(BackendError::OutOfMemory(size_bytes));
        }
        let mut contents = vec![0u8; size_bytes];
        if let Some(data) = initial {
            let n = data.len().min(size_bytes);
            contents[..n].copy_from_slice(&data[..n]);
        }
        let handle = state.next_handle();
        state.buffers.insert(handle, contents);
        let buffer = BufferHandle(handle);
        state.record(BackendCall::AllocateBuffer {
            buffer,
            usage,
            size: size_bytes,
        });
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError> {
        let mut state = self.state();
        state.check_current("write_buffer")?;
        let contents = state
            .buffers
            .get_mut(&buffer.0)
            .ok_or(BackendError::UnknownHandle(buffer.0))?;
        if data.len() > contents.len() {
            return Err(BackendError::Other(format!(
                "write of {} bytes overflows buffer {}",
                data.len(),
                buffer.0
            )));
        }
        contents[..data.len()].copy_from_slice(data);
        state.record(BackendCall::WriteBuffer(buffer));
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        let mut state = self.state();
        let _ = state.check_current("delete_buffer");
        state.buffers.remove(&buffer.0);
        state.record(BackendCall::DeleteBuffer(buffer));
    }

    fn bind_uniform_block(
        &mut self,
        program: ProgramHandle,
        block_name: &str,
        binding_point: u32,
        buffer: BufferHandle,
    ) -> Result<(), BackendError> {
        let mut state = self.state();
        state.check_current("bind_uniform_block")?;
        if !state.programs.contains(&program.0) {
            return Err(BackendError::UnknownHandle(program.0));
        }
        if !state.buffers.contains_key(&buffer.0) {
            return Err(BackendError::UnknownHandle(buffer.0));
        }
        state.record(BackendCall::BindUniformBlock {
            block: block_name.to_string(),
            binding_point,
        });
        Ok(())
    }

    fn create_vertex_array(
        &mut self,
        layout: &VertexLayout,
    ) -> Result<VertexArrayHandle, BackendError> {
        let mut state = self.state();
        state.check_current("create_vertex_array")?;
        if layout.stride == 0 || layout.attributes.is_empty() {
            return Err(BackendError::Other("empty vertex layout".into()));
        }
        let handle = state.next_handle();
        state.vertex_arrays.insert(handle);
        state.record(BackendCall::CreateVertexArray(VertexArrayHandle(handle)));
        Ok(VertexArrayHandle(handle))
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        let mut state = self.state();
        let _ = state.check_current("delete_vertex_array");
        state.vertex_arrays.remove(&vertex_array.0);
        state.record(BackendCall::DeleteVertexArray(vertex_array));
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, BackendError> {
        let mut state = self.state();
        state.check_current("upload_texture")?;
        if self.faults.fail_texture_upload {
            return Err(BackendError::Other("injected texture upload failure".into()));
        }
        if image.pixels.len() != image.width as usize * image.height as usize * 4 {
            return Err(BackendError::Other("texture payload is not RGBA8".into()));
        }
        let handle = state.next_handle();
        state.textures.insert(handle);
        state.record(BackendCall::UploadTexture(TextureHandle(handle)));
        Ok(TextureHandle(handle))
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        let mut state = self.state();
        let _ = state.check_current("delete_texture");
        state.textures.remove(&texture.0);
        state.record(BackendCall::DeleteTexture(texture));
    }

    fn draw(&mut self, pass: &ParticlePass<'_>) -> Result<(), BackendError> {
        if let Some(delay) = self.faults.draw_delay {
            thread::sleep(delay);
        }

        let mut state = self.state();
        state.check_current("draw")?;
        state.draws += 1;
        let frame = state.draws;
        if self.faults.panic_on_draw == Some(frame) {
            drop(state);
            panic!("[headless] injected panic on draw {frame}");
        }

        let transform = pass
            .uniforms
            .iter()
            .find(|b| b.block_name == UniformBlockKind::Transform.block_name())
            .and_then(|b| state.buffers.get(&b.buffer.0))
            .map(|bytes| {
                bytemuck::pod_read_unaligned::<TransformBlock>(
                    &bytes[..std::mem::size_of::<TransformBlock>()],
                )
            })
            .unwrap_or_default();

        let record = DrawRecord {
            frame,
            source: pass.source,
            target: pass.target,
            viewport: state.viewport,
            projection: transform.projection,
            particle_count: pass.particle_count,
            delta_seconds: pass.delta_seconds,
        };
        state.record(BackendCall::Draw(record));

        if self.faults.lose_context_on_draw == Some(frame) {
            warn!("[headless] injected context loss on draw {frame}");
            state.lost = true;
        }
        if state.lost {
            return Err(BackendError::ContextLost);
        }
        if self.faults.failing_draws.contains(&frame) {
            return Err(BackendError::Other(format!("injected draw failure on frame {frame}")));
        }

        if Some(pass.source) == pass.target {
            state
                .violations
                .push(format!("frame {frame} reads and writes buffer {}", pass.source.0));
            return Err(BackendError::Other("source and target alias".into()));
        }

        let source = read_pod::<Particle>(&state.buffers, pass.source)?;
        if source.len() < pass.particle_count {
            return Err(BackendError::Other("source buffer too small".into()));
        }

        if let Some(target) = pass.target {
            let next: Vec<Particle> = source[..pass.particle_count]
                .iter()
                .map(|p| p.step(pass.delta_seconds))
                .collect();
            let out = state
                .buffers
                .get_mut(&target.0)
                .ok_or(BackendError::UnknownHandle(target.0))?;
            let bytes: &[u8] = bytemuck::cast_slice(&next);
            if bytes.len() > out.len() {
                return Err(BackendError::Other("target buffer too small".into()));
            }
            out[..bytes.len()].copy_from_slice(bytes);
        }
        Ok(())
    }

    fn present(&mut self, _surface: &mut HeadlessSurface) -> PresentOutcome {
        let mut state = self.state();
        if state.check_current("present").is_err() {
            let outcome = PresentOutcome::Transient("context not current".into());
            state.record(BackendCall::Present(outcome.clone()));
            return outcome;
        }
        state.presents += 1;
        let frame = state.presents;

        if self.faults.lose_context_on_present == Some(frame) {
            warn!("[headless] injected surface loss on present {frame}");
            state.lost = true;
        }
        let outcome = if state.lost {
            PresentOutcome::SurfaceLost
        } else if self.faults.transient_presents.contains(&frame) {
            PresentOutcome::Transient(format!("injected transient failure on present {frame}"))
        } else {
            PresentOutcome::Presented
        };
        state.record(BackendCall::Present(outcome.clone()));
        outcome
    }

    fn destroy_context(&mut self, _surface: &mut HeadlessSurface) {
        let mut state = self.state();
        let _ = state.check_current("destroy_context");
        state.context_alive = false;
        state.current = None;
        state.record(BackendCall::DestroyContext);
    }
}

fn read_pod<T: Pod>(
    buffers: &HashMap<u32, Vec<u8>>,
    buffer: BufferHandle,
) -> Result<Vec<T>, BackendError> {
    let bytes = buffers
        .get(&buffer.0)
        .ok_or(BackendError::UnknownHandle(buffer.0))?;
    Ok(bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect())
}

impl HeadlessProbe {
    pub fn journal(&self) -> Vec<JournalEntry> {
        lock(&self.state).journal.clone()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.state)
            .journal
            .iter()
            .map(|entry| entry.call.clone())
            .collect()
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        lock(&self.state)
            .journal
            .iter()
            .filter_map(|entry| match &entry.call {
                BackendCall::Draw(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> u64 {
        lock(&self.state).draws
    }

    pub fn present_count(&self) -> u64 {
        lock(&self.state).presents
    }

    pub fn viewport(&self) -> Dimensions {
        lock(&self.state).viewport
    }

    pub fn context_alive(&self) -> bool {
        lock(&self.state).context_alive
    }

    pub fn live_handles(&self) -> LiveHandles {
        let state = lock(&self.state);
        LiveHandles {
            programs: state.programs.len(),
            buffers: state.buffers.len(),
            vertex_arrays: state.vertex_arrays.len(),
            textures: state.textures.len(),
        }
    }

    pub fn violations(&self) -> Vec<String> {
        lock(&self.state).violations.clone()
    }

    /// Contenu d'un buffer encore vivant, réinterprété en `T`.
    pub fn buffer_contents<T: Pod>(&self, buffer: BufferHandle) -> Option<Vec<T>> {
        read_pod(&lock(&self.state).buffers, buffer).ok()
    }
}
