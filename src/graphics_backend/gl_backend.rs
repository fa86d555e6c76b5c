use gl::types::*;
use glfw::Context;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;

use super::r#trait::GraphicsBackend;
use super::tools::{check_gl_error, compile_program, setup_opengl_debug, show_opengl_context_info};
use super::types::{
    BufferHandle, BufferUsage, Dimensions, ParticlePass, PresentOutcome, ProgramHandle,
    TextureHandle, TextureImage, VertexArrayHandle, VertexLayout,
};
use crate::cstr;
use crate::error::{BackendError, RenderError};
use crate::gpu_resources::ProgramSpec;
use crate::utils::HumanBytes;

/// Contexte de rendu GLFW détaché de sa fenêtre, transférable au thread de
/// rendu. Les pointeurs de fonctions GL doivent avoir été chargés par la
/// couche fenêtrage.
pub struct GlfwSurface {
    context: glfw::PRenderContext,
}

impl GlfwSurface {
    pub fn new(context: glfw::PRenderContext) -> Self {
        Self { context }
    }
}

/// Backend OpenGL 3.3 core.
#[derive(Default)]
pub struct GlBackend {
    // Layout par VAO, réappliqué à chaque draw sur le buffer source du ping-pong
    layouts: HashMap<GLuint, VertexLayout>,
}

impl GlBackend {
    pub fn new() -> Self {
        Self::default()
    }

    unsafe fn apply_layout(&self, vertex_array: GLuint) {
        let Some(layout) = self.layouts.get(&vertex_array) else {
            return;
        };
        for attribute in &layout.attributes {
            gl::VertexAttribPointer(
                attribute.location,
                attribute.components,
                gl::FLOAT,
                gl::FALSE,
                layout.stride as GLsizei,
                attribute.offset as *const c_void,
            );
        }
    }
}

fn buffer_target(usage: BufferUsage) -> (GLenum, GLenum) {
    match usage {
        BufferUsage::ParticleState => (gl::ARRAY_BUFFER, gl::DYNAMIC_COPY),
        BufferUsage::Uniform => (gl::UNIFORM_BUFFER, gl::DYNAMIC_DRAW),
    }
}

impl GraphicsBackend for GlBackend {
    type Surface = GlfwSurface;

    fn create_context(
        &mut self,
        surface: &mut GlfwSurface,
        size: Dimensions,
    ) -> Result<(), RenderError> {
        surface.context.make_current();
        if !surface.context.is_current() {
            return Err(RenderError::SurfaceBindFailed(
                "render context could not be made current".into(),
            ));
        }
        if !gl::GetString::is_loaded() {
            return Err(RenderError::ContextCreationFailed(
                "OpenGL function pointers are not loaded".into(),
            ));
        }
        unsafe {
            if gl::GetString(gl::VERSION).is_null() {
                return Err(RenderError::ContextCreationFailed(
                    "no usable OpenGL context on this surface".into(),
                ));
            }
            show_opengl_context_info();
            setup_opengl_debug();
            gl::Enable(gl::PROGRAM_POINT_SIZE);
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
            gl::Viewport(0, 0, size.width as GLsizei, size.height as GLsizei);
        }
        Ok(())
    }

    fn make_current(&mut self, surface: &mut GlfwSurface) -> Result<(), BackendError> {
        surface.context.make_current();
        if surface.context.is_current() {
            Ok(())
        } else {
            Err(BackendError::NotCurrent)
        }
    }

    fn release_current(&mut self, _surface: &mut GlfwSurface) {
        glfw::make_context_current(None);
    }

    fn set_viewport(&mut self, size: Dimensions) {
        unsafe {
            gl::Viewport(0, 0, size.width as GLsizei, size.height as GLsizei);
        }
    }

    fn compile_program(&mut self, spec: &ProgramSpec) -> Result<ProgramHandle, BackendError> {
        let program = unsafe {
            compile_program(
                &spec.vertex_source,
                &spec.fragment_source,
                &spec.feedback_varyings,
            )?
        };
        info!("🎨 Program '{}' linked (id {})", spec.label, program);
        Ok(ProgramHandle(program))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if program.0 != 0 {
            unsafe { gl::DeleteProgram(program.0) };
        }
    }

    fn allocate_buffer(
        &mut self,
        usage: BufferUsage,
        size_bytes: usize,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError> {
        let (target, hint) = buffer_target(usage);
        let data = initial.map_or(ptr::null(), |d| d.as_ptr() as *const c_void);
        let mut buffer = 0;
        unsafe {
            gl::GenBuffers(1, &mut buffer);
            gl::BindBuffer(target, buffer);
            gl::BufferData(target, size_bytes as GLsizeiptr, data, hint);
            gl::BindBuffer(target, 0);
            if let Err(err) = check_gl_error("allocate_buffer") {
                gl::DeleteBuffers(1, &buffer);
                return Err(match err {
                    BackendError::OutOfMemory(_) => BackendError::OutOfMemory(size_bytes),
                    other => other,
                });
            }
        }
        debug!(
            "🎮 Allocated {:?} buffer {} ({})",
            usage,
            buffer,
            size_bytes.human_bytes()
        );
        Ok(BufferHandle(buffer))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError> {
        unsafe {
            gl::BindBuffer(gl::COPY_WRITE_BUFFER, buffer.0);
            gl::BufferSubData(
                gl::COPY_WRITE_BUFFER,
                0,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const c_void,
            );
            gl::BindBuffer(gl::COPY_WRITE_BUFFER, 0);
            check_gl_error("write_buffer")
        }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if buffer.0 != 0 {
            unsafe { gl::DeleteBuffers(1, &buffer.0) };
        }
    }

    fn bind_uniform_block(
        &mut self,
        program: ProgramHandle,
        block_name: &str,
        binding_point: u32,
        buffer: BufferHandle,
    ) -> Result<(), BackendError> {
        let name = CString::new(block_name).map_err(|e| BackendError::Other(e.to_string()))?;
        unsafe {
            let index = gl::GetUniformBlockIndex(program.0, name.as_ptr());
            if index == gl::INVALID_INDEX {
                // Bloc non utilisé par ce programme (éliminé par le compilateur)
                debug!("Uniform block '{}' inactive in program {}", block_name, program.0);
                return Ok(());
            }
            gl::UniformBlockBinding(program.0, index, binding_point);
            gl::BindBufferBase(gl::UNIFORM_BUFFER, binding_point, buffer.0);
            check_gl_error("bind_uniform_block")
        }
    }

    fn create_vertex_array(
        &mut self,
        layout: &VertexLayout,
    ) -> Result<VertexArrayHandle, BackendError> {
        let mut vao = 0;
        unsafe {
            gl::GenVertexArrays(1, &mut vao);
            gl::BindVertexArray(vao);
            for attribute in &layout.attributes {
                gl::EnableVertexAttribArray(attribute.location);
            }
            gl::BindVertexArray(0);
            check_gl_error("create_vertex_array")?;
        }
        self.layouts.insert(vao, layout.clone());
        Ok(VertexArrayHandle(vao))
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.layouts.remove(&vertex_array.0);
        if vertex_array.0 != 0 {
            unsafe { gl::DeleteVertexArrays(1, &vertex_array.0) };
        }
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, BackendError> {
        let mut texture = 0;
        unsafe {
            gl::GenTextures(1, &mut texture);
            gl::BindTexture(gl::TEXTURE_2D, texture);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as GLint,
                image.width as GLsizei,
                image.height as GLsizei,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                image.pixels.as_ptr() as *const c_void,
            );
            gl::BindTexture(gl::TEXTURE_2D, 0);
            if let Err(err) = check_gl_error("upload_texture") {
                gl::DeleteTextures(1, &texture);
                return Err(err);
            }
        }
        debug!(
            "Texture {} uploaded ({}x{}, {})",
            texture,
            image.width,
            image.height,
            image.byte_len().human_bytes()
        );
        Ok(TextureHandle(texture))
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if texture.0 != 0 {
            unsafe { gl::DeleteTextures(1, &texture.0) };
        }
    }

    fn draw(&mut self, pass: &ParticlePass<'_>) -> Result<(), BackendError> {
        let [r, g, b, a] = pass.clear_color;
        unsafe {
            gl::ClearColor(r, g, b, a);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);

            gl::UseProgram(pass.program.0);
            for binding in pass.uniforms {
                gl::BindBufferBase(gl::UNIFORM_BUFFER, binding.binding_point, binding.buffer.0);
            }

            let dt_location = gl::GetUniformLocation(pass.program.0, cstr!("uDeltaTime"));
            if dt_location >= 0 {
                gl::Uniform1f(dt_location, pass.delta_seconds);
            }

            if let Some(texture) = pass.texture {
                gl::ActiveTexture(gl::TEXTURE0);
                gl::BindTexture(gl::TEXTURE_2D, texture.0);
                let sampler = gl::GetUniformLocation(pass.program.0, cstr!("uSprite"));
                if sampler >= 0 {
                    gl::Uniform1i(sampler, 0);
                }
            }

            gl::BindVertexArray(pass.vertex_array.0);
            gl::BindBuffer(gl::ARRAY_BUFFER, pass.source.0);
            self.apply_layout(pass.vertex_array.0);

            if let Some(target) = pass.target {
                gl::BindBufferBase(gl::TRANSFORM_FEEDBACK_BUFFER, 0, target.0);
                gl::BeginTransformFeedback(gl::POINTS);
            }

            gl::DrawArrays(gl::POINTS, 0, pass.particle_count as GLsizei);

            if pass.target.is_some() {
                gl::EndTransformFeedback();
                gl::BindBufferBase(gl::TRANSFORM_FEEDBACK_BUFFER, 0, 0);
            }

            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
            gl::BindVertexArray(0);
            gl::UseProgram(0);

            check_gl_error("draw")
        }
    }

    fn present(&mut self, surface: &mut GlfwSurface) -> PresentOutcome {
        surface.context.swap_buffers();
        match unsafe { check_gl_error("present") } {
            Ok(()) => PresentOutcome::Presented,
            Err(BackendError::ContextLost) => PresentOutcome::SurfaceLost,
            Err(err) => PresentOutcome::Transient(err.to_string()),
        }
    }

    fn destroy_context(&mut self, _surface: &mut GlfwSurface) {
        unsafe { gl::Finish() };
        if !self.layouts.is_empty() {
            warn!(
                "{} vertex array(s) still registered at context destruction",
                self.layouts.len()
            );
            self.layouts.clear();
        }
        glfw::make_context_current(None);
    }
}
