pub mod particle_buffers;
pub use self::particle_buffers::{BufferSlot, ParticleBuffers};

pub mod particles;
pub use self::particles::{Particle, ParticleEmitter};

pub mod program;
pub use self::program::{GlslDialect, ProgramPreset, ProgramSpec, ResourceFeatures};

pub mod resource_set;
pub use self::resource_set::{GpuResourceSet, ResourceSetDescriptor, ResourceState};

mod shaders;

pub mod texture;
pub use self::texture::{ImageFileSource, InMemoryTextures, TextureSource};

pub mod uniforms;
pub use self::uniforms::{
    CameraBlock, LightBlock, MaterialBlock, Projection, TransformBlock, UniformBlock,
    UniformBlockKind, UniformSnapshot, UniformValues,
};
