use serde::{Deserialize, Serialize};

/// Taille d'une surface de rendu, en pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Ratio largeur / hauteur. Une surface vide (fenêtre minimisée, 0×N ou
    /// N×0) retombe sur 1.0 pour ne pas produire de projection infinie.
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

macro_rules! gpu_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);

            impl $name {
                pub fn raw(self) -> u32 {
                    self.0
                }
            }
        )*
    };
}

gpu_handle!(
    /// Programme shader lié.
    ProgramHandle,
    /// Buffer GPU (particules ou uniform block).
    BufferHandle,
    /// Vertex array décrivant le layout des attributs.
    VertexArrayHandle,
    /// Texture 2D RGBA8.
    TextureHandle,
);

/// Usage d'un buffer, traduit par le backend en cible et hint d'allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// État des particules, lu comme vertex buffer et écrit par transform feedback.
    ParticleState,
    /// Contenu d'un uniform block (std140).
    Uniform,
}

/// Un attribut de sommet dans un buffer entrelacé.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub offset: usize,
}

/// Layout complet d'un sommet : stride + attributs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: usize,
    pub attributes: Vec<VertexAttribute>,
}

/// Association bloc uniforme → point de binding → buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBinding {
    pub block_name: &'static str,
    pub binding_point: u32,
    pub buffer: BufferHandle,
}

/// Tout ce dont le backend a besoin pour dessiner une frame de particules.
///
/// `source` est le buffer actif (lu), `target` le buffer d'écriture du
/// transform feedback. Les deux ne sont jamais égaux.
#[derive(Debug, Clone)]
pub struct ParticlePass<'a> {
    pub program: ProgramHandle,
    pub vertex_array: VertexArrayHandle,
    pub source: BufferHandle,
    pub target: Option<BufferHandle>,
    pub particle_count: usize,
    pub uniforms: &'a [UniformBinding],
    pub texture: Option<TextureHandle>,
    pub delta_seconds: f32,
    pub clear_color: [f32; 4],
}

/// Résultat d'une présentation de frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Échec ponctuel, la frame suivante peut réussir.
    Transient(String),
    /// La surface ou le contexte n'est plus utilisable.
    SurfaceLost,
}

/// Image décodée, prête à être envoyée au GPU (RGBA8, lignes de bas en haut).
#[derive(Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Texture unie, utile pour les tests et comme valeur de repli.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

impl std::fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
