//! Uniform blocks (std140) échangés entre le thread de contrôle et le GPU.
//!
//! Chaque bloc est une valeur `Pod` remplacée en entier : aucune mise à jour
//! partielle n'est possible, le thread de rendu voit l'ancien ou le nouveau
//! bloc, jamais un mélange.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::graphics_backend::Dimensions;

/// Matrices de transformation. `normal` est une mat3 std140 (3 colonnes vec4).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformBlock {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
}

impl TransformBlock {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            normal: normal_matrix(model),
        }
    }

    pub fn with_projection(mut self, projection: Mat4) -> Self {
        self.projection = projection.to_cols_array_2d();
        self
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.projection)
    }

    /// Ratio d'aspect encodé dans une projection perspective.
    pub fn projection_aspect(&self) -> f32 {
        projection_aspect(&self.projection)
    }
}

impl Default for TransformBlock {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// `p[1][1] / p[0][0]` pour une matrice issue de `perspective_rh_gl`.
pub fn projection_aspect(projection: &[[f32; 4]; 4]) -> f32 {
    if projection[0][0] == 0.0 {
        return 0.0;
    }
    projection[1][1] / projection[0][0]
}

fn normal_matrix(model: Mat4) -> [[f32; 4]; 3] {
    let upper = Mat3::from_mat4(model);
    let normal = if upper.determinant().abs() <= f32::EPSILON {
        Mat3::IDENTITY
    } else {
        upper.inverse().transpose()
    };
    let cols = normal.to_cols_array_2d();
    [
        [cols[0][0], cols[0][1], cols[0][2], 0.0],
        [cols[1][0], cols[1][1], cols[1][2], 0.0],
        [cols[2][0], cols[2][1], cols[2][2], 0.0],
    ]
}

/// Lumière : couleurs, direction/position, atténuation et spot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightBlock {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub direction: [f32; 4],
    /// w = 0 : lumière directionnelle, w = 1 : lumière ponctuelle.
    pub position: [f32; 4],
    /// K0, K1, K2, puis 1.0 si l'atténuation est calculée.
    pub attenuation: [f32; 4],
    /// Direction du spot (xyz) et exposant (w).
    pub spot: [f32; 4],
    /// Angle de coupure en degrés (x), le reste est du padding.
    pub spot_cutoff: [f32; 4],
}

impl Default for LightBlock {
    fn default() -> Self {
        Self {
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [1.0, 1.0, 1.0, 1.0],
            direction: [0.0, -1.0, -1.0, 0.0],
            position: [0.0, 5.0, 5.0, 0.0],
            attenuation: [1.0, 0.0, 0.0, 0.0],
            spot: [0.0, -1.0, 0.0, 0.0],
            spot_cutoff: [180.0, 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialBlock {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub shininess: f32,
    pub _padding: [f32; 3],
}

impl Default for MaterialBlock {
    fn default() -> Self {
        Self {
            ambient: [1.0, 1.0, 1.0, 1.0],
            diffuse: [1.0, 0.6, 0.2, 1.0],
            specular: [0.5, 0.5, 0.5, 1.0],
            shininess: 32.0,
            _padding: [0.0; 3],
        }
    }
}

/// Position de l'œil en coordonnées monde.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraBlock {
    pub eye_position: [f32; 4],
}

impl CameraBlock {
    pub fn at(eye: Vec3) -> Self {
        Self {
            eye_position: eye.extend(1.0).to_array(),
        }
    }
}

impl Default for CameraBlock {
    fn default() -> Self {
        Self::at(Vec3::new(0.0, 0.0, 5.0))
    }
}

/// Identifie un des quatre blocs et fixe son nom GLSL et son binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlockKind {
    Transform,
    Light,
    Material,
    Camera,
}

impl UniformBlockKind {
    pub const ALL: [UniformBlockKind; 4] = [
        UniformBlockKind::Transform,
        UniformBlockKind::Light,
        UniformBlockKind::Material,
        UniformBlockKind::Camera,
    ];

    pub fn index(self) -> usize {
        match self {
            UniformBlockKind::Transform => 0,
            UniformBlockKind::Light => 1,
            UniformBlockKind::Material => 2,
            UniformBlockKind::Camera => 3,
        }
    }

    pub fn block_name(self) -> &'static str {
        match self {
            UniformBlockKind::Transform => "Transform",
            UniformBlockKind::Light => "Light",
            UniformBlockKind::Material => "Material",
            UniformBlockKind::Camera => "Camera",
        }
    }

    pub fn binding_point(self) -> u32 {
        self.index() as u32
    }

    pub fn size_bytes(self) -> usize {
        match self {
            UniformBlockKind::Transform => std::mem::size_of::<TransformBlock>(),
            UniformBlockKind::Light => std::mem::size_of::<LightBlock>(),
            UniformBlockKind::Material => std::mem::size_of::<MaterialBlock>(),
            UniformBlockKind::Camera => std::mem::size_of::<CameraBlock>(),
        }
    }
}

/// Une mise à jour complète d'un bloc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformBlock {
    Transform(TransformBlock),
    Light(LightBlock),
    Material(MaterialBlock),
    Camera(CameraBlock),
}

impl UniformBlock {
    pub fn kind(&self) -> UniformBlockKind {
        match self {
            UniformBlock::Transform(_) => UniformBlockKind::Transform,
            UniformBlock::Light(_) => UniformBlockKind::Light,
            UniformBlock::Material(_) => UniformBlockKind::Material,
            UniformBlock::Camera(_) => UniformBlockKind::Camera,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformBlock::Transform(block) => bytemuck::bytes_of(block),
            UniformBlock::Light(block) => bytemuck::bytes_of(block),
            UniformBlock::Material(block) => bytemuck::bytes_of(block),
            UniformBlock::Camera(block) => bytemuck::bytes_of(block),
        }
    }
}

/// Valeur courante des quatre blocs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformValues {
    pub transform: TransformBlock,
    pub light: LightBlock,
    pub material: MaterialBlock,
    pub camera: CameraBlock,
}

impl UniformValues {
    pub fn get(&self, kind: UniformBlockKind) -> UniformBlock {
        match kind {
            UniformBlockKind::Transform => UniformBlock::Transform(self.transform),
            UniformBlockKind::Light => UniformBlock::Light(self.light),
            UniformBlockKind::Material => UniformBlock::Material(self.material),
            UniformBlockKind::Camera => UniformBlock::Camera(self.camera),
        }
    }

    pub fn set(&mut self, block: UniformBlock) {
        match block {
            UniformBlock::Transform(value) => self.transform = value,
            UniformBlock::Light(value) => self.light = value,
            UniformBlock::Material(value) => self.material = value,
            UniformBlock::Camera(value) => self.camera = value,
        }
    }
}

/// Valeurs + révision par bloc. Le thread de rendu compare les révisions
/// pour ne renvoyer au GPU que les blocs modifiés.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformSnapshot {
    pub values: UniformValues,
    pub revisions: [u64; 4],
}

impl UniformSnapshot {
    pub fn revision(&self, kind: UniformBlockKind) -> u64 {
        self.revisions[kind.index()]
    }
}

/// Paramètres de la projection perspective, recalculée à chaque resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn matrix(&self, size: Dimensions) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, size.aspect_ratio(), self.near, self.far)
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_radians: 45f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}
