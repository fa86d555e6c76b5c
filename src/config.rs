use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::gpu_resources::{
    CameraBlock, GlslDialect, LightBlock, MaterialBlock, ParticleEmitter, ProgramPreset, Projection,
    TransformBlock, UniformValues,
};
use crate::render_loop::{LoopSettings, LoopSettingsBuilder};

/// Scène chargée depuis `assets/config/scene.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneConfig {
    pub particle_count: usize,
    pub seed: u64,
    pub dialect: GlslDialect,
    pub program: ProgramPreset,
    /// Identifiant résolu par la `TextureSource` du contrôleur.
    pub texture: Option<String>,
    pub render_loop: RenderLoopConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub material: MaterialConfig,
    pub emitter: ParticleEmitter,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            particle_count: 1000,
            seed: 42,
            dialect: GlslDialect::Desktop330,
            program: ProgramPreset::ParticleSimulation,
            texture: None,
            render_loop: RenderLoopConfig::default(),
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            material: MaterialConfig::default(),
            emitter: ParticleEmitter::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Valeurs initiales des quatre uniform blocks. La projection est
    /// recalculée à partir de la taille de surface à la publication.
    pub fn uniform_values(&self) -> UniformValues {
        UniformValues {
            transform: TransformBlock::new(Mat4::IDENTITY, self.camera.view(), Mat4::IDENTITY),
            light: self.light.to_block(),
            material: self.material.to_block(),
            camera: self.camera.to_block(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderLoopConfig {
    pub frame_interval_ms: u64,
    pub max_frames: Option<u64>,
    pub fixed_time_step: Option<f32>,
    pub clear_color: [f32; 4],
    pub stats_log_interval_secs: u64,
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            max_frames: None,
            fixed_time_step: None,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            stats_log_interval_secs: 5,
        }
    }
}

impl RenderLoopConfig {
    pub fn to_settings(&self) -> anyhow::Result<LoopSettings> {
        let mut builder = LoopSettingsBuilder::default()
            .frame_interval(Duration::from_millis(self.frame_interval_ms))
            .clear_color(self.clear_color)
            .stats_log_interval(Duration::from_secs(self.stats_log_interval_secs));
        if let Some(max_frames) = self.max_frames {
            builder = builder.max_frames(max_frames);
        }
        if let Some(step) = self.fixed_time_step {
            anyhow::ensure!(step > 0.0, "fixed_time_step must be positive, got {step}");
            builder = builder.fixed_time_step(step);
        }
        builder.build()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 1.0, 6.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraConfig {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(
            Vec3::from(self.eye),
            Vec3::from(self.target),
            Vec3::from(self.up),
        )
    }

    pub fn projection(&self) -> Projection {
        Projection {
            fov_y_radians: self.fov_y_degrees.to_radians(),
            near: self.near,
            far: self.far,
        }
    }

    pub fn to_block(&self) -> CameraBlock {
        CameraBlock::at(Vec3::from(self.eye))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LightConfig {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub direction: [f32; 3],
    /// `None` : lumière directionnelle.
    pub position: Option<[f32; 3]>,
    /// K0, K1, K2
    pub attenuation: Option<[f32; 3]>,
    pub spot_direction: [f32; 3],
    pub spot_exponent: f32,
    pub spot_cutoff_degrees: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        let block = LightBlock::default();
        Self {
            ambient: rgb(block.ambient),
            diffuse: rgb(block.diffuse),
            specular: rgb(block.specular),
            direction: rgb(block.direction),
            position: None,
            attenuation: None,
            spot_direction: rgb(block.spot),
            spot_exponent: block.spot[3],
            spot_cutoff_degrees: block.spot_cutoff[0],
        }
    }
}

impl LightConfig {
    pub fn to_block(&self) -> LightBlock {
        let (position, w) = match self.position {
            Some(p) => (p, 1.0),
            None => (rgb(LightBlock::default().position), 0.0),
        };
        let attenuation = match self.attenuation {
            Some([k0, k1, k2]) => [k0, k1, k2, 1.0],
            None => [1.0, 0.0, 0.0, 0.0],
        };
        LightBlock {
            ambient: rgba(self.ambient, 1.0),
            diffuse: rgba(self.diffuse, 1.0),
            specular: rgba(self.specular, 1.0),
            direction: rgba(self.direction, 0.0),
            position: rgba(position, w),
            attenuation,
            spot: rgba(self.spot_direction, self.spot_exponent),
            spot_cutoff: [self.spot_cutoff_degrees, 0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub shininess: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        let block = MaterialBlock::default();
        Self {
            ambient: block.ambient,
            diffuse: block.diffuse,
            specular: block.specular,
            shininess: block.shininess,
        }
    }
}

impl MaterialConfig {
    pub fn to_block(&self) -> MaterialBlock {
        MaterialBlock {
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
            shininess: self.shininess,
            _padding: [0.0; 3],
        }
    }
}

fn rgb(v: [f32; 4]) -> [f32; 3] {
    [v[0], v[1], v[2]]
}

fn rgba(v: [f32; 3], w: f32) -> [f32; 4] {
    [v[0], v[1], v[2], w]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_light_config_matches_default_block() {
        assert_eq!(LightConfig::default().to_block(), LightBlock::default());
    }

    #[test]
    fn point_light_sets_w_and_attenuation_flag() {
        let light = LightConfig {
            position: Some([1.0, 2.0, 3.0]),
            attenuation: Some([1.0, 0.1, 0.01]),
            ..Default::default()
        };
        let block = light.to_block();
        assert_eq!(block.position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(block.attenuation, [1.0, 0.1, 0.01, 1.0]);
    }

    #[test]
    fn render_loop_config_builds_settings() {
        let config = RenderLoopConfig {
            frame_interval_ms: 5,
            max_frames: Some(10),
            fixed_time_step: Some(0.01),
            ..Default::default()
        };
        let settings = config.to_settings().unwrap();
        assert_eq!(settings.frame_interval(), Duration::from_millis(5));
        assert_eq!(settings.max_frames(), Some(10));
        assert_eq!(settings.fixed_time_step(), Some(0.01));
    }

    #[test]
    fn non_positive_time_step_is_rejected() {
        let config = RenderLoopConfig {
            fixed_time_step: Some(0.0),
            ..Default::default()
        };
        assert!(config.to_settings().is_err());
    }

    #[test]
    fn camera_block_follows_eye() {
        let camera = CameraConfig {
            eye: [3.0, 4.0, 5.0],
            ..Default::default()
        };
        assert_eq!(camera.to_block().eye_position, [3.0, 4.0, 5.0, 1.0]);
    }
}
