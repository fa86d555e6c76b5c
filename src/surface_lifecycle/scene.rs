use crate::config::SceneConfig;
use crate::gpu_resources::{Particle, ProgramSpec, Projection, UniformValues};

/// Tout ce qu'il faut pour (re)créer les ressources GPU d'une surface.
///
/// Conservé par le contrôleur : chaque nouvelle surface repart de la même
/// population initiale.
#[derive(Debug, Clone)]
pub struct SceneSetup {
    pub program: ProgramSpec,
    pub particles: Vec<Particle>,
    pub texture_id: Option<String>,
    pub uniforms: UniformValues,
    pub projection: Projection,
}

impl SceneSetup {
    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            program: ProgramSpec::from_preset(config.program, config.dialect),
            particles: config.emitter.spawn(config.particle_count, config.seed),
            texture_id: config.texture.clone(),
            uniforms: config.uniform_values(),
            projection: config.camera.projection(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_resources::ProgramPreset;

    #[test]
    fn scene_follows_config() {
        let config = SceneConfig {
            particle_count: 64,
            program: ProgramPreset::StaticPoints,
            texture: Some("spark.png".into()),
            ..Default::default()
        };
        let scene = SceneSetup::from_config(&config);
        assert_eq!(scene.particles.len(), 64);
        assert!(!scene.program.uses_transform_feedback());
        assert_eq!(scene.texture_id.as_deref(), Some("spark.png"));
    }

    #[test]
    fn same_seed_same_population() {
        let config = SceneConfig::default();
        let a = SceneSetup::from_config(&config);
        let b = SceneSetup::from_config(&config);
        assert_eq!(a.particles, b.particles);
    }
}
