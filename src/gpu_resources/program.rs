use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::particles::FEEDBACK_VARYINGS;
use super::shaders;

/// Dialecte GLSL ciblé : OpenGL 3.3 core (glfw) ou OpenGL ES 3.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum GlslDialect {
    #[default]
    Desktop330,
    Es300,
}

impl GlslDialect {
    pub fn header(self) -> &'static str {
        match self {
            GlslDialect::Desktop330 => "#version 330 core\n",
            GlslDialect::Es300 => "#version 300 es\nprecision highp float;\n",
        }
    }
}

/// Sous-ressources activées pour un jeu de ressources GPU.
///
/// Les variantes de rendu (points simples, sprites texturés et éclairés,
/// simulation par transform feedback) ne sont que des combinaisons de ces
/// drapeaux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceFeatures {
    pub uniform_blocks: bool,
    pub texture: bool,
    pub transform_feedback: bool,
}

impl ResourceFeatures {
    pub const ALL: ResourceFeatures = ResourceFeatures {
        uniform_blocks: true,
        texture: true,
        transform_feedback: true,
    };
}

/// Préréglages disponibles depuis la configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum ProgramPreset {
    #[default]
    ParticleSimulation,
    StaticPoints,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSpec {
    pub label: String,
    pub vertex_source: String,
    pub fragment_source: String,
    /// Vide si le transform feedback est désactivé.
    pub feedback_varyings: Vec<String>,
    pub features: ResourceFeatures,
}

impl ProgramSpec {
    pub fn from_preset(preset: ProgramPreset, dialect: GlslDialect) -> Self {
        match preset {
            ProgramPreset::ParticleSimulation => Self::particle_simulation(dialect),
            ProgramPreset::StaticPoints => Self::static_points(dialect),
        }
    }

    /// Simulation GPU par transform feedback, sprites texturés et éclairés.
    pub fn particle_simulation(dialect: GlslDialect) -> Self {
        Self {
            label: "particle_simulation".into(),
            vertex_source: with_header(dialect, shaders::PARTICLE_SIMULATION_VERT),
            fragment_source: with_header(dialect, shaders::PARTICLE_SPRITE_FRAG),
            feedback_varyings: FEEDBACK_VARYINGS.iter().map(|v| v.to_string()).collect(),
            features: ResourceFeatures::ALL,
        }
    }

    /// Points statiques, sans texture ni transform feedback.
    pub fn static_points(dialect: GlslDialect) -> Self {
        Self {
            label: "static_points".into(),
            vertex_source: with_header(dialect, shaders::STATIC_POINTS_VERT),
            fragment_source: with_header(dialect, shaders::STATIC_POINTS_FRAG),
            feedback_varyings: Vec::new(),
            features: ResourceFeatures {
                uniform_blocks: true,
                texture: false,
                transform_feedback: false,
            },
        }
    }

    /// Charge des sources GLSL complètes (directive #version incluse).
    pub fn from_files<P: AsRef<Path>>(
        vertex_path: P,
        fragment_path: P,
        features: ResourceFeatures,
    ) -> anyhow::Result<Self> {
        let vertex_path = vertex_path.as_ref();
        let fragment_path = fragment_path.as_ref();
        let vertex_source = std::fs::read_to_string(vertex_path)
            .with_context(|| format!("Failed to load vertex shader '{}'", vertex_path.display()))?;
        let fragment_source = std::fs::read_to_string(fragment_path).with_context(|| {
            format!(
                "Failed to load fragment shader '{}'",
                fragment_path.display()
            )
        })?;

        let feedback_varyings = if features.transform_feedback {
            FEEDBACK_VARYINGS.iter().map(|v| v.to_string()).collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            label: vertex_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "custom".into()),
            vertex_source,
            fragment_source,
            feedback_varyings,
            features,
        })
    }

    pub fn uses_transform_feedback(&self) -> bool {
        self.features.transform_feedback && !self.feedback_varyings.is_empty()
    }
}

fn with_header(dialect: GlslDialect, body: &str) -> String {
    let mut source = String::from(dialect.header());
    source.push_str(body);
    source
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_preset_declares_feedback_varyings() {
        let spec = ProgramSpec::particle_simulation(GlslDialect::Desktop330);
        assert!(spec.uses_transform_feedback());
        assert!(spec.vertex_source.starts_with("#version 330 core"));
        for varying in &spec.feedback_varyings {
            assert!(spec.vertex_source.contains(&format!("{varying};")));
        }
    }

    #[test]
    fn es_dialect_sets_precision() {
        let spec = ProgramSpec::static_points(GlslDialect::Es300);
        assert!(spec.fragment_source.starts_with("#version 300 es\nprecision highp float;"));
        assert!(!spec.uses_transform_feedback());
        assert!(!spec.features.texture);
    }

    #[test]
    fn from_files_reports_missing_shader() {
        let err = ProgramSpec::from_files("does/not/exist.vert", "nope.frag", ResourceFeatures::ALL)
            .unwrap_err();
        assert!(err.to_string().contains("does/not/exist.vert"));
    }

    #[test]
    fn from_files_loads_sources() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let vert = dir.path().join("points.vert");
        let frag = dir.path().join("points.frag");
        std::fs::write(&vert, "#version 330 core\nvoid main() {}")?;
        std::fs::write(&frag, "#version 330 core\nvoid main() {}")?;

        let spec = ProgramSpec::from_files(&vert, &frag, ResourceFeatures::ALL)?;
        assert_eq!(spec.label, "points");
        assert_eq!(spec.feedback_varyings.len(), 4);
        Ok(())
    }
}
