// =========================
// Render Loop Configuration
// =========================

use derive_builder::Builder;
use std::time::Duration;

/// Cadence et comportement de la boucle de rendu.
///
/// Les champs sont privés : la configuration passe par le builder.
#[derive(Clone, Builder, Debug, PartialEq)]
#[builder(pattern = "owned", build_fn(error = "anyhow::Error"))]
pub struct LoopSettings {
    /// Intervalle cible entre deux débuts de frame
    #[builder(default = "Duration::from_millis(16)")]
    frame_interval: Duration,

    /// Nombre de frames présentées après lequel la boucle s'arrête d'elle-même
    #[builder(default, setter(strip_option))]
    max_frames: Option<u64>,

    /// Pas de simulation fixe (secondes) au lieu du temps mesuré
    #[builder(default, setter(strip_option))]
    fixed_time_step: Option<f32>,

    #[builder(default = "[0.1, 0.1, 0.1, 1.0]")]
    clear_color: [f32; 4],

    /// Période des logs de FPS
    #[builder(default = "Duration::from_secs(5)")]
    stats_log_interval: Duration,

    #[builder(default = "String::from(\"render-loop\")")]
    thread_name: String,
}

/// Borne du pas mesuré, pour qu'une pause (debugger, fenêtre déplacée) ne
/// fasse pas exploser la simulation.
pub const MAX_DELTA_SECONDS: f32 = 0.1;

impl LoopSettings {
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    pub fn fixed_time_step(&self) -> Option<f32> {
        self.fixed_time_step
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn stats_log_interval(&self) -> Duration {
        self.stats_log_interval
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            max_frames: None,
            fixed_time_step: None,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            stats_log_interval: Duration::from_secs(5),
            thread_name: "render-loop".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let built = LoopSettingsBuilder::default().build().unwrap();
        assert_eq!(built, LoopSettings::default());
    }

    #[test]
    fn builder_overrides() {
        let settings = LoopSettingsBuilder::default()
            .frame_interval(Duration::from_millis(5))
            .max_frames(10)
            .fixed_time_step(0.016)
            .build()
            .unwrap();
        assert_eq!(settings.frame_interval(), Duration::from_millis(5));
        assert_eq!(settings.max_frames(), Some(10));
        assert_eq!(settings.fixed_time_step(), Some(0.016));
        assert_eq!(settings.thread_name(), "render-loop");
    }
}
