use std::time::{Duration, Instant};

use surface_particles::config::SceneConfig;
use surface_particles::gpu_resources::{InMemoryTextures, ProgramPreset};
use surface_particles::graphics_backend::{FaultPlan, HeadlessBackend, HeadlessProbe};
use surface_particles::render_loop::{LoopSettings, LoopSettingsBuilder};
use surface_particles::surface_lifecycle::{SceneSetup, SurfaceLifecycleController};

pub type HeadlessController = SurfaceLifecycleController<HeadlessBackend>;

#[allow(dead_code)]
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn scene(particle_count: usize) -> SceneSetup {
    SceneSetup::from_config(&SceneConfig {
        particle_count,
        program: ProgramPreset::ParticleSimulation,
        ..Default::default()
    })
}

/// Boucle rapide à pas fixe, bornée ou non.
#[allow(dead_code)]
pub fn fast_settings(max_frames: Option<u64>) -> LoopSettings {
    let builder = LoopSettingsBuilder::default()
        .frame_interval(Duration::from_millis(1))
        .fixed_time_step(1.0 / 60.0);
    match max_frames {
        Some(n) => builder.max_frames(n),
        None => builder,
    }
    .build()
    .unwrap()
}

#[allow(dead_code)]
pub fn headless_controller(
    faults: FaultPlan,
    scene: SceneSetup,
    settings: LoopSettings,
) -> (HeadlessController, HeadlessProbe) {
    init_test_logger();
    let (backend, probe) = HeadlessBackend::new(faults);
    let controller = SurfaceLifecycleController::new(backend, scene, settings)
        .with_texture_source(InMemoryTextures::default());
    (controller, probe)
}

/// Attend que `condition` soit vraie, au plus `timeout`.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
