use anyhow::Result;
use glam::{Mat4, Vec3};
use log::{error, info, warn};

use surface_particles::gpu_resources::{CameraBlock, ImageFileSource, TransformBlock, UniformBlock};
use surface_particles::graphics_backend::GlBackend;
use surface_particles::surface_lifecycle::{LifecycleState, SceneSetup};
use surface_particles::utils::show_rust_core_dependencies;
use surface_particles::window_engine::{GlfwWindowEngine, WindowEngine};
use surface_particles::{SceneConfig, SurfaceLifecycleController};

const ORBIT_SPEED: f32 = 0.3;

fn main() -> Result<()> {
    env_logger::init();

    info!("🚀 Starting surface particles...");

    show_rust_core_dependencies();

    let config = SceneConfig::from_file("assets/config/scene.toml").unwrap_or_default();
    info!("Scene config loaded:\n{:#?}", config);

    let mut window = GlfwWindowEngine::init(1024, 800, "Surface Particles")?;

    let settings = config.render_loop.to_settings()?;
    let mut controller = SurfaceLifecycleController::new(
        GlBackend::new(),
        SceneSetup::from_config(&config),
        settings,
    )
    .with_texture_source(ImageFileSource::new("assets/textures"));

    let radius = Vec3::from(config.camera.eye).length();
    let target = Vec3::from(config.camera.target);
    let up = Vec3::from(config.camera.up);

    loop {
        for event in window.poll_surface_events() {
            if let Err(err) = event.dispatch(&mut controller) {
                error!("❌ Surface event failed: {err}");
                if err.is_retryable() {
                    window.request_new_surface();
                }
            }
        }

        controller.poll_loop_events();
        match controller.state() {
            LifecycleState::ContextLost => {
                warn!("♻️ Context lost, requesting a new surface");
                if let Err(err) = controller.on_surface_destroyed() {
                    error!("❌ {err}");
                }
                window.request_new_surface();
            }
            LifecycleState::Active => {
                // Caméra en orbite autour de la cible
                let angle = window.elapsed_seconds() as f32 * ORBIT_SPEED;
                let eye =
                    target + Vec3::new(angle.sin() * radius, radius * 0.3, angle.cos() * radius);
                let view = Mat4::look_at_rh(eye, target, up);
                let transform = TransformBlock::new(Mat4::IDENTITY, view, Mat4::IDENTITY);
                let blocks = [
                    UniformBlock::Transform(transform),
                    UniformBlock::Camera(CameraBlock::at(eye)),
                ];
                for block in blocks {
                    if let Err(err) = controller.update_uniform(block) {
                        warn!("⚠️ Camera update skipped: {err}");
                    }
                }
            }
            LifecycleState::Uninitialized => {}
        }

        if window.should_close() && controller.state() == LifecycleState::Uninitialized {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    info!("👋 Bye");
    Ok(())
}
