use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use surface_particles::gpu_resources::{
    CameraBlock, Projection, TransformBlock, UniformBlock, UniformValues,
};
use surface_particles::graphics_backend::Dimensions;
use surface_particles::render_loop::SharedFrameState;

/// Le lecteur ne doit jamais voir une taille sans sa projection, ni un bloc
/// à moitié écrit.
#[test]
fn readers_never_observe_torn_inputs() {
    let shared = Arc::new(SharedFrameState::new(
        Dimensions::new(100, 100),
        UniformValues::default(),
        Projection::default(),
    ));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let shared = Arc::clone(&shared);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 1..=2_000u32 {
                shared.resize(Dimensions::new(100 + i % 7 * 50, 100 + i % 5 * 30));
                let x = i as f32;
                // Les quatre composantes portent la même valeur
                shared.publish(UniformBlock::Camera(CameraBlock {
                    eye_position: [x, x, x, x],
                }));
                shared.publish(UniformBlock::Transform(TransformBlock::default()));
            }
            done.store(true, Ordering::Release);
        })
    };

    let mut last_revisions = [0u64; 4];
    let mut reads = 0;
    while !done.load(Ordering::Acquire) || reads == 0 {
        let inputs = shared.snapshot();
        let aspect = inputs.size.aspect_ratio();
        let projected = inputs.uniforms.values.transform.projection_aspect();
        assert!(
            (aspect - projected).abs() < 1e-4,
            "size {:?} with projection aspect {projected}",
            inputs.size
        );
        let eye = inputs.uniforms.values.camera.eye_position;
        assert!(eye.iter().all(|&c| c == eye[0]), "torn camera block {eye:?}");
        for (last, current) in last_revisions.iter_mut().zip(inputs.uniforms.revisions) {
            assert!(current >= *last, "revision went backwards");
            *last = current;
        }
        reads += 1;
    }
    writer.join().unwrap();
}
