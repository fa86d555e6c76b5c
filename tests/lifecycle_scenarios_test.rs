use std::thread;
use std::time::Duration;

use surface_particles::gpu_resources::{LightBlock, MaterialBlock, UniformBlock};
use surface_particles::graphics_backend::{BackendCall, Dimensions, FaultPlan, HeadlessSurface};
use surface_particles::render_loop::{LoopEvent, SchedulerState};
use surface_particles::surface_lifecycle::LifecycleState;
use surface_particles::RenderError;

mod helpers;
use helpers::{fast_settings, headless_controller, scene, wait_until};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn bounded_run_presents_and_swaps_every_frame() {
    let (mut controller, probe) =
        headless_controller(FaultPlan::default(), scene(100), fast_settings(Some(10)));

    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(256, 256))
        .unwrap();
    assert_eq!(controller.state(), LifecycleState::Active);

    let event = controller.wait_loop_event(TIMEOUT);
    assert_eq!(event, Some(LoopEvent::FrameBudgetReached { frames: 10 }));

    let report = controller.on_surface_destroyed().unwrap();
    assert_eq!(report.frames_presented, 10);
    assert_eq!(report.swaps, 10);
    assert_eq!(report.frame_errors, 0);
    assert!(report.resources_released);
    assert!(report.surface_released);

    assert_eq!(probe.draw_count(), 10);
    assert_eq!(probe.present_count(), 10);
    assert_eq!(probe.live_handles().total(), 0);
    assert!(!probe.context_alive());
    assert!(probe.violations().is_empty(), "{:?}", probe.violations());
    assert_eq!(controller.state(), LifecycleState::Uninitialized);
    assert_eq!(controller.scheduler_state(), SchedulerState::Stopped);
}

#[test]
fn second_create_is_rejected_while_active() {
    let (mut controller, probe) =
        headless_controller(FaultPlan::default(), scene(10), fast_settings(None));
    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(64, 64))
        .unwrap();

    let err = controller
        .on_surface_created(HeadlessSurface::new(2), Dimensions::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RenderError::InvalidSequence { .. }));
    assert_eq!(controller.state(), LifecycleState::Active);

    controller.on_surface_destroyed().unwrap();
    assert_eq!(probe.live_handles().total(), 0);
    let creations = probe
        .calls()
        .into_iter()
        .filter(|c| matches!(c, BackendCall::CreateContext { .. }))
        .count();
    assert_eq!(creations, 1);
}

#[test]
fn resize_reaches_the_next_frames_without_tearing() {
    let (mut controller, probe) =
        headless_controller(FaultPlan::default(), scene(50), fast_settings(None));
    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(256, 256))
        .unwrap();
    assert!(wait_until(TIMEOUT, || probe.draw_count() >= 3));

    controller.on_surface_resized(512, 384).unwrap();
    let resized = Dimensions::new(512, 384);
    assert!(wait_until(TIMEOUT, || probe
        .draws()
        .iter()
        .any(|d| d.viewport == resized)));
    controller.on_surface_destroyed().unwrap();

    let draws = probe.draws();
    for draw in &draws {
        let expected = draw.viewport.aspect_ratio();
        assert!(
            (draw.projection_aspect() - expected).abs() < 1e-4,
            "frame {} drew with viewport {:?} but projection aspect {}",
            draw.frame,
            draw.viewport,
            draw.projection_aspect()
        );
    }
    // Une fois la nouvelle taille vue, on ne revient jamais à l'ancienne
    let first_resized = draws.iter().position(|d| d.viewport == resized).unwrap();
    assert!(draws[first_resized..].iter().all(|d| d.viewport == resized));
    assert!((draws.last().unwrap().projection_aspect() - 512.0 / 384.0).abs() < 1e-4);
}

#[test]
fn context_loss_on_draw_tears_down_and_allows_recreation() {
    let faults = FaultPlan {
        lose_context_on_draw: Some(5),
        ..Default::default()
    };
    let (mut controller, probe) = headless_controller(faults, scene(20), fast_settings(None));
    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(128, 128))
        .unwrap();

    let event = controller.wait_loop_event(TIMEOUT);
    assert!(matches!(
        event,
        Some(LoopEvent::ContextLost { iteration: 5, .. })
    ));
    assert_eq!(controller.state(), LifecycleState::ContextLost);
    assert_eq!(probe.draw_count(), 5);
    assert_eq!(probe.present_count(), 4);
    assert_eq!(probe.live_handles().total(), 0);
    assert!(!probe.context_alive());

    // Pas de resize ni d'uniform sans surface
    assert!(controller.on_surface_resized(10, 10).is_err());
    assert!(controller
        .update_uniform(UniformBlock::Light(LightBlock::default()))
        .is_err());

    controller
        .on_surface_created(HeadlessSurface::new(2), Dimensions::new(128, 128))
        .unwrap();
    assert_eq!(controller.state(), LifecycleState::Active);
    assert!(wait_until(TIMEOUT, || probe.present_count() >= 8));
    controller.on_surface_destroyed().unwrap();
    assert_eq!(probe.live_handles().total(), 0);
    assert!(probe.violations().is_empty(), "{:?}", probe.violations());
}

#[test]
fn surface_lost_on_present_stops_before_swapping() {
    let faults = FaultPlan {
        lose_context_on_present: Some(3),
        ..Default::default()
    };
    let (mut controller, probe) = headless_controller(faults, scene(20), fast_settings(None));
    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(128, 128))
        .unwrap();

    let event = controller.wait_loop_event(TIMEOUT);
    assert!(matches!(event, Some(LoopEvent::ContextLost { .. })));
    assert_eq!(controller.state(), LifecycleState::ContextLost);

    let report = controller.on_surface_destroyed().unwrap();
    assert_eq!(report.frames_presented, 2);
    assert_eq!(report.swaps, 2);
    assert_eq!(probe.draw_count(), 3);
    assert_eq!(controller.state(), LifecycleState::Uninitialized);
}

#[test]
fn context_creation_failure_leaves_everything_uninitialized() {
    let faults = FaultPlan {
        fail_context_creation: true,
        ..Default::default()
    };
    let (mut controller, probe) = headless_controller(faults, scene(10), fast_settings(None));

    let err = controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RenderError::ContextCreationFailed(_)));
    assert!(err.is_retryable());
    assert_eq!(controller.state(), LifecycleState::Uninitialized);
    assert_eq!(controller.scheduler_state(), SchedulerState::Stopped);
    assert_eq!(probe.draw_count(), 0);
    assert_eq!(probe.live_handles().total(), 0);
}

#[test]
fn unbindable_surface_is_reported_and_a_new_one_works() {
    let (mut controller, probe) =
        headless_controller(FaultPlan::default(), scene(10), fast_settings(Some(3)));

    let err = controller
        .on_surface_created(HeadlessSurface::unbindable(1), Dimensions::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RenderError::SurfaceBindFailed(_)));
    assert!(!err.is_retryable());
    assert_eq!(controller.state(), LifecycleState::Uninitialized);

    controller
        .on_surface_created(HeadlessSurface::new(2), Dimensions::new(64, 64))
        .unwrap();
    assert!(matches!(
        controller.wait_loop_event(TIMEOUT),
        Some(LoopEvent::FrameBudgetReached { .. })
    ));
    controller.on_surface_destroyed().unwrap();
    assert_eq!(probe.live_handles().total(), 0);
}

#[test]
fn allocation_failure_rolls_back_every_handle() {
    for failing_allocation in 1..=6 {
        let faults = FaultPlan {
            fail_buffer_allocation: Some(failing_allocation),
            ..Default::default()
        };
        let (mut controller, probe) = headless_controller(faults, scene(10), fast_settings(None));

        let err = controller
            .on_surface_created(HeadlessSurface::new(1), Dimensions::new(64, 64))
            .unwrap_err();
        assert!(
            matches!(err, RenderError::ResourceAllocationFailed(_)),
            "allocation {failing_allocation}: {err}"
        );
        assert_eq!(controller.state(), LifecycleState::Uninitialized);
        assert_eq!(probe.live_handles().total(), 0);
        assert!(!probe.context_alive());
        assert_eq!(probe.draw_count(), 0);
    }
}

#[test]
fn shader_failure_is_an_allocation_failure() {
    let faults = FaultPlan {
        fail_program_compile: true,
        ..Default::default()
    };
    let (mut controller, probe) = headless_controller(faults, scene(10), fast_settings(None));
    let err = controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RenderError::ResourceAllocationFailed(_)));
    assert_eq!(probe.live_handles().total(), 0);
}

#[test]
fn missing_texture_fails_allocation() {
    let mut scene = scene(10);
    scene.texture_id = Some("does-not-exist.png".into());
    let (mut controller, probe) =
        headless_controller(FaultPlan::default(), scene, fast_settings(None));

    let err = controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RenderError::ResourceAllocationFailed(_)));
    assert_eq!(controller.state(), LifecycleState::Uninitialized);
    assert!(!probe.context_alive());
    assert_eq!(probe.live_handles().total(), 0);
}

#[test]
fn teardown_happens_on_the_control_thread_after_the_last_draw() {
    let (mut controller, probe) =
        headless_controller(FaultPlan::default(), scene(10), fast_settings(None));
    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(64, 64))
        .unwrap();
    assert!(wait_until(TIMEOUT, || probe.draw_count() >= 3));
    controller.on_surface_destroyed().unwrap();

    let control_thread = thread::current().id();
    let journal = probe.journal();
    let last_draw = journal.iter().rposition(|e| e.call.is_draw()).unwrap();
    let first_teardown = journal.iter().position(|e| e.call.is_teardown()).unwrap();
    assert!(first_teardown > last_draw);

    for entry in &journal {
        if entry.call.is_draw() || entry.call.is_present() {
            assert_ne!(entry.thread, control_thread, "{:?} on control thread", entry.call);
        }
        if entry.call.is_teardown() {
            assert_eq!(entry.thread, control_thread, "{:?} off control thread", entry.call);
        }
    }
    // Le contexte part en dernier
    assert_eq!(
        journal.iter().rev().find(|e| e.call.is_teardown()).map(|e| &e.call),
        Some(&BackendCall::DestroyContext)
    );
    assert!(probe.violations().is_empty(), "{:?}", probe.violations());
}

#[test]
fn resize_and_destroy_before_create_are_invalid() {
    let (mut controller, _probe) =
        headless_controller(FaultPlan::default(), scene(10), fast_settings(None));
    assert!(matches!(
        controller.on_surface_resized(100, 100),
        Err(RenderError::InvalidSequence { .. })
    ));
    assert!(matches!(
        controller.on_surface_destroyed(),
        Err(RenderError::InvalidSequence { .. })
    ));
    assert_eq!(controller.state(), LifecycleState::Uninitialized);
}

#[test]
fn uniform_updates_reach_the_gpu_and_survive_surface_changes() {
    let (mut controller, probe) =
        headless_controller(FaultPlan::default(), scene(10), fast_settings(None));
    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(64, 64))
        .unwrap();
    assert!(wait_until(TIMEOUT, || probe.draw_count() >= 1));

    let material = MaterialBlock {
        shininess: 8.0,
        ..Default::default()
    };
    controller
        .update_uniform(UniformBlock::Material(material))
        .unwrap();
    assert!(wait_until(TIMEOUT, || probe
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::WriteBuffer(_)))));
    controller.on_surface_destroyed().unwrap();

    controller
        .on_surface_created(HeadlessSurface::new(2), Dimensions::new(32, 32))
        .unwrap();
    assert_eq!(
        controller.frame_state().snapshot().uniforms.values.material,
        material
    );
    controller.on_surface_destroyed().unwrap();
}

#[test]
fn render_thread_panic_is_reported_and_not_retryable() {
    let faults = FaultPlan {
        panic_on_draw: Some(3),
        ..Default::default()
    };
    let (mut controller, probe) = headless_controller(faults, scene(10), fast_settings(None));
    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(64, 64))
        .unwrap();
    assert!(wait_until(TIMEOUT, || probe.draw_count() >= 3));

    let err = controller.on_surface_destroyed().unwrap_err();
    assert!(matches!(err, RenderError::RenderThread(_)), "{err}");
    assert_eq!(controller.state(), LifecycleState::Uninitialized);
    assert_eq!(controller.scheduler_state(), SchedulerState::Stopped);

    // Le backend est parti avec le thread : la plateforme ne doit pas boucler
    let err = controller
        .on_surface_created(HeadlessSurface::new(2), Dimensions::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RenderError::RenderThread(_)), "{err}");
    assert!(!err.is_retryable());
    assert_eq!(controller.state(), LifecycleState::Uninitialized);
}

#[test]
fn failed_create_does_not_publish_the_new_size() {
    let mut scene = scene(10);
    scene.texture_id = Some("does-not-exist.png".into());
    let (mut controller, _probe) =
        headless_controller(FaultPlan::default(), scene, fast_settings(None));
    let before = controller.frame_state().snapshot();

    assert!(controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(800, 600))
        .is_err());
    assert_eq!(controller.frame_state().snapshot(), before);

    let faults = FaultPlan {
        fail_buffer_allocation: Some(5),
        ..Default::default()
    };
    let (mut controller, _probe) =
        headless_controller(faults, helpers::scene(10), fast_settings(None));
    let before = controller.frame_state().snapshot();
    assert!(controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(800, 600))
        .is_err());
    assert_eq!(controller.frame_state().snapshot(), before);
}

#[test]
fn empty_surface_at_creation_draws_with_a_finite_projection() {
    let (mut controller, probe) =
        headless_controller(FaultPlan::default(), scene(10), fast_settings(Some(2)));
    controller
        .on_surface_created(HeadlessSurface::new(1), Dimensions::new(0, 240))
        .unwrap();
    assert!(controller.wait_loop_event(TIMEOUT).is_some());

    for draw in probe.draws() {
        assert!(
            draw.projection.iter().flatten().all(|v| v.is_finite()),
            "frame {} uploaded {:?}",
            draw.frame,
            draw.projection
        );
    }

    controller.on_surface_resized(320, 240).unwrap();
    let transform = controller.frame_state().snapshot().uniforms.values.transform;
    assert!((transform.projection_aspect() - 320.0 / 240.0).abs() < 1e-4);
    controller.on_surface_destroyed().unwrap();
}
