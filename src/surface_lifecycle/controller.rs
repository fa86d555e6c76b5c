use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::scene::SceneSetup;
use crate::error::{RenderError, RenderResult};
use crate::gpu_resources::texture::radial_sprite;
use crate::gpu_resources::{
    GpuResourceSet, InMemoryTextures, ResourceSetDescriptor, TextureSource, UniformBlock,
};
use crate::graphics_backend::{Dimensions, GraphicsBackend, TextureImage};
use crate::render_context::RenderContext;
use crate::render_loop::{
    LoopEvent, LoopSettings, LoopStats, RenderLoopScheduler, RenderSession, SchedulerState,
    SharedFrameState,
};

const FALLBACK_SPRITE_SIZE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Active,
    /// La boucle a perdu son contexte ; tout a déjà été libéré.
    ContextLost,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Active => "active",
            LifecycleState::ContextLost => "context_lost",
        }
    }
}

/// Bilan d'une surface, produit par le teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub frames_presented: u64,
    pub swaps: u64,
    pub frame_errors: u64,
    pub resources_released: bool,
    pub surface_released: bool,
}

/// Relie les notifications de surface de la plateforme au contexte, aux
/// ressources GPU et au thread de rendu.
///
/// Toutes les méthodes s'appellent depuis le thread de contrôle. Pendant
/// `Active`, le contexte et les ressources appartiennent au thread de rendu ;
/// le contrôleur ne communique avec lui que par l'état partagé
/// ([`SharedFrameState`]) et par le canal d'événements.
pub struct SurfaceLifecycleController<B: GraphicsBackend> {
    state: LifecycleState,
    idle_context: Option<RenderContext<B>>,
    scheduler: RenderLoopScheduler<B>,
    shared: Arc<SharedFrameState>,
    scene: SceneSetup,
    textures: Box<dyn TextureSource>,
    events: Receiver<LoopEvent>,
    last_report: Option<TeardownReport>,
}

impl<B: GraphicsBackend> SurfaceLifecycleController<B> {
    pub fn new(backend: B, scene: SceneSetup, settings: LoopSettings) -> Self {
        let (events_tx, events) = unbounded();
        let shared = SharedFrameState::new(Dimensions::default(), scene.uniforms, scene.projection);
        Self {
            state: LifecycleState::Uninitialized,
            idle_context: Some(RenderContext::new(backend)),
            scheduler: RenderLoopScheduler::new(settings, events_tx),
            shared: Arc::new(shared),
            scene,
            textures: Box::new(InMemoryTextures::default()),
            events,
            last_report: None,
        }
    }

    pub fn with_texture_source<T: TextureSource + 'static>(mut self, textures: T) -> Self {
        self.textures = Box::new(textures);
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Compteurs de la surface courante (ou de la dernière).
    pub fn loop_stats(&self) -> Arc<LoopStats> {
        self.scheduler.stats()
    }

    pub fn frame_state(&self) -> Arc<SharedFrameState> {
        Arc::clone(&self.shared)
    }

    pub fn on_surface_created(&mut self, surface: B::Surface, size: Dimensions) -> RenderResult<()> {
        self.poll_loop_events();
        if self.state == LifecycleState::Active {
            return Err(RenderError::invalid_sequence(
                "surface_created",
                self.state.as_str(),
            ));
        }

        // Perdu avec un thread de rendu qui a paniqué : rien à réessayer
        let Some(mut context) = self.idle_context.take() else {
            return Err(RenderError::RenderThread(
                "graphics backend was lost with the render thread".into(),
            ));
        };

        if let Err(err) = context.create(surface, size) {
            error!("❌ Surface creation failed: {err}");
            self.idle_context = Some(context);
            self.state = LifecycleState::Uninitialized;
            return Err(err);
        }

        // Taille publiée seulement une fois les ressources allouées
        let inputs = self.shared.resized(size);

        let texture = match self.load_texture() {
            Ok(texture) => texture,
            Err(err) => return Err(self.abandon(context, err)),
        };

        let descriptor = ResourceSetDescriptor {
            program: &self.scene.program,
            particles: &self.scene.particles,
            texture: texture.as_ref(),
            uniforms: &inputs.uniforms,
        };
        let resources = match GpuResourceSet::allocate(context.backend_mut(), &descriptor) {
            Ok(resources) => resources,
            Err(err) => return Err(self.abandon(context, err)),
        };
        // L'image n'est plus utile une fois sur le GPU
        drop(texture);

        self.shared.resize(size);
        context.release_current();
        let session = RenderSession { context, resources };
        if let Err((err, session)) = self.scheduler.start(session, Arc::clone(&self.shared)) {
            error!("❌ Render loop did not start: {err}");
            self.dispose(session);
            self.state = LifecycleState::Uninitialized;
            return Err(err);
        }

        self.state = LifecycleState::Active;
        info!(
            "✅ Surface active ({}x{}, {} particles)",
            size.width,
            size.height,
            self.scene.particles.len()
        );
        Ok(())
    }

    pub fn on_surface_resized(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.poll_loop_events();
        if self.state != LifecycleState::Active {
            return Err(RenderError::invalid_sequence(
                "surface_resized",
                self.state.as_str(),
            ));
        }
        let size = Dimensions::new(width, height);
        if size.is_empty() {
            // Fenêtre minimisée : on garde la dernière taille valide
            debug!("Ignoring empty surface size {width}x{height}");
            return Ok(());
        }
        self.shared.resize(size);
        debug!("Surface resized to {width}x{height}");
        Ok(())
    }

    pub fn on_surface_destroyed(&mut self) -> RenderResult<TeardownReport> {
        self.poll_loop_events();
        match self.state {
            LifecycleState::Uninitialized => Err(RenderError::invalid_sequence(
                "surface_destroyed",
                self.state.as_str(),
            )),
            LifecycleState::ContextLost => {
                self.state = LifecycleState::Uninitialized;
                Ok(self.last_report.take().unwrap_or_default())
            }
            LifecycleState::Active => {
                let report = self.teardown();
                self.state = LifecycleState::Uninitialized;
                let report = report?;
                info!(
                    "👋 Surface destroyed: {} frames, {} swaps, {} errors",
                    report.frames_presented, report.swaps, report.frame_errors
                );
                Ok(report)
            }
        }
    }

    /// Publie un uniform block complet ; le thread de rendu le prend en
    /// compte au début de sa prochaine frame.
    pub fn update_uniform(&mut self, block: UniformBlock) -> RenderResult<u64> {
        self.poll_loop_events();
        if self.state != LifecycleState::Active {
            return Err(RenderError::invalid_sequence(
                "update_uniform",
                self.state.as_str(),
            ));
        }
        Ok(self.shared.publish(block))
    }

    /// Traite les événements du thread de rendu en attente.
    pub fn poll_loop_events(&mut self) -> Vec<LoopEvent> {
        let events: Vec<LoopEvent> = self.events.try_iter().collect();
        for event in &events {
            self.handle_loop_event(event);
        }
        events
    }

    /// Attend un événement du thread de rendu, au plus `timeout`.
    pub fn wait_loop_event(&mut self, timeout: Duration) -> Option<LoopEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_loop_event(&event);
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn handle_loop_event(&mut self, event: &LoopEvent) {
        match event {
            LoopEvent::ContextLost { iteration, reason } => {
                if self.state != LifecycleState::Active {
                    debug!("Stale context loss event ignored (iteration {iteration})");
                    return;
                }
                warn!("⚠️ Context lost at iteration {iteration} ({reason}), tearing down");
                self.last_report = match self.teardown() {
                    Ok(report) => Some(report),
                    Err(err) => {
                        error!("❌ Teardown after context loss failed: {err}");
                        None
                    }
                };
                self.state = LifecycleState::ContextLost;
            }
            LoopEvent::FrameBudgetReached { frames } => {
                info!("🏁 Render loop finished its budget of {frames} frames");
            }
        }
    }

    fn load_texture(&self) -> RenderResult<Option<TextureImage>> {
        if !self.scene.program.features.texture {
            return Ok(None);
        }
        match &self.scene.texture_id {
            Some(id) => self.textures.load(id).map(Some).map_err(|e| {
                RenderError::ResourceAllocationFailed(format!("texture '{id}': {e:#}"))
            }),
            None => Ok(Some(radial_sprite(FALLBACK_SPRITE_SIZE))),
        }
    }

    /// Échec entre création du contexte et démarrage de la boucle.
    fn abandon(&mut self, mut context: RenderContext<B>, err: RenderError) -> RenderError {
        error!("❌ Surface setup failed: {err}");
        drop(context.destroy());
        self.idle_context = Some(context);
        self.state = LifecycleState::Uninitialized;
        err
    }

    /// Arrête la boucle puis libère ressources, contexte et surface, dans
    /// cet ordre, depuis le thread de contrôle.
    fn teardown(&mut self) -> RenderResult<TeardownReport> {
        let stats = self.scheduler.stats();
        let session = self.scheduler.stop()?;

        let stale = self.events.try_iter().count();
        if stale > 0 {
            debug!("Discarded {stale} loop events from the stopped loop");
        }

        let (swaps, resources_released, surface_released) = match session {
            Some(session) => self.dispose(session),
            None => (0, false, false),
        };
        Ok(TeardownReport {
            frames_presented: stats.frames_presented(),
            swaps,
            frame_errors: stats.frame_errors(),
            resources_released,
            surface_released,
        })
    }

    fn dispose(&mut self, session: RenderSession<B>) -> (u64, bool, bool) {
        let RenderSession {
            mut context,
            mut resources,
        } = session;
        if let Err(err) = context.make_current() {
            warn!("⚠️ Context not current for teardown: {err}");
        }
        let swaps = resources.swap_count();
        resources.release(context.backend_mut());
        let surface = context.destroy();
        let surface_released = surface.is_some();
        drop(surface);
        self.idle_context = Some(context);
        (swaps, true, surface_released)
    }
}

impl<B: GraphicsBackend> Drop for SurfaceLifecycleController<B> {
    fn drop(&mut self) {
        if self.state == LifecycleState::Active {
            warn!("Controller dropped with an active surface, tearing down");
            if let Err(err) = self.teardown() {
                error!("❌ Teardown on drop failed: {err}");
            }
        }
    }
}
