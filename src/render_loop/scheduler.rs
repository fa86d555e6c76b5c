use crossbeam_channel::{bounded, Sender};
use log::{debug, error, info, trace, warn};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use super::frame_state::SharedFrameState;
use super::settings::{LoopSettings, MAX_DELTA_SECONDS};
use super::stats::{FpsMeter, LoopStats};
use super::RenderSession;
use crate::error::{RenderError, RenderResult};
use crate::frame_renderer::FrameRenderer;
use crate::graphics_backend::{GraphicsBackend, PresentOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    Stopping,
}

/// Signaux émis par le thread de rendu vers le thread de contrôle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// Le contexte est perdu : la boucle s'est arrêtée d'elle-même et un
    /// teardown complet est requis.
    ContextLost { iteration: u64, reason: String },
    /// Le budget `max_frames` est atteint.
    FrameBudgetReached { frames: u64 },
}

type ControlPair = Arc<(Mutex<SchedulerState>, Condvar)>;

/// Retour de `start` : en cas de refus, la session est rendue à l'appelant.
pub type StartResult<B> = Result<(), (RenderError, RenderSession<B>)>;

/// Boucle de rendu sur un thread dédié.
///
/// `Stopped → Running → Stopping → Stopped`. La session (contexte +
/// ressources GPU) est déplacée dans le thread au `start` et revient par le
/// `join` de `stop`, si bien que le thread de contrôle ne peut pas y toucher
/// pendant qu'une frame tourne.
pub struct RenderLoopScheduler<B: GraphicsBackend> {
    settings: LoopSettings,
    control: ControlPair,
    handle: Option<JoinHandle<Option<RenderSession<B>>>>,
    events: Sender<LoopEvent>,
    stats: Arc<LoopStats>,
}

impl<B: GraphicsBackend> RenderLoopScheduler<B> {
    pub fn new(settings: LoopSettings, events: Sender<LoopEvent>) -> Self {
        Self {
            settings,
            control: Arc::new((Mutex::new(SchedulerState::Stopped), Condvar::new())),
            handle: None,
            events,
            stats: Arc::new(LoopStats::default()),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.control.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compteurs de la dernière exécution (ou de l'exécution courante).
    pub fn stats(&self) -> Arc<LoopStats> {
        Arc::clone(&self.stats)
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Lance le thread de rendu sur `session`.
    pub fn start(&mut self, session: RenderSession<B>, shared: Arc<SharedFrameState>) -> StartResult<B> {
        {
            let mut state = self.control.0.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != SchedulerState::Stopped || self.handle.is_some() {
                return Err((RenderError::AlreadyRunning, session));
            }
            *state = SchedulerState::Running;
        }

        self.stats = Arc::new(LoopStats::default());
        let worker = RenderWorker {
            control: Arc::clone(&self.control),
            settings: self.settings.clone(),
            events: self.events.clone(),
            stats: Arc::clone(&self.stats),
            shared,
        };

        // La session transite par un canal : si le spawn échoue, on la garde.
        let (session_tx, session_rx) = bounded::<RenderSession<B>>(1);
        let spawned = thread::Builder::new()
            .name(self.settings.thread_name().to_string())
            .spawn(move || {
                let session = session_rx.recv().ok()?;
                Some(worker.run(session))
            });

        match spawned {
            Ok(handle) => {
                if let Err(returned) = session_tx.send(session) {
                    self.set_state(SchedulerState::Stopped);
                    let _ = handle.join();
                    return Err((
                        RenderError::RenderThread("render thread exited before start".into()),
                        returned.0,
                    ));
                }
                self.handle = Some(handle);
                info!(
                    "▶️ Render loop started (interval {:?})",
                    self.settings.frame_interval()
                );
                Ok(())
            }
            Err(e) => {
                self.set_state(SchedulerState::Stopped);
                error!("❌ Failed to spawn render thread: {e}");
                Err((RenderError::RenderThread(e.to_string()), session))
            }
        }
    }

    /// Demande l'arrêt, réveille le thread s'il attend et le joint.
    ///
    /// Au retour, plus aucune frame n'est en vol et la session appartient de
    /// nouveau à l'appelant.
    pub fn stop(&mut self) -> RenderResult<Option<RenderSession<B>>> {
        let Some(handle) = self.handle.take() else {
            self.set_state(SchedulerState::Stopped);
            return Ok(None);
        };

        self.set_state(SchedulerState::Stopping);
        let started = Instant::now();
        let joined = handle.join();
        self.set_state(SchedulerState::Stopped);

        match joined {
            Ok(session) => {
                info!(
                    "🛑 Render loop stopped after {} frames (join {:?})",
                    self.stats.frames_presented(),
                    started.elapsed()
                );
                Ok(session)
            }
            Err(_) => {
                error!("❌ Render thread panicked, GPU resources are lost");
                Err(RenderError::RenderThread("render thread panicked".into()))
            }
        }
    }

    fn set_state(&self, next: SchedulerState) {
        let (lock, cvar) = &*self.control;
        let mut state = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *state = next;
        cvar.notify_all();
    }
}

impl<B: GraphicsBackend> Drop for RenderLoopScheduler<B> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Render loop dropped while running, joining thread");
            if let Ok(Some(session)) = self.stop() {
                // Sans thread de contrôle pour la libérer, la session fuit
                drop(session);
            }
        }
    }
}

enum Iteration {
    Presented,
    Skipped,
    Lost(String),
}

/// Partie de l'ordonnanceur qui vit sur le thread de rendu.
struct RenderWorker {
    control: ControlPair,
    settings: LoopSettings,
    events: Sender<LoopEvent>,
    stats: Arc<LoopStats>,
    shared: Arc<SharedFrameState>,
}

impl RenderWorker {
    fn run<B: GraphicsBackend>(self, mut session: RenderSession<B>) -> RenderSession<B> {
        if let Err(err) = session.context.make_current() {
            self.escalate(0, err.to_string());
            return session;
        }
        debug!("Render thread owns the context");

        let mut fps = FpsMeter::new(self.settings.stats_log_interval());
        let mut last_frame = Instant::now();

        while self.is_running() {
            let frame_start = Instant::now();
            let delta = self.settings.fixed_time_step().unwrap_or_else(|| {
                frame_start
                    .duration_since(last_frame)
                    .as_secs_f32()
                    .min(MAX_DELTA_SECONDS)
            });
            last_frame = frame_start;
            let iteration = self.stats.record_iteration();

            match self.iterate(&mut session, iteration, delta) {
                Iteration::Presented => fps.tick(delta, &self.stats),
                Iteration::Skipped => {}
                Iteration::Lost(reason) => {
                    self.escalate(iteration, reason);
                    break;
                }
            }

            if let Some(max) = self.settings.max_frames() {
                let frames = self.stats.frames_presented();
                if frames >= max {
                    info!("🏁 Frame budget reached ({frames} frames)");
                    self.finish(LoopEvent::FrameBudgetReached { frames });
                    break;
                }
            }

            self.pace(frame_start + self.settings.frame_interval());
        }

        session.context.release_current();
        session
    }

    fn iterate<B: GraphicsBackend>(
        &self,
        session: &mut RenderSession<B>,
        iteration: u64,
        delta: f32,
    ) -> Iteration {
        let inputs = self.shared.snapshot();
        session.context.resize(inputs.size);

        let RenderSession { context, resources } = session;
        match FrameRenderer::draw(
            context.backend_mut(),
            resources,
            &inputs,
            delta,
            self.settings.clear_color(),
        ) {
            Ok(report) => trace!("frame {iteration}: {report:?}"),
            Err(RenderError::ContextLost(reason)) => return Iteration::Lost(reason),
            Err(err) => {
                warn!("⚠️ Frame {iteration} dropped: {err}");
                self.stats.record_error();
                return Iteration::Skipped;
            }
        }

        match context.present() {
            PresentOutcome::Presented => {
                let swapped = resources.swap();
                self.stats.record_presented(swapped);
                Iteration::Presented
            }
            PresentOutcome::Transient(reason) => {
                warn!("⚠️ Frame {iteration} not presented: {reason}");
                self.stats.record_error();
                Iteration::Skipped
            }
            PresentOutcome::SurfaceLost => Iteration::Lost("surface lost during present".into()),
        }
    }

    fn is_running(&self) -> bool {
        *self.control.0.lock().unwrap_or_else(PoisonError::into_inner) == SchedulerState::Running
    }

    /// Attend jusqu'à `deadline`, ou moins si `stop()` est demandé.
    fn pace(&self, deadline: Instant) {
        let (lock, cvar) = &*self.control;
        let mut state = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while *state == SchedulerState::Running {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            state = cvar
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn escalate(&self, iteration: u64, reason: String) {
        error!("💥 Context lost at iteration {iteration}: {reason}");
        self.finish(LoopEvent::ContextLost { iteration, reason });
    }

    /// Sortie à l'initiative du thread de rendu : passe en `Stopping` et
    /// prévient le contrôleur, qui devra joindre.
    fn finish(&self, event: LoopEvent) {
        {
            let (lock, cvar) = &*self.control;
            let mut state = lock.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == SchedulerState::Running {
                *state = SchedulerState::Stopping;
            }
            cvar.notify_all();
        }
        if self.events.send(event).is_err() {
            debug!("Loop event dropped: controller is gone");
        }
    }
}
