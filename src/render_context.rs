//! Contexte graphique lié à une surface.

use log::{debug, info};

use crate::error::{RenderError, RenderResult};
use crate::graphics_backend::{Dimensions, GraphicsBackend, PresentOutcome};

pub enum ContextState<S> {
    Uninitialized,
    Active { surface: S, size: Dimensions },
    Destroyed,
}

/// Vue de l'état sans la surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    Uninitialized,
    Active(Dimensions),
    Destroyed,
}

impl ContextStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextStatus::Uninitialized => "uninitialized",
            ContextStatus::Active(_) => "active",
            ContextStatus::Destroyed => "destroyed",
        }
    }
}

/// Possède le backend et, tant qu'il est actif, le jeton de surface.
///
/// Un même `RenderContext` peut être recréé après `destroy()` : le backend
/// survit aux surfaces successives.
pub struct RenderContext<B: GraphicsBackend> {
    backend: B,
    state: ContextState<B::Surface>,
}

impl<B: GraphicsBackend> RenderContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: ContextState::Uninitialized,
        }
    }

    /// Crée le contexte sur `surface`. En cas d'échec la surface est rendue
    /// (droppée) et l'état ne change pas.
    pub fn create(&mut self, mut surface: B::Surface, size: Dimensions) -> RenderResult<()> {
        if let ContextState::Active { .. } = self.state {
            return Err(RenderError::invalid_sequence("create", "active"));
        }
        self.backend.create_context(&mut surface, size)?;
        self.backend.set_viewport(size);
        self.state = ContextState::Active { surface, size };
        info!("✅ Graphics context ready ({}x{})", size.width, size.height);
        Ok(())
    }

    /// Met à jour le viewport. Sans effet hors de l'état actif.
    pub fn resize(&mut self, new_size: Dimensions) -> bool {
        match &mut self.state {
            ContextState::Active { size, .. } if *size != new_size => {
                *size = new_size;
                self.backend.set_viewport(new_size);
                debug!("Viewport resized to {}x{}", new_size.width, new_size.height);
                true
            }
            _ => false,
        }
    }

    pub fn present(&mut self) -> PresentOutcome {
        match &mut self.state {
            ContextState::Active { surface, .. } => self.backend.present(surface),
            _ => PresentOutcome::SurfaceLost,
        }
    }

    /// Rend le contexte courant sur le thread appelant.
    pub fn make_current(&mut self) -> RenderResult<()> {
        match &mut self.state {
            ContextState::Active { surface, .. } => self
                .backend
                .make_current(surface)
                .map_err(|e| RenderError::ContextLost(e.to_string())),
            other => Err(RenderError::invalid_sequence(
                "make_current",
                status_of(other).as_str(),
            )),
        }
    }

    pub fn release_current(&mut self) {
        if let ContextState::Active { surface, .. } = &mut self.state {
            self.backend.release_current(surface);
        }
    }

    /// Détruit le contexte et rend la surface à l'appelant.
    pub fn destroy(&mut self) -> Option<B::Surface> {
        match std::mem::replace(&mut self.state, ContextState::Destroyed) {
            ContextState::Active { mut surface, .. } => {
                self.backend.destroy_context(&mut surface);
                info!("🧹 Graphics context destroyed");
                Some(surface)
            }
            previous => {
                self.state = previous;
                None
            }
        }
    }

    pub fn status(&self) -> ContextStatus {
        status_of(&self.state)
    }

    pub fn size(&self) -> Option<Dimensions> {
        match self.state {
            ContextState::Active { size, .. } => Some(size),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ContextState::Active { .. })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

fn status_of<S>(state: &ContextState<S>) -> ContextStatus {
    match state {
        ContextState::Uninitialized => ContextStatus::Uninitialized,
        ContextState::Active { size, .. } => ContextStatus::Active(*size),
        ContextState::Destroyed => ContextStatus::Destroyed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics_backend::{FaultPlan, HeadlessBackend, HeadlessSurface};

    #[test]
    fn create_resize_destroy() {
        let (backend, probe) = HeadlessBackend::new(FaultPlan::default());
        let mut context = RenderContext::new(backend);
        assert_eq!(context.status(), ContextStatus::Uninitialized);

        context
            .create(HeadlessSurface::new(1), Dimensions::new(256, 256))
            .unwrap();
        assert_eq!(context.status(), ContextStatus::Active(Dimensions::new(256, 256)));

        assert!(context.resize(Dimensions::new(512, 384)));
        assert!(!context.resize(Dimensions::new(512, 384)));
        assert_eq!(probe.viewport(), Dimensions::new(512, 384));

        assert_eq!(context.present(), PresentOutcome::Presented);

        let surface = context.destroy();
        assert_eq!(surface.map(|s| s.id()), Some(1));
        assert_eq!(context.status(), ContextStatus::Destroyed);
        assert_eq!(context.present(), PresentOutcome::SurfaceLost);
        assert!(context.destroy().is_none());
    }

    #[test]
    fn second_create_is_rejected() {
        let (backend, _probe) = HeadlessBackend::new(FaultPlan::default());
        let mut context = RenderContext::new(backend);
        context
            .create(HeadlessSurface::new(1), Dimensions::new(64, 64))
            .unwrap();
        let err = context
            .create(HeadlessSurface::new(2), Dimensions::new(64, 64))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidSequence { .. }));
        assert_eq!(context.size(), Some(Dimensions::new(64, 64)));
    }

    #[test]
    fn creation_failures_are_distinct() {
        let (backend, _probe) = HeadlessBackend::new(FaultPlan {
            fail_context_creation: true,
            ..Default::default()
        });
        let mut context = RenderContext::new(backend);
        let err = context
            .create(HeadlessSurface::new(1), Dimensions::new(64, 64))
            .unwrap_err();
        assert!(matches!(err, RenderError::ContextCreationFailed(_)));
        assert_eq!(context.status(), ContextStatus::Uninitialized);

        let (backend, _probe) = HeadlessBackend::new(FaultPlan::default());
        let mut context = RenderContext::new(backend);
        let err = context
            .create(HeadlessSurface::unbindable(9), Dimensions::new(64, 64))
            .unwrap_err();
        assert!(matches!(err, RenderError::SurfaceBindFailed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn recreate_after_destroy() {
        let (backend, _probe) = HeadlessBackend::new(FaultPlan::default());
        let mut context = RenderContext::new(backend);
        context
            .create(HeadlessSurface::new(1), Dimensions::new(64, 64))
            .unwrap();
        context.destroy();
        context
            .create(HeadlessSurface::new(2), Dimensions::new(32, 32))
            .unwrap();
        assert!(context.is_active());
    }
}
