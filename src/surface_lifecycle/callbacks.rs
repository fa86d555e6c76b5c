use std::fmt;

use crate::error::RenderResult;
use crate::graphics_backend::{Dimensions, GraphicsBackend};

use super::controller::{SurfaceLifecycleController, TeardownReport};

/// Les trois notifications qu'une plateforme envoie pour sa surface de
/// dessin.
pub trait SurfaceCallbacks<S> {
    fn surface_created(&mut self, surface: S, size: Dimensions) -> RenderResult<()>;
    fn surface_changed(&mut self, size: Dimensions) -> RenderResult<()>;
    fn surface_destroyed(&mut self) -> RenderResult<TeardownReport>;
}

impl<B: GraphicsBackend> SurfaceCallbacks<B::Surface> for SurfaceLifecycleController<B> {
    fn surface_created(&mut self, surface: B::Surface, size: Dimensions) -> RenderResult<()> {
        self.on_surface_created(surface, size)
    }

    fn surface_changed(&mut self, size: Dimensions) -> RenderResult<()> {
        self.on_surface_resized(size.width, size.height)
    }

    fn surface_destroyed(&mut self) -> RenderResult<TeardownReport> {
        self.on_surface_destroyed()
    }
}

/// Notification de surface sous forme de valeur, telle que produite par le
/// moteur de fenêtre.
pub enum SurfaceEvent<S> {
    Created { surface: S, size: Dimensions },
    Changed { size: Dimensions },
    Destroyed,
}

/// Ce que [`SurfaceEvent::dispatch`] a obtenu du récepteur.
#[derive(Debug)]
pub enum DispatchOutcome {
    Created,
    Changed,
    Destroyed(TeardownReport),
}

impl<S> SurfaceEvent<S> {
    pub fn dispatch<C: SurfaceCallbacks<S> + ?Sized>(
        self,
        callbacks: &mut C,
    ) -> RenderResult<DispatchOutcome> {
        match self {
            SurfaceEvent::Created { surface, size } => callbacks
                .surface_created(surface, size)
                .map(|_| DispatchOutcome::Created),
            SurfaceEvent::Changed { size } => callbacks
                .surface_changed(size)
                .map(|_| DispatchOutcome::Changed),
            SurfaceEvent::Destroyed => callbacks
                .surface_destroyed()
                .map(DispatchOutcome::Destroyed),
        }
    }
}

impl<S> fmt::Debug for SurfaceEvent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceEvent::Created { size, .. } => f
                .debug_struct("Created")
                .field("size", size)
                .finish_non_exhaustive(),
            SurfaceEvent::Changed { size } => f.debug_struct("Changed").field("size", size).finish(),
            SurfaceEvent::Destroyed => f.write_str("Destroyed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl SurfaceCallbacks<&'static str> for Recorder {
        fn surface_created(&mut self, surface: &'static str, size: Dimensions) -> RenderResult<()> {
            self.calls
                .push(format!("created {surface} {}x{}", size.width, size.height));
            Ok(())
        }

        fn surface_changed(&mut self, size: Dimensions) -> RenderResult<()> {
            self.calls.push(format!("changed {}x{}", size.width, size.height));
            Ok(())
        }

        fn surface_destroyed(&mut self) -> RenderResult<TeardownReport> {
            self.calls.push("destroyed".into());
            Ok(TeardownReport::default())
        }
    }

    #[test]
    fn dispatch_routes_each_event() {
        let mut recorder = Recorder::default();
        let events = vec![
            SurfaceEvent::Created {
                surface: "main",
                size: Dimensions::new(10, 20),
            },
            SurfaceEvent::Changed {
                size: Dimensions::new(30, 40),
            },
            SurfaceEvent::Destroyed,
        ];
        for event in events {
            event.dispatch(&mut recorder).unwrap();
        }
        assert_eq!(
            recorder.calls,
            vec!["created main 10x20", "changed 30x40", "destroyed"]
        );
    }

    #[test]
    fn debug_hides_the_surface() {
        let event: SurfaceEvent<&str> = SurfaceEvent::Created {
            surface: "secret",
            size: Dimensions::new(1, 1),
        };
        let text = format!("{event:?}");
        assert!(text.starts_with("Created"));
        assert!(!text.contains("secret"));
    }
}
