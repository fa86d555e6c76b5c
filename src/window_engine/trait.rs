use anyhow::Result;

use crate::graphics_backend::Dimensions;
use crate::surface_lifecycle::SurfaceEvent;

/// Couche fenêtrage : traduit les événements de la plateforme en
/// notifications de surface.
pub trait WindowEngine {
    type Surface;

    fn init(width: u32, height: u32, title: &str) -> Result<Self>
    where
        Self: Sized;

    /// Pompe les événements de la plateforme. Émet `Created` à la première
    /// frame (et après `request_new_surface`), `Changed` sur resize du
    /// framebuffer et `Destroyed` une seule fois à la fermeture.
    fn poll_surface_events(&mut self) -> Vec<SurfaceEvent<Self::Surface>>;

    /// Redemande une surface, par exemple après une perte de contexte.
    fn request_new_surface(&mut self);

    fn should_close(&self) -> bool;
    fn set_should_close(&mut self, value: bool);
    fn framebuffer_size(&self) -> Dimensions;
    fn elapsed_seconds(&self) -> f64;
}
