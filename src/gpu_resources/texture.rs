use anyhow::{anyhow, Context};
use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::graphics_backend::TextureImage;
use crate::utils::HumanBytes;

/// Fournit une image décodée à partir d'un identifiant de ressource.
///
/// L'image n'a besoin de vivre que jusqu'à l'upload GPU.
pub trait TextureSource: Send {
    fn load(&self, id: &str) -> anyhow::Result<TextureImage>;
}

/// Décode les images depuis un répertoire d'assets.
#[derive(Debug, Clone)]
pub struct ImageFileSource {
    root: PathBuf,
}

impl ImageFileSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl TextureSource for ImageFileSource {
    fn load(&self, id: &str) -> anyhow::Result<TextureImage> {
        decode_image(self.root.join(id))
    }
}

/// Ouvre une image, la retourne verticalement (origine GL en bas) et la
/// convertit en RGBA8.
pub fn decode_image<P: AsRef<Path>>(path: P) -> anyhow::Result<TextureImage> {
    let path = path.as_ref();
    let img = image::open(path)
        .with_context(|| format!("Failed to load texture '{}'", path.display()))?
        .flipv()
        .to_rgba8();
    let (width, height) = img.dimensions();
    let image = TextureImage {
        width,
        height,
        pixels: img.into_raw(),
    };
    info!(
        "🖼 Texture '{}' decoded: {}x{} ({})",
        path.display(),
        width,
        height,
        image.byte_len().human_bytes()
    );
    Ok(image)
}

/// Images déjà en mémoire, indexées par identifiant.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTextures {
    images: HashMap<String, TextureImage>,
}

impl InMemoryTextures {
    pub fn with(mut self, id: impl Into<String>, image: TextureImage) -> Self {
        self.images.insert(id.into(), image);
        self
    }
}

impl TextureSource for InMemoryTextures {
    fn load(&self, id: &str) -> anyhow::Result<TextureImage> {
        self.images
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown texture '{id}'"))
    }
}

/// Sprite circulaire blanc avec un dégradé d'alpha, utilisé quand aucune
/// texture n'est configurée.
pub fn radial_sprite(size: u32) -> TextureImage {
    let size = size.max(1);
    let center = (size as f32 - 1.0) / 2.0;
    let radius = (size as f32 / 2.0).max(0.5);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let d = (dx * dx + dy * dy).sqrt() / radius;
            let alpha = ((1.0 - d).clamp(0.0, 1.0) * 255.0) as u8;
            pixels.extend_from_slice(&[255, 255, 255, alpha]);
        }
    }
    TextureImage {
        width: size,
        height: size,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radial_sprite_is_opaque_at_center_and_clear_at_corner() {
        let sprite = radial_sprite(33);
        let idx = |x: u32, y: u32| ((y * 33 + x) * 4 + 3) as usize;
        assert!(sprite.pixels[idx(16, 16)] > 240);
        assert_eq!(sprite.pixels[idx(0, 0)], 0);
        assert_eq!(sprite.byte_len(), 33 * 33 * 4);
    }

    #[test]
    fn in_memory_source_reports_unknown_ids() {
        let source = InMemoryTextures::default().with("dot", TextureImage::solid(1, 1, [1; 4]));
        assert!(source.load("dot").is_ok());
        assert!(source.load("missing").is_err());
    }

    #[test]
    fn image_file_source_decodes_png() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut img = image::RgbaImage::new(2, 3);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.save(dir.path().join("sprite.png"))?;

        let decoded = ImageFileSource::new(dir.path()).load("sprite.png")?;
        assert_eq!((decoded.width, decoded.height), (2, 3));
        // Retournée verticalement : le pixel (0,0) se retrouve sur la dernière ligne
        let last_row = (2 * 2 * 4) as usize;
        assert_eq!(&decoded.pixels[last_row..last_row + 4], &[255, 0, 0, 255]);
        Ok(())
    }

    #[test]
    fn image_file_source_missing_file_fails() {
        let err = ImageFileSource::new("/nonexistent").load("x.png").unwrap_err();
        assert!(err.to_string().contains("Failed to load texture"));
    }
}
