use std::sync::{PoisonError, RwLock};

use crate::gpu_resources::{Projection, UniformBlock, UniformBlockKind, UniformSnapshot, UniformValues};
use crate::graphics_backend::Dimensions;

/// Ce que le thread de rendu lit au début de chaque frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub size: Dimensions,
    pub uniforms: UniformSnapshot,
}

/// Valeurs publiées par le thread de contrôle (taille de surface, uniform
/// blocks) et relues une fois par frame par le thread de rendu.
///
/// Chaque écriture remplace une valeur complète sous verrou : un lecteur
/// obtient l'état d'avant ou d'après, jamais un mélange. La matrice de
/// projection est dérivée de la taille et mise à jour dans la même écriture.
#[derive(Debug)]
pub struct SharedFrameState {
    inner: RwLock<FrameInputs>,
    projection: Projection,
}

impl SharedFrameState {
    pub fn new(size: Dimensions, mut values: UniformValues, projection: Projection) -> Self {
        values.transform = values.transform.with_projection(projection.matrix(size));
        Self {
            inner: RwLock::new(FrameInputs {
                size,
                uniforms: UniformSnapshot {
                    values,
                    revisions: [1; 4],
                },
            }),
            projection,
        }
    }

    /// Remplace un bloc. La projection d'un `Transform` publié est
    /// recalculée depuis la taille courante.
    pub fn publish(&self, block: UniformBlock) -> u64 {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let block = match block {
            UniformBlock::Transform(transform) => UniformBlock::Transform(
                transform.with_projection(self.projection.matrix(inner.size)),
            ),
            other => other,
        };
        let kind = block.kind();
        inner.uniforms.values.set(block);
        bump(&mut inner.uniforms, kind)
    }

    /// Publie une nouvelle taille et la projection correspondante.
    pub fn resize(&self, size: Dimensions) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = self.apply_size(*inner, size);
    }

    /// Entrées telles qu'elles seraient après `resize(size)`, sans rien
    /// publier.
    pub fn resized(&self, size: Dimensions) -> FrameInputs {
        self.apply_size(self.snapshot(), size)
    }

    fn apply_size(&self, mut inputs: FrameInputs, size: Dimensions) -> FrameInputs {
        inputs.size = size;
        let transform = inputs.uniforms.values.transform;
        inputs.uniforms.values.transform =
            transform.with_projection(self.projection.matrix(size));
        bump(&mut inputs.uniforms, UniformBlockKind::Transform);
        inputs
    }

    pub fn snapshot(&self) -> FrameInputs {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn size(&self) -> Dimensions {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .size
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }
}

fn bump(snapshot: &mut UniformSnapshot, kind: UniformBlockKind) -> u64 {
    let revision = &mut snapshot.revisions[kind.index()];
    *revision += 1;
    *revision
}
