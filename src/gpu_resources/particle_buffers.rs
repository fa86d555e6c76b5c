use crate::graphics_backend::BufferHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSlot {
    Front,
    Back,
}

impl BufferSlot {
    pub fn other(self) -> Self {
        match self {
            BufferSlot::Front => BufferSlot::Back,
            BufferSlot::Back => BufferSlot::Front,
        }
    }
}

/// Paire de buffers d'état des particules, en ping-pong.
///
/// Le buffer actif est la source de vérité de la frame courante et l'entrée
/// du prochain pas de simulation ; l'autre reçoit l'état calculé. Sans
/// transform feedback il n'existe que `front`, qui reste actif.
#[derive(Debug)]
pub struct ParticleBuffers {
    front: BufferHandle,
    back: Option<BufferHandle>,
    active: BufferSlot,
    swaps: u64,
}

impl ParticleBuffers {
    pub fn new(front: BufferHandle, back: Option<BufferHandle>) -> Self {
        debug_assert!(back != Some(front), "front et back ne doivent pas être aliasés");
        Self {
            front,
            back,
            active: BufferSlot::Front,
            swaps: 0,
        }
    }

    pub fn active_slot(&self) -> BufferSlot {
        self.active
    }

    fn handle(&self, slot: BufferSlot) -> Option<BufferHandle> {
        match slot {
            BufferSlot::Front => Some(self.front),
            BufferSlot::Back => self.back,
        }
    }

    /// Buffer lu par la frame en cours.
    pub fn active(&self) -> BufferHandle {
        self.handle(self.active).unwrap_or(self.front)
    }

    /// Buffer écrit par le transform feedback, `None` sans double buffering.
    pub fn write_target(&self) -> Option<BufferHandle> {
        self.back.and_then(|_| self.handle(self.active.other()))
    }

    pub fn is_double_buffered(&self) -> bool {
        self.back.is_some()
    }

    /// Échange les rôles actif / cible. Retourne `false` s'il n'y a rien à
    /// échanger.
    pub(crate) fn swap(&mut self) -> bool {
        if self.back.is_none() {
            return false;
        }
        self.active = self.active.other();
        self.swaps += 1;
        true
    }

    pub fn swap_count(&self) -> u64 {
        self.swaps
    }

    pub fn handles(&self) -> impl Iterator<Item = BufferHandle> {
        std::iter::once(self.front).chain(self.back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> ParticleBuffers {
        ParticleBuffers::new(BufferHandle(10), Some(BufferHandle(11)))
    }

    #[test]
    fn double_swap_restores_roles() {
        let mut buffers = pair();
        let (active, target) = (buffers.active(), buffers.write_target());

        assert!(buffers.swap());
        assert_eq!(buffers.active(), BufferHandle(11));
        assert_eq!(buffers.write_target(), Some(BufferHandle(10)));

        assert!(buffers.swap());
        assert_eq!(buffers.active(), active);
        assert_eq!(buffers.write_target(), target);
        assert_eq!(buffers.swap_count(), 2);
    }

    #[test]
    fn active_and_target_never_alias() {
        let mut buffers = pair();
        for _ in 0..7 {
            assert_ne!(Some(buffers.active()), buffers.write_target());
            buffers.swap();
        }
    }

    #[test]
    fn single_buffer_never_swaps() {
        let mut buffers = ParticleBuffers::new(BufferHandle(3), None);
        assert!(!buffers.swap());
        assert_eq!(buffers.active(), BufferHandle(3));
        assert_eq!(buffers.write_target(), None);
        assert_eq!(buffers.swap_count(), 0);
        assert_eq!(buffers.handles().count(), 1);
    }
}
