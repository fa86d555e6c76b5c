use bytemuck::{Pod, Zeroable};
use memoffset::offset_of;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::mem;

use crate::graphics_backend::{VertexAttribute, VertexLayout};

/// Noms des varyings capturés par le transform feedback, dans l'ordre du
/// layout entrelacé de [`Particle`].
pub const FEEDBACK_VARYINGS: [&str; 4] = ["vPosition", "vDiameter", "vVelocity", "vLifetime"];

pub const GRAVITY: [f32; 3] = [0.0, -0.98, 0.0];

/// Durée de vie donnée à une particule réémise à l'origine.
pub const RESPAWN_LIFETIME: f32 = 3.0;

/// État d'une particule tel que stocké dans les buffers front/back.
///
/// | Champ      | Type   | Location |
/// |------------|--------|----------|
/// | `position` | `vec3` | 0        |
/// | `diameter` | `float`| 1        |
/// | `velocity` | `vec3` | 2        |
/// | `lifetime` | `float`| 3        |
///
/// **Stride** : 8 × f32 = 32 octets
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 3],
    pub diameter: f32,
    pub velocity: [f32; 3],
    pub lifetime: f32,
}

impl Particle {
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: mem::size_of::<Self>(),
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    components: 3,
                    offset: offset_of!(Self, position),
                },
                VertexAttribute {
                    location: 1,
                    components: 1,
                    offset: offset_of!(Self, diameter),
                },
                VertexAttribute {
                    location: 2,
                    components: 3,
                    offset: offset_of!(Self, velocity),
                },
                VertexAttribute {
                    location: 3,
                    components: 1,
                    offset: offset_of!(Self, lifetime),
                },
            ],
        }
    }

    /// Un pas de simulation, identique au vertex shader de simulation.
    ///
    /// Une particule dont la durée de vie tombe à zéro repart de l'origine,
    /// vitesse verticale redressée.
    pub fn step(&self, dt: f32) -> Self {
        let mut next = *self;
        next.lifetime -= dt;

        if next.lifetime <= 0.0 {
            next.position = [0.0; 3];
            next.velocity[1] = next.velocity[1].abs();
            next.lifetime = RESPAWN_LIFETIME;
            return next;
        }

        for axis in 0..3 {
            next.velocity[axis] += GRAVITY[axis] * dt;
            next.position[axis] += next.velocity[axis] * dt;
        }
        next
    }
}

/// Émetteur de la population initiale, centré sur l'origine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParticleEmitter {
    /// Rayon du cube de dispersion initial.
    pub spread: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub min_lifetime: f32,
    pub max_lifetime: f32,
    pub min_diameter: f32,
    pub max_diameter: f32,
}

impl Default for ParticleEmitter {
    fn default() -> Self {
        Self {
            spread: 0.5,
            min_speed: 0.5,
            max_speed: 2.0,
            min_lifetime: 0.5,
            max_lifetime: RESPAWN_LIFETIME,
            min_diameter: 0.05,
            max_diameter: 0.2,
        }
    }
}

impl ParticleEmitter {
    /// Population déterministe pour une graine donnée.
    pub fn spawn(&self, count: usize, seed: u64) -> Vec<Particle> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count).map(|_| self.spawn_one(&mut rng)).collect()
    }

    fn spawn_one(&self, rng: &mut impl Rng) -> Particle {
        let mut position = [0.0; 3];
        if self.spread > 0.0 {
            for p in position.iter_mut() {
                *p = rng.random_range(-self.spread..=self.spread);
            }
        }

        // Direction dans l'hémisphère supérieur
        let theta = rng.random_range(0.0..(2.0 * std::f32::consts::PI));
        let phi = rng.random_range(0.0..(std::f32::consts::FRAC_PI_2));
        let speed = range(rng, self.min_speed, self.max_speed);

        Particle {
            position,
            diameter: range(rng, self.min_diameter, self.max_diameter),
            velocity: [
                speed * phi.sin() * theta.cos(),
                speed * phi.cos(),
                speed * phi.sin() * theta.sin(),
            ],
            lifetime: range(rng, self.min_lifetime, self.max_lifetime),
        }
    }
}

// Tolère min == max (config « fixe ») sans paniquer sur un range vide.
fn range(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_interleaved_varyings() {
        let layout = Particle::layout();
        assert_eq!(layout.stride, 32);
        let offsets: Vec<usize> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 16, 28]);
        assert_eq!(layout.attributes.len(), FEEDBACK_VARYINGS.len());
    }

    #[test]
    fn spawn_is_deterministic_per_seed() {
        let emitter = ParticleEmitter::default();
        assert_eq!(emitter.spawn(100, 42), emitter.spawn(100, 42));
        assert_ne!(emitter.spawn(100, 42), emitter.spawn(100, 43));
    }

    #[test]
    fn spawned_particles_respect_emitter_bounds() {
        let emitter = ParticleEmitter::default();
        for p in emitter.spawn(500, 7) {
            assert!(p.lifetime >= emitter.min_lifetime && p.lifetime <= emitter.max_lifetime);
            assert!(p.diameter >= emitter.min_diameter && p.diameter <= emitter.max_diameter);
            assert!(p.velocity[1] >= 0.0);
        }
    }

    #[test]
    fn step_applies_gravity() {
        let p = Particle {
            velocity: [1.0, 0.0, 0.0],
            lifetime: 1.0,
            ..Default::default()
        };
        let next = p.step(0.5);
        assert!((next.lifetime - 0.5).abs() < 1e-6);
        assert!(next.velocity[1] < 0.0);
        assert!((next.position[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn expired_particle_respawns_at_origin() {
        let p = Particle {
            position: [3.0, -2.0, 1.0],
            velocity: [0.2, -1.5, 0.0],
            lifetime: 0.01,
            diameter: 0.1,
        };
        let next = p.step(0.016);
        assert_eq!(next.position, [0.0; 3]);
        assert_eq!(next.velocity[1], 1.5);
        assert_eq!(next.lifetime, RESPAWN_LIFETIME);
    }

    #[test]
    fn degenerate_emitter_ranges_do_not_panic() {
        let emitter = ParticleEmitter {
            spread: 0.0,
            min_speed: 1.0,
            max_speed: 1.0,
            min_lifetime: 2.0,
            max_lifetime: 2.0,
            min_diameter: 0.1,
            max_diameter: 0.1,
        };
        let particles = emitter.spawn(3, 1);
        assert!(particles.iter().all(|p| p.lifetime == 2.0 && p.position == [0.0; 3]));
    }
}
