//! The three generators bundled on one host.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::bolts::{BoltHandle, BoltSpawner};
use crate::config::EffectsConfig;
use crate::host::HostContext;
use crate::outline::{NoiseOutline, OutlineHandle};
use crate::particles::{ParticleFlow, ParticleHandle};

/// Outline, bolts and particles sharing one surface and frame.
///
/// Outline and bolts together are the "sparks" and can be retired early
/// while the particles keep flowing.
#[derive(Default)]
pub struct ElectricEffects {
    outline: Option<OutlineHandle>,
    bolts: Option<BoltHandle>,
    particles: Option<ParticleHandle>,
}

impl ElectricEffects {
    /// Each generator gets its own rng seeded from `rng`.
    pub fn enable(host: &HostContext, config: &EffectsConfig, rng: &mut StdRng) -> Self {
        let outline = NoiseOutline::create(
            host,
            config.outline.clone(),
            StdRng::seed_from_u64(rng.gen()),
        );
        let bolts = BoltSpawner::create(
            host,
            config.bolts.clone(),
            StdRng::seed_from_u64(rng.gen()),
        );
        let particles = ParticleFlow::create(
            host,
            config.particles.clone(),
            StdRng::seed_from_u64(rng.gen()),
        );
        info!("electric effects enabled");
        Self {
            outline: Some(outline),
            bolts: Some(bolts),
            particles: Some(particles),
        }
    }

    /// Tears down outline and bolts. Particles are left running.
    pub fn retire_sparks(&mut self) {
        let retired = self.outline.take().is_some() | self.bolts.take().is_some();
        if retired {
            info!("sparks retired");
        }
    }

    /// Tears everything down. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        let had_any = self.is_active();
        self.outline = None;
        self.bolts = None;
        self.particles = None;
        if had_any {
            info!("electric effects disabled");
        }
    }

    pub fn outline(&self) -> Option<&OutlineHandle> {
        self.outline.as_ref()
    }

    pub fn bolts(&self) -> Option<&BoltHandle> {
        self.bolts.as_ref()
    }

    pub fn particles(&self) -> Option<&ParticleHandle> {
        self.particles.as_ref()
    }

    pub fn sparks_active(&self) -> bool {
        self.outline.is_some() || self.bolts.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.sparks_active() || self.particles.is_some()
    }

    pub fn active_bolts(&self) -> usize {
        self.bolts.as_ref().map_or(0, BoltHandle::active_count)
    }

    pub fn active_particles(&self) -> usize {
        self.particles.as_ref().map_or(0, ParticleHandle::active_count)
    }
}
