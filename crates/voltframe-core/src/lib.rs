//! Voltframe core: electric frame effects and the celebration sequence,
//! independent of any concrete renderer.
//!
//! Effects draw through the traits in `voltframe_platform` and are driven by
//! the host's frame clock. Everything here is single-threaded.

pub mod bolts;
pub mod config;
pub mod effects;
pub mod error;
pub mod fade;
pub mod geometry;
pub mod host;
pub mod outline;
pub mod particles;
pub mod pool;
pub mod sequence;
pub mod timer;

mod random;
#[cfg(test)]
mod testing;

pub use bolts::{Bolt, BoltHandle, BoltSpawner};
pub use config::{
    BoltOptions, BoltPatch, DirectionProfile, EffectsConfig, OutlineOptions, OutlinePatch,
    ParticleOptions, ParticlePatch, SequenceConfig,
};
pub use effects::ElectricEffects;
pub use error::{EffectsError, Result};
pub use fade::{BackdropFade, FadeHandle};
pub use host::{EffectHandle, FrameEffect, HostContext};
pub use outline::{NoiseOutline, OutlineHandle};
pub use particles::{FlowDirection, Particle, ParticleFlow, ParticleHandle};
pub use sequence::{CelebrationSequence, Completion, Phase, SequenceOutcome, SequenceState};
