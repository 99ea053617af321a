//! Glowing particles streaming in and out across the frame perimeter.
//!
//! Spawning is throttled by a fractional accumulator so the long-run rate is
//! `spawn_rate` per second regardless of frame pacing. Sprites come from a
//! [`SpritePool`] and go back to it when a particle expires.

use std::f32::consts::TAU;
use std::ops::ControlFlow;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};
use voltframe_platform::{
    BlendMode, Color, FrameRect, FrameTick, LayerDesc, LayerId, RenderSurface, SpriteState,
    BASELINE_FPS,
};

use crate::config::{DirectionProfile, ParticleOptions, ParticlePatch, DEFAULT_PARTICLE_TINT};
use crate::error::Result;
use crate::geometry::{distance_to_perimeter, perpendicular, Edge};
use crate::host::{EffectHandle, FrameEffect, HostContext};
use crate::pool::{SlotId, SpritePool};
use crate::random::{between, signed_unit};

/// Absorbs float error so `rate × dt` summing to a whole number spawns it.
const SPAWN_EPSILON: f64 = 1e-6;
const CURL_FREQUENCY: f32 = 1.2;
/// px/s² of sideways drift at the curl peak.
const CURL_STRENGTH: f32 = 18.0;
const MIN_FADE_DISTANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Inward,
    Outward,
}

/// Direction profile with its fallbacks filled in at spawn time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedProfile {
    pub drag: f32,
    pub tint: Color,
    pub alpha_bias: f32,
    pub alpha_mul: f32,
    pub fade_dist_mul: f32,
}

impl ResolvedProfile {
    pub fn resolve(profile: &DirectionProfile, base_drag: f32) -> Self {
        Self {
            drag: profile.drag.unwrap_or(base_drag),
            tint: profile.color.unwrap_or(DEFAULT_PARTICLE_TINT),
            alpha_bias: profile.alpha_bias,
            alpha_mul: profile.alpha_mul,
            fade_dist_mul: profile.fade_dist_mul,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub slot: SlotId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Seconds.
    pub age: f32,
    pub life: f32,
    pub direction: FlowDirection,
    pub size: f32,
    pub profile: ResolvedProfile,
    pub alpha: f32,
}

impl Particle {
    fn sprite_state(&self) -> SpriteState {
        SpriteState {
            position: self.position,
            diameter: self.size,
            tint: self.profile.tint,
            alpha: self.alpha,
        }
    }
}

/// Visibility from age and distance to the frame perimeter, clamped to `[0, 1]`.
pub fn fade_alpha(
    age: f32,
    life: f32,
    distance: f32,
    fade_distance: f32,
    profile: &ResolvedProfile,
) -> f32 {
    let reach = (fade_distance * profile.fade_dist_mul).max(MIN_FADE_DISTANCE);
    let k_age = 1.0 - age / life;
    let k_dist = (1.0 - distance / reach).max(0.0);
    (profile.alpha_bias + profile.alpha_mul * k_age * k_dist).clamp(0.0, 1.0)
}

pub type ParticleHandle = EffectHandle<ParticleFlow>;

pub struct ParticleFlow {
    options: ParticleOptions,
    rng: StdRng,
    particles: Vec<Particle>,
    pool: SpritePool,
    layer: Option<LayerId>,
    accumulator: f64,
    spawned_total: u64,
    recycled_total: u64,
}

impl ParticleFlow {
    pub fn new(options: ParticleOptions, rng: StdRng) -> Self {
        Self {
            options,
            rng,
            particles: Vec::new(),
            pool: SpritePool::new(),
            layer: None,
            accumulator: 0.0,
            spawned_total: 0,
            recycled_total: 0,
        }
    }

    pub fn create(host: &HostContext, options: ParticleOptions, rng: StdRng) -> ParticleHandle {
        EffectHandle::attach(host, Self::new(options, rng))
    }

    pub fn options(&self) -> &ParticleOptions {
        &self.options
    }

    /// Merges `patch`. Lowering `max_particles` recycles the oldest excess.
    pub fn set_options(
        &mut self,
        patch: &ParticlePatch,
        surface: Option<&dyn RenderSurface>,
    ) -> Result<()> {
        self.options = self.options.patched(patch).map_err(|err| {
            warn!(effect = Self::NAME, %err, "option patch rejected");
            err
        })?;
        let excess = self.particles.len().saturating_sub(self.options.max_particles);
        for particle in self.particles.drain(..excess) {
            self.pool.release(surface, particle.slot);
            self.recycled_total += 1;
        }
        Ok(())
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn active_count(&self) -> usize {
        self.particles.len()
    }

    pub fn pool(&self) -> &SpritePool {
        &self.pool
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    pub fn recycled_total(&self) -> u64 {
        self.recycled_total
    }

    /// Spawns what the accumulator owes, then ages and moves every particle.
    pub fn advance(&mut self, dt: f32, frame: &FrameRect, surface: &dyn RenderSurface) {
        self.accumulator += f64::from(self.options.spawn_rate) * f64::from(dt);
        let due = (self.accumulator + SPAWN_EPSILON).floor();
        self.accumulator = (self.accumulator - due).max(0.0);
        for _ in 0..due as u64 {
            self.spawn_one(frame, surface);
        }
        self.integrate(dt, frame, surface);
    }

    fn spawn_one(&mut self, frame: &FrameRect, surface: &dyn RenderSurface) {
        if self.particles.len() >= self.options.max_particles {
            return;
        }
        let Some(slot) = self.pool.acquire(surface) else {
            return;
        };

        let opts = &self.options;
        let edge = Edge::from_index(self.rng.gen_range(0..4));
        let position = edge.point(frame, self.rng.gen::<f32>());
        let (direction, profile) = if self.rng.gen::<f32>() < opts.inward_chance {
            (FlowDirection::Inward, &opts.inward)
        } else {
            (FlowDirection::Outward, &opts.outward)
        };
        let heading = match direction {
            FlowDirection::Inward => -edge.outward_normal(),
            FlowDirection::Outward => edge.outward_normal(),
        };
        let speed = between(&mut self.rng, opts.min_speed, opts.max_speed) * profile.speed_mul;
        let drift = signed_unit(&mut self.rng) * opts.tangential_jitter;
        let life = between(&mut self.rng, opts.min_life, opts.max_life) * profile.life_mul;
        let size = between(&mut self.rng, opts.size_min, opts.size_max) * profile.size_mul;
        let resolved = ResolvedProfile::resolve(profile, opts.drag);

        let particle = Particle {
            slot,
            position,
            velocity: heading * speed + edge.tangent() * drift,
            age: 0.0,
            life,
            direction,
            size,
            profile: resolved,
            alpha: fade_alpha(0.0, life, 0.0, opts.fade_distance, &resolved),
        };
        if let Some(sprite) = self.pool.sprite(slot) {
            surface.update_sprite(sprite, &particle.sprite_state());
            surface.set_sprite_visible(sprite, true);
        }
        self.particles.push(particle);
        self.spawned_total += 1;
    }

    fn integrate(&mut self, dt: f32, frame: &FrameRect, surface: &dyn RenderSurface) {
        let Self {
            options,
            particles,
            pool,
            recycled_total,
            ..
        } = self;
        particles.retain_mut(|p| {
            p.age += dt;
            if p.age >= p.life {
                pool.release(Some(surface), p.slot);
                *recycled_total += 1;
                return false;
            }
            let curl = (p.age * TAU * CURL_FREQUENCY).sin() * CURL_STRENGTH;
            p.velocity += perpendicular(p.velocity) * (curl * dt);
            p.velocity *= p.profile.drag.powf(dt * BASELINE_FPS);
            p.position += p.velocity * dt;
            let distance = distance_to_perimeter(p.position, frame);
            p.alpha = fade_alpha(p.age, p.life, distance, options.fade_distance, &p.profile);
            if let Some(sprite) = pool.sprite(p.slot) {
                surface.update_sprite(sprite, &p.sprite_state());
            }
            true
        });
    }
}

impl FrameEffect for ParticleFlow {
    const NAME: &'static str = "particles";

    fn bind(&mut self, surface: &dyn RenderSurface) {
        let layer = surface.create_layer(LayerDesc {
            blend: BlendMode::Additive,
            blur: (self.options.blur > 0.0).then_some(self.options.blur),
            z_index: self.options.z_index,
        });
        self.pool.bind(layer);
        self.layer = Some(layer);
    }

    fn tick(
        &mut self,
        tick: &FrameTick,
        surface: &dyn RenderSurface,
        frame: Option<FrameRect>,
    ) -> ControlFlow<()> {
        if let Some(frame) = frame {
            self.advance(tick.seconds(), &frame, surface);
        }
        ControlFlow::Continue(())
    }

    fn release(&mut self, surface: Option<&dyn RenderSurface>) {
        debug!(
            effect = Self::NAME,
            spawned = self.spawned_total,
            recycled = self.recycled_total,
            "particle flow released"
        );
        self.particles.clear();
        self.pool.clear(surface);
        if let (Some(layer), Some(surface)) = (self.layer.take(), surface) {
            surface.destroy_layer(layer);
        }
        self.accumulator = 0.0;
    }
}

impl EffectHandle<ParticleFlow> {
    pub fn set_options(&self, patch: &ParticlePatch) -> Result<()> {
        self.update(|flow, surface| flow.set_options(patch, surface))
    }

    pub fn active_count(&self) -> usize {
        self.inspect(ParticleFlow::active_count)
    }
}
