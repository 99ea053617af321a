//! Short-lived lightning bolts shooting out from the frame edges.

use std::f32::consts::PI;
use std::ops::ControlFlow;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{trace, warn};
use voltframe_platform::{FrameRect, FrameTick, RenderSurface, StrokeStyle};

use crate::config::{BoltOptions, BoltPatch};
use crate::error::Result;
use crate::geometry::{perpendicular, Edge};
use crate::host::{EffectHandle, FrameEffect, HostContext, StrokeLayers};
use crate::random::{between, signed_unit};

const GLOW_ALPHA: f32 = 0.9;
/// Outward reach as a multiple of the margin.
const REACH_MIN: f32 = 1.5;
const REACH_MAX: f32 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Bolt {
    pub origin: Vec2,
    pub end: Vec2,
    /// Jittered path of the current tick, `segments + 1` points.
    pub points: Vec<Vec2>,
    pub born_at_ms: f64,
    pub life_ms: f64,
}

impl Bolt {
    /// Fraction of life used, `0` at birth.
    pub fn progress(&self, now_ms: f64) -> f32 {
        ((now_ms - self.born_at_ms) / self.life_ms) as f32
    }

    pub fn is_expired(&self, now_ms: f64) -> bool {
        now_ms - self.born_at_ms >= self.life_ms
    }
}

/// Path from `origin` to `end` in `segments` steps, interior points pushed
/// sideways by `amplitude × sin(πt) × U(-1, 1)`. The ends stay pinned.
pub fn jagged_path(
    origin: Vec2,
    end: Vec2,
    segments: u32,
    amplitude: f32,
    rng: &mut impl Rng,
) -> Vec<Vec2> {
    let segments = segments.max(1);
    let span = end - origin;
    let normal = perpendicular(span);
    (0..=segments)
        .map(|i| {
            if i == 0 {
                return origin;
            }
            if i == segments {
                return end;
            }
            let t = i as f32 / segments as f32;
            let falloff = (PI * t).sin();
            origin + span * t + normal * (signed_unit(&mut *rng) * amplitude * falloff)
        })
        .collect()
}

pub type BoltHandle = EffectHandle<BoltSpawner>;

pub struct BoltSpawner {
    options: BoltOptions,
    rng: StdRng,
    bolts: Vec<Bolt>,
    layers: Option<StrokeLayers>,
    spawned_total: u64,
}

impl BoltSpawner {
    pub fn new(options: BoltOptions, rng: StdRng) -> Self {
        Self {
            options,
            rng,
            bolts: Vec::new(),
            layers: None,
            spawned_total: 0,
        }
    }

    pub fn create(host: &HostContext, options: BoltOptions, rng: StdRng) -> BoltHandle {
        EffectHandle::attach(host, Self::new(options, rng))
    }

    pub fn options(&self) -> &BoltOptions {
        &self.options
    }

    /// Merges `patch`. Lowering `max_bolts` retires the oldest bolts at once.
    pub fn set_options(&mut self, patch: &BoltPatch) -> Result<()> {
        self.options = self.options.patched(patch).map_err(|err| {
            warn!(effect = Self::NAME, %err, "option patch rejected");
            err
        })?;
        let excess = self.bolts.len().saturating_sub(self.options.max_bolts);
        self.bolts.drain(..excess);
        Ok(())
    }

    pub fn bolts(&self) -> &[Bolt] {
        &self.bolts
    }

    pub fn active_count(&self) -> usize {
        self.bolts.len()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    /// One tick of simulation: maybe spawn, cull expired, reshimmer survivors.
    pub fn advance(&mut self, now_ms: f64, frame: &FrameRect) {
        if self.bolts.len() < self.options.max_bolts
            && self.rng.gen::<f32>() < self.options.spawn_chance
        {
            let bolt = self.spawn(now_ms, frame);
            self.bolts.push(bolt);
            self.spawned_total += 1;
        }

        let before = self.bolts.len();
        self.bolts.retain(|bolt| !bolt.is_expired(now_ms));
        if before != self.bolts.len() {
            trace!(effect = Self::NAME, culled = before - self.bolts.len(), "bolts expired");
        }

        let (segments, amplitude) = (self.options.segments, self.options.amplitude);
        for bolt in &mut self.bolts {
            bolt.points = jagged_path(bolt.origin, bolt.end, segments, amplitude, &mut self.rng);
        }
    }

    fn spawn(&mut self, now_ms: f64, frame: &FrameRect) -> Bolt {
        let opts = &self.options;
        let outer = frame.expand(opts.margin);
        let edge = Edge::from_index(self.rng.gen_range(0..4));
        let origin = edge.point(&outer, self.rng.gen::<f32>());
        let reach = opts.margin * between(&mut self.rng, REACH_MIN, REACH_MAX);
        let lateral = (self.rng.gen::<f32>() - 0.5) * opts.end_jitter;
        let end = origin + edge.outward_normal() * reach + edge.tangent() * lateral;
        let life_ms = between(&mut self.rng, opts.min_life, opts.max_life) as f64;
        Bolt {
            origin,
            end,
            points: Vec::new(),
            born_at_ms: now_ms,
            life_ms,
        }
    }

    fn draw(&mut self, now_ms: f64, surface: &dyn RenderSurface) {
        let Some(layers) = self.layers else {
            return;
        };
        let opts = &self.options;
        let alpha = between(&mut self.rng, opts.flicker_alpha_min, opts.flicker_alpha_max);
        layers.begin_frame(surface, alpha);
        for bolt in &self.bolts {
            let remaining = (1.0 - bolt.progress(now_ms)).clamp(0.0, 1.0);
            surface.stroke_polyline(
                layers.glow,
                &bolt.points,
                StrokeStyle {
                    width: (opts.line_width_glow * remaining).max(1.0),
                    color: opts.color_glow,
                    alpha: GLOW_ALPHA * remaining,
                },
                false,
            );
            surface.stroke_polyline(
                layers.core,
                &bolt.points,
                StrokeStyle {
                    width: (opts.line_width_core * remaining).max(1.0),
                    color: opts.color_core,
                    alpha: remaining,
                },
                false,
            );
        }
    }
}

impl FrameEffect for BoltSpawner {
    const NAME: &'static str = "bolts";

    fn bind(&mut self, surface: &dyn RenderSurface) {
        self.layers = Some(StrokeLayers::create(
            surface,
            self.options.blur,
            self.options.z_index,
        ));
    }

    fn tick(
        &mut self,
        tick: &FrameTick,
        surface: &dyn RenderSurface,
        frame: Option<FrameRect>,
    ) -> ControlFlow<()> {
        if let Some(frame) = frame {
            self.advance(tick.now_ms, &frame);
            self.draw(tick.now_ms, surface);
        }
        ControlFlow::Continue(())
    }

    fn release(&mut self, surface: Option<&dyn RenderSurface>) {
        if let (Some(layers), Some(surface)) = (self.layers.take(), surface) {
            layers.destroy(surface);
        }
        self.bolts.clear();
    }
}

impl EffectHandle<BoltSpawner> {
    pub fn set_options(&self, patch: &BoltPatch) -> Result<()> {
        self.update(|bolts, _| bolts.set_options(patch))
    }

    pub fn active_count(&self) -> usize {
        self.inspect(BoltSpawner::active_count)
    }
}
