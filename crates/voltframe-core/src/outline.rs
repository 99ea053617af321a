//! Jittering electric outline around the frame.
//!
//! Every tick the margin-expanded rect is resampled into
//! `segments_per_edge × 4` points, each pushed along its edge normal by three
//! layered sine waves. The polygon is stroked twice: a blurred glow and a thin
//! core.

use std::f32::consts::{PI, TAU};
use std::ops::ControlFlow;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};
use voltframe_platform::{FrameRect, FrameTick, RenderSurface, StrokeStyle};

use crate::config::{OutlineOptions, OutlinePatch};
use crate::error::Result;
use crate::geometry::Edge;
use crate::host::{EffectHandle, FrameEffect, HostContext, StrokeLayers};
use crate::random::between;

/// Animation seconds per baseline frame, before `speed`.
const SECONDS_PER_FRAME: f32 = 0.016;
const GLOW_ALPHA: f32 = 0.9;

/// (spatial frequency, temporal frequency, phase multiplier, weight)
const NOISE_LAYERS: [(f32, f32, f32, f32); 3] = [
    (1.0, 0.90, 1.0, 0.6),
    (2.7, 1.35, 1.7, 0.3),
    (5.1, 2.2, 2.3, 0.1),
];

/// Stable per-point noise parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSeed {
    /// Radians.
    pub phase: f32,
    /// Amplitude multiplier in `[0.6, 1.4)`.
    pub amplitude: f32,
}

/// Jitter attenuation towards the corners: 1 at mid-edge, 0.85 at the ends.
pub fn taper(t: f32) -> f32 {
    0.85 + 0.15 * (PI * (t - 0.5)).cos()
}

/// Layered sine noise at loop position `u` in `[0, 1)`.
pub fn layered_noise(u: f32, time: f32, seed: NoiseSeed) -> f32 {
    let sum: f32 = NOISE_LAYERS
        .iter()
        .map(|&(spatial, temporal, phase_mul, weight)| {
            weight * (TAU * (u * spatial + time * temporal) + seed.phase * phase_mul).sin()
        })
        .sum();
    sum * seed.amplitude
}

pub type OutlineHandle = EffectHandle<NoiseOutline>;

pub struct NoiseOutline {
    options: OutlineOptions,
    rng: StdRng,
    seeds: Vec<NoiseSeed>,
    perimeter: Vec<Vec2>,
    time: f32,
    layers: Option<StrokeLayers>,
}

impl NoiseOutline {
    pub fn new(options: OutlineOptions, rng: StdRng) -> Self {
        let mut outline = Self {
            options,
            rng,
            seeds: Vec::new(),
            perimeter: Vec::new(),
            time: 0.0,
            layers: None,
        };
        outline.reseed();
        outline
    }

    pub fn create(host: &HostContext, options: OutlineOptions, rng: StdRng) -> OutlineHandle {
        EffectHandle::attach(host, Self::new(options, rng))
    }

    pub fn options(&self) -> &OutlineOptions {
        &self.options
    }

    /// Merges `patch`; reseeds when the point layout may have changed.
    pub fn set_options(&mut self, patch: &OutlinePatch) -> Result<()> {
        self.options = self.options.patched(patch).map_err(|err| {
            warn!(effect = Self::NAME, %err, "option patch rejected");
            err
        })?;
        if patch.touches_layout() {
            self.reseed();
        }
        Ok(())
    }

    pub fn point_count(&self) -> usize {
        (self.options.segments_per_edge as usize * 4).max(4)
    }

    pub fn seeds(&self) -> &[NoiseSeed] {
        &self.seeds
    }

    /// Points of the most recent tick.
    pub fn perimeter(&self) -> &[Vec2] {
        &self.perimeter
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advances animation time and rebuilds the perimeter around `frame`.
    pub fn advance(&mut self, delta: f32, frame: &FrameRect) {
        let delta = if delta > 0.0 { delta } else { 1.0 };
        self.time += delta * SECONDS_PER_FRAME * self.options.speed;
        self.perimeter = self.build_perimeter(&frame.expand(self.options.margin));
    }

    fn reseed(&mut self) {
        let count = self.point_count();
        let rng = &mut self.rng;
        self.seeds = (0..count)
            .map(|_| NoiseSeed {
                phase: rng.gen::<f32>() * TAU,
                amplitude: between(&mut *rng, 0.6, 1.4),
            })
            .collect();
        debug!(effect = Self::NAME, points = count, "noise reseeded");
    }

    fn build_perimeter(&self, rect: &FrameRect) -> Vec<Vec2> {
        let per_edge = self.options.segments_per_edge.max(1) as usize;
        let mut points = Vec::with_capacity(per_edge * 4);
        for edge in Edge::ALL {
            let normal = edge.outward_normal();
            for i in 0..per_edge {
                let t = i as f32 / per_edge as f32;
                let seed = self.seeds[points.len() % self.seeds.len()];
                let u = (edge.index() as f32 + t) / 4.0;
                let displacement =
                    self.options.amplitude * layered_noise(u, self.time, seed) * taper(t);
                points.push(edge.point(rect, t) + normal * displacement);
            }
        }
        points
    }

    fn draw(&mut self, surface: &dyn RenderSurface) {
        let Some(layers) = self.layers else {
            return;
        };
        let alpha = between(
            &mut self.rng,
            self.options.flicker_alpha_min,
            self.options.flicker_alpha_max,
        );
        layers.begin_frame(surface, alpha);
        if self.perimeter.is_empty() {
            return;
        }
        let opts = &self.options;
        surface.stroke_polyline(
            layers.glow,
            &self.perimeter,
            StrokeStyle {
                width: opts.line_width_glow.max(1.0),
                color: opts.color_glow,
                alpha: GLOW_ALPHA,
            },
            opts.close_loop,
        );
        surface.stroke_polyline(
            layers.core,
            &self.perimeter,
            StrokeStyle {
                width: opts.line_width_core.max(1.0),
                color: opts.color_core,
                alpha: 1.0,
            },
            opts.close_loop,
        );
    }
}

impl FrameEffect for NoiseOutline {
    const NAME: &'static str = "outline";

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
            self.advance(tick.delta, &frame);
            self.draw(surface);
        }
        ControlFlow::Continue(())
    }

    fn release(&mut self, surface: Option<&dyn RenderSurface>) {
        if let (Some(layers), Some(surface)) = (self.layers.take(), surface) {
            layers.destroy(surface);
        }
        self.perimeter.clear();
    }
}

impl EffectHandle<NoiseOutline> {
    pub fn set_options(&self, patch: &OutlinePatch) -> Result<()> {
        self.update(|outline, _| outline.set_options(patch))
    }
}
