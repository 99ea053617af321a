//! Host abstraction traits so `voltframe-core` stays renderer-agnostic.
//!
//! Everything here is single-threaded: the host owns one frame clock and one
//! drawable surface, and effects borrow them between ticks. Trait methods take
//! `&self`; implementations use interior mutability.

use std::ops::ControlFlow;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod headless;

/// Frames per second the tick `delta` is normalised against.
pub const BASELINE_FPS: f32 = 60.0;

/// Axis-aligned rectangle in surface coordinates, y pointing down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FrameRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Grows the rect by `margin` on every side.
    pub fn expand(&self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }

    /// Same center, both sides multiplied by `factor`.
    pub fn scaled_about_center(&self, factor: f32) -> Self {
        let width = self.width * factor;
        let height = self.height * factor;
        Self {
            x: self.x + (self.width - width) * 0.5,
            y: self.y + (self.height - height) * 0.5,
            width,
            height,
        }
    }

    /// Inclusive of the boundary.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// 24-bit RGB color, e.g. `Color(0x33ccff)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xffffff);

    pub fn to_hex(self) -> String {
        format!("#{:06x}", self.0 & 0x00ff_ffff)
    }
}

/// One host clock tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Elapsed frames since the previous tick at the 60 Hz baseline (1.0 = one frame).
    pub delta: f32,
    /// Monotonic host time in milliseconds.
    pub now_ms: f64,
}

impl FrameTick {
    /// Frame delta in seconds. A zero or negative delta counts as one frame.
    pub fn seconds(&self) -> f32 {
        let delta = if self.delta > 0.0 { self.delta } else { 1.0 };
        delta / BASELINE_FPS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub u64);

/// Returning `Break` asks the scheduler to drop the subscription.
pub type TickCallback = Box<dyn FnMut(&FrameTick) -> ControlFlow<()>>;

/// Shared per-frame clock.
pub trait FrameScheduler {
    fn subscribe(&self, callback: TickCallback) -> SubscriptionId;
    /// Returns `false` if the id was not (or no longer) subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
    fn now_ms(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayerDesc {
    pub blend: BlendMode,
    /// Blur radius of the post-effect, if any.
    pub blur: Option<f32>,
    pub z_index: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub color: Color,
    pub alpha: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteState {
    pub position: Vec2,
    pub diameter: f32,
    pub tint: Color,
    pub alpha: f32,
}

/// Drawable surface owned by the host. Each effect creates and owns its layers and sprites.
pub trait RenderSurface {
    fn create_layer(&self, desc: LayerDesc) -> LayerId;
    /// Also destroys every sprite on the layer.
    fn destroy_layer(&self, layer: LayerId);
    fn clear_layer(&self, layer: LayerId);
    fn set_layer_alpha(&self, layer: LayerId, alpha: f32);
    fn stroke_polyline(&self, layer: LayerId, points: &[Vec2], style: StrokeStyle, closed: bool);

    /// New circular sprite, initially hidden.
    fn create_sprite(&self, layer: LayerId) -> SpriteId;
    fn update_sprite(&self, sprite: SpriteId, state: &SpriteState);
    fn set_sprite_visible(&self, sprite: SpriteId, visible: bool);
    fn destroy_sprite(&self, sprite: SpriteId);

    fn backdrop_alpha(&self) -> f32;
    fn set_backdrop_alpha(&self, alpha: f32);
}

/// Current bounds of the reference frame object. `None` while it is not mounted.
pub trait BoundsProvider {
    fn frame_bounds(&self) -> Option<FrameRect>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayout {
    pub rect: FrameRect,
    pub title: String,
    pub subtitle: String,
    pub hint: String,
}

/// Congratulatory overlay drawn by the host on top of the effects.
pub trait OverlayPresenter {
    fn show_overlay(&self, layout: &OverlayLayout);
    fn hide_overlay(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_grows_every_side() {
        let r = FrameRect::new(10.0, 20.0, 100.0, 50.0).expand(5.0);
        assert_eq!(r, FrameRect::new(5.0, 15.0, 110.0, 60.0));
    }

    #[test]
    fn scaled_rect_keeps_center() {
        let r = FrameRect::new(0.0, 0.0, 200.0, 100.0);
        let s = r.scaled_about_center(0.9);
        assert!((s.width - 180.0).abs() < 1e-4);
        assert!((s.height - 90.0).abs() < 1e-4);
        assert!((s.center() - r.center()).length() < 1e-4);
    }

    #[test]
    fn tick_seconds_uses_sixty_hz_baseline() {
        let tick = FrameTick { delta: 0.6, now_ms: 0.0 };
        assert!((tick.seconds() - 0.01).abs() < 1e-6);
        let stalled = FrameTick { delta: 0.0, now_ms: 0.0 };
        assert!((stalled.seconds() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn color_hex_is_six_digits() {
        assert_eq!(Color(0x33ccff).to_hex(), "#33ccff");
        assert_eq!(Color(0x00ff).to_hex(), "#0000ff");
    }
}
